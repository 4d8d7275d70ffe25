use crate::{port::PortNo, switch::SwitchId};
use std::fmt;

/// A `(switch, port)` pair: one side of an inter-switch link, or the
/// attachment point of a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkEnd {
    pub switch: SwitchId,
    pub port: PortNo,
}

impl LinkEnd {
    pub fn new(switch: impl Into<SwitchId>, port: impl Into<PortNo>) -> Self {
        Self {
            switch: switch.into(),
            port: port.into(),
        }
    }
}

impl From<(SwitchId, PortNo)> for LinkEnd {
    fn from((switch, port): (SwitchId, PortNo)) -> Self {
        Self { switch, port }
    }
}

impl fmt::Display for LinkEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.switch, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_switch_then_port() {
        let a = LinkEnd::new(1, 9);
        let b = LinkEnd::new(2, 1);
        let c = LinkEnd::new(2, 3);

        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn display() {
        assert_eq!(LinkEnd::new(10, 3).to_string(), "000000000000000a/3");
    }
}
