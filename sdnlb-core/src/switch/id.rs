use anyhow::{Context as _, anyhow};
use std::{fmt, str};

/// The datapath identifier of a switch managed by the control plane.
///
/// Datapath identifiers are 64 bits wide and stable across reconnects of
/// the same physical (or virtual) switch. The [`Display`] implementation
/// prints the identifier the way switches usually report it: as 16
/// zero-padded hexadecimal digits.
///
/// [`Display`]: fmt::Display
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(C)]
pub struct SwitchId(u64);

impl SwitchId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn into_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for SwitchId {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl str::FromStr for SwitchId {
    type Err = anyhow::Error;

    /// accepts either a decimal number (`"3"`) or a `0x` prefixed
    /// hexadecimal datapath id (`"0x00000000000000a1"`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            u64::from_str_radix(hex, 16)
                .map(Self)
                .with_context(|| format!("Invalid hexadecimal datapath id `{s}'"))
        } else {
            s.parse().map(Self).map_err(|error| anyhow!("{error}"))
        }
    }
}

impl fmt::Display for SwitchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
impl fmt::LowerHex for SwitchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl fmt::UpperHex for SwitchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print() {
        assert_eq!(format!("{}", SwitchId(42)), "000000000000002a")
    }
    #[test]
    fn print_lower_hex() {
        assert_eq!(format!("{:x}", SwitchId(42)), "2a")
    }
    #[test]
    fn print_upper_hex() {
        assert_eq!(format!("{:X}", SwitchId(42)), "2A")
    }
    #[test]
    fn parse_decimal() {
        assert_eq!("42".parse::<SwitchId>().unwrap(), SwitchId(42));
    }
    #[test]
    fn parse_hex() {
        assert_eq!(
            "0x000000000000002a".parse::<SwitchId>().unwrap(),
            SwitchId(42)
        );
    }
    #[test]
    fn parse_invalid() {
        assert!("".parse::<SwitchId>().is_err());
        assert!("0xzz".parse::<SwitchId>().is_err());
        assert!("-1".parse::<SwitchId>().is_err());
    }
}
