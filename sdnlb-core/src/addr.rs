use anyhow::{bail, ensure};
use logos::{Lexer, Logos};
use std::{fmt, str::FromStr};

/// A 48-bit hardware (MAC) address.
///
/// Parses from the usual textual forms (`aa:bb:cc:dd:ee:ff` or
/// `aa-bb-cc-dd-ee-ff`, case insensitive) and always prints in the lower
/// case, colon separated form.
///
/// ```
/// # use sdnlb_core::MacAddr;
/// let mac: MacAddr = "00:00:00:00:00:0A".parse().unwrap();
/// assert_eq!(mac.to_string(), "00:00:00:00:00:0a");
/// assert!(!mac.is_multicast());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    pub const ZERO: Self = Self([0; 6]);
    pub const BROADCAST: Self = Self([0xff; 6]);

    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    #[inline]
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// the group bit of the first octet is set (broadcast included)
    #[inline]
    pub const fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 == 0x01
    }

    #[inline]
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    pub(crate) fn from_slice(bytes: &[u8]) -> Option<Self> {
        let octets: [u8; 6] = bytes.get(..6)?.try_into().ok()?;
        Some(Self(octets))
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(octets: [u8; 6]) -> Self {
        Self(octets)
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddr({self})")
    }
}

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\n\f]+")]
enum MacToken {
    #[regex("[0-9a-fA-F]{2}")]
    Octet,
    #[regex("[:-]")]
    Separator,
}

impl FromStr for MacAddr {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lex = Lexer::<'_, MacToken>::new(s);
        let mut octets = [0u8; 6];

        for (index, octet) in octets.iter_mut().enumerate() {
            if index > 0 {
                let Some(Ok(MacToken::Separator)) = lex.next() else {
                    bail!("Expecting a separator after octet {index} in `{s}'")
                };
            }
            let Some(Ok(MacToken::Octet)) = lex.next() else {
                bail!("Expecting two hexadecimal digits for octet {index} in `{s}'")
            };
            *octet = u8::from_str_radix(lex.slice(), 16)?;
        }

        ensure!(
            lex.next().is_none(),
            "Not expecting any other tokens to parse a hardware address"
        );

        Ok(Self(octets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_colon() {
        let mac: MacAddr = "0a:1b:2c:3d:4e:5f".parse().unwrap();
        assert_eq!(mac.octets(), [0x0a, 0x1b, 0x2c, 0x3d, 0x4e, 0x5f]);
    }

    #[test]
    fn parse_dash_upper_case() {
        let mac: MacAddr = "0A-1B-2C-3D-4E-5F".parse().unwrap();
        assert_eq!(mac.to_string(), "0a:1b:2c:3d:4e:5f");
    }

    #[test]
    fn parse_invalid_strings() {
        assert!("".parse::<MacAddr>().is_err());
        assert!("0a:1b:2c:3d:4e".parse::<MacAddr>().is_err()); // too short
        assert!("0a:1b:2c:3d:4e:5f:60".parse::<MacAddr>().is_err()); // trailing
        assert!("0a1b2c3d4e5f".parse::<MacAddr>().is_err()); // no separators
        assert!("zz:1b:2c:3d:4e:5f".parse::<MacAddr>().is_err());
    }

    #[test]
    fn group_bits() {
        assert!(MacAddr::BROADCAST.is_multicast());
        assert!(MacAddr::BROADCAST.is_broadcast());
        assert!(MacAddr::new([0x01, 0x80, 0xc2, 0, 0, 0x0e]).is_multicast());
        assert!(!MacAddr::new([0x02, 0, 0, 0, 0, 1]).is_multicast());
    }
}
