use anyhow::{Result, anyhow, bail, ensure};
use logos::{Lexer, Logos};
use std::{fmt, str::FromStr, time};

/// A [`std::time::Duration`] that parses from (and prints to) the human
/// form used in configuration: `"30s"`, `"1m 30s"`, `"250ms"`.
///
/// Several components may be combined, they are summed together.
///
/// ```
/// # use sdnlb_core::HumanDuration;
/// let interval: HumanDuration = "1m 30s".parse().unwrap();
/// assert_eq!(interval.into_duration().as_secs(), 90);
/// assert_eq!(interval.to_string(), "1m 30s");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct HumanDuration(time::Duration);

impl HumanDuration {
    pub const fn new(duration: time::Duration) -> Self {
        Self(duration)
    }

    #[inline]
    pub const fn into_duration(self) -> time::Duration {
        self.0
    }
}

impl From<time::Duration> for HumanDuration {
    fn from(duration: time::Duration) -> Self {
        Self(duration)
    }
}

impl From<HumanDuration> for time::Duration {
    fn from(HumanDuration(duration): HumanDuration) -> Self {
        duration
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_zero() {
            return f.write_str("0s");
        }

        let secs = self.0.as_secs();
        let parts = [
            (secs / 3_600, "h"),
            ((secs / 60) % 60, "m"),
            (secs % 60, "s"),
            (u64::from(self.0.subsec_millis()), "ms"),
            (u64::from(self.0.subsec_micros() % 1_000), "us"),
            (u64::from(self.0.subsec_nanos() % 1_000), "ns"),
        ];

        let mut first = true;
        for (value, unit) in parts.into_iter().filter(|(value, _)| *value != 0) {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{value}{unit}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for HumanDuration {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lex = Lexer::new(s);

        let mut durations = Vec::new();

        while let Some(next) = lex.next() {
            let number: Token = next.map_err(|()| anyhow!("Failed to parse: {s}"))?;

            ensure!(
                number == Token::Value,
                "Expecting duration to starts with number. Cannot parse {s}"
            );
            let number: u64 = lex.slice().parse()?;

            let Some(Ok(measure)) = lex.next() else {
                bail!("Expecting a measure, failed to parse: {s}")
            };
            let duration = match measure {
                Token::NanoSeconds => time::Duration::from_nanos(number),
                Token::MicroSeconds => time::Duration::from_micros(number),
                Token::MilliSeconds => time::Duration::from_millis(number),
                Token::Seconds => time::Duration::from_secs(number),
                Token::Minutes => time::Duration::from_secs(number.saturating_mul(60)),
                Token::Hours => time::Duration::from_secs(number.saturating_mul(3_600)),
                Token::Value => bail!("Failed to parse `{s}', expecting a measure."),
            };
            durations.push(duration);
        }

        ensure!(!durations.is_empty(), "Expecting a duration, got `{s}'");

        Ok(Self(durations.into_iter().sum()))
    }
}

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\n\f]+")]
enum Token {
    #[token("ns")]
    NanoSeconds,
    #[regex("us|μs")]
    MicroSeconds,
    #[token("ms")]
    MilliSeconds,
    #[token("s")]
    Seconds,
    #[token("m")]
    Minutes,
    #[token("h")]
    Hours,

    #[regex("[0-9]+")]
    Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logos_lexer() {
        let mut lex = Token::lexer("10s");

        assert_eq!(lex.next(), Some(Ok(Token::Value)));
        assert_eq!(lex.slice(), "10");

        assert_eq!(lex.next(), Some(Ok(Token::Seconds)));
        assert_eq!(lex.span(), 2..3);
    }

    #[test]
    fn parse() {
        let HumanDuration(duration) = "123ms".parse().unwrap();
        assert_eq!(duration.as_millis(), 123);

        let HumanDuration(duration) = "1s 2000ms 3000000us".parse().unwrap();
        assert_eq!(duration.as_secs(), 6);

        let HumanDuration(duration) = "1h 1m".parse().unwrap();
        assert_eq!(duration.as_secs(), 3_660);
    }

    #[test]
    fn parse_invalid() {
        assert!("".parse::<HumanDuration>().is_err());
        assert!("10".parse::<HumanDuration>().is_err());
        assert!("s".parse::<HumanDuration>().is_err());
        assert!("10 parsecs".parse::<HumanDuration>().is_err());
    }

    #[test]
    fn display() {
        let display = |d: time::Duration| HumanDuration(d).to_string();

        assert_eq!(display(time::Duration::ZERO), "0s");
        assert_eq!(display(time::Duration::from_secs(30)), "30s");
        assert_eq!(display(time::Duration::from_secs(90)), "1m 30s");
        assert_eq!(display(time::Duration::from_millis(2_250)), "2s 250ms");
        assert_eq!(display(time::Duration::from_secs(7_200)), "2h");
    }
}
