use crate::{defaults::*, time::HumanDuration, topology::MissingWeight};
use anyhow::{Context as _, Result, anyhow, bail, ensure};
use std::{fmt, str::FromStr, time::Duration};

/// What to do with a packet whose destination is not known anywhere in
/// the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnknownDestination {
    #[default]
    Flood,
    Drop,
}

impl fmt::Display for UnknownDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flood => f.write_str("flood"),
            Self::Drop => f.write_str("drop"),
        }
    }
}

impl FromStr for UnknownDestination {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flood" => Ok(Self::Flood),
            "drop" => Ok(Self::Drop),
            _ => bail!("Unknown destination policy `{s}', expecting `flood' or `drop'"),
        }
    }
}

/// Control plane configuration. Read-only once built, see
/// [`ConfigBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    poll_interval: Duration,
    unknown_destination: UnknownDestination,
    loop_horizon: Duration,
    loop_guard_capacity: usize,
    forwarding_ttl: Duration,
    missing_weight: MissingWeight,
    flow_idle_timeout: Duration,
    max_command_failures: u32,
}

#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            unknown_destination: UnknownDestination::default(),
            loop_horizon: DEFAULT_LOOP_HORIZON,
            loop_guard_capacity: DEFAULT_LOOP_GUARD_CAPACITY,
            forwarding_ttl: DEFAULT_FORWARDING_TTL,
            missing_weight: DEFAULT_MISSING_WEIGHT,
            flow_idle_timeout: DEFAULT_FLOW_IDLE_TIMEOUT,
            max_command_failures: DEFAULT_MAX_COMMAND_FAILURES,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Read a configuration from `key = value` lines.
    ///
    /// Blank lines and lines starting with `#` are ignored, keys not
    /// listed keep their default.
    ///
    /// ```
    /// # use sdnlb_core::{Config, UnknownDestination};
    /// # use std::time::Duration;
    /// let config = Config::from_pairs(
    ///     "poll_interval = 1m 30s\n\
    ///      unknown_destination = drop\n",
    /// ).unwrap();
    /// assert_eq!(config.poll_interval(), Duration::from_secs(90));
    /// assert_eq!(config.unknown_destination(), UnknownDestination::Drop);
    /// ```
    pub fn from_pairs(text: &str) -> Result<Self> {
        let mut builder = ConfigBuilder::new();

        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| {
                    anyhow!("line {}: expecting `key = value', got `{line}'", index + 1)
                })?;
            builder = builder
                .set(key.trim(), value.trim())
                .with_context(|| format!("line {}", index + 1))?;
        }

        builder.build()
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn unknown_destination(&self) -> UnknownDestination {
        self.unknown_destination
    }

    pub fn loop_horizon(&self) -> Duration {
        self.loop_horizon
    }

    pub fn loop_guard_capacity(&self) -> usize {
        self.loop_guard_capacity
    }

    pub fn forwarding_ttl(&self) -> Duration {
        self.forwarding_ttl
    }

    pub fn missing_weight(&self) -> MissingWeight {
        self.missing_weight
    }

    pub fn flow_idle_timeout(&self) -> Duration {
        self.flow_idle_timeout
    }

    pub fn max_command_failures(&self) -> u32 {
        self.max_command_failures
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn unknown_destination(mut self, policy: UnknownDestination) -> Self {
        self.config.unknown_destination = policy;
        self
    }

    pub fn loop_horizon(mut self, horizon: Duration) -> Self {
        self.config.loop_horizon = horizon;
        self
    }

    pub fn loop_guard_capacity(mut self, capacity: usize) -> Self {
        self.config.loop_guard_capacity = capacity;
        self
    }

    pub fn forwarding_ttl(mut self, ttl: Duration) -> Self {
        self.config.forwarding_ttl = ttl;
        self
    }

    pub fn missing_weight(mut self, policy: MissingWeight) -> Self {
        self.config.missing_weight = policy;
        self
    }

    pub fn flow_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.flow_idle_timeout = timeout;
        self
    }

    pub fn max_command_failures(mut self, failures: u32) -> Self {
        self.config.max_command_failures = failures;
        self
    }

    /// set a value from its textual key and value
    pub fn set(self, key: &str, value: &str) -> Result<Self> {
        let duration = |value: &str| -> Result<Duration> {
            Ok(value
                .parse::<HumanDuration>()
                .with_context(|| format!("Invalid duration for `{key}'"))?
                .into_duration())
        };
        let number = |value: &str| -> Result<u64> {
            value
                .parse::<u64>()
                .with_context(|| format!("Invalid number for `{key}'"))
        };

        Ok(match key {
            "poll_interval" => self.poll_interval(duration(value)?),
            "unknown_destination" => self.unknown_destination(value.parse()?),
            "loop_horizon" => self.loop_horizon(duration(value)?),
            "loop_guard_capacity" => self.loop_guard_capacity(usize::try_from(number(value)?)?),
            "forwarding_ttl" => self.forwarding_ttl(duration(value)?),
            "missing_weight" => self.missing_weight(value.parse()?),
            "flow_idle_timeout" => self.flow_idle_timeout(duration(value)?),
            "max_command_failures" => self.max_command_failures(u32::try_from(number(value)?)?),
            _ => bail!("Unknown configuration key `{key}'"),
        })
    }

    pub fn build(self) -> Result<Config> {
        let config = self.config;

        ensure!(
            !config.poll_interval.is_zero(),
            "The polling interval cannot be zero"
        );
        ensure!(
            config.loop_guard_capacity > 0,
            "The loop guard needs room for at least one frame"
        );
        ensure!(
            config.max_command_failures > 0,
            "The command failure threshold must be at least 1"
        );

        Ok(config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();

        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.unknown_destination(), UnknownDestination::Flood);
        assert_eq!(config.loop_horizon(), Duration::from_secs(2));
        assert_eq!(config.loop_guard_capacity(), 4096);
        assert_eq!(config.forwarding_ttl(), Duration::from_secs(300));
        assert_eq!(config.missing_weight(), MissingWeight::Zero);
        assert_eq!(config.flow_idle_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_command_failures(), 3);

        assert_eq!(ConfigBuilder::new().build().unwrap(), config);
    }

    #[test]
    fn from_pairs() {
        let config = Config::from_pairs(
            r#"
# statistics
poll_interval = 250ms
missing_weight = Unusable

loop_guard_capacity = 16
forwarding_ttl=1h
"#,
        )
        .unwrap();

        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.missing_weight(), MissingWeight::Unusable);
        assert_eq!(config.loop_guard_capacity(), 16);
        assert_eq!(config.forwarding_ttl(), Duration::from_secs(3_600));
        assert_eq!(config.loop_horizon(), DEFAULT_LOOP_HORIZON);
    }

    #[test]
    fn invalid_pairs() {
        let error = Config::from_pairs("poll_interval = 10").unwrap_err();
        assert!(format!("{error:#}").contains("poll_interval"), "{error:#}");

        assert!(Config::from_pairs("flood").is_err());
        assert!(Config::from_pairs("colour = blue").is_err());
        assert!(Config::from_pairs("unknown_destination = maybe").is_err());
        assert!(Config::from_pairs("max_command_failures = -1").is_err());
        assert!(Config::from_pairs("poll_interval = 0s").is_err());
    }

    #[test]
    fn unknown_destination_parse() {
        assert_eq!("FLOOD".parse::<UnknownDestination>().unwrap(), UnknownDestination::Flood);
        assert_eq!(" drop ".parse::<UnknownDestination>().unwrap(), UnknownDestination::Drop);
        assert_eq!(UnknownDestination::Drop.to_string(), "drop");
    }
}
