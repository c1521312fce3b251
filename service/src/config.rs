use alerts::expiry::MAX_TTL_SECS;
use alerts::AlertSettings;
use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;
use tokio::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "http://localhost:3000,https://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 4000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,

    /// Seconds a topic subscriber may go without polling before it is dropped
    #[arg(
        long,
        env,
        default_value_t = 900,
        value_parser = clap::value_parser!(u64).range(1..=MAX_TTL_SECS),
    )]
    pub subscriber_idle_secs: u64,

    /// Seconds an alert may wait unconsumed before its expiration hook runs
    #[arg(
        long,
        env,
        default_value_t = 300,
        value_parser = clap::value_parser!(u64).range(1..=MAX_TTL_SECS),
    )]
    pub alert_item_ttl_secs: u64,

    /// Seconds between two prune passes over every alert queue
    #[arg(
        long,
        env,
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..=MAX_TTL_SECS),
    )]
    pub prune_interval_secs: u64,

    /// Seconds a page route may go without polling before it is dropped
    #[arg(
        long,
        env,
        default_value_t = 900,
        value_parser = clap::value_parser!(u64).range(1..=MAX_TTL_SECS),
    )]
    pub page_route_idle_secs: u64,

    /// How many times a prune pass retries evicting a subscriber that is busy
    #[arg(
        long,
        env,
        default_value_t = 5,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..=100),
    )]
    pub max_remove_attempts: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }

    pub fn prune_interval(&self) -> Duration {
        Duration::from_secs(self.prune_interval_secs)
    }

    /// Queue tunables derived from the alert flags.
    pub fn alert_settings(&self) -> AlertSettings {
        AlertSettings {
            subscriber_idle_ttl: Duration::from_secs(self.subscriber_idle_secs),
            item_ttl: Duration::from_secs(self.alert_item_ttl_secs),
            page_route_idle_ttl: Duration::from_secs(self.page_route_idle_secs),
            max_remove_attempts: self.max_remove_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_alert_queue_defaults() {
        let config = Config::parse_from(["alert_broker_rs"]);

        assert_eq!(config.port, 4000);
        assert_eq!(config.interface.as_deref(), Some("127.0.0.1"));
        assert_eq!(config.log_level_filter, LevelFilter::Info);
        assert_eq!(config.runtime_env(), RustEnv::Development);
        assert_eq!(config.prune_interval(), Duration::from_secs(60));
        assert_eq!(config.alert_settings(), AlertSettings::default());
    }

    #[test]
    fn test_alert_flags_override_settings() {
        let config = Config::parse_from([
            "alert_broker_rs",
            "--subscriber-idle-secs",
            "30",
            "--alert-item-ttl-secs",
            "10",
            "--page-route-idle-secs",
            "45",
            "--max-remove-attempts",
            "2",
            "--runtime-env",
            "PRODUCTION",
        ]);

        let settings = config.alert_settings();
        assert_eq!(settings.subscriber_idle_ttl, Duration::from_secs(30));
        assert_eq!(settings.item_ttl, Duration::from_secs(10));
        assert_eq!(settings.page_route_idle_ttl, Duration::from_secs(45));
        assert_eq!(settings.max_remove_attempts, 2);
        assert!(config.is_production());
    }

    #[test]
    fn test_zero_and_oversized_durations_are_rejected() {
        for flag in [
            "--subscriber-idle-secs",
            "--alert-item-ttl-secs",
            "--prune-interval-secs",
            "--page-route-idle-secs",
        ] {
            assert!(
                Config::try_parse_from(["alert_broker_rs", flag, "0"]).is_err(),
                "{flag} 0 should be rejected"
            );
            let too_long = (MAX_TTL_SECS + 1).to_string();
            assert!(
                Config::try_parse_from(["alert_broker_rs", flag, too_long.as_str()]).is_err(),
                "{flag} above one year should be rejected"
            );
        }
        assert!(
            Config::try_parse_from(["alert_broker_rs", "--max-remove-attempts", "0"]).is_err()
        );
    }

    #[test]
    fn test_allowed_origins_are_comma_separated() {
        let config = Config::parse_from([
            "alert_broker_rs",
            "--allowed-origins",
            "https://a.example,https://b.example",
        ]);
        assert_eq!(
            config.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_rust_env_parses_case_insensitively() {
        assert_eq!("Staging".parse::<RustEnv>(), Ok(RustEnv::Staging));
        assert_eq!("qa".parse::<RustEnv>(), Err(RustEnvParseError));
        assert_eq!(RustEnv::Production.to_string(), "production");
    }
}
