use crate::config::Config;
use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
};

/// HTTP stack crates whose output is capped at `DEPENDENCY_LEVEL` unless tracing.
const NOISY_DEPENDENCIES: &[&str] = &["tower", "hyper", "axum", "tracing"];

/// Dependency warnings (dropped connections, bad requests) stay visible.
const DEPENDENCY_LEVEL: LevelFilter = LevelFilter::Warn;

/// Which module paths one terminal logger accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Scope {
    Everything,
    /// Broker crates only: every module except the noisy dependencies.
    Workspace,
    Dependencies,
}

pub struct Logger {}

impl Logger {
    /// Initializes the global logger from the configured level.
    ///
    /// Broker crates log at the configured level. The HTTP stack is clamped
    /// to warnings unless the level is Trace. Production output has no ANSI
    /// colors so log collectors get plain text.
    pub fn init_logger(config: &Config) {
        let color = Self::color_choice(config);
        let loggers: Vec<Box<dyn SharedLogger>> = Self::plan(config.log_level_filter)
            .into_iter()
            .map(|(level, scope)| {
                TermLogger::new(level, Self::build_log_config(scope), TerminalMode::Mixed, color)
                    as Box<dyn SharedLogger>
            })
            .collect();

        CombinedLogger::init(loggers).expect("Failed to start simplelog");
    }

    /// One `(level, scope)` pair per terminal logger to install.
    fn plan(level: LevelFilter) -> Vec<(LevelFilter, Scope)> {
        match level {
            LevelFilter::Trace | LevelFilter::Off => vec![(level, Scope::Everything)],
            _ => vec![
                (level, Scope::Workspace),
                (level.min(DEPENDENCY_LEVEL), Scope::Dependencies),
            ],
        }
    }

    fn color_choice(config: &Config) -> ColorChoice {
        if config.is_production() {
            ColorChoice::Never
        } else {
            ColorChoice::Auto
        }
    }

    fn build_log_config(scope: Scope) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        for module in NOISY_DEPENDENCIES {
            match scope {
                Scope::Everything => {}
                Scope::Workspace => {
                    builder.add_filter_ignore_str(module);
                }
                Scope::Dependencies => {
                    builder.add_filter_allow_str(module);
                }
            }
        }

        builder.build()
    }
}
