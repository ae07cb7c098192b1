use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Environment variable holding `EnvFilter` directives; overrides `--log-level`.
pub const LOG_ENV: &str = "THREEWIRE_LOG";

/// Targets `--log-level` applies to. Everything else stays at `warn` or quieter.
const LINK_TARGETS: [&str; 4] = [
    "threewire",
    "threewire_link",
    "threewire_transport",
    "threewire_frame",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

fn directives(level: LogLevel) -> String {
    let level = level.as_filter();
    LINK_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn env_filter(level: LogLevel) -> EnvFilter {
    let builder = EnvFilter::builder();
    match std::env::var(LOG_ENV) {
        Ok(env) if !env.trim().is_empty() => builder.parse_lossy(env),
        _ => builder
            .with_default_directive(level.as_filter().min(LevelFilter::WARN).into())
            .parse_lossy(directives(level)),
    }
}

/// Events carry the thread name, which tells the intake thread (`h5-rx`)
/// apart from the delivery worker.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter(level))
        .with_ansi(false)
        .with_target(false)
        .with_thread_names(true);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_applies_to_every_link_crate() {
        assert_eq!(
            directives(LogLevel::Debug),
            "threewire=debug,threewire_link=debug,threewire_transport=debug,threewire_frame=debug"
        );
    }

    #[test]
    fn dependencies_never_louder_than_warn() {
        assert_eq!(LogLevel::Trace.as_filter().min(LevelFilter::WARN), LevelFilter::WARN);
        assert_eq!(LogLevel::Error.as_filter().min(LevelFilter::WARN), LevelFilter::ERROR);
    }
}
