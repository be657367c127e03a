use thiserror::Error;

/// Invalid configuration, detected before any simulation runs
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unsupported {option}: '{value}'")]
    Unsupported { option: &'static str, value: String },

    #[error("server_count must be at least 1")]
    NoServers,

    #[error("{option} must be a positive finite number, got {value}")]
    InvalidMean { option: &'static str, value: f64 },

    #[error("threads must be at least 1 when set")]
    NoThreads,

    #[error("could not read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A replication that could not produce a result
#[derive(Debug, Error)]
pub enum SimError {
    #[error("event scheduling failed: {0}")]
    Event(#[from] des::EventError),

    #[error("replication produced no resource pool stats")]
    MissingPoolStats,

    #[error("replication finished with {completed} of {expected} customers served")]
    Incomplete { expected: usize, completed: usize },
}
