use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Import history lookup failed: {0}")]
    HistoryLookup(String),

    #[error("Invalid content identity: {0}")]
    InvalidIdentity(String),

    #[error("{0}")]
    Other(String),
}
