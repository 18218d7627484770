use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or incomplete configuration, reported before anything starts.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A host bridge the core needs was not injected.
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    /// A default host adapter could not be constructed.
    #[error("Failed to initialize {component}: {message}")]
    Initialization { component: String, message: String },

    #[error("Logging error: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;
