use thiserror::Error;

/// The main error type for keyhook operations
#[derive(Error, Debug)]
pub enum Error {
    /// Error parsing or validating a key combination
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// A second keyboard hook was constructed while one is live. The OS hook
    /// procedure has no instance context, so only one hook may exist per
    /// process; hitting this means the host has a lifecycle bug.
    #[error("A keyboard hook already exists in this process")]
    HookAlreadyLive,
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;
