//! Error taxonomy shared by every engine crate.
//!
//! Setup failures (window, renderer, surface) and misuse failures (setting text
//! before a font exists) are surfaced synchronously to the caller. Transient
//! per-frame conditions such as "no events pending" are not errors at all and
//! never reach this type.

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// Window, renderer or surface creation failed. Fatal at startup.
    #[error("setup failed: {0}")]
    Setup(String),

    /// Text content was set on a text node before a font was assigned.
    #[error("missing font reference")]
    MissingFont,

    /// Any other call made in a state where it cannot succeed.
    #[error("invalid use: {0}")]
    Misuse(String),

    /// A collaborator failed to decode or load an asset.
    #[error("asset error: {0}")]
    Asset(String),

    /// Engine config could not be read, parsed or validated.
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn setup(msg: impl Into<String>) -> Self {
        Self::Setup(msg.into())
    }

    pub fn misuse(msg: impl Into<String>) -> Self {
        Self::Misuse(msg.into())
    }

    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = EngineError::setup("no adapter");
        assert_eq!(err.to_string(), "setup failed: no adapter");
        assert_eq!(EngineError::MissingFont.to_string(), "missing font reference");
    }

    #[test]
    fn io_errors_convert() {
        fn read() -> EngineResult<String> {
            Ok(std::fs::read_to_string("/definitely/not/a/real/path.json")?)
        }
        assert!(matches!(read(), Err(EngineError::Io(_))));
    }
}
