use backtrace::Backtrace;
use std::fmt;

#[derive(Debug)]
pub struct WrappedError {
    pub error: Box<dyn std::error::Error + Send + Sync>,
    pub backtrace: Backtrace,
}

impl fmt::Display for WrappedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for WrappedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.error.as_ref())
    }
}

// `topk-tokens` main error type
#[derive(thiserror::Error, Debug)]
pub enum Error {
    // -----------------------------------
    // Batch validation errors
    // -----------------------------------
    #[error("Precondition failed: {0}")]
    Precondition(String),

    // -----------------------------------
    // Selector errors
    // -----------------------------------
    #[error("Activations must have 3 dimensions [outer, token, inner], got shape {0:?}.")]
    Shape(Vec<usize>),

    #[error("`k` must be between 1 and the number of tokens ({token_count}), got {k}.")]
    Range { k: usize, token_count: usize },

    // Wrapped errors from other crates
    #[error(transparent)]
    Wrapped(#[from] WrappedError),
}

impl Error {
    pub fn wrap(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Wrapped(WrappedError {
            error: Box::new(e),
            backtrace: Backtrace::new(),
        })
    }

    /// Whether the error was caused by the caller input (as opposed to a failure of an underlying
    /// library).
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Error::Precondition(_) | Error::Shape(_) | Error::Range { .. }
        )
    }
}

impl From<candle_core::Error> for Error {
    fn from(e: candle_core::Error) -> Self {
        Error::wrap(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::wrap(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Returns early with [`Error::Precondition`] if the condition does not hold.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::Error::Precondition(format!($($arg)+)));
        }
    };
}
