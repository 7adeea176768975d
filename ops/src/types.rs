use thiserror::Error;
use vkop_core::DeviceBindError;

/// Errors raised while constructing an operation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OpError {
    #[error("unknown operation '{0}'")]
    UnknownOp(String),

    #[error("{op} expected {expected} mem objects but got {actual}")]
    InvalidArity { op: &'static str, expected: usize, actual: usize },

    /// The dispatch target refused the new bindings; carried as-is.
    ///
    /// `Display` and `source()` both forward to the inner error, so
    /// `source()` does not return it. Match `OpError::Rebuild(e)` to get
    /// the [`DeviceBindError`] itself.
    #[error(transparent)]
    Rebuild(#[from] DeviceBindError),
}

/// Trait to implement for each kernel to work with inventory
pub trait RegistrationInfo {
    /// Unique name for the operation
    const NAME: &'static str;
}
