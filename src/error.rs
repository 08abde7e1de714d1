//! Error kinds raised across the binding boundary.
//!
//! Rust code returns [`Error`]; the Python layer converts it into one of the
//! exception types below, all of which derive from `SegNetError`.

use pyo3::create_exception;
use pyo3::exceptions::PyException;
use pyo3::PyErr;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed parameters, non-positive dimensions, unresolved network name
    /// or an image object that does not carry a device pointer.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation invoked on a wrapper without a loaded engine.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The native factory returned no engine, or the argument vector could
    /// not be built.
    #[error("construction failed: {0}")]
    Construction(String),

    /// A native inference call reported failure.
    #[error("operation failed: {0}")]
    Operation(String),
}

impl Error {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Error::InvalidState(msg.into())
    }

    pub fn construction(msg: impl Into<String>) -> Self {
        Error::Construction(msg.into())
    }

    pub fn operation(msg: impl Into<String>) -> Self {
        Error::Operation(msg.into())
    }
}

create_exception!(jetson_segnet, SegNetError, PyException, "Base class for segNet errors.");
create_exception!(jetson_segnet, InvalidArgumentError, SegNetError);
create_exception!(jetson_segnet, InvalidStateError, SegNetError);
create_exception!(jetson_segnet, ConstructionError, SegNetError);
create_exception!(jetson_segnet, OperationError, SegNetError);

impl From<Error> for PyErr {
    fn from(err: Error) -> Self {
        let msg = err.to_string();
        match err {
            Error::InvalidArgument(_) => InvalidArgumentError::new_err(msg),
            Error::InvalidState(_) => InvalidStateError::new_err(msg),
            Error::Construction(_) => ConstructionError::new_err(msg),
            Error::Operation(_) => OperationError::new_err(msg),
        }
    }
}
