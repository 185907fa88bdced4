use std::fmt;

use pyo3::{PyErr, Python, exceptions::PyAttributeError, prelude::*};
use strum::{Display, IntoStaticStr};

/// Result alias used across the bridge.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while crossing the host/interpreter boundary.
///
/// The variants follow the failure taxonomy of a single boundary call so callers
/// can decide how to react without string matching. None of them is retried by
/// the bridge: by the time an error is observed the interpreter may already have
/// mutated state.
#[derive(Debug, Clone)]
pub enum Error {
    /// The host used the API incorrectly (null handle, arity mismatch, stale or
    /// detached object). Raised before anything reaches the interpreter.
    Usage(String),
    /// The named attribute or callable does not exist on the receiver.
    Lookup {
        /// Attribute that was looked up.
        name: String,
        /// Interpreter-provided description.
        message: String,
    },
    /// A value could not be converted between host and interpreter types.
    Conversion(String),
    /// The Python code itself raised.
    Foreign(ForeignError),
    /// A boundary operation was attempted while the interpreter is not running.
    NotRunning {
        /// Operation that was attempted.
        operation: &'static str,
    },
    /// Configuration or logging setup failed.
    Config(String),
}

/// Discriminant of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Usage,
    Lookup,
    Conversion,
    Foreign,
    NotRunning,
    Config,
}

impl Error {
    pub(crate) fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    pub(crate) fn conversion(message: impl Into<String>) -> Self {
        Self::Conversion(message.into())
    }

    pub(crate) fn lookup(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Lookup {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Maps an exception raised while resolving `name` on a receiver.
    ///
    /// `AttributeError` means the name is absent and becomes [`Error::Lookup`];
    /// anything else was raised by foreign code (a property getter, `__getattr__`)
    /// and stays a foreign error.
    pub(crate) fn from_attribute_err(py: Python<'_>, name: &str, err: &PyErr) -> Self {
        let foreign = ForeignError::from_py(py, err);
        if err.is_instance_of::<PyAttributeError>(py) {
            Self::lookup(name, foreign.message)
        } else {
            Self::Foreign(foreign)
        }
    }

    pub(crate) fn from_py(py: Python<'_>, err: &PyErr) -> Self {
        Self::Foreign(ForeignError::from_py(py, err))
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Usage(_) => ErrorKind::Usage,
            Self::Lookup { .. } => ErrorKind::Lookup,
            Self::Conversion(_) => ErrorKind::Conversion,
            Self::Foreign(_) => ErrorKind::Foreign,
            Self::NotRunning { .. } => ErrorKind::NotRunning,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Prefixes the message of usage and conversion errors with `context`.
    pub(crate) fn context(self, context: impl fmt::Display) -> Self {
        match self {
            Self::Usage(msg) => Self::Usage(format!("{context}: {msg}")),
            Self::Conversion(msg) => Self::Conversion(format!("{context}: {msg}")),
            other => other,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usage(msg) => write!(f, "invalid argument: {msg}"),
            Self::Lookup { name, message } => write!(f, "lookup of '{name}' failed: {message}"),
            Self::Conversion(msg) => write!(f, "conversion error: {msg}"),
            Self::Foreign(err) => write!(f, "{err}"),
            Self::NotRunning { operation } => {
                write!(f, "interpreter is not running (attempted {operation})")
            }
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ForeignError> for Error {
    fn from(error: ForeignError) -> Self {
        Self::Foreign(error)
    }
}

/// A Python exception captured at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignError {
    type_name: String,
    message: String,
    traceback: Option<String>,
}

impl ForeignError {
    /// Captures the type, message and traceback of a Python exception.
    pub(crate) fn from_py(py: Python<'_>, err: &PyErr) -> Self {
        let type_name = err
            .get_type(py)
            .name()
            .map_or_else(|_| "<unknown>".to_owned(), |name| name.to_string());
        let message = err.value(py).to_string();
        let traceback = err.traceback(py).and_then(|tb| tb.format().ok());
        Self {
            type_name,
            message,
            traceback,
        }
    }

    /// Python type name of the exception, e.g. `ValueError`.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Formatted Python traceback, when the exception carried one.
    #[must_use]
    pub fn traceback(&self) -> Option<&str> {
        self.traceback.as_deref()
    }
}

impl fmt::Display for ForeignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Python error: {}: {}", self.type_name, self.message)
    }
}

impl std::error::Error for ForeignError {}
