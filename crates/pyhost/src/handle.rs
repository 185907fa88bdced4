//! Numeric identity of a Python object on the host side.

use std::fmt;

/// Opaque numeric reference to a Python object.
///
/// The value is the object's address inside the embedded interpreter. Identity,
/// equality and hashing are defined by the integer alone; a handle carries no
/// ownership of the object it names, ownership lives in the lease held by
/// [`PyObject`](crate::PyObject).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Handle(u64);

impl Handle {
    /// The "no object" sentinel.
    pub const NULL: Self = Self(0);

    /// Creates a handle from a raw integer.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw integer value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Hash code of the handle, which is the raw value itself.
    #[must_use]
    pub const fn hash_code(self) -> u64 {
        self.0
    }

    pub(crate) fn from_ptr(ptr: *mut pyo3::ffi::PyObject) -> Self {
        Self(ptr as usize as u64)
    }
}

impl From<u64> for Handle {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

impl fmt::LowerHex for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}
