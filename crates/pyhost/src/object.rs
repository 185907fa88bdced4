//! Host-side wrappers around Python objects.

use std::{
    fmt,
    hash::{Hash, Hasher},
    ops::Deref,
    sync::Arc,
};

use pyo3::{Bound, PyAny, Python, prelude::*};

use crate::{
    Handle,
    dispatch::{self, CallableKind},
    error::{Error, Result},
    interpreter::Interpreter,
    marshal,
    proxy::{ProxyHandler, PyInterface},
    value::{FromValue, HostType, HostTyped, IntoArgs, IntoValue},
};

/// Keeps one foreign reference alive on behalf of every clone of a [`PyObject`].
///
/// Dropping the last clone releases the reference exactly once.
pub(crate) struct Lease {
    interpreter: Interpreter,
    handle: Handle,
    generation: u64,
}

impl Lease {
    pub(crate) fn new(interpreter: Interpreter, handle: Handle, generation: u64) -> Self {
        Self {
            interpreter,
            handle,
            generation,
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.interpreter.release(self.handle, self.generation);
    }
}

/// A Python object referenced from the host.
///
/// Equality and hashing use the [`Handle`] only. Wrappers produced by the bridge
/// hold a lease on the object; wrappers built with [`PyObject::new`] are detached
/// and only good for identity comparisons.
#[derive(Clone)]
pub struct PyObject {
    handle: Handle,
    lease: Option<Arc<Lease>>,
}

impl PyObject {
    /// The null object, handle `0`.
    pub const NULL: Self = Self {
        handle: Handle::NULL,
        lease: None,
    };

    /// Builds a detached wrapper for `raw`. Handle `0` yields [`PyObject::NULL`].
    #[must_use]
    pub fn new(raw: u64) -> Self {
        Self {
            handle: Handle::new(raw),
            lease: None,
        }
    }

    pub(crate) fn leased(lease: Lease) -> Self {
        Self {
            handle: lease.handle,
            lease: Some(Arc::new(lease)),
        }
    }

    #[must_use]
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Raw handle value, the object's address in the interpreter.
    #[must_use]
    pub fn pointer(&self) -> u64 {
        self.handle.raw()
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.handle.is_null()
    }

    /// True when the wrapper holds a lease and can cross the boundary.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.lease.is_some()
    }

    pub(crate) fn interpreter(&self) -> Result<&Interpreter> {
        match &self.lease {
            Some(lease) => Ok(&lease.interpreter),
            None if self.is_null() => Err(Error::usage("operation on the null PyObject")),
            None => Err(Error::usage(format!("{self} is not attached to an interpreter"))),
        }
    }

    /// Resolves the wrapper to the live Python object. Requires the GIL.
    pub(crate) fn to_bound<'py>(&self, py: Python<'py>) -> Result<Bound<'py, PyAny>> {
        if self.is_null() {
            return Ok(py.None().into_bound(py));
        }
        let Some(lease) = &self.lease else {
            return Err(Error::usage(format!("{self} is not attached to an interpreter")));
        };
        lease.interpreter.lookup(py, self.handle, lease.generation)
    }

    /// Reads attribute `name`, converting it to `T`.
    pub fn get_attribute<T: FromValue>(&self, name: &str) -> Result<T> {
        let interpreter = self.interpreter()?;
        interpreter.ensure_running("get attribute")?;
        tracing::debug!(target: "pyhost::exec", object = %self.handle, name, "get attribute");
        let value = Python::attach(|py| {
            let target = self.to_bound(py)?;
            let attr = target
                .getattr(name)
                .map_err(|err| Error::from_attribute_err(py, name, &err))?;
            marshal::from_py(interpreter, &attr, &T::host_type()).map_err(|err| err.context(format!("attribute '{name}'")))
        })?;
        T::from_value(value)
    }

    /// Reads attribute `name` as an object.
    pub fn get_attribute_object(&self, name: &str) -> Result<Self> {
        self.get_attribute(name)
    }

    /// Assigns `value` to attribute `name`.
    pub fn set_attribute<V: IntoValue>(&self, name: &str, value: V) -> Result<()> {
        let interpreter = self.interpreter()?;
        interpreter.ensure_running("set attribute")?;
        tracing::debug!(target: "pyhost::exec", object = %self.handle, name, "set attribute");
        let ty = V::host_type();
        let value = value.into_value();
        Python::attach(|py| {
            let target = self.to_bound(py)?;
            let py_value = marshal::to_py(py, &value, &ty).map_err(|err| err.context(format!("attribute '{name}'")))?;
            target
                .setattr(name, py_value)
                .map_err(|err| Error::from_attribute_err(py, name, &err))
        })
    }

    /// True when the object has attribute `name`.
    pub fn has_attribute(&self, name: &str) -> Result<bool> {
        let interpreter = self.interpreter()?;
        interpreter.ensure_running("has attribute")?;
        Python::attach(|py| {
            let target = self.to_bound(py)?;
            target.hasattr(name).map_err(|err| Error::from_py(py, &err))
        })
    }

    /// Calls method `name` and returns the result as an object.
    pub fn call(&self, name: &str, args: impl IntoArgs) -> Result<Self> {
        self.call_as(name, args)
    }

    /// Calls method `name`, converting the result to `R`.
    pub fn call_as<R: FromValue>(&self, name: &str, args: impl IntoArgs) -> Result<R> {
        self.call_with_kind(CallableKind::Method, name, args)
    }

    fn call_with_kind<R: FromValue>(&self, kind: CallableKind, name: &str, args: impl IntoArgs) -> Result<R> {
        let (values, types) = args.into_args().into_parts();
        let value = dispatch::call_and_coerce(self, kind, name, &values, &types, &R::host_type())?;
        R::from_value(value)
    }

    /// `str()` of the object, computed by the interpreter.
    pub fn string_value(&self) -> Result<String> {
        let interpreter = self.interpreter()?;
        interpreter.ensure_running("string value")?;
        Python::attach(|py| {
            let target = self.to_bound(py)?;
            let text = target.str().map_err(|err| Error::from_py(py, &err))?;
            Ok(text.to_string())
        })
    }

    /// The object coerced to an `i64`.
    pub fn int_value(&self) -> Result<i64> {
        self.coerce()
    }

    /// The object coerced to an `f64`.
    pub fn double_value(&self) -> Result<f64> {
        self.coerce()
    }

    /// The object read as a sequence of `T`.
    pub fn array_value<T: FromValue>(&self) -> Result<Vec<T>> {
        self.coerce()
    }

    fn coerce<T: FromValue>(&self) -> Result<T> {
        let interpreter = self.interpreter()?;
        interpreter.ensure_running("coerce")?;
        let value = Python::attach(|py| {
            let target = self.to_bound(py)?;
            marshal::from_py(interpreter, &target, &T::host_type())
        })?;
        T::from_value(value)
    }

    /// Wraps the object in a proxy implementing `P`, dispatching calls as
    /// methods of this object.
    pub fn cast<P: PyInterface>(&self) -> Result<P> {
        self.create_proxy(CallableKind::Method)
    }

    /// Wraps the object in a proxy implementing `P` with the given callable kind.
    pub fn create_proxy<P: PyInterface>(&self, kind: CallableKind) -> Result<P> {
        self.interpreter()?;
        tracing::debug!(target: "pyhost::exec", object = %self.handle, interface = P::NAME, %kind, "create proxy");
        Ok(P::from_handler(ProxyHandler::new(self.clone(), kind)))
    }
}

impl TryFrom<Option<u64>> for PyObject {
    type Error = Error;

    fn try_from(raw: Option<u64>) -> Result<Self> {
        raw.map(Self::new).ok_or_else(|| Error::usage("missing handle"))
    }
}

impl PartialEq for PyObject {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for PyObject {}

impl Hash for PyObject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}

impl fmt::Display for PyObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PyObject(pointer={})", self.handle)
    }
}

impl fmt::Debug for PyObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PyObject")
            .field("handle", &self.handle)
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// A Python module. Calls on a module are plain function calls.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PyModule(PyObject);

impl PyModule {
    pub(crate) fn from_object(object: PyObject) -> Self {
        Self(object)
    }

    /// Calls function `name` of the module and returns the result as an object.
    pub fn call(&self, name: &str, args: impl IntoArgs) -> Result<PyObject> {
        self.call_as(name, args)
    }

    /// Calls function `name` of the module, converting the result to `R`.
    pub fn call_as<R: FromValue>(&self, name: &str, args: impl IntoArgs) -> Result<R> {
        self.0.call_with_kind(CallableKind::Function, name, args)
    }

    /// Proxy whose methods call the module's functions of the same name.
    pub fn create_proxy<P: PyInterface>(&self) -> Result<P> {
        self.0.create_proxy(CallableKind::Function)
    }

    #[must_use]
    pub fn as_object(&self) -> &PyObject {
        &self.0
    }

    #[must_use]
    pub fn into_object(self) -> PyObject {
        self.0
    }
}

impl Deref for PyModule {
    type Target = PyObject;

    fn deref(&self) -> &PyObject {
        &self.0
    }
}

impl HostTyped for PyModule {
    fn host_type() -> HostType {
        HostType::Object
    }
}

impl IntoValue for PyModule {
    fn into_value(self) -> crate::Value {
        self.0.into_value()
    }
}

impl fmt::Display for PyModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PyModule(pointer={})", self.0.handle)
    }
}

impl fmt::Debug for PyModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PyModule").field(&self.0).finish()
    }
}
