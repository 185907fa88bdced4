//! The single foreign-call primitive every wrapper and proxy goes through.

use pyo3::{Bound, PyAny, Python, prelude::*};
use strum::{Display, IntoStaticStr};

use crate::{
    error::{Error, Result},
    marshal,
    object::PyObject,
    value::{HostType, Value},
};

/// How a named callable is invoked on its receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CallableKind {
    /// A plain function found on the receiver, called with the explicit
    /// arguments only (module functions, constructors).
    Function,
    /// A method called with the receiver bound as `self`.
    Method,
}

/// Calls `name` on `receiver` and coerces the result to `return_type`.
///
/// Checks run in a fixed order: lifecycle, name and arity, argument
/// conversion, callable resolution, invocation, return coercion. Everything up
/// to argument conversion happens before Python sees the call, so a usage or
/// conversion error leaves the interpreter untouched. Nothing is retried.
pub fn call_and_coerce(
    receiver: &PyObject,
    kind: CallableKind,
    name: &str,
    args: &[Value],
    param_types: &[HostType],
    return_type: &HostType,
) -> Result<Value> {
    let interpreter = receiver.interpreter()?;
    interpreter.ensure_running("call")?;
    if name.is_empty() {
        return Err(Error::usage("callable name must not be empty"));
    }
    if args.len() != param_types.len() {
        return Err(Error::usage(format!(
            "'{name}' declares {} parameters but {} arguments were supplied",
            param_types.len(),
            args.len()
        )));
    }

    let span = tracing::debug_span!(
        target: "pyhost::exec",
        "call",
        receiver = %receiver.handle(),
        %kind,
        name,
        argc = args.len(),
        returns = %return_type,
    );
    let _enter = span.enter();

    Python::attach(|py| {
        let py_args = marshal::args_to_py(py, name, args, param_types)?;
        let target = receiver.to_bound(py)?;
        let callable = resolve_callable(py, &target, name)?;
        let result = callable.call1(py_args).map_err(|err| {
            let err = Error::from_py(py, &err);
            tracing::debug!(target: "pyhost::exec", %err, "call raised");
            err
        })?;
        marshal::from_py(interpreter, &result, return_type).map_err(|err| err.context(format!("return value of '{name}'")))
    })
}

/// Looks `name` up on `target` and checks that it can be called.
///
/// For methods Python's attribute lookup already binds the receiver, so both
/// kinds resolve the same way.
fn resolve_callable<'py>(py: Python<'py>, target: &Bound<'py, PyAny>, name: &str) -> Result<Bound<'py, PyAny>> {
    let attr = target
        .getattr(name)
        .map_err(|err| Error::from_attribute_err(py, name, &err))?;
    if attr.is_callable() {
        Ok(attr)
    } else {
        Err(Error::lookup(
            name,
            format!("'{}' object is not callable", marshal::py_type_name(&attr)),
        ))
    }
}
