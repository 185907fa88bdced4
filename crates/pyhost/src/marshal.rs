//! Conversion between host [`Value`]s and Python objects for a single call.
//!
//! Arguments are converted against their declared [`HostType`] before the
//! callable is even resolved, so a conversion failure never reaches Python.
//! Return values are coerced to the declared return type after the call.

use pyo3::{
    Bound, IntoPyObjectExt, PyAny, Python,
    prelude::*,
    types::{PyBool, PyBytes, PyFloat, PyInt, PyList, PyString, PyTuple},
};
use smallvec::SmallVec;

use crate::{
    error::{Error, Result},
    interpreter::Interpreter,
    value::{HostType, Value},
};

/// Converts every argument of a call into a Python tuple.
///
/// Arity is checked by the caller; `values` and `types` are zipped here.
pub(crate) fn args_to_py<'py>(
    py: Python<'py>,
    name: &str,
    values: &[Value],
    types: &[HostType],
) -> Result<Bound<'py, PyTuple>> {
    let converted = values
        .iter()
        .zip(types)
        .enumerate()
        .map(|(i, (value, ty))| to_py(py, value, ty).map_err(|err| err.context(format!("argument {} of '{name}'", i + 1))))
        .collect::<Result<SmallVec<[Bound<'py, PyAny>; 8]>>>()?;
    PyTuple::new(py, converted).map_err(|err| Error::from_py(py, &err))
}

/// Converts one host value declared as `ty` into a Python object.
pub(crate) fn to_py<'py>(py: Python<'py>, value: &Value, ty: &HostType) -> Result<Bound<'py, PyAny>> {
    if value.is_null() {
        if ty.is_primitive() {
            return Err(Error::conversion(format!("null is not a valid {ty}")));
        }
        return Ok(py.None().into_bound(py));
    }
    match (ty, value) {
        (HostType::Void, _) => Err(Error::usage("void is not a parameter type")),
        (HostType::Any, _) => natural_to_py(py, value),
        (HostType::Bool, Value::Bool(b)) => scalar(py, *b),
        (HostType::F64, Value::Float(f)) => scalar(py, *f),
        (HostType::F32, Value::Float(f)) => {
            if f.is_finite() && f.abs() > f64::from(f32::MAX) {
                return Err(Error::conversion(format!("{f} is out of range for f32")));
            }
            scalar(py, *f)
        }
        (ty, Value::Int(i)) if ty.is_float() => scalar(py, widen(*i)),
        (ty, Value::Int(i)) => match ty.int_range() {
            Some((min, max)) if (min..=max).contains(i) => scalar(py, *i),
            Some(_) => Err(Error::conversion(format!("{i} is out of range for {ty}"))),
            None => Err(Error::conversion(format!("cannot pass int as {ty}"))),
        },
        (HostType::Str, Value::Str(s)) => Ok(PyString::new(py, s).into_any()),
        (HostType::Object | HostType::Interface(_), Value::Object(obj)) => obj.to_bound(py),
        (HostType::Array(item), Value::Array(items)) => {
            let converted = items
                .iter()
                .enumerate()
                .map(|(i, v)| to_py(py, v, item).map_err(|err| err.context(format!("item {i}"))))
                .collect::<Result<Vec<_>>>()?;
            let list = PyList::new(py, converted).map_err(|err| Error::from_py(py, &err))?;
            Ok(list.into_any())
        }
        (ty, value) => Err(Error::conversion(format!("cannot pass {} as {ty}", value.kind_name()))),
    }
}

fn natural_to_py<'py>(py: Python<'py>, value: &Value) -> Result<Bound<'py, PyAny>> {
    match value {
        Value::Null => Ok(py.None().into_bound(py)),
        Value::Bool(_) => to_py(py, value, &HostType::Bool),
        Value::Int(_) => to_py(py, value, &HostType::I64),
        Value::Float(_) => to_py(py, value, &HostType::F64),
        Value::Str(_) => to_py(py, value, &HostType::Str),
        Value::Array(_) => to_py(py, value, &HostType::Array(Box::new(HostType::Any))),
        Value::Object(_) => to_py(py, value, &HostType::Object),
    }
}

#[expect(clippy::cast_precision_loss, reason = "int to float widening")]
fn widen(i: i64) -> f64 {
    i as f64
}

fn scalar<'py, T>(py: Python<'py>, value: T) -> Result<Bound<'py, PyAny>>
where
    T: IntoPyObjectExt<'py>,
{
    value.into_bound_py_any(py).map_err(|err| Error::from_py(py, &err))
}

/// Coerces a Python object to the declared host type `ty`.
///
/// Objects are wrapped through `interpreter`, which takes a new lease on them.
pub(crate) fn from_py(interpreter: &Interpreter, obj: &Bound<'_, PyAny>, ty: &HostType) -> Result<Value> {
    let py = obj.py();
    match ty {
        HostType::Void => Ok(Value::Null),
        HostType::Any => natural_from_py(interpreter, obj),
        HostType::Object | HostType::Interface(_) => wrap(interpreter, obj),
        _ if obj.is_none() => {
            if ty.is_primitive() {
                Err(Error::conversion(format!("None cannot be returned as {ty}")))
            } else {
                Ok(Value::Null)
            }
        }
        HostType::Bool => {
            if obj.is_instance_of::<PyBool>() {
                obj.extract::<bool>().map(Value::Bool).map_err(|err| Error::from_py(py, &err))
            } else {
                Err(mismatch(obj, ty))
            }
        }
        ty if ty.is_float() => {
            if !is_int(obj) && !obj.is_instance_of::<PyFloat>() {
                return Err(mismatch(obj, ty));
            }
            let f = obj
                .extract::<f64>()
                .map_err(|_| Error::conversion(format!("{} is out of range for {ty}", py_repr(obj))))?;
            if *ty == HostType::F32 && f.is_finite() && f.abs() > f64::from(f32::MAX) {
                return Err(Error::conversion(format!("{f} is out of range for f32")));
            }
            Ok(Value::Float(f))
        }
        HostType::Str => {
            if obj.is_instance_of::<PyString>() {
                obj.extract::<String>().map(Value::Str).map_err(|err| Error::from_py(py, &err))
            } else {
                Err(mismatch(obj, ty))
            }
        }
        HostType::Array(item) => {
            if obj.is_instance_of::<PyString>() || obj.is_instance_of::<PyBytes>() {
                return Err(mismatch(obj, ty));
            }
            let iter = obj.try_iter().map_err(|_| mismatch(obj, ty))?;
            let mut items = Vec::new();
            for (i, element) in iter.enumerate() {
                let element = element.map_err(|err| Error::from_py(py, &err))?;
                items.push(from_py(interpreter, &element, item).map_err(|err| err.context(format!("item {i}")))?);
            }
            Ok(Value::Array(items))
        }
        _ => {
            let (min, max) = ty.int_range().ok_or_else(|| mismatch(obj, ty))?;
            if !is_int(obj) {
                return Err(mismatch(obj, ty));
            }
            let out_of_range = || Error::conversion(format!("{} is out of range for {ty}", py_repr(obj)));
            let i = obj.extract::<i64>().map_err(|_| out_of_range())?;
            if (min..=max).contains(&i) { Ok(Value::Int(i)) } else { Err(out_of_range()) }
        }
    }
}

fn natural_from_py(interpreter: &Interpreter, obj: &Bound<'_, PyAny>) -> Result<Value> {
    if obj.is_none() {
        return Ok(Value::Null);
    }
    if obj.is_instance_of::<PyBool>() {
        if let Ok(b) = obj.extract::<bool>() {
            return Ok(Value::Bool(b));
        }
    } else if obj.is_instance_of::<PyInt>() {
        if let Ok(i) = obj.extract::<i64>() {
            return Ok(Value::Int(i));
        }
    } else if obj.is_instance_of::<PyFloat>() {
        if let Ok(f) = obj.extract::<f64>() {
            return Ok(Value::Float(f));
        }
    } else if obj.is_instance_of::<PyString>()
        && let Ok(s) = obj.extract::<String>()
    {
        return Ok(Value::Str(s));
    }
    wrap(interpreter, obj)
}

fn wrap(interpreter: &Interpreter, obj: &Bound<'_, PyAny>) -> Result<Value> {
    if obj.is_none() {
        Ok(Value::Null)
    } else {
        interpreter.acquire(obj).map(Value::Object)
    }
}

/// `bool` is a subclass of `int` in Python but never counts as an integer here.
fn is_int(obj: &Bound<'_, PyAny>) -> bool {
    obj.is_instance_of::<PyInt>() && !obj.is_instance_of::<PyBool>()
}

fn mismatch(obj: &Bound<'_, PyAny>, ty: &HostType) -> Error {
    Error::conversion(format!("cannot convert Python {} to {ty}", py_type_name(obj)))
}

/// Name of the Python type of `obj`, e.g. `int`.
pub(crate) fn py_type_name(obj: &Bound<'_, PyAny>) -> String {
    obj.get_type()
        .name()
        .map_or_else(|_| "<unknown>".to_owned(), |name| name.to_string())
}

fn py_repr(obj: &Bound<'_, PyAny>) -> String {
    obj.repr().map_or_else(|_| py_type_name(obj), |repr| repr.to_string())
}
