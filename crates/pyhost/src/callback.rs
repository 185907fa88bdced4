//! Host functions callable from Python.

use pyo3::{
    Bound, Py, PyAny, PyErr, PyResult, Python,
    exceptions::PyRuntimeError,
    prelude::*,
    types::{PyCFunction, PyDict, PyTuple},
};

use crate::{
    error::{Error, Result},
    interpreter::Interpreter,
    marshal,
    object::PyObject,
    value::{HostType, Value},
};

impl Interpreter {
    /// Exposes `f` to Python as a callable object.
    ///
    /// Positional arguments arrive as [`Value`]s in their natural form (objects
    /// are leased like any other returned object). The host function may call
    /// back into Python; nesting to any depth is allowed. A host error is raised
    /// in Python as `RuntimeError` carrying the error message. Once this
    /// context is destroyed, calling the function raises `RuntimeError` too.
    pub fn host_function<F>(&self, name: &str, f: F) -> Result<PyObject>
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.ensure_running("host function")?;
        let interpreter = self.clone();
        let name = name.to_owned();
        Python::attach(|py| {
            let closure = move |args: &Bound<'_, PyTuple>, _kwargs: Option<&Bound<'_, PyDict>>| -> PyResult<Py<PyAny>> {
                let py = args.py();
                interpreter.ensure_running("host function call").map_err(raise)?;
                let values = args
                    .iter()
                    .map(|arg| marshal::from_py(&interpreter, &arg, &HostType::Any))
                    .collect::<Result<Vec<_>>>()
                    .map_err(raise)?;
                tracing::debug!(target: "pyhost::exec", name = %name, argc = values.len(), "host function called");
                let result = f(&values).map_err(raise)?;
                marshal::to_py(py, &result, &HostType::Any).map(Bound::unbind).map_err(raise)
            };
            let function = PyCFunction::new_closure(py, None, None, closure).map_err(|err| Error::from_py(py, &err))?;
            self.acquire(function.as_any())
        })
    }
}

fn raise(err: Error) -> PyErr {
    PyRuntimeError::new_err(err.to_string())
}
