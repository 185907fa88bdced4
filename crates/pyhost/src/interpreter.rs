//! The interpreter context every boundary call goes through.

use std::{ffi::CString, fmt, sync::Arc};

use parking_lot::Mutex;
use pyo3::{Bound, Py, PyAny, Python, prelude::*, types::PyList};

use crate::{
    Handle,
    config::InterpreterConfig,
    error::{Error, Result},
    lifecycle::{LifecycleGuard, LifecycleState},
    object::{Lease, PyModule, PyObject},
    registry::ObjectTable,
};

struct Inner {
    config: InterpreterConfig,
    lifecycle: LifecycleGuard,
    objects: Mutex<ObjectTable<Py<PyAny>>>,
}

/// Handle to an embedded CPython interpreter.
///
/// Cloning is cheap and every clone shares the same lifecycle state and object
/// table. All contexts in a process drive the same CPython runtime; each one
/// tracks its own lifecycle and the references it handed out, so a context can
/// be destroyed without affecting another.
///
/// # Example
///
/// ```no_run
/// use pyhost::Interpreter;
///
/// let interpreter = Interpreter::default();
/// interpreter.initialize()?;
/// let builtins = interpreter.import_module("builtins")?;
/// let max: String = builtins.call_as("max", ("A", "Z"))?;
/// assert_eq!(max, "Z");
/// interpreter.destroy();
/// # Ok::<(), pyhost::Error>(())
/// ```
#[derive(Clone)]
pub struct Interpreter {
    inner: Arc<Inner>,
}

impl Interpreter {
    #[must_use]
    pub fn new(config: InterpreterConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                lifecycle: LifecycleGuard::new(),
                objects: Mutex::new(ObjectTable::default()),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &InterpreterConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.inner.lifecycle.state()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.lifecycle.is_running()
    }

    /// Starts the interpreter and applies the configured `sys.argv` and
    /// `sys.path` entries. Does nothing if this context is already running.
    pub fn initialize(&self) -> Result<()> {
        if self.is_running() {
            tracing::debug!("interpreter already running");
            return Ok(());
        }
        Python::initialize();
        Python::attach(|py| self.apply_config(py))?;
        if let Some(generation) = self.inner.lifecycle.start() {
            tracing::info!(generation, "interpreter initialized");
        }
        Ok(())
    }

    fn apply_config(&self, py: Python<'_>) -> Result<()> {
        let config = &self.inner.config;
        let sys = py.import("sys").map_err(|err| Error::from_py(py, &err))?;
        if !config.argv.is_empty() {
            let argv = PyList::new(py, &config.argv).map_err(|err| Error::from_py(py, &err))?;
            sys.setattr("argv", argv).map_err(|err| Error::from_py(py, &err))?;
        }
        let path = sys.getattr("path").map_err(|err| Error::from_py(py, &err))?;
        for entry in &config.sys_path {
            let entry = entry.to_string_lossy().into_owned();
            let present = path.contains(entry.as_str()).map_err(|err| Error::from_py(py, &err))?;
            if !present {
                path.call_method1("append", (entry.as_str(),))
                    .map_err(|err| Error::from_py(py, &err))?;
                tracing::debug!(entry = %entry, "added to sys.path");
            }
        }
        Ok(())
    }

    /// Stops this context and releases every reference it still holds.
    ///
    /// Wrappers outliving the call become stale: boundary operations on them
    /// fail with [`Error::NotRunning`], and dropping them is a no-op. The CPython
    /// runtime itself stays loaded.
    pub fn destroy(&self) {
        if !self.inner.lifecycle.stop() {
            tracing::debug!("interpreter already stopped");
            return;
        }
        let objects = self.inner.objects.lock().drain();
        let released = objects.len();
        // Dropping may run `__del__` and re-enter the bridge, so the table lock is
        // already released here.
        Python::attach(|_py| drop(objects));
        tracing::info!(released, "interpreter destroyed");
    }

    pub(crate) fn ensure_running(&self, operation: &'static str) -> Result<()> {
        self.inner.lifecycle.ensure_running(operation)
    }

    /// Version string of the embedded interpreter.
    pub fn python_version(&self) -> Result<String> {
        self.ensure_running("python version")?;
        Ok(Python::attach(|py| py.version().to_owned()))
    }

    /// Imports module `name`.
    pub fn import_module(&self, name: &str) -> Result<PyModule> {
        self.ensure_running("import module")?;
        tracing::debug!(target: "pyhost::exec", name, "import module");
        Python::attach(|py| {
            let module = py.import(name).map_err(|err| Error::from_py(py, &err))?;
            self.acquire(module.as_any()).map(PyModule::from_object)
        })
    }

    /// Compiles `code` into a new module registered as `name`.
    pub fn module_from_code(&self, name: &str, code: &str) -> Result<PyModule> {
        self.ensure_running("module from code")?;
        tracing::debug!(target: "pyhost::exec", name, "module from code");
        let code = c_string(code, "code")?;
        let file_name = c_string(&format!("{name}.py"), "module name")?;
        let module_name = c_string(name, "module name")?;
        Python::attach(|py| {
            let module = pyo3::types::PyModule::from_code(py, &code, &file_name, &module_name)
                .map_err(|err| Error::from_py(py, &err))?;
            self.acquire(module.as_any()).map(PyModule::from_object)
        })
    }

    /// Runs `code` in the namespace of `__main__`.
    pub fn exec_script(&self, code: &str) -> Result<()> {
        self.ensure_running("exec script")?;
        tracing::debug!(target: "pyhost::exec", len = code.len(), "exec script");
        let code = c_string(code, "code")?;
        Python::attach(|py| py.run(&code, None, None).map_err(|err| Error::from_py(py, &err)))
    }

    /// Leases an object the host already holds by handle.
    ///
    /// Only handles currently referenced through this context are accepted.
    pub fn wrap(&self, handle: Handle) -> Result<PyObject> {
        if handle.is_null() {
            return Ok(PyObject::NULL);
        }
        let generation = self.inner.lifecycle.running_generation("wrap handle")?;
        self.inner.objects.lock().lease(handle)?;
        tracing::trace!(target: "pyhost::mem", %handle, "leased");
        Ok(PyObject::leased(Lease::new(self.clone(), handle, generation)))
    }

    /// Number of distinct objects currently referenced through this context.
    #[must_use]
    pub fn live_objects(&self) -> usize {
        self.inner.objects.lock().len()
    }

    /// Number of host wrappers (counting shared clones once) alive for `handle`.
    #[must_use]
    pub fn leases(&self, handle: Handle) -> usize {
        self.inner.objects.lock().leases(handle)
    }

    /// Records a new host reference to `object` and returns its wrapper.
    ///
    /// Fails once the context is stopped, so nothing is stored in a table that
    /// `destroy` has already drained.
    pub(crate) fn acquire(&self, object: &Bound<'_, PyAny>) -> Result<PyObject> {
        let handle = Handle::from_ptr(object.as_ptr());
        if handle.is_null() || object.is_none() {
            return Ok(PyObject::NULL);
        }
        // `destroy` stops the lifecycle before taking the table lock to drain it,
        // so checking under the lock leaves no window for a late insert.
        let mut objects = self.inner.objects.lock();
        let generation = self.inner.lifecycle.running_generation("acquire object")?;
        let leases = objects.acquire(handle, || object.clone().unbind());
        drop(objects);
        tracing::trace!(target: "pyhost::mem", %handle, leases, "acquired");
        Ok(PyObject::leased(Lease::new(self.clone(), handle, generation)))
    }

    pub(crate) fn lookup<'py>(&self, py: Python<'py>, handle: Handle, generation: u64) -> Result<Bound<'py, PyAny>> {
        if !self.inner.lifecycle.is_current(generation) {
            self.ensure_running("resolve handle")?;
            return Err(Error::usage(format!(
                "handle {handle} belongs to an earlier interpreter session"
            )));
        }
        self.inner
            .objects
            .lock()
            .get(handle)
            .map(|object| object.bind(py).clone())
            .ok_or_else(|| Error::usage(format!("handle {handle} is not a live object")))
    }

    pub(crate) fn release(&self, handle: Handle, generation: u64) {
        if !self.inner.lifecycle.is_current(generation) {
            tracing::trace!(target: "pyhost::mem", %handle, "release after shutdown ignored");
            return;
        }
        let released = self.inner.objects.lock().release(handle);
        match released {
            Ok(Some(object)) => {
                tracing::trace!(target: "pyhost::mem", %handle, "released");
                Python::attach(|_py| drop(object));
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(target: "pyhost::mem", %handle, %err, "release rejected"),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(InterpreterConfig::default())
    }
}

impl fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("state", &self.state())
            .field("live_objects", &self.live_objects())
            .finish_non_exhaustive()
    }
}

fn c_string(text: &str, what: &str) -> Result<CString> {
    CString::new(text).map_err(|_| Error::usage(format!("{what} contains a NUL byte")))
}
