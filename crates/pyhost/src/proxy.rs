//! Rust traits implemented by Python objects.
//!
//! An interface is declared once with [`py_interface!`](crate::py_interface),
//! which generates the trait, a proxy struct implementing it, and a
//! [`DispatchTable`] describing every method. Each proxy call is a table lookup
//! followed by [`call_and_coerce`](crate::call_and_coerce); there is no runtime
//! reflection.

use ahash::AHashMap;

use crate::{
    dispatch::{self, CallableKind},
    error::{Error, Result},
    object::PyObject,
    value::{FromValue, HostType, IntoArgs},
};

/// Declared shape of one interface method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSig {
    /// Name of the Python attribute the method dispatches to.
    pub py_name: &'static str,
    pub params: Vec<HostType>,
    pub ret: HostType,
}

/// Method signatures of one interface, keyed by Rust method name.
#[derive(Debug, Clone)]
pub struct DispatchTable {
    interface: &'static str,
    methods: AHashMap<&'static str, MethodSig>,
}

impl DispatchTable {
    #[must_use]
    pub fn new(interface: &'static str) -> Self {
        Self {
            interface,
            methods: AHashMap::new(),
        }
    }

    #[must_use]
    pub fn with_method(mut self, key: &'static str, py_name: &'static str, params: Vec<HostType>, ret: HostType) -> Self {
        self.methods.insert(key, MethodSig { py_name, params, ret });
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&MethodSig> {
        self.methods.get(key)
    }

    #[must_use]
    pub fn interface(&self) -> &'static str {
        self.interface
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// Routes proxy method calls to the wrapped Python object.
///
/// Holds nothing but the object and the callable kind; every call goes straight
/// to the dispatcher without caching.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyHandler {
    object: PyObject,
    kind: CallableKind,
}

impl ProxyHandler {
    #[must_use]
    pub fn new(object: PyObject, kind: CallableKind) -> Self {
        Self { object, kind }
    }

    #[must_use]
    pub fn object(&self) -> &PyObject {
        &self.object
    }

    #[must_use]
    pub fn kind(&self) -> CallableKind {
        self.kind
    }

    /// Dispatches method `key` of `table` with `args`.
    pub fn invoke<R: FromValue>(&self, table: &DispatchTable, key: &str, args: impl IntoArgs) -> Result<R> {
        self.object.interpreter()?.ensure_running("proxy call")?;
        let sig = table
            .get(key)
            .ok_or_else(|| Error::usage(format!("interface {} has no method '{key}'", table.interface())))?;
        let (values, _) = args.into_args().into_parts();
        let value = dispatch::call_and_coerce(&self.object, self.kind, sig.py_name, &values, &sig.params, &sig.ret)?;
        R::from_value(value)
    }
}

/// A Rust trait that Python objects can implement through a proxy.
///
/// Implemented by the proxy structs [`py_interface!`](crate::py_interface)
/// generates.
pub trait PyInterface: Sized {
    /// Interface name, used as the declared type of proxy values.
    const NAME: &'static str;

    fn dispatch_table() -> &'static DispatchTable;

    fn from_handler(handler: ProxyHandler) -> Self;

    fn handler(&self) -> &ProxyHandler;

    /// The Python object behind the proxy.
    fn object(&self) -> &PyObject {
        self.handler().object()
    }
}

/// Declares a Rust trait implemented by Python objects, plus its proxy struct.
///
/// Every method takes `&self` and returns `pyhost::Result` of the declared
/// return type. A method dispatches to the Python attribute of the same name
/// unless an `as "name"` suffix says otherwise.
///
/// ```no_run
/// use pyhost::{Interpreter, py_interface};
///
/// py_interface! {
///     pub trait Processor => ProcessorProxy {
///         fn initialize(&self) -> String;
///         fn compute_tile(&self, w: i32, h: i32) -> String as "computeTile";
///     }
/// }
///
/// let interpreter = Interpreter::default();
/// interpreter.initialize()?;
/// let module = interpreter.module_from_code("proc", "class P:\n    def initialize(self): return 'ok'\n")?;
/// let processor: ProcessorProxy = module.call("P", ())?.cast()?;
/// assert_eq!(processor.initialize()?, "ok");
/// # Ok::<(), pyhost::Error>(())
/// ```
#[macro_export]
macro_rules! py_interface {
    (@py_name $method:ident) => {
        ::core::stringify!($method)
    };
    (@py_name $method:ident $py_name:literal) => {
        $py_name
    };
    (
        $(#[$meta:meta])*
        $vis:vis trait $name:ident => $proxy:ident {
            $(
                $(#[$method_meta:meta])*
                fn $method:ident(&self $(, $arg:ident : $arg_ty:ty)* $(,)?) -> $ret:ty $(as $py_name:literal)?;
            )*
        }
    ) => {
        $(#[$meta])*
        $vis trait $name {
            $(
                $(#[$method_meta])*
                fn $method(&self $(, $arg: $arg_ty)*) -> $crate::Result<$ret>;
            )*
        }

        #[doc = ::core::concat!("Python-backed implementation of [`", ::core::stringify!($name), "`].")]
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        $vis struct $proxy {
            handler: $crate::ProxyHandler,
        }

        impl $crate::PyInterface for $proxy {
            const NAME: &'static str = ::core::stringify!($name);

            fn dispatch_table() -> &'static $crate::DispatchTable {
                static TABLE: ::std::sync::OnceLock<$crate::DispatchTable> = ::std::sync::OnceLock::new();
                TABLE.get_or_init(|| {
                    $crate::DispatchTable::new(::core::stringify!($name))
                    $(
                        .with_method(
                            ::core::stringify!($method),
                            $crate::py_interface!(@py_name $method $($py_name)?),
                            ::std::vec![$(<$arg_ty as $crate::HostTyped>::host_type()),*],
                            <$ret as $crate::HostTyped>::host_type(),
                        )
                    )*
                })
            }

            fn from_handler(handler: $crate::ProxyHandler) -> Self {
                Self { handler }
            }

            fn handler(&self) -> &$crate::ProxyHandler {
                &self.handler
            }
        }

        impl $name for $proxy {
            $(
                fn $method(&self $(, $arg: $arg_ty)*) -> $crate::Result<$ret> {
                    self.handler.invoke(
                        <Self as $crate::PyInterface>::dispatch_table(),
                        ::core::stringify!($method),
                        $crate::Args::new()$(.arg($arg))*,
                    )
                }
            )*
        }

        impl $crate::HostTyped for $proxy {
            fn host_type() -> $crate::HostType {
                $crate::HostType::Interface(::core::stringify!($name))
            }
        }

        impl $crate::IntoValue for $proxy {
            fn into_value(self) -> $crate::Value {
                $crate::IntoValue::into_value(self.handler.object().clone())
            }
        }

        impl $crate::FromValue for $proxy {
            fn from_value(value: $crate::Value) -> $crate::Result<Self> {
                let object = <$crate::PyObject as $crate::FromValue>::from_value(value)?;
                object.cast()
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{ErrorKind, HostTyped, PyInterface};

    crate::py_interface! {
        /// Test interface.
        trait Tiler => TilerProxy {
            fn initialize(&self) -> ();
            fn compute_tile(&self, width: i32, height: i32) -> String as "computeTile";
            fn weights(&self, scale: f64) -> Vec<f32>;
        }
    }

    #[test]
    fn table_lists_every_method() {
        let table = TilerProxy::dispatch_table();
        assert_eq!(table.interface(), "Tiler");
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.get("compute_tile"),
            Some(&MethodSig {
                py_name: "computeTile",
                params: vec![HostType::I32, HostType::I32],
                ret: HostType::Str,
            })
        );
        assert_eq!(table.get("initialize").map(|sig| sig.ret.clone()), Some(HostType::Void));
        assert_eq!(
            table.get("weights").map(|sig| sig.ret.clone()),
            Some(HostType::Array(Box::new(HostType::F32)))
        );
        assert!(table.get("dispose").is_none());
    }

    #[test]
    fn table_is_built_once() {
        assert!(std::ptr::eq(TilerProxy::dispatch_table(), TilerProxy::dispatch_table()));
    }

    #[test]
    fn proxy_declares_interface_type() {
        assert_eq!(TilerProxy::host_type(), HostType::Interface("Tiler"));
        assert_eq!(TilerProxy::NAME, "Tiler");
    }

    #[test]
    fn proxy_equality_is_host_side() {
        let a = TilerProxy::from_handler(ProxyHandler::new(PyObject::new(8), CallableKind::Method));
        let b = a.clone();
        assert_eq!(a, b);
        assert_eq!(a.object().pointer(), 8);
        let err = a.compute_tile(1, 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
}
