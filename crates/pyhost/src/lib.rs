#![doc = include_str!("../../../README.md")]

mod callback;
pub mod config;
mod dispatch;
mod error;
mod handle;
mod interpreter;
mod lifecycle;
mod logging;
mod marshal;
mod object;
mod proxy;
mod registry;
mod value;

pub use crate::{
    config::{BridgeConfig, InterpreterConfig, LogConfig, LogFormat, LogLevel},
    dispatch::{CallableKind, call_and_coerce},
    error::{Error, ErrorKind, ForeignError, Result},
    handle::Handle,
    interpreter::Interpreter,
    lifecycle::LifecycleState,
    logging::init_logging,
    object::{PyModule, PyObject},
    proxy::{DispatchTable, MethodSig, ProxyHandler, PyInterface},
    value::{Args, FromValue, HostType, HostTyped, IntoArgs, IntoValue, Value},
};
