use pyhost::{Error, ErrorKind, Interpreter, Value};

const FIXTURE: &str = r#"
def apply_twice(fn, x):
    return fn(fn(x))

def inc(x):
    return x + 1

def call_with(fn, *args):
    return fn(*args)
"#;

const HOLDER: &str = r#"
import weakref

class Thing:
    pass

stored = None
_ref = None

def make():
    global _ref
    thing = Thing()
    _ref = weakref.ref(thing)
    return thing

def alive():
    return _ref is not None and _ref() is not None

def call_stored(*args):
    return stored(*args)
"#;

fn running() -> Interpreter {
    let interpreter = Interpreter::default();
    interpreter.initialize().unwrap();
    interpreter
}

#[test]
fn host_function_calls_back_into_python() {
    let interpreter = running();
    let module = interpreter.module_from_code("reentrancy_nested", FIXTURE).unwrap();

    let inner = module.clone();
    let inc_then_double = interpreter
        .host_function("inc_then_double", move |args| {
            let [Value::Int(x)] = args else {
                return Err(Error::Conversion(format!("expected one int, got {args:?}")));
            };
            let incremented: i64 = inner.call_as("inc", (*x,))?;
            Ok(Value::Int(incremented * 2))
        })
        .unwrap();

    // apply_twice(f, 3) = f(f(3)) = f(8) = 18
    let result: i64 = module.call_as("apply_twice", (inc_then_double, 3_i64)).unwrap();
    assert_eq!(result, 18);
}

#[test]
fn host_function_receives_natural_values() {
    let interpreter = running();
    let module = interpreter.module_from_code("reentrancy_values", FIXTURE).unwrap();

    let echo = interpreter
        .host_function("describe", |args| {
            let kinds = args.iter().map(Value::kind_name).collect::<Vec<_>>().join(",");
            Ok(Value::Str(kinds))
        })
        .unwrap();
    let builtins = interpreter.import_module("builtins").unwrap();
    let obj = builtins.call("object", ()).unwrap();

    let kinds: String = module
        .call_as("call_with", (echo, true, 1_i64, 0.5_f64, "s", obj, None::<String>))
        .unwrap();
    assert_eq!(kinds, "bool,int,float,str,PyObject,null");
}

#[test]
fn host_errors_surface_as_python_exceptions() {
    let interpreter = running();
    let module = interpreter.module_from_code("reentrancy_errors", FIXTURE).unwrap();

    let failing = interpreter
        .host_function("failing", |_| Err(Error::Conversion("host refused".to_owned())))
        .unwrap();
    let err = module.call_as::<i64>("call_with", (failing,)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Foreign);
    let Error::Foreign(foreign) = err else {
        panic!("expected a foreign error");
    };
    assert_eq!(foreign.type_name(), "RuntimeError");
    assert_eq!(foreign.message(), "conversion error: host refused");
}

#[test]
fn host_function_is_a_python_callable() {
    let interpreter = running();
    let answer = interpreter.host_function("answer", |_| Ok(Value::Int(42))).unwrap();
    let builtins = interpreter.import_module("builtins").unwrap();

    assert!(builtins.call_as::<bool>("callable", (answer.clone(),)).unwrap());
    assert_eq!(answer.call_as::<i64>("__call__", ()).unwrap(), 42);
}

#[test]
fn host_function_of_a_destroyed_context_raises() {
    let owner = running();
    let holder = running();
    let module = holder.module_from_code("reentrancy_destroyed_owner", HOLDER).unwrap();

    let answer = owner.host_function("answer", |_| Ok(Value::Int(42))).unwrap();
    module.set_attribute("stored", answer).unwrap();
    owner.destroy();

    let thing = module.call("make", ()).unwrap();
    let err = module.call_as::<i64>("call_stored", (thing.clone(),)).unwrap_err();
    let Error::Foreign(foreign) = err else {
        panic!("expected a foreign error");
    };
    assert_eq!(foreign.type_name(), "RuntimeError");
    assert_eq!(foreign.message(), "interpreter is not running (attempted host function call)");
    assert_eq!(owner.live_objects(), 0);

    drop(thing);
    assert!(!module.call_as::<bool>("alive", ()).unwrap());

    owner.initialize().unwrap();
    assert_eq!(owner.live_objects(), 0);
}
