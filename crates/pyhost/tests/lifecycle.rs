use std::fs;

use pyhost::{ErrorKind, Handle, Interpreter, InterpreterConfig, LifecycleState};

#[test]
fn operations_before_initialize_are_lifecycle_violations() {
    let interpreter = Interpreter::default();
    assert_eq!(interpreter.state(), LifecycleState::NotRunning);

    for err in [
        interpreter.import_module("builtins").unwrap_err(),
        interpreter.module_from_code("lifecycle_early", "x = 1").unwrap_err(),
        interpreter.exec_script("x = 1").unwrap_err(),
        interpreter.python_version().unwrap_err(),
        interpreter.wrap(Handle::new(16)).unwrap_err(),
        interpreter.host_function("f", |_| Ok(pyhost::Value::Null)).unwrap_err(),
    ] {
        assert_eq!(err.kind(), ErrorKind::NotRunning);
    }
}

#[test]
fn operations_after_destroy_are_lifecycle_violations() {
    let interpreter = Interpreter::default();
    interpreter.initialize().unwrap();
    let module = interpreter
        .module_from_code("lifecycle_destroyed", "value = 1\ndef f():\n    return 1\n")
        .unwrap();
    interpreter.destroy();
    assert_eq!(interpreter.state(), LifecycleState::NotRunning);
    assert_eq!(interpreter.live_objects(), 0);

    // Not found and wrongly typed lookups still report the lifecycle first.
    assert_eq!(module.call("no_such_function", ()).unwrap_err().kind(), ErrorKind::NotRunning);
    assert_eq!(module.call_as::<String>("f", ()).unwrap_err().kind(), ErrorKind::NotRunning);
    assert_eq!(module.get_attribute::<i64>("value").unwrap_err().kind(), ErrorKind::NotRunning);
    assert_eq!(module.set_attribute("value", 2_i64).unwrap_err().kind(), ErrorKind::NotRunning);
    assert_eq!(module.string_value().unwrap_err().kind(), ErrorKind::NotRunning);
    assert_eq!(module.int_value().unwrap_err().kind(), ErrorKind::NotRunning);
    assert_eq!(
        interpreter.import_module("builtins").unwrap_err().to_string(),
        "interpreter is not running (attempted import module)"
    );
}

#[test]
fn initialize_and_destroy_are_idempotent() {
    let interpreter = Interpreter::default();
    interpreter.initialize().unwrap();
    interpreter.initialize().unwrap();
    assert!(interpreter.is_running());
    interpreter.destroy();
    interpreter.destroy();
    assert!(!interpreter.is_running());
}

#[test]
fn wrappers_from_an_earlier_session_are_stale() {
    let interpreter = Interpreter::default();
    interpreter.initialize().unwrap();
    let old = interpreter.module_from_code("lifecycle_stale", "def f():\n    return 1\n").unwrap();
    interpreter.destroy();
    interpreter.initialize().unwrap();

    let err = old.call_as::<i64>("f", ()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Usage);
    assert!(err.to_string().contains("earlier interpreter session"));

    let fresh = interpreter.import_module("lifecycle_stale").unwrap();
    assert_eq!(fresh.call_as::<i64>("f", ()).unwrap(), 1);
    drop(old);
    assert_eq!(interpreter.live_objects(), 1);
}

#[test]
fn contexts_are_independent() {
    let first = Interpreter::default();
    let second = Interpreter::default();
    first.initialize().unwrap();
    second.initialize().unwrap();
    let module = second.import_module("builtins").unwrap();

    first.destroy();
    assert_eq!(module.call_as::<i64>("abs", (-3_i64,)).unwrap(), 3);
    assert!(second.is_running());
}

#[test]
fn config_extends_sys_path() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("lifecycle_path_fixture.py"), "ANSWER = 42\n").unwrap();

    let config = InterpreterConfig {
        argv: vec!["pyhost-test".to_owned()],
        sys_path: vec![dir.path().to_path_buf()],
    };
    let interpreter = Interpreter::new(config.clone());
    interpreter.initialize().unwrap();
    let fixture = interpreter.import_module("lifecycle_path_fixture").unwrap();
    assert_eq!(fixture.get_attribute::<i64>("ANSWER").unwrap(), 42);

    let again = Interpreter::new(config);
    again.initialize().unwrap();
    let sys = again.import_module("sys").unwrap();
    let path = sys.get_attribute_object("path").unwrap();
    let entry = dir.path().to_string_lossy().into_owned();
    assert_eq!(path.call_as::<i64>("count", (entry,)).unwrap(), 1);
    assert_eq!(sys.get_attribute::<Vec<String>>("argv").unwrap(), vec!["pyhost-test".to_owned()]);
}
