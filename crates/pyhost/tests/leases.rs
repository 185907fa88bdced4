use pyhost::{ErrorKind, Handle, Interpreter, PyModule};

const FIXTURE: &str = r#"
import weakref

class Thing:
    pass

_ref = None

def make():
    global _ref
    thing = Thing()
    _ref = weakref.ref(thing)
    return thing

def alive():
    return _ref is not None and _ref() is not None
"#;

fn setup(name: &str) -> (Interpreter, PyModule) {
    let interpreter = Interpreter::default();
    interpreter.initialize().unwrap();
    let module = interpreter.module_from_code(name, FIXTURE).unwrap();
    (interpreter, module)
}

#[test]
fn dropping_the_last_wrapper_releases_the_object() {
    let (interpreter, module) = setup("leases_release");
    let baseline = interpreter.live_objects();

    let thing = module.call("make", ()).unwrap();
    assert_eq!(interpreter.live_objects(), baseline + 1);
    assert!(module.call_as::<bool>("alive", ()).unwrap());

    let copy = thing.clone();
    assert_eq!(interpreter.leases(thing.handle()), 1);
    drop(thing);
    assert!(module.call_as::<bool>("alive", ()).unwrap());

    drop(copy);
    assert_eq!(interpreter.live_objects(), baseline);
    assert!(!module.call_as::<bool>("alive", ()).unwrap());
}

#[test]
fn wrap_adds_a_lease_to_a_live_handle() {
    let (interpreter, module) = setup("leases_wrap");
    let thing = module.call("make", ()).unwrap();

    let again = interpreter.wrap(thing.handle()).unwrap();
    assert_eq!(again, thing);
    assert_eq!(interpreter.leases(thing.handle()), 2);
    assert_eq!(again.call_as::<String>("__repr__", ()).unwrap(), thing.string_value().unwrap());

    drop(thing);
    assert!(module.call_as::<bool>("alive", ()).unwrap());
    drop(again);
    assert!(!module.call_as::<bool>("alive", ()).unwrap());
}

#[test]
fn wrap_rejects_unknown_handles() {
    let (interpreter, _module) = setup("leases_unknown");
    let err = interpreter.wrap(Handle::new(0x10)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Usage);
    assert!(interpreter.wrap(Handle::NULL).unwrap().is_null());
}

#[test]
fn failed_calls_do_not_leak_references() {
    let (interpreter, module) = setup("leases_failures");
    let baseline = interpreter.live_objects();

    assert!(module.call_as::<i64>("make", ()).is_err());
    assert!(module.call("no_such_function", ()).is_err());
    assert_eq!(interpreter.live_objects(), baseline);
    assert!(!module.call_as::<bool>("alive", ()).unwrap());
}

#[test]
fn destroy_releases_everything() {
    let (interpreter, module) = setup("leases_destroy");
    let thing = module.call("make", ()).unwrap();
    assert!(interpreter.live_objects() >= 2);

    let probe = Interpreter::default();
    probe.initialize().unwrap();
    let probe_module = probe.import_module("leases_destroy").unwrap();

    interpreter.destroy();
    assert_eq!(interpreter.live_objects(), 0);
    assert!(!probe_module.call_as::<bool>("alive", ()).unwrap());
    drop(thing);
    drop(module);
    assert_eq!(interpreter.live_objects(), 0);
}
