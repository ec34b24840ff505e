use crate::helper::*;

use prolog_vm::*;
use serial_test::serial;

use std::env;
use std::io::ErrorKind;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn consult(machine: &mut Machine, files: &Term) -> Result<bool, MachineError> {
    machine.consult_files(&Context::background(), files)
}

fn empty() -> Term {
    Term::atom("testdata/empty.txt")
}

#[test]
fn consult_atom() {
    let mut machine = base_machine();
    assert!(consult(&mut machine, &empty()).unwrap());
}

#[test]
fn consult_empty_list() {
    let mut machine = base_machine();
    let before = user_procedures(&machine);

    assert!(consult(&mut machine, &Term::list(vec![])).unwrap());
    assert_eq!(user_procedures(&machine), before);
    assert_eq!(listing(&machine, pi!("foo", 1)), vec!["foo(c)."]);
}

#[test]
fn consult_list() {
    let mut machine = base_machine();

    assert!(consult(&mut machine, &Term::list(vec![empty()])).unwrap());
    assert!(consult(&mut machine, &Term::list(vec![empty(), empty()])).unwrap());
}

#[test]
fn consult_twice_reloads() {
    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = ticks.clone();

    let mut machine = MachineBuilder::new()
        .with_file_provider(FsFileProvider::new(LOADER_DIR))
        .with_builtin("tick", 0, move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        })
        .build();

    let twice = Term::atom("testdata/twice.pl");
    assert!(consult(&mut machine, &Term::list(vec![twice.clone(), twice])).unwrap());

    assert_eq!(ticks.load(Ordering::SeqCst), 2);
    assert_eq!(listing(&machine, pi!("bar", 1)), vec!["bar(a).", "bar(b)."]);
}

#[test]
fn consult_incomplete_file() {
    let mut machine = base_machine();
    let abc = Term::atom("testdata/abc.txt");

    for files in [abc.clone(), Term::list(vec![abc])] {
        assert!(matches!(
            consult(&mut machine, &files),
            Err(MachineError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof
        ));
    }
}

#[test]
fn consult_variable() {
    let mut machine = base_machine();

    assert!(matches!(
        consult(&mut machine, &Term::var("X")),
        Err(MachineError::Instantiation)
    ));
}

#[test]
fn consult_compound() {
    let mut machine = base_machine();
    let files = Term::compound("foo", vec![Term::atom("bar")]);

    assert!(matches!(
        consult(&mut machine, &files),
        Err(MachineError::Type(ValidType::Atom, culprit)) if culprit == files
    ));
}

#[test]
fn consult_integer() {
    let mut machine = base_machine();

    assert!(matches!(
        consult(&mut machine, &Term::int(1)),
        Err(MachineError::Type(ValidType::Atom, culprit)) if culprit == Term::int(1)
    ));
}

#[test]
fn consult_partial_list() {
    let mut machine = base_machine();
    let files = Term::partial_list(vec![empty()], Term::var("_"));

    assert!(matches!(
        consult(&mut machine, &files),
        Err(MachineError::Type(ValidType::Atom, culprit)) if culprit.is_variant(&files)
    ));
}

#[test]
fn consult_list_of_variable() {
    let mut machine = base_machine();

    assert!(matches!(
        consult(&mut machine, &Term::list(vec![Term::var("X")])),
        Err(MachineError::Instantiation)
    ));
}

#[test]
fn consult_list_of_integer() {
    let mut machine = base_machine();

    assert!(matches!(
        consult(&mut machine, &Term::list(vec![Term::int(1)])),
        Err(MachineError::Type(ValidType::Atom, culprit)) if culprit == Term::int(1)
    ));
}

#[test]
fn consult_not_found() {
    let mut machine = base_machine();
    let not_found = Term::atom("testdata/not_found.txt");

    for files in [not_found.clone(), Term::list(vec![not_found])] {
        assert!(matches!(
            consult(&mut machine, &files),
            Err(MachineError::Existence(ExistenceError::SourceSink(file)))
                if file == atom!("testdata/not_found.txt")
        ));
    }
}

#[test]
fn consult_as_directive() {
    let mut machine = base_machine();

    machine
        .compile(&Context::background(), ":- consult('testdata/foo').")
        .unwrap();

    assert_eq!(listing(&machine, pi!("foo", 0)), vec!["foo."]);

    assert!(matches!(
        machine.compile(&Context::background(), ":- consult(X)."),
        Err(MachineError::Instantiation)
    ));
}

#[test]
fn consult_cancelled() {
    let mut machine = base_machine();
    let ctx = Context::background();
    ctx.cancel_handle().cancel();

    assert!(matches!(
        machine.consult_files(&ctx, &Term::atom("testdata/foo")),
        Err(MachineError::Cancelled)
    ));
    assert!(machine.lookup(pi!("foo", 0)).is_none());
}

#[serial]
#[test]
fn consult_relative_to_working_directory() {
    let cwd = env::current_dir().unwrap();
    env::set_current_dir(LOADER_DIR).unwrap();

    let mut machine = Machine::new();
    let result = consult(&mut machine, &Term::atom("testdata/foo"));

    env::set_current_dir(cwd).unwrap();

    assert!(result.unwrap());
    assert_eq!(listing(&machine, pi!("foo", 0)), vec!["foo."]);
}

#[serial]
#[test]
fn consult_resolves_extensionless_names() {
    let cwd = env::current_dir().unwrap();
    env::set_current_dir(LOADER_DIR).unwrap();

    let mut machine = Machine::new();
    let result = consult(&mut machine, &Term::atom("testdata/twice"));

    env::set_current_dir(cwd).unwrap();

    assert!(matches!(
        result,
        Err(MachineError::Existence(ExistenceError::Procedure(pi))) if pi == pi!("tick", 0)
    ));
}
