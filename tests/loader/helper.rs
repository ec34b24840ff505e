use prolog_vm::*;

/// Where the fixture files live. File names in the tests are relative to it.
pub const LOADER_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/loader");

/// A machine reading files from the fixture directory, with `foo(c)`
/// already loaded.
pub fn base_machine() -> Machine {
    let mut machine = MachineBuilder::new()
        .with_file_provider(FsFileProvider::new(LOADER_DIR))
        .build();

    machine
        .compile(&Context::background(), "foo(c).")
        .expect("base program loads");

    machine
}

/// Like [`base_machine`], but `foo/1` is multifile.
pub fn multifile_base_machine() -> Machine {
    let mut machine = MachineBuilder::new()
        .with_file_provider(FsFileProvider::new(LOADER_DIR))
        .build();

    machine
        .compile(&Context::background(), ":- multifile(foo/1). foo(c).")
        .expect("base program loads");

    machine
}

/// A compiled clause with its heap references resolved.
#[derive(Debug)]
pub struct ClauseView {
    pub raw: Term,
    pub xr_table: Vec<Term>,
    pub vars: Vec<Term>,
    pub bytecode: Vec<Instruction>,
}

pub fn clause_views(machine: &Machine, pi: ProcedureIndicator) -> Vec<ClauseView> {
    let heap = machine.heap();

    user_defined(machine, pi)
        .clauses()
        .map(|clause| ClauseView {
            raw: heap.snapshot(clause.raw),
            xr_table: clause
                .xr_table
                .iter()
                .map(|entry| match *entry {
                    XrEntry::Term(t) => heap.snapshot(t),
                    XrEntry::Procedure(pi) => pi.to_term(),
                })
                .collect(),
            vars: clause.vars.iter().map(|&v| heap.snapshot(v)).collect(),
            bytecode: clause.bytecode.clone(),
        })
        .collect()
}

pub fn user_defined(machine: &Machine, pi: ProcedureIndicator) -> &UserDefined {
    machine
        .lookup(pi)
        .and_then(Procedure::as_user_defined)
        .unwrap_or_else(|| panic!("{pi} is not user defined"))
}

/// The clauses of `pi` written back as source text.
pub fn listing(machine: &Machine, pi: ProcedureIndicator) -> Vec<String> {
    match machine.lookup(pi).and_then(Procedure::as_user_defined) {
        Some(procedure) => procedure
            .clauses()
            .map(|clause| clause.listing(machine.heap(), machine.op_dir()))
            .collect(),
        None => vec![],
    }
}

/// The user-defined procedures of the machine, in indicator order.
pub fn user_procedures(machine: &Machine) -> Vec<ProcedureIndicator> {
    machine
        .procedures()
        .into_iter()
        .filter(|(_, procedure)| !procedure.is_builtin())
        .map(|(pi, _)| pi)
        .collect()
}

/// The fact `name(arg)` compiles to a single constant match.
pub fn assert_fact(view: &ClauseView, name: &str, arg: &str) {
    assert_eq!(view.raw, Term::compound(name, vec![Term::atom(arg)]));
    assert_eq!(view.xr_table, vec![Term::atom(arg)]);
    assert!(view.vars.is_empty());
    assert_eq!(view.bytecode, vec![Instruction::Const(0), Instruction::Exit]);
}
