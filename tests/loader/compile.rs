use crate::helper::*;

use prolog_vm::*;

use std::io::ErrorKind;
use std::time::Instant;

fn compile(machine: &mut Machine, text: &str) -> Result<(), MachineError> {
    machine.compile(&Context::background(), text)
}

#[test]
fn shebang() {
    let mut machine = base_machine();
    compile(&mut machine, "#!/foo/bar\nfoo(a).\n").unwrap();

    let views = clause_views(&machine, pi!("foo", 1));
    assert_eq!(views.len(), 1);
    assert_fact(&views[0], "foo", "a");
}

#[test]
fn shebang_without_following_lines() {
    let mut machine = base_machine();
    compile(&mut machine, "#!/foo/bar").unwrap();

    let views = clause_views(&machine, pi!("foo", 1));
    assert_eq!(views.len(), 1);
    assert_fact(&views[0], "foo", "c");
}

#[test]
fn facts() {
    let mut machine = base_machine();
    compile(&mut machine, "foo(a).\nfoo(b).\n").unwrap();

    let views = clause_views(&machine, pi!("foo", 1));
    assert_eq!(views.len(), 2);
    assert_fact(&views[0], "foo", "a");
    assert_fact(&views[1], "foo", "b");

    let procedure = user_defined(&machine, pi!("foo", 1));
    assert_eq!(procedure.flags, PredicateFlags::default());
}

#[test]
fn rules() {
    let mut machine = base_machine();
    compile(
        &mut machine,
        "
foo(c).
bar(X) :- foo(X).
baz(X) :- bar(X).
",
    )
    .unwrap();

    assert_eq!(
        user_procedures(&machine),
        vec![pi!("bar", 1), pi!("baz", 1), pi!("foo", 1)]
    );

    for (pi, callee) in [(pi!("bar", 1), pi!("foo", 1)), (pi!("baz", 1), pi!("bar", 1))] {
        let views = clause_views(&machine, pi);
        assert_eq!(views.len(), 1);

        let view = &views[0];
        let expected = Term::compound(
            ":-",
            vec![
                Term::apply(pi.name, vec![Term::var("X")]),
                Term::apply(callee.name, vec![Term::var("X")]),
            ],
        );

        assert!(view.raw.is_variant(&expected));
        assert_eq!(view.xr_table, vec![callee.to_term()]);
        assert!(matches!(
            &view.vars[..],
            [Term::Var(TermVar { name: Some(name), .. })] if &**name == "X"
        ));
        assert_eq!(
            view.bytecode,
            vec![
                Instruction::Var(0),
                Instruction::Enter,
                Instruction::Var(0),
                Instruction::Call(0),
                Instruction::Exit,
            ]
        );
    }
}

#[test]
fn templates_share_clause_variables() {
    let mut machine = base_machine();
    compile(&mut machine, "p(f(X, a), X).\nq(G) :- G.\n").unwrap();

    let views = clause_views(&machine, pi!("p", 2));
    let view = &views[0];

    assert_eq!(view.vars.len(), 1);
    assert_eq!(view.xr_table.len(), 1);
    assert!(view.xr_table[0]
        .is_variant(&Term::compound("f", vec![Term::var("X"), Term::atom("a")])));
    assert_eq!(
        view.bytecode,
        vec![Instruction::Const(0), Instruction::Var(0), Instruction::Exit]
    );

    let views = clause_views(&machine, pi!("q", 1));
    assert_eq!(views[0].xr_table, vec![pi!("call", 1).to_term()]);
    assert_eq!(
        views[0].bytecode,
        vec![
            Instruction::Var(0),
            Instruction::Enter,
            Instruction::Var(0),
            Instruction::Call(0),
            Instruction::Exit,
        ]
    );
}

#[test]
fn dynamic() {
    let mut machine = base_machine();
    compile(&mut machine, ":- dynamic(foo/1).\nfoo(a).\nfoo(b).\n").unwrap();

    let procedure = user_defined(&machine, pi!("foo", 1));
    assert!(procedure.flags.dynamic);
    assert!(procedure.flags.public);
    assert!(!procedure.flags.multifile);

    let views = clause_views(&machine, pi!("foo", 1));
    assert_eq!(views.len(), 2);
    assert_fact(&views[0], "foo", "a");
    assert_fact(&views[1], "foo", "b");
}

#[test]
fn dynamic_without_clauses() {
    let mut machine = base_machine();
    compile(&mut machine, ":- dynamic(qux/1).").unwrap();

    let procedure = user_defined(&machine, pi!("qux", 1));
    assert!(procedure.is_empty());
    assert!(procedure.flags.dynamic);
    assert!(procedure.flags.public);
}

#[test]
fn declarations_take_lists_and_conjunctions() {
    let mut machine = base_machine();
    compile(&mut machine, ":- dynamic([p/0, q/1]).\n:- dynamic((r/2, s/3)).\n").unwrap();

    for pi in [pi!("p", 0), pi!("q", 1), pi!("r", 2), pi!("s", 3)] {
        assert!(user_defined(&machine, pi).flags.dynamic);
    }
}

#[test]
fn multifile() {
    let mut machine = multifile_base_machine();
    compile(&mut machine, ":- multifile(foo/1).\nfoo(a).\nfoo(b).\n").unwrap();

    let procedure = user_defined(&machine, pi!("foo", 1));
    assert!(procedure.flags.multifile);

    let views = clause_views(&machine, pi!("foo", 1));
    assert_eq!(views.len(), 3);
    assert_fact(&views[0], "foo", "c");
    assert_fact(&views[1], "foo", "a");
    assert_fact(&views[2], "foo", "b");
}

#[test]
fn multifile_clauses_accumulate_across_compiles() {
    let mut machine = multifile_base_machine();

    compile(&mut machine, "foo(a).").unwrap();
    compile(&mut machine, "bar(x).\nfoo(b).\n").unwrap();

    assert_eq!(
        listing(&machine, pi!("foo", 1)),
        vec!["foo(c).", "foo(a).", "foo(b)."]
    );
}

#[test]
fn dynamic_procedures_survive_later_compiles() {
    let mut machine = base_machine();

    compile(&mut machine, ":- dynamic(foo/1). foo(a).").unwrap();
    compile(&mut machine, "foo(b).").unwrap();

    let procedure = user_defined(&machine, pi!("foo", 1));
    assert!(procedure.flags.dynamic);
    assert!(procedure.flags.public);
    assert_eq!(listing(&machine, pi!("foo", 1)), vec!["foo(a).", "foo(b)."]);
}

#[test]
fn multifile_clauses_accumulate_across_includes() {
    let mut machine = multifile_base_machine();

    compile(&mut machine, "foo(a).\n:- include('testdata/more_foo.pl').\nfoo(b).\n").unwrap();
    compile(&mut machine, ":- include('testdata/more_foo.pl').\n").unwrap();

    assert_eq!(
        listing(&machine, pi!("foo", 1)),
        vec!["foo(c).", "foo(a).", "foo(d).", "foo(b).", "foo(d)."]
    );
}

#[test]
fn discontiguous() {
    let mut machine = base_machine();
    compile(
        &mut machine,
        "
:- discontiguous(foo/1).
foo(a).
bar(a).
foo(b).
",
    )
    .unwrap();

    let procedure = user_defined(&machine, pi!("foo", 1));
    assert!(procedure.flags.discontiguous);

    let views = clause_views(&machine, pi!("foo", 1));
    assert_eq!(views.len(), 2);
    assert_fact(&views[0], "foo", "a");
    assert_fact(&views[1], "foo", "b");

    let views = clause_views(&machine, pi!("bar", 1));
    assert_eq!(views.len(), 1);
    assert_fact(&views[0], "bar", "a");
}

#[test]
fn include() {
    let mut machine = base_machine();
    compile(&mut machine, ":- include('testdata/foo').\n").unwrap();

    let views = clause_views(&machine, pi!("foo", 0));
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].raw, Term::atom("foo"));
    assert!(views[0].xr_table.is_empty());
    assert_eq!(views[0].bytecode, vec![Instruction::Exit]);

    assert_eq!(listing(&machine, pi!("foo", 1)), vec!["foo(c)."]);
}

#[test]
fn ensure_loaded() {
    let mut machine = base_machine();
    compile(&mut machine, ":- ensure_loaded('testdata/foo').\n").unwrap();

    assert_eq!(listing(&machine, pi!("foo", 0)), vec!["foo."]);
    assert_eq!(listing(&machine, pi!("foo", 1)), vec!["foo(c)."]);
}

#[test]
fn initialization() {
    let mut machine = multifile_base_machine();
    compile(&mut machine, ":- initialization(foo(c)).\n").unwrap();

    assert_eq!(listing(&machine, pi!("foo", 1)), vec!["foo(c)."]);
}

#[test]
fn predicate_backed_directive() {
    let mut machine = multifile_base_machine();
    compile(&mut machine, ":- foo(c).\n").unwrap();

    assert_eq!(listing(&machine, pi!("foo", 1)), vec!["foo(c)."]);
}

#[test]
fn placeholders() {
    let mut machine = base_machine();

    machine
        .compile_with_args(
            &Context::background(),
            "foo(?).\nbar(?, ?).\n",
            &[Term::atom("a"), Term::int(1), Term::var("X")],
        )
        .unwrap();

    assert_fact(&clause_views(&machine, pi!("foo", 1))[0], "foo", "a");
    assert_eq!(clause_views(&machine, pi!("bar", 2))[0].vars.len(), 1);

    let err = machine
        .compile_with_args(&Context::background(), "foo(?, ?).", &[Term::atom("a")])
        .unwrap_err();

    assert!(matches!(
        err,
        MachineError::Syntax(ParserError::MissingPlaceholderArgument(..))
    ));
}

#[test]
fn round_trip() {
    let mut machine = base_machine();
    compile(
        &mut machine,
        "bar(X, [a|Y], 'B c', -1) :- foo(X), \\+ baz(Y), (X = a -> true ; fail).",
    )
    .unwrap();

    let text = listing(&machine, pi!("bar", 4)).join("\n");

    let mut other = base_machine();
    compile(&mut other, &text).unwrap();

    let original = &clause_views(&machine, pi!("bar", 4))[0];
    let reread = &clause_views(&other, pi!("bar", 4))[0];

    assert!(original.raw.is_variant(&reread.raw));
    assert_eq!(original.bytecode, reread.bytecode);
}

#[test]
fn error_syntax() {
    let mut machine = base_machine();

    assert!(matches!(
        compile(&mut machine, "\nfoo().\n"),
        Err(MachineError::Syntax(ParserError::UnexpectedToken(..)))
    ));
}

#[test]
fn error_incomplete_term() {
    let mut machine = base_machine();

    assert!(matches!(
        compile(&mut machine, "foo(a"),
        Err(MachineError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof
    ));
}

#[test]
fn error_expansion() {
    let mut machine = base_machine();

    let err = compile(
        &mut machine,
        ":- ensure_loaded('testdata/break_term_expansion').\nfoo(a).\n",
    )
    .unwrap_err();

    assert!(matches!(err, MachineError::Exception(ball) if ball == Term::atom("ball")));
    assert_eq!(listing(&machine, pi!("foo", 1)), vec!["foo(c)."]);
}

#[test]
fn error_variable_fact() {
    let mut machine = base_machine();

    assert!(matches!(
        compile(&mut machine, "\nX.\n"),
        Err(MachineError::Instantiation)
    ));
}

#[test]
fn error_variable_rule() {
    let mut machine = base_machine();

    assert!(matches!(
        compile(&mut machine, "\nX :- X.\n"),
        Err(MachineError::Instantiation)
    ));
}

#[test]
fn error_non_callable_rule_body() {
    let mut machine = base_machine();

    assert!(matches!(
        compile(&mut machine, "\nfoo :- 1.\n"),
        Err(MachineError::Type(ValidType::Callable, culprit)) if culprit == Term::int(1)
    ));
}

#[test]
fn error_non_indicator_argument() {
    let mut machine = base_machine();

    assert!(matches!(
        compile(&mut machine, "\n:- dynamic(foo).\n"),
        Err(MachineError::Type(ValidType::PredicateIndicator, culprit))
            if culprit == Term::atom("foo")
    ));
}

#[test]
fn error_included_variable() {
    let mut machine = base_machine();

    assert!(matches!(
        compile(&mut machine, "\n:- include(X).\n"),
        Err(MachineError::Instantiation)
    ));
}

#[test]
fn error_included_file_not_found() {
    let mut machine = base_machine();

    assert!(matches!(
        compile(&mut machine, "\n:- include('testdata/not_found').\n"),
        Err(MachineError::Existence(ExistenceError::SourceSink(file)))
            if file == atom!("testdata/not_found")
    ));
}

#[test]
fn error_included_non_atom() {
    let mut machine = base_machine();

    assert!(matches!(
        compile(&mut machine, "\n:- include(1).\n"),
        Err(MachineError::Type(ValidType::Atom, culprit)) if culprit == Term::int(1)
    ));
}

#[test]
fn error_initialization_exception() {
    let mut machine = base_machine();

    let err = compile(&mut machine, "\n:- initialization(bar).\n").unwrap_err();

    assert!(matches!(
        err,
        MachineError::Existence(ExistenceError::Procedure(pi)) if pi == pi!("bar", 0)
    ));
    assert_eq!(
        err.formal_term(),
        Some(Term::compound(
            "existence_error",
            vec![Term::atom("procedure"), Term::indicator(atom!("bar"), 0)]
        ))
    );
}

#[test]
fn error_initialization_failure() {
    let mut machine = multifile_base_machine();

    let err = compile(&mut machine, "\n:- initialization(foo(d)).\n").unwrap_err();
    assert_eq!(err.to_string(), "failed initialization goal: foo(d)");
}

#[test]
fn error_predicate_backed_directive_exception() {
    let mut machine = base_machine();

    assert!(matches!(
        compile(&mut machine, "\n:- bar.\n"),
        Err(MachineError::Existence(ExistenceError::Procedure(pi))) if pi == pi!("bar", 0)
    ));

    let ball = Term::compound("oops", vec![Term::atom("x")]);

    assert!(matches!(
        compile(&mut machine, "\n:- throw(oops(x)).\n"),
        Err(MachineError::Exception(thrown)) if thrown == ball
    ));
}

#[test]
fn error_predicate_backed_directive_failure() {
    let mut machine = multifile_base_machine();

    let err = compile(&mut machine, "\n:- foo(d).\n").unwrap_err();
    assert_eq!(err.to_string(), "failed directive: foo(d)");
}

#[test]
fn error_discontiguous_end_of_text() {
    let mut machine = base_machine();

    assert!(matches!(
        compile(&mut machine, "\nfoo(a).\nbar(a).\nfoo(b).\n"),
        Err(MachineError::Discontiguous(pi)) if pi == pi!("foo", 1)
    ));
}

#[test]
fn error_discontiguous_before_directive() {
    let mut machine = base_machine();

    assert!(matches!(
        compile(&mut machine, "\nfoo(a).\nbar(a).\nfoo(b).\n:- foo(c).\n"),
        Err(MachineError::Discontiguous(pi)) if pi == pi!("foo", 1)
    ));
}

#[test]
fn error_discontiguous_before_other_facts() {
    let mut machine = base_machine();

    assert!(matches!(
        compile(&mut machine, "\nfoo(a).\nbar(a).\nfoo(b).\nbar(b).\n"),
        Err(MachineError::Discontiguous(pi)) if pi == pi!("foo", 1)
    ));
}

#[test]
fn error_discontiguous_across_include() {
    let mut machine = base_machine();

    assert!(matches!(
        compile(&mut machine, "foo(a).\n:- include('testdata/bar.pl').\nfoo(b).\n"),
        Err(MachineError::Discontiguous(pi)) if pi == pi!("foo", 1)
    ));
    assert_eq!(listing(&machine, pi!("bar", 1)), vec!["bar(a)."]);
}

#[test]
fn error_in_included_file_stops_the_compile() {
    let mut machine = base_machine();

    assert!(matches!(
        compile(&mut machine, "qux(a).\n:- include('testdata/broken.pl').\nqux(b).\n"),
        Err(MachineError::Type(ValidType::Callable, culprit)) if culprit == Term::int(1)
    ));
    assert_eq!(listing(&machine, pi!("qux", 1)), vec!["qux(a)."]);
    assert_eq!(listing(&machine, pi!("baz", 1)), vec!["baz(a)."]);
    assert!(listing(&machine, pi!("baz", 0)).is_empty());
}

#[test]
fn long_bodies_and_long_lists() {
    let mut machine = base_machine();
    let body = vec!["true"; 5000].join(", ");
    let items = vec!["1"; 20_000].join(",");

    compile(&mut machine, &format!("p :- {}.\nq([{}]).\n", body, items)).unwrap();

    let views = clause_views(&machine, pi!("p", 0));
    assert_eq!(views[0].bytecode.len(), 5002);

    let text = listing(&machine, pi!("q", 1));
    assert_eq!(text, vec![format!("q([{}]).", items)]);
}

#[test]
fn errors_keep_earlier_clauses() {
    let mut machine = base_machine();

    assert!(compile(&mut machine, "foo(a).\nfoo(b).\nfoo :- 1.\n").is_err());
    assert_eq!(listing(&machine, pi!("foo", 1)), vec!["foo(a).", "foo(b)."]);
}

#[test]
fn discontiguous_error_message() {
    let err = MachineError::Discontiguous(pi!("foo", 1));
    assert_eq!(err.to_string(), "foo/1 is discontiguous");
}

#[test]
fn expired_deadlines_cancel() {
    let mut machine = base_machine();
    let ctx = Context::with_deadline(Instant::now());

    assert!(matches!(
        machine.compile(&ctx, "foo(a)."),
        Err(MachineError::Cancelled)
    ));
    assert_eq!(listing(&machine, pi!("foo", 1)), vec!["foo(c)."]);
}
