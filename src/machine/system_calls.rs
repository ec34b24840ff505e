use crate::forms::*;
use crate::machine::heap::*;
use crate::machine::machine_errors::*;
use crate::machine::machine_indices::*;
use crate::machine::Machine;
use crate::types::*;

use std::sync::Arc;

/// The built-ins every machine starts with, unless the builder opts out.
pub fn default_builtins() -> Vec<(ProcedureIndicator, BuiltinFn)> {
    vec![
        (pi!("throw", 1), Arc::new(throw) as BuiltinFn),
        (pi!("=", 2), Arc::new(unify) as BuiltinFn),
        (pi!("consult", 1), Arc::new(consult) as BuiltinFn),
    ]
}

fn throw(machine: &mut Machine, args: &[TermRef]) -> Result<bool, MachineError> {
    let ball = args[0];

    if machine.heap.is_var(ball) {
        return Err(MachineError::Instantiation);
    }

    Err(MachineError::Exception(machine.heap.snapshot(ball)))
}

fn unify(machine: &mut Machine, args: &[TermRef]) -> Result<bool, MachineError> {
    Ok(machine.heap.unify(args[0], args[1]))
}

fn consult(machine: &mut Machine, args: &[TermRef]) -> Result<bool, MachineError> {
    let ctx = machine.context.clone();
    machine.consult(&ctx, args[0])
}

/// Expands a term through the user's `term_expansion/2`, if there is one.
///
/// The hook runs on a copy of the term. If it succeeds, its second argument
/// replaces the term; a list stands for its elements. If it fails, the term
/// is loaded as read.
pub fn expand_term(machine: &mut Machine, term: TermRef) -> Result<Vec<TermRef>, MachineError> {
    let defined = machine
        .lookup(pi!("term_expansion", 2))
        .and_then(Procedure::as_user_defined)
        .is_some_and(|p| !p.is_empty());

    if !defined {
        return Ok(vec![term]);
    }

    let trail_mark = machine.heap.trail_mark();

    let copy = machine.heap.copy_term(term);
    let expansion = machine.heap.var();
    let goal = machine
        .heap
        .apply(atom!("term_expansion"), &[copy, expansion]);

    let result = match machine.run_goal(goal) {
        Ok(true) => Ok(Some(machine.heap.snapshot(expansion))),
        Ok(false) => Ok(None),
        Err(e) => Err(e),
    };

    machine.heap.undo_to(trail_mark);

    let expansion = match result? {
        Some(expansion) => machine.heap.build(&expansion),
        None => return Ok(vec![term]),
    };

    match machine.heap.list_shape(expansion) {
        ListShape::Proper(terms) => Ok(terms),
        ListShape::Partial(..) => Err(MachineError::Instantiation),
        ListShape::Improper(terms, _) if !terms.is_empty() => {
            Err(MachineError::type_error(ValidType::List, &machine.heap, expansion))
        }
        ListShape::Improper(..) => Ok(vec![expansion]),
    }
}
