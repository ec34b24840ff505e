use crate::atom_table::*;
use crate::heap_print::*;
use crate::machine::heap::*;
use crate::machine::machine_errors::*;
use crate::types::*;

use std::fmt;

/// The name and arity identifying a predicate.
///
/// Indicators order by name, then arity, so iterating a sorted database is
/// deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcedureIndicator {
    /// The predicate name.
    pub name: Atom,
    /// The number of arguments.
    pub arity: usize,
}

impl ProcedureIndicator {
    /// The indicator `name/arity`.
    #[inline]
    pub fn new(name: Atom, arity: usize) -> Self {
        ProcedureIndicator { name, arity }
    }

    /// The indicator of a callable term, or `None` for variables and
    /// numbers.
    #[inline]
    pub fn of_callable(heap: &Heap, t: TermRef) -> Option<Self> {
        heap.name_and_arity(t)
            .map(|(name, arity)| ProcedureIndicator::new(name, arity))
    }

    /// Reads a `Name/Arity` term.
    pub fn from_term(heap: &Heap, t: TermRef) -> Result<Self, MachineError> {
        let args = match heap.view(t) {
            TermView::Var(_) => return Err(MachineError::Instantiation),
            TermView::Str(name, args) if name == atom!("/") && args.len() == 2 => args,
            _ => return Err(MachineError::type_error(ValidType::PredicateIndicator, heap, t)),
        };

        let (name, arity) = (args[0], args[1]);

        let name = match heap.view(name) {
            TermView::Var(_) => return Err(MachineError::Instantiation),
            TermView::Literal(Literal::Atom(name)) => *name,
            _ => return Err(MachineError::type_error(ValidType::Atom, heap, name)),
        };

        match heap.view(arity) {
            TermView::Var(_) => Err(MachineError::Instantiation),
            TermView::Literal(&Literal::Fixnum(n)) if n >= 0 => {
                Ok(ProcedureIndicator::new(name, n as usize))
            }
            TermView::Literal(Literal::Fixnum(_)) => {
                Err(MachineError::type_error(ValidType::PredicateIndicator, heap, t))
            }
            _ => Err(MachineError::type_error(ValidType::Integer, heap, arity)),
        }
    }

    /// The term `Name/Arity`.
    #[inline]
    pub fn to_term(self) -> Term {
        Term::indicator(self.name, self.arity)
    }
}

impl fmt::Display for ProcedureIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", quoted_atom(self.name), self.arity)
    }
}

/// A top-level term, sorted by shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopLevel {
    /// The goal of `:- Goal` or `?- Goal`.
    Directive(TermRef),
    /// A fact or a rule.
    Clause(TermRef),
}

impl TopLevel {
    /// Sorts a term read from a source.
    pub fn classify(heap: &Heap, t: TermRef) -> Self {
        match heap.view(t) {
            TermView::Str(name, args)
                if args.len() == 1 && (name == atom!(":-") || name == atom!("?-")) =>
            {
                TopLevel::Directive(args[0])
            }
            _ => TopLevel::Clause(t),
        }
    }
}

/// The directives the loader recognizes. Anything else is a goal run
/// through the call mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// `dynamic(Spec)`.
    Dynamic(TermRef),
    /// `multifile(Spec)`.
    Multifile(TermRef),
    /// `discontiguous(Spec)`.
    Discontiguous(TermRef),
    /// `include(File)`.
    Include(TermRef),
    /// `ensure_loaded(File)`.
    EnsureLoaded(TermRef),
    /// `initialization(Goal)`, run once the load completes.
    Initialization(TermRef),
    /// Any other goal, run at once.
    Goal(TermRef),
}

impl Directive {
    /// Recognizes the directive `goal` stands for.
    pub fn from_goal(heap: &Heap, goal: TermRef) -> Self {
        let arg = match heap.view(goal) {
            TermView::Str(_, args) if args.len() == 1 => args[0],
            _ => return Directive::Goal(goal),
        };

        match heap.name_and_arity(goal) {
            Some((name, 1)) => match name.as_str() {
                "dynamic" => Directive::Dynamic(arg),
                "multifile" => Directive::Multifile(arg),
                "discontiguous" => Directive::Discontiguous(arg),
                "include" => Directive::Include(arg),
                "ensure_loaded" => Directive::EnsureLoaded(arg),
                "initialization" => Directive::Initialization(arg),
                _ => Directive::Goal(goal),
            },
            _ => Directive::Goal(goal),
        }
    }

    /// True for directives that splice another source into this one.
    #[inline]
    pub fn is_inclusion(self) -> bool {
        matches!(self, Directive::Include(_) | Directive::EnsureLoaded(_))
    }
}

/// Flattens nested applications of the binary operator `op`, left to right.
pub fn unfold_by_str(heap: &Heap, t: TermRef, op: Atom) -> Vec<TermRef> {
    let mut terms = vec![];
    let mut stack = vec![t];

    while let Some(t) = stack.pop() {
        match heap.view(t) {
            TermView::Str(name, args) if name == op && args.len() == 2 => {
                stack.push(args[1]);
                stack.push(args[0]);
            }
            _ => terms.push(heap.deref(t)),
        }
    }

    terms
}

/// Reads the argument of a declaration: one `Name/Arity`, a conjunction of
/// them, or a proper list of them.
pub fn declared_indicators(
    heap: &Heap,
    spec: TermRef,
) -> Result<Vec<ProcedureIndicator>, MachineError> {
    if heap.is_var(spec) {
        return Err(MachineError::Instantiation);
    }

    let specs = match heap.list_shape(spec) {
        ListShape::Proper(items) if heap.as_atom(spec) != Some(atom!("[]")) => items,
        ListShape::Partial(..) => return Err(MachineError::Instantiation),
        _ => unfold_by_str(heap, spec, atom!(",")),
    };

    specs
        .into_iter()
        .map(|spec| ProcedureIndicator::from_term(heap, spec))
        .collect()
}
