use crate::atom_table::*;
use crate::forms::*;
use crate::machine::heap::*;
use crate::parser::ast::*;
use crate::types::*;

use std::error::Error;
use std::fmt;
use std::io;

// from 7.12.2 b) of 13211-1:1995
/// The expected type named by a type error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidType {
    /// An atom.
    Atom,
    /// An atom or compound.
    Callable,
    /// An integer.
    Integer,
    /// A proper list.
    List,
    /// A `Name/Arity` term.
    PredicateIndicator,
}

impl ValidType {
    /// The name of the type in an error term.
    pub fn as_atom(self) -> Atom {
        match self {
            ValidType::Atom => atom!("atom"),
            ValidType::Callable => atom!("callable"),
            ValidType::Integer => atom!("integer"),
            ValidType::List => atom!("list"),
            ValidType::PredicateIndicator => atom!("predicate_indicator"),
        }
    }
}

/// Something referred to that does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExistenceError {
    /// A called predicate with no definition.
    Procedure(ProcedureIndicator),
    /// A source the file provider cannot find.
    SourceSink(Atom),
}

impl ExistenceError {
    fn as_term(&self) -> Term {
        match self {
            ExistenceError::Procedure(pi) => Term::apply(
                atom!("existence_error"),
                vec![Term::atom("procedure"), pi.to_term()],
            ),
            ExistenceError::SourceSink(name) => Term::apply(
                atom!("existence_error"),
                vec![Term::atom("source_sink"), Term::from(*name)],
            ),
        }
    }
}

/// An operation refused on an existing object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    /// Clauses or declarations for a host built-in.
    ModifyStaticProcedure(ProcedureIndicator),
    /// A source that includes itself, directly or transitively.
    OpenSourceSink(Atom),
}

impl PermissionError {
    fn as_term(&self) -> Term {
        let (action, kind, culprit) = match self {
            PermissionError::ModifyStaticProcedure(pi) => {
                (atom!("modify"), atom!("static_procedure"), pi.to_term())
            }
            PermissionError::OpenSourceSink(name) => {
                (atom!("open"), atom!("source_sink"), Term::from(*name))
            }
        };

        Term::apply(
            atom!("permission_error"),
            vec![Term::from(action), Term::from(kind), culprit],
        )
    }
}

/// Everything that can abort a compile or a consult.
#[derive(Debug)]
pub enum MachineError {
    /// An unbound variable where a bound term is required.
    Instantiation,
    /// A term of the wrong type; the second field is the culprit.
    Type(ValidType, Term),
    /// A missing procedure or source.
    Existence(ExistenceError),
    /// A refused modification or open.
    Permission(PermissionError),
    /// A clause resumed a predicate after clauses of another predicate.
    Discontiguous(ProcedureIndicator),
    /// A ball thrown by a directive or by term expansion.
    Exception(Term),
    /// A directive goal that failed.
    FailedDirective(Term),
    /// An initialization goal that failed.
    FailedInitialization(Term),
    /// A source that could not be read as terms.
    Syntax(ParserError),
    /// A failed read on a source, passed through as it was raised.
    Io(io::Error),
    /// The context was cancelled or its deadline passed.
    Cancelled,
}

impl MachineError {
    #[inline]
    pub(crate) fn type_error(valid_type: ValidType, heap: &Heap, culprit: TermRef) -> Self {
        MachineError::Type(valid_type, heap.snapshot(culprit))
    }

    /// The formal part of the ISO `error/2` term, for the errors that have
    /// one.
    pub fn formal_term(&self) -> Option<Term> {
        match self {
            MachineError::Instantiation => Some(Term::atom("instantiation_error")),
            MachineError::Type(valid_type, culprit) => Some(Term::apply(
                atom!("type_error"),
                vec![Term::from(valid_type.as_atom()), culprit.clone()],
            )),
            MachineError::Existence(err) => Some(err.as_term()),
            MachineError::Permission(err) => Some(err.as_term()),
            MachineError::Syntax(err) => Some(Term::apply(
                atom!("syntax_error"),
                vec![Term::from(err.as_atom())],
            )),
            _ => None,
        }
    }

    /// The error as a term: the ball itself for [`MachineError::Exception`],
    /// otherwise `error(Formal, _)`. Conditions without a formal term are
    /// reported as `system_error(Message)`.
    pub fn to_term(&self) -> Term {
        if let MachineError::Exception(ball) = self {
            return ball.clone();
        }

        let formal = self.formal_term().unwrap_or_else(|| {
            Term::apply(
                atom!("system_error"),
                vec![Term::from(Atom::build_with(&self.to_string()))],
            )
        });

        Term::apply(
            atom!("error"),
            vec![formal, Term::Var(TermVar { id: 0, name: None })],
        )
    }

    /// Builds [`MachineError::to_term`] on `heap`.
    pub fn to_ball(&self, heap: &mut Heap) -> TermRef {
        heap.build(&self.to_term())
    }
}

impl fmt::Display for MachineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineError::Discontiguous(pi) => write!(f, "{} is discontiguous", pi),
            MachineError::Exception(ball) => write!(f, "unhandled exception: {}", ball),
            MachineError::FailedDirective(goal) => write!(f, "failed directive: {}", goal),
            MachineError::FailedInitialization(goal) => {
                write!(f, "failed initialization goal: {}", goal)
            }
            MachineError::Syntax(err) => write!(f, "{}", err),
            MachineError::Io(err) => write!(f, "{}", err),
            MachineError::Cancelled => write!(f, "load cancelled"),
            err => match err.formal_term() {
                Some(formal) => write!(f, "{}", formal),
                None => Ok(()),
            },
        }
    }
}

impl Error for MachineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MachineError::Syntax(err) => Some(err),
            MachineError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ParserError> for MachineError {
    #[inline]
    fn from(err: ParserError) -> Self {
        match err {
            ParserError::IO(err) => MachineError::Io(err),
            err => MachineError::Syntax(err),
        }
    }
}

impl From<io::Error> for MachineError {
    #[inline]
    fn from(err: io::Error) -> Self {
        MachineError::Io(err)
    }
}

impl From<ExistenceError> for MachineError {
    #[inline]
    fn from(err: ExistenceError) -> Self {
        MachineError::Existence(err)
    }
}

impl From<PermissionError> for MachineError {
    #[inline]
    fn from(err: PermissionError) -> Self {
        MachineError::Permission(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discontiguous_message() {
        let err = MachineError::Discontiguous(pi!("foo", 1));
        assert_eq!(err.to_string(), "foo/1 is discontiguous");
    }

    #[test]
    fn textual_conditions() {
        let goal = Term::compound("foo", vec![Term::atom("d")]);

        assert_eq!(
            MachineError::FailedDirective(goal.clone()).to_string(),
            "failed directive: foo(d)"
        );
        assert_eq!(
            MachineError::FailedInitialization(goal).to_string(),
            "failed initialization goal: foo(d)"
        );
    }

    #[test]
    fn iso_error_terms() {
        let err = MachineError::Type(ValidType::Callable, Term::int(1));
        assert_eq!(err.to_string(), "type_error(callable,1)");

        let err = MachineError::Existence(ExistenceError::Procedure(pi!("bar", 0)));
        assert_eq!(err.to_string(), "existence_error(procedure,bar/0)");

        let err = MachineError::Permission(PermissionError::OpenSourceSink(atom!("a.pl")));
        assert_eq!(err.to_string(), "permission_error(open,source_sink,'a.pl')");

        let mut heap = Heap::new();
        let ball = MachineError::Instantiation.to_ball(&mut heap);

        assert_eq!(heap.name_and_arity(ball), Some((atom!("error"), 2)));
        assert_eq!(
            heap.as_atom(heap.args(ball)[0]),
            Some(atom!("instantiation_error"))
        );
    }

    #[test]
    fn parser_io_errors_pass_through() {
        let err = MachineError::from(ParserError::unexpected_eof());
        assert!(matches!(err, MachineError::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));

        let err = MachineError::from(ParserError::MissingQuote(0, 0));
        assert!(matches!(err, MachineError::Syntax(ParserError::MissingQuote(..))));
    }

    #[test]
    fn exceptions_are_their_own_ball() {
        let err = MachineError::Exception(Term::atom("ball"));
        assert_eq!(err.to_term(), Term::atom("ball"));
    }
}
