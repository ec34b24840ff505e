use crate::atom_table::*;

use dashu::Integer;
use ordered_float::OrderedFloat;
use smallvec::SmallVec;

use std::convert::TryFrom;
use std::mem;
use std::sync::Arc;

/// A handle to a cell of the term [`Heap`](crate::machine::heap::Heap).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermRef(u32);

const_assert!(mem::size_of::<TermRef>() == 4);

impl TermRef {
    #[inline]
    pub(crate) fn new(index: usize) -> Self {
        TermRef(index as u32)
    }

    /// The position of the cell in the heap.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An atomic constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    /// An atom.
    Atom(Atom),
    /// An integer that fits in 64 bits.
    Fixnum(i64),
    /// An integer that does not fit in 64 bits.
    Integer(Arc<Integer>),
    /// A double precision float.
    Float(OrderedFloat<f64>),
}

impl Literal {
    /// Builds an integer literal, demoting it to a fixnum if it fits.
    pub fn from_integer(n: Integer) -> Self {
        match i64::try_from(&n) {
            Ok(n) => Literal::Fixnum(n),
            Err(_) => Literal::Integer(Arc::new(n)),
        }
    }

    #[inline]
    pub(crate) fn is_number(&self) -> bool {
        !matches!(self, Literal::Atom(_))
    }
}

impl From<Atom> for Literal {
    #[inline]
    fn from(atom: Atom) -> Self {
        Literal::Atom(atom)
    }
}

impl From<i64> for Literal {
    #[inline]
    fn from(n: i64) -> Self {
        Literal::Fixnum(n)
    }
}

impl From<f64> for Literal {
    #[inline]
    fn from(n: f64) -> Self {
        Literal::Float(OrderedFloat(n))
    }
}

/// A logic variable cell. `binding` is `None` while the variable is free.
#[derive(Debug, Clone)]
pub struct VarCell {
    pub(crate) name: Option<Arc<str>>,
    pub(crate) binding: Option<TermRef>,
}

/// One cell of the term heap.
#[derive(Debug, Clone)]
pub enum HeapCell {
    /// An atomic constant.
    Literal(Literal),
    /// A compound term: functor name and argument handles.
    Str(Atom, SmallVec<[TermRef; 4]>),
    /// A logic variable.
    Var(VarCell),
}

/// A variable of an owned [`Term`].
///
/// `id` identifies the variable within one term. Variables taken from the
/// heap use the heap index of their cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TermVar {
    /// Identity of the variable.
    pub id: usize,
    /// Source name, if the variable had one.
    pub name: Option<Arc<str>>,
}

/// A term that owns its structure, independent of any heap.
///
/// Owned terms carry error culprits and exception balls out of a machine
/// and carry host values into one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// An atomic constant.
    Literal(Literal),
    /// A compound term with at least one argument.
    Compound(Atom, Vec<Term>),
    /// A variable.
    Var(TermVar),
}

impl Term {
    /// An atom.
    pub fn atom(name: &str) -> Self {
        Term::Literal(Literal::Atom(atom!(name)))
    }

    /// An integer.
    pub fn int(n: i64) -> Self {
        Term::Literal(Literal::Fixnum(n))
    }

    /// A float.
    pub fn float(n: f64) -> Self {
        Term::Literal(Literal::from(n))
    }

    /// A variable identified by its name.
    pub fn var(name: &str) -> Self {
        Term::Var(TermVar {
            id: 0,
            name: Some(Arc::from(name)),
        })
    }

    /// `name(args...)`, or the bare atom when `args` is empty.
    pub fn compound(name: &str, args: Vec<Term>) -> Self {
        Term::apply(atom!(name), args)
    }

    /// `name(args...)`, or the bare atom when `args` is empty.
    pub fn apply(name: Atom, args: Vec<Term>) -> Self {
        if args.is_empty() {
            Term::Literal(Literal::Atom(name))
        } else {
            Term::Compound(name, args)
        }
    }

    /// A proper list of `items`.
    pub fn list(items: Vec<Term>) -> Self {
        Term::partial_list(items, Term::atom("[]"))
    }

    /// A list of `items` ending in `tail`.
    pub fn partial_list(items: Vec<Term>, tail: Term) -> Self {
        items
            .into_iter()
            .rev()
            .fold(tail, |tail, head| Term::Compound(atom!("."), vec![head, tail]))
    }

    /// The predicate indicator term `name/arity`.
    pub fn indicator(name: Atom, arity: usize) -> Self {
        Term::Compound(
            atom!("/"),
            vec![
                Term::Literal(Literal::Atom(name)),
                Term::int(arity as i64),
            ],
        )
    }

    /// The functor name and arity of an atom or compound.
    pub fn name_and_arity(&self) -> Option<(Atom, usize)> {
        match self {
            Term::Literal(Literal::Atom(name)) => Some((*name, 0)),
            Term::Compound(name, args) => Some((*name, args.len())),
            _ => None,
        }
    }

    /// True if the two terms are equal up to a consistent renaming of their
    /// variables.
    pub fn is_variant(&self, other: &Term) -> bool {
        let mut left = vec![];
        let mut right = vec![];
        let mut stack = vec![(self, other)];

        while let Some(pair) = stack.pop() {
            match pair {
                (Term::Literal(a), Term::Literal(b)) if a == b => {}
                (Term::Compound(f, xs), Term::Compound(g, ys))
                    if f == g && xs.len() == ys.len() =>
                {
                    stack.extend(xs.iter().zip(ys).rev());
                }
                (Term::Var(x), Term::Var(y)) => {
                    let i = left.iter().position(|id| *id == x.id);
                    let j = right.iter().position(|id| *id == y.id);

                    match (i, j) {
                        (None, None) => {
                            left.push(x.id);
                            right.push(y.id);
                        }
                        (i, j) if i == j => {}
                        _ => return false,
                    }
                }
                _ => return false,
            }
        }

        true
    }
}

// arguments are released from a worklist so that long lists do not drop
// through one native frame per cell.
impl Drop for Term {
    fn drop(&mut self) {
        if let Term::Compound(_, args) = self {
            let mut stack = mem::take(args);

            while let Some(mut term) = stack.pop() {
                if let Term::Compound(_, args) = &mut term {
                    stack.append(args);
                }
            }
        }
    }
}

impl From<Atom> for Term {
    #[inline]
    fn from(atom: Atom) -> Self {
        Term::Literal(Literal::Atom(atom))
    }
}

impl From<Literal> for Term {
    #[inline]
    fn from(literal: Literal) -> Self {
        Term::Literal(literal)
    }
}
