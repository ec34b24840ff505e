use crate::atom_table::*;
use crate::types::*;

use dashu::Integer;
use fxhash::FxHashMap;
use smallvec::SmallVec;

use std::cmp::Ordering;
use std::sync::Arc;

/// A dereferenced heap cell.
#[derive(Debug, Clone, Copy)]
pub enum TermView<'a> {
    /// A free variable.
    Var(TermRef),
    /// An atomic constant.
    Literal(&'a Literal),
    /// A compound term.
    Str(Atom, &'a [TermRef]),
}

/// The shape of a term read as a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListShape {
    /// A list ending in `[]`.
    Proper(Vec<TermRef>),
    /// A list ending in a free variable.
    Partial(Vec<TermRef>, TermRef),
    /// A chain of cons cells ending in anything else, including a non-list.
    Improper(Vec<TermRef>, TermRef),
}

/// The term arena.
///
/// Every term the machine reads or builds lives here and is named by a
/// [`TermRef`]. Variables are cells that either are free or hold the handle
/// of the term they are bound to; every binding is recorded on the trail so
/// that it can be undone on backtracking. Cells are never reclaimed.
#[derive(Debug, Default)]
pub struct Heap {
    cells: Vec<HeapCell>,
    trail: Vec<TermRef>,
}

#[inline]
fn literal_class(literal: &Literal) -> u8 {
    match literal {
        Literal::Float(_) => 1,
        Literal::Fixnum(_) | Literal::Integer(_) => 2,
        Literal::Atom(_) => 3,
    }
}

fn compare_literals(a: &Literal, b: &Literal) -> Ordering {
    match (a, b) {
        (Literal::Float(x), Literal::Float(y)) => x.cmp(y),
        (Literal::Fixnum(x), Literal::Fixnum(y)) => x.cmp(y),
        (Literal::Fixnum(x), Literal::Integer(y)) => Integer::from(*x).cmp(&**y),
        (Literal::Integer(x), Literal::Fixnum(y)) => (**x).cmp(&Integer::from(*y)),
        (Literal::Integer(x), Literal::Integer(y)) => x.cmp(y),
        (Literal::Atom(x), Literal::Atom(y)) => x.cmp(y),
        _ => literal_class(a).cmp(&literal_class(b)),
    }
}

impl Heap {
    /// An empty heap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cells allocated so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True if no cell was ever allocated.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub(crate) fn push(&mut self, cell: HeapCell) -> TermRef {
        let h = TermRef::new(self.cells.len());
        self.cells.push(cell);
        h
    }

    #[inline]
    pub(crate) fn cell(&self, t: TermRef) -> &HeapCell {
        &self.cells[t.index()]
    }

    /// Allocates an atomic constant.
    #[inline]
    pub fn literal(&mut self, literal: Literal) -> TermRef {
        self.push(HeapCell::Literal(literal))
    }

    /// Allocates an atom.
    #[inline]
    pub fn atom(&mut self, name: Atom) -> TermRef {
        self.literal(Literal::Atom(name))
    }

    /// Allocates an integer.
    #[inline]
    pub fn fixnum(&mut self, n: i64) -> TermRef {
        self.literal(Literal::Fixnum(n))
    }

    /// Allocates an arbitrary precision integer.
    #[inline]
    pub fn integer(&mut self, n: Integer) -> TermRef {
        self.literal(Literal::from_integer(n))
    }

    /// Allocates a float.
    #[inline]
    pub fn float(&mut self, n: f64) -> TermRef {
        self.literal(Literal::from(n))
    }

    /// Allocates a fresh anonymous variable.
    #[inline]
    pub fn var(&mut self) -> TermRef {
        self.push(HeapCell::Var(VarCell {
            name: None,
            binding: None,
        }))
    }

    /// Allocates a fresh variable that remembers its source name.
    #[inline]
    pub fn named_var(&mut self, name: &str) -> TermRef {
        self.push(HeapCell::Var(VarCell {
            name: Some(Arc::from(name)),
            binding: None,
        }))
    }

    /// Builds `name(args...)`. With no arguments this is the bare atom.
    pub fn apply(&mut self, name: Atom, args: &[TermRef]) -> TermRef {
        if args.is_empty() {
            self.atom(name)
        } else {
            self.push(HeapCell::Str(name, SmallVec::from_slice(args)))
        }
    }

    /// Builds the proper list of `items`.
    pub fn list(&mut self, items: &[TermRef]) -> TermRef {
        let nil = self.atom(atom!("[]"));
        self.partial_list(items, nil)
    }

    /// Builds a list of `items` whose final tail is `tail`.
    pub fn partial_list(&mut self, items: &[TermRef], tail: TermRef) -> TermRef {
        let cons = atom!(".");

        items
            .iter()
            .rev()
            .fold(tail, |tail, &head| self.apply(cons, &[head, tail]))
    }

    /// Follows binding chains to a fixed point.
    pub fn deref(&self, mut t: TermRef) -> TermRef {
        while let HeapCell::Var(VarCell {
            binding: Some(next),
            ..
        }) = self.cell(t)
        {
            t = *next;
        }

        t
    }

    /// Dereferences `t` and exposes its contents.
    pub fn view(&self, t: TermRef) -> TermView<'_> {
        let t = self.deref(t);

        match self.cell(t) {
            HeapCell::Var(_) => TermView::Var(t),
            HeapCell::Literal(literal) => TermView::Literal(literal),
            HeapCell::Str(name, args) => TermView::Str(*name, args),
        }
    }

    /// The source name of a variable, if it had one.
    pub fn var_name(&self, t: TermRef) -> Option<&Arc<str>> {
        match self.cell(self.deref(t)) {
            HeapCell::Var(cell) => cell.name.as_ref(),
            _ => None,
        }
    }

    /// True if `t` dereferences to a free variable.
    #[inline]
    pub fn is_var(&self, t: TermRef) -> bool {
        matches!(self.view(t), TermView::Var(_))
    }

    /// The atom `t` dereferences to, if it is one.
    pub fn as_atom(&self, t: TermRef) -> Option<Atom> {
        match self.view(t) {
            TermView::Literal(Literal::Atom(name)) => Some(*name),
            _ => None,
        }
    }

    /// The name and arity of a callable term.
    pub fn name_and_arity(&self, t: TermRef) -> Option<(Atom, usize)> {
        match self.view(t) {
            TermView::Literal(Literal::Atom(name)) => Some((*name, 0)),
            TermView::Str(name, args) => Some((name, args.len())),
            _ => None,
        }
    }

    /// The arguments of a compound, or nothing for any other term.
    pub fn args(&self, t: TermRef) -> &[TermRef] {
        match self.view(t) {
            TermView::Str(_, args) => args,
            _ => &[],
        }
    }

    /// Binds the free variable `var` to `value`, recording it on the trail.
    pub(crate) fn bind(&mut self, var: TermRef, value: TermRef) {
        if let HeapCell::Var(cell) = &mut self.cells[var.index()] {
            cell.binding = Some(value);
            self.trail.push(var);
        }
    }

    #[inline]
    pub(crate) fn trail_mark(&self) -> usize {
        self.trail.len()
    }

    /// Unbinds every variable bound since `mark` was taken.
    pub(crate) fn undo_to(&mut self, mark: usize) {
        while self.trail.len() > mark {
            if let Some(var) = self.trail.pop() {
                if let HeapCell::Var(cell) = &mut self.cells[var.index()] {
                    cell.binding = None;
                }
            }
        }
    }

    /// Structural equality. Free variables are equal only to themselves.
    pub fn eq(&self, a: TermRef, b: TermRef) -> bool {
        self.compare(a, b) == Ordering::Equal
    }

    /// The standard order of terms:
    /// `Var < Float < Integer < Atom < Compound`. Variables order by age,
    /// compounds by arity, then name, then arguments left to right.
    pub fn compare(&self, a: TermRef, b: TermRef) -> Ordering {
        let mut pairs = vec![(a, b)];

        while let Some((a, b)) = pairs.pop() {
            let a = self.deref(a);
            let b = self.deref(b);

            if a == b {
                continue;
            }

            let ordering = match (self.view(a), self.view(b)) {
                (TermView::Var(x), TermView::Var(y)) => x.cmp(&y),
                (TermView::Var(_), _) => Ordering::Less,
                (_, TermView::Var(_)) => Ordering::Greater,
                (TermView::Literal(x), TermView::Literal(y)) => compare_literals(x, y),
                (TermView::Literal(_), TermView::Str(..)) => Ordering::Less,
                (TermView::Str(..), TermView::Literal(_)) => Ordering::Greater,
                (TermView::Str(f, xs), TermView::Str(g, ys)) => {
                    match xs.len().cmp(&ys.len()).then_with(|| f.cmp(&g)) {
                        Ordering::Equal => {
                            pairs.extend(xs.iter().copied().zip(ys.iter().copied()).rev());
                            continue;
                        }
                        ordering => ordering,
                    }
                }
            };

            if ordering != Ordering::Equal {
                return ordering;
            }
        }

        Ordering::Equal
    }

    /// The distinct free variables of `t` in depth-first, left-to-right
    /// order of first occurrence.
    pub fn variables(&self, t: TermRef) -> Vec<TermRef> {
        let mut vars = vec![];
        let mut stack = vec![t];

        while let Some(t) = stack.pop() {
            match self.view(t) {
                TermView::Var(v) => {
                    if !vars.contains(&v) {
                        vars.push(v);
                    }
                }
                TermView::Str(_, args) => {
                    stack.extend(args.iter().rev());
                }
                TermView::Literal(_) => {}
            }
        }

        vars
    }

    /// True if `t` contains no free variables.
    pub fn is_ground(&self, t: TermRef) -> bool {
        let mut stack = vec![t];

        while let Some(t) = stack.pop() {
            match self.view(t) {
                TermView::Var(_) => return false,
                TermView::Str(_, args) => stack.extend(args.iter()),
                TermView::Literal(_) => {}
            }
        }

        true
    }

    /// Reads `t` as a list.
    pub fn list_shape(&self, mut t: TermRef) -> ListShape {
        let cons = atom!(".");
        let nil = atom!("[]");
        let mut items = vec![];

        loop {
            match self.view(t) {
                TermView::Str(name, args) if name == cons && args.len() == 2 => {
                    items.push(args[0]);
                    t = args[1];
                }
                TermView::Literal(Literal::Atom(name)) if *name == nil => {
                    return ListShape::Proper(items);
                }
                TermView::Var(v) => {
                    return ListShape::Partial(items, v);
                }
                _ => {
                    return ListShape::Improper(items, self.deref(t));
                }
            }
        }
    }

    /// Copies `t` out of the heap, resolving bindings.
    pub fn snapshot(&self, t: TermRef) -> Term {
        let mut stack = vec![Unfold::Visit(t)];
        let mut terms = vec![];

        while let Some(item) = stack.pop() {
            match item {
                Unfold::Visit(t) => match self.view(t) {
                    TermView::Var(v) => terms.push(Term::Var(TermVar {
                        id: v.index(),
                        name: self.var_name(v).cloned(),
                    })),
                    TermView::Literal(literal) => terms.push(Term::Literal(literal.clone())),
                    TermView::Str(name, args) => {
                        stack.push(Unfold::Fold(name, args.len()));
                        stack.extend(args.iter().rev().map(|&arg| Unfold::Visit(arg)));
                    }
                },
                Unfold::Fold(name, arity) => {
                    let args = terms.split_off(terms.len() - arity);
                    terms.push(Term::Compound(name, args));
                }
            }
        }

        terms.pop().unwrap_or_else(|| Term::atom("[]"))
    }

    /// Copies an owned term into the heap. Equal [`TermVar`]s become the
    /// same fresh variable.
    pub fn build(&mut self, term: &Term) -> TermRef {
        let mut vars = FxHashMap::default();
        self.build_with(term, &mut vars)
    }

    fn build_with(&mut self, term: &Term, vars: &mut FxHashMap<TermVar, TermRef>) -> TermRef {
        let mut stack = vec![Unfold::Visit(term)];
        let mut cells: Vec<TermRef> = vec![];

        while let Some(item) = stack.pop() {
            match item {
                Unfold::Visit(Term::Literal(literal)) => {
                    cells.push(self.literal(literal.clone()));
                }
                Unfold::Visit(Term::Compound(name, args)) => {
                    stack.push(Unfold::Fold(*name, args.len()));
                    stack.extend(args.iter().rev().map(Unfold::Visit));
                }
                Unfold::Visit(Term::Var(var)) => {
                    let t = match vars.get(var) {
                        Some(&t) => t,
                        None => {
                            let t = match &var.name {
                                Some(name) => self.named_var(name),
                                None => self.var(),
                            };

                            vars.insert(var.clone(), t);
                            t
                        }
                    };

                    cells.push(t);
                }
                Unfold::Fold(name, arity) => {
                    let args: SmallVec<[TermRef; 4]> = cells.drain(cells.len() - arity..).collect();
                    let t = self.push(HeapCell::Str(name, args));

                    cells.push(t);
                }
            }
        }

        cells.pop().unwrap_or_else(|| self.atom(atom!("[]")))
    }
}

// a pending step of a depth-first copy: visit a subterm, or fold the last
// `arity` results into a compound.
enum Unfold<T> {
    Visit(T),
    Fold(Atom, usize),
}
