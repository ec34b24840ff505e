use crate::machine::heap::*;
use crate::types::*;

impl Heap {
    /// Unifies `a` and `b`, with occurs check.
    ///
    /// Bindings made before a failure stay on the trail; the caller undoes
    /// them to its own mark.
    pub(crate) fn unify(&mut self, a: TermRef, b: TermRef) -> bool {
        let mut pairs = vec![(a, b)];

        while let Some((a, b)) = pairs.pop() {
            let a = self.deref(a);
            let b = self.deref(b);

            if a == b {
                continue;
            }

            match (self.is_var(a), self.is_var(b)) {
                (true, true) => {
                    // the younger variable points at the older one.
                    if a > b {
                        self.bind(a, b);
                    } else {
                        self.bind(b, a);
                    }
                }
                (true, false) => {
                    if self.occurs(a, b) {
                        return false;
                    }

                    self.bind(a, b);
                }
                (false, true) => {
                    if self.occurs(b, a) {
                        return false;
                    }

                    self.bind(b, a);
                }
                (false, false) => match (self.view(a), self.view(b)) {
                    (TermView::Literal(x), TermView::Literal(y)) => {
                        if x != y {
                            return false;
                        }
                    }
                    (TermView::Str(f, xs), TermView::Str(g, ys)) => {
                        if f != g || xs.len() != ys.len() {
                            return false;
                        }

                        pairs.extend(xs.iter().copied().zip(ys.iter().copied()).rev());
                    }
                    _ => return false,
                },
            }
        }

        true
    }

    fn occurs(&self, var: TermRef, t: TermRef) -> bool {
        let mut stack = vec![t];

        while let Some(t) = stack.pop() {
            match self.view(t) {
                TermView::Var(v) if v == var => return true,
                TermView::Str(_, args) => stack.extend(args.iter()),
                _ => {}
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use crate::machine::heap::*;

    #[test]
    fn unification_binds_both_ways() {
        let mut heap = Heap::new();
        let x = heap.var();
        let y = heap.var();
        let a = heap.atom(atom!("a"));
        let f_xa = heap.apply(atom!("f"), &[x, a]);
        let f_ay = heap.apply(atom!("f"), &[a, y]);

        assert!(heap.unify(f_xa, f_ay));
        assert_eq!(heap.as_atom(x), Some(atom!("a")));
        assert_eq!(heap.as_atom(y), Some(atom!("a")));
    }

    #[test]
    fn clashes_fail() {
        let mut heap = Heap::new();
        let a = heap.atom(atom!("a"));
        let b = heap.atom(atom!("b"));
        let fa = heap.apply(atom!("f"), &[a]);
        let ga = heap.apply(atom!("g"), &[a]);
        let faa = heap.apply(atom!("f"), &[a, a]);

        assert!(!heap.unify(a, b));
        assert!(!heap.unify(fa, ga));
        assert!(!heap.unify(fa, faa));
    }

    #[test]
    fn occurs_check() {
        let mut heap = Heap::new();
        let x = heap.var();
        let fx = heap.apply(atom!("f"), &[x]);

        assert!(!heap.unify(x, fx));
    }

    #[test]
    fn failed_unification_is_undone_by_the_caller() {
        let mut heap = Heap::new();
        let x = heap.var();
        let a = heap.atom(atom!("a"));
        let b = heap.atom(atom!("b"));
        let f_xb = heap.apply(atom!("f"), &[x, b]);
        let f_aa = heap.apply(atom!("f"), &[a, a]);

        let mark = heap.trail_mark();

        assert!(!heap.unify(f_xb, f_aa));

        heap.undo_to(mark);

        assert!(heap.is_var(x));
    }
}
