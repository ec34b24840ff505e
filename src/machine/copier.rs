use crate::machine::heap::*;
use crate::types::*;

use fxhash::FxHashMap;
use smallvec::SmallVec;

impl Heap {
    /// Copies `t` with fresh variables, renaming consistently across the
    /// whole term.
    pub fn copy_term(&mut self, t: TermRef) -> TermRef {
        let mut renaming = FxHashMap::default();
        self.copy_with(t, &mut renaming)
    }

    /// Copies `t`, replacing each free variable through `renaming`.
    /// Variables without an entry are given a fresh variable, which is then
    /// recorded. Subterms without free variables are shared, not copied.
    pub(crate) fn copy_with(
        &mut self,
        t: TermRef,
        renaming: &mut FxHashMap<TermRef, TermRef>,
    ) -> TermRef {
        let mut stack = vec![CopyStep::Visit(t)];
        let mut copies: Vec<TermRef> = vec![];

        while let Some(step) = stack.pop() {
            let t = match step {
                CopyStep::Visit(t) => self.deref(t),
                CopyStep::Rebuild(t) => {
                    let (name, args) = match self.cell(t) {
                        HeapCell::Str(name, args) => (*name, args.clone()),
                        _ => continue,
                    };

                    let copied: SmallVec<[TermRef; 4]> =
                        copies.drain(copies.len() - args.len()..).collect();

                    let copy = if copied == args {
                        t
                    } else {
                        self.push(HeapCell::Str(name, copied))
                    };

                    copies.push(copy);
                    continue;
                }
            };

            let args = match self.cell(t) {
                HeapCell::Literal(_) => {
                    copies.push(t);
                    continue;
                }
                HeapCell::Str(_, args) => args.clone(),
                HeapCell::Var(_) => {
                    let copy = match renaming.get(&t) {
                        Some(&copy) => copy,
                        None => {
                            let copy = self.var();
                            renaming.insert(t, copy);
                            copy
                        }
                    };

                    copies.push(copy);
                    continue;
                }
            };

            stack.push(CopyStep::Rebuild(t));
            stack.extend(args.iter().rev().map(|&arg| CopyStep::Visit(arg)));
        }

        copies.pop().unwrap_or(t)
    }
}

// `Rebuild` folds the copies of a compound's arguments, the last results
// pushed, into a copy of the compound.
enum CopyStep {
    Visit(TermRef),
    Rebuild(TermRef),
}
