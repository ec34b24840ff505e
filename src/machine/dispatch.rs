use crate::codegen::*;
use crate::forms::*;
use crate::instructions::*;
use crate::machine::heap::*;
use crate::machine::machine_errors::*;
use crate::machine::machine_indices::*;
use crate::machine::Machine;
use crate::types::*;

use fxhash::FxHashMap;

use std::rc::Rc;
use std::sync::Arc;

// goals run between two polls of the context.
const POLL_INTERVAL: usize = 1024;

#[derive(Debug, Clone, Copy)]
enum Frame {
    /// A goal, and the height of the choicepoint stack a cut inside it
    /// returns to.
    Goal(TermRef, usize),
    CutTo(usize),
    Fail,
}

#[derive(Debug)]
struct ContNode {
    frame: Frame,
    next: Cont,
}

// the goals left to prove, innermost first. Continuations share their tails.
type Cont = Option<Rc<ContNode>>;

// unshared tails are released one node at a time.
impl Drop for ContNode {
    fn drop(&mut self) {
        let mut next = self.next.take();

        while let Some(node) = next {
            match Rc::try_unwrap(node) {
                Ok(mut node) => next = node.next.take(),
                Err(_) => break,
            }
        }
    }
}

#[inline]
fn push(next: Cont, frame: Frame) -> Cont {
    Some(Rc::new(ContNode { frame, next }))
}

#[derive(Debug)]
enum Alternative {
    Resume(Cont),
    Clauses {
        goal: TermRef,
        clauses: Arc<[Arc<Clause>]>,
        next: usize,
        cont: Cont,
    },
}

#[derive(Debug)]
struct ChoicePoint {
    trail_mark: usize,
    alternative: Alternative,
}

enum Step {
    Proceed(Cont),
    Fail,
}

impl Machine {
    /// Calls `pi` with `args`, stopping at the first solution. Its bindings
    /// are kept.
    pub fn call(
        &mut self,
        pi: ProcedureIndicator,
        args: &[TermRef],
    ) -> Result<bool, MachineError> {
        if args.len() != pi.arity {
            return Err(MachineError::Type(ValidType::PredicateIndicator, pi.to_term()));
        }

        let goal = self.heap.apply(pi.name, args);
        self.run_goal(goal)
    }

    /// Proves `goal` depth first, stopping at the first solution.
    pub(crate) fn run_goal(&mut self, goal: TermRef) -> Result<bool, MachineError> {
        let mut choicepoints = vec![];
        let mut cont = push(None, Frame::Goal(goal, 0));
        let mut steps = 0usize;

        loop {
            let node = match cont {
                Some(node) => node,
                None => return Ok(true),
            };

            steps += 1;

            if steps % POLL_INTERVAL == 0 {
                self.context.check()?;
            }

            let next = node.next.clone();

            let step = match node.frame {
                Frame::Goal(goal, cut_barrier) => {
                    self.step(goal, cut_barrier, next, &mut choicepoints)?
                }
                Frame::CutTo(height) => {
                    choicepoints.truncate(height);
                    Step::Proceed(next)
                }
                Frame::Fail => Step::Fail,
            };

            cont = match step {
                Step::Proceed(cont) => cont,
                Step::Fail => match self.backtrack(&mut choicepoints) {
                    Some(cont) => cont,
                    None => return Ok(false),
                },
            };
        }
    }

    fn backtrack(&mut self, choicepoints: &mut Vec<ChoicePoint>) -> Option<Cont> {
        while let Some(choicepoint) = choicepoints.pop() {
            self.heap.undo_to(choicepoint.trail_mark);

            match choicepoint.alternative {
                Alternative::Resume(cont) => return Some(cont),
                Alternative::Clauses {
                    goal,
                    clauses,
                    next,
                    cont,
                } => {
                    if let Some(cont) = self.try_clauses(goal, clauses, next, cont, choicepoints) {
                        return Some(cont);
                    }
                }
            }
        }

        None
    }

    fn step(
        &mut self,
        goal: TermRef,
        cut_barrier: usize,
        next: Cont,
        choicepoints: &mut Vec<ChoicePoint>,
    ) -> Result<Step, MachineError> {
        let goal = self.heap.deref(goal);

        let (name, arity) = match self.heap.view(goal) {
            TermView::Var(_) => return Err(MachineError::Instantiation),
            TermView::Literal(Literal::Atom(name)) => (*name, 0),
            TermView::Str(name, args) => (name, args.len()),
            TermView::Literal(_) => {
                return Err(MachineError::type_error(ValidType::Callable, &self.heap, goal));
            }
        };

        let args = self.heap.args(goal).to_vec();

        match (name.as_str(), arity) {
            ("true", 0) => Ok(Step::Proceed(next)),
            ("fail", 0) | ("false", 0) => Ok(Step::Fail),
            ("!", 0) => {
                choicepoints.truncate(cut_barrier);
                Ok(Step::Proceed(next))
            }
            (",", 2) => {
                let cont = push(next, Frame::Goal(args[1], cut_barrier));
                Ok(Step::Proceed(push(cont, Frame::Goal(args[0], cut_barrier))))
            }
            (";", 2) => {
                let height = choicepoints.len();

                choicepoints.push(ChoicePoint {
                    trail_mark: self.heap.trail_mark(),
                    alternative: Alternative::Resume(push(
                        next.clone(),
                        Frame::Goal(args[1], cut_barrier),
                    )),
                });

                match self.if_then(args[0]) {
                    Some((cond, then)) => {
                        let cont = push(next, Frame::Goal(then, cut_barrier));
                        let cont = push(cont, Frame::CutTo(height));
                        Ok(Step::Proceed(push(cont, Frame::Goal(cond, height + 1))))
                    }
                    None => Ok(Step::Proceed(push(next, Frame::Goal(args[0], cut_barrier)))),
                }
            }
            ("->", 2) => {
                let height = choicepoints.len();

                let cont = push(next, Frame::Goal(args[1], cut_barrier));
                let cont = push(cont, Frame::CutTo(height));
                Ok(Step::Proceed(push(cont, Frame::Goal(args[0], height))))
            }
            ("\\+", 1) => {
                let height = choicepoints.len();

                choicepoints.push(ChoicePoint {
                    trail_mark: self.heap.trail_mark(),
                    alternative: Alternative::Resume(next),
                });

                let cont = push(None, Frame::Fail);
                let cont = push(cont, Frame::CutTo(height));
                Ok(Step::Proceed(push(cont, Frame::Goal(args[0], height + 1))))
            }
            ("call", 1..=8) => {
                let goal = self.add_args(args[0], &args[1..])?;
                let height = choicepoints.len();

                Ok(Step::Proceed(push(next, Frame::Goal(goal, height))))
            }
            _ => {
                let pi = ProcedureIndicator::new(name, arity);
                self.call_procedure(pi, goal, next, choicepoints)
            }
        }
    }

    fn if_then(&self, t: TermRef) -> Option<(TermRef, TermRef)> {
        match self.heap.view(t) {
            TermView::Str(name, args) if name == atom!("->") && args.len() == 2 => {
                Some((args[0], args[1]))
            }
            _ => None,
        }
    }

    // the goal of call/N: `goal` with `extra` appended to its arguments.
    fn add_args(&mut self, goal: TermRef, extra: &[TermRef]) -> Result<TermRef, MachineError> {
        let goal = self.heap.deref(goal);

        if extra.is_empty() {
            return Ok(goal);
        }

        let (name, mut args) = match self.heap.view(goal) {
            TermView::Var(_) => return Err(MachineError::Instantiation),
            TermView::Literal(Literal::Atom(name)) => (*name, vec![]),
            TermView::Str(name, args) => (name, args.to_vec()),
            TermView::Literal(_) => {
                return Err(MachineError::type_error(ValidType::Callable, &self.heap, goal));
            }
        };

        args.extend_from_slice(extra);
        Ok(self.heap.apply(name, &args))
    }

    fn call_procedure(
        &mut self,
        pi: ProcedureIndicator,
        goal: TermRef,
        next: Cont,
        choicepoints: &mut Vec<ChoicePoint>,
    ) -> Result<Step, MachineError> {
        let clauses = match self.indices.lookup(pi) {
            None => return Err(ExistenceError::Procedure(pi).into()),
            Some(Procedure::Builtin(builtin)) => {
                let f = builtin.f.clone();
                let args = self.heap.args(goal).to_vec();

                return if f(self, &args)? {
                    Ok(Step::Proceed(next))
                } else {
                    Ok(Step::Fail)
                };
            }
            Some(Procedure::UserDefined(p)) => p.snapshot(),
        };

        match self.try_clauses(goal, clauses, 0, next, choicepoints) {
            Some(cont) => Ok(Step::Proceed(cont)),
            None => Ok(Step::Fail),
        }
    }

    // resolves `goal` against the clauses from `first` on, leaving a
    // choicepoint for the rest.
    fn try_clauses(
        &mut self,
        goal: TermRef,
        clauses: Arc<[Arc<Clause>]>,
        first: usize,
        cont: Cont,
        choicepoints: &mut Vec<ChoicePoint>,
    ) -> Option<Cont> {
        let mut index = first;

        while index < clauses.len() {
            let clause = clauses[index].clone();
            let trail_mark = self.heap.trail_mark();
            let cut_barrier = choicepoints.len();

            index += 1;

            if index < clauses.len() {
                choicepoints.push(ChoicePoint {
                    trail_mark,
                    alternative: Alternative::Clauses {
                        goal,
                        clauses: clauses.clone(),
                        next: index,
                        cont: cont.clone(),
                    },
                });
            }

            if let Some(body) = self.enter_clause(goal, &clause) {
                let mut cont = cont;

                for &goal in body.iter().rev() {
                    cont = push(cont, Frame::Goal(goal, cut_barrier));
                }

                return Some(cont);
            }

            self.heap.undo_to(trail_mark);
            choicepoints.truncate(cut_barrier);
        }

        None
    }

    /// Matches the head of `clause` against `goal` in a fresh frame and
    /// returns the body goals, or `None` if the head does not match.
    fn enter_clause(&mut self, goal: TermRef, clause: &Clause) -> Option<Vec<TermRef>> {
        let frame: Vec<TermRef> = clause.vars.iter().map(|_| self.heap.var()).collect();

        let mut renaming: FxHashMap<TermRef, TermRef> = clause
            .vars
            .iter()
            .copied()
            .zip(frame.iter().copied())
            .collect();

        let args = self.heap.args(goal).to_vec();
        let mut code = clause.bytecode.iter().copied();
        let mut arg = 0;

        for instr in code.by_ref() {
            let value = match instr {
                Instruction::Const(offset) => {
                    let template = clause.xr_term(offset)?;
                    self.heap.copy_with(template, &mut renaming)
                }
                Instruction::Var(slot) => *frame.get(slot)?,
                Instruction::Enter => break,
                Instruction::Exit => return Some(vec![]),
                Instruction::Call(_) => return None,
            };

            let goal_arg = *args.get(arg)?;
            arg += 1;

            if !self.heap.unify(goal_arg, value) {
                return None;
            }
        }

        let mut body = vec![];
        let mut pushed = vec![];

        for instr in code {
            match instr {
                Instruction::Const(offset) => {
                    let template = clause.xr_term(offset)?;
                    pushed.push(self.heap.copy_with(template, &mut renaming));
                }
                Instruction::Var(slot) => pushed.push(*frame.get(slot)?),
                Instruction::Call(offset) => {
                    let pi = clause.xr_procedure(offset)?;
                    body.push(self.heap.apply(pi.name, &pushed));
                    pushed.clear();
                }
                Instruction::Exit => return Some(body),
                Instruction::Enter => return None,
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use crate::machine::*;

    fn machine(text: &str) -> Machine {
        let mut machine = Machine::new();
        machine.compile(&Context::background(), text).unwrap();
        machine
    }

    fn solve(machine: &mut Machine, goal: &str) -> Result<bool, MachineError> {
        let text = format!("{}.", goal);
        let mut stream = TermStream::from_text(atom!("user"), &text, DoubleQuotes::default());
        let op_dir = machine.indices.op_dir.clone();
        let goal = stream.next(&mut machine.heap, &op_dir).unwrap().unwrap();

        machine.run_goal(goal)
    }

    #[test]
    fn facts_and_rules() {
        let mut m = machine("p(a). p(b). q(X) :- p(X), X = b.");

        assert!(solve(&mut m, "p(a)").unwrap());
        assert!(!solve(&mut m, "p(c)").unwrap());
        assert!(solve(&mut m, "q(b)").unwrap());
        assert!(solve(&mut m, "q(Y), Y = b").unwrap());
        assert!(!solve(&mut m, "q(a)").unwrap());
    }

    #[test]
    fn templates_are_copied_per_call() {
        let mut m = machine("pair(f(X), X). twice(A, B) :- pair(A, 1), pair(B, 2).");

        assert!(solve(&mut m, "twice(f(1), f(2))").unwrap());
        assert!(!solve(&mut m, "twice(f(1), f(1))").unwrap());
    }

    #[test]
    fn control_constructs() {
        let mut m = machine("p(a). p(b). first(X) :- p(X), !. r :- ( p(c) -> fail ; true ).");

        assert!(solve(&mut m, "first(a)").unwrap());
        assert!(!solve(&mut m, "first(X), X = b").unwrap());
        assert!(solve(&mut m, "r").unwrap());
        assert!(solve(&mut m, "\\+ p(c)").unwrap());
        assert!(!solve(&mut m, "\\+ p(a)").unwrap());
        assert!(solve(&mut m, "( fail ; p(b) )").unwrap());
        assert!(!solve(&mut m, "( p(a) -> fail ; true )").unwrap());
        assert!(solve(&mut m, "call(p, b)").unwrap());
        assert!(solve(&mut m, "G = p(a), call(G)").unwrap());
    }

    #[test]
    fn cuts_are_local_to_call() {
        let mut m = machine("p(a). p(b). s(X) :- call((p(X), !)), X = b.");

        assert!(!solve(&mut m, "s(_)").unwrap());
    }

    #[test]
    fn unknown_procedures() {
        let mut m = machine("p :- q.");

        assert!(matches!(
            solve(&mut m, "p"),
            Err(MachineError::Existence(ExistenceError::Procedure(pi))) if pi == pi!("q", 0)
        ));
        assert!(matches!(solve(&mut m, "call(_)"), Err(MachineError::Instantiation)));
        assert!(matches!(
            solve(&mut m, "call(1)"),
            Err(MachineError::Type(ValidType::Callable, _))
        ));
    }

    #[test]
    fn host_calls_keep_bindings() {
        let mut m = machine("p(a).");
        let x = m.heap.var();

        assert!(m.call(pi!("p", 1), &[x]).unwrap());
        assert_eq!(m.heap.as_atom(x), Some(atom!("a")));
    }

    #[test]
    fn long_bodies_run() {
        let body = vec!["true"; 5000].join(", ");
        let mut m = machine(&format!("p :- {}.", body));

        assert!(solve(&mut m, "p").unwrap());
    }
}
