use crate::forms::*;
use crate::heap_print::*;
use crate::instructions::*;
use crate::machine::heap::*;
use crate::machine::machine_errors::*;
use crate::parser::ast::*;
use crate::types::*;

/// A compiled fact or rule.
///
/// Every `TermRef` a clause holds points into the heap of the machine that
/// compiled it. Those cells are never bound; calls copy the templates in
/// the xr table into fresh frames.
#[derive(Debug, Clone)]
pub struct Clause {
    /// The predicate the clause belongs to.
    pub pi: ProcedureIndicator,
    /// The clause as read, after expansion.
    pub raw: TermRef,
    /// Constants, head templates and call targets, in order of first use.
    pub xr_table: Vec<XrEntry>,
    /// The distinct variables of the clause, in order of first occurrence.
    pub vars: Vec<TermRef>,
    /// The instructions of the clause.
    pub bytecode: Code,
}

impl Clause {
    /// Writes `raw` back in standard syntax, terminated by a full stop.
    pub fn listing(&self, heap: &Heap, op_dir: &OpDir) -> String {
        format!("{}.", TermWriter::new(op_dir).print(heap, self.raw))
    }

    /// The constant or template at `offset` of the xr table.
    #[inline]
    pub(crate) fn xr_term(&self, offset: usize) -> Option<TermRef> {
        match self.xr_table.get(offset) {
            Some(&XrEntry::Term(t)) => Some(t),
            _ => None,
        }
    }

    /// The call target at `offset` of the xr table.
    #[inline]
    pub(crate) fn xr_procedure(&self, offset: usize) -> Option<ProcedureIndicator> {
        match self.xr_table.get(offset) {
            Some(&XrEntry::Procedure(pi)) => Some(pi),
            _ => None,
        }
    }
}

/// Splits a clause into its head and, for rules, its body.
pub(crate) fn head_and_body(heap: &Heap, t: TermRef) -> (TermRef, Option<TermRef>) {
    match heap.view(t) {
        TermView::Str(name, args) if name == atom!(":-") && args.len() == 2 => {
            (args[0], Some(args[1]))
        }
        _ => (heap.deref(t), None),
    }
}

/// The indicator of a clause head.
pub(crate) fn head_indicator(
    heap: &Heap,
    head: TermRef,
) -> Result<ProcedureIndicator, MachineError> {
    match heap.view(head) {
        TermView::Var(_) => Err(MachineError::Instantiation),
        TermView::Literal(Literal::Atom(name)) => Ok(ProcedureIndicator::new(*name, 0)),
        TermView::Str(name, args) => Ok(ProcedureIndicator::new(name, args.len())),
        TermView::Literal(_) => Err(MachineError::type_error(ValidType::Callable, heap, head)),
    }
}

/// Compiles one clause term into a [`Clause`].
#[derive(Debug)]
pub struct CodeGenerator<'a> {
    heap: &'a Heap,
    xr_table: Vec<XrEntry>,
    vars: Vec<TermRef>,
    code: Code,
}

impl<'a> CodeGenerator<'a> {
    /// A generator reading clause terms from `heap`.
    pub fn new(heap: &'a Heap) -> Self {
        CodeGenerator {
            heap,
            xr_table: vec![],
            vars: vec![],
            code: vec![],
        }
    }

    /// Compiles a fact or a rule. Fails on a variable or non-callable head,
    /// or on a non-callable goal in the body.
    pub fn compile_clause(self, term: TermRef) -> Result<Clause, MachineError> {
        if self.heap.is_var(term) {
            return Err(MachineError::Instantiation);
        }

        match head_and_body(self.heap, term) {
            (head, Some(body)) => self.compile_rule(term, head, body),
            (head, None) => self.compile_fact(term, head),
        }
    }

    fn compile_fact(mut self, raw: TermRef, head: TermRef) -> Result<Clause, MachineError> {
        let pi = head_indicator(self.heap, head)?;

        self.compile_head(head);
        self.code.push(Instruction::Exit);

        Ok(self.into_clause(pi, raw))
    }

    fn compile_rule(
        mut self,
        raw: TermRef,
        head: TermRef,
        body: TermRef,
    ) -> Result<Clause, MachineError> {
        let pi = head_indicator(self.heap, head)?;

        self.compile_head(head);
        self.code.push(Instruction::Enter);

        for goal in unfold_by_str(self.heap, body, atom!(",")) {
            self.compile_goal(goal)?;
        }

        self.code.push(Instruction::Exit);

        Ok(self.into_clause(pi, raw))
    }

    fn into_clause(self, pi: ProcedureIndicator, raw: TermRef) -> Clause {
        Clause {
            pi,
            raw: self.heap.deref(raw),
            xr_table: self.xr_table,
            vars: self.vars,
            bytecode: self.code,
        }
    }

    fn compile_head(&mut self, head: TermRef) {
        for &arg in self.heap.args(head) {
            self.subterm_to_instr(arg);
        }
    }

    fn compile_goal(&mut self, goal: TermRef) -> Result<(), MachineError> {
        let pi = match self.heap.view(goal) {
            TermView::Var(_) => {
                // a variable goal G is called as call(G).
                self.subterm_to_instr(goal);
                pi!("call", 1)
            }
            TermView::Literal(Literal::Atom(name)) => ProcedureIndicator::new(*name, 0),
            TermView::Str(name, args) => {
                for &arg in args {
                    self.subterm_to_instr(arg);
                }

                ProcedureIndicator::new(name, args.len())
            }
            TermView::Literal(_) => {
                return Err(MachineError::type_error(ValidType::Callable, self.heap, goal));
            }
        };

        let offset = self.procedure_offset(pi);
        self.code.push(Instruction::Call(offset));

        Ok(())
    }

    fn subterm_to_instr(&mut self, subterm: TermRef) {
        let subterm = self.heap.deref(subterm);

        let instr = match self.heap.view(subterm) {
            TermView::Var(v) => Instruction::Var(self.var_offset(v)),
            TermView::Literal(_) => Instruction::Const(self.term_offset(subterm)),
            TermView::Str(..) => {
                // the template's variables are slots of the clause.
                for v in self.heap.variables(subterm) {
                    self.var_offset(v);
                }

                Instruction::Const(self.term_offset(subterm))
            }
        };

        self.code.push(instr);
    }

    fn var_offset(&mut self, v: TermRef) -> usize {
        match self.vars.iter().position(|&u| u == v) {
            Some(offset) => offset,
            None => {
                self.vars.push(v);
                self.vars.len() - 1
            }
        }
    }

    fn term_offset(&mut self, t: TermRef) -> usize {
        let heap = self.heap;

        let existing = self.xr_table.iter().position(|entry| match *entry {
            XrEntry::Term(u) => heap.eq(t, u),
            XrEntry::Procedure(_) => false,
        });

        match existing {
            Some(offset) => offset,
            None => {
                self.xr_table.push(XrEntry::Term(t));
                self.xr_table.len() - 1
            }
        }
    }

    fn procedure_offset(&mut self, pi: ProcedureIndicator) -> usize {
        let existing = self
            .xr_table
            .iter()
            .position(|entry| *entry == XrEntry::Procedure(pi));

        match existing {
            Some(offset) => offset,
            None => {
                self.xr_table.push(XrEntry::Procedure(pi));
                self.xr_table.len() - 1
            }
        }
    }
}
