use crate::atom_table::*;
use crate::codegen::*;
use crate::forms::*;
use crate::machine::heap::*;
use crate::machine::load_state::*;
use crate::machine::machine_errors::*;
use crate::machine::machine_indices::*;
use crate::machine::term_stream::*;
use crate::machine::Machine;
use crate::types::*;

use tracing::{debug, trace};

impl Machine {
    /// Loads one outermost source under a fresh load id.
    pub(crate) fn load_source(&mut self, mut stream: TermStream) -> Result<(), MachineError> {
        let id = self.next_load_id();
        let mut load = LoadState::new(id, stream.source());

        debug!(load = %id, source = %load.source(), "load started");

        match self.load_stream(&mut load, &mut stream) {
            Ok(()) => {
                load.phase = LoadPhase::NormalEnd;
                debug!(load = %id, source = %load.source(), "load finished");
                Ok(())
            }
            Err(e) => {
                load.phase = LoadPhase::Errored;
                Err(e)
            }
        }
    }

    fn load_stream(
        &mut self,
        load: &mut LoadState,
        stream: &mut TermStream,
    ) -> Result<(), MachineError> {
        loop {
            self.context.check()?;

            let term = match stream.next(&mut self.heap, &self.indices.op_dir)? {
                Some(term) => term,
                None => return Ok(()),
            };

            for term in self.expand_term(term)? {
                self.load_term(load, term)?;
            }
        }
    }

    fn expand_term(&mut self, term: TermRef) -> Result<Vec<TermRef>, MachineError> {
        match self.term_expansion.clone() {
            Some(hook) => hook(self, term),
            None => Ok(vec![term]),
        }
    }

    fn load_term(&mut self, load: &mut LoadState, term: TermRef) -> Result<(), MachineError> {
        match TopLevel::classify(&self.heap, term) {
            TopLevel::Clause(clause) => self.add_clause(load, clause),
            TopLevel::Directive(goal) => {
                load.phase = LoadPhase::ExecutingDirective;
                let result = self.run_directive(load, goal);
                load.phase = LoadPhase::Idle;
                result
            }
        }
    }

    fn add_clause(&mut self, load: &mut LoadState, term: TermRef) -> Result<(), MachineError> {
        load.phase = LoadPhase::ReadingClause;

        let clause = CodeGenerator::new(&self.heap).compile_clause(term)?;
        let pi = clause.pi;

        let flags = self.indices.user_defined_mut(pi, load.id)?.flags;
        load.check_contiguity(pi, flags)?;

        trace!(procedure = %pi, load = %load.id, "clause added");

        self.indices.append_clause(clause, load.id)?;
        load.phase = LoadPhase::Idle;

        Ok(())
    }

    fn run_directive(&mut self, load: &mut LoadState, goal: TermRef) -> Result<(), MachineError> {
        let directive = Directive::from_goal(&self.heap, goal);

        if !directive.is_inclusion() {
            load.interrupt();
        }

        debug!(load = %load.id, directive = ?directive, "running directive");

        match directive {
            Directive::Dynamic(spec) => self.declare(load, spec, PredicateFlag::Dynamic),
            Directive::Multifile(spec) => self.declare(load, spec, PredicateFlag::Multifile),
            Directive::Discontiguous(spec) => {
                self.declare(load, spec, PredicateFlag::Discontiguous)
            }
            Directive::Include(file) | Directive::EnsureLoaded(file) => {
                let file = self.file_name(file)?;
                self.include(load, file)
            }
            Directive::Initialization(goal) => {
                debug!(load = %load.id, goal = %self.heap.format(goal), "initialization");

                if self.run_directive_goal(goal)? {
                    Ok(())
                } else {
                    Err(MachineError::FailedInitialization(self.heap.snapshot(goal)))
                }
            }
            Directive::Goal(goal) => {
                if self.run_directive_goal(goal)? {
                    Ok(())
                } else {
                    Err(MachineError::FailedDirective(self.heap.snapshot(goal)))
                }
            }
        }
    }

    fn declare(
        &mut self,
        load: &LoadState,
        spec: TermRef,
        flag: PredicateFlag,
    ) -> Result<(), MachineError> {
        for pi in declared_indicators(&self.heap, spec)? {
            self.indices.declare_flag(pi, flag, load.id)?;
        }

        Ok(())
    }

    /// The file named by the argument of `include/1`, `ensure_loaded/1` or
    /// `consult/1`.
    pub(crate) fn file_name(&self, file: TermRef) -> Result<Atom, MachineError> {
        match self.heap.view(file) {
            TermView::Var(_) => Err(MachineError::Instantiation),
            TermView::Literal(Literal::Atom(name)) => Ok(*name),
            _ => Err(MachineError::type_error(ValidType::Atom, &self.heap, file)),
        }
    }

    // splices the terms of `file` into the current load.
    fn include(&mut self, load: &mut LoadState, file: Atom) -> Result<(), MachineError> {
        let mut stream = self.open_source(file)?;

        load.enter_include(file)?;
        debug!(load = %load.id, file = %file, depth = load.include_depth(), "including");

        let result = self.load_stream(load, &mut stream);
        load.leave_include();

        result
    }

    // runs a goal to its first solution, then undoes its bindings.
    fn run_directive_goal(&mut self, goal: TermRef) -> Result<bool, MachineError> {
        let trail_mark = self.heap.trail_mark();
        let result = self.run_goal(goal);
        self.heap.undo_to(trail_mark);

        result
    }
}
