use crate::atom_table::*;
use crate::forms::*;
use crate::machine::machine_errors::*;
use crate::machine::machine_indices::*;

use fxhash::FxBuildHasher;
use indexmap::IndexSet;

use std::fmt;

/// Identifies one outermost load: a single `compile` call, or a single
/// file of a `consult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadId(pub(crate) u64);

impl fmt::Display for LoadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a load is in its processing of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// Waiting for the next term.
    Idle,
    /// Compiling and storing a clause.
    ReadingClause,
    /// Running a directive.
    ExecutingDirective,
    /// Loading the text of an `include` or `ensure_loaded`, nested to the
    /// given depth.
    Including(usize),
    /// The source was read to its end.
    NormalEnd,
    /// The load was aborted by an error.
    Errored,
}

impl LoadPhase {
    /// True once the load has ended, normally or not.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, LoadPhase::NormalEnd | LoadPhase::Errored)
    }
}

/// The state of one load, threaded through every term it reads.
///
/// Included sources share the state of the load that includes them, so a
/// predicate split across an `include` boundary is still contiguous.
#[derive(Debug)]
pub struct LoadState {
    pub(crate) id: LoadId,
    last_key: Option<ProcedureIndicator>,
    // indicators with at least one clause in this load.
    seen: IndexSet<ProcedureIndicator, FxBuildHasher>,
    // the outermost source first.
    include_stack: Vec<Atom>,
    pub(crate) phase: LoadPhase,
}

impl LoadState {
    /// The state of load `id` of `source`, before its first term.
    pub fn new(id: LoadId, source: Atom) -> Self {
        LoadState {
            id,
            last_key: None,
            seen: IndexSet::default(),
            include_stack: vec![source],
            phase: LoadPhase::Idle,
        }
    }

    /// The outermost source of the load.
    #[inline]
    pub fn source(&self) -> Atom {
        self.include_stack[0]
    }

    /// The predicate of the last clause stored.
    #[inline]
    pub fn last_key(&self) -> Option<ProcedureIndicator> {
        self.last_key
    }

    /// The number of includes currently open.
    #[inline]
    pub fn include_depth(&self) -> usize {
        self.include_stack.len() - 1
    }

    /// Records a clause for `pi`. Fails if `pi` already has clauses in this
    /// load and the previous clause belonged to something else.
    pub(crate) fn check_contiguity(
        &mut self,
        pi: ProcedureIndicator,
        flags: PredicateFlags,
    ) -> Result<(), MachineError> {
        let resumed = self.last_key != Some(pi) && self.seen.contains(&pi);

        if resumed && !flags.allows_discontiguity() {
            return Err(MachineError::Discontiguous(pi));
        }

        self.seen.insert(pi);
        self.last_key = Some(pi);

        Ok(())
    }

    /// A directive ends the current run of clauses.
    #[inline]
    pub(crate) fn interrupt(&mut self) {
        self.last_key = None;
    }

    pub(crate) fn enter_include(&mut self, file: Atom) -> Result<(), MachineError> {
        if self.include_stack.contains(&file) {
            return Err(PermissionError::OpenSourceSink(file).into());
        }

        self.include_stack.push(file);
        self.phase = LoadPhase::Including(self.include_depth());

        Ok(())
    }

    pub(crate) fn leave_include(&mut self) {
        if self.include_stack.len() > 1 {
            self.include_stack.pop();
        }

        self.phase = match self.include_depth() {
            0 => LoadPhase::ExecutingDirective,
            depth => LoadPhase::Including(depth),
        };
    }
}
