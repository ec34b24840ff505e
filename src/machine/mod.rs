/// Compiling source text into the database.
pub mod compile;
/// Building configured machines.
pub mod config;
/// Cancellation and deadlines.
pub mod context;
/// Copying terms with fresh variables.
pub mod copier;
/// Running goals against the database.
pub mod dispatch;
/// The term heap.
pub mod heap;
/// Per-load bookkeeping.
pub mod load_state;
/// The directive processor.
pub mod loader;
/// Errors raised while loading.
pub mod machine_errors;
/// The clause database.
pub mod machine_indices;
/// Opening sources.
pub mod streams;
/// Built-in predicates.
pub mod system_calls;
/// Reading top-level terms from a source.
pub mod term_stream;
/// Unification.
pub mod unify;

use crate::atom_table::*;
use crate::forms::*;
use crate::machine::heap::*;
use crate::machine::load_state::*;
use crate::machine::machine_indices::*;
use crate::machine::streams::*;
use crate::parser::ast::*;
use crate::types::*;

pub use crate::machine::config::*;
pub use crate::machine::context::*;
pub use crate::machine::machine_errors::*;
pub use crate::machine::term_stream::*;

use std::fmt;
use std::sync::Arc;

/// Rewrites a term read from a source before it is loaded. It returns the
/// terms to load in its place.
pub type TermExpansion =
    Arc<dyn Fn(&mut Machine, TermRef) -> Result<Vec<TermRef>, MachineError> + Send + Sync>;

/// A term heap together with the clause database loaded into it.
pub struct Machine {
    pub(crate) heap: Heap,
    pub(crate) indices: IndexStore,
    pub(crate) file_provider: Arc<dyn FileProvider>,
    pub(crate) term_expansion: Option<TermExpansion>,
    pub(crate) double_quotes: DoubleQuotes,
    // the context of the outermost compile or consult in progress.
    pub(crate) context: Context,
    next_load_id: u64,
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("heap_len", &self.heap.len())
            .field("procedures", &self.indices.code_dir.len())
            .field("double_quotes", &self.double_quotes)
            .finish()
    }
}

impl Default for Machine {
    fn default() -> Self {
        MachineBuilder::default().build()
    }
}

impl Machine {
    /// A machine with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// The heap holding every loaded term.
    #[inline]
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Mutable access to the heap, to build call arguments.
    #[inline]
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// The operator table sources are read with.
    #[inline]
    pub fn op_dir(&self) -> &OpDir {
        &self.indices.op_dir
    }

    /// The procedure for `pi`, if defined.
    #[inline]
    pub fn lookup(&self, pi: ProcedureIndicator) -> Option<&Procedure> {
        self.indices.lookup(pi)
    }

    /// Every procedure, ordered by indicator.
    #[inline]
    pub fn procedures(&self) -> Vec<(ProcedureIndicator, &Procedure)> {
        self.indices.procedures()
    }

    pub(crate) fn next_load_id(&mut self) -> LoadId {
        self.next_load_id += 1;
        LoadId(self.next_load_id)
    }

    /// Runs `f` under `ctx`, restoring the enclosing context afterwards.
    pub(crate) fn with_context<T>(
        &mut self,
        ctx: &Context,
        f: impl FnOnce(&mut Machine) -> Result<T, MachineError>,
    ) -> Result<T, MachineError> {
        let outer = std::mem::replace(&mut self.context, ctx.clone());
        let result = f(self);
        self.context = outer;
        result
    }

    /// Opens `file` through the file provider.
    pub(crate) fn open_source(&self, file: Atom) -> Result<TermStream, MachineError> {
        match self.file_provider.open(file.as_str()) {
            Ok(stream) => Ok(TermStream::new(file, stream, self.double_quotes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ExistenceError::SourceSink(file).into())
            }
            Err(e) => Err(MachineError::Io(e)),
        }
    }
}
