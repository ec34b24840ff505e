use crate::atom_table::*;
use crate::forms::*;
use crate::machine::context::*;
use crate::machine::heap::*;
use crate::machine::machine_errors::*;
use crate::machine::machine_indices::*;
use crate::machine::streams::*;
use crate::machine::system_calls::*;
use crate::machine::{Machine, TermExpansion};
use crate::parser::ast::*;
use crate::types::*;

use std::fmt;
use std::sync::Arc;

/// Describes how a [`Machine`](crate::Machine) will be configured.
pub struct MachineBuilder {
    pub(crate) file_provider: Option<Arc<dyn FileProvider>>,
    pub(crate) ops: Vec<(Atom, u16, OpDeclSpec)>,
    pub(crate) builtins: Vec<(ProcedureIndicator, BuiltinFn)>,
    pub(crate) term_expansion: Option<TermExpansion>,
    pub(crate) double_quotes: DoubleQuotes,
    pub(crate) default_builtins: bool,
}

impl fmt::Debug for MachineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let builtins: Vec<_> = self.builtins.iter().map(|(pi, _)| pi).collect();

        f.debug_struct("MachineBuilder")
            .field("ops", &self.ops)
            .field("builtins", &builtins)
            .field("double_quotes", &self.double_quotes)
            .field("default_builtins", &self.default_builtins)
            .finish_non_exhaustive()
    }
}

impl Default for MachineBuilder {
    /// Defaults to reading files relative to the working directory.
    fn default() -> Self {
        MachineBuilder {
            file_provider: None,
            ops: vec![],
            builtins: vec![],
            term_expansion: None,
            double_quotes: DoubleQuotes::default(),
            default_builtins: true,
        }
    }
}

impl MachineBuilder {
    /// Creates a default configuration.
    pub fn new() -> Self {
        Default::default()
    }

    /// Opens the sources of `consult`, `include` and `ensure_loaded` with
    /// `provider`.
    pub fn with_file_provider(mut self, provider: impl FileProvider + 'static) -> Self {
        let provider: Arc<dyn FileProvider> = Arc::new(provider);
        self.file_provider = Some(provider);
        self
    }

    /// Adds an operator to the default table. A priority of 0 removes it.
    pub fn with_op(mut self, name: &str, priority: u16, spec: OpDeclSpec) -> Self {
        self.ops.push((atom!(name), priority, spec));
        self
    }

    /// Registers a host built-in, replacing any default of the same
    /// indicator.
    pub fn with_builtin<F>(mut self, name: &str, arity: usize, f: F) -> Self
    where
        F: Fn(&mut Machine, &[TermRef]) -> Result<bool, MachineError> + Send + Sync + 'static,
    {
        let f: BuiltinFn = Arc::new(f);
        self.builtins.push((pi!(name, arity), f));
        self
    }

    /// Replaces the default expansion through `term_expansion/2`.
    pub fn with_term_expansion<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Machine, TermRef) -> Result<Vec<TermRef>, MachineError> + Send + Sync + 'static,
    {
        let hook: TermExpansion = Arc::new(hook);
        self.term_expansion = Some(hook);
        self
    }

    /// Sets how double-quoted text is read from sources.
    pub fn with_double_quotes(mut self, double_quotes: DoubleQuotes) -> Self {
        self.double_quotes = double_quotes;
        self
    }

    /// Leaves out `throw/1`, `=/2` and `consult/1`.
    pub fn without_default_builtins(mut self) -> Self {
        self.default_builtins = false;
        self
    }

    /// Builds the [`Machine`](crate::Machine) from this configuration.
    pub fn build(self) -> Machine {
        let mut op_dir = default_op_dir();

        for (name, priority, spec) in self.ops {
            add_op(&mut op_dir, name, priority, spec);
        }

        let mut indices = IndexStore::new(op_dir);

        if self.default_builtins {
            for (pi, f) in default_builtins() {
                indices.register_builtin(pi, f);
            }
        }

        for (pi, f) in self.builtins {
            indices.register_builtin(pi, f);
        }

        let file_provider = match self.file_provider {
            Some(provider) => provider,
            None => Arc::new(FsFileProvider::default()) as Arc<dyn FileProvider>,
        };

        let term_expansion = match self.term_expansion {
            Some(hook) => hook,
            None => Arc::new(expand_term) as TermExpansion,
        };

        Machine {
            heap: Heap::new(),
            indices,
            file_provider,
            term_expansion: Some(term_expansion),
            double_quotes: self.double_quotes,
            context: Context::background(),
            next_load_id: 0,
        }
    }
}
