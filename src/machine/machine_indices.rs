use crate::atom_table::*;
use crate::codegen::*;
use crate::forms::*;
use crate::machine::load_state::LoadId;
use crate::machine::machine_errors::*;
use crate::machine::Machine;
use crate::parser::ast::*;
use crate::types::*;

use fxhash::FxBuildHasher;
use indexmap::IndexMap;
use tracing::debug;

use std::fmt;
use std::sync::Arc;

/// A host built-in. It receives the machine and the goal's arguments and
/// reports success or failure.
pub type BuiltinFn =
    Arc<dyn Fn(&mut Machine, &[TermRef]) -> Result<bool, MachineError> + Send + Sync>;

/// A property declared for a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateFlag {
    /// Clauses may change at run time. Implies `Public`.
    Dynamic,
    /// Clauses may come from several loads.
    Multifile,
    /// Clauses may be split by other clauses.
    Discontiguous,
    /// Clauses may be inspected.
    Public,
}

impl PredicateFlag {
    /// The name of the declaration.
    pub fn as_atom(self) -> Atom {
        match self {
            PredicateFlag::Dynamic => atom!("dynamic"),
            PredicateFlag::Multifile => atom!("multifile"),
            PredicateFlag::Discontiguous => atom!("discontiguous"),
            PredicateFlag::Public => atom!("public"),
        }
    }
}

/// The flags set on a predicate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PredicateFlags {
    /// Declared `dynamic`.
    pub dynamic: bool,
    /// Declared `multifile`.
    pub multifile: bool,
    /// Declared `discontiguous`.
    pub discontiguous: bool,
    /// Declared `dynamic` or `public`.
    pub public: bool,
}

impl PredicateFlags {
    /// Sets `flag`, with the flags it implies.
    pub fn set(&mut self, flag: PredicateFlag) {
        match flag {
            PredicateFlag::Dynamic => {
                self.dynamic = true;
                self.public = true;
            }
            PredicateFlag::Multifile => self.multifile = true,
            PredicateFlag::Discontiguous => self.discontiguous = true,
            PredicateFlag::Public => self.public = true,
        }
    }

    /// True if `flag` is set.
    #[inline]
    pub fn is_set(self, flag: PredicateFlag) -> bool {
        match flag {
            PredicateFlag::Dynamic => self.dynamic,
            PredicateFlag::Multifile => self.multifile,
            PredicateFlag::Discontiguous => self.discontiguous,
            PredicateFlag::Public => self.public,
        }
    }

    /// Clauses of such predicates may be split by other clauses.
    #[inline]
    pub fn allows_discontiguity(self) -> bool {
        self.discontiguous || self.multifile || self.dynamic
    }
}

/// A predicate defined by clauses.
#[derive(Debug, Clone, Default)]
pub struct UserDefined {
    /// Its declared flags.
    pub flags: PredicateFlags,
    clauses: Vec<Arc<Clause>>,
    // the load that last touched the predicate.
    load_id: Option<LoadId>,
}

impl UserDefined {
    /// The clauses, in database order.
    #[inline]
    pub fn clauses(&self) -> impl ExactSizeIterator<Item = &Clause> + '_ {
        self.clauses.iter().map(|clause| &**clause)
    }

    /// The number of clauses.
    #[inline]
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// True if no clauses are stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    #[inline]
    pub(crate) fn snapshot(&self) -> Arc<[Arc<Clause>]> {
        self.clauses.iter().cloned().collect()
    }
}

/// A predicate implemented by the host.
#[derive(Clone)]
pub struct Builtin {
    pub(crate) f: BuiltinFn,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Builtin").field(&"<fn>").finish()
    }
}

/// The definition stored for a predicate indicator.
#[derive(Debug, Clone)]
pub enum Procedure {
    /// Defined by clauses.
    UserDefined(UserDefined),
    /// Implemented by the host.
    Builtin(Builtin),
}

impl Procedure {
    /// The clause-defined procedure, if this is one.
    #[inline]
    pub fn as_user_defined(&self) -> Option<&UserDefined> {
        match self {
            Procedure::UserDefined(p) => Some(p),
            Procedure::Builtin(_) => None,
        }
    }

    /// True for host built-ins.
    #[inline]
    pub fn is_builtin(&self) -> bool {
        matches!(self, Procedure::Builtin(_))
    }
}

/// Procedures by indicator, in order of creation.
pub type CodeDir = IndexMap<ProcedureIndicator, Procedure, FxBuildHasher>;

/// The clause database and the operator table of one machine.
#[derive(Debug, Default)]
pub struct IndexStore {
    pub(crate) code_dir: CodeDir,
    pub(crate) op_dir: OpDir,
}

impl IndexStore {
    /// An empty database using `op_dir`.
    pub fn new(op_dir: OpDir) -> Self {
        IndexStore {
            code_dir: CodeDir::default(),
            op_dir,
        }
    }

    /// The procedure for `pi`, if defined.
    #[inline]
    pub fn lookup(&self, pi: ProcedureIndicator) -> Option<&Procedure> {
        self.code_dir.get(&pi)
    }

    pub(crate) fn register_builtin(&mut self, pi: ProcedureIndicator, f: BuiltinFn) {
        self.code_dir.insert(pi, Procedure::Builtin(Builtin { f }));
    }

    /// The user-defined procedure for `pi` as seen by `load_id`, created
    /// empty if absent. A static procedure last touched by another load
    /// starts over. Multifile, dynamic and public procedures keep their
    /// clauses and flags.
    pub(crate) fn user_defined_mut(
        &mut self,
        pi: ProcedureIndicator,
        load_id: LoadId,
    ) -> Result<&mut UserDefined, MachineError> {
        let procedure = self.code_dir.entry(pi).or_insert_with(|| {
            Procedure::UserDefined(UserDefined {
                load_id: Some(load_id),
                ..UserDefined::default()
            })
        });

        match procedure {
            Procedure::Builtin(_) => Err(PermissionError::ModifyStaticProcedure(pi).into()),
            Procedure::UserDefined(p) => {
                if p.load_id != Some(load_id) {
                    if !(p.flags.multifile || p.flags.dynamic || p.flags.public) {
                        debug!(procedure = %pi, load = ?load_id, "redefining procedure");
                        *p = UserDefined::default();
                    }

                    p.load_id = Some(load_id);
                }

                Ok(p)
            }
        }
    }

    pub(crate) fn declare_flag(
        &mut self,
        pi: ProcedureIndicator,
        flag: PredicateFlag,
        load_id: LoadId,
    ) -> Result<(), MachineError> {
        self.user_defined_mut(pi, load_id)?.flags.set(flag);
        Ok(())
    }

    pub(crate) fn append_clause(
        &mut self,
        clause: Clause,
        load_id: LoadId,
    ) -> Result<(), MachineError> {
        let p = self.user_defined_mut(clause.pi, load_id)?;
        p.clauses.push(Arc::new(clause));
        Ok(())
    }

    /// Every procedure, ordered by indicator.
    pub fn procedures(&self) -> Vec<(ProcedureIndicator, &Procedure)> {
        let mut procedures: Vec<_> = self.code_dir.iter().map(|(&pi, p)| (pi, p)).collect();
        procedures.sort_by_key(|&(pi, _)| pi);
        procedures
    }
}
