//! The loading half of a Prolog system: a reader, a compiler from clauses
//! to a small bytecode, and the directive processor that consults sources
//! into a clause database.
#![deny(missing_docs)]

#[macro_use]
extern crate static_assertions;

#[macro_use]
mod macros;
/// Interned atoms.
pub mod atom_table;
/// Reading terms from character streams.
#[macro_use]
pub mod parser;
/// Compiling clauses to bytecode.
pub mod codegen;
/// Predicate indicators and the shapes of top-level terms.
pub mod forms;
/// Writing terms in standard syntax.
pub mod heap_print;
/// The bytecode instruction set.
pub mod instructions;
/// The machine: clause database, loader and goal runner.
pub mod machine;
/// Terms and literals.
pub mod types;

// Re-exports
pub use atom_table::Atom;
pub use codegen::{Clause, CodeGenerator};
pub use forms::ProcedureIndicator;
pub use instructions::{Instruction, Opcode, XrEntry};
pub use machine::config::MachineBuilder;
pub use machine::context::{CancelHandle, Context};
pub use machine::heap::{Heap, ListShape, TermView};
pub use machine::machine_errors::{ExistenceError, MachineError, PermissionError, ValidType};
pub use machine::machine_indices::{
    BuiltinFn, PredicateFlag, PredicateFlags, Procedure, UserDefined,
};
pub use machine::streams::{FileProvider, FsFileProvider, MemoryFileProvider, Stream};
pub use machine::Machine;
pub use parser::ast::{DoubleQuotes, OpDeclSpec, ParserError};
pub use types::{Literal, Term, TermRef, TermVar};
