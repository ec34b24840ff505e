use crate::atom_table::*;
use crate::machine::context::*;
use crate::machine::heap::*;
use crate::machine::machine_errors::*;
use crate::machine::term_stream::*;
use crate::machine::Machine;
use crate::types::*;

use tracing::debug;

impl Machine {
    /// Loads the clauses and directives of `text`.
    ///
    /// Clauses loaded before an error stay in the database.
    pub fn compile(&mut self, ctx: &Context, text: &str) -> Result<(), MachineError> {
        self.compile_with_args(ctx, text, &[])
    }

    /// Like [`Machine::compile`], but every bare `?` in `text` stands for the
    /// next of `args`.
    pub fn compile_with_args(
        &mut self,
        ctx: &Context,
        text: &str,
        args: &[Term],
    ) -> Result<(), MachineError> {
        let mut stream = TermStream::from_text(atom!("user"), text, self.double_quotes);

        if !args.is_empty() {
            stream = stream.with_placeholders(args);
        }

        self.with_context(ctx, |machine| machine.load_source(stream))
    }

    /// Loads each file named by `files`, an atom or a list of atoms, in
    /// order. Every file is a load of its own.
    pub fn consult(&mut self, ctx: &Context, files: TermRef) -> Result<bool, MachineError> {
        let files = self.file_names(files)?;

        self.with_context(ctx, |machine| {
            for file in files {
                machine.context.check()?;

                debug!(file = %file, "consulting");

                let stream = machine.open_source(file)?;
                machine.load_source(stream)?;
            }

            Ok(true)
        })
    }

    /// [`Machine::consult`] for a term built outside the heap.
    pub fn consult_files(&mut self, ctx: &Context, files: &Term) -> Result<bool, MachineError> {
        let files = self.heap.build(files);
        self.consult(ctx, files)
    }

    fn file_names(&self, files: TermRef) -> Result<Vec<Atom>, MachineError> {
        if self.heap.is_var(files) {
            return Err(MachineError::Instantiation);
        }

        if self.heap.as_atom(files) == Some(atom!("[]")) {
            return Ok(vec![]);
        }

        match self.heap.list_shape(files) {
            ListShape::Proper(items) => items
                .into_iter()
                .map(|item| self.file_name(item))
                .collect(),
            ListShape::Improper(items, _) if items.is_empty() => Ok(vec![self.file_name(files)?]),
            _ => Err(MachineError::type_error(ValidType::Atom, &self.heap, files)),
        }
    }
}
