/// Interns `$name` in the process-wide atom table.
#[macro_export]
macro_rules! atom {
    ($name:expr) => {
        $crate::atom_table::Atom::build_with($name)
    };
}

/// Builds a [`ProcedureIndicator`](crate::forms::ProcedureIndicator) from a
/// name and an arity.
#[macro_export]
macro_rules! pi {
    ($name:expr, $arity:expr) => {
        $crate::forms::ProcedureIndicator::new($crate::atom!($name), $arity)
    };
}
