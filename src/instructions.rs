use crate::atom_table::*;
use crate::forms::*;
use crate::types::*;

use std::fmt;

/// The operation of an [`Instruction`], without its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Match or push an xr table term.
    Const,
    /// Match or push a variable slot.
    Var,
    /// Ends the head of a rule.
    Enter,
    /// Calls an xr table procedure with the pushed arguments.
    Call,
    /// Ends the clause.
    Exit,
}

impl Opcode {
    /// The mnemonic of the opcode.
    pub fn as_atom(self) -> Atom {
        match self {
            Opcode::Const => atom!("const"),
            Opcode::Var => atom!("var"),
            Opcode::Enter => atom!("enter"),
            Opcode::Call => atom!("call"),
            Opcode::Exit => atom!("exit"),
        }
    }
}

/// One step of a compiled clause.
///
/// `Const` and `Call` index the clause's xr table, `Var` indexes its
/// variable slots. In the head, `Const` and `Var` match the arguments of the
/// call; after `Enter` they push the arguments of the next `Call`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// An xr table offset.
    Const(usize),
    /// A variable slot.
    Var(usize),
    /// Switches from matching the head to building the body.
    Enter,
    /// The xr table offset of the called procedure.
    Call(usize),
    /// Ends the clause.
    Exit,
}

impl Instruction {
    /// The operation, without its operand.
    #[inline]
    pub fn opcode(self) -> Opcode {
        match self {
            Instruction::Const(_) => Opcode::Const,
            Instruction::Var(_) => Opcode::Var,
            Instruction::Enter => Opcode::Enter,
            Instruction::Call(_) => Opcode::Call,
            Instruction::Exit => Opcode::Exit,
        }
    }

    /// The offset or slot the instruction refers to, if any.
    #[inline]
    pub fn operand(self) -> Option<usize> {
        match self {
            Instruction::Const(n) | Instruction::Var(n) | Instruction::Call(n) => Some(n),
            Instruction::Enter | Instruction::Exit => None,
        }
    }

    /// The instruction as a term, e.g. `const(0)` or `exit`.
    pub fn to_term(self) -> Term {
        let args = match self.operand() {
            Some(n) => vec![Term::int(n as i64)],
            None => vec![],
        };

        Term::apply(self.opcode().as_atom(), args)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operand() {
            Some(n) => write!(f, "{} {}", self.opcode().as_atom(), n),
            None => write!(f, "{}", self.opcode().as_atom()),
        }
    }
}

/// The bytecode of one clause.
pub type Code = Vec<Instruction>;

/// An entry of a clause's xr table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrEntry {
    /// A constant, or a term template whose variables are clause variables.
    Term(TermRef),
    /// A call target.
    Procedure(ProcedureIndicator),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operands() {
        assert_eq!(Instruction::Const(3).operand(), Some(3));
        assert_eq!(Instruction::Enter.operand(), None);
        assert_eq!(Instruction::Call(1).opcode(), Opcode::Call);
    }

    #[test]
    fn listing() {
        assert_eq!(Instruction::Var(0).to_string(), "var 0");
        assert_eq!(Instruction::Exit.to_string(), "exit");
        assert_eq!(
            Instruction::Const(2).to_term(),
            Term::compound("const", vec![Term::int(2)])
        );
        assert_eq!(Instruction::Enter.to_term(), Term::atom("enter"));
    }
}
