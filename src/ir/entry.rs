//! Three-address instructions and their operands.
//!
//! An [`Entry`] is one instruction: an opcode plus up to three operands. A
//! function body is an ordered `Vec<Entry>` that back-ends replay with a
//! single forward pass (plus a backpatch table for labels). Comparisons do
//! not produce a value; they set an implicit flag consumed by the next
//! conditional branch, so each (compare, branch) pair must stay adjacent.

use strum::Display;

use crate::ir::types::DataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "camelCase")]
pub enum Opcode {
    /* Parameter passing and calls */
    Pass,
    PassAddress,
    PassPointer,
    Call,
    Return,

    /* Address arithmetic */
    AddressAdd,
    AddressMultiply,

    /* Moves */
    Equal,
    PointerAssign,
    Read,
    Write,

    /* Pointer creation */
    CreatePointer,
    AllocPointer,

    /* Casts */
    Cast,
    PointerCast,

    /* Unary and binary arithmetic */
    UnaryMinus,
    Not,
    Multiply,
    Divide,
    Remainder,
    Add,
    Subtract,
    RightShift,
    LeftShift,
    BitwiseAnd,
    BitwiseXor,
    BitwiseOr,

    /* Comparisons (set the implicit compare flag) */
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    IsEqual,
    IsNotEqual,

    /* Control flow */
    Goto,
    GotoIfTrue,
    GotoIfFalse,
    CreateLabel,

    /* Console I/O */
    Print,
    PrintString,
    Space,
    NewLine,
    Input,
    InputString,

    /* Block memory */
    MemoryCopy,

    Exit,
}

impl Opcode {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Opcode::LessThan
                | Opcode::LessThanOrEqual
                | Opcode::GreaterThan
                | Opcode::GreaterThanOrEqual
                | Opcode::IsEqual
                | Opcode::IsNotEqual
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OperandKind {
    /// A temporary holding a value
    Temp { id: u32 },
    /// A temporary holding an address
    TempPointer { id: u32 },
    /// An immediate byte offset used by address arithmetic
    Bytes { bytes: usize },
    /// A key into the owning module's string data table
    StringData { key: String },
    /// A named local variable
    Var { name: String },
    /// A named global variable
    GlobalVar { name: String },
    /// A named pointer (reference parameters)
    Pointer { name: String },
    /// The current function's return value slot
    ReturnValue,
    /// The return value slot of the function just called
    CalleeReturnValue,
    IntLiteral { value: i64 },
    FloatLiteral { value: f64 },
    Label { name: String },
    /// Names the module a callee lives in
    Module { name: String },
    None,
}

/// A tagged operand. Pointer-ness is recoverable from the tag alone; the
/// data type of a pointer operand is the pointee's data type.
#[derive(Debug, Clone, PartialEq)]
pub struct Operand {
    pub kind: OperandKind,
    pub dtype: DataType,
}

impl Operand {
    pub fn none() -> Self {
        Operand {
            kind: OperandKind::None,
            dtype: DataType::Void,
        }
    }

    pub fn temp(id: u32, dtype: DataType) -> Self {
        Operand {
            kind: OperandKind::Temp { id },
            dtype,
        }
    }

    pub fn temp_pointer(id: u32, dtype: DataType) -> Self {
        Operand {
            kind: OperandKind::TempPointer { id },
            dtype,
        }
    }

    pub fn bytes(bytes: usize) -> Self {
        Operand {
            kind: OperandKind::Bytes { bytes },
            dtype: DataType::AutoInt,
        }
    }

    pub fn string_data(key: impl Into<String>, dtype: DataType) -> Self {
        Operand {
            kind: OperandKind::StringData { key: key.into() },
            dtype,
        }
    }

    pub fn var(name: impl Into<String>, dtype: DataType) -> Self {
        Operand {
            kind: OperandKind::Var { name: name.into() },
            dtype,
        }
    }

    pub fn global_var(name: impl Into<String>, dtype: DataType) -> Self {
        Operand {
            kind: OperandKind::GlobalVar { name: name.into() },
            dtype,
        }
    }

    pub fn pointer(name: impl Into<String>, dtype: DataType) -> Self {
        Operand {
            kind: OperandKind::Pointer { name: name.into() },
            dtype,
        }
    }

    pub fn return_value(dtype: DataType) -> Self {
        Operand {
            kind: OperandKind::ReturnValue,
            dtype,
        }
    }

    pub fn callee_return_value(dtype: DataType) -> Self {
        Operand {
            kind: OperandKind::CalleeReturnValue,
            dtype,
        }
    }

    pub fn int_literal(dtype: DataType, value: i64) -> Self {
        Operand {
            kind: OperandKind::IntLiteral { value },
            dtype,
        }
    }

    pub fn float_literal(dtype: DataType, value: f64) -> Self {
        Operand {
            kind: OperandKind::FloatLiteral { value },
            dtype,
        }
    }

    pub fn label(name: impl Into<String>) -> Self {
        Operand {
            kind: OperandKind::Label { name: name.into() },
            dtype: DataType::Void,
        }
    }

    pub fn module(name: impl Into<String>) -> Self {
        Operand {
            kind: OperandKind::Module { name: name.into() },
            dtype: DataType::Void,
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(
            self.kind,
            OperandKind::TempPointer { .. } | OperandKind::Pointer { .. }
        )
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            OperandKind::IntLiteral { .. } | OperandKind::FloatLiteral { .. }
        )
    }

    pub fn is_none(&self) -> bool {
        matches!(self.kind, OperandKind::None)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub opcode: Opcode,
    pub op1: Operand,
    pub op2: Operand,
    pub op3: Operand,
}

impl Entry {
    pub fn new(opcode: Opcode) -> Self {
        Entry {
            opcode,
            op1: Operand::none(),
            op2: Operand::none(),
            op3: Operand::none(),
        }
    }

    pub fn unary(opcode: Opcode, op1: Operand) -> Self {
        Entry {
            opcode,
            op1,
            op2: Operand::none(),
            op3: Operand::none(),
        }
    }

    pub fn binary(opcode: Opcode, op1: Operand, op2: Operand) -> Self {
        Entry {
            opcode,
            op1,
            op2,
            op3: Operand::none(),
        }
    }

    pub fn ternary(opcode: Opcode, op1: Operand, op2: Operand, op3: Operand) -> Self {
        Entry {
            opcode,
            op1,
            op2,
            op3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_ness_is_recoverable_from_the_tag() {
        assert!(Operand::temp_pointer(0, DataType::I32).is_pointer());
        assert!(Operand::pointer("p", DataType::I32).is_pointer());
        assert!(!Operand::temp(0, DataType::I32).is_pointer());
        assert!(!Operand::var("x", DataType::I32).is_pointer());
        assert!(!Operand::global_var("g", DataType::I32).is_pointer());
    }

    #[test]
    fn opcode_display_uses_camel_case_names() {
        assert_eq!(Opcode::AddressAdd.to_string(), "addressAdd");
        assert_eq!(Opcode::GotoIfFalse.to_string(), "gotoIfFalse");
        assert_eq!(Opcode::MemoryCopy.to_string(), "memoryCopy");
    }
}
