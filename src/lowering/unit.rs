//! The value lowering carries around: an operand paired with its full type,
//! or a nested initializer list of such values.

use crate::ir::{DataType, Operand, OperandKind, TypeDescription};

#[derive(Debug, Clone)]
pub enum Unit {
    Value {
        operand: Operand,
        type_description: TypeDescription,
    },
    /// An initializer list expression. Items are in source order; nested
    /// lists describe the inner dimensions of a multi dimensional array.
    List { items: Vec<Unit> },
}

impl Unit {
    pub fn new(operand: Operand, type_description: TypeDescription) -> Self {
        Unit::Value {
            operand,
            type_description,
        }
    }

    pub fn list(items: Vec<Unit>) -> Self {
        Unit::List { items }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Unit::List { .. })
    }

    /// The operand of a value unit. Lists have no single operand; callers
    /// must check [`Unit::is_list`] first.
    pub fn operand(&self) -> &Operand {
        match self {
            Unit::Value { operand, .. } => operand,
            Unit::List { .. } => panic!("initializer list has no operand"),
        }
    }

    pub fn type_description(&self) -> &TypeDescription {
        match self {
            Unit::Value {
                type_description, ..
            } => type_description,
            Unit::List { items } => items
                .first()
                .map(|item| item.type_description())
                .expect("empty initializer list has no type"),
        }
    }

    pub fn items(&self) -> &[Unit] {
        match self {
            Unit::List { items } => items,
            Unit::Value { .. } => std::slice::from_ref(self),
        }
    }

    /// Leaf units in left-to-right order
    pub fn flatten(&self) -> Vec<&Unit> {
        match self {
            Unit::Value { .. } => vec![self],
            Unit::List { items } => items.iter().flat_map(|item| item.flatten()).collect(),
        }
    }

    pub fn module_name(&self) -> &str {
        &self.type_description().module_name
    }

    pub fn dtype(&self) -> DataType {
        self.type_description().dtype
    }

    pub fn size(&self) -> usize {
        self.type_description().size
    }

    pub fn is_mutable(&self) -> bool {
        self.type_description().is_mutable()
    }

    pub fn is_struct(&self) -> bool {
        self.type_description().is_struct()
    }

    pub fn is_array(&self) -> bool {
        self.type_description().is_array()
    }

    pub fn is_multi_dim_array(&self) -> bool {
        self.type_description().is_multi_dim_array()
    }

    pub fn is_integer_type(&self) -> bool {
        self.type_description().is_integer_type()
    }

    pub fn is_char_array(&self) -> bool {
        self.is_array() && self.dtype() == DataType::UI8
    }

    pub fn is_string_literal(&self) -> bool {
        self.type_description().is_string_literal()
    }

    /// Whether the unit names storage something can be read into
    pub fn is_valid_for_pointer_assignment(&self) -> bool {
        !self.is_list()
            && matches!(
                self.operand().kind,
                OperandKind::Var { .. }
                    | OperandKind::GlobalVar { .. }
                    | OperandKind::TempPointer { .. }
                    | OperandKind::Pointer { .. }
            )
    }

    /// Whether the unit is a computed value rather than named storage; such
    /// units can never be passed to a mutable parameter
    pub fn is_expression_value(&self) -> bool {
        self.is_list()
            || matches!(
                self.operand().kind,
                OperandKind::Temp { .. }
                    | OperandKind::CalleeReturnValue
                    | OperandKind::StringData { .. }
                    | OperandKind::IntLiteral { .. }
                    | OperandKind::FloatLiteral { .. }
                    | OperandKind::Bytes { .. }
            )
    }
}
