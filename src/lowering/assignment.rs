//! Local declarations and assignment lowering, including the two aggregate
//! forms: initializer lists (element-per-element writes, recursing into
//! nested lists for multi dimensional arrays) and string literals (byte
//! writes plus a trailing zero terminator).

use crate::{
    ast::{Node, NodeKind, Token, TokenKind},
    diagnostics::CompileError,
    ir::{is_same_type_description, DataType, Operand, OperandKind},
    lowering::{expression::token_to_binary_operator, Lowering, Unit},
};

impl Lowering<'_, '_> {
    /// `var`/`const` local declaration with optional initializer
    pub fn local(&mut self, node: &Node) -> Result<(), CompileError> {
        let name_token = node.children[0].token.clone();

        let mut local_type = self.type_description_from_node(node)?;

        if node.kind == NodeKind::Var {
            local_type.become_mutable();
        }

        if self.root().symbol_exists(&name_token.text) {
            return Err(self.err("Symbol already defined", &name_token));
        }

        let local = self.create_local(&name_token, local_type)?;

        let last_node = node.children.last().ok_or_else(|| self.internal(&node.token))?;

        let has_initializer = matches!(
            last_node.kind,
            NodeKind::Expression
                | NodeKind::Term
                | NodeKind::StringLiteral
                | NodeKind::MultilineStringLiteral
                | NodeKind::InitializerList
        );

        if !has_initializer {
            return Ok(());
        }

        let rhs = self.expression(last_node)?;

        // Initialization writes through the local even when it is const
        let mut init_target = local;
        if let Unit::Value {
            type_description, ..
        } = &mut init_target
        {
            type_description.become_mutable();
        }

        let equal_token = Token::new(TokenKind::Equal, "=", name_token.line, name_token.column);

        self.assignment_from_units(&name_token, &last_node.token, &equal_token, init_target, rhs)
    }

    /// Assignment statement: `lhs op= expression`
    pub fn assignment(&mut self, node: &Node) -> Result<(), CompileError> {
        let lhs = self.term(&node.children[0])?;

        let operator_token = node.children[1].token.clone();

        let rhs = self.expression(&node.children[2])?;

        self.assignment_from_units(
            &node.children[0].token,
            &node.children[2].token,
            &operator_token,
            lhs,
            rhs,
        )
    }

    /// Shared by assignment statements and local initialization. Scalars
    /// copy through the pointer discipline, structs and arrays block-copy,
    /// lists and string literals take their dedicated paths.
    pub fn assignment_from_units(
        &mut self,
        lhs_token: &Token,
        rhs_token: &Token,
        operator_token: &Token,
        lhs: Unit,
        rhs: Unit,
    ) -> Result<(), CompileError> {
        if lhs.is_list() {
            return Err(self.internal(lhs_token));
        }

        if lhs.operand().is_literal() {
            return Err(self.err("Cannot assign to LITERAL", lhs_token));
        }

        if !lhs.is_mutable() {
            return Err(self.err("Cannot modify IMMUTABLE variable", lhs_token));
        }

        let is_compound = operator_token.kind != TokenKind::Equal;

        if rhs.is_list() {
            if is_compound {
                return Err(self.err(
                    "Assignment operators not allowed on ARRAY",
                    operator_token,
                ));
            }

            return self.assign_initializer_list(&lhs, &rhs, rhs_token);
        }

        if rhs.is_string_literal() && lhs.is_array() {
            if is_compound {
                return Err(self.err(
                    "Assignment operators not allowed on ARRAY",
                    operator_token,
                ));
            }

            return self.assign_string_literal(&lhs, &rhs, rhs_token);
        }

        if !is_same_type_description(lhs.type_description(), rhs.type_description()) {
            return Err(self.type_err(rhs_token, lhs.type_description(), rhs.type_description()));
        }

        if is_compound && lhs.is_struct() {
            return Err(self.err("Only EQUAL operator allowed on STRUCT", operator_token));
        }

        if is_compound && lhs.is_array() {
            return Err(self.err(
                "Assignment operators not allowed on ARRAY",
                operator_token,
            ));
        }

        if operator_token.kind.is_bitwise_operator() && !lhs.is_integer_type() {
            return Err(self.err("Bitwise operations not allowed on FLOAT", operator_token));
        }

        if !is_compound {
            self.unit_copy(&lhs, &rhs);
            return Ok(());
        }

        let opcode = token_to_binary_operator(operator_token)
            .ok_or_else(|| self.internal(operator_token))?;

        let result = self.binary_operator(opcode, &lhs, &rhs);
        self.unit_copy(&lhs, &result);

        Ok(())
    }

    /// Copies a string literal into a one dimensional byte array: one write
    /// per character and a trailing zero byte. The buffer must have room for
    /// the terminator.
    pub fn assign_string_literal(
        &mut self,
        dst: &Unit,
        src: &Unit,
        rhs_token: &Token,
    ) -> Result<(), CompileError> {
        let dst_type = dst.type_description();

        if dst_type.dimensions.len() != 1 || dst_type.dtype != DataType::UI8 {
            return Err(self.err(
                "String assignment only allowed on 1D CHAR ARRAY",
                rhs_token,
            ));
        }

        let OperandKind::StringData { key } = &src.operand().kind else {
            return Err(self.internal(rhs_token));
        };

        let chars = self.session.modules[src.module_name()]
            .strings_data
            .get(key)
            .cloned()
            .ok_or_else(|| self.internal(rhs_token))?;

        if chars.len() + 1 > dst_type.dimensions[0] {
            return Err(self.err("String too big", rhs_token));
        }

        let element_size = dst_type.dtype_size;

        let mut offset = self.get_pointer_operand(dst);

        for byte in chars.bytes() {
            self.operand_copy(
                offset.clone(),
                Operand::int_literal(DataType::UI8, byte as i64),
            );

            offset = self.address_add_operator(offset, Operand::bytes(element_size));
        }

        self.operand_copy(offset, Operand::int_literal(DataType::UI8, 0));

        Ok(())
    }

    /// Writes an initializer list into an array, one element per position,
    /// recursing into nested lists for the inner dimensions
    pub fn assign_initializer_list(
        &mut self,
        dst: &Unit,
        list: &Unit,
        rhs_token: &Token,
    ) -> Result<(), CompileError> {
        let dst_type = dst.type_description();

        if !dst_type.is_array() {
            return Err(self.err(
                "Cannot initialize a NON-ARRAY with initializer list",
                rhs_token,
            ));
        }

        let outer_dimension = dst_type.dimensions[0];

        let mut element_type = dst_type.clone();
        element_type.size /= outer_dimension;
        element_type.dimensions.remove(0);
        element_type.dimension_kinds.remove(0);

        let mut offset = self.get_pointer_operand(dst);

        let items = list.items();

        for (index, item) in items.iter().enumerate() {
            if index >= outer_dimension {
                return Err(self.err("Dimension size too big", rhs_token));
            }

            if element_type.is_array() {
                let element = Unit::new(offset.clone(), element_type.clone());

                if item.is_list() {
                    self.assign_initializer_list(&element, item, rhs_token)?;
                } else if item.is_string_literal() {
                    self.assign_string_literal(&element, item, rhs_token)?;
                } else {
                    return Err(self.err("Incorrect dimensions", rhs_token));
                }
            } else {
                if item.is_list() {
                    return Err(self.err("Incorrect dimensions", rhs_token));
                }

                if !is_same_type_description(&element_type, item.type_description()) {
                    return Err(self.type_err(rhs_token, &element_type, item.type_description()));
                }

                if element_type.is_struct() {
                    let element = Unit::new(offset.clone(), element_type.clone());
                    self.unit_copy(&element, item);
                } else {
                    self.operand_copy(offset.clone(), item.operand().clone());
                }
            }

            if index != items.len() - 1 {
                offset = self.address_add_operator(offset, Operand::bytes(element_type.size));
            }
        }

        if items.len() < outer_dimension {
            return Err(self.err("Dimension size too small", rhs_token));
        }

        Ok(())
    }
}
