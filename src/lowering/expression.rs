//! Expression and term lowering.
//!
//! Expressions lower post-order: operands first, then one three-address
//! entry per operator. Binary operators on struct operands dispatch to a
//! user defined operator function found in the left operand's module;
//! comparisons never appear here (they only exist inside conditions and are
//! lowered by the control-flow pass).

use crate::{
    ast::{Node, NodeKind, Token, TokenKind},
    diagnostics::CompileError,
    ir::{is_same_type_description, DataType, Opcode, Operand, TypeDescription},
    lowering::{Lowering, Unit},
};

pub(crate) fn token_to_binary_operator(token: &Token) -> Option<Opcode> {
    match token.kind {
        TokenKind::Multiply | TokenKind::MultiplyEqual => Some(Opcode::Multiply),
        TokenKind::Divide | TokenKind::DivideEqual => Some(Opcode::Divide),
        TokenKind::Modulo | TokenKind::ModuloEqual => Some(Opcode::Remainder),
        TokenKind::Plus | TokenKind::PlusEqual => Some(Opcode::Add),
        TokenKind::Minus | TokenKind::MinusEqual => Some(Opcode::Subtract),
        TokenKind::RightShift => Some(Opcode::RightShift),
        TokenKind::LeftShift => Some(Opcode::LeftShift),
        TokenKind::BitwiseAnd | TokenKind::AndEqual => Some(Opcode::BitwiseAnd),
        TokenKind::BitwiseXor | TokenKind::XorEqual => Some(Opcode::BitwiseXor),
        TokenKind::BitwiseOr | TokenKind::OrEqual => Some(Opcode::BitwiseOr),
        _ => None,
    }
}

impl Lowering<'_, '_> {
    pub fn expression(&mut self, node: &Node) -> Result<Unit, CompileError> {
        if node.kind == NodeKind::Term {
            return self.term(node);
        }

        if node.kind == NodeKind::StringLiteral
            || node.kind == NodeKind::MultilineStringLiteral
        {
            return Ok(self.string_literal_unit(&node.token.clone()));
        }

        if node.kind == NodeKind::InitializerList {
            return self.initializer_list(node);
        }

        if node.children.len() == 1 {
            return self.expression(&node.children[0]);
        }

        let operator_token = node.children[1].token.clone();

        let lhs = self.expression(&node.children[0])?;

        if lhs.is_struct() {
            let rhs = self.expression(&node.children[2])?;

            return self.custom_operator_call(
                &operator_token,
                &node.children[0].token,
                &node.children[2].token,
                lhs,
                rhs,
            );
        }

        if lhs.is_array() {
            return Err(self.err("Operator not allowed on ARRAY", &operator_token));
        }

        let rhs = self.expression(&node.children[2])?;

        if !is_same_type_description(lhs.type_description(), rhs.type_description()) {
            return Err(self.type_err(
                &node.children[2].token,
                lhs.type_description(),
                rhs.type_description(),
            ));
        }

        if operator_token.kind.is_bitwise_operator() && !lhs.is_integer_type() {
            return Err(self.err("Bitwise operations not allowed on FLOAT", &operator_token));
        }

        if operator_token.kind.is_conditional_operator() {
            return Err(self.err("Did not expect conditional operator", &operator_token));
        }

        let opcode = token_to_binary_operator(&operator_token)
            .ok_or_else(|| self.internal(&operator_token))?;

        Ok(self.binary_operator(opcode, &lhs, &rhs))
    }

    fn initializer_list(&mut self, node: &Node) -> Result<Unit, CompileError> {
        if node.children.is_empty() {
            return Err(self.err("Dimension size too small", &node.token));
        }

        let mut items = Vec::new();

        for child in &node.children {
            items.push(self.expression(child)?);
        }

        Ok(Unit::list(items))
    }

    pub fn term(&mut self, node: &Node) -> Result<Unit, CompileError> {
        let child = &node.children[0];

        match child.kind {
            NodeKind::Literal => self.literal(&child.token.clone()),
            NodeKind::StringLiteral | NodeKind::MultilineStringLiteral => {
                Ok(self.string_literal_unit(&child.token.clone()))
            }
            NodeKind::Identifier => self.access_chain(node),
            NodeKind::Cast => self.cast(child),
            NodeKind::PointerCast | NodeKind::PointerArrayCast => self.pointer_cast(child),
            NodeKind::UnaryOperator => self.unary(child),
            NodeKind::Expression => self.expression(child),
            NodeKind::InitializerList => self.initializer_list(child),
            NodeKind::FunctionCall => self.function_call(child),
            NodeKind::MethodCall => self.method_call(child),
            NodeKind::Module => self.module_qualified_term(node),
            NodeKind::SizeOf => self.size_of(child),
            _ => Err(self.internal(&child.token)),
        }
    }

    fn literal(&mut self, token: &Token) -> Result<Unit, CompileError> {
        match token.kind {
            TokenKind::IntLiteral | TokenKind::HexLiteral | TokenKind::BinLiteral => {
                let value = token.int_value().ok_or_else(|| self.internal(token))?;

                Ok(Unit::new(
                    Operand::int_literal(DataType::AutoInt, value),
                    TypeDescription::from_data_type(DataType::AutoInt),
                ))
            }
            TokenKind::CharLiteral => {
                let value = token.int_value().ok_or_else(|| self.internal(token))?;

                Ok(Unit::new(
                    Operand::int_literal(DataType::UI8, value),
                    TypeDescription::from_data_type(DataType::UI8),
                ))
            }
            TokenKind::FloatLiteral => {
                let value = token.float_value().ok_or_else(|| self.internal(token))?;

                Ok(Unit::new(
                    Operand::float_literal(DataType::AutoFloat, value),
                    TypeDescription::from_data_type(DataType::AutoFloat),
                ))
            }
            _ => Err(self.internal(token)),
        }
    }

    /// Interns a string literal into the module's string table and returns
    /// its unit: a null-terminated byte array addressed by the table key
    pub fn string_literal_unit(&mut self, token: &Token) -> Unit {
        let key = self.create_string_data(token);
        let char_count = token.unescaped.len();

        self.string_data_unit(&key, char_count, &self.root_module.clone())
    }

    /// Resolves an identifier and applies its field/subscript chain. Every
    /// `.field` and `[index]` narrows the unit's type and rebases the
    /// pointer; the result of a non-empty chain is always a pointer unit.
    fn access_chain(&mut self, node: &Node) -> Result<Unit, CompileError> {
        let name_token = &node.children[0].token;

        let mut unit = self.get_unit_from_token(name_token)?;

        if node.children.len() > 1 && unit.operand().is_literal() {
            return Err(self.err("Invalid use of ENUM or DEF", name_token));
        }

        let mut cursor = 1;

        while cursor < node.children.len() {
            let child = &node.children[cursor];

            match child.kind {
                NodeKind::StructField => {
                    let field_token = child.token.clone();

                    if unit.is_array() {
                        return Err(self.err("STRUCT access on an ARRAY", &field_token));
                    }

                    if !unit.is_struct() {
                        return Err(
                            self.err("STRUCT access on a NON-STRUCT data type", &field_token)
                        );
                    }

                    unit = self.get_struct_field(&field_token, &unit)?;
                    cursor += 1;
                }
                NodeKind::Subscript => {
                    // A run of subscripts is applied in one go so the element
                    // width bookkeeping can walk the dimensions
                    let subscript_token = child.token.clone();

                    if unit.is_struct() && !unit.is_array() {
                        return self.subscript_operator_call(node, &mut cursor, unit);
                    }

                    if !unit.is_array() {
                        return Err(self.err("ARRAY access on a NON ARRAY", &subscript_token));
                    }

                    let mut indices = Vec::new();

                    while cursor < node.children.len()
                        && node.children[cursor].kind == NodeKind::Subscript
                    {
                        let subscript = &node.children[cursor];

                        if indices.len() + 1 > unit.type_description().dimensions.len() {
                            return Err(self.err("Too many subscripts", &subscript.token));
                        }

                        let index = self.expression(&subscript.children[0])?;

                        if !index.is_integer_type() {
                            return Err(
                                self.err("Index must be an integer", &subscript.children[0].token)
                            );
                        }

                        indices.push(index);
                        cursor += 1;
                    }

                    unit = self.get_indexed_element(&unit, &indices)?;
                }
                _ => return Err(self.internal(&child.token)),
            }
        }

        Ok(unit)
    }

    /// `a[i]` on a struct dispatches to the user defined `subscript`
    /// operator function in the struct's module
    fn subscript_operator_call(
        &mut self,
        node: &Node,
        cursor: &mut usize,
        unit: Unit,
    ) -> Result<Unit, CompileError> {
        let subscript = &node.children[*cursor];
        let subscript_token = subscript.token.clone();

        let index = self.expression(&subscript.children[0])?;
        *cursor += 1;

        if *cursor < node.children.len() {
            return Err(self.err("Too many subscripts", &node.children[*cursor].token));
        }

        let struct_module = unit.module_name().to_owned();

        self.with_working_module(&struct_module, |lowering| {
            let (callee_key, callee) =
                lowering.get_subscript_operator_function(&subscript_token, &[&unit, &index])?;

            lowering.call_with_arguments(
                &subscript_token,
                &callee_key,
                &callee,
                &[(unit.clone(), subscript_token.clone()), (index.clone(), subscript_token.clone())],
            )
        })
    }

    fn cast(&mut self, node: &Node) -> Result<Unit, CompileError> {
        let type_token = node.token.clone();

        let destination_dtype = DataType::from_type_name(&type_token.text)
            .filter(|dtype| *dtype != DataType::Void)
            .ok_or_else(|| self.err("Cannot cast to STRUCT or VOID", &type_token))?;

        let term = self.term(&node.children[0])?;

        if term.is_array() || term.is_struct() {
            return Err(self.err("Cannot cast STRUCT or ARRAY", &type_token));
        }

        Ok(self.cast_operator(&term, destination_dtype))
    }

    fn pointer_cast(&mut self, node: &Node) -> Result<Unit, CompileError> {
        let type_token = node.token.clone();

        let destination_dtype = DataType::from_type_name(&type_token.text)
            .filter(|dtype| *dtype != DataType::Void)
            .ok_or_else(|| self.err("Cannot cast to STRUCT or VOID", &type_token))?;

        let term = self.term(&node.children[0])?;

        let mut destination_type = TypeDescription::from_data_type(destination_dtype);

        if node.kind == NodeKind::PointerArrayCast {
            destination_type.become_array_pointer();
        } else {
            destination_type.become_pointer();
        }

        Ok(self.pointer_cast_operator(&term, destination_type))
    }

    fn unary(&mut self, node: &Node) -> Result<Unit, CompileError> {
        let operator_token = node.token.clone();

        let term = self.term(&node.children[0])?;

        if term.is_array() {
            return Err(self.err("Unary operator not allowed on ARRAY", &operator_token));
        }

        if term.is_struct() {
            return Err(self.err("Unary operator not allowed on STRUCT", &operator_token));
        }

        let opcode = match operator_token.kind {
            TokenKind::Minus => Opcode::UnaryMinus,
            TokenKind::BitwiseNot => {
                if !term.is_integer_type() {
                    return Err(
                        self.err("Unary operator NOT not allowed on FLOAT", &operator_token)
                    );
                }
                Opcode::Not
            }
            TokenKind::LogicalNot => {
                return Err(self.err("Did not expect CONDN NOT", &operator_token));
            }
            _ => return Err(self.internal(&operator_token)),
        };

        Ok(self.unary_operator(opcode, &term))
    }

    /// A term prefixed by one or more module qualifiers; the tail resolves
    /// against the named module
    fn module_qualified_term(&mut self, node: &Node) -> Result<Unit, CompileError> {
        let mut module_name = self.working_module.clone();
        let mut cursor = 0;

        while node.nth_child_is(NodeKind::Module, cursor) {
            let alias_token = node.nth_child_token(cursor);

            module_name = self.session.modules[&module_name]
                .module_name_from_alias(&alias_token.text)
                .map(str::to_owned)
                .ok_or_else(|| self.err("Module does not exist", alias_token))?;

            cursor += 1;
        }

        let target = &node.children[cursor];

        match target.kind {
            NodeKind::Identifier => {
                let tail = Node::with_children(
                    NodeKind::Term,
                    node.token.clone(),
                    node.children[cursor..].to_vec(),
                );

                self.with_working_module(&module_name, |lowering| lowering.term(&tail))
            }
            NodeKind::FunctionCall => {
                let call = target.clone();
                self.with_working_module(&module_name, |lowering| lowering.function_call(&call))
            }
            _ => Err(self.err("Invalid use of MODULE ACCESS", &target.token)),
        }
    }

    /// `sizeof(<module>? <type or symbol>)` folds to an integer literal
    fn size_of(&mut self, node: &Node) -> Result<Unit, CompileError> {
        let mut module_name = self.working_module.clone();
        let mut cursor = 0;

        while node.nth_child_is(NodeKind::Module, cursor) {
            let alias_token = node.nth_child_token(cursor);

            module_name = self.session.modules[&module_name]
                .module_name_from_alias(&alias_token.text)
                .map(str::to_owned)
                .ok_or_else(|| self.err("Module does not exist", alias_token))?;

            cursor += 1;
        }

        let name_token = node.nth_child_token(cursor).clone();

        let size = if let Some(dtype) =
            DataType::from_type_name(&name_token.text).filter(|d| *d != DataType::Void)
        {
            dtype.byte_size()
        } else if let Some(structure) =
            self.session.modules[&module_name].structures.get(&name_token.text)
        {
            structure.size
        } else if let Some(global) = self.session.modules[&module_name]
            .globals
            .get(&crate::lowering::mangle::mangle(&name_token.text, &module_name))
        {
            global.size
        } else if let Some(symbol) = self
            .working_function
            .as_ref()
            .and_then(|_| self.function().symbol(&name_token.text))
        {
            symbol.dtype_size
        } else {
            return Err(self.err("Symbol does not exist", &name_token));
        };

        Ok(Unit::new(
            Operand::int_literal(DataType::AutoInt, size as i64),
            TypeDescription::from_data_type(DataType::AutoInt),
        ))
    }
}
