//! Statement and control-flow lowering.
//!
//! Loops and conditionals flatten into labels and branches. Conditions use
//! the classic control-flow-expression scheme (dragon book, Fig. 6.39/6.40):
//! every subexpression receives a true target, a false target and two flags
//! saying which side reaches its target by falling through; fresh labels are
//! only created where a fall-through needs a landing point.

use crate::{
    ast::{Node, NodeKind, Token, TokenKind},
    diagnostics::CompileError,
    ir::{is_same_type_description, Opcode, Operand},
    lowering::{Lowering, Unit},
};

/// Branch targets a loop body propagates down for `break`/`continue`
pub(crate) struct LoopLabels {
    pub break_label: Operand,
    pub continue_label: Operand,
}

fn token_to_compare_operator(token: &Token) -> Option<Opcode> {
    match token.kind {
        TokenKind::LessThan => Some(Opcode::LessThan),
        TokenKind::LessThanOrEqual => Some(Opcode::LessThanOrEqual),
        TokenKind::GreaterThan => Some(Opcode::GreaterThan),
        TokenKind::GreaterThanOrEqual => Some(Opcode::GreaterThanOrEqual),
        TokenKind::EqualEqual => Some(Opcode::IsEqual),
        TokenKind::NotEqual => Some(Opcode::IsNotEqual),
        _ => None,
    }
}

impl Lowering<'_, '_> {
    /// Lowers the statements of one block, tracking a lexical scope
    pub fn block(
        &mut self,
        node: &Node,
        loop_labels: Option<&LoopLabels>,
    ) -> Result<(), CompileError> {
        self.scope.enter_scope();

        let result = self.block_statements(node, loop_labels);

        self.scope.exit_scope();

        result
    }

    fn block_statements(
        &mut self,
        node: &Node,
        loop_labels: Option<&LoopLabels>,
    ) -> Result<(), CompileError> {
        for statement in &node.children {
            match statement.kind {
                NodeKind::Var | NodeKind::Const => self.local(statement)?,
                NodeKind::Assignment => self.assignment(statement)?,
                NodeKind::FunctionCall => {
                    self.function_call(statement)?;
                }
                NodeKind::MethodCall => {
                    self.method_call(statement)?;
                }
                NodeKind::Term => {
                    let target = &statement.children[0];

                    if !matches!(
                        target.kind,
                        NodeKind::FunctionCall | NodeKind::MethodCall | NodeKind::Module
                    ) {
                        return Err(self.internal(&statement.token));
                    }

                    self.term(statement)?;
                }
                NodeKind::If => self.if_statement(statement, loop_labels)?,
                NodeKind::While => self.while_loop(statement)?,
                NodeKind::DoWhile => self.do_while_loop(statement)?,
                NodeKind::For => self.for_loop(statement)?,
                NodeKind::Loop => self.loop_statement(statement)?,
                NodeKind::Break => match loop_labels {
                    Some(labels) => {
                        let break_label = labels.break_label.clone();
                        self.create_branch(Opcode::Goto, break_label);
                    }
                    None => return Err(self.err("BREAK outside loop", &statement.token)),
                },
                NodeKind::Continue => match loop_labels {
                    Some(labels) => {
                        let continue_label = labels.continue_label.clone();
                        self.create_branch(Opcode::Goto, continue_label);
                    }
                    None => return Err(self.err("CONTINUE outside loop", &statement.token)),
                },
                NodeKind::Return => self.return_statement(statement)?,
                NodeKind::Print | NodeKind::PrintLine => self.print_statement(statement)?,
                NodeKind::Space => self.no_argument_entry(Opcode::Space),
                NodeKind::Input => self.input_statement(statement)?,
                _ => return Err(self.internal(&statement.token)),
            }
        }

        Ok(())
    }

    /// Lowers a condition into branches against the given targets. `t_fall` /
    /// `f_fall` say whether the true/false outcome reaches its target by
    /// falling through instead of branching.
    pub fn conditional_expression(
        &mut self,
        node: &Node,
        t_label: &Operand,
        f_label: &Operand,
        t_fall: bool,
        f_fall: bool,
    ) -> Result<(), CompileError> {
        if node.kind == NodeKind::Term {
            let child = &node.children[0];

            // A parenthesized condition nests as an expression term
            if child.kind == NodeKind::Expression {
                return self.conditional_expression(child, t_label, f_label, t_fall, f_fall);
            }

            // Unary NOT swaps the targets and the fall-throughs
            if child.kind == NodeKind::UnaryOperator
                && child.token.kind == TokenKind::LogicalNot
            {
                return self.conditional_expression(
                    &child.children[0],
                    f_label,
                    t_label,
                    f_fall,
                    t_fall,
                );
            }

            return Err(self.err("Invalid conditional expression", &node.token));
        }

        if node.children.len() == 1 {
            return self.conditional_expression(&node.children[0], t_label, f_label, t_fall, f_fall);
        }

        let operator_token = node.children[1].token.clone();

        match operator_token.kind {
            TokenKind::LogicalAnd => {
                let new_t_label = self.create_label(&operator_token, true, "and");
                let new_f_label = self.create_label(&operator_token, false, "and");

                if !f_fall {
                    self.conditional_expression(
                        &node.children[0],
                        &new_t_label,
                        f_label,
                        true,
                        false,
                    )?;
                } else {
                    self.conditional_expression(
                        &node.children[0],
                        &new_t_label,
                        &new_f_label,
                        true,
                        false,
                    )?;
                }

                self.conditional_expression(&node.children[2], t_label, f_label, t_fall, f_fall)?;

                if f_fall {
                    self.insert_label(new_f_label);
                }
            }
            TokenKind::LogicalOr => {
                let new_t_label = self.create_label(&operator_token, true, "or");
                let new_f_label = self.create_label(&operator_token, false, "or");

                if !t_fall {
                    self.conditional_expression(
                        &node.children[0],
                        t_label,
                        &new_f_label,
                        false,
                        true,
                    )?;
                } else {
                    self.conditional_expression(
                        &node.children[0],
                        &new_t_label,
                        &new_f_label,
                        false,
                        true,
                    )?;
                }

                self.conditional_expression(&node.children[2], t_label, f_label, t_fall, f_fall)?;

                if t_fall {
                    self.insert_label(new_t_label);
                }
            }
            _ => {
                let opcode = token_to_compare_operator(&operator_token)
                    .ok_or_else(|| self.err("Invalid conditional expression", &operator_token))?;

                let lhs = self.expression(&node.children[0])?;

                if lhs.is_struct() || lhs.is_array() {
                    return Err(self.err("Cannot compare STRUCT or ARRAYS", &operator_token));
                }

                let rhs = self.expression(&node.children[2])?;

                if !is_same_type_description(lhs.type_description(), rhs.type_description()) {
                    return Err(self.type_err(
                        &node.children[2].token,
                        lhs.type_description(),
                        rhs.type_description(),
                    ));
                }

                self.compare_operator(opcode, &lhs, &rhs);

                if !t_fall {
                    self.create_branch(Opcode::GotoIfTrue, t_label.clone());
                }

                if !f_fall {
                    self.create_branch(Opcode::GotoIfFalse, f_label.clone());
                }
            }
        }

        Ok(())
    }

    /// `if`/`elseif`/`else`: each taken branch jumps to a shared end label
    /// unless it is the last one; each condition falls into its block and
    /// branches past it on false
    fn if_statement(
        &mut self,
        node: &Node,
        loop_labels: Option<&LoopLabels>,
    ) -> Result<(), CompileError> {
        let end_label = self.create_label(&node.token, false, "ifend");

        struct Branch<'n> {
            token: Token,
            condition: Option<&'n Node>,
            block: &'n Node,
        }

        let mut branches = vec![Branch {
            token: node.token.clone(),
            condition: Some(&node.children[0]),
            block: &node.children[1],
        }];

        for child in node.children.iter().skip(2) {
            match child.kind {
                NodeKind::ElseIf => branches.push(Branch {
                    token: child.token.clone(),
                    condition: Some(&child.children[0]),
                    block: &child.children[1],
                }),
                NodeKind::Else => branches.push(Branch {
                    token: child.token.clone(),
                    condition: None,
                    block: &child.children[0],
                }),
                _ => return Err(self.internal(&child.token)),
            }
        }

        let branch_count = branches.len();

        for (index, branch) in branches.into_iter().enumerate() {
            match branch.condition {
                Some(condition) => {
                    let new_t_label = self.create_label(&branch.token, true, "if");
                    let new_f_label = self.create_label(&branch.token, false, "if");

                    self.conditional_expression(condition, &new_t_label, &new_f_label, true, false)?;

                    self.block(branch.block, loop_labels)?;

                    if index != branch_count - 1 {
                        self.create_branch(Opcode::Goto, end_label.clone());
                    }

                    self.insert_label(new_f_label);
                }
                None => self.block(branch.block, loop_labels)?,
            }
        }

        if branch_count > 1 {
            self.insert_label(end_label);
        }

        Ok(())
    }

    fn while_loop(&mut self, node: &Node) -> Result<(), CompileError> {
        let entry_label = self.create_label(&node.token, true, "while");
        let exit_label = self.create_label(&node.token, false, "while");

        self.insert_label(entry_label.clone());

        self.conditional_expression(&node.children[0], &entry_label, &exit_label, true, false)?;

        self.block(
            &node.children[1],
            Some(&LoopLabels {
                break_label: exit_label.clone(),
                continue_label: entry_label.clone(),
            }),
        )?;

        self.create_branch(Opcode::Goto, entry_label);
        self.insert_label(exit_label);

        Ok(())
    }

    /// Condition at the bottom: the true outcome branches back to the entry
    /// label, the false outcome falls through past the loop
    fn do_while_loop(&mut self, node: &Node) -> Result<(), CompileError> {
        let entry_label = self.create_label(&node.token, true, "dowhile");
        let exit_label = self.create_label(&node.token, false, "dowhile");

        self.insert_label(entry_label.clone());

        self.block(
            &node.children[0],
            Some(&LoopLabels {
                break_label: exit_label.clone(),
                continue_label: entry_label.clone(),
            }),
        )?;

        self.conditional_expression(&node.children[1], &entry_label, &exit_label, false, true)?;

        self.insert_label(exit_label);

        Ok(())
    }

    fn for_loop(&mut self, node: &Node) -> Result<(), CompileError> {
        let init = &node.children[0];

        if init.kind == NodeKind::Var {
            self.local(init)?;
        } else {
            self.assignment(init)?;
        }

        let entry_label = self.create_label(&node.token, true, "for");
        let exit_label = self.create_label(&node.token, false, "for");
        let continue_label = self.create_label(&node.token, true, "for_cont");

        self.insert_label(entry_label.clone());

        self.conditional_expression(&node.children[1], &entry_label, &exit_label, true, false)?;

        self.block(
            &node.children[3],
            Some(&LoopLabels {
                break_label: exit_label.clone(),
                continue_label: continue_label.clone(),
            }),
        )?;

        self.insert_label(continue_label);

        self.assignment(&node.children[2])?;

        self.create_branch(Opcode::Goto, entry_label);
        self.insert_label(exit_label);

        Ok(())
    }

    /// Bare `loop`: body between entry and exit labels with an unconditional
    /// back edge
    fn loop_statement(&mut self, node: &Node) -> Result<(), CompileError> {
        let entry_label = self.create_label(&node.token, true, "loop");
        let exit_label = self.create_label(&node.token, false, "loop");

        self.insert_label(entry_label.clone());

        self.block(
            &node.children[0],
            Some(&LoopLabels {
                break_label: exit_label.clone(),
                continue_label: entry_label.clone(),
            }),
        )?;

        self.create_branch(Opcode::Goto, entry_label);
        self.insert_label(exit_label);

        Ok(())
    }

    fn return_statement(&mut self, node: &Node) -> Result<(), CompileError> {
        let return_type = self.function().return_type.clone();

        match node.children.first() {
            Some(value_node) => {
                let value = self.expression(value_node)?;

                if value.is_list()
                    || !is_same_type_description(&return_type, value.type_description())
                {
                    return Err(self.type_err(
                        &value_node.token,
                        &return_type,
                        value.type_description(),
                    ));
                }

                let return_operand =
                    Operand::return_value(self.canonical_operand_dtype(&return_type));
                let return_unit = Unit::new(return_operand, return_type);

                self.unit_copy(&return_unit, &value);
            }
            None => {
                if !return_type.is_void() {
                    return Err(self.err("Ret type is not VOID", &node.token));
                }
            }
        }

        self.no_argument_entry(Opcode::Return);

        Ok(())
    }

    fn print_statement(&mut self, node: &Node) -> Result<(), CompileError> {
        if node.children.is_empty() {
            if node.kind == NodeKind::PrintLine {
                self.no_argument_entry(Opcode::NewLine);
            }

            return Ok(());
        }

        for (index, child) in node.children.iter().enumerate() {
            let unit = match child.kind {
                NodeKind::StringLiteral | NodeKind::MultilineStringLiteral => {
                    self.string_literal_unit(&child.token.clone())
                }
                _ => {
                    let unit = self.expression(child)?;

                    if unit.is_list() || unit.is_struct() || unit.is_multi_dim_array() {
                        return Err(self.err(
                            "Cannot print STRUCT or multi-dimensional ARRAY",
                            &child.token,
                        ));
                    }

                    unit
                }
            };

            self.create_print(&unit);

            if index != node.children.len() - 1 {
                self.no_argument_entry(Opcode::Space);
            } else if node.kind == NodeKind::PrintLine {
                self.no_argument_entry(Opcode::NewLine);
            }
        }

        Ok(())
    }

    fn input_statement(&mut self, node: &Node) -> Result<(), CompileError> {
        let target_node = &node.children[0];

        let unit = self.expression(target_node)?;

        if unit.is_list() || !unit.is_valid_for_pointer_assignment() {
            return Err(self.err("Invalid term for INPUT", &target_node.token));
        }

        if unit.is_struct() {
            return Err(self.err("Cannot INPUT STRUCT", &target_node.token));
        }

        if unit.is_multi_dim_array() {
            return Err(self.err("Cannot INPUT more than 1D ARRAY", &target_node.token));
        }

        if unit.is_array() && !unit.is_char_array() {
            return Err(self.err("String input requires 1D CHAR ARRAY", &target_node.token));
        }

        self.create_input(&unit);

        Ok(())
    }
}
