//! Function calls, method calls and user defined operator dispatch.
//!
//! Arguments are type checked against the formal parameters one by one and
//! passed in order with `Pass`/`PassAddress`; the `Call` entry follows with a
//! fresh callee-return-value operand of the callee's return data type.
//! Mutable formals demand mutable, named storage on the caller's side.

use crate::{
    ast::{Node, NodeKind, Token},
    diagnostics::CompileError,
    ir::{is_same_type_description, FunctionDescription, TypeDescription},
    lowering::{Lowering, Unit},
};

impl Lowering<'_, '_> {
    /// Type and mutability checks for one argument, then the pass entry
    fn check_and_pass_argument(
        &mut self,
        argument_token: &Token,
        callee_key: &str,
        callee: &FunctionDescription,
        formal: &TypeDescription,
        actual: &Unit,
    ) -> Result<(), CompileError> {
        if actual.is_list()
            || !is_same_type_description(formal, actual.type_description())
        {
            return Err(self.type_err(
                argument_token,
                formal,
                actual.type_description(),
            ));
        }

        if formal.is_mutable() {
            if actual.is_expression_value() {
                return Err(self.err(
                    "Cannot pass an EXPRESSION or STRING LITERAL as MUTABLE",
                    argument_token,
                ));
            }

            if !actual.is_mutable() {
                return Err(self.err("Cannot pass IMMUTABLE as MUTABLE", argument_token));
            }
        }

        self.pass_parameter(callee_key, callee, formal, actual);

        Ok(())
    }

    /// Shared tail of every call form: arity check, per-argument checks and
    /// passes, then the call entry
    pub fn call_with_arguments(
        &mut self,
        call_token: &Token,
        callee_key: &str,
        callee: &FunctionDescription,
        arguments: &[(Unit, Token)],
    ) -> Result<Unit, CompileError> {
        if arguments.len() != callee.parameter_names.len() {
            return Err(self.err("Number of parameters don't match", call_token));
        }

        for (index, (actual, argument_token)) in arguments.iter().enumerate() {
            let formal = callee
                .parameter_type_at(index)
                .ok_or_else(|| self.internal(call_token))?
                .clone();

            self.check_and_pass_argument(argument_token, callee_key, callee, &formal, actual)?;
        }

        Ok(self.call_function(callee_key, callee))
    }

    /// `f(a, b)` — the callee resolves in the working module (module
    /// qualified calls switch the working module before getting here)
    pub fn function_call(&mut self, node: &Node) -> Result<Unit, CompileError> {
        let call_token = node.token.clone();

        let (callee_key, callee) = self.get_function(&call_token)?;

        if node.children.len() != callee.parameter_names.len() {
            return Err(self.err("Number of parameters don't match", &call_token));
        }

        let mut arguments = Vec::new();

        for child in &node.children {
            let unit = match child.kind {
                NodeKind::StringLiteral | NodeKind::MultilineStringLiteral => {
                    self.string_literal_unit(&child.token.clone())
                }
                _ => self.expression(child)?,
            };

            arguments.push((unit, child.token.clone()));
        }

        self.call_with_arguments(&call_token, &callee_key, &callee, &arguments)
    }

    /// `target.method(a, b)` — the method resolves in the target's module
    /// and the target becomes the first argument
    pub fn method_call(&mut self, node: &Node) -> Result<Unit, CompileError> {
        let method_token = node.token.clone();
        let target_node = &node.children[0];

        let target = self.term(target_node)?;

        // Primitive units carry no module; their methods resolve where the
        // call appears
        let method_module = if target.module_name().is_empty() {
            self.working_module.clone()
        } else {
            target.module_name().to_owned()
        };

        let target_token = target_node.token.clone();
        let argument_nodes: Vec<Node> = node.children[1..].to_vec();

        self.with_working_module(&method_module, |lowering| {
            let (callee_key, callee) = lowering.get_function(&method_token)?;

            let mut arguments = vec![(target.clone(), target_token.clone())];

            for child in &argument_nodes {
                let unit = match child.kind {
                    NodeKind::StringLiteral | NodeKind::MultilineStringLiteral => {
                        lowering.string_literal_unit(&child.token.clone())
                    }
                    _ => lowering.expression(child)?,
                };

                arguments.push((unit, child.token.clone()));
            }

            lowering.call_with_arguments(&method_token, &callee_key, &callee, &arguments)
        })
    }

    /// `a + b` on structs: finds the operator overload in the left operand's
    /// module and lowers the expression as a call to it
    pub fn custom_operator_call(
        &mut self,
        operator_token: &Token,
        lhs_token: &Token,
        rhs_token: &Token,
        lhs: Unit,
        rhs: Unit,
    ) -> Result<Unit, CompileError> {
        let operator_module = lhs.module_name().to_owned();
        let operator_token = operator_token.clone();
        let lhs_token = lhs_token.clone();
        let rhs_token = rhs_token.clone();

        self.with_working_module(&operator_module, |lowering| {
            let (callee_key, callee) =
                lowering.get_custom_operator_function(&operator_token, &[&lhs, &rhs])?;

            lowering.call_with_arguments(
                &operator_token,
                &callee_key,
                &callee,
                &[(lhs.clone(), lhs_token), (rhs.clone(), rhs_token)],
            )
        })
    }
}
