//! Construction of type descriptions from AST type nodes, including the
//! monomorphization trigger: a type reference carrying `GenericTypeParam`
//! children instantiates (and on first use compiles) the generic module
//! before the concrete struct type can be returned.

use crate::{
    ast::{Node, NodeKind, Token},
    diagnostics::CompileError,
    ir::{DataType, DimensionKind, TypeDescription},
    lowering::{compile_ast_with_imports, mono, Lowering},
};

/// Rebuilds a resolved type as a self-contained type node sequence wrapped in
/// a `GenericTypeParam`: structs come out qualified by their defining module,
/// primitives by their canonical name. Substitution splices these in place of
/// generic parameter identifiers, so they must resolve without the use-site's
/// import context.
fn canonical_type_node(ty: &TypeDescription) -> Node {
    let mut children = Vec::new();

    if ty.is_struct() {
        children.push(Node::new(
            NodeKind::Module,
            Token::identifier(ty.module_name.as_str(), 0, 0),
        ));
        children.push(Node::new(
            NodeKind::Identifier,
            Token::identifier(ty.dtype_name.as_str(), 0, 0),
        ));
    } else {
        children.push(Node::new(
            NodeKind::Identifier,
            Token::identifier(ty.dtype.to_string(), 0, 0),
        ));
    }

    if ty.is_pointer() && !ty.is_array() {
        children.push(Node::new(NodeKind::PointerStar, Token::none()));
    }

    if ty.is_pointer() && ty.dimensions == [0] {
        children.push(Node::new(NodeKind::EmptySubscript, Token::none()));
        return Node::with_children(NodeKind::GenericTypeParam, Token::none(), children);
    }

    for dimension in &ty.dimensions {
        children.push(Node::with_children(
            NodeKind::Subscript,
            Token::none(),
            vec![Node::new(
                NodeKind::Literal,
                Token::new(
                    crate::ast::TokenKind::IntLiteral,
                    dimension.to_string(),
                    0,
                    0,
                ),
            )],
        ));
    }

    Node::with_children(NodeKind::GenericTypeParam, Token::none(), children)
}

impl Lowering<'_, '_> {
    /// Builds the type description a declaration node describes. The node is
    /// scanned past its name and parameter children for `Module` qualifiers,
    /// the type identifier, and pointer/array modifiers; no identifier means
    /// void (functions without a return type).
    pub fn type_description_from_node(&mut self, node: &Node) -> Result<TypeDescription, CompileError> {
        if node.has_generic_type_param() {
            return self.monomorphized_type_description_from_node(node);
        }

        let mut cursor = if node.kind == NodeKind::GenericTypeParam {
            0
        } else {
            1
        };

        while node.nth_child_is(NodeKind::Param, cursor)
            || node.nth_child_is(NodeKind::MutParam, cursor)
        {
            cursor += 1;
        }

        let mut type_module = self.working_module.clone();

        while node.nth_child_is(NodeKind::Module, cursor) {
            let alias_token = node.nth_child_token(cursor);

            type_module = self.session.modules[&type_module]
                .module_name_from_alias(&alias_token.text)
                .map(str::to_owned)
                .ok_or_else(|| self.err("Module does not exist", alias_token))?;

            cursor += 1;
        }

        if !node.nth_child_is(NodeKind::Identifier, cursor) {
            return Ok(TypeDescription::void());
        }

        let type_token = node.nth_child_token(cursor).clone();
        cursor += 1;

        let mut type_description = match DataType::from_type_name(&type_token.text) {
            Some(dtype) => TypeDescription::from_data_type(dtype),
            None => {
                let structure = self.session.modules[&type_module]
                    .structures
                    .get(&type_token.text)
                    .ok_or_else(|| self.err("Symbol does not exist", &type_token))?;

                let mut ty = TypeDescription::from_data_type(DataType::Struct);
                ty.dtype_name = type_token.text.clone();
                ty.module_name = structure.module_name.clone();
                ty.dtype_size = structure.size;
                ty.size = structure.size;
                ty
            }
        };

        self.apply_type_modifiers(node, cursor, &mut type_description)?;

        Ok(type_description)
    }

    fn apply_type_modifiers(
        &self,
        node: &Node,
        mut cursor: usize,
        type_description: &mut TypeDescription,
    ) -> Result<(), CompileError> {
        if node.nth_child_is(NodeKind::PointerStar, cursor) {
            type_description.become_pointer();
            cursor += 1;
        }

        if node.nth_child_is(NodeKind::EmptySubscript, cursor) {
            type_description.become_array_pointer();
            cursor += 1;
        }

        if node.nth_child_is(NodeKind::Subscript, cursor) {
            let mut dimensions = Vec::new();

            while node.nth_child_is(NodeKind::Subscript, cursor) {
                let subscript = &node.children[cursor];

                let dimension_token = subscript
                    .children
                    .first()
                    .map(|child| &child.token)
                    .ok_or_else(|| self.internal(&subscript.token))?;

                let dimension = dimension_token
                    .int_value()
                    .filter(|value| *value > 0)
                    .ok_or_else(|| {
                        self.err("Array dimension must be a positive integer", dimension_token)
                    })?;

                dimensions.push(dimension as usize);
                cursor += 1;
            }

            type_description.become_array(dimensions, DimensionKind::Fixed);
        }

        Ok(())
    }

    /// Resolves a generic type reference: derives the instantiation suffix,
    /// compiles the instantiated module on first use, and returns the now
    /// concrete struct type
    fn monomorphized_type_description_from_node(
        &mut self,
        node: &Node,
    ) -> Result<TypeDescription, CompileError> {
        let mut cursor = if node.kind == NodeKind::GenericTypeParam {
            0
        } else {
            1
        };

        while node.nth_child_is(NodeKind::Param, cursor)
            || node.nth_child_is(NodeKind::MutParam, cursor)
        {
            cursor += 1;
        }

        let mut generic_module = None;

        while node.nth_child_is(NodeKind::Module, cursor) {
            let alias_token = node.nth_child_token(cursor);

            if generic_module.is_some() {
                return Err(self.err("Invalid MODULE ACCESS from GENERIC", alias_token));
            }

            generic_module = Some(self.get_generic_module_from_alias(alias_token)?);
            cursor += 1;
        }

        if !node.nth_child_is(NodeKind::Identifier, cursor) {
            return Err(self.internal(&node.token));
        }

        let struct_token = node.nth_child_token(cursor).clone();
        cursor += 1;

        let generic_module = match generic_module {
            Some(name) => name,
            None => self.get_generic_module_from_struct(&struct_token)?,
        };

        let mut instantiation_types = Vec::new();
        let mut instantiation_type_nodes = Vec::new();

        while node.nth_child_is(NodeKind::GenericTypeParam, cursor) {
            let param_node = node.children[cursor].clone();

            let param_type = self.type_description_from_node(&param_node)?;

            instantiation_type_nodes.push(canonical_type_node(&param_type));
            instantiation_types.push(param_type);

            cursor += 1;
        }

        let suffix = mono::construct_instantiation_suffix(&instantiation_types);
        let instantiated_module = mono::instantiated_module_name(&generic_module, &suffix);

        if self
            .session
            .in_progress
            .iter()
            .any(|name| *name == instantiated_module)
        {
            return Err(self.err("Cyclic generic instantiation detected", &struct_token));
        }

        if !self.session.modules.contains_key(&instantiated_module) {
            let index = self
                .session
                .generics
                .get(&generic_module)
                .ok_or_else(|| self.err("Generic module does not exist", &struct_token))?;

            let instantiated_ast =
                mono::instantiate_generic_ast(index, &suffix, &instantiation_type_nodes);

            // Struct type arguments resolve through their defining module,
            // which the instantiated module therefore has to import
            let imported_modules: Vec<String> = instantiation_types
                .iter()
                .filter(|ty| ty.is_struct())
                .map(|ty| ty.module_name.clone())
                .collect();

            compile_ast_with_imports(
                self.session,
                &instantiated_module,
                &generic_module,
                &instantiated_ast,
                &imported_modules,
            )?;
        }

        let struct_name = mono::instantiated_struct_name(&struct_token.text, &suffix);

        let structure = self.session.modules[&instantiated_module]
            .structures
            .get(&struct_name)
            .ok_or_else(|| self.err("Symbol does not exist", &struct_token))?;

        let mut type_description = TypeDescription::from_data_type(DataType::Struct);
        type_description.dtype_name = struct_name;
        type_description.module_name = structure.module_name.clone();
        type_description.dtype_size = structure.size;
        type_description.size = structure.size;

        self.apply_type_modifiers(node, cursor, &mut type_description)?;

        Ok(type_description)
    }
}
