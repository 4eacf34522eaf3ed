//! The declaration pass: imports, structures, enumerations, defines,
//! function signatures and globals are all recorded into the module
//! description before any function body is lowered. `use` of another module
//! compiles that module to completion first, so by the time bodies are
//! lowered every imported symbol is available.

use crate::{
    ast::{Node, NodeKind, Token, TokenKind},
    diagnostics::CompileError,
    ir::{EnumDescription, FunctionDescription, StructDescription, TypeProperty},
    lowering::{
        compile_used_module,
        mangle::mangle,
        mono::index_generic_ast,
        Lowering,
    },
};

impl Lowering<'_, '_> {
    /// Compiles one module AST: import pass, declaration pass, body pass
    pub fn program(&mut self, root: &Node) -> Result<(), CompileError> {
        if let Some(generic) = root
            .children
            .iter()
            .find(|child| child.kind == NodeKind::Generic)
        {
            return Err(self.err(
                "GENERIC module cannot be compiled directly",
                &generic.token,
            ));
        }

        /* Imports first; a use compiles the imported module to completion */

        for child in &root.children {
            if child.kind == NodeKind::Use {
                self.create_use(child)?;
            }
        }

        /* Declare all top level symbols */

        for child in &root.children {
            match child.kind {
                NodeKind::Use => {}
                NodeKind::From => self.from(child)?,
                NodeKind::Struct => self.structure(child)?,
                NodeKind::Function => self.function_declaration(child, false)?,
                NodeKind::ExternFunction => self.function_declaration(child, true)?,
                NodeKind::Enum => self.enumeration(child)?,
                NodeKind::Def => self.define(child)?,
                NodeKind::Var => self.global_var(child)?,
                _ => return Err(self.internal(&child.token)),
            }
        }

        /* Lower the function bodies */

        for child in &root.children {
            if child.kind == NodeKind::Function {
                self.function_body(child)?;
            }
        }

        Ok(())
    }

    /// Records imports. Each `Module` child names an imported module, with an
    /// optional `Identifier` child carrying an alias. Generic modules are
    /// indexed for later instantiation instead of being compiled.
    fn create_use(&mut self, node: &Node) -> Result<(), CompileError> {
        for child in &node.children {
            let name_token = &child.token;
            let name = &name_token.text;

            let alias = child
                .children
                .first()
                .filter(|c| c.kind == NodeKind::Identifier)
                .map(|c| c.token.text.clone())
                .unwrap_or_else(|| name.clone());

            // The monomorphizer may have wired this import up already
            if alias == *name && self.seeded_imports.iter().any(|s| s == name) {
                continue;
            }

            let is_module = self.session.provider.module_exists(name);
            let is_package = self.session.provider.package_exists(name);

            if !is_module && !is_package {
                return Err(self.err("Module or Package does not exist", name_token));
            }

            if is_module && is_package {
                return Err(self.err("Module and Package exists with same name", name_token));
            }

            if self.root().use_exists(name) || self.generic_uses.contains_key(&alias) {
                return Err(self.err("Multiple imports detected", name_token));
            }

            if self.root().symbol_exists(&alias) {
                return Err(self.err("Name conflict, symbol already exists", name_token));
            }

            if self.root_module == *name {
                return Err(self.err("Self import not allowed", name_token));
            }

            if is_package {
                let module = self.root_mut();
                module.uses.push(name.clone());
                module.aliases.insert(alias, name.clone());
                continue;
            }

            let ast = self.session.provider.ast(name)?;

            let is_generic = ast
                .children
                .first()
                .is_some_and(|child| child.kind == NodeKind::Generic);

            if is_generic {
                self.session
                    .generics
                    .entry(name.clone())
                    .or_insert_with(|| index_generic_ast(&ast));
                self.generic_uses.insert(alias, name.clone());
            } else {
                compile_used_module(self.session, name, &self.source_module, name_token)?;

                let module = self.root_mut();
                module.uses.push(name.clone());
                module.aliases.insert(alias, name.clone());
            }
        }

        Ok(())
    }

    /// `from <module> use a, b, c` copies selected symbols into the working
    /// module's tables. Functions cannot be imported this way.
    fn from(&mut self, node: &Node) -> Result<(), CompileError> {
        let alias_token = &node.children[0].token;

        // Generic modules contribute generic struct names instead of symbols
        if let Some(generic_module) = self.generic_uses.get(&alias_token.text).cloned() {
            for child in node.children.iter().skip(1) {
                self.generic_structs
                    .insert(child.token.text.clone(), generic_module.clone());
            }

            return Ok(());
        }

        let from_module = self
            .root()
            .module_name_from_alias(&alias_token.text)
            .map(str::to_owned)
            .ok_or_else(|| self.err("Module not imported", alias_token))?;

        for child in node.children.iter().skip(1) {
            let symbol_token = &child.token;
            let symbol = &symbol_token.text;

            if self.root().symbol_exists(symbol) {
                return Err(self.err("Symbol already defined", symbol_token));
            }

            let source = &self.session.modules[&from_module];

            if let Some(structure) = source.structures.get(symbol) {
                let structure = structure.clone();
                self.root_mut().structures.insert(symbol.clone(), structure);
            } else if source.functions.contains_key(&mangle(symbol, &from_module))
                || source.extern_functions.contains_key(symbol)
            {
                return Err(self.err("Cannot import functions", symbol_token));
            } else if let Some(enumeration) = source.enumerations.get(symbol).copied() {
                self.root_mut().enumerations.insert(symbol.clone(), enumeration);
            } else if let Some(value) = source.int_defines.get(symbol).copied() {
                self.root_mut().int_defines.insert(symbol.clone(), value);
            } else if let Some(value) = source.float_defines.get(symbol).copied() {
                self.root_mut().float_defines.insert(symbol.clone(), value);
            } else if let Some(key) = source.string_defines.get(symbol).cloned() {
                self.root_mut().string_defines.insert(symbol.clone(), key);
            } else if source.use_exists(symbol) {
                let transitive = symbol.clone();
                let module = self.root_mut();
                module.uses.push(transitive.clone());
                module.aliases.insert(transitive.clone(), transitive);
            } else {
                return Err(self.err("Symbol does not exist", symbol_token));
            }
        }

        Ok(())
    }

    /// Declares a struct: fields get offsets equal to the running size, the
    /// struct size is the sum of the field sizes
    fn structure(&mut self, node: &Node) -> Result<(), CompileError> {
        let name_token = node.children[0].token.clone();

        if self.root().symbol_exists(&name_token.text) {
            return Err(self.err("Symbol already defined", &name_token));
        }

        let mut structure = StructDescription {
            module_name: self.root_module.clone(),
            ..Default::default()
        };

        for field_node in node.children.iter().skip(1) {
            let field_token = &field_node.children[0].token;

            let mut field_type = self.type_description_from_node(field_node)?;
            field_type.set_property(TypeProperty::IsMut);

            if structure.field_exists(&field_token.text) {
                return Err(self.err("Field already defined", field_token));
            }

            field_type.offset = structure.size;
            structure.size += field_type.size;

            structure.field_names.push(field_token.text.clone());
            structure.fields.insert(field_token.text.clone(), field_type);
        }

        self.root_mut()
            .structures
            .insert(name_token.text.clone(), structure);

        Ok(())
    }

    /// Declares an enum: enumerators get successive integer values starting
    /// at zero, in declaration order
    fn enumeration(&mut self, node: &Node) -> Result<(), CompileError> {
        for (value, child) in node.children.iter().skip(1).enumerate() {
            let enumerator_token = &child.token;

            if self.root().symbol_exists(&enumerator_token.text) {
                return Err(self.err("Symbol already defined", enumerator_token));
            }

            self.root_mut().enumerations.insert(
                enumerator_token.text.clone(),
                EnumDescription {
                    value: value as i64,
                },
            );
        }

        Ok(())
    }

    /// Declares a compile-time constant from an integer, float or string
    /// literal
    fn define(&mut self, node: &Node) -> Result<(), CompileError> {
        let name_token = node.children[0].token.clone();
        let value_node = &node.children[1];
        let value_token = value_node.token.clone();

        if self.root().symbol_exists(&name_token.text) {
            return Err(self.err("Symbol already defined", &name_token));
        }

        match value_node.kind {
            NodeKind::Literal => match value_token.kind {
                TokenKind::IntLiteral | TokenKind::HexLiteral | TokenKind::BinLiteral => {
                    let value = value_token
                        .int_value()
                        .ok_or_else(|| self.internal(&value_token))?;
                    self.root_mut().int_defines.insert(name_token.text.clone(), value);
                }
                TokenKind::FloatLiteral => {
                    let value = value_token
                        .float_value()
                        .ok_or_else(|| self.internal(&value_token))?;
                    self.root_mut()
                        .float_defines
                        .insert(name_token.text.clone(), value);
                }
                _ => return Err(self.internal(&value_token)),
            },
            NodeKind::StringLiteral | NodeKind::MultilineStringLiteral => {
                let key = self.create_string_data(&value_token);
                self.root_mut()
                    .string_defines
                    .insert(name_token.text.clone(), key);
            }
            _ => return Err(self.internal(&value_token)),
        }

        Ok(())
    }

    /// Stores a string literal's unescaped contents in the module's string
    /// data table, keyed by source position
    pub fn create_string_data(&mut self, token: &Token) -> String {
        let key = format!("_str{}", token.line_col_suffix());
        let char_count = token.unescaped.len();

        let module = self.root_mut();
        module.strings_data.insert(key.clone(), token.unescaped.clone());
        module.strings_data_char_counts.insert(key.clone(), char_count);

        key
    }

    /// Declares a global variable, stored under its mangled name
    fn global_var(&mut self, node: &Node) -> Result<(), CompileError> {
        let name_token = node.children[0].token.clone();

        let mut ty = self.type_description_from_node(node)?;
        ty.set_property(TypeProperty::IsMut);
        ty.set_property(TypeProperty::IsGlobal);

        let mangled = mangle(&name_token.text, &self.root_module);

        if self.root().symbol_exists(&name_token.text) || self.root().globals.contains_key(&mangled)
        {
            return Err(self.err("Symbol already defined", &name_token));
        }

        self.root_mut().globals.insert(mangled, ty);

        Ok(())
    }

    /// Records a function signature. Parameters that are mutable, structs or
    /// arrays are passed by reference and marked as pointers.
    fn function_declaration(
        &mut self,
        node: &Node,
        is_extern: bool,
    ) -> Result<(), CompileError> {
        let name_token = node.children[0].token.clone();
        let name = name_token.text.clone();

        let mangled = mangle(&name, &self.root_module);

        if self.root().symbol_exists(&name)
            || self.root().functions.contains_key(&mangled)
            || self.root().extern_functions.contains_key(&name)
        {
            return Err(self.err("Symbol already defined", &name_token));
        }

        let return_type = self.type_description_from_node(node)?;

        let mut function = FunctionDescription::new(return_type, &self.root_module);

        for child in &node.children {
            let is_mutable = match child.kind {
                NodeKind::Param => false,
                NodeKind::MutParam => true,
                _ => continue,
            };

            let param_token = &child.children[0].token;

            let mut param_type = self.type_description_from_node(child)?;
            param_type.set_property(TypeProperty::IsParam);

            if is_mutable {
                param_type.set_property(TypeProperty::IsMut);
            }

            if is_mutable || param_type.is_struct() || param_type.is_array() {
                param_type.set_property(TypeProperty::IsPtr);
            }

            if function.symbol_exists(&param_token.text) {
                return Err(self.err("Symbol already defined", param_token));
            }

            function.parameter_names.push(param_token.text.clone());
            function
                .parameters
                .insert(param_token.text.clone(), param_type);
        }

        if is_extern {
            self.root_mut().extern_functions.insert(name, function);
        } else {
            let module = self.root_mut();
            module.functions.insert(mangled.clone(), function);
            module.defined_functions.push(mangled);
        }

        Ok(())
    }

    /// Lowers one function body into its entry stream
    fn function_body(&mut self, node: &Node) -> Result<(), CompileError> {
        let name_token = node.children[0].token.clone();
        let mangled = mangle(&name_token.text, &self.root_module);

        self.working_function = Some(mangled);
        self.reset_function_state();

        let block = node
            .children
            .last()
            .filter(|child| child.kind == NodeKind::Block)
            .ok_or_else(|| self.internal(&node.token))?;

        self.block(block, None)?;

        self.terminate_function(&name_token)?;

        self.working_function = None;

        Ok(())
    }
}
