//! Name resolution: tokens to units, functions, modules and operator
//! overloads.
//!
//! Resolution order is fixed and observable: working-function locals, then
//! root-module globals (under their mangled names), then enumerators, then
//! int/float/string defines — each of the latter checked in the working
//! module before the root module.

use crate::{
    ast::Token,
    diagnostics::CompileError,
    ir::{
        is_same_type_description, DataType, DimensionKind, FunctionDescription, Operand,
        TypeDescription,
    },
    lowering::{
        mangle::{mangle, unmangle},
        Lowering, Unit,
    },
};

impl Lowering<'_, '_> {
    fn get_local(&self, name_token: &Token) -> Option<Unit> {
        self.working_function.as_ref()?;

        let function = self.function();
        let name = &name_token.text;

        let ty = function.symbol(name)?;

        // Parameters are visible everywhere in the body; locals only while
        // their declaring scope is open
        if function.locals.contains_key(name) && !self.scope.is_in_scope(name) {
            return None;
        }

        Some(self.unit_from_type_description(&ty.clone(), name))
    }

    fn get_global(&self, name_token: &Token) -> Option<Unit> {
        let mangled = mangle(&name_token.text, &self.root_module);

        let ty = self.root().globals.get(&mangled)?;

        Some(self.unit_from_type_description(&ty.clone(), &mangled))
    }

    fn get_enum(&self, name_token: &Token) -> Option<Unit> {
        let description = self
            .working()
            .enumerations
            .get(&name_token.text)
            .or_else(|| self.root().enumerations.get(&name_token.text))?;

        Some(Unit::new(
            Operand::int_literal(DataType::AutoInt, description.value),
            TypeDescription::from_data_type(DataType::AutoInt),
        ))
    }

    fn get_int_define(&self, name_token: &Token) -> Option<Unit> {
        let value = self
            .working()
            .int_defines
            .get(&name_token.text)
            .or_else(|| self.root().int_defines.get(&name_token.text))?;

        Some(Unit::new(
            Operand::int_literal(DataType::AutoInt, *value),
            TypeDescription::from_data_type(DataType::AutoInt),
        ))
    }

    fn get_float_define(&self, name_token: &Token) -> Option<Unit> {
        let value = self
            .working()
            .float_defines
            .get(&name_token.text)
            .or_else(|| self.root().float_defines.get(&name_token.text))?;

        Some(Unit::new(
            Operand::float_literal(DataType::AutoFloat, *value),
            TypeDescription::from_data_type(DataType::AutoFloat),
        ))
    }

    fn get_string_define(&self, name_token: &Token) -> Option<Unit> {
        for module_name in [&self.working_module, &self.root_module] {
            let module = &self.session.modules[module_name];

            if let Some(key) = module.string_defines.get(&name_token.text) {
                let char_count = module.strings_data_char_counts[key];
                return Some(self.string_data_unit(key, char_count, module_name));
            }
        }

        None
    }

    /// Builds the unit for a key into a module's string data table: a
    /// null-terminated byte array addressed by the key
    pub fn string_data_unit(&self, key: &str, char_count: usize, module_name: &str) -> Unit {
        let mut ty = TypeDescription::from_data_type(DataType::UI8);
        ty.become_array(vec![char_count + 1], DimensionKind::StringLiteral);
        ty.become_string_literal();
        ty.module_name = module_name.to_owned();

        Unit::new(Operand::string_data(key, DataType::UI8), ty)
    }

    /// Resolves a bare identifier to a value. Search order: locals, globals,
    /// enumerators, int defines, float defines, string defines.
    pub fn get_unit_from_token(&self, name_token: &Token) -> Result<Unit, CompileError> {
        self.get_local(name_token)
            .or_else(|| self.get_global(name_token))
            .or_else(|| self.get_enum(name_token))
            .or_else(|| self.get_int_define(name_token))
            .or_else(|| self.get_float_define(name_token))
            .or_else(|| self.get_string_define(name_token))
            .ok_or_else(|| self.err("Symbol does not exist", name_token))
    }

    /// Resolves a callee name to its storage key and description. Extern
    /// declarations are probed before module functions; the root module is
    /// the fallback for both.
    pub fn get_function(
        &self,
        name_token: &Token,
    ) -> Result<(String, FunctionDescription), CompileError> {
        let name = &name_token.text;
        let working = self.working();

        if let Some(function) = working.extern_functions.get(name) {
            return Ok((name.clone(), function.clone()));
        }

        let working_mangled = mangle(name, &working.name);
        if let Some(function) = working.functions.get(&working_mangled) {
            return Ok((working_mangled, function.clone()));
        }

        if let Some(function) = working.functions.get(name) {
            return Ok((name.clone(), function.clone()));
        }

        let root = self.root();

        let root_mangled = mangle(name, &root.name);
        if let Some(function) = root.functions.get(&root_mangled) {
            return Ok((root_mangled, function.clone()));
        }

        if let Some(function) = root.extern_functions.get(name) {
            return Ok((name.clone(), function.clone()));
        }

        Err(self.err("Function does not exist", name_token))
    }

    /// Resolves an import alias to the module it names
    pub fn get_module_from_token(&self, alias_token: &Token) -> Result<String, CompileError> {
        self.working()
            .module_name_from_alias(&alias_token.text)
            .map(str::to_owned)
            .ok_or_else(|| self.err("Use does not exist", alias_token))
    }

    fn is_same_parameters_type(function: &FunctionDescription, params: &[&Unit]) -> bool {
        if function.parameter_names.len() != params.len() {
            return false;
        }

        params.iter().enumerate().all(|(i, param)| {
            function
                .parameter_type_at(i)
                .is_some_and(|formal| is_same_type_description(formal, param.type_description()))
        })
    }

    /// The `(value, array with fixed dim, index)` triple accepted by
    /// subscript-style operator functions
    fn is_same_parameters_type_fixed_dim(
        function: &FunctionDescription,
        params: &[&Unit],
    ) -> bool {
        if params.len() != 3 {
            return false;
        }

        if !params[1].type_description().is_array_with_fixed_dim() {
            return false;
        }

        if !Self::is_same_parameters_type(function, &params[..2]) {
            return false;
        }

        function
            .parameter_type_at(1)
            .is_some_and(TypeDescription::is_array_with_fixed_dim)
    }

    fn get_operator_function_by_name(
        &self,
        token: &Token,
        operator_name: &str,
        params: &[&Unit],
    ) -> Result<(String, FunctionDescription), CompileError> {
        let working = self.working();

        for function_name in &working.defined_functions {
            if unmangle(function_name, &working.name) != operator_name {
                continue;
            }

            let function = &working.functions[function_name];

            if Self::is_same_parameters_type(function, params)
                || Self::is_same_parameters_type_fixed_dim(function, params)
            {
                return Ok((function_name.clone(), function.clone()));
            }
        }

        Err(self.err(
            format!(
                "No {} operator function defined for {} and {}",
                operator_name,
                params[0].type_description(),
                params[1].type_description()
            ),
            token,
        ))
    }

    /// Finds the user defined overload for a binary operator applied to the
    /// given operands, searching the working module's defined functions
    pub fn get_custom_operator_function(
        &self,
        operator_token: &Token,
        params: &[&Unit],
    ) -> Result<(String, FunctionDescription), CompileError> {
        let operator_name = operator_token
            .operator_function_name()
            .ok_or_else(|| self.internal(operator_token))?;

        self.get_operator_function_by_name(operator_token, operator_name, params)
    }

    pub fn get_subscript_operator_function(
        &self,
        token: &Token,
        params: &[&Unit],
    ) -> Result<(String, FunctionDescription), CompileError> {
        self.get_operator_function_by_name(token, "subscript", params)
    }

    /// Finds a defined function by exact return type and parameter list;
    /// used for method-like dispatch by signature
    pub fn get_function_by_param_types(
        &self,
        token: &Token,
        return_type: &TypeDescription,
        params: &[&Unit],
    ) -> Result<(String, FunctionDescription), CompileError> {
        let working = self.working();

        for function_name in &working.defined_functions {
            let function = &working.functions[function_name];

            if !is_same_type_description(&function.return_type, return_type) {
                continue;
            }

            if !Self::is_same_parameters_type(function, params) {
                continue;
            }

            return Ok((function_name.clone(), function.clone()));
        }

        Err(self.err("Cannot find function with matching params", token))
    }
}
