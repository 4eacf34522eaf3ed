//! Lowering: typed translation of parser ASTs into three-address IR.
//!
//! Compilation is driven module-first: every `use` triggers full compilation
//! of the imported module before the importing module's function bodies are
//! lowered, which yields a topological compilation order. Generic modules are
//! not compiled when imported; their ASTs are indexed and instantiated on
//! first concrete use by the monomorphizer.
//!
//! All mutable working state (the modules map, the module/function currently
//! being lowered, scope and counters) lives in one [`Lowering`] context that
//! is threaded through the recursion. Switching to another module for name
//! resolution always goes through [`Lowering::with_working_module`] so the
//! previous module is restored on every exit path.

use hashbrown::HashMap;

use crate::{
    ast::{Node, Token},
    diagnostics::CompileError,
    ir::{
        DataType, ModuleDescription, ModulesMap, Operand, TypeDescription, TypeProperty,
    },
};

mod assignment;
mod builder;
mod call;
mod control_flow;
mod declarations;
mod expression;
mod finder;
mod mangle;
mod mono;
mod scope;
mod types_from_node;
mod unit;

pub(crate) use mono::GenericAstIndex;
pub(crate) use scope::ScopeTracker;
pub(crate) use unit::Unit;

/// The external parser and path-check collaborator. `module_exists` asks
/// whether `<name>.uhll` exists, `package_exists` whether a directory of that
/// name exists; `ast` parses the module source into an AST.
pub trait AstProvider {
    fn module_exists(&self, name: &str) -> bool;
    fn package_exists(&self, name: &str) -> bool;
    fn ast(&mut self, name: &str) -> Result<Node, CompileError>;
}

/// Compilation wide state shared by every module lowering
pub(crate) struct Session<'p> {
    pub modules: ModulesMap,
    pub generics: HashMap<String, GenericAstIndex>,
    /// Modules whose compilation has started but not finished; used to turn
    /// import and instantiation cycles into errors instead of unbounded
    /// recursion
    pub in_progress: Vec<String>,
    pub provider: &'p mut dyn AstProvider,
}

/// Compiles the named module and, transitively, every module it uses.
/// Returns the map of all compiled modules (imports and monomorphized
/// generic instantiations included).
pub fn compile_program(
    root_name: &str,
    provider: &mut dyn AstProvider,
) -> Result<ModulesMap, CompileError> {
    let mut session = Session {
        modules: HashMap::new(),
        generics: HashMap::new(),
        in_progress: Vec::new(),
        provider,
    };

    let ast = session.provider.ast(root_name)?;
    compile_ast(&mut session, root_name, root_name, &ast)?;

    Ok(session.modules)
}

/// Compiles one already-parsed AST as the module `module_name`.
/// `source_module` names the module whose source file the AST's tokens come
/// from; it differs from `module_name` only for generic instantiations,
/// where errors must point at the generic module's source.
pub(crate) fn compile_ast(
    session: &mut Session,
    module_name: &str,
    source_module: &str,
    ast: &Node,
) -> Result<(), CompileError> {
    compile_ast_with_imports(session, module_name, source_module, ast, &[])
}

/// Like [`compile_ast`], but pre-seeds the new module's import table. Generic
/// instantiations use this so that struct type arguments, which are spliced
/// into the AST qualified by their defining module, resolve inside the
/// instantiated module.
pub(crate) fn compile_ast_with_imports(
    session: &mut Session,
    module_name: &str,
    source_module: &str,
    ast: &Node,
    imported_modules: &[String],
) -> Result<(), CompileError> {
    session.in_progress.push(module_name.to_owned());

    let mut module = ModuleDescription::new(module_name);

    for import in imported_modules {
        if import != module_name && !module.use_exists(import) {
            module.uses.push(import.clone());
            module.aliases.insert(import.clone(), import.clone());
        }
    }

    session.modules.insert(module_name.to_owned(), module);

    let mut lowering = Lowering::new(session, module_name, source_module);
    lowering.seeded_imports = imported_modules.to_vec();
    let result = lowering.program(ast);

    session.in_progress.retain(|name| name != module_name);

    result
}

/// Compiles an imported module by name, unless it is already compiled.
/// `use_token` anchors the cycle diagnostic.
pub(crate) fn compile_used_module(
    session: &mut Session,
    name: &str,
    source_module: &str,
    use_token: &Token,
) -> Result<(), CompileError> {
    if session.in_progress.iter().any(|n| n == name) {
        return Err(CompileError::on_token(
            source_module,
            "Cyclic import detected",
            use_token,
        ));
    }

    if session.modules.contains_key(name) {
        return Ok(());
    }

    let ast = session.provider.ast(name)?;
    compile_ast(session, name, name, &ast)
}

/// Per-module lowering context. One of these exists for every module
/// compilation on the stack (imports and generic instantiations re-enter the
/// pipeline with a fresh context over the same session).
pub(crate) struct Lowering<'s, 'p> {
    pub session: &'s mut Session<'p>,
    /// The module this context is generating IR into
    pub root_module: String,
    /// The module whose source file errors should point at
    pub source_module: String,
    /// The module names are currently resolved against; switched temporarily
    /// for module-qualified access and cross-module calls
    pub working_module: String,
    /// Mangled name of the function whose body is being lowered
    pub working_function: Option<String>,
    pub scope: ScopeTracker,
    temp_counter: u32,
    /// Import alias to generic module name (generic imports are indexed, not
    /// compiled, so they are tracked here instead of the module's alias map)
    pub generic_uses: HashMap<String, String>,
    /// Struct name to generic module name, for generic structs pulled in
    /// with `from`
    pub generic_structs: HashMap<String, String>,
    /// Imports pre-seeded by the monomorphizer; a matching `use` in the
    /// source is already satisfied and skipped
    pub seeded_imports: Vec<String>,
}

impl<'s, 'p> Lowering<'s, 'p> {
    pub fn new(session: &'s mut Session<'p>, module_name: &str, source_module: &str) -> Self {
        Lowering {
            session,
            root_module: module_name.to_owned(),
            source_module: source_module.to_owned(),
            working_module: module_name.to_owned(),
            working_function: None,
            scope: ScopeTracker::new(),
            temp_counter: 0,
            generic_uses: HashMap::new(),
            generic_structs: HashMap::new(),
            seeded_imports: Vec::new(),
        }
    }

    /* Error helpers */

    pub fn err(&self, message: impl Into<String>, token: &Token) -> CompileError {
        CompileError::on_token(&self.source_module, message, token)
    }

    pub fn internal(&self, token: &Token) -> CompileError {
        CompileError::internal(&self.source_module, token)
    }

    pub fn type_err(
        &self,
        token: &Token,
        expected: &TypeDescription,
        found: &TypeDescription,
    ) -> CompileError {
        CompileError::type_mismatch(&self.source_module, token, expected, found)
    }

    /* Module accessors */

    pub fn root(&self) -> &ModuleDescription {
        &self.session.modules[&self.root_module]
    }

    pub fn root_mut(&mut self) -> &mut ModuleDescription {
        self.session
            .modules
            .get_mut(&self.root_module)
            .expect("root module exists for the whole compilation")
    }

    pub fn working(&self) -> &ModuleDescription {
        &self.session.modules[&self.working_module]
    }

    /// The function IR is being emitted into
    pub fn function(&self) -> &crate::ir::FunctionDescription {
        let name = self
            .working_function
            .as_ref()
            .expect("body lowering requires a working function");
        &self.root().functions[name]
    }

    pub fn function_mut(&mut self) -> &mut crate::ir::FunctionDescription {
        let name = self
            .working_function
            .clone()
            .expect("body lowering requires a working function");
        self.root_mut()
            .functions
            .get_mut(&name)
            .expect("working function exists in its module")
    }

    /// Runs `f` with the working module switched to `module_name`, restoring
    /// the previous working module on every exit path
    pub fn with_working_module<T>(
        &mut self,
        module_name: &str,
        f: impl FnOnce(&mut Self) -> Result<T, CompileError>,
    ) -> Result<T, CompileError> {
        let saved = std::mem::replace(&mut self.working_module, module_name.to_owned());
        let result = f(self);
        self.working_module = saved;
        result
    }

    /// Fresh id for temporaries; strictly increasing within a function
    pub fn next_id(&mut self) -> u32 {
        let id = self.temp_counter;
        self.temp_counter += 1;
        id
    }

    pub fn reset_function_state(&mut self) {
        self.temp_counter = 0;
        self.scope.reset();
    }

    /* Unit construction */

    /// Packages a named symbol's type into a Unit. Struct and array units
    /// are addressed through pointers to their first element, so the operand
    /// data type of a struct unit is its first field's data type.
    pub fn unit_from_type_description(&self, ty: &TypeDescription, name: &str) -> Unit {
        let operand_dtype = self.canonical_operand_dtype(ty);

        let operand = if ty.is_param() && ty.is_pointer() {
            Operand::pointer(name, operand_dtype)
        } else if ty.has_property(TypeProperty::IsGlobal) {
            Operand::global_var(name, operand_dtype)
        } else {
            Operand::var(name, operand_dtype)
        };

        Unit::new(operand, ty.clone())
    }

    pub fn canonical_operand_dtype(&self, ty: &TypeDescription) -> DataType {
        if ty.dtype != DataType::Struct {
            return ty.dtype;
        }

        self.session
            .modules
            .get(&ty.module_name)
            .and_then(|module| module.structures.get(&ty.dtype_name))
            .and_then(|structure| structure.first_field())
            .map(|field| field.dtype)
            .unwrap_or(DataType::Struct)
    }
}
