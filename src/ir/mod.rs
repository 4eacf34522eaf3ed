//! The intermediate representation: descriptions of compiled modules and the
//! entry streams of their functions.
//!
//! Descriptions never hold back-pointers to their containers; a struct or
//! function knows the *name* of the module it belongs to and consumers
//! resolve it through the [`ModulesMap`]. All descriptions are created during
//! the declaration pass and live until the end of compilation; entries are
//! appended during body lowering and never removed or reordered.

use hashbrown::HashMap;

pub mod entry;
pub mod pretty_print;
pub mod types;

pub use entry::{Entry, Opcode, Operand, OperandKind};
pub use types::{
    data_type_is_equal, is_same_type_description, DataType, DimensionKind, TypeDescription,
    TypeProperty,
};

/// Every compiled module, keyed by module name
pub type ModulesMap = HashMap<String, ModuleDescription>;

/// A named structure: field order is observable (it fixes the field offsets)
/// and the struct size is the sum of the field sizes, packed with no padding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructDescription {
    pub field_names: Vec<String>,
    pub fields: HashMap<String, TypeDescription>,
    pub size: usize,
    pub module_name: String,
    /// Name of the function that tears instances down. Recorded but never
    /// invoked automatically; a later pass may wire it.
    pub deconstructor: String,
}

impl StructDescription {
    pub fn field_exists(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn field(&self, name: &str) -> Option<&TypeDescription> {
        self.fields.get(name)
    }

    pub fn first_field(&self) -> Option<&TypeDescription> {
        self.field_names.first().and_then(|name| self.fields.get(name))
    }
}

/// One enumerator; resolving it yields an integer literal operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumDescription {
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDescription {
    pub return_type: TypeDescription,
    /// Parameter names in declaration order
    pub parameter_names: Vec<String>,
    pub parameters: HashMap<String, TypeDescription>,
    pub locals: HashMap<String, TypeDescription>,
    /// The function body. In a compiled module the last entry of a non-empty
    /// body is always `Return`.
    pub entries: Vec<Entry>,
    pub module_name: String,
}

impl FunctionDescription {
    pub fn new(return_type: TypeDescription, module_name: impl Into<String>) -> Self {
        FunctionDescription {
            return_type,
            parameter_names: Vec::new(),
            parameters: HashMap::new(),
            locals: HashMap::new(),
            entries: Vec::new(),
            module_name: module_name.into(),
        }
    }

    pub fn symbol(&self, name: &str) -> Option<&TypeDescription> {
        self.parameters.get(name).or_else(|| self.locals.get(name))
    }

    pub fn symbol_exists(&self, name: &str) -> bool {
        self.symbol(name).is_some()
    }

    pub fn parameter_type_at(&self, index: usize) -> Option<&TypeDescription> {
        self.parameter_names
            .get(index)
            .and_then(|name| self.parameters.get(name))
    }

    pub fn is_void(&self) -> bool {
        self.return_type.is_void()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleDescription {
    pub name: String,
    /// Imported module names, in import order
    pub uses: Vec<String>,
    /// Import alias to module name
    pub aliases: HashMap<String, String>,
    pub structures: HashMap<String, StructDescription>,
    /// Functions defined in this module, keyed by mangled name
    pub functions: HashMap<String, FunctionDescription>,
    /// Functions declared here but defined elsewhere, keyed by plain name
    pub extern_functions: HashMap<String, FunctionDescription>,
    /// Enumerators (not enum type names) to their descriptions
    pub enumerations: HashMap<String, EnumDescription>,
    pub int_defines: HashMap<String, i64>,
    pub float_defines: HashMap<String, f64>,
    /// Define name to string data key
    pub string_defines: HashMap<String, String>,
    /// Global variables, keyed by mangled name
    pub globals: HashMap<String, TypeDescription>,
    /// String data key to unescaped contents
    pub strings_data: HashMap<String, String>,
    pub strings_data_char_counts: HashMap<String, usize>,
    /// Mangled names of the functions implemented in this module, in
    /// declaration order (extern declarations are not listed)
    pub defined_functions: Vec<String>,
}

impl ModuleDescription {
    pub fn new(name: impl Into<String>) -> Self {
        ModuleDescription {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn use_exists(&self, name: &str) -> bool {
        self.uses.iter().any(|u| u == name)
    }

    pub fn module_name_from_alias(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }

    /// Whether a plain name already resolves to some symbol category in this
    /// module. Functions and globals are stored under mangled names; the
    /// declaration pass checks those separately.
    pub fn symbol_exists(&self, name: &str) -> bool {
        self.structures.contains_key(name)
            || self.extern_functions.contains_key(name)
            || self.enumerations.contains_key(name)
            || self.int_defines.contains_key(name)
            || self.float_defines.contains_key(name)
            || self.string_defines.contains_key(name)
            || self.aliases.contains_key(name)
    }
}
