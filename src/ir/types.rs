//! Machine data types and full type descriptions.
//!
//! `DataType` is the closed set of primitive machine types the IR knows
//! about. The two `Auto*` placeholders exist only on literal operands and
//! are reconciled against a concrete width at each copy or comparison site;
//! declared storage never carries them.

use colored::Colorize;
use hashbrown::HashMap;
use once_cell::sync::Lazy;
use strum::{Display, EnumIter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum DataType {
    #[strum(serialize = "byte")]
    I8,
    #[strum(serialize = "ubyte")]
    UI8,
    #[strum(serialize = "short")]
    I16,
    #[strum(serialize = "ushort")]
    UI16,
    #[strum(serialize = "int")]
    I32,
    #[strum(serialize = "uint")]
    UI32,
    #[strum(serialize = "long")]
    I64,
    #[strum(serialize = "ulong")]
    UI64,
    #[strum(serialize = "float")]
    F32,
    #[strum(serialize = "double")]
    F64,
    #[strum(serialize = "autoInt")]
    AutoInt,
    #[strum(serialize = "autoFloat")]
    AutoFloat,
    #[strum(serialize = "struct")]
    Struct,
    #[strum(serialize = "void")]
    Void,
}

/// Maps source level type names to data types. `char` and `bool` are plain
/// unsigned bytes as far as the IR is concerned.
static TYPE_NAMES: Lazy<HashMap<&'static str, DataType>> = Lazy::new(|| {
    HashMap::from_iter([
        ("byte", DataType::I8),
        ("ubyte", DataType::UI8),
        ("short", DataType::I16),
        ("ushort", DataType::UI16),
        ("int", DataType::I32),
        ("uint", DataType::UI32),
        ("long", DataType::I64),
        ("ulong", DataType::UI64),
        ("float", DataType::F32),
        ("double", DataType::F64),
        ("char", DataType::UI8),
        ("bool", DataType::UI8),
        ("void", DataType::Void),
    ])
});

impl DataType {
    /// None means the name is not a primitive and must refer to a structure
    pub fn from_type_name(name: &str) -> Option<DataType> {
        TYPE_NAMES.get(name).copied()
    }

    pub fn byte_size(self) -> usize {
        match self {
            DataType::I8 | DataType::UI8 => 1,
            DataType::I16 | DataType::UI16 => 2,
            DataType::I32 | DataType::UI32 | DataType::F32 => 4,
            DataType::I64
            | DataType::UI64
            | DataType::F64
            | DataType::AutoInt
            | DataType::AutoFloat => 8,
            DataType::Struct | DataType::Void => 0,
        }
    }

    pub fn is_signed_integer(self) -> bool {
        matches!(
            self,
            DataType::I8 | DataType::I16 | DataType::I32 | DataType::I64 | DataType::AutoInt
        )
    }

    pub fn is_unsigned_integer(self) -> bool {
        matches!(
            self,
            DataType::UI8 | DataType::UI16 | DataType::UI32 | DataType::UI64
        )
    }

    pub fn is_integer(self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    pub fn is_float(self) -> bool {
        matches!(self, DataType::F32 | DataType::F64 | DataType::AutoFloat)
    }
}

/// Equality with literal reconciliation: `AutoInt` matches any integer width
/// and `AutoFloat` any float width, otherwise the types must be identical.
pub fn data_type_is_equal(a: DataType, b: DataType) -> bool {
    a == b
        || (a == DataType::AutoInt && b.is_integer())
        || (a.is_integer() && b == DataType::AutoInt)
        || (a == DataType::AutoFloat && b.is_float())
        || (a.is_float() && b == DataType::AutoFloat)
}

/// Array dimensions remember whether they came from a fixed size declaration
/// or a string literal. A string literal dimension fits into any fixed
/// dimension large enough to hold it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionKind {
    Fixed,
    StringLiteral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeProperty {
    IsMut = 1 << 0,
    IsPtr = 1 << 1,
    IsParam = 1 << 2,
    IsGlobal = 1 << 3,
    IsLocal = 1 << 4,
    IsStringLiteral = 1 << 5,
}

/// The full type of a value: data type, defining module, array shape, byte
/// sizes and a property bitset. Structs are packed (no padding), arrays are
/// row-major and contiguous.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescription {
    pub dtype: DataType,
    pub dtype_name: String,
    pub module_name: String,
    /// Size of one element (equals `size` for scalars, the struct size for
    /// struct types)
    pub dtype_size: usize,
    /// Byte offset from the struct base, for struct fields
    pub offset: usize,
    /// Total size in bytes; for arrays the product of the dimensions times
    /// the element size
    pub size: usize,
    /// Empty for scalars, outermost dimension first for arrays
    pub dimensions: Vec<usize>,
    pub dimension_kinds: Vec<DimensionKind>,
    properties: u32,
}

impl TypeDescription {
    pub fn from_data_type(dtype: DataType) -> Self {
        TypeDescription {
            dtype,
            dtype_name: dtype.to_string(),
            module_name: String::new(),
            dtype_size: dtype.byte_size(),
            offset: 0,
            size: dtype.byte_size(),
            dimensions: Vec::new(),
            dimension_kinds: Vec::new(),
            properties: 0,
        }
    }

    pub fn void() -> Self {
        TypeDescription::from_data_type(DataType::Void)
    }

    pub fn set_property(&mut self, property: TypeProperty) {
        self.properties |= property as u32;
    }

    pub fn clear_property(&mut self, property: TypeProperty) {
        self.properties &= !(property as u32);
    }

    pub fn has_property(&self, property: TypeProperty) -> bool {
        self.properties & property as u32 != 0
    }

    pub fn become_mutable(&mut self) {
        self.set_property(TypeProperty::IsMut);
    }

    pub fn become_pointer(&mut self) {
        self.set_property(TypeProperty::IsPtr);
    }

    /// An unsized array pointer (`int[]` parameter); indexable but with no
    /// known extent
    pub fn become_array_pointer(&mut self) {
        self.set_property(TypeProperty::IsPtr);
        self.dimensions = vec![0];
        self.dimension_kinds = vec![DimensionKind::Fixed];
    }

    pub fn become_string_literal(&mut self) {
        self.set_property(TypeProperty::IsStringLiteral);
    }

    /// Turns this scalar/struct type into an array of itself with the given
    /// shape. The element size becomes the current total size.
    pub fn become_array(&mut self, dimensions: Vec<usize>, kind: DimensionKind) {
        self.dtype_size = self.size;
        self.size = self.dtype_size * dimensions.iter().product::<usize>();
        self.dimension_kinds = vec![kind; dimensions.len()];
        self.dimensions = dimensions;
    }

    pub fn is_mutable(&self) -> bool {
        self.has_property(TypeProperty::IsMut)
    }

    pub fn is_pointer(&self) -> bool {
        self.has_property(TypeProperty::IsPtr)
    }

    pub fn is_param(&self) -> bool {
        self.has_property(TypeProperty::IsParam)
    }

    pub fn is_string_literal(&self) -> bool {
        self.has_property(TypeProperty::IsStringLiteral)
    }

    pub fn is_struct(&self) -> bool {
        self.dtype == DataType::Struct
    }

    pub fn is_array(&self) -> bool {
        !self.dimensions.is_empty()
    }

    pub fn is_struct_or_array(&self) -> bool {
        self.is_struct() || self.is_array()
    }

    pub fn is_multi_dim_array(&self) -> bool {
        self.dimensions.len() > 1
    }

    pub fn is_array_with_fixed_dim(&self) -> bool {
        self.is_array() && self.dimension_kinds.contains(&DimensionKind::Fixed)
    }

    pub fn is_integer_type(&self) -> bool {
        self.dtype.is_integer() && !self.is_array()
    }

    pub fn is_float_type(&self) -> bool {
        self.dtype.is_float() && !self.is_array()
    }

    pub fn is_void(&self) -> bool {
        self.dtype == DataType::Void
    }
}

/// Structural type compatibility used by every assignment, argument pass and
/// comparison. Reflexive and symmetric; `Auto*` literal placeholders match
/// any width of their family, struct equality is nominal (name and defining
/// module), and string literal dimensions fit into any large enough fixed
/// dimension.
pub fn is_same_type_description(a: &TypeDescription, b: &TypeDescription) -> bool {
    if !data_type_is_equal(a.dtype, b.dtype) {
        return false;
    }

    if a.dtype == DataType::Struct
        && (a.dtype_name != b.dtype_name || a.module_name != b.module_name)
    {
        return false;
    }

    if a.dimensions.len() != b.dimensions.len() {
        return false;
    }

    for i in 0..a.dimensions.len() {
        let (da, db) = (a.dimensions[i], b.dimensions[i]);

        let compatible = match (a.dimension_kinds[i], b.dimension_kinds[i]) {
            (DimensionKind::StringLiteral, DimensionKind::Fixed) => db >= da,
            (DimensionKind::Fixed, DimensionKind::StringLiteral) => da >= db,
            _ => da == db,
        };

        if !compatible {
            return false;
        }
    }

    true
}

impl core::fmt::Display for TypeDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let base = if self.is_struct() {
            self.dtype_name.clone()
        } else {
            self.dtype.to_string()
        };

        let mut rendered = base;

        if self.is_pointer() && !self.is_array() {
            rendered.push('*');
        }

        for dim in &self.dimensions {
            rendered.push_str(&format!("[{dim}]"));
        }

        write!(f, "{}", rendered.yellow())
    }
}
