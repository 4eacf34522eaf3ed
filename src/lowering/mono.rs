//! The monomorphizer: indexing of generic module ASTs, instantiation
//! suffixes, and the identifier substitution that turns a generic AST into a
//! concrete module ready for compilation.
//!
//! Instantiation is referentially transparent: the suffix is a pure function
//! of the concrete type list, the instantiated module is named
//! `<generic>_<suffix>`, and an already compiled instantiation is reused via
//! the modules map. That reuse is load-bearing — it is what keeps repeated
//! references from emitting duplicate modules and what bounds recursion.

use itertools::Itertools;

use crate::{
    ast::{Node, NodeKind, Token},
    diagnostics::CompileError,
    ir::TypeDescription,
    lowering::{mangle::mangle_module_name, Lowering},
};

/// An indexed (not compiled) generic module
pub(crate) struct GenericAstIndex {
    pub ast: Node,
    pub generic_identifiers: Vec<String>,
    pub generic_structs: Vec<String>,
}

/// Builds the index for a generic module AST: the type parameter names from
/// the leading `Generic` node, and the names of the structs that mention any
/// of them (those get suffixed per instantiation).
pub(crate) fn index_generic_ast(ast: &Node) -> GenericAstIndex {
    let generic_identifiers: Vec<String> = ast
        .children
        .iter()
        .find(|child| child.kind == NodeKind::Generic)
        .map(|generic| {
            generic
                .children
                .iter()
                .map(|ident| ident.token.text.clone())
                .collect()
        })
        .unwrap_or_default();

    let generic_structs = ast
        .children
        .iter()
        .filter(|child| child.kind == NodeKind::Struct && !child.children.is_empty())
        .filter(|child| {
            generic_identifiers
                .iter()
                .any(|ident| child.mentions_identifier(ident))
        })
        .map(|child| child.children[0].token.text.clone())
        .collect();

    GenericAstIndex {
        ast: ast.clone(),
        generic_identifiers,
        generic_structs,
    }
}

fn dimensions_to_string(dimensions: &[usize]) -> String {
    dimensions.iter().map(usize::to_string).collect()
}

fn instantiation_string_from_type(ty: &TypeDescription) -> String {
    let mut result = if ty.module_name.is_empty() {
        ty.dtype_name.clone()
    } else {
        format!("{}_{}", mangle_module_name(&ty.module_name), ty.dtype_name)
    };

    if ty.is_array() {
        result.push_str("_array");
        result.push_str(&dimensions_to_string(&ty.dimensions));
    }

    if ty.is_pointer() {
        result.push_str("_ptr");
    }

    result
}

/// The memoization key and name suffix for one instantiation; a pure
/// function of the concrete type list
pub(crate) fn construct_instantiation_suffix(types: &[TypeDescription]) -> String {
    types.iter().map(instantiation_string_from_type).join("_")
}

pub(crate) fn instantiated_module_name(generic_module: &str, suffix: &str) -> String {
    format!("{generic_module}_{suffix}")
}

pub(crate) fn instantiated_struct_name(struct_name: &str, suffix: &str) -> String {
    format!("{struct_name}_{suffix}")
}

/// Produces the concrete AST for one instantiation: a deep copy of the
/// generic AST with every type parameter identifier replaced by the concrete
/// type subtree and every generic struct name suffixed.
pub(crate) fn instantiate_generic_ast(
    index: &GenericAstIndex,
    suffix: &str,
    type_nodes: &[Node],
) -> Node {
    let mut ast = index.ast.clone();

    ast.children.retain(|child| child.kind != NodeKind::Generic);

    substitute(&mut ast, index, suffix, type_nodes);

    ast
}

fn substitute(node: &mut Node, index: &GenericAstIndex, suffix: &str, type_nodes: &[Node]) {
    let children = std::mem::take(&mut node.children);

    for mut child in children {
        if child.kind == NodeKind::Identifier {
            if let Some(position) = index
                .generic_identifiers
                .iter()
                .position(|ident| *ident == child.token.text)
            {
                // Splice the concrete type's nodes in place of the parameter
                // identifier
                node.children.extend(type_nodes[position].children.iter().cloned());
                continue;
            }

            if index.generic_structs.contains(&child.token.text) {
                child.token.text = instantiated_struct_name(&child.token.text, suffix);
            }
        }

        substitute(&mut child, index, suffix, type_nodes);
        node.children.push(child);
    }
}

impl Lowering<'_, '_> {
    /// The generic module an import alias refers to
    pub fn get_generic_module_from_alias(
        &self,
        alias_token: &Token,
    ) -> Result<String, CompileError> {
        self.generic_uses
            .get(&alias_token.text)
            .cloned()
            .ok_or_else(|| self.err("Use does not exist", alias_token))
    }

    /// The generic module that defines the given generic struct, for structs
    /// pulled in with `from`
    pub fn get_generic_module_from_struct(
        &self,
        struct_token: &Token,
    ) -> Result<String, CompileError> {
        self.generic_structs
            .get(&struct_token.text)
            .cloned()
            .ok_or_else(|| self.err("Generic struct does not exist", struct_token))
    }
}
