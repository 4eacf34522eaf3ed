//! Name mangling for module scoped symbols.
//!
//! Functions and globals are stored in their module's tables under
//! `mangle(name, module)` so that symbols from different modules never
//! collide in a back-end's flat namespace. The encoding is deterministic and
//! invertible given the module name: `_<mangled module>_<name>`.

/// Module names can be path-ish (`util/strings`); anything that is not a
/// valid symbol character becomes an underscore.
pub fn mangle_module_name(module_name: &str) -> String {
    module_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

pub fn mangle(name: &str, module_name: &str) -> String {
    format!("_{}_{}", mangle_module_name(module_name), name)
}

/// Recovers the user facing name from a mangled one. Names that were not
/// mangled for this module come back unchanged.
pub fn unmangle(mangled: &str, module_name: &str) -> String {
    let prefix = format!("_{}_", mangle_module_name(module_name));

    match mangled.strip_prefix(&prefix) {
        Some(name) => name.to_owned(),
        None => mangled.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mangle_round_trips() {
        let mangled = mangle("main", "app");

        assert_eq!(mangled, "_app_main");
        assert_eq!(unmangle(&mangled, "app"), "main");
        assert_eq!(mangle(&unmangle(&mangled, "app"), "app"), mangled);
    }

    #[test]
    fn path_module_names_are_sanitized() {
        assert_eq!(mangle_module_name("util/strings"), "util_strings");
        assert_eq!(mangle("trim", "util/strings"), "_util_strings_trim");
        assert_eq!(unmangle("_util_strings_trim", "util/strings"), "trim");
    }

    #[test]
    fn foreign_names_pass_through_unmangle() {
        assert_eq!(unmangle("printf", "app"), "printf");
    }
}
