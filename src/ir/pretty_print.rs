//! Diagnostic pretty-printer for compiled modules and entry streams. This is
//! what a `-ir` CLI flag shows; nothing in the pipeline depends on the
//! textual form.

use colored::Colorize;
use itertools::Itertools;

use crate::ir::{
    entry::{Entry, Operand, OperandKind},
    FunctionDescription, ModuleDescription, StructDescription,
};

impl core::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            OperandKind::Temp { id } => write!(f, "{}", format!("t{id}").yellow()),
            OperandKind::TempPointer { id } => write!(f, "{}", format!("tp{id}").yellow()),
            OperandKind::Bytes { bytes } => write!(f, "{}", format!("bytes({bytes})").purple()),
            OperandKind::StringData { key } => write!(f, "{}", key.green()),
            OperandKind::Var { name } => write!(f, "{}", name.blue()),
            OperandKind::GlobalVar { name } => write!(f, "{}", format!("@{name}").blue()),
            OperandKind::Pointer { name } => write!(f, "{}", format!("*{name}").blue()),
            OperandKind::ReturnValue => write!(f, "{}", "retval".cyan()),
            OperandKind::CalleeReturnValue => write!(f, "{}", "calleeRetval".cyan()),
            OperandKind::IntLiteral { value } => write!(f, "{}", value.to_string().purple()),
            OperandKind::FloatLiteral { value } => write!(f, "{}", value.to_string().purple()),
            OperandKind::Label { name } => write!(f, "{}", name.bright_red()),
            OperandKind::Module { name } => write!(f, "{}", name.magenta()),
            OperandKind::None => Ok(()),
        }
    }
}

impl core::fmt::Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.opcode.to_string().cyan())?;

        for operand in [&self.op1, &self.op2, &self.op3] {
            if !operand.is_none() {
                write!(f, " {operand}")?;
            }
        }

        Ok(())
    }
}

pub fn print_entries(entries: &[Entry]) {
    for entry in entries {
        println!("    {entry}");
    }
}

pub fn print_function_description(name: &str, function: &FunctionDescription) {
    println!(
        "{} {}{}{}{} {} {}",
        "fn".magenta(),
        name.blue(),
        "(".white(),
        function
            .parameter_names
            .iter()
            .map(|p| format!("{}: {}", p, function.parameters[p]))
            .join(", "),
        ")".white(),
        "->".white(),
        function.return_type
    );

    print_entries(&function.entries);
}

pub fn print_struct_description(name: &str, structure: &StructDescription) {
    println!(
        "{} {} {}",
        "struct".magenta(),
        name.blue(),
        format!("({} bytes)", structure.size).white()
    );

    for field_name in &structure.field_names {
        let field = &structure.fields[field_name];
        println!(
            "    {}: {} {}",
            field_name,
            field,
            format!("@{}", field.offset).white()
        );
    }
}

pub fn print_module_description(module: &ModuleDescription) {
    println!("{} {}", "module".magenta(), module.name.blue());

    if !module.uses.is_empty() {
        println!("  {} {}", "uses".magenta(), module.uses.iter().join(", "));
    }

    for (name, structure) in module.structures.iter().sorted_by(|a, b| a.0.cmp(b.0)) {
        print_struct_description(name, structure);
    }

    for (name, function) in module.functions.iter().sorted_by(|a, b| a.0.cmp(b.0)) {
        print_function_description(name, function);
    }
}
