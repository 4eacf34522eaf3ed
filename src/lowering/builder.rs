//! Entry emission and the pointer discipline.
//!
//! Everything that appends IR to the working function lives here. The core
//! rules: reads through pointer operands are materialized with `Read`,
//! writes to pointer destinations go through `Write`, pointer-to-pointer
//! moves route through a fresh temporary, and literal operands adopt the
//! concrete data type of their non-literal counterpart at each copy or
//! comparison site.

use crate::{
    ast::Token,
    diagnostics::CompileError,
    ir::{DataType, Entry, Opcode, Operand, TypeDescription},
    lowering::{Lowering, Unit},
};

impl Lowering<'_, '_> {
    pub fn push_entry(&mut self, entry: Entry) {
        self.function_mut().entries.push(entry);
    }

    /// The destination operand a `CreatePointer` should produce for `op`.
    /// Struct operands point at their first field.
    fn create_pointer_destination(
        &mut self,
        op: &Operand,
        dtype_name: &str,
        module_name: &str,
    ) -> Operand {
        let dtype = if op.dtype != DataType::Struct {
            op.dtype
        } else {
            self.session
                .modules
                .get(module_name)
                .and_then(|module| module.structures.get(dtype_name))
                .and_then(|structure| structure.first_field())
                .map(|field| field.dtype)
                .unwrap_or(DataType::Struct)
        };

        let id = self.next_id();
        Operand::temp_pointer(id, dtype)
    }

    /// Returns a pointer operand addressing `op`, emitting `CreatePointer`
    /// unless `op` already is a usable pointer
    pub fn create_pointer(
        &mut self,
        op: &Operand,
        dtype_name: &str,
        module_name: &str,
    ) -> Operand {
        if op.is_pointer() && op.dtype != DataType::Struct {
            return op.clone();
        }

        let pointer = self.create_pointer_destination(op, dtype_name, module_name);

        self.push_entry(Entry::binary(
            Opcode::CreatePointer,
            pointer.clone(),
            op.clone(),
        ));

        pointer
    }

    pub fn get_pointer_operand(&mut self, unit: &Unit) -> Operand {
        let ty = unit.type_description().clone();
        self.create_pointer(unit.operand(), &ty.dtype_name, &ty.module_name)
    }

    /// Copies one operand's value to another, inserting `Read`/`Write` as the
    /// pointer tags require
    pub fn operand_copy(&mut self, dst: Operand, mut src: Operand) {
        // Literals adopt the destination's concrete data type
        if src.is_literal() {
            src.dtype = dst.dtype;
        }

        if dst.is_pointer() && src.is_pointer() {
            let temp = Operand::temp(self.next_id(), src.dtype);
            self.operand_copy(temp.clone(), src);
            self.operand_copy(dst, temp);
            return;
        }

        let opcode = if dst.is_pointer() {
            Opcode::Write
        } else if src.is_pointer() {
            Opcode::Read
        } else {
            Opcode::Equal
        };

        self.push_entry(Entry::binary(opcode, dst, src));
    }

    pub fn mem_copy(&mut self, dst: Operand, src: Operand, num_bytes: usize) {
        self.push_entry(Entry::ternary(
            Opcode::MemoryCopy,
            dst,
            src,
            Operand::int_literal(DataType::I64, num_bytes as i64),
        ));
    }

    /// Copies a whole unit: scalars through [`Self::operand_copy`], structs
    /// and arrays with a block `MemoryCopy` over the source size
    pub fn unit_copy(&mut self, dst: &Unit, src: &Unit) {
        if dst.is_struct() || dst.is_array() {
            let dst_pointer = self.get_pointer_operand(dst);
            let src_pointer = self.get_pointer_operand(src);

            self.mem_copy(dst_pointer, src_pointer, src.size());
        } else {
            self.operand_copy(dst.operand().clone(), src.operand().clone());
        }
    }

    /// Materializes a value out of a pointer operand with `Read`; non-pointer
    /// operands pass through unchanged
    pub fn ensure_not_pointer(&mut self, op: Operand) -> Operand {
        if !op.is_pointer() {
            return op;
        }

        let temp = Operand::temp(self.next_id(), op.dtype);
        self.operand_copy(temp.clone(), op);
        temp
    }

    /// Appends an entry whose op1 must not be a pointer; if it is one, the
    /// result is produced into a fresh temporary which is then written back
    /// through the pointer
    fn push_entry_no_pointer_write(&mut self, entry: Entry) -> Operand {
        if !entry.op1.is_pointer() {
            let result = entry.op1.clone();
            self.push_entry(entry);
            return result;
        }

        let pointer = entry.op1.clone();
        let temp = Operand::temp(self.next_id(), pointer.dtype);

        let mut modified = entry;
        modified.op1 = temp.clone();
        self.push_entry(modified);

        self.push_entry(Entry::binary(Opcode::Write, pointer, temp.clone()));

        temp
    }

    /// `t = lhs op rhs` for the arithmetic and bitwise instructions
    pub fn binary_operator(&mut self, opcode: Opcode, lhs: &Unit, rhs: &Unit) -> Unit {
        let dtype = lhs.type_description().dtype;

        let result = Operand::temp(self.next_id(), dtype);
        let op2 = self.ensure_not_pointer(lhs.operand().clone());
        let op3 = self.ensure_not_pointer(rhs.operand().clone());

        let result = self.push_entry_no_pointer_write(Entry::ternary(opcode, result, op2, op3));

        Unit::new(result, lhs.type_description().clone())
    }

    pub fn unary_operator(&mut self, opcode: Opcode, term: &Unit) -> Unit {
        let dtype = term.type_description().dtype;

        let result = Operand::temp(self.next_id(), dtype);
        let op2 = self.ensure_not_pointer(term.operand().clone());

        let result = self.push_entry_no_pointer_write(Entry::binary(opcode, result, op2));

        Unit::new(result, term.type_description().clone())
    }

    pub fn cast_operator(&mut self, unit: &Unit, destination_dtype: DataType) -> Unit {
        let result = Operand::temp(self.next_id(), destination_dtype);
        let op2 = self.ensure_not_pointer(unit.operand().clone());

        let result = self.push_entry_no_pointer_write(Entry::binary(Opcode::Cast, result, op2));

        Unit::new(result, TypeDescription::from_data_type(destination_dtype))
    }

    pub fn pointer_cast_operator(
        &mut self,
        unit: &Unit,
        destination_type: TypeDescription,
    ) -> Unit {
        let result = Operand::temp_pointer(self.next_id(), destination_type.dtype);

        self.push_entry(Entry::binary(
            Opcode::PointerCast,
            result.clone(),
            unit.operand().clone(),
        ));

        Unit::new(result, destination_type)
    }

    /// Emits a comparison; produces no value, only the implicit compare flag
    /// consumed by the branch that follows
    pub fn compare_operator(&mut self, opcode: Opcode, lhs: &Unit, rhs: &Unit) {
        let op1 = lhs.operand().clone();
        let mut op2 = rhs.operand().clone();

        if op2.is_literal() {
            op2.dtype = op1.dtype;
        }

        let op1 = self.ensure_not_pointer(op1);
        let op2 = self.ensure_not_pointer(op2);

        self.push_entry(Entry::binary(opcode, op1, op2));
    }

    /// Pointer plus byte offset; the result is a pointer to the same element
    /// data type
    pub fn address_add_operator(&mut self, op2: Operand, op3: Operand) -> Operand {
        let result = Operand::temp_pointer(self.next_id(), op2.dtype);

        self.push_entry(Entry::ternary(Opcode::AddressAdd, result.clone(), op2, op3));

        result
    }

    /// Scalar times byte width; yields an address-typed value
    pub fn address_multiply_operator(&mut self, op2: Operand, op3: Operand) -> Operand {
        let result = Operand::temp_pointer(self.next_id(), DataType::Void);
        let op2 = self.ensure_not_pointer(op2);

        self.push_entry(Entry::ternary(
            Opcode::AddressMultiply,
            result.clone(),
            op2,
            op3,
        ));

        result
    }

    /// Narrows a struct unit to one of its fields, producing a pointer to the
    /// field. Mutability is inherited from the parent unit.
    pub fn get_struct_field(
        &mut self,
        field_token: &Token,
        unit: &Unit,
    ) -> Result<Unit, CompileError> {
        let ty = unit.type_description();

        let structure = self
            .session
            .modules
            .get(&ty.module_name)
            .and_then(|module| module.structures.get(&ty.dtype_name))
            .ok_or_else(|| self.err("Undefined STRUCT field", field_token))?;

        let mut field_type = structure
            .field(&field_token.text)
            .ok_or_else(|| self.err("Undefined STRUCT field", field_token))?
            .clone();

        if unit.is_mutable() {
            field_type.become_mutable();
        } else {
            field_type.clear_property(crate::ir::TypeProperty::IsMut);
        }

        let pointer = self.get_pointer_operand(unit);

        let mut field_operand =
            self.address_add_operator(pointer, Operand::bytes(field_type.offset));
        field_operand.dtype = self.canonical_operand_dtype(&field_type);

        Ok(Unit::new(field_operand, field_type))
    }

    /// Applies the given index units to an array unit, consuming one leading
    /// dimension per index. The result is a pointer to the element.
    pub fn get_indexed_element(
        &mut self,
        unit: &Unit,
        indices: &[Unit],
    ) -> Result<Unit, CompileError> {
        let mut element_type = unit.type_description().clone();
        let mut element_width = element_type.size / element_type.dimensions[0];

        let mut element_operand = self.get_pointer_operand(unit);

        for (dimension_count, index) in indices.iter().enumerate() {
            let subscript = self.address_multiply_operator(
                index.operand().clone(),
                Operand::bytes(element_width),
            );

            if dimension_count + 1 != element_type.dimensions.len() {
                element_width /= element_type.dimensions[dimension_count + 1];
            }

            element_operand = self.address_add_operator(element_operand, subscript);
        }

        element_type.dimensions.drain(..indices.len());
        element_type.dimension_kinds.drain(..indices.len());
        element_type.size =
            element_type.dtype_size * element_type.dimensions.iter().product::<usize>();

        element_operand.dtype = self.canonical_operand_dtype(&element_type);

        Ok(Unit::new(element_operand, element_type))
    }

    /* Labels and branches */

    pub fn create_label(&mut self, token: &Token, is_true_label: bool, prefix: &str) -> Operand {
        let polarity = if is_true_label { "true" } else { "false" };

        Operand::label(format!(
            "_{prefix}_{polarity}{}",
            token.line_col_suffix()
        ))
    }

    pub fn insert_label(&mut self, label: Operand) {
        self.push_entry(Entry::unary(Opcode::CreateLabel, label));
    }

    pub fn create_branch(&mut self, opcode: Opcode, label: Operand) {
        self.push_entry(Entry::unary(opcode, label));
    }

    /* Console I/O */

    pub fn create_print(&mut self, unit: &Unit) {
        let entry = if unit.is_array() {
            // Arrays print through their pointer, no read
            Entry::unary(Opcode::PrintString, unit.operand().clone())
        } else {
            let op1 = self.ensure_not_pointer(unit.operand().clone());
            Entry::unary(Opcode::Print, op1)
        };

        self.push_entry(entry);
    }

    pub fn create_input(&mut self, unit: &Unit) {
        let (opcode, size) = if unit.is_array() {
            (Opcode::InputString, unit.type_description().dimensions[0])
        } else {
            (Opcode::Input, 0)
        };

        self.push_entry(Entry::binary(
            opcode,
            unit.operand().clone(),
            Operand::int_literal(DataType::AutoInt, size as i64),
        ));
    }

    /* Locals */

    pub fn create_local(
        &mut self,
        name_token: &Token,
        mut type_description: TypeDescription,
    ) -> Result<Unit, CompileError> {
        if self.function().symbol_exists(&name_token.text) {
            return Err(self.err("Symbol already defined", name_token));
        }

        type_description.set_property(crate::ir::TypeProperty::IsLocal);

        self.function_mut()
            .locals
            .insert(name_token.text.clone(), type_description.clone());
        self.scope.put_in_current_scope(&name_token.text);

        Ok(self.unit_from_type_description(&type_description, &name_token.text))
    }

    /* Calls */

    /// Passes one argument: by address for mutable/struct/array formals, by
    /// value otherwise. op2 names the callee (by its storage key) and op3
    /// the callee's module.
    pub fn pass_parameter(
        &mut self,
        callee_key: &str,
        callee: &crate::ir::FunctionDescription,
        formal: &TypeDescription,
        actual: &Unit,
    ) {
        let return_dtype = callee.return_type.dtype;

        let by_address = formal.is_mutable() || formal.is_struct() || formal.is_array();

        let (opcode, op1) = if by_address {
            (Opcode::PassAddress, actual.operand().clone())
        } else {
            let op1 = self.ensure_not_pointer(actual.operand().clone());
            (Opcode::Pass, op1)
        };

        self.push_entry(Entry::ternary(
            opcode,
            op1,
            Operand::var(callee_key, return_dtype),
            Operand::module(callee.module_name.as_str()),
        ));
    }

    pub fn call_function(
        &mut self,
        callee_key: &str,
        callee: &crate::ir::FunctionDescription,
    ) -> Unit {
        let return_dtype = callee.return_type.dtype;

        let return_operand = Operand::callee_return_value(return_dtype);

        self.push_entry(Entry::ternary(
            Opcode::Call,
            return_operand.clone(),
            Operand::var(callee_key, return_dtype),
            Operand::module(callee.module_name.as_str()),
        ));

        Unit::new(return_operand, callee.return_type.clone())
    }

    pub fn no_argument_entry(&mut self, opcode: Opcode) {
        self.push_entry(Entry::new(opcode));
    }

    /* Function termination */

    fn function_terminates(&self) -> bool {
        self.function()
            .entries
            .last()
            .is_some_and(|entry| entry.opcode == Opcode::Return)
    }

    /// Appends the implicit `Return` of a void function; a non-void function
    /// whose body can end without returning is an error
    pub fn terminate_function(&mut self, function_token: &Token) -> Result<(), CompileError> {
        if self.function_terminates() {
            return Ok(());
        }

        if !self.function().is_void() {
            return Err(self.err("Missing RETURN for this FUNCTION", function_token));
        }

        self.no_argument_entry(Opcode::Return);
        Ok(())
    }
}
