//! Bytecode emitter.
//!
//! A [`BytecodeEmitter`] owns one method body while it is being built: the
//! code buffer, the constant pool, the locals table, the label table and the
//! protected-region table. It is consumed by [`BytecodeEmitter::finish`],
//! which resolves every label to an absolute offset and produces an immutable
//! [`CompiledMethod`].
//!
//! Emission methods never fail individually. The first structural error
//! (undeclared local, out-of-range argument, label marked twice, misnested
//! region) is recorded and reported by `finish`, so a broken body can never
//! be finalized.
//!
//! # Example
//!
//! ```
//! use typeforge_compiler::emit::BytecodeEmitter;
//! use typeforge_core::DataType;
//!
//! let mut e = BytecodeEmitter::new("answer", 1);
//! let tmp = e.declare_local(DataType::I32);
//! e.load_constant(42);
//! e.store_local(tmp);
//! e.load_local(tmp);
//! e.ret();
//!
//! let method = e.finish().unwrap();
//! assert_eq!(method.locals(), &[DataType::I32]);
//! ```

mod labels;
mod regions;

use std::fmt;

use rustc_hash::FxHashMap;
use tracing::trace;
use typeforge_core::{BuildError, BuildResult, DataType, ExceptionKind, Literal, TypeHash};

use crate::bytecode::{BytecodeChunk, Constant, ConstantPool, OpCode};
use crate::method::CompiledMethod;
use labels::{LabelError, LabelTable};
use regions::RegionTable;

/// A forward-declarable jump target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(u32);

impl Label {
    pub fn index(self) -> u32 {
        self.0
    }
}

/// A declared local slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Local(u16);

impl Local {
    pub fn index(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Local {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "local#{}", self.0)
    }
}

/// Handle to an open protected region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionHandle {
    index: usize,
    end: Label,
}

impl RegionHandle {
    /// Label marking the end of the region; target of a structured leave.
    pub fn end_label(&self) -> Label {
        self.end
    }
}

/// Emits bytecode for a single method body.
pub struct BytecodeEmitter {
    name: String,
    /// Argument count including the receiver.
    arity: u8,
    chunk: BytecodeChunk,
    constants: ConstantPool,
    locals: Vec<DataType>,
    labels: LabelTable,
    regions: RegionTable,
    /// Names of the members called by key, for readable faults.
    member_names: FxHashMap<TypeHash, String>,
    /// First structural error; reported by `finish`.
    error: Option<BuildError>,
}

impl BytecodeEmitter {
    /// Create an emitter for a method taking `arity` arguments (receiver
    /// included).
    pub fn new(name: impl Into<String>, arity: u8) -> Self {
        Self {
            name: name.into(),
            arity,
            chunk: BytecodeChunk::new(),
            constants: ConstantPool::new(),
            locals: Vec::new(),
            labels: LabelTable::default(),
            regions: RegionTable::default(),
            member_names: FxHashMap::default(),
            error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> u8 {
        self.arity
    }

    /// Current code size in bytes.
    pub fn code_size(&self) -> usize {
        self.chunk.len()
    }

    /// Record a structural error. Only the first one is kept.
    pub fn fail(&mut self, error: BuildError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    pub fn has_failed(&self) -> bool {
        self.error.is_some()
    }

    fn offset(&mut self) -> u32 {
        match u32::try_from(self.chunk.current_offset()) {
            Ok(offset) => offset,
            Err(_) => {
                self.fail(BuildError::CodeTooLarge {
                    method: self.name.clone(),
                });
                u32::MAX
            }
        }
    }

    fn constant_index(&mut self, constant: Constant) -> u16 {
        let index = self.constants.add(constant);
        match u16::try_from(index) {
            Ok(index) => index,
            Err(_) => {
                self.fail(BuildError::CodeTooLarge {
                    method: self.name.clone(),
                });
                u16::MAX
            }
        }
    }

    fn string_index(&mut self, value: &str) -> u16 {
        self.constant_index(Constant::Str(value.to_string()))
    }

    fn hash_index(&mut self, hash: TypeHash) -> u16 {
        self.constant_index(Constant::Hash(hash))
    }

    // ==========================================================================
    // Basic Emission
    // ==========================================================================

    /// Emit a single opcode with no operands.
    pub fn emit(&mut self, op: OpCode) {
        self.chunk.write_op(op);
    }

    fn emit_u16(&mut self, op: OpCode, value: u16) {
        self.chunk.write_op(op);
        self.chunk.write_u16(value);
    }

    // ==========================================================================
    // Constants
    // ==========================================================================

    /// Load a constant, choosing the immediate form for its kind.
    pub fn load_constant(&mut self, value: impl Into<Literal>) {
        self.load_literal(&value.into());
    }

    /// Load a literal, choosing the immediate form for its kind.
    pub fn load_literal(&mut self, literal: &Literal) {
        match literal {
            Literal::Null => self.emit(OpCode::PushNull),
            Literal::Bool(true) => self.emit(OpCode::PushTrue),
            Literal::Bool(false) => self.emit(OpCode::PushFalse),
            Literal::I8(v) => {
                self.emit(OpCode::PushI8);
                self.chunk.write_byte(*v as u8);
            }
            Literal::I16(v) => self.emit_u16(OpCode::PushI16, *v as u16),
            Literal::I32(v) => {
                self.emit(OpCode::PushI32);
                self.chunk.write_u32(*v as u32);
            }
            Literal::I64(v) => {
                self.emit(OpCode::PushI64);
                self.chunk.write_u64(*v as u64);
            }
            Literal::U8(v) => {
                self.emit(OpCode::PushU8);
                self.chunk.write_byte(*v);
            }
            Literal::U16(v) => self.emit_u16(OpCode::PushU16, *v),
            Literal::U32(v) => {
                self.emit(OpCode::PushU32);
                self.chunk.write_u32(*v);
            }
            Literal::U64(v) => {
                self.emit(OpCode::PushU64);
                self.chunk.write_u64(*v);
            }
            Literal::F32(v) => {
                self.emit(OpCode::PushF32);
                self.chunk.write_u32(v.to_bits());
            }
            Literal::F64(v) => {
                self.emit(OpCode::PushF64);
                self.chunk.write_u64(v.to_bits());
            }
            Literal::Decimal(d) => {
                self.emit(OpCode::PushDecimal);
                for word in d.parts() {
                    self.chunk.write_u32(word);
                }
            }
            Literal::Str(s) => {
                let index = self.string_index(s);
                self.emit_u16(OpCode::PushString, index);
            }
            Literal::Enum { ty, value } => {
                let index = self.hash_index(*ty);
                self.emit_u16(OpCode::PushEnum, index);
                self.chunk.write_u64(*value as u64);
            }
            Literal::Type(hash) => {
                let index = self.hash_index(*hash);
                self.emit_u16(OpCode::PushType, index);
            }
        }
    }

    pub fn load_null(&mut self) {
        self.emit(OpCode::PushNull);
    }

    pub fn load_string(&mut self, value: &str) {
        let index = self.string_index(value);
        self.emit_u16(OpCode::PushString, index);
    }

    // ==========================================================================
    // Locals and Arguments
    // ==========================================================================

    /// Declare a local of the given kind.
    pub fn declare_local(&mut self, data_type: DataType) -> Local {
        let Ok(slot) = u16::try_from(self.locals.len()) else {
            self.fail(BuildError::CodeTooLarge {
                method: self.name.clone(),
            });
            return Local(u16::MAX);
        };
        self.locals.push(data_type);
        Local(slot)
    }

    /// Kind of a declared local.
    pub fn local_type(&self, local: Local) -> Option<&DataType> {
        self.locals.get(local.0 as usize)
    }

    fn check_local(&mut self, local: Local) {
        if local.0 as usize >= self.locals.len() {
            self.fail(BuildError::UndeclaredLocal {
                method: self.name.clone(),
                slot: local.0,
            });
        }
    }

    pub fn load_local(&mut self, local: Local) {
        self.check_local(local);
        self.emit_u16(OpCode::GetLocal, local.0);
    }

    pub fn store_local(&mut self, local: Local) {
        self.check_local(local);
        self.emit_u16(OpCode::SetLocal, local.0);
    }

    /// Load an argument. Index 0 is the receiver.
    pub fn load_arg(&mut self, index: u8) {
        if index >= self.arity {
            self.fail(BuildError::ArgumentOutOfRange {
                method: self.name.clone(),
                index,
                arity: self.arity,
            });
        }
        self.emit(OpCode::LoadArg);
        self.chunk.write_byte(index);
    }

    /// Load the receiver.
    pub fn load_this(&mut self) {
        self.load_arg(0);
    }

    // ==========================================================================
    // Fields
    // ==========================================================================

    /// Pop an object and push one of its fields.
    pub fn load_field(&mut self, index: u16) {
        self.emit_u16(OpCode::GetField, index);
    }

    /// Pop a value and an object, store the value into the field.
    pub fn store_field(&mut self, index: u16) {
        self.emit_u16(OpCode::SetField, index);
    }

    // ==========================================================================
    // Stack
    // ==========================================================================

    pub fn dup(&mut self) {
        self.emit(OpCode::Dup);
    }

    pub fn pop(&mut self) {
        self.emit(OpCode::Pop);
    }

    pub fn swap(&mut self) {
        self.emit(OpCode::Swap);
    }

    pub fn is_null(&mut self) {
        self.emit(OpCode::IsNull);
    }

    /// Pop a value, push whether it is an instance of `class`.
    pub fn is_instance(&mut self, class: TypeHash) {
        let index = self.hash_index(class);
        self.emit_u16(OpCode::IsInstance, index);
    }

    pub fn not(&mut self) {
        self.emit(OpCode::Not);
    }

    // ==========================================================================
    // Arrays
    // ==========================================================================

    /// Pop an i32 length, push a new array.
    pub fn new_array(&mut self) {
        self.emit(OpCode::NewArray);
    }

    pub fn load_element(&mut self) {
        self.emit(OpCode::LoadElement);
    }

    pub fn store_element(&mut self) {
        self.emit(OpCode::StoreElement);
    }

    pub fn array_length(&mut self) {
        self.emit(OpCode::ArrayLength);
    }

    // ==========================================================================
    // Calls and Construction
    // ==========================================================================

    /// Virtual call of a method by name. The receiver and `arg_count`
    /// arguments must be on the stack.
    pub fn call_method(&mut self, name: &str, arg_count: u8) {
        let key = self.member_key(name);
        self.call_method_key(key, arg_count);
    }

    /// Virtual call by member key.
    pub fn call_method_key(&mut self, key: TypeHash, arg_count: u8) {
        let index = self.hash_index(key);
        self.emit_u16(OpCode::CallMethod, index);
        self.chunk.write_byte(arg_count);
    }

    /// Non-virtual call of `class`'s implementation of `name`.
    pub fn call_base(&mut self, class: TypeHash, name: &str, arg_count: u8) {
        let key = self.member_key(name);
        self.call_base_key(class, key, arg_count);
    }

    fn member_key(&mut self, name: &str) -> TypeHash {
        let key = TypeHash::from_member(name);
        self.member_names
            .entry(key)
            .or_insert_with(|| name.to_string());
        key
    }

    pub fn call_base_key(&mut self, class: TypeHash, key: TypeHash, arg_count: u8) {
        let class_index = self.hash_index(class);
        let key_index = self.hash_index(key);
        self.emit_u16(OpCode::CallBase, class_index);
        self.chunk.write_u16(key_index);
        self.chunk.write_byte(arg_count);
    }

    /// Construct an instance of `class`, passing `arg_count` constructor
    /// arguments from the stack.
    pub fn new_object(&mut self, class: TypeHash, arg_count: u8) {
        let index = self.hash_index(class);
        self.emit_u16(OpCode::New, index);
        self.chunk.write_byte(arg_count);
    }

    /// Pop a target object, push a delegate bound to its method `name`.
    pub fn new_delegate(&mut self, name: &str) {
        let key = self.member_key(name);
        let index = self.hash_index(key);
        self.emit_u16(OpCode::NewDelegate, index);
    }

    pub fn ret(&mut self) {
        self.emit(OpCode::Return);
    }

    pub fn ret_void(&mut self) {
        self.emit(OpCode::ReturnVoid);
    }

    // ==========================================================================
    // Exceptions
    // ==========================================================================

    /// Pop a message, push a new exception of `kind`.
    pub fn new_exception(&mut self, kind: &ExceptionKind) {
        let index = self.string_index(kind.name());
        self.emit_u16(OpCode::NewException, index);
    }

    /// Pop a message and a kind token, push a new exception.
    pub fn new_exception_dynamic(&mut self) {
        self.emit(OpCode::NewExceptionDynamic);
    }

    /// Pop an exception and throw it.
    pub fn throw(&mut self) {
        self.emit(OpCode::Throw);
    }

    // ==========================================================================
    // Labels and Branches
    // ==========================================================================

    pub fn define_label(&mut self) -> Label {
        self.labels.define()
    }

    /// Bind `label` to the current offset.
    pub fn mark_label(&mut self, label: Label) {
        let offset = self.offset();
        match self.labels.mark(label, offset) {
            Ok(()) => {}
            Err(LabelError::Redefined) => self.fail(BuildError::LabelRedefined {
                method: self.name.clone(),
                label: label.0,
            }),
            Err(LabelError::Unknown) => self.fail(BuildError::UnresolvedLabel {
                method: self.name.clone(),
                label: label.0,
            }),
        }
    }

    fn emit_branch(&mut self, op: OpCode, target: Label) {
        self.emit(op);
        let operand = self.chunk.current_offset();
        self.chunk.write_u32(u32::MAX);
        self.labels.add_fixup(operand, target);
    }

    pub fn jump(&mut self, target: Label) {
        self.emit_branch(OpCode::Jump, target);
    }

    /// Pop a bool, jump when false.
    pub fn jump_if_false(&mut self, target: Label) {
        self.emit_branch(OpCode::JumpIfFalse, target);
    }

    /// Pop a bool, jump when true.
    pub fn jump_if_true(&mut self, target: Label) {
        self.emit_branch(OpCode::JumpIfTrue, target);
    }

    /// Jump to `target`, running the finally body of every region exited.
    pub fn leave_to(&mut self, target: Label) {
        self.emit_branch(OpCode::Leave, target);
    }

    // ==========================================================================
    // Protected Regions
    // ==========================================================================

    fn unbalanced(&mut self) {
        self.fail(BuildError::UnbalancedRegion {
            method: self.name.clone(),
        });
    }

    /// Open a protected region; following code is its try body.
    pub fn begin_region(&mut self) -> RegionHandle {
        let end = self.define_label();
        let offset = self.offset();
        let index = self.regions.begin(offset, end);
        RegionHandle { index, end }
    }

    /// Start a catch clause. Returns the local holding the caught exception.
    pub fn begin_catch(&mut self, region: RegionHandle, kind: ExceptionKind) -> Local {
        let local = self.declare_local(DataType::Exception);
        let offset = self.offset();
        if self
            .regions
            .begin_catch(region.index, offset, kind, local)
            .is_err()
        {
            self.unbalanced();
        }
        local
    }

    /// Start the finally body.
    pub fn begin_finally(&mut self, region: RegionHandle) {
        let offset = self.offset();
        if self.regions.begin_finally(region.index, offset).is_err() {
            self.unbalanced();
        }
    }

    /// End a finally body.
    pub fn end_finally(&mut self) {
        self.emit(OpCode::EndFinally);
    }

    /// Close the innermost region and bind its end label.
    pub fn end_region(&mut self, region: RegionHandle) {
        let offset = self.offset();
        match self.regions.end(region.index, offset) {
            Ok(label) => self.mark_label(label),
            Err(_) => self.unbalanced(),
        }
    }

    /// Structured early exit to the end of `region`.
    pub fn leave(&mut self, region: RegionHandle) {
        self.leave_to(region.end);
    }

    /// Number of currently open regions.
    pub fn region_depth(&self) -> usize {
        self.regions.depth()
    }

    // ==========================================================================
    // Finalization
    // ==========================================================================

    /// Resolve labels and regions and freeze the body.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn finish(mut self) -> BuildResult<CompiledMethod> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }
        if !self.regions.is_balanced() {
            return Err(BuildError::UnbalancedRegion { method: self.name });
        }
        if let Some(label) = self.labels.first_unresolved() {
            return Err(BuildError::UnresolvedLabel {
                method: self.name,
                label: label.0,
            });
        }

        for &(operand, label) in self.labels.fixups() {
            let target = self.labels.position(label);
            let patched = target.is_some_and(|t| self.chunk.patch_u32(operand, t));
            if !patched {
                return Err(BuildError::UnresolvedLabel {
                    method: self.name,
                    label: label.0,
                });
            }
        }

        let labels = &self.labels;
        let regions = match self.regions.resolve(|l| labels.position(l)) {
            Ok(regions) => regions,
            Err(_) => return Err(BuildError::UnbalancedRegion { method: self.name }),
        };

        trace!(
            method = %self.name,
            bytes = self.chunk.len(),
            locals = self.locals.len(),
            regions = regions.len(),
            "method emitted"
        );

        Ok(CompiledMethod::new(
            self.name,
            self.arity,
            self.chunk,
            self.constants,
            self.locals,
            regions,
            self.member_names,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typeforge_core::Decimal;

    fn finish(e: BytecodeEmitter) -> CompiledMethod {
        e.finish().expect("body should finalize")
    }

    #[test]
    fn constants_use_kind_specific_forms() {
        let mut e = BytecodeEmitter::new("m", 1);
        e.load_literal(&Literal::I8(-1));
        e.load_literal(&Literal::I16(300));
        e.load_literal(&Literal::I32(7));
        e.load_literal(&Literal::I64(1 << 40));
        e.load_literal(&Literal::U8(1));
        e.load_literal(&Literal::U16(2));
        e.load_literal(&Literal::U32(3));
        e.load_literal(&Literal::U64(4));
        e.load_literal(&Literal::F32(1.5));
        e.load_literal(&Literal::F64(2.5));
        e.load_literal(&Literal::Decimal(Decimal::from_i64(12)));
        e.load_literal(&Literal::Enum {
            ty: TypeHash::from_name("Color"),
            value: 2,
        });
        e.load_literal(&Literal::Type(TypeHash::from_name("Person")));
        e.load_literal(&Literal::string("hi"));
        e.load_literal(&Literal::Null);
        e.load_literal(&Literal::Bool(true));
        e.load_literal(&Literal::Bool(false));
        e.ret_void();

        finish(e).chunk().assert_opcodes(&[
            OpCode::PushI8,
            OpCode::PushI16,
            OpCode::PushI32,
            OpCode::PushI64,
            OpCode::PushU8,
            OpCode::PushU16,
            OpCode::PushU32,
            OpCode::PushU64,
            OpCode::PushF32,
            OpCode::PushF64,
            OpCode::PushDecimal,
            OpCode::PushEnum,
            OpCode::PushType,
            OpCode::PushString,
            OpCode::PushNull,
            OpCode::PushTrue,
            OpCode::PushFalse,
            OpCode::ReturnVoid,
        ]);
    }

    #[test]
    fn numbers_never_enter_the_pool() {
        let mut e = BytecodeEmitter::new("m", 1);
        e.load_constant(1_000_000i64);
        e.load_constant(3.25);
        e.load_string("Name");
        e.load_string("Name");
        e.ret_void();

        let method = finish(e);
        assert_eq!(method.constants().len(), 1);
        assert_eq!(method.chunk().read_u64(1), Some(1_000_000));
    }

    #[test]
    fn locals_record_their_kind() {
        let mut e = BytecodeEmitter::new("m", 1);
        let a = e.declare_local(DataType::I32);
        let b = e.declare_local(DataType::String);
        assert_eq!(e.local_type(b), Some(&DataType::String));
        e.load_local(a);
        e.store_local(a);
        e.ret_void();

        let method = finish(e);
        assert_eq!(method.locals(), &[DataType::I32, DataType::String]);
    }

    #[test]
    fn undeclared_local_fails_the_build() {
        let mut other = BytecodeEmitter::new("other", 1);
        other.declare_local(DataType::I32);
        let foreign = other.declare_local(DataType::I32);

        let mut e = BytecodeEmitter::new("m", 1);
        e.load_local(foreign);
        e.ret_void();

        assert!(matches!(
            e.finish(),
            Err(BuildError::UndeclaredLocal { slot: 1, .. })
        ));
    }

    #[test]
    fn argument_out_of_range_fails_the_build() {
        let mut e = BytecodeEmitter::new("set_Name", 2);
        e.load_arg(0);
        e.load_arg(1);
        e.load_arg(2);
        e.ret_void();

        assert_eq!(
            e.finish().unwrap_err(),
            BuildError::ArgumentOutOfRange {
                method: "set_Name".into(),
                index: 2,
                arity: 2
            }
        );
    }

    #[test]
    fn forward_jump_resolves_to_absolute_offset() {
        let mut e = BytecodeEmitter::new("m", 1);
        let skip = e.define_label();
        e.load_constant(true);
        e.jump_if_false(skip);
        e.load_constant(1);
        e.pop();
        e.mark_label(skip);
        e.ret_void();

        let method = finish(e);
        // PUSH_TRUE(1) JUMP_IF_FALSE(5) PUSH_I32(5) POP(1) -> label at 12
        assert_eq!(method.chunk().read_u32(2), Some(12));
        assert_eq!(method.chunk().read_op(12), Some(OpCode::ReturnVoid));
    }

    #[test]
    fn backward_jump_resolves() {
        let mut e = BytecodeEmitter::new("m", 1);
        let head = e.define_label();
        e.mark_label(head);
        e.load_constant(false);
        e.jump_if_true(head);
        e.ret_void();

        let method = finish(e);
        assert_eq!(method.chunk().read_u32(2), Some(0));
    }

    #[test]
    fn unresolved_label_fails_the_build() {
        let mut e = BytecodeEmitter::new("m", 1);
        let nowhere = e.define_label();
        e.jump(nowhere);
        e.ret_void();

        assert_eq!(
            e.finish().unwrap_err(),
            BuildError::UnresolvedLabel {
                method: "m".into(),
                label: 0
            }
        );
    }

    #[test]
    fn label_marked_twice_fails_the_build() {
        let mut e = BytecodeEmitter::new("m", 1);
        let l = e.define_label();
        e.mark_label(l);
        e.ret_void();
        e.mark_label(l);

        assert!(matches!(
            e.finish(),
            Err(BuildError::LabelRedefined { label: 0, .. })
        ));
    }

    #[test]
    fn open_region_fails_the_build() {
        let mut e = BytecodeEmitter::new("m", 1);
        let _region = e.begin_region();
        e.ret_void();

        assert!(matches!(
            e.finish(),
            Err(BuildError::UnbalancedRegion { .. })
        ));
    }

    #[test]
    fn region_table_is_resolved() {
        let mut e = BytecodeEmitter::new("m", 1);
        let region = e.begin_region();
        e.load_null();
        e.pop();
        e.leave(region);
        let exc = e.begin_catch(region, ExceptionKind::root());
        e.leave(region);
        e.begin_finally(region);
        e.end_finally();
        e.end_region(region);
        e.ret_void();

        let method = finish(e);
        let r = &method.regions()[0];
        assert_eq!(r.try_range, 0..7);
        assert_eq!(r.catches[0].handler, 7..12);
        assert_eq!(r.catches[0].local, exc.index());
        assert_eq!(r.finally, Some(12..13));
        assert_eq!(r.end, 13);
        // Both leaves target the region end.
        assert_eq!(method.chunk().read_u32(3), Some(13));
        assert_eq!(method.chunk().read_u32(8), Some(13));
        assert_eq!(method.locals(), &[DataType::Exception]);
    }

    #[test]
    fn calls_reference_pooled_hashes() {
        let mut e = BytecodeEmitter::new("m", 1);
        e.load_this();
        e.call_method("Refresh", 0);
        e.load_this();
        e.call_base(TypeHash::from_name("Base"), "Refresh", 0);
        e.new_object(TypeHash::from_name("List"), 0);
        e.pop();
        e.ret_void();

        let method = finish(e);
        method.chunk().assert_opcodes(&[
            OpCode::LoadArg,
            OpCode::CallMethod,
            OpCode::LoadArg,
            OpCode::CallBase,
            OpCode::New,
            OpCode::Pop,
            OpCode::ReturnVoid,
        ]);
        let key = method.chunk().read_u16(3).unwrap();
        assert_eq!(
            method.constant(key).and_then(Constant::as_hash),
            Some(TypeHash::from_member("Refresh"))
        );
        // Refresh key is shared between the two calls.
        assert_eq!(method.constants().len(), 3);
    }

    #[test]
    fn called_members_keep_their_names() {
        let mut e = BytecodeEmitter::new("m", 1);
        e.load_this();
        e.call_method("Refresh", 0);
        e.load_this();
        e.call_method_key(TypeHash::from_member("Anonymous"), 0);
        e.ret_void();

        let method = finish(e);
        assert_eq!(method.member_name(TypeHash::from_member("Refresh")), Some("Refresh"));
        assert_eq!(method.member_name(TypeHash::from_member("Anonymous")), None);
    }
}
