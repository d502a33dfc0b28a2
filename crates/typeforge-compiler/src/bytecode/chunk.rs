//! Raw code buffer for one method body.

use super::OpCode;

/// Encoded instructions of a single method.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BytecodeChunk {
    code: Vec<u8>,
}

impl BytecodeChunk {
    /// Create a new empty bytecode chunk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write an opcode.
    pub fn write_op(&mut self, op: OpCode) {
        self.code.push(op.into());
    }

    /// Write a byte operand.
    pub fn write_byte(&mut self, byte: u8) {
        self.code.push(byte);
    }

    /// Write a 16-bit operand (big-endian).
    pub fn write_u16(&mut self, value: u16) {
        self.code.extend_from_slice(&value.to_be_bytes());
    }

    /// Write a 32-bit operand (big-endian).
    pub fn write_u32(&mut self, value: u32) {
        self.code.extend_from_slice(&value.to_be_bytes());
    }

    /// Write a 64-bit operand (big-endian).
    pub fn write_u64(&mut self, value: u64) {
        self.code.extend_from_slice(&value.to_be_bytes());
    }

    /// Overwrite a previously written 32-bit operand.
    ///
    /// Returns `false` if `offset` does not address four written bytes.
    pub fn patch_u32(&mut self, offset: usize, value: u32) -> bool {
        match self.code.get_mut(offset..offset + 4) {
            Some(slot) => {
                slot.copy_from_slice(&value.to_be_bytes());
                true
            }
            None => false,
        }
    }

    /// Get current code offset.
    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    /// Get the bytecode.
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Read a byte at the given offset.
    pub fn read_byte(&self, offset: usize) -> Option<u8> {
        self.code.get(offset).copied()
    }

    /// Read a u16 at the given offset (big-endian).
    pub fn read_u16(&self, offset: usize) -> Option<u16> {
        let bytes = self.code.get(offset..offset + 2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Read a u32 at the given offset (big-endian).
    pub fn read_u32(&self, offset: usize) -> Option<u32> {
        let bytes = self.code.get(offset..offset + 4)?;
        Some(u32::from_be_bytes(bytes.try_into().ok()?))
    }

    /// Read a u64 at the given offset (big-endian).
    pub fn read_u64(&self, offset: usize) -> Option<u64> {
        let bytes = self.code.get(offset..offset + 8)?;
        Some(u64::from_be_bytes(bytes.try_into().ok()?))
    }

    /// Read an opcode at the given offset.
    pub fn read_op(&self, offset: usize) -> Option<OpCode> {
        self.code.get(offset).and_then(|&b| OpCode::from_u8(b))
    }

    /// Extract all opcodes from the chunk, skipping operands.
    pub fn opcodes(&self) -> Vec<OpCode> {
        let mut ops = Vec::new();
        let mut offset = 0;

        while offset < self.code.len() {
            if let Some(op) = self.read_op(offset) {
                ops.push(op);
                offset += 1 + op.operand_size();
            } else {
                offset += 1;
            }
        }

        ops
    }

    /// Assert this chunk contains exactly the given opcode sequence.
    #[track_caller]
    pub fn assert_opcodes(&self, expected: &[OpCode]) {
        let actual = self.opcodes();
        assert_eq!(
            actual,
            expected,
            "Bytecode mismatch.\nExpected: {:?}\nActual:   {:?}",
            expected.iter().map(|op| op.name()).collect::<Vec<_>>(),
            actual.iter().map(|op| op.name()).collect::<Vec<_>>(),
        );
    }

    /// Assert the given opcodes appear in order, not necessarily contiguous.
    #[track_caller]
    pub fn assert_contains_opcodes(&self, expected: &[OpCode]) {
        let actual = self.opcodes();
        let mut expected_iter = expected.iter().peekable();

        for op in &actual {
            if expected_iter.peek() == Some(&op) {
                expected_iter.next();
            }
        }

        if expected_iter.peek().is_some() {
            let remaining: Vec<_> = expected_iter.map(|op| op.name()).collect();
            panic!(
                "Missing opcodes in sequence.\nExpected to find: {:?}\nActual bytecode:  {:?}",
                remaining,
                actual.iter().map(|op| op.name()).collect::<Vec<_>>(),
            );
        }
    }

    /// Count occurrences of an opcode.
    pub fn count(&self, op: OpCode) -> usize {
        self.opcodes().into_iter().filter(|o| *o == op).count()
    }
}
