use strum_macros::{Display, EnumString};

use crate::constants::UINT8_COUNT;
use crate::memory::reserve_to;
use crate::value::{Value, ValueArray};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
pub enum OpCode {
    #[strum(serialize = "OP_CONSTANT")]
    Constant,
    #[strum(serialize = "OP_ADD")]
    Add,
    #[strum(serialize = "OP_SUBTRACT")]
    Subtract,
    #[strum(serialize = "OP_MULTIPLY")]
    Multiply,
    #[strum(serialize = "OP_DIVIDE")]
    Divide,
    #[strum(serialize = "OP_NEGATE")]
    Negate,
    #[strum(serialize = "OP_RETURN")]
    Return,
}

const OPCODE_ARRAY: [Option<OpCode>; 256] = {
    let mut arr = [None; 256];

    arr[OpCode::Constant as u8 as usize] = Some(OpCode::Constant);
    arr[OpCode::Add as u8 as usize] = Some(OpCode::Add);
    arr[OpCode::Subtract as u8 as usize] = Some(OpCode::Subtract);
    arr[OpCode::Multiply as u8 as usize] = Some(OpCode::Multiply);
    arr[OpCode::Divide as u8 as usize] = Some(OpCode::Divide);
    arr[OpCode::Negate as u8 as usize] = Some(OpCode::Negate);
    arr[OpCode::Return as u8 as usize] = Some(OpCode::Return);
    arr
};

impl OpCode {
    #[inline(always)]
    pub fn from_byte(byte: u8) -> Option<Self> {
        OPCODE_ARRAY[byte as usize]
    }

    #[inline(always)]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Number of operand bytes that follow the opcode in the code stream.
    pub fn operand_count(self) -> usize {
        match self {
            OpCode::Constant => 1,
            OpCode::Add
            | OpCode::Subtract
            | OpCode::Multiply
            | OpCode::Divide
            | OpCode::Negate
            | OpCode::Return => 0,
        }
    }

    /// Encoded size of the whole instruction, opcode included.
    pub fn width(self) -> usize {
        1 + self.operand_count()
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> u8 {
        op.to_byte()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkError {
    #[error("line {line} written after line {last_line}; lines must not decrease")]
    LineOutOfOrder { line: usize, last_line: usize },
    #[error("line {0} is past the end of the line table")]
    LineTooLarge(usize),
    #[error("too many constants in one chunk")]
    TooManyConstants,
}

/// A unit of bytecode: the instruction stream, its constant pool and a
/// run-length table mapping code offsets back to source lines.
///
/// `lines[n]` holds how many code bytes were emitted while on source line
/// `n`. Producers must write in non-decreasing line order; [`Chunk::write`]
/// rejects anything else.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chunk {
    code: Vec<u8>,
    lines: Vec<usize>,
    last_line: usize,
    constants: ValueArray,
}

impl Chunk {
    pub fn new() -> Chunk {
        Chunk {
            code: Vec::new(),
            lines: Vec::new(),
            last_line: 0,
            constants: ValueArray::new(),
        }
    }

    pub fn write(&mut self, byte: u8, line: usize) -> Result<(), ChunkError> {
        let slots = self.check_line(line)?;

        if self.code.len() == self.code.capacity() {
            let capacity = grow_capacity!(self.code.capacity());
            reserve_to(&mut self.code, capacity);
        }

        if self.lines.capacity() < slots {
            let capacity = std::cmp::max(grow_capacity!(self.lines.capacity()), slots);
            reserve_to(&mut self.lines, capacity);
        }
        if self.lines.len() < slots {
            self.lines.resize(slots, 0);
        }

        self.code.push(byte);

        if self.last_line == line {
            self.lines[line] += 1;
        } else {
            self.last_line = line;
            self.lines[line] = 1;
        }
        Ok(())
    }

    pub fn write_op(&mut self, op: OpCode, line: usize) -> Result<(), ChunkError> {
        self.write(op.to_byte(), line)
    }

    pub fn add_constant(&mut self, value: Value) -> usize {
        self.constants.write(value)
    }

    /// Add `value` to the pool and emit the `OP_CONSTANT` that loads it.
    pub fn write_constant(&mut self, value: Value, line: usize) -> Result<u8, ChunkError> {
        if self.constants.len() >= UINT8_COUNT {
            return Err(ChunkError::TooManyConstants);
        }
        // Validate the line before touching the pool so a rejected write leaves no trace.
        self.check_line(line)?;
        let index = self.add_constant(value) as u8;
        self.write_op(OpCode::Constant, line)?;
        self.write(index, line)?;
        Ok(index)
    }

    /// Line-table slots needed to record `line`.
    fn check_line(&self, line: usize) -> Result<usize, ChunkError> {
        if line < self.last_line {
            return Err(ChunkError::LineOutOfOrder {
                line,
                last_line: self.last_line,
            });
        }
        line.checked_add(1).ok_or(ChunkError::LineTooLarge(line))
    }

    /// Source line of the byte at `offset`, reconstructed by walking the
    /// run-length table. Costs O(line number).
    pub fn get_line(&self, offset: usize) -> Option<usize> {
        if offset >= self.code.len() {
            return None;
        }

        let mut remaining = offset;
        for (line, &count) in self.lines.iter().enumerate() {
            if remaining < count {
                return Some(line);
            }
            remaining -= count;
        }
        None
    }

    pub fn read_byte(&self, offset: usize) -> Option<u8> {
        self.code.get(offset).copied()
    }

    pub fn get_constant(&self, index: usize) -> Option<Value> {
        self.constants.get(index)
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.code.capacity()
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn constants(&self) -> &ValueArray {
        &self.constants
    }

    pub fn lines(&self) -> &[usize] {
        &self.lines
    }

    pub fn lines_capacity(&self) -> usize {
        self.lines.capacity()
    }

    /// Release code, line table and constants. The chunk is left exactly as
    /// [`Chunk::new`] builds it and can be written again.
    pub fn free(&mut self) {
        *self = Chunk::new();
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{Chunk, ChunkError, OpCode};

    #[test]
    fn test_opcode_round_trip() {
        for byte in 0..=u8::MAX {
            match OpCode::from_byte(byte) {
                Some(op) => assert_eq!(op.to_byte(), byte),
                None => assert!(byte > OpCode::Return as u8),
            }
        }
        assert_eq!(OpCode::Constant.to_string(), "OP_CONSTANT");
        assert_eq!(OpCode::from_str("OP_NEGATE"), Ok(OpCode::Negate));
        assert_eq!(OpCode::Constant.width(), 2);
        assert_eq!(OpCode::Return.width(), 1);
    }

    #[test]
    fn test_get_line_run_length() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Return, 1).unwrap();
        chunk.write_op(OpCode::Return, 1).unwrap();
        chunk.write_op(OpCode::Negate, 2).unwrap();
        chunk.write_op(OpCode::Add, 4).unwrap();
        chunk.write_op(OpCode::Add, 4).unwrap();
        chunk.write_op(OpCode::Add, 4).unwrap();

        assert_eq!(chunk.lines(), &[0, 2, 1, 0, 3]);
        let lines: Vec<_> = (0..chunk.len()).map(|o| chunk.get_line(o)).collect();
        assert_eq!(lines, vec![Some(1), Some(1), Some(2), Some(4), Some(4), Some(4)]);
        assert_eq!(chunk.get_line(6), None);
    }

    #[test]
    fn test_line_zero_and_large_jump() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Return, 0).unwrap();
        chunk.write_op(OpCode::Return, 123).unwrap();
        assert!(chunk.lines_capacity() >= 124);
        assert_eq!(chunk.get_line(0), Some(0));
        assert_eq!(chunk.get_line(1), Some(123));
    }

    #[test]
    fn test_decreasing_line_rejected() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Return, 3).unwrap();
        let err = chunk.write_op(OpCode::Return, 2).unwrap_err();
        assert_eq!(err, ChunkError::LineOutOfOrder { line: 2, last_line: 3 });
        assert_eq!(chunk.len(), 1);

        let err = chunk.write_constant(1.0, 1).unwrap_err();
        assert!(matches!(err, ChunkError::LineOutOfOrder { .. }));
        assert!(chunk.constants().is_empty());
    }

    #[test]
    fn test_code_grows_geometrically() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Return, 1).unwrap();
        assert!(chunk.capacity() >= 8);
        for i in 1..100 {
            chunk.write_op(OpCode::Negate, 1 + i / 10).unwrap();
            assert!(chunk.len() <= chunk.capacity());
            assert!(chunk.lines().len() <= chunk.lines_capacity());
        }
        assert_eq!(chunk.len(), 100);
        assert_eq!(chunk.get_line(99), Some(10));
    }

    #[test]
    fn test_line_past_table_rejected() {
        let mut chunk = Chunk::new();
        let err = chunk.write_op(OpCode::Return, usize::MAX).unwrap_err();
        assert_eq!(err, ChunkError::LineTooLarge(usize::MAX));
        assert!(chunk.is_empty());
        assert!(chunk.lines().is_empty());

        assert_eq!(
            chunk.write_constant(1.0, usize::MAX),
            Err(ChunkError::LineTooLarge(usize::MAX))
        );
        assert!(chunk.constants().is_empty());
    }

    #[test]
    fn test_write_constant() {
        let mut chunk = Chunk::new();
        assert_eq!(chunk.add_constant(0.5), 0);
        assert_eq!(chunk.write_constant(1.2, 7), Ok(1));
        assert_eq!(chunk.code(), &[OpCode::Constant as u8, 1]);
        assert_eq!(chunk.get_constant(1), Some(1.2));
        assert_eq!(chunk.get_line(1), Some(7));
    }

    #[test]
    fn test_too_many_constants() {
        let mut chunk = Chunk::new();
        for i in 0..256 {
            chunk.write_constant(i as f64, 1).unwrap();
        }
        assert_eq!(chunk.write_constant(0.0, 1), Err(ChunkError::TooManyConstants));
        assert_eq!(chunk.constants().len(), 256);
    }

    #[test]
    fn test_free_reinitializes() {
        let mut chunk = Chunk::new();
        for line in 1..40 {
            chunk.write_constant(line as f64, line).unwrap();
        }
        chunk.free();
        assert_eq!(chunk, Chunk::new());
        assert_eq!(chunk.capacity(), 0);
        assert_eq!(chunk.lines_capacity(), 0);

        chunk.write_op(OpCode::Return, 1).unwrap();
        assert_eq!(chunk.get_line(0), Some(1));
    }
}
