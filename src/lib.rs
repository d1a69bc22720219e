//! Bytecode chunks and the stack VM that executes them.

#[macro_use]
mod memory;

pub mod chunk;
pub mod constants;
pub mod debug;
pub mod scanner;
pub mod value;
pub mod vm;

pub use chunk::{Chunk, ChunkError, OpCode};
pub use value::{Value, ValueArray};
pub use vm::{InterpretResult, RuntimeError, RuntimeErrorKind, VmConfig, VM};
