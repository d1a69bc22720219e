use std::io::{self, Write};

use log::{debug, trace, warn};

use crate::{
    chunk::{Chunk, OpCode},
    constants::STACK_MAX,
    debug::{disassemble_chunk, disassemble_instruction, format_stack},
    value::{format_value, Value},
};

/// Runtime switches for the diagnostic side channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VmConfig {
    /// Print the stack and the next instruction before every step.
    pub trace_execution: bool,
    /// Dump the whole chunk once before running it.
    pub print_bytecode: bool,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeErrorKind {
    #[error("Stack overflow.")]
    StackOverflow,
    #[error("Stack underflow.")]
    StackUnderflow,
    #[error("Unknown opcode {0}.")]
    UnknownOpcode(u8),
    #[error("Missing operand for {0}.")]
    MissingOperand(OpCode),
    #[error("Constant index {0} out of range.")]
    ConstantOutOfRange(u8),
    #[error("Reached end of bytecode without a return.")]
    UnexpectedEnd,
}

/// A checked failure raised while executing a chunk, located at the start
/// offset of the instruction that failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub offset: usize,
    pub line: Option<usize>,
}

impl RuntimeError {
    /// `[line N] in script`, or `None` when the offset has no source line.
    pub fn location(&self) -> Option<String> {
        self.line.map(|line| format!("[line {}] in script", line))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpretResult {
    Ok,
    RuntimeError,
}

impl InterpretResult {
    /// Process exit status for a host, following sysexits.
    pub fn exit_code(self) -> i32 {
        match self {
            InterpretResult::Ok => 0,
            InterpretResult::RuntimeError => 70,
        }
    }
}

impl From<&Result<Value, RuntimeError>> for InterpretResult {
    fn from(result: &Result<Value, RuntimeError>) -> Self {
        match result {
            Ok(_) => InterpretResult::Ok,
            Err(_) => InterpretResult::RuntimeError,
        }
    }
}

pub struct VM<W: Write = io::Stdout> {
    config: VmConfig,
    stack: [Value; STACK_MAX],
    stack_top: usize,
    ip: usize,
    out: W,
}

impl VM<io::Stdout> {
    pub fn new(config: VmConfig) -> Self {
        VM::with_output(config, io::stdout())
    }
}

impl<W: Write> VM<W> {
    /// Build a VM whose diagnostic output and returned-value report go to
    /// `out` instead of stdout.
    pub fn with_output(config: VmConfig, out: W) -> Self {
        VM {
            config,
            stack: [0.0; STACK_MAX],
            stack_top: 0,
            ip: 0,
            out,
        }
    }

    pub fn config(&self) -> VmConfig {
        self.config
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack[..self.stack_top]
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Execute `chunk` from its first byte until `OP_RETURN`, returning the
    /// value it popped.
    pub fn interpret(&mut self, chunk: &Chunk) -> Result<Value, RuntimeError> {
        debug!(
            "interpret: {} code bytes, {} constants",
            chunk.len(),
            chunk.constants().len()
        );
        if self.config.print_bytecode {
            let listing = disassemble_chunk(chunk, "code");
            self.diagnostic(&listing);
        }

        self.ip = 0;
        let result = self.run(chunk);
        match &result {
            Ok(value) => debug!("halted: returned {}", format_value(*value)),
            Err(error) => {
                debug!("halted: {} at offset {}", error, error.offset);
                self.reset_stack();
            }
        }
        result
    }

    fn run(&mut self, chunk: &Chunk) -> Result<Value, RuntimeError> {
        loop {
            if self.config.trace_execution {
                let (instruction, _) = disassemble_instruction(chunk, self.ip);
                let text = format!("{}\n{}\n", format_stack(self.stack()), instruction);
                self.diagnostic(&text);
            }

            let start = self.ip;
            let result = self.step(chunk);
            match result {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => {}
                Err(kind) => {
                    return Err(RuntimeError {
                        kind,
                        offset: start,
                        line: chunk.get_line(start),
                    })
                }
            }
        }
    }

    /// Decode and execute one instruction. `Some` carries the value of a
    /// completed `OP_RETURN`.
    fn step(&mut self, chunk: &Chunk) -> Result<Option<Value>, RuntimeErrorKind> {
        let byte = self.read_byte(chunk).ok_or(RuntimeErrorKind::UnexpectedEnd)?;
        let instruction = OpCode::from_byte(byte).ok_or(RuntimeErrorKind::UnknownOpcode(byte))?;
        trace!("{:04} {}", self.ip - 1, instruction);

        match instruction {
            OpCode::Constant => {
                let constant = self.read_constant(chunk)?;
                self.push(constant)?;
            }
            OpCode::Add => self.binary_op(|a, b| a + b)?,
            OpCode::Subtract => self.binary_op(|a, b| a - b)?,
            OpCode::Multiply => self.binary_op(|a, b| a * b)?,
            OpCode::Divide => self.binary_op(|a, b| a / b)?,
            OpCode::Negate => {
                let value = self.pop()?;
                self.push(-value)?;
            }
            OpCode::Return => {
                let value = self.pop()?;
                let text = format!("{}\n", format_value(value));
                self.diagnostic(&text);
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    fn read_byte(&mut self, chunk: &Chunk) -> Option<u8> {
        let byte = chunk.read_byte(self.ip)?;
        self.ip += 1;
        Some(byte)
    }

    fn read_constant(&mut self, chunk: &Chunk) -> Result<Value, RuntimeErrorKind> {
        let index = self
            .read_byte(chunk)
            .ok_or(RuntimeErrorKind::MissingOperand(OpCode::Constant))?;
        chunk
            .get_constant(index as usize)
            .ok_or(RuntimeErrorKind::ConstantOutOfRange(index))
    }

    // The left operand was pushed first, so it comes off the stack second.
    fn binary_op(&mut self, op: impl Fn(Value, Value) -> Value) -> Result<(), RuntimeErrorKind> {
        if self.stack_top < 2 {
            return Err(RuntimeErrorKind::StackUnderflow);
        }
        let b = self.pop()?;
        let a = self.pop()?;
        self.push(op(a, b))
    }

    fn push(&mut self, value: Value) -> Result<(), RuntimeErrorKind> {
        if self.stack_top >= STACK_MAX {
            return Err(RuntimeErrorKind::StackOverflow);
        }
        self.stack[self.stack_top] = value;
        self.stack_top += 1;
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, RuntimeErrorKind> {
        if self.stack_top == 0 {
            return Err(RuntimeErrorKind::StackUnderflow);
        }
        self.stack_top -= 1;
        Ok(self.stack[self.stack_top])
    }

    fn reset_stack(&mut self) {
        self.stack_top = 0;
    }

    fn diagnostic(&mut self, text: &str) {
        if let Err(error) = self.out.write_all(text.as_bytes()) {
            warn!("diagnostic output failed: {}", error);
        }
    }
}
