use std::fmt::Write;

use crate::chunk::{Chunk, OpCode};
use crate::value::{format_value, Value};

pub fn disassemble_chunk(chunk: &Chunk, name: &str) -> String {
    let mut out = format!("== {} ==\n", name);

    let mut offset = 0;
    while offset < chunk.len() {
        let (line, next) = disassemble_instruction(chunk, offset);
        out.push_str(&line);
        out.push('\n');
        offset = next;
    }
    out
}

/// Render the instruction at `offset` and return it along with the offset
/// of the instruction after it.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize) -> (String, usize) {
    let mut out = format!("{:04} ", offset);
    let line = chunk.get_line(offset);
    if offset > 0 && line == chunk.get_line(offset - 1) {
        out.push_str("   | ");
    } else {
        match line {
            Some(line) => {
                let _ = write!(out, "{:4} ", line);
            }
            None => out.push_str("   ? "),
        }
    }

    let Some(byte) = chunk.read_byte(offset) else {
        out.push_str("<end of chunk>");
        return (out, chunk.len());
    };

    let next = match OpCode::from_byte(byte) {
        Some(op @ OpCode::Constant) => constant_instruction(&mut out, op, chunk, offset),
        Some(op) => simple_instruction(&mut out, op, offset),
        None => {
            let _ = write!(out, "Unknown opcode {}", byte);
            offset + 1
        }
    };
    (out, next)
}

fn constant_instruction(out: &mut String, op: OpCode, chunk: &Chunk, offset: usize) -> usize {
    let Some(constant) = chunk.read_byte(offset + 1) else {
        let _ = write!(out, "{:<16} <missing operand>", op.to_string());
        return chunk.len();
    };
    let _ = write!(out, "{:<16} {:4} '", op.to_string(), constant);
    match chunk.get_constant(constant as usize) {
        Some(value) => out.push_str(&format_value(value)),
        None => out.push_str("<bad constant>"),
    }
    out.push('\'');
    offset + op.width()
}

fn simple_instruction(out: &mut String, op: OpCode, offset: usize) -> usize {
    let _ = write!(out, "{}", op);
    offset + op.width()
}

/// The stack line printed ahead of each traced instruction.
pub fn format_stack(values: &[Value]) -> String {
    let mut out = String::from("          ");
    for value in values {
        let _ = write!(out, "[ {} ]", format_value(*value));
    }
    out
}

/// Byte width of each instruction in `chunk`, in code order.
pub fn instruction_widths(chunk: &Chunk) -> impl Iterator<Item = usize> + '_ {
    let mut offset = 0;
    std::iter::from_fn(move || {
        if offset >= chunk.len() {
            return None;
        }
        let (_, next) = disassemble_instruction(chunk, offset);
        let width = next - offset;
        offset = next;
        Some(width)
    })
}
