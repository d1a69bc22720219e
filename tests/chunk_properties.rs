//! Chunk and constant-pool invariants under property testing:
//! 1. Line lookup: every offset resolves to the line it was written under
//! 2. Constant indices: the i-th constant lands at index i
//! 3. Disassembly widths sum to the code length
//! 4. Growth: count never exceeds capacity for code or line table
//! 5. Free: a freed chunk matches a fresh one

use loxvm::{debug::instruction_widths, Chunk, OpCode, ValueArray};
use proptest::prelude::*;

/// Non-decreasing line numbers, one per byte.
fn ascending_lines() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0usize..4, 0..200).prop_map(|steps| {
        let mut line = 1;
        steps
            .into_iter()
            .map(|step| {
                line += step;
                line
            })
            .collect()
    })
}

fn any_op() -> impl Strategy<Value = OpCode> {
    prop_oneof![
        Just(OpCode::Constant),
        Just(OpCode::Add),
        Just(OpCode::Subtract),
        Just(OpCode::Multiply),
        Just(OpCode::Divide),
        Just(OpCode::Negate),
        Just(OpCode::Return),
    ]
}

proptest! {
    #[test]
    fn get_line_recovers_written_line(lines in ascending_lines()) {
        let mut chunk = Chunk::new();
        for (i, &line) in lines.iter().enumerate() {
            chunk.write(i as u8, line).unwrap();
        }
        for (offset, &line) in lines.iter().enumerate() {
            prop_assert_eq!(chunk.get_line(offset), Some(line));
        }
        prop_assert_eq!(chunk.get_line(lines.len()), None);
    }

    #[test]
    fn constants_get_sequential_indices(values in prop::collection::vec(-1e9f64..1e9, 0..300)) {
        let mut pool = ValueArray::new();
        for (i, &value) in values.iter().enumerate() {
            prop_assert_eq!(pool.write(value), i);
        }
        for (i, &value) in values.iter().enumerate() {
            prop_assert_eq!(pool.get(i), Some(value));
        }

        let mut chunk = Chunk::new();
        for (i, &value) in values.iter().enumerate() {
            prop_assert_eq!(chunk.add_constant(value), i);
        }
        prop_assert_eq!(chunk.constants().values(), values.as_slice());
    }

    #[test]
    fn instruction_widths_cover_code(ops in prop::collection::vec(any_op(), 0..100)) {
        let mut chunk = Chunk::new();
        for op in ops {
            if op == OpCode::Constant {
                chunk.write_constant(1.0, 1).unwrap_or(0);
            } else {
                chunk.write_op(op, 1).unwrap();
            }
        }
        prop_assert_eq!(instruction_widths(&chunk).sum::<usize>(), chunk.len());
    }

    #[test]
    fn count_never_exceeds_capacity(lines in ascending_lines()) {
        let mut chunk = Chunk::new();
        for &line in &lines {
            chunk.write(OpCode::Return as u8, line).unwrap();
            prop_assert!(chunk.len() <= chunk.capacity());
            prop_assert!(chunk.lines().len() <= chunk.lines_capacity());
            prop_assert!(chunk.constants().len() <= chunk.constants().capacity());
        }
    }

    #[test]
    fn free_restores_fresh_chunk(lines in ascending_lines()) {
        let mut chunk = Chunk::new();
        for &line in &lines {
            chunk.write_constant(line as f64, line).unwrap_or(0);
        }
        chunk.free();
        let fresh = Chunk::new();
        prop_assert_eq!(chunk.len(), fresh.len());
        prop_assert_eq!(chunk.capacity(), fresh.capacity());
        prop_assert_eq!(chunk.lines_capacity(), fresh.lines_capacity());
        prop_assert_eq!(chunk.constants().capacity(), fresh.constants().capacity());
        prop_assert_eq!(&chunk, &fresh);
    }
}

#[test]
fn decreasing_line_leaves_chunk_untouched() {
    let mut chunk = Chunk::new();
    chunk.write_op(OpCode::Return, 5).unwrap();
    let before = chunk.clone();
    assert!(chunk.write_op(OpCode::Return, 4).is_err());
    assert_eq!(chunk, before);
}
