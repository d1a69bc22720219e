/// Slots in the VM's evaluation stack.
pub const STACK_MAX: usize = 256;

/// Distinct values a one-byte operand can take.
pub const UINT8_COUNT: usize = u8::MAX as usize + 1;
