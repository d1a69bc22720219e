/// Growth policy for every growable buffer in the runtime: start at 8 slots,
/// then double.
macro_rules! grow_capacity {
    ($capacity:expr) => {{
        if $capacity < 8 {
            8
        } else {
            $capacity * 2
        }
    }};
}

/// Reserve exactly enough room in `buffer` to reach `capacity` slots.
pub(crate) fn reserve_to<T>(buffer: &mut Vec<T>, capacity: usize) {
    if capacity > buffer.capacity() {
        buffer.reserve_exact(capacity - buffer.len());
    }
}

#[cfg(test)]
mod tests {
    use super::reserve_to;

    #[test]
    fn test_grow_capacity() {
        assert_eq!(grow_capacity!(0), 8);
        assert_eq!(grow_capacity!(7), 8);
        assert_eq!(grow_capacity!(8), 16);
        assert_eq!(grow_capacity!(64), 128);
    }

    #[test]
    fn test_reserve_to() {
        let mut buffer: Vec<u8> = Vec::new();
        reserve_to(&mut buffer, 8);
        assert!(buffer.capacity() >= 8);
        buffer.push(1);
        reserve_to(&mut buffer, 4);
        assert!(buffer.capacity() >= 8);
        assert_eq!(buffer, vec![1]);
    }
}
