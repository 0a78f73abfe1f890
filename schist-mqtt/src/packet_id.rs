/*
 * Copyright Bret Ambrose. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

/// Hands out MQTT packet identifiers.  Zero is reserved by the protocol and never produced;
/// after 65535 the sequence wraps back to 1.
#[derive(Debug, Default)]
pub(crate) struct PacketIdAllocator {
    last_id: u16,
}

impl PacketIdAllocator {

    pub(crate) fn new() -> Self {
        PacketIdAllocator {
            ..Default::default()
        }
    }

    pub(crate) fn next_id(&mut self) -> u16 {
        self.last_id = self.last_id.wrapping_add(1);
        if self.last_id == 0 {
            self.last_id = 1;
        }

        self.last_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn first_id_is_one() {
        let mut allocator = PacketIdAllocator::new();
        assert_eq!(1, allocator.next_id());
        assert_eq!(2, allocator.next_id());
    }

    #[test]
    fn full_window_is_distinct_and_never_zero() {
        let mut allocator = PacketIdAllocator::new();
        let mut seen = HashSet::new();

        for _ in 0..65535 {
            let id = allocator.next_id();
            assert_ne!(0, id);
            assert!(seen.insert(id));
        }

        assert_eq!(65535, seen.len());
    }

    #[test]
    fn wraps_past_zero() {
        let mut allocator = PacketIdAllocator::new();
        for _ in 0..65534 {
            allocator.next_id();
        }

        assert_eq!(65535, allocator.next_id());
        assert_eq!(1, allocator.next_id());
        assert_eq!(2, allocator.next_id());
    }
}
