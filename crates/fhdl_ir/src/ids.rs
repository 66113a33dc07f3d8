//! Opaque IDs and the creation-order sequence key.

use crate::arena::ArenaId;
use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl ArenaId for $name {
            fn from_raw(index: u32) -> Self {
                Self(index)
            }

            fn as_raw(self) -> u32 {
                self.0
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID of a signal in a [`Design`](crate::design::Design).
    SignalId
);

/// Strictly increasing creation-order key shared by signals and specials.
///
/// Every place where iteration order reaches generated text sorts by this
/// key, never by hash order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Sequence(u64);

impl Sequence {
    /// Creates a sequence number from its raw value.
    pub fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    pub fn as_raw(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn id_roundtrip() {
        assert_eq!(SignalId::from_raw(42).as_raw(), 42);
    }

    #[test]
    fn ids_order_by_index() {
        let set: BTreeSet<_> = [3, 1, 2].into_iter().map(SignalId::from_raw).collect();
        let raw: Vec<u32> = set.into_iter().map(SignalId::as_raw).collect();
        assert_eq!(raw, vec![1, 2, 3]);
    }

    #[test]
    fn sequence_orders() {
        assert!(Sequence::from_raw(1) < Sequence::from_raw(2));
    }

    #[test]
    fn id_serde_roundtrip() {
        let id = SignalId::from_raw(9);
        let json = serde_json::to_string(&id).unwrap();
        let back: SignalId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
