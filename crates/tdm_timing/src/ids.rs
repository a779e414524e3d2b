//! Opaque ID newtypes for timing graph entities.
//!
//! [`NodeId`] and [`EdgeId`] are thin `u32` wrappers used as arena indices
//! into the [`TimingGraph`](crate::TimingGraph)'s node and edge vectors.

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

            /// Returns the index as `usize` for arena lookups.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a timing node.
    NodeId
);

define_id!(
    /// Opaque, copyable ID for a timing edge.
    EdgeId
);
