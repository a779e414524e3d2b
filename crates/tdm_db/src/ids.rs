//! Opaque ID newtypes for resource-model entities.
//!
//! [`InstanceId`], [`NetId`], [`TdmNetId`], [`XdrVarId`], and [`TronconId`]
//! are thin `u32` wrappers used as arena indices into the design and the
//! [`TdmDb`](crate::TdmDb). They are `Copy`, `Hash`, `Ord`, and
//! `Serialize`/`Deserialize`.

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

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for an instance of the input design.
    InstanceId
);

define_id!(
    /// Opaque, copyable ID for a net of the input design.
    NetId
);

define_id!(
    /// Opaque, copyable ID for a decomposed net.
    TdmNetId
);

define_id!(
    /// Opaque, copyable ID for a TDM ratio variable.
    XdrVarId
);

define_id!(
    /// Opaque, copyable ID for an inter-device channel.
    TronconId
);
