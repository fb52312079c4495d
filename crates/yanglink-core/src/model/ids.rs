//! Arena index types.
//!
//! Ids wrap `NonZeroU32` so `Option<Id>` costs nothing extra. They are only
//! meaningful for the [`Schema`](super::Schema) that handed them out.

use core::fmt;
use core::num::NonZeroU32;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $tag:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(NonZeroU32);

        impl $name {
            /// Create from a raw (1-based) value.
            #[must_use]
            pub const fn from_raw(raw: u32) -> Option<Self> {
                match NonZeroU32::new(raw) {
                    Some(n) => Some(Self(n)),
                    None => None,
                }
            }

            /// Create from a 0-based arena index.
            #[must_use]
            pub fn from_index(index: usize) -> Option<Self> {
                let raw = u32::try_from(index).ok()?.checked_add(1)?;
                Self::from_raw(raw)
            }

            /// Get the raw value (1-based).
            #[must_use]
            pub const fn to_raw(self) -> u32 {
                self.0.get()
            }

            /// Get the 0-based arena index.
            #[must_use]
            pub const fn to_index(self) -> usize {
                (self.0.get() - 1) as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($tag, "#{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Schema unit (module or submodule) identifier.
    UnitId,
    "unit"
);

define_id!(
    /// Schema node identifier.
    NodeId,
    "node"
);

define_id!(
    /// Resolvable entity identifier.
    EntityId,
    "entity"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_not_an_id() {
        assert!(UnitId::from_raw(0).is_none());
    }

    #[test]
    fn test_index_round_trip() {
        let id = NodeId::from_index(41).unwrap();
        assert_eq!(id.to_raw(), 42);
        assert_eq!(id.to_index(), 41);
    }

    #[test]
    fn test_display_carries_tag() {
        let id = EntityId::from_index(0).unwrap();
        assert_eq!(format!("{id}"), "entity#1");
    }

    #[test]
    fn test_option_is_niche_packed() {
        assert_eq!(
            core::mem::size_of::<Option<NodeId>>(),
            core::mem::size_of::<NodeId>()
        );
    }
}
