//! Link phases.
//!
//! Linking proceeds in five ordered phases:
//!
//! 1. **Registration**: Bind belongs-to, imports and includes
//! 2. **Priority**: Reject dependency cycles and order units
//! 3. **Resolution**: Resolve pending references unit by unit
//! 4. **Uniques**: Resolve `unique` paths against the final trees
//! 5. **Identities**: Record derived identities on their bases

pub mod identities;
pub mod priority;
pub mod registration;
pub mod resolution;
pub mod uniques;

pub use identities::propagate_identities;
pub use priority::order_units;
pub use registration::register_units;
pub use resolution::resolve_units;
pub use uniques::resolve_uniques;
