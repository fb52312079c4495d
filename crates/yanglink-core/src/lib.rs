//! yanglink-core: Cross-module reference linker for YANG schema units
//!
//! This crate binds the name and path references of independently built
//! schema units (modules and submodules) to their definitions. It is
//! designed to be `no_std` compatible and IO-free; parsing and emission
//! live elsewhere.
//!
//! # Features
//!
//! - `std` (default): standard library support for `thiserror`
//! - `serde`: `Serialize` / `Deserialize` on the model and options
//! - `tracing`: `Linker::link_traced` with a caller-provided [`linker::tracing::Tracer`]

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod error;
pub mod linker;
pub mod model;

pub use error::LinkError;
pub use linker::{LinkOptions, LinkSummary, Linker};
pub use model::Schema;
