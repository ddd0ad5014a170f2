//! This module contains the stateless byte-level kernels used by the routing
//! core, and the reference successors built on top of them.
//!
//! Each kernel is a pure function over byte slices. None of them know about
//! clusters or tags.

pub mod leb128;
pub mod store;
pub mod zstd;

pub use store::StoreSuccessor;
pub use zstd::ZstdSuccessor;
