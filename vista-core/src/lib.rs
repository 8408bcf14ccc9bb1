//! VISTA Core - View Artifact Types
//!
//! Pure data structures for the view artifact cache. Every other crate
//! depends on this one. No I/O happens here.

mod artifact;
mod config;
mod document;
mod error;
mod identity;

pub use artifact::*;
pub use config::*;
pub use document::*;
pub use error::*;
pub use identity::*;

// ============================================================================
// PROPERTY TESTS
// ============================================================================
