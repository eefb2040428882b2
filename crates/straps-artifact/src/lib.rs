//! straps Artifact
//!
//! Structural representation of a single Python source unit.
//!
//! # Core Concepts
//!
//! - [`DeclarationStore`]: ordered top-level declarations plus verbatim
//!   content, round-trippable back to source text
//! - [`Declaration`]: one named function with signature, docstring and body
//! - [`ContentHash`]: Blake3 fingerprint of serialized source
//!
//! # Example
//!
//! ```rust,ignore
//! use straps_artifact::DeclarationStore;
//!
//! let store = DeclarationStore::parse("def add(a, b):\n    return a + b\n")?;
//! assert_eq!(store.show("add"), Some("def add(a, b):\n    return a + b"));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod declaration;
mod hash;
mod python;
mod store;

pub use declaration::{Declaration, Item, Verbatim};
pub use hash::ContentHash;
pub use python::{dedent, ParseError};
pub use store::{DeclarationStore, StoreError};
