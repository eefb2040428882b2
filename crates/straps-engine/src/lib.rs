//! straps Engine
//!
//! The mutation side of the loop: structural edits against a
//! [`DeclarationStore`](straps_artifact::DeclarationStore) and persistence of
//! the result.
//!
//! # Architecture
//!
//! ```text
//! command ─→ MutationEngine ─→ DeclarationStore ─→ GenerationWriter ─→ <stem>__<N>.py
//!                 │
//!                 └─→ PatchApplier (patch strategy only)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use straps_engine::{EngineConfig, MutationEngine, SubprocessPatcher};
//!
//! let engine = MutationEngine::new(EngineConfig::new(), SubprocessPatcher::default());
//! let reply = engine.create(&mut store, "sub", "def sub(a, b):\n    return a - b\n")?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod engine;
pub mod error;
pub mod generation;
pub mod patch;

pub use engine::{EngineConfig, ModifyStrategy, MultiMatch, MutationEngine, NO_DOCUMENTATION};
pub use error::{MutationError, MutationResult};
pub use generation::{generation_number, Generation, GenerationError, GenerationWriter};
pub use patch::{PatchApplier, PatchError, SubprocessPatcher};
