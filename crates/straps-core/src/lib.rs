//! straps Core - conversational code mutation
//!
//! Drives a language model through a fixed command vocabulary to inspect
//! and edit the functions of a Python source unit:
//! - Parses model turns into validated commands
//! - Dispatches them to the mutation engine
//! - Keeps the transcript and feeds results back to the model
//! - Persists each session as a new generation
//!
//! # Example
//!
//! ```rust,ignore
//! use straps_core::{run_session, OpenAiClient, StrapsConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StrapsConfig::new();
//! let client = OpenAiClient::from_config(&config)?;
//!
//! let outcome = run_session("tool.py".as_ref(), "add a --dry-run flag", client, &config).await?;
//! println!("wrote {}", outcome.generation.path.display());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod command;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod model;
pub mod session;
pub mod types;

pub use command::{describe_commands, parse_turn, Arity, Command, CommandKind, CommandSpec, Turn, COMMANDS};
pub use dispatch::{ActionDispatcher, Outcome};
pub use driver::{ConversationDriver, SessionEnd, SessionReport, TRANSCRIPT_TARGET};
pub use error::{CommandError, ConfigError, ModelError, SessionError, SessionResult};
pub use model::{strip_code_fences, ModelClient, OpenAiClient};
pub use session::{load_store, run_session, SessionOutcome};
pub use types::{Message, QueryParams, Role, StrapsConfig, Transcript, DEFAULT_PERSONA};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
