//! Session bootstrap
//!
//! Load a source unit, run a conversation over it and persist the result as
//! the next generation. Fatal errors return before anything is written.

use std::path::Path;

use straps_artifact::DeclarationStore;
use straps_engine::{Generation, GenerationWriter};

use crate::dispatch::ActionDispatcher;
use crate::driver::{ConversationDriver, SessionReport};
use crate::error::{SessionError, SessionResult};
use crate::model::ModelClient;
use crate::types::StrapsConfig;

/// A finished and persisted session
#[derive(Debug)]
pub struct SessionOutcome {
    /// Driver report
    pub report: SessionReport,
    /// Written generation
    pub generation: Generation,
}

/// Read and parse a source unit
///
/// # Errors
/// [`SessionError::Load`] if the file cannot be read,
/// [`SessionError::Parse`] if it is not valid source
pub fn load_store(path: &Path) -> SessionResult<DeclarationStore> {
    let source = std::fs::read_to_string(path).map_err(|e| SessionError::load(path, e))?;
    let store = DeclarationStore::parse(&source)?;
    tracing::info!(path = %path.display(), declarations = store.declarations().count(), "source loaded");
    Ok(store)
}

/// Run a full session over `source` and write the next generation
///
/// # Errors
/// Load, parse and model errors abort before any generation is written
pub async fn run_session<M: ModelClient>(
    source: &Path,
    goal: &str,
    client: M,
    config: &StrapsConfig,
) -> SessionResult<SessionOutcome> {
    let mut writer = GenerationWriter::for_source(source)?;
    if let Some(dir) = &config.output_dir {
        writer = writer.with_output_dir(dir);
    }

    let store = load_store(source)?;
    let driver = ConversationDriver::new(
        client,
        ActionDispatcher::from_config(config),
        store,
        goal,
        config,
    );

    tracing::info!(goal, "session started");
    let report = driver.run().await?;
    let generation = writer.write(&report.store)?;

    Ok(SessionOutcome { report, generation })
}
