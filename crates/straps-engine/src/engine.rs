//! Mutation engine
//!
//! Implements list/show/create/modify against a [`DeclarationStore`] passed
//! in by the caller. The engine itself holds only configuration and the
//! patch collaborator, so every call is independent.
//!
//! All checks and parses run before the store is touched: a failed command
//! never leaves a partial edit behind.

use serde::{Deserialize, Serialize};
use straps_artifact::{dedent, Declaration, DeclarationStore, Item};

use crate::error::{MutationError, MutationResult};
use crate::patch::PatchApplier;

/// Placeholder shown for declarations without a docstring
pub const NO_DOCUMENTATION: &str = "No documentation.";

/// How `modify` interprets its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModifyStrategy {
    /// Payload is the complete new definition
    #[default]
    Replace,
    /// Payload is a unified diff against the current definition
    Patch,
}

/// What `modify` does when several declarations share the target name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MultiMatch {
    /// Refuse with [`MutationError::AmbiguousName`]
    #[default]
    Reject,
    /// Apply the edit at every matching position
    ReplaceAll,
}

/// Engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Modify strategy
    pub strategy: ModifyStrategy,
    /// Multi-match policy for modify
    pub multi_match: MultiMatch,
    /// Context lines the patch applier may ignore
    pub fuzz: u32,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With modify strategy
    #[inline]
    #[must_use]
    pub fn with_strategy(mut self, strategy: ModifyStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// With multi-match policy
    #[inline]
    #[must_use]
    pub fn with_multi_match(mut self, multi_match: MultiMatch) -> Self {
        self.multi_match = multi_match;
        self
    }

    /// With patch fuzz
    #[inline]
    #[must_use]
    pub fn with_fuzz(mut self, fuzz: u32) -> Self {
        self.fuzz = fuzz;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strategy: ModifyStrategy::Replace,
            multi_match: MultiMatch::Reject,
            fuzz: 3,
        }
    }
}

/// Structural editor for a declaration store
pub struct MutationEngine {
    config: EngineConfig,
    patcher: Box<dyn PatchApplier>,
}

impl std::fmt::Debug for MutationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MutationEngine {
    /// Create engine with a patch collaborator
    #[must_use]
    pub fn new(config: EngineConfig, patcher: impl PatchApplier + 'static) -> Self {
        Self {
            config,
            patcher: Box::new(patcher),
        }
    }

    /// Engine configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Every declaration with its whitespace-normalized docstring
    #[must_use]
    pub fn list(&self, store: &DeclarationStore) -> String {
        let entries: Vec<String> = store
            .list()
            .into_iter()
            .map(|(name, doc)| {
                let doc = doc
                    .map(|d| d.split_whitespace().collect::<Vec<_>>().join(" "))
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| NO_DOCUMENTATION.to_string());
                format!("Function: '{name}'\nDocstring: '{doc}'")
            })
            .collect();

        if entries.is_empty() {
            "No functions defined.".to_string()
        } else {
            entries.join("\n\n")
        }
    }

    /// Canonical text of the first declaration named `name`
    ///
    /// # Errors
    /// [`MutationError::NotFound`] if no declaration matches
    pub fn show(&self, store: &DeclarationStore, name: &str) -> MutationResult<String> {
        store
            .show(name)
            .map(str::to_string)
            .ok_or_else(|| MutationError::NotFound(name.to_string()))
    }

    /// Add a new declaration at the end of the unit
    ///
    /// # Errors
    /// - [`MutationError::DuplicateName`] if `name` already exists
    /// - [`MutationError::InvalidSyntax`] if `payload` is not exactly one
    ///   declaration named `name`
    pub fn create(
        &self,
        store: &mut DeclarationStore,
        name: &str,
        payload: &str,
    ) -> MutationResult<String> {
        if store.contains(name) {
            return Err(MutationError::DuplicateName(name.to_string()));
        }

        let declaration = single_declaration(payload, name)?;
        store.insert(declaration);

        tracing::info!(name, "declaration created");
        Ok(format!("Function '{name}' created"))
    }

    /// Replace an existing declaration, by full body or by patch
    ///
    /// # Errors
    /// - [`MutationError::EmptyPayload`] for a blank payload
    /// - [`MutationError::NotFound`] / [`MutationError::AmbiguousName`] for
    ///   zero or (under [`MultiMatch::Reject`]) several matches
    /// - strategy-specific parse or patch errors
    pub fn modify(
        &self,
        store: &mut DeclarationStore,
        name: &str,
        payload: &str,
    ) -> MutationResult<String> {
        if payload.trim().is_empty() {
            return Err(MutationError::EmptyPayload(name.to_string()));
        }

        let targets = self.targets(store, name)?;

        let replacements: Vec<(usize, Declaration)> = match self.config.strategy {
            ModifyStrategy::Replace => {
                let declaration = replacement_declaration(payload, name)?;
                targets.iter().map(|&i| (i, declaration.clone())).collect()
            }
            ModifyStrategy::Patch => targets
                .iter()
                .map(|&i| self.patched_declaration(store, i, name, payload).map(|d| (i, d)))
                .collect::<MutationResult<_>>()?,
        };

        for (index, declaration) in replacements {
            store.replace_at(index, declaration)?;
        }

        tracing::info!(name, sites = targets.len(), strategy = ?self.config.strategy, "declaration modified");
        if targets.len() == 1 {
            Ok(format!("Function '{name}' modified"))
        } else {
            Ok(format!("Function '{name}' modified at {} sites", targets.len()))
        }
    }

    /// Indices `modify` will rewrite, after applying the multi-match policy
    fn targets(&self, store: &DeclarationStore, name: &str) -> MutationResult<Vec<usize>> {
        let positions = store.positions(name);
        match (positions.len(), self.config.multi_match) {
            (0, _) => Err(MutationError::NotFound(name.to_string())),
            (1, _) | (_, MultiMatch::ReplaceAll) => Ok(positions),
            (count, MultiMatch::Reject) => Err(MutationError::AmbiguousName {
                name: name.to_string(),
                count,
            }),
        }
    }

    fn patched_declaration(
        &self,
        store: &DeclarationStore,
        index: usize,
        name: &str,
        patch: &str,
    ) -> MutationResult<Declaration> {
        let original = store
            .items()
            .nth(index)
            .and_then(Item::as_declaration)
            .ok_or_else(|| MutationError::NotFound(name.to_string()))?;

        let patched = self.patcher.apply(original.text(), patch, self.config.fuzz)?;
        tracing::debug!(name, "patch applied");
        single_declaration(&patched, name)
    }
}

/// Parse `source` as exactly one declaration named `name`
///
/// Comments around the declaration are ignored; any other top-level
/// statement makes the unit invalid.
fn single_declaration(source: &str, name: &str) -> MutationResult<Declaration> {
    let unit = DeclarationStore::parse(&dedent(source))?;

    if let Some(extra) = unit.items().find_map(|item| match item {
        Item::Verbatim(v) if !v.is_comment() => Some(v.kind().to_string()),
        _ => None,
    }) {
        return Err(MutationError::invalid_syntax(format!(
            "expected only a function definition, found `{extra}`"
        )));
    }

    let mut declarations = unit.declarations();
    match (declarations.next(), declarations.next()) {
        (Some(declaration), None) if declaration.name() == name => Ok(declaration.clone().detached()),
        (Some(declaration), None) => Err(MutationError::invalid_syntax(format!(
            "expected a function named '{name}', found '{}'",
            declaration.name()
        ))),
        (None, _) => Err(MutationError::invalid_syntax("no function definition found")),
        (Some(_), Some(_)) => Err(MutationError::invalid_syntax(format!(
            "expected a single function definition, found {}",
            unit.len()
        ))),
    }
}

/// Pick the one definition of `name` from replacement code
fn replacement_declaration(payload: &str, name: &str) -> MutationResult<Declaration> {
    let unit = DeclarationStore::parse(&dedent(payload))?;
    let matches = unit.find(name);
    match matches.as_slice() {
        [declaration] => Ok((*declaration).clone().detached()),
        [] => Err(MutationError::NoDefinitionFound(name.to_string())),
        many => Err(MutationError::TooManyDefinitions {
            name: name.to_string(),
            count: many.len(),
        }),
    }
}
