//! Conversation driver
//!
//! ```text
//! INIT ─→ AWAIT_MODEL ─→ DISPATCH ─→ APPEND ─┐
//!              ▲                             │
//!              └─────────────────────────────┘
//!         DISPATCH ─(exit)─→ TERMINAL
//! ```
//!
//! The driver owns the store and the transcript for one session and hands
//! both back in the [`SessionReport`].

use std::time::Duration;

use straps_artifact::{ContentHash, DeclarationStore};

use crate::command::{describe_commands, Command};
use crate::dispatch::{ActionDispatcher, Outcome};
use crate::error::ModelError;
use crate::model::{strip_code_fences, ModelClient};
use crate::types::{Message, QueryParams, StrapsConfig, Transcript};

/// Target for transcript messages sent to the model
pub const TRANSCRIPT_TARGET: &str = "straps::transcript";

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Model issued `exit` with this message
    Exit(String),
    /// Turn limit reached
    TurnLimit(usize),
}

impl SessionEnd {
    /// Message for the user
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            SessionEnd::Exit(message) => message.clone(),
            SessionEnd::TurnLimit(turns) => format!("turn limit reached after {turns} turns"),
        }
    }
}

/// Everything a finished session produced
#[derive(Debug)]
pub struct SessionReport {
    /// How the session ended
    pub end: SessionEnd,
    /// Final store
    pub store: DeclarationStore,
    /// Full transcript
    pub transcript: Transcript,
    /// Model replies received
    pub turns: usize,
    /// Whether the serialized store differs from the loaded one
    pub changed: bool,
}

enum State {
    AwaitModel,
    Dispatch(String),
    Append(String),
    Terminal(SessionEnd),
}

/// Drives one session between a model and a store
pub struct ConversationDriver<M> {
    client: M,
    dispatcher: ActionDispatcher,
    store: DeclarationStore,
    transcript: Transcript,
    params: QueryParams,
    max_turns: Option<usize>,
    timeout: Option<Duration>,
    initial: ContentHash,
}

impl<M> std::fmt::Debug for ConversationDriver<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationDriver")
            .field("dispatcher", &self.dispatcher)
            .field("messages", &self.transcript.len())
            .field("max_turns", &self.max_turns)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<M: ModelClient> ConversationDriver<M> {
    /// Seed a session for `goal`
    ///
    /// The transcript starts with the system instruction, an assistant
    /// `list` turn and the result of running that `list`.
    pub fn new(
        client: M,
        dispatcher: ActionDispatcher,
        mut store: DeclarationStore,
        goal: &str,
        config: &StrapsConfig,
    ) -> Self {
        let initial = store.fingerprint();
        let strategy = dispatcher.engine().config().strategy;

        let instruction = format!(
            "{}\nHere is your goal : {goal}\nYou have access to a shell with the following commands : \n{}\n\nAlways answer with a valid command.",
            config.persona,
            describe_commands(strategy),
        );
        let listing = match dispatcher.dispatch(&mut store, Command::List) {
            Outcome::Reply(text) | Outcome::Exit(text) => text,
        };

        let transcript = [
            Message::system(instruction),
            Message::assistant("list"),
            Message::user(listing),
        ]
        .into_iter()
        .collect();

        Self {
            client,
            dispatcher,
            store,
            transcript,
            params: config.query_params(),
            max_turns: config.max_turns,
            timeout: config.request_timeout(),
            initial,
        }
    }

    /// Transcript so far
    #[inline]
    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Current store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &DeclarationStore {
        &self.store
    }

    /// Run until `exit` or the turn limit
    ///
    /// # Errors
    /// Any [`ModelError`]; the store is handed back only on success
    pub async fn run(mut self) -> Result<SessionReport, ModelError> {
        let mut turns = 0;
        let mut state = State::AwaitModel;

        let end = loop {
            state = match state {
                State::AwaitModel => {
                    if self.max_turns.is_some_and(|limit| turns >= limit) {
                        State::Terminal(SessionEnd::TurnLimit(turns))
                    } else {
                        let reply = self.query().await?;
                        turns += 1;
                        let text = strip_code_fences(reply.content());
                        self.transcript.push(Message::assistant(text.clone()));
                        State::Dispatch(text)
                    }
                }
                State::Dispatch(text) => {
                    match self.dispatcher.dispatch_text(&mut self.store, &text) {
                        None => {
                            tracing::debug!(turn = turns, "blank reply, nothing dispatched");
                            State::AwaitModel
                        }
                        Some(Outcome::Exit(message)) => State::Terminal(SessionEnd::Exit(message)),
                        Some(Outcome::Reply(result)) => State::Append(result),
                    }
                }
                State::Append(result) => {
                    self.transcript.push(Message::user(result));
                    State::AwaitModel
                }
                State::Terminal(end) => break end,
            };
        };

        let changed = self.store.fingerprint() != self.initial;
        tracing::info!(turns, changed, end = ?end, "session finished");

        Ok(SessionReport {
            end,
            store: self.store,
            transcript: self.transcript,
            turns,
            changed,
        })
    }

    async fn query(&self) -> Result<Message, ModelError> {
        for message in self.transcript.messages() {
            tracing::debug!(
                target: TRANSCRIPT_TARGET,
                role = message.role().as_str(),
                "{}",
                message.content()
            );
        }

        let request = self.client.query(&self.transcript, &self.params);
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .map_err(|_| ModelError::Timeout {
                    secs: limit.as_secs(),
                })?,
            None => request.await,
        }
    }
}
