//! Speech engine boundary
//!
//! A speech engine is driven by requests and answers through callbacks:
//! initialization and utterance completion are reported later, from a
//! thread the engine owns. Implementations receive a `Trigger` for each
//! pending answer and must fire it exactly once (or drop it, which the
//! waiting side sees as an interrupted wait).

use super::language::LanguageCode;
use super::signal::Trigger;
use crate::Result;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Result of engine initialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitStatus {
    Success,
    Failure(String),
}

/// How well the engine covers a requested language
///
/// Raw engine classification, before the language resolver folds it into
/// the four tiers the pipeline acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityTier {
    /// Language, country and variant all match
    CountryVariant,
    /// Language and country match, variant does not
    Country,
    /// Only the language matches
    Language,
    /// Supported, but voice data is not installed
    MissingData,
    NotSupported,
    /// Anything the backend could not classify
    Unknown(i32),
}

/// Terminal event for one utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UtteranceEvent {
    Done,
    Error(String),
}

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Correlates an utterance with its completion callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtteranceToken(u64);

impl UtteranceToken {
    pub fn next() -> Self {
        Self(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for UtteranceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "utterance-{}", self.0)
    }
}

/// External speech-synthesis engine
pub trait SpeechEngine: Send {
    /// Start initialization; `done` fires once with the outcome
    fn initialize(&mut self, done: Trigger<InitStatus>);

    /// Select `code` for subsequent utterances and report how well it is covered
    fn set_language(&mut self, code: &LanguageCode) -> AvailabilityTier;

    /// Report coverage of `code` without selecting it
    ///
    /// Defaults to `set_language`. Override when selecting has side effects.
    fn is_language_available(&mut self, code: &LanguageCode) -> AvailabilityTier {
        self.set_language(code)
    }

    /// Queue `text`; `event` fires once when the utterance ends or fails
    ///
    /// An `Err` return means nothing was queued and `event` will not fire.
    fn speak(&mut self, text: &str, token: UtteranceToken, event: Trigger<UtteranceEvent>) -> Result<()>;

    /// Tear down the engine. Must tolerate being called before init finished.
    fn shutdown(&mut self);
}

/// Builds a fresh engine for each invocation
pub trait EngineFactory: Send + Sync {
    fn create(&self) -> Box<dyn SpeechEngine>;
}

impl<F> EngineFactory for F
where
    F: Fn() -> Box<dyn SpeechEngine> + Send + Sync,
{
    fn create(&self) -> Box<dyn SpeechEngine> {
        self()
    }
}
