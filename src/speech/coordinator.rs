//! Engine session lifecycle
//!
//! `EngineCoordinator` owns the single engine session of one invocation and
//! turns the engine's callbacks into blocking calls for the worker:
//!
//! ```text
//! Uninitialized -> Initializing -> Ready -> Speaking -> Ready ... -> Released
//!                              \-> Failed --------------------------/
//! ```
//!
//! Every acquisition and every utterance gets its own one-shot signal.
//! `release` shuts the engine down at most once and also runs on drop.

use super::engine::{AvailabilityTier, InitStatus, SpeechEngine, UtteranceEvent, UtteranceToken};
use super::language::{resolve, LanguageAvailability, LanguageCode};
use super::signal::{oneshot, WaitError};
use crate::logging::LogTag;
use log::{debug, error, info, warn};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Ready,
    Speaking,
    Failed,
    Released,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("speech engine failed to initialize: {0}")]
    InitFailed(String),

    #[error("wait for speech engine was interrupted")]
    WaitInterrupted,

    #[error("utterance failed: {0}")]
    Utterance(String),

    #[error("engine session is {0:?}, expected Ready")]
    NotReady(SessionState),
}

pub struct EngineCoordinator {
    engine: Box<dyn SpeechEngine>,
    state: SessionState,
    init_timeout: Option<Duration>,
    grace_delay: Duration,
    tag: LogTag,
}

impl EngineCoordinator {
    pub fn new(engine: Box<dyn SpeechEngine>, tag: LogTag) -> Self {
        Self {
            engine,
            state: SessionState::Uninitialized,
            init_timeout: None,
            grace_delay: Duration::ZERO,
            tag,
        }
    }

    /// Give up on initialization after `timeout` (None waits forever)
    pub fn with_init_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.init_timeout = timeout;
        self
    }

    /// Pause before each utterance is submitted
    pub fn with_grace_delay(mut self, delay: Duration) -> Self {
        self.grace_delay = delay;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Initialize the engine and block until it reports back
    pub fn acquire(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Uninitialized {
            return Err(SessionError::NotReady(self.state));
        }

        let (trigger, latch) = oneshot();
        self.state = SessionState::Initializing;
        debug!(target: self.tag.target(), "{} initializing speech engine", self.tag);
        self.engine.initialize(trigger);

        match latch.wait_for(self.init_timeout) {
            Ok(InitStatus::Success) => {
                info!(target: self.tag.target(), "{} speech engine ready", self.tag);
                self.state = SessionState::Ready;
                Ok(())
            }
            Ok(InitStatus::Failure(reason)) => {
                warn!(target: self.tag.target(), "{} speech engine init failed: {}", self.tag, reason);
                self.state = SessionState::Failed;
                Err(SessionError::InitFailed(reason))
            }
            Err(WaitError::TimedOut) => {
                warn!(
                    target: self.tag.target(),
                    "{} speech engine did not initialize within {:?}", self.tag, self.init_timeout
                );
                self.state = SessionState::Failed;
                Err(SessionError::InitFailed("timed out".to_string()))
            }
            Err(WaitError::Interrupted) => {
                error!(target: self.tag.target(), "{} interrupted waiting for engine init", self.tag);
                self.state = SessionState::Failed;
                Err(SessionError::WaitInterrupted)
            }
        }
    }

    /// Select `code` on the engine and classify the result
    pub fn select_language(&mut self, code: &str) -> LanguageAvailability {
        match self.tier_for(code, true) {
            Some(tier) => resolve(tier, code, &self.tag),
            None => LanguageAvailability::Unsupported,
        }
    }

    /// Raw coverage of `code`, without selecting it
    pub fn probe_language(&mut self, code: &str) -> Option<AvailabilityTier> {
        self.tier_for(code, false)
    }

    fn tier_for(&mut self, code: &str, select: bool) -> Option<AvailabilityTier> {
        if self.state != SessionState::Ready {
            warn!(target: self.tag.target(), "{} language query in state {:?}", self.tag, self.state);
            return None;
        }
        let Some(parsed) = LanguageCode::parse(code) else {
            warn!(target: self.tag.target(), "{} malformed language code {:?}", self.tag, code);
            return None;
        };

        let tier = if select {
            self.engine.set_language(&parsed)
        } else {
            self.engine.is_language_available(&parsed)
        };
        debug!(target: self.tag.target(), "{} {} -> {:?}", self.tag, parsed, tier);
        Some(tier)
    }

    /// Speak `text` and block until the engine reports it finished
    pub fn speak(&mut self, text: &str) -> Result<(), SessionError> {
        if self.state != SessionState::Ready {
            return Err(SessionError::NotReady(self.state));
        }

        // Let the incoming-message notification sound finish first
        if !self.grace_delay.is_zero() {
            thread::sleep(self.grace_delay);
        }

        let token = UtteranceToken::next();
        let (trigger, latch) = oneshot();

        self.state = SessionState::Speaking;
        debug!(target: self.tag.target(), "{} speaking {} ({} chars)", self.tag, token, text.len());

        if let Err(e) = self.engine.speak(text, token, trigger) {
            error!(target: self.tag.target(), "{} failed to submit {}: {}", self.tag, token, e);
            self.state = SessionState::Ready;
            return Err(SessionError::Utterance(e.to_string()));
        }

        let result = match latch.wait() {
            Ok(UtteranceEvent::Done) => {
                debug!(target: self.tag.target(), "{} {} done", self.tag, token);
                Ok(())
            }
            Ok(UtteranceEvent::Error(reason)) => {
                error!(target: self.tag.target(), "{} {} failed: {}", self.tag, token, reason);
                Err(SessionError::Utterance(reason))
            }
            Err(_) => {
                error!(target: self.tag.target(), "{} interrupted waiting for {}", self.tag, token);
                Err(SessionError::WaitInterrupted)
            }
        };

        self.state = SessionState::Ready;
        result
    }

    /// Shut the engine down; later calls do nothing
    pub fn release(&mut self) {
        if self.state == SessionState::Released {
            return;
        }
        debug!(target: self.tag.target(), "{} releasing speech engine ({:?})", self.tag, self.state);
        self.engine.shutdown();
        self.state = SessionState::Released;
    }
}

impl Drop for EngineCoordinator {
    fn drop(&mut self) {
        self.release();
    }
}
