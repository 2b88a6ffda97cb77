//! The speech pipeline and the service that runs it
//!
//! One invocation: aggregate fragments, check the policy gate, bring up an
//! engine session, resolve the language, compose and speak the text, release
//! the session. Failures end the invocation here; at most one alert is raised
//! and nothing is retried.

use crate::alert::{Alert, AlertKind, AlertSink};
use crate::config::Settings;
use crate::contacts::{compose, ContactBook};
use crate::keepalive::{KeepAlive, KeepAliveGuard};
use crate::logging::LogTag;
use crate::message::{aggregate, ConsolidatedMessage, Fragment};
use crate::platform::Environment;
use crate::policy::{self, Verdict};
use crate::speech::language::{self, LanguageAvailability};
use crate::speech::{EngineCoordinator, EngineFactory, SessionError};
use crate::Result;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Why an invocation stopped before speaking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Abort {
    EngineInitFailed,
    LanguageMissingData,
    LanguageUnsupported,
    WaitInterrupted,
}

/// How an invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The batch was empty
    NothingToSpeak,
    /// The policy gate said no; nothing user-visible happened
    Rejected(Verdict),
    Spoken,
    /// The engine reported an error for the utterance; logged, not retried
    UtteranceFailed,
    Aborted(Abort),
}

pub struct Pipeline {
    engines: Arc<dyn EngineFactory>,
    environment: Arc<dyn Environment>,
    alerts: Arc<dyn AlertSink>,
    contacts: Arc<dyn ContactBook>,
    tag: LogTag,
}

impl Pipeline {
    pub fn new(
        engines: Arc<dyn EngineFactory>,
        environment: Arc<dyn Environment>,
        alerts: Arc<dyn AlertSink>,
        contacts: Arc<dyn ContactBook>,
    ) -> Self {
        Self {
            engines,
            environment,
            alerts,
            contacts,
            tag: LogTag::default(),
        }
    }

    pub fn with_log_tag(mut self, tag: LogTag) -> Self {
        self.tag = tag;
        self
    }

    /// Run one invocation to completion on the calling thread
    pub fn run(&self, fragments: &[Fragment], settings: &Settings) -> Outcome {
        let tag = self.tag.for_invocation();

        let messages = aggregate(fragments);
        if messages.is_empty() {
            debug!(target: tag.target(), "{} empty batch, nothing to speak", tag);
            return Outcome::NothingToSpeak;
        }
        debug!(
            target: tag.target(),
            "{} {} fragments from {} senders", tag, fragments.len(), messages.len()
        );

        let verdict = policy::evaluate(
            settings,
            self.environment.output_device_present(),
            self.environment.channel_busy(),
        );
        if verdict != Verdict::Proceed {
            info!(target: tag.target(), "{} {} - ignoring message", tag, verdict.reason());
            return Outcome::Rejected(verdict);
        }

        let mut session = EngineCoordinator::new(self.engines.create(), tag.clone())
            .with_init_timeout(settings.init_timeout)
            .with_grace_delay(settings.grace_delay);

        let outcome = self.drive(&mut session, &messages, settings, &tag);
        session.release();

        debug!(target: tag.target(), "{} finished: {:?}", tag, outcome);
        outcome
    }

    fn drive(
        &self,
        session: &mut EngineCoordinator,
        messages: &[ConsolidatedMessage],
        settings: &Settings,
        tag: &LogTag,
    ) -> Outcome {
        match session.acquire() {
            Ok(()) => {}
            Err(SessionError::WaitInterrupted) => return Outcome::Aborted(Abort::WaitInterrupted),
            Err(e) => {
                warn!(target: tag.target(), "{} {}", tag, e);
                self.alerts.raise(&Alert::new(AlertKind::EngineInitFailed));
                return Outcome::Aborted(Abort::EngineInitFailed);
            }
        }

        let availability = session.select_language(&settings.language);
        if let Some(alert) = language::alert_for(availability, &settings.language) {
            warn!(
                target: tag.target(),
                "{} language {} not usable: {:?}", tag, settings.language, availability
            );
            self.alerts.raise(&alert);
            return Outcome::Aborted(match availability {
                LanguageAvailability::MissingData => Abort::LanguageMissingData,
                _ => Abort::LanguageUnsupported,
            });
        }

        let text = compose(messages, self.contacts.as_ref(), settings.announce_sender_only);

        match session.speak(&text) {
            Ok(()) => Outcome::Spoken,
            Err(SessionError::WaitInterrupted) => Outcome::Aborted(Abort::WaitInterrupted),
            Err(e) => {
                error!(target: tag.target(), "{} {}", tag, e);
                Outcome::UtteranceFailed
            }
        }
    }
}

/// Runs each batch on its own worker thread under a keep-alive guard
///
/// Invocations are independent: every batch gets its own engine session.
pub struct ReaderService {
    pipeline: Arc<Pipeline>,
    keep_alive: Arc<dyn KeepAlive>,
}

impl ReaderService {
    pub fn new(pipeline: Pipeline, keep_alive: Arc<dyn KeepAlive>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            keep_alive,
        }
    }

    /// Start processing `batch`; join the handle for the outcome
    ///
    /// The keep-alive is taken before the worker starts and given back when
    /// it ends, whichever way it ends.
    pub fn submit(&self, batch: Vec<Fragment>, settings: Settings) -> Result<JoinHandle<Outcome>> {
        let guard = KeepAliveGuard::acquire(Arc::clone(&self.keep_alive));
        let pipeline = Arc::clone(&self.pipeline);

        let handle = thread::Builder::new()
            .name("msgreader-worker".to_string())
            .spawn(move || {
                let _guard = guard;
                pipeline.run(&batch, &settings)
            })?;
        Ok(handle)
    }
}
