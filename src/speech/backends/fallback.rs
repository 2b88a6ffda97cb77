//! Backend chain: initialize candidates in order, keep the first that works

use crate::speech::engine::{AvailabilityTier, InitStatus, SpeechEngine, UtteranceEvent, UtteranceToken};
use crate::speech::language::LanguageCode;
use crate::speech::signal::{oneshot, Trigger};
use crate::{MsgReaderError, Result};
use log::info;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;

struct Chain {
    engines: Vec<(&'static str, Box<dyn SpeechEngine>)>,
    active: Option<usize>,
    closed: bool,
}

/// Tries each backend in turn until one initializes
pub struct FallbackEngine {
    chain: Arc<Mutex<Chain>>,
}

impl FallbackEngine {
    pub fn new(engines: Vec<(&'static str, Box<dyn SpeechEngine>)>) -> Self {
        Self {
            chain: Arc::new(Mutex::new(Chain {
                engines,
                active: None,
                closed: false,
            })),
        }
    }

    fn with_active<T>(&self, default: T, f: impl FnOnce(&mut dyn SpeechEngine) -> T) -> T {
        let mut chain = self.chain.lock();
        match chain.active {
            Some(i) => f(chain.engines[i].1.as_mut()),
            None => default,
        }
    }
}

impl SpeechEngine for FallbackEngine {
    fn initialize(&mut self, done: Trigger<InitStatus>) {
        let chain = Arc::clone(&self.chain);

        thread::spawn(move || {
            let count = chain.lock().engines.len();
            let mut tried = Vec::new();

            for i in 0..count {
                let (trigger, latch) = oneshot();
                let name = {
                    let mut chain = chain.lock();
                    if chain.closed {
                        return;
                    }
                    let (name, engine) = &mut chain.engines[i];
                    info!("Trying {} backend...", name);
                    engine.initialize(trigger);
                    *name
                };

                let reason = match latch.wait() {
                    Ok(InitStatus::Success) => {
                        info!("✓ Successfully initialized {} backend", name);
                        let mut chain = chain.lock();
                        if chain.closed {
                            chain.engines[i].1.shutdown();
                            return;
                        }
                        chain.active = Some(i);
                        drop(chain);
                        done.fire(InitStatus::Success);
                        return;
                    }
                    Ok(InitStatus::Failure(reason)) => reason,
                    Err(e) => format!("{:?}", e),
                };

                info!("✗ {} backend unavailable: {}", name, reason);
                chain.lock().engines[i].1.shutdown();
                tried.push(format!("{}: {}", name, reason));
            }

            done.fire(InitStatus::Failure(format!(
                "No speech backend available. Tried:\n{}",
                tried.join("\n")
            )));
        });
    }

    fn set_language(&mut self, code: &LanguageCode) -> AvailabilityTier {
        self.with_active(AvailabilityTier::NotSupported, |e| e.set_language(code))
    }

    fn is_language_available(&mut self, code: &LanguageCode) -> AvailabilityTier {
        self.with_active(AvailabilityTier::NotSupported, |e| e.is_language_available(code))
    }

    fn speak(&mut self, text: &str, token: UtteranceToken, event: Trigger<UtteranceEvent>) -> Result<()> {
        self.with_active(
            Err(MsgReaderError::Speech("no speech backend initialized".to_string())),
            |e| e.speak(text, token, event),
        )
    }

    fn shutdown(&mut self) {
        let mut chain = self.chain.lock();
        chain.closed = true;
        if let Some(i) = chain.active.take() {
            chain.engines[i].1.shutdown();
        }
    }
}
