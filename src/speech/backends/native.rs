//! Native Rust TTS backend using the tts crate
//!
//! This backend uses the `tts` crate which provides a unified interface to:
//! - Speech Dispatcher on Linux (via native bindings)
//! - AVFoundation on macOS/iOS (via native bindings)
//! - Various other platforms
//!
//! Utterance completion comes from the crate's utterance callbacks where the
//! platform has them, otherwise from polling `is_speaking`.

use crate::speech::engine::{AvailabilityTier, InitStatus, SpeechEngine, UtteranceEvent, UtteranceToken};
use crate::speech::language::LanguageCode;
use crate::speech::signal::{SharedTrigger, Trigger};
use crate::{MsgReaderError, Result};
use log::{debug, error, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tts::{Tts as TtsCrate, UtteranceId, Voice};

const SPEAKING_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Lifecycle of the underlying tts instance
enum Slot {
    /// Initialization thread still running
    Pending,
    Ready(TtsCrate),
    /// Shut down; a late initialization result is discarded
    Closed,
}

/// Which finished utterance the callbacks are waiting for
#[derive(Default)]
struct Correlation {
    /// Id returned by `speak`, once known
    expected: Option<UtteranceId>,
    /// `speak` returned no id, so the next finished utterance is ours
    any: bool,
    /// Utterances that finished before their id was known
    finished: Vec<UtteranceId>,
}

/// Native TTS backend using the tts crate
pub struct NativeEngine {
    tts: Arc<Mutex<Slot>>,
}

impl NativeEngine {
    pub fn new() -> Self {
        Self {
            tts: Arc::new(Mutex::new(Slot::Pending)),
        }
    }

    fn tier_rank(tier: AvailabilityTier) -> u8 {
        match tier {
            AvailabilityTier::CountryVariant => 3,
            AvailabilityTier::Country => 2,
            AvailabilityTier::Language => 1,
            _ => 0,
        }
    }

    /// Best voice for `code` and how well it matches
    fn best_voice(voices: Vec<Voice>, code: &LanguageCode) -> Option<(Voice, AvailabilityTier)> {
        let mut best: Option<(Voice, AvailabilityTier)> = None;
        for voice in voices {
            let tag = voice.language().to_string();
            let Some(tier) = LanguageCode::parse(&tag).and_then(|v| code.match_tier(&v)) else {
                continue;
            };
            if best
                .as_ref()
                .map_or(true, |(_, t)| Self::tier_rank(tier) > Self::tier_rank(*t))
            {
                best = Some((voice, tier));
            }
        }
        best
    }

    fn classify(&self, code: &LanguageCode, select: bool) -> AvailabilityTier {
        let mut slot = self.tts.lock();
        let Slot::Ready(tts) = &mut *slot else {
            warn!("Language query before the TTS engine was ready");
            return AvailabilityTier::NotSupported;
        };

        if !tts.supported_features().voice {
            // No voice selection: whatever the default voice is will be used
            warn!("Voice selection not supported on this platform");
            return AvailabilityTier::Language;
        }

        let voices = match tts.voices() {
            Ok(voices) => voices,
            Err(e) => {
                error!("Failed to get voices: {}", e);
                return AvailabilityTier::Unknown(-1);
            }
        };
        if voices.is_empty() {
            return AvailabilityTier::MissingData;
        }

        match Self::best_voice(voices, code) {
            Some((voice, tier)) => {
                if select {
                    debug!("Selecting voice: {:?}", voice);
                    if let Err(e) = tts.set_voice(&voice) {
                        warn!("Failed to set voice: {}", e);
                    }
                }
                tier
            }
            None => AvailabilityTier::NotSupported,
        }
    }

    /// Register end/stop callbacks that fire `event` for our utterance only
    fn register_callbacks(
        tts: &TtsCrate,
        correlation: &Arc<Mutex<Correlation>>,
        event: &SharedTrigger<UtteranceEvent>,
    ) -> Result<()> {
        let make = |outcome: UtteranceEvent| {
            let correlation = Arc::clone(correlation);
            let event = event.clone();
            Box::new(move |id: UtteranceId| {
                let mut c = correlation.lock();
                if c.any || c.expected == Some(id) {
                    event.fire(outcome.clone());
                } else {
                    c.finished.push(id);
                }
            })
        };

        tts.on_utterance_end(Some(make(UtteranceEvent::Done)))
            .and_then(|_| tts.on_utterance_stop(Some(make(UtteranceEvent::Error("stopped".to_string())))))
            .map_err(|e| MsgReaderError::Speech(format!("Failed to register callbacks: {}", e)))
    }

    /// Fallback when the platform has no utterance callbacks
    fn poll_until_silent(shared: Arc<Mutex<Slot>>, event: Trigger<UtteranceEvent>) {
        thread::spawn(move || loop {
            thread::sleep(SPEAKING_POLL_INTERVAL);
            let mut slot = shared.lock();
            let Slot::Ready(tts) = &mut *slot else {
                event.fire(UtteranceEvent::Error("engine shut down".to_string()));
                return;
            };
            match tts.is_speaking() {
                Ok(true) => continue,
                Ok(false) => {
                    event.fire(UtteranceEvent::Done);
                    return;
                }
                Err(e) => {
                    event.fire(UtteranceEvent::Error(e.to_string()));
                    return;
                }
            }
        });
    }
}

impl Default for NativeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechEngine for NativeEngine {
    fn initialize(&mut self, done: Trigger<InitStatus>) {
        debug!("Creating native TTS backend");
        let slot = Arc::clone(&self.tts);

        thread::spawn(move || {
            let status = match TtsCrate::default() {
                Ok(tts) => {
                    let mut slot = slot.lock();
                    if matches!(*slot, Slot::Closed) {
                        debug!("TTS initialized after shutdown, discarding");
                        drop(tts);
                    } else {
                        *slot = Slot::Ready(tts);
                    }
                    InitStatus::Success
                }
                Err(e) => InitStatus::Failure(format!("Failed to initialize TTS: {}", e)),
            };
            done.fire(status);
        });
    }

    fn set_language(&mut self, code: &LanguageCode) -> AvailabilityTier {
        self.classify(code, true)
    }

    fn is_language_available(&mut self, code: &LanguageCode) -> AvailabilityTier {
        self.classify(code, false)
    }

    fn speak(&mut self, text: &str, token: UtteranceToken, event: Trigger<UtteranceEvent>) -> Result<()> {
        let mut slot = self.tts.lock();
        let Slot::Ready(tts) = &mut *slot else {
            return Err(MsgReaderError::Speech("TTS engine is not ready".to_string()));
        };

        let features = tts.supported_features();
        debug!("Speaking {}: {}", token, text);

        if features.utterance_callbacks {
            let correlation = Arc::new(Mutex::new(Correlation::default()));
            let event = event.shared();
            Self::register_callbacks(tts, &correlation, &event)?;

            let id = tts.speak(text, false).map_err(|e| {
                error!("Failed to speak: {}", e);
                MsgReaderError::Speech(format!("Speak failed: {}", e))
            })?;

            let mut c = correlation.lock();
            match id {
                Some(id) if c.finished.contains(&id) => {
                    event.fire(UtteranceEvent::Done);
                }
                Some(id) => c.expected = Some(id),
                None if !c.finished.is_empty() => {
                    event.fire(UtteranceEvent::Done);
                }
                None => c.any = true,
            }
            return Ok(());
        }

        tts.speak(text, false).map_err(|e| {
            error!("Failed to speak: {}", e);
            MsgReaderError::Speech(format!("Speak failed: {}", e))
        })?;

        if features.is_speaking {
            drop(slot);
            Self::poll_until_silent(Arc::clone(&self.tts), event);
        } else {
            warn!("Platform reports neither utterance callbacks nor speaking state");
            event.fire(UtteranceEvent::Done);
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        debug!("Shutting down native TTS backend");
        let previous = std::mem::replace(&mut *self.tts.lock(), Slot::Closed);
        if let Slot::Ready(tts) = previous {
            if tts.supported_features().utterance_callbacks {
                let _ = tts.on_utterance_end(None);
                let _ = tts.on_utterance_stop(None);
            }
        }
    }
}
