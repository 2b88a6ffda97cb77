//! Speech engine boundary, backends and session coordination

pub mod backends;
pub mod coordinator;
pub mod engine;
pub mod language;
pub mod signal;

pub use coordinator::{EngineCoordinator, SessionError, SessionState};
pub use engine::{AvailabilityTier, EngineFactory, InitStatus, SpeechEngine, UtteranceEvent, UtteranceToken};
pub use language::{LanguageAvailability, LanguageCode};

use crate::config::Backend;
use crate::platform::is_wsl;
use backends::espeak::EspeakEngine;
use backends::fallback::FallbackEngine;
use backends::native::NativeEngine;
use log::info;

/// Create a speech engine for the configured backend
///
/// `Auto` builds a fallback chain:
///
/// **WSL:** espeak-ng over the WSLG PulseAudio server, then the tts crate.
///
/// **Everything else:** the tts crate (Speech Dispatcher on Linux,
/// AVFoundation on macOS), then espeak-ng.
///
/// Nothing is initialized here; that happens when the session is acquired.
pub fn create_engine(backend: Backend) -> Box<dyn SpeechEngine> {
    match backend {
        Backend::Native => Box::new(NativeEngine::new()),
        Backend::Espeak => Box::new(EspeakEngine::new()),
        Backend::Auto if is_wsl() => {
            info!("Detected WSL environment");
            Box::new(FallbackEngine::new(vec![
                ("espeak-ng", Box::new(EspeakEngine::new()) as Box<dyn SpeechEngine>),
                ("native", Box::new(NativeEngine::new()) as Box<dyn SpeechEngine>),
            ]))
        }
        Backend::Auto => Box::new(FallbackEngine::new(vec![
            ("native", Box::new(NativeEngine::new()) as Box<dyn SpeechEngine>),
            ("espeak-ng", Box::new(EspeakEngine::new()) as Box<dyn SpeechEngine>),
        ])),
    }
}

/// Engine factory for a fixed backend choice
pub struct BackendFactory(pub Backend);

impl EngineFactory for BackendFactory {
    fn create(&self) -> Box<dyn SpeechEngine> {
        create_engine(self.0)
    }
}
