//! Languages the speech engine can speak, for choosing `language` in the config

use crate::alert::{Alert, AlertKind, AlertSink};
use crate::logging::LogTag;
use crate::speech::engine::AvailabilityTier;
use crate::speech::language::display_language;
use crate::speech::{EngineCoordinator, SpeechEngine};
use log::debug;

/// A language the engine covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageEntry {
    pub code: String,
    pub display_name: String,
}

/// Probe `candidates` against a freshly initialized engine
///
/// Raises `EngineInitFailed` when the engine does not come up and
/// `NoLanguageAvailable` when nothing matched; both return an empty list.
pub fn speakable_languages(
    engine: Box<dyn SpeechEngine>,
    candidates: &[&str],
    alerts: &dyn AlertSink,
    tag: &LogTag,
) -> Vec<LanguageEntry> {
    let mut session = EngineCoordinator::new(engine, tag.clone());

    if session.acquire().is_err() {
        session.release();
        alerts.raise(&Alert::new(AlertKind::EngineInitFailed));
        return Vec::new();
    }

    let entries: Vec<LanguageEntry> = candidates
        .iter()
        .filter(|code| {
            !matches!(
                session.probe_language(code),
                None | Some(AvailabilityTier::MissingData)
                    | Some(AvailabilityTier::NotSupported)
                    | Some(AvailabilityTier::Unknown(_))
            )
        })
        .map(|code| LanguageEntry {
            code: code.to_string(),
            display_name: display_language(code),
        })
        .collect();
    session.release();

    debug!(target: tag.target(), "{} {} of {} languages speakable", tag, entries.len(), candidates.len());
    if entries.is_empty() {
        alerts.raise(&Alert::new(AlertKind::NoLanguageAvailable));
    }
    entries
}
