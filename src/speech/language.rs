//! Language codes and availability resolution
//!
//! The reader is configured with a code like "en" or "pt-BR". Engines report
//! coverage at several granularities; anything coarser than an exact match
//! is still good enough to speak with.

use super::engine::AvailabilityTier;
use crate::alert::{Alert, AlertKind};
use crate::logging::LogTag;
use log::{debug, error};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;

static CODE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z]{2,3})(?:[-_]([A-Za-z]{2}|[0-9]{3}))?(?:[-_]([A-Za-z0-9]{4,8}))?$")
        .expect("language code pattern is valid")
});

/// A parsed `language[-COUNTRY[-variant]]` code
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LanguageCode {
    language: String,
    country: Option<String>,
    variant: Option<String>,
}

impl LanguageCode {
    /// Parse a code; `_` and `-` are both accepted as separators
    pub fn parse(code: &str) -> Option<Self> {
        let caps = CODE_PATTERN.captures(code.trim())?;
        Some(Self {
            language: caps[1].to_lowercase(),
            country: caps.get(2).map(|m| m.as_str().to_uppercase()),
            variant: caps.get(3).map(|m| m.as_str().to_lowercase()),
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    /// Classify how well a voice tagged `other` covers this code
    ///
    /// Returns None when the languages differ.
    pub fn match_tier(&self, other: &LanguageCode) -> Option<AvailabilityTier> {
        if self.language != other.language {
            return None;
        }
        if self.country != other.country {
            return Some(AvailabilityTier::Language);
        }
        if self.variant != other.variant {
            return Some(AvailabilityTier::Country);
        }
        Some(AvailabilityTier::CountryVariant)
    }

    /// Human readable name, e.g. "German" or "Portuguese (BR)"
    pub fn display_name(&self) -> String {
        let base = LANGUAGE_NAMES
            .get(self.language.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| self.language.clone());
        match &self.country {
            Some(country) => format!("{} ({})", base, country),
            None => base,
        }
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.language)?;
        if let Some(country) = &self.country {
            write!(f, "-{}", country)?;
        }
        if let Some(variant) = &self.variant {
            write!(f, "-{}", variant)?;
        }
        Ok(())
    }
}

/// Display name for a raw configured code, falling back to the code itself
pub fn display_language(code: &str) -> String {
    LanguageCode::parse(code)
        .map(|c| c.display_name())
        .unwrap_or_else(|| code.to_string())
}

/// Availability folded into what the pipeline acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageAvailability {
    Exact,
    /// Language matches but country or variant do not
    Approximate,
    MissingData,
    Unsupported,
}

impl LanguageAvailability {
    pub fn is_speakable(self) -> bool {
        matches!(self, LanguageAvailability::Exact | LanguageAvailability::Approximate)
    }
}

/// Fold a raw engine tier into the four-way availability
pub fn resolve(tier: AvailabilityTier, code: &str, tag: &LogTag) -> LanguageAvailability {
    match tier {
        AvailabilityTier::CountryVariant => {
            debug!(target: tag.target(), "{} exact language match: {}", tag, code);
            LanguageAvailability::Exact
        }
        AvailabilityTier::Country | AvailabilityTier::Language => {
            debug!(target: tag.target(), "{} approximate language match ({:?}): {}", tag, tier, code);
            LanguageAvailability::Approximate
        }
        AvailabilityTier::MissingData => LanguageAvailability::MissingData,
        AvailabilityTier::NotSupported => LanguageAvailability::Unsupported,
        AvailabilityTier::Unknown(raw) => {
            error!(
                target: tag.target(),
                "{} engine returned unknown availability {} for {}", tag, raw, code
            );
            LanguageAvailability::Unsupported
        }
    }
}

/// Alert to raise for an availability, None when speech can proceed
pub fn alert_for(availability: LanguageAvailability, code: &str) -> Option<Alert> {
    let kind = match availability {
        LanguageAvailability::Exact | LanguageAvailability::Approximate => return None,
        LanguageAvailability::MissingData => AlertKind::LanguageMissingData,
        LanguageAvailability::Unsupported => AlertKind::LanguageUnsupported,
    };
    Some(Alert::for_language(kind, display_language(code)))
}

/// Codes probed when listing what the engine can speak
pub const CANDIDATE_LANGUAGES: &[&str] = &[
    "ar", "bg", "ca", "cs", "cy", "da", "de", "el", "en", "eo", "es", "et", "eu", "fa", "fi", "fr",
    "ga", "he", "hi", "hr", "hu", "id", "is", "it", "ja", "ko", "lt", "lv", "mk", "ms", "nb", "nl",
    "pl", "pt", "ro", "ru", "sk", "sl", "sq", "sr", "sv", "sw", "ta", "th", "tr", "uk", "vi", "zh",
];

/// ISO 639 code -> English display name
static LANGUAGE_NAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("ar", "Arabic");
    m.insert("bg", "Bulgarian");
    m.insert("ca", "Catalan");
    m.insert("cs", "Czech");
    m.insert("cy", "Welsh");
    m.insert("da", "Danish");
    m.insert("de", "German");
    m.insert("el", "Greek");
    m.insert("en", "English");
    m.insert("eo", "Esperanto");
    m.insert("es", "Spanish");
    m.insert("et", "Estonian");
    m.insert("eu", "Basque");
    m.insert("fa", "Persian");
    m.insert("fi", "Finnish");
    m.insert("fr", "French");
    m.insert("ga", "Irish");
    m.insert("he", "Hebrew");
    m.insert("hi", "Hindi");
    m.insert("hr", "Croatian");
    m.insert("hu", "Hungarian");
    m.insert("id", "Indonesian");
    m.insert("is", "Icelandic");
    m.insert("it", "Italian");
    m.insert("ja", "Japanese");
    m.insert("ko", "Korean");
    m.insert("lt", "Lithuanian");
    m.insert("lv", "Latvian");
    m.insert("mk", "Macedonian");
    m.insert("ms", "Malay");
    m.insert("nb", "Norwegian Bokmål");
    m.insert("nl", "Dutch");
    m.insert("pl", "Polish");
    m.insert("pt", "Portuguese");
    m.insert("ro", "Romanian");
    m.insert("ru", "Russian");
    m.insert("sk", "Slovak");
    m.insert("sl", "Slovenian");
    m.insert("sq", "Albanian");
    m.insert("sr", "Serbian");
    m.insert("sv", "Swedish");
    m.insert("sw", "Swahili");
    m.insert("ta", "Tamil");
    m.insert("th", "Thai");
    m.insert("tr", "Turkish");
    m.insert("uk", "Ukrainian");
    m.insert("vi", "Vietnamese");
    m.insert("zh", "Chinese");
    m
});
