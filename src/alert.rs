//! User-visible failure alerts
//!
//! The pipeline only produces `Alert` values. Presenting them (desktop
//! notification, log line, JSON for another process) is up to the sink.

use log::{debug, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::io::{self, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

/// What went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    EngineInitFailed,
    LanguageMissingData,
    LanguageUnsupported,
    /// The engine cannot speak any candidate language
    NoLanguageAvailable,
}

/// Where the user should go to fix the problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Affordance {
    /// System speech engine settings (install voices, pick an engine)
    OpenSpeechSettings,
    /// This reader's own settings (pick another language)
    OpenReaderSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub display_language: Option<String>,
}

impl Alert {
    pub fn new(kind: AlertKind) -> Self {
        Self {
            kind,
            display_language: None,
        }
    }

    pub fn for_language(kind: AlertKind, display_language: impl Into<String>) -> Self {
        Self {
            kind,
            display_language: Some(display_language.into()),
        }
    }

    pub fn title(&self) -> &'static str {
        match self.kind {
            AlertKind::EngineInitFailed => "Text-to-speech failed to start",
            AlertKind::LanguageMissingData => "Missing speech data",
            AlertKind::LanguageUnsupported => "Language not available",
            AlertKind::NoLanguageAvailable => "No speech language found",
        }
    }

    pub fn message(&self) -> String {
        let language = self.display_language.as_deref().unwrap_or("the selected language");
        match self.kind {
            AlertKind::EngineInitFailed => {
                "Messages cannot be read aloud. Check that a speech engine is installed and configured."
                    .to_string()
            }
            AlertKind::LanguageMissingData => format!(
                "Voice data for {} is not installed. Install it or choose another language.",
                language
            ),
            AlertKind::LanguageUnsupported => format!(
                "The speech engine cannot speak {}. Choose another language.",
                language
            ),
            AlertKind::NoLanguageAvailable => {
                "The speech engine has no usable language. Install a voice to continue.".to_string()
            }
        }
    }

    pub fn affordance(&self) -> Affordance {
        match self.kind {
            AlertKind::LanguageUnsupported => Affordance::OpenReaderSettings,
            _ => Affordance::OpenSpeechSettings,
        }
    }
}

/// Receives alerts; must not block the caller on user interaction
pub trait AlertSink: Send + Sync {
    fn raise(&self, alert: &Alert);
}

/// Writes alerts to the log
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn raise(&self, alert: &Alert) {
        warn!("{}: {} ({:?})", alert.title(), alert.message(), alert.affordance());
    }
}

/// Shows alerts as desktop notifications through `notify-send`
///
/// The caller never waits for the notification process; a background
/// thread reaps it. If it cannot be started the alert is logged instead.
pub struct DesktopAlertSink {
    program: String,
}

impl DesktopAlertSink {
    pub fn new() -> Self {
        Self::with_program("notify-send")
    }

    /// Use `program` in place of `notify-send`
    pub fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    fn settings_hint(affordance: Affordance) -> &'static str {
        match affordance {
            Affordance::OpenSpeechSettings => "Open your system speech settings to fix this.",
            Affordance::OpenReaderSettings => "Edit ~/.msgreader.cfg to choose another language.",
        }
    }
}

impl Default for DesktopAlertSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DesktopAlertSink {
    /// Start the notifier; the returned thread reaps it
    fn notify(&self, alert: &Alert) -> io::Result<JoinHandle<io::Result<ExitStatus>>> {
        let body = format!(
            "{}\n{}",
            alert.message(),
            Self::settings_hint(alert.affordance())
        );

        let mut child = Command::new(&self.program)
            .arg("--urgency=normal")
            .arg("--app-name=msgreader")
            .arg(alert.title())
            .arg(&body)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        Ok(thread::spawn(move || child.wait()))
    }
}

impl AlertSink for DesktopAlertSink {
    fn raise(&self, alert: &Alert) {
        match self.notify(alert) {
            Ok(_) => debug!("Raised desktop alert: {}", alert.title()),
            Err(e) => {
                debug!("{} unavailable: {}", self.program, e);
                LogAlertSink.raise(alert);
            }
        }
    }
}

/// Writes each alert as one JSON line
pub struct JsonAlertSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonAlertSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

#[derive(Serialize)]
struct AlertRecord<'a> {
    #[serde(flatten)]
    alert: &'a Alert,
    title: &'a str,
    message: String,
    affordance: Affordance,
}

impl<W: Write + Send> AlertSink for JsonAlertSink<W> {
    fn raise(&self, alert: &Alert) {
        let record = AlertRecord {
            alert,
            title: alert.title(),
            message: alert.message(),
            affordance: alert.affordance(),
        };

        let mut out = self.out.lock();
        let written = serde_json::to_writer(&mut *out, &record)
            .map_err(io::Error::from)
            .and_then(|_| {
                writeln!(out)?;
                out.flush()
            });
        if let Err(e) = written {
            warn!("Failed to write alert: {}", e);
        }
    }
}
