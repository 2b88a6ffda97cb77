//! espeak-ng subprocess backend
//!
//! Used where the `tts` crate has nothing to talk to, most notably WSL with
//! WSLG, where PulseAudio is available through /mnt/wslg/PulseServer.
//! Each utterance is one espeak-ng process; a waiter thread turns its exit
//! status into the utterance event.
//!
//! Dependencies:
//! - espeak-ng (install with: sudo apt install espeak-ng)
//! - PulseAudio client libraries (usually pre-installed with WSLG)

use crate::platform::is_wsl;
use crate::speech::engine::{AvailabilityTier, InitStatus, SpeechEngine, UtteranceEvent, UtteranceToken};
use crate::speech::language::LanguageCode;
use crate::speech::signal::Trigger;
use crate::{MsgReaderError, Result};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const WSLG_PULSE_PATH: &str = "/mnt/wslg/PulseServer";
const MBROLA_DATA_DIR: &str = "/usr/share/mbrola";
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Located espeak-ng binary and the audio server it should use
#[derive(Debug, Clone)]
struct Setup {
    espeak_path: String,
    pulse_server: Option<String>,
}

impl Setup {
    fn command(&self) -> Command {
        let mut command = Command::new(&self.espeak_path);
        if let Some(server) = &self.pulse_server {
            command.env("PULSE_SERVER", server);
        }
        command
    }
}

/// espeak-ng backend
pub struct EspeakEngine {
    /// How to run espeak-ng, known once initialization succeeded
    setup: Arc<Mutex<Option<Setup>>>,

    /// Voice passed to `-v`
    voice: String,

    /// Utterance process currently running
    current: Arc<Mutex<Option<Child>>>,
}

impl EspeakEngine {
    pub fn new() -> Self {
        Self {
            setup: Arc::new(Mutex::new(None)),
            voice: "en".to_string(),
            current: Arc::new(Mutex::new(None)),
        }
    }

    /// PulseAudio server to hand to espeak-ng, if it needs one
    ///
    /// An inherited PULSE_SERVER is left alone. On WSLG the server socket is
    /// passed per command; the process environment is never modified.
    fn pulse_server() -> Result<Option<String>> {
        if std::env::var_os("PULSE_SERVER").is_some() {
            debug!("PULSE_SERVER already set via environment");
            return Ok(None);
        }

        if Path::new(WSLG_PULSE_PATH).exists() {
            info!("Auto-detected WSLG PulseAudio server at {}", WSLG_PULSE_PATH);
            return Ok(Some(WSLG_PULSE_PATH.to_string()));
        }

        if is_wsl() {
            warn!("WSLG PulseAudio server not found at {}", WSLG_PULSE_PATH);
            return Err(MsgReaderError::EngineInit(
                "PulseAudio server not found. Install WSLg or set PULSE_SERVER environment variable."
                    .to_string(),
            ));
        }

        // Native Linux: espeak-ng uses the default PulseAudio socket
        Ok(None)
    }

    /// Find espeak-ng executable
    fn find_espeak() -> Result<String> {
        for path in ["espeak-ng", "/usr/bin/espeak-ng"] {
            if let Ok(status) = Command::new(path)
                .arg("--version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
            {
                if status.success() {
                    return Ok(path.to_string());
                }
            }
        }

        Err(MsgReaderError::EngineInit(
            "espeak-ng not found. Install with: sudo apt install espeak-ng".to_string(),
        ))
    }

    fn list_voices(setup: &Setup, code: &LanguageCode) -> Option<String> {
        let output = setup
            .command()
            .arg(format!("--voices={}", code.language()))
            .stderr(Stdio::null())
            .output();

        match output {
            Ok(out) if out.status.success() => Some(String::from_utf8_lossy(&out.stdout).into_owned()),
            Ok(out) => {
                warn!("espeak-ng --voices exited with {}", out.status);
                None
            }
            Err(e) => {
                error!("Failed to run espeak-ng --voices: {}", e);
                None
            }
        }
    }

    /// Kill the running utterance process, if any
    fn cancel_process(&self) {
        if let Some(mut child) = self.current.lock().take() {
            debug!("Killing espeak-ng process");
            match child.kill() {
                Ok(_) => {
                    let _ = child.wait();
                }
                Err(e) => debug!("Failed to kill espeak-ng process: {}", e),
            }
        }
    }
}

impl Default for EspeakEngine {
    fn default() -> Self {
        Self::new()
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

/// Pick the best voice for `code` from `espeak-ng --voices` output
///
/// Returns the voice's language column and its tier. MBROLA voices count
/// only when their data is installed; a language covered by nothing but
/// uninstalled MBROLA voices is `MissingData`.
pub(crate) fn best_voice(
    listing: &str,
    code: &LanguageCode,
    mbrola_installed: impl Fn(&str) -> bool,
) -> (Option<String>, AvailabilityTier) {
    let mut best: Option<(String, AvailabilityTier)> = None;
    let mut missing_data = false;

    // First line is the column header
    for line in listing.lines().skip(1) {
        let columns: Vec<&str> = line.split_whitespace().collect();
        if columns.len() < 5 {
            continue;
        }
        let (language, file) = (columns[1], columns[4]);

        let Some(tier) = LanguageCode::parse(language).and_then(|voice| code.match_tier(&voice)) else {
            continue;
        };

        if let Some(mbrola) = file.strip_prefix("mb/mb-") {
            if !mbrola_installed(mbrola) {
                missing_data = true;
                continue;
            }
        }

        if best.as_ref().map_or(true, |(_, t)| tier_rank(tier) > tier_rank(*t)) {
            best = Some((language.to_string(), tier));
        }
    }

    match best {
        Some((voice, tier)) => (Some(voice), tier),
        None if missing_data => (None, AvailabilityTier::MissingData),
        None => (None, AvailabilityTier::NotSupported),
    }
}

impl SpeechEngine for EspeakEngine {
    fn initialize(&mut self, done: Trigger<InitStatus>) {
        let slot = Arc::clone(&self.setup);
        thread::spawn(move || {
            let found = Self::pulse_server().and_then(|pulse_server| {
                Self::find_espeak().map(|espeak_path| Setup {
                    espeak_path,
                    pulse_server,
                })
            });
            match found {
                Ok(setup) => {
                    debug!("Found espeak-ng at: {}", setup.espeak_path);
                    *slot.lock() = Some(setup);
                    done.fire(InitStatus::Success);
                }
                Err(e) => done.fire(InitStatus::Failure(e.to_string())),
            }
        });
    }

    fn set_language(&mut self, code: &LanguageCode) -> AvailabilityTier {
        let (voice, tier) = self.probe(code);
        if let Some(voice) = voice {
            debug!("Setting voice to {}", voice);
            self.voice = voice;
        }
        tier
    }

    fn is_language_available(&mut self, code: &LanguageCode) -> AvailabilityTier {
        self.probe(code).1
    }

    fn speak(&mut self, text: &str, token: UtteranceToken, event: Trigger<UtteranceEvent>) -> Result<()> {
        let setup = self
            .setup
            .lock()
            .clone()
            .ok_or_else(|| MsgReaderError::Speech("espeak-ng is not initialized".to_string()))?;

        self.cancel_process();

        let child = setup
            .command()
            .arg("-v")
            .arg(&self.voice)
            .arg("--")
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| MsgReaderError::Speech(format!("Failed to start espeak-ng: {}", e)))?;

        debug!("espeak-ng started for {}", token);
        *self.current.lock() = Some(child);

        let current = Arc::clone(&self.current);
        thread::spawn(move || loop {
            let mut slot = current.lock();
            let Some(child) = slot.as_mut() else {
                // Killed by shutdown; dropping the trigger interrupts the waiter
                return;
            };
            match child.try_wait() {
                Ok(Some(status)) => {
                    slot.take();
                    drop(slot);
                    if status.success() {
                        event.fire(UtteranceEvent::Done);
                    } else {
                        event.fire(UtteranceEvent::Error(format!("espeak-ng exited with {}", status)));
                    }
                    return;
                }
                Ok(None) => {
                    drop(slot);
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    slot.take();
                    drop(slot);
                    event.fire(UtteranceEvent::Error(e.to_string()));
                    return;
                }
            }
        });

        Ok(())
    }

    fn shutdown(&mut self) {
        debug!("Shutting down espeak-ng backend");
        self.cancel_process();
        self.setup.lock().take();
    }
}

impl EspeakEngine {
    fn probe(&self, code: &LanguageCode) -> (Option<String>, AvailabilityTier) {
        let Some(setup) = self.setup.lock().clone() else {
            return (None, AvailabilityTier::NotSupported);
        };
        match Self::list_voices(&setup, code) {
            Some(listing) => best_voice(&listing, code, |voice| {
                Path::new(MBROLA_DATA_DIR).join(voice).exists()
            }),
            None => (None, AvailabilityTier::Unknown(-1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  de              --/M      German             gmw/de
 5  en-gb           --/M      English_(Great_Britain) gmw/en
 2  en-us           --/M      English_(America)  gmw/en-US            (en 3)
 5  en-gb-scotland  --/M      English_(Scotland) gmw/en-GB-scotland   (en 4)
 5  fr              --/M      mbrola-fr1         mb/mb-fr1
";

    fn code(s: &str) -> LanguageCode {
        LanguageCode::parse(s).unwrap()
    }

    #[test]
    fn test_exact_voice() {
        let (voice, tier) = best_voice(LISTING, &code("en-US"), |_| false);
        assert_eq!(voice.as_deref(), Some("en-us"));
        assert_eq!(tier, AvailabilityTier::CountryVariant);
    }

    #[test]
    fn test_language_only() {
        let (voice, tier) = best_voice(LISTING, &code("en"), |_| false);
        assert!(voice.is_some());
        assert_eq!(tier, AvailabilityTier::Language);

        let (_, tier) = best_voice(LISTING, &code("de-AT"), |_| false);
        assert_eq!(tier, AvailabilityTier::Language);
    }

    #[test]
    fn test_mbrola_data() {
        let (voice, tier) = best_voice(LISTING, &code("fr"), |_| false);
        assert_eq!(voice, None);
        assert_eq!(tier, AvailabilityTier::MissingData);

        let (voice, tier) = best_voice(LISTING, &code("fr"), |v| v == "fr1");
        assert_eq!(voice.as_deref(), Some("fr"));
        assert_eq!(tier, AvailabilityTier::CountryVariant);
    }

    #[test]
    fn test_unsupported() {
        let (voice, tier) = best_voice(LISTING, &code("ja"), |_| true);
        assert_eq!(voice, None);
        assert_eq!(tier, AvailabilityTier::NotSupported);
        assert_eq!(best_voice("", &code("en"), |_| true).1, AvailabilityTier::NotSupported);
    }

    #[test]
    fn test_create_espeak_engine() {
        let mut engine = EspeakEngine::new();
        let (trigger, latch) = crate::speech::signal::oneshot();
        engine.initialize(trigger);
        match latch.wait() {
            Ok(InitStatus::Success) => println!("✓ espeak-ng backend available"),
            Ok(InitStatus::Failure(e)) => println!("⚠ espeak-ng backend not available: {}", e),
            Err(e) => println!("⚠ espeak-ng init interrupted: {:?}", e),
        }
        engine.shutdown();
    }

    #[test]
    fn test_pulse_server_passed_per_command() {
        let setup = Setup {
            espeak_path: "espeak-ng".to_string(),
            pulse_server: Some(WSLG_PULSE_PATH.to_string()),
        };
        let command = setup.command();
        let envs: Vec<_> = command.get_envs().collect();
        assert_eq!(
            envs,
            vec![(
                std::ffi::OsStr::new("PULSE_SERVER"),
                Some(std::ffi::OsStr::new(WSLG_PULSE_PATH))
            )]
        );

        let plain = Setup {
            pulse_server: None,
            ..setup
        };
        assert_eq!(plain.command().get_envs().count(), 0);
    }
}
