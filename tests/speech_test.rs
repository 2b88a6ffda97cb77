//! Integration tests for the real speech backends
//!
//! Whether a backend comes up depends on the machine (Speech Dispatcher,
//! espeak-ng, an audio server), so failures to initialize are reported and
//! tolerated. What must hold everywhere is that a session always ends
//! released and never hangs past its init timeout.

use msgreader::config::Backend;
use msgreader::logging::LogTag;
use msgreader::speech::{create_engine, EngineCoordinator, SessionError, SessionState};
use std::time::Duration;

const INIT_TIMEOUT: Duration = Duration::from_secs(10);

fn session(backend: Backend) -> EngineCoordinator {
    EngineCoordinator::new(create_engine(backend), LogTag::new("msgreader-test"))
        .with_init_timeout(Some(INIT_TIMEOUT))
        .with_grace_delay(Duration::ZERO)
}

#[test]
fn test_backends_initialize_or_fail_cleanly() {
    for backend in [Backend::Auto, Backend::Native, Backend::Espeak] {
        let mut session = session(backend);

        match session.acquire() {
            Ok(()) => {
                println!("✓ {:?} backend ready", backend);
                assert_eq!(session.state(), SessionState::Ready);
            }
            Err(e) => {
                // This may fail in CI or environments without speech support
                println!("⚠ {:?} backend unavailable (may be expected): {}", backend, e);
                assert_eq!(session.state(), SessionState::Failed);
            }
        }

        session.release();
        assert_eq!(session.state(), SessionState::Released);
    }
}

#[test]
fn test_language_probe() {
    let mut session = session(Backend::Auto);

    if session.acquire().is_ok() {
        let english = session.probe_language("en");
        println!("English coverage: {:?}", english);
        assert!(english.is_some(), "Probe should answer in the ready state");

        assert_eq!(session.probe_language("not a language"), None);
        println!("✓ Language probe test passed");
    } else {
        println!("⚠ Skipping language probe test (TTS not available)");
    }
}

#[test]
fn test_release_is_idempotent() {
    let mut session = session(Backend::Espeak);
    let _ = session.acquire();

    session.release();
    session.release();
    assert_eq!(session.state(), SessionState::Released);
    assert_eq!(
        session.speak("too late"),
        Err(SessionError::NotReady(SessionState::Released))
    );
}
