//! Shared fakes for the integration tests

#![allow(dead_code)]

use msgreader::alert::{Alert, AlertSink};
use msgreader::keepalive::KeepAlive;
use msgreader::speech::signal::Trigger;
use msgreader::speech::{
    AvailabilityTier, EngineFactory, InitStatus, LanguageCode, SpeechEngine, UtteranceEvent, UtteranceToken,
};
use msgreader::Result;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How a scripted engine treats the trigger it is handed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Fire it from another thread shortly after
    Fire,
    /// Drop it without firing
    Drop,
    /// Keep it and never fire
    Hold,
}

/// What a scripted engine answers
#[derive(Clone)]
pub struct Script {
    pub init: InitStatus,
    pub init_delivery: Delivery,
    pub tier: AvailabilityTier,
    pub utterance: UtteranceEvent,
    pub utterance_delivery: Delivery,
    /// Per-language overrides for `is_language_available`
    pub languages: Vec<(&'static str, AvailabilityTier)>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            init: InitStatus::Success,
            init_delivery: Delivery::Fire,
            tier: AvailabilityTier::CountryVariant,
            utterance: UtteranceEvent::Done,
            utterance_delivery: Delivery::Fire,
            languages: Vec::new(),
        }
    }
}

/// Everything the engines built by one factory were asked to do
#[derive(Default)]
pub struct Calls {
    pub created: AtomicUsize,
    pub initialized: AtomicUsize,
    pub shutdowns: AtomicUsize,
    pub spoken: Mutex<Vec<String>>,
    pub languages: Mutex<Vec<String>>,
}

impl Calls {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().clone()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Fake engine that answers from its own threads, like a real one
pub struct ScriptedEngine {
    script: Script,
    calls: Arc<Calls>,
    held_init: Option<Trigger<InitStatus>>,
    held_utterance: Option<Trigger<UtteranceEvent>>,
}

impl ScriptedEngine {
    pub fn new(script: Script, calls: Arc<Calls>) -> Self {
        Self {
            script,
            calls,
            held_init: None,
            held_utterance: None,
        }
    }
}

fn deliver<T: Send + 'static>(delivery: Delivery, trigger: Trigger<T>, value: T, held: &mut Option<Trigger<T>>) {
    match delivery {
        Delivery::Fire => {
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(5));
                trigger.fire(value);
            });
        }
        Delivery::Drop => drop(trigger),
        Delivery::Hold => *held = Some(trigger),
    }
}

impl SpeechEngine for ScriptedEngine {
    fn initialize(&mut self, done: Trigger<InitStatus>) {
        self.calls.initialized.fetch_add(1, Ordering::SeqCst);
        let status = self.script.init.clone();
        deliver(self.script.init_delivery, done, status, &mut self.held_init);
    }

    fn set_language(&mut self, code: &LanguageCode) -> AvailabilityTier {
        self.calls.languages.lock().push(code.to_string());
        self.is_language_available(code)
    }

    fn is_language_available(&mut self, code: &LanguageCode) -> AvailabilityTier {
        let key = code.to_string();
        self.script
            .languages
            .iter()
            .find(|(c, _)| *c == key)
            .map(|(_, tier)| *tier)
            .unwrap_or(self.script.tier)
    }

    fn speak(&mut self, text: &str, _token: UtteranceToken, event: Trigger<UtteranceEvent>) -> Result<()> {
        self.calls.spoken.lock().push(text.to_string());
        let outcome = self.script.utterance.clone();
        deliver(self.script.utterance_delivery, event, outcome, &mut self.held_utterance);
        Ok(())
    }

    fn shutdown(&mut self) {
        self.calls.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// Builds scripted engines and records what they did
pub struct ScriptedFactory {
    pub script: Script,
    pub calls: Arc<Calls>,
}

impl ScriptedFactory {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: Arc::new(Calls::default()),
        })
    }

    pub fn engine(&self) -> Box<dyn SpeechEngine> {
        self.create()
    }
}

impl EngineFactory for ScriptedFactory {
    fn create(&self) -> Box<dyn SpeechEngine> {
        self.calls.created.fetch_add(1, Ordering::SeqCst);
        Box::new(ScriptedEngine::new(self.script.clone(), Arc::clone(&self.calls)))
    }
}

/// Collects raised alerts
#[derive(Default)]
pub struct RecordingAlerts {
    pub alerts: Mutex<Vec<Alert>>,
}

impl RecordingAlerts {
    pub fn raised(&self) -> Vec<Alert> {
        self.alerts.lock().clone()
    }
}

impl AlertSink for RecordingAlerts {
    fn raise(&self, alert: &Alert) {
        self.alerts.lock().push(alert.clone());
    }
}

/// Counts acquire/release pairs
#[derive(Default)]
pub struct CountingKeepAlive {
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
}

impl KeepAlive for CountingKeepAlive {
    fn acquire(&self) -> Result<()> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}
