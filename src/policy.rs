//! Decide whether an incoming batch should be spoken at all
//!
//! Runs before the speech engine is touched, so a rejected batch costs
//! nothing.

use crate::config::Settings;

/// Which rule decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Proceed,
    /// Reading aloud is switched off
    Disabled,
    /// Headphones are required but none are connected
    NoOutputDevice,
    /// A call or recording is using the audio channel
    ChannelBusy,
}

impl Verdict {
    pub fn reason(&self) -> &'static str {
        match self {
            Verdict::Proceed => "proceeding",
            Verdict::Disabled => "reader disabled",
            Verdict::NoOutputDevice => "headphones required but not plugged in",
            Verdict::ChannelBusy => "audio channel busy",
        }
    }
}

/// Apply the rules in order; the first match wins
pub fn evaluate(settings: &Settings, output_device_present: bool, channel_busy: bool) -> Verdict {
    if !settings.enabled {
        return Verdict::Disabled;
    }
    if settings.require_output_device && !output_device_present {
        return Verdict::NoOutputDevice;
    }
    if channel_busy {
        return Verdict::ChannelBusy;
    }
    Verdict::Proceed
}

/// True when the pipeline should go on
pub fn gate(settings: &Settings, output_device_present: bool, channel_busy: bool) -> bool {
    evaluate(settings, output_device_present, channel_busy) == Verdict::Proceed
}
