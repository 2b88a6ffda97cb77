//! Platform detection and environment signals

use log::debug;
use std::fs;
use std::process::{Command, Stdio};

/// Environment signals read once per batch, at gate time
pub trait Environment: Send + Sync {
    /// Headphones, headset or a bluetooth audio device are connected
    fn output_device_present(&self) -> bool;

    /// A call or recording is using the audio channel
    fn channel_busy(&self) -> bool;
}

/// Fixed answers, e.g. when the caller already knows the device state
#[derive(Debug, Clone, Copy)]
pub struct StaticEnvironment {
    pub output_device_present: bool,
    pub channel_busy: bool,
}

impl Environment for StaticEnvironment {
    fn output_device_present(&self) -> bool {
        self.output_device_present
    }

    fn channel_busy(&self) -> bool {
        self.channel_busy
    }
}

/// Reads signals from PulseAudio through `pactl`
///
/// Without `pactl` no output device is reported and the channel is idle.
pub struct SystemEnvironment {
    pactl: String,
}

impl SystemEnvironment {
    pub fn new() -> Self {
        Self {
            pactl: "pactl".to_string(),
        }
    }

    fn pactl(&self, args: &[&str]) -> Option<String> {
        let output = Command::new(&self.pactl)
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();

        match output {
            Ok(out) if out.status.success() => Some(String::from_utf8_lossy(&out.stdout).into_owned()),
            Ok(out) => {
                debug!("pactl {:?} exited with {}", args, out.status);
                None
            }
            Err(e) => {
                debug!("pactl unavailable: {}", e);
                None
            }
        }
    }
}

impl Default for SystemEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SystemEnvironment {
    fn output_device_present(&self) -> bool {
        self.pactl(&["get-default-sink"])
            .map(|sink| is_personal_sink(&sink))
            .unwrap_or(false)
    }

    fn channel_busy(&self) -> bool {
        self.pactl(&["list", "short", "source-outputs"])
            .map(|streams| streams.lines().any(|l| !l.trim().is_empty()))
            .unwrap_or(false)
    }
}

/// Does a PulseAudio sink name look like headphones or a headset?
///
/// Bluetooth sinks are assumed to be headsets.
pub fn is_personal_sink(sink: &str) -> bool {
    let sink = sink.trim().to_lowercase();
    ["bluez", "headphone", "headset", "earphone"]
        .iter()
        .any(|marker| sink.contains(marker))
}

/// Detect if running in WSL (Windows Subsystem for Linux)
///
/// Checks for WSL-specific indicators in /proc/version and environment variables.
pub fn is_wsl() -> bool {
    if let Ok(contents) = fs::read_to_string("/proc/version") {
        let lower = contents.to_lowercase();
        if lower.contains("microsoft") || lower.contains("wsl") {
            return true;
        }
    }

    std::env::var("WSL_DISTRO_NAME").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_wsl() {
        // Result depends on the platform; just make sure it doesn't panic
        let _ = is_wsl();
    }

    #[test]
    fn test_personal_sinks() {
        assert!(is_personal_sink("bluez_output.00_1B_66_AA_BB_CC.1\n"));
        assert!(is_personal_sink("alsa_output.usb-Logitech_USB_Headset-00.analog-stereo"));
        assert!(is_personal_sink("alsa_output.pci-0000_00_1f.3.analog-stereo.Headphones"));
        assert!(!is_personal_sink("alsa_output.pci-0000_00_1f.3.analog-stereo"));
        assert!(!is_personal_sink(""));
    }

    #[test]
    fn test_missing_pactl() {
        let env = SystemEnvironment {
            pactl: "/nonexistent/pactl".to_string(),
        };
        assert!(!env.output_device_present());
        assert!(!env.channel_busy());
    }
}
