//! Keep the machine awake while a batch is being spoken

use crate::{MsgReaderError, Result};
use log::{debug, warn};
use parking_lot::Mutex;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;

/// Process-liveness guard
pub trait KeepAlive: Send + Sync {
    fn acquire(&self) -> Result<()>;
    fn release(&self);
}

/// Does nothing
pub struct NoopKeepAlive;

impl KeepAlive for NoopKeepAlive {
    fn acquire(&self) -> Result<()> {
        Ok(())
    }

    fn release(&self) {}
}

/// Holds a `systemd-inhibit` process that blocks sleep and idle
///
/// Reference counted: the inhibitor is started by the first `acquire` and
/// stopped by the matching last `release`, so overlapping batches share it.
pub struct InhibitKeepAlive {
    program: String,
    args: Vec<String>,
    state: Mutex<Inhibitor>,
}

#[derive(Default)]
struct Inhibitor {
    users: usize,
    child: Option<Child>,
}

impl InhibitKeepAlive {
    pub fn new() -> Self {
        Self::with_command(
            "systemd-inhibit",
            [
                "--what=sleep:idle",
                "--who=msgreader",
                "--why=Reading a message aloud",
                "--mode=block",
                "sleep",
                "infinity",
            ],
        )
    }

    /// Hold `program args...` instead of the default inhibitor
    pub fn with_command<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            state: Mutex::new(Inhibitor::default()),
        }
    }

    /// Number of acquisitions not yet released
    pub fn users(&self) -> usize {
        self.state.lock().users
    }

    /// Is the inhibitor process running?
    pub fn is_inhibiting(&self) -> bool {
        match self.state.lock().child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    fn stop(child: &mut Child) {
        debug!("Releasing sleep inhibitor");
        if let Err(e) = child.kill() {
            warn!("Failed to stop sleep inhibitor: {}", e);
        }
        let _ = child.wait();
    }
}

impl Default for InhibitKeepAlive {
    fn default() -> Self {
        Self::new()
    }
}

impl KeepAlive for InhibitKeepAlive {
    fn acquire(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.users == 0 {
            debug!("Acquiring sleep inhibitor");
            let child = Command::new(&self.program)
                .args(&self.args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .map_err(|e| MsgReaderError::KeepAlive(format!("Failed to start {}: {}", self.program, e)))?;
            state.child = Some(child);
        }
        state.users += 1;
        Ok(())
    }

    fn release(&self) {
        let mut state = self.state.lock();
        if state.users == 0 {
            return;
        }
        state.users -= 1;
        if state.users == 0 {
            if let Some(mut child) = state.child.take() {
                Self::stop(&mut child);
            }
        }
    }
}

impl Drop for InhibitKeepAlive {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        state.users = 0;
        if let Some(mut child) = state.child.take() {
            Self::stop(&mut child);
        }
    }
}

/// Pairs one `release` with one successful `acquire`
///
/// Released on drop, so every exit path of the worker (including a panic)
/// gives the keep-alive back.
pub struct KeepAliveGuard {
    keep_alive: Arc<dyn KeepAlive>,
    held: bool,
}

impl KeepAliveGuard {
    /// Acquire; a failure is logged and the batch proceeds without a guard
    pub fn acquire(keep_alive: Arc<dyn KeepAlive>) -> Self {
        let held = match keep_alive.acquire() {
            Ok(()) => true,
            Err(e) => {
                warn!("Keep-alive unavailable: {}", e);
                false
            }
        };
        Self { keep_alive, held }
    }

    pub fn is_held(&self) -> bool {
        self.held
    }
}

impl Drop for KeepAliveGuard {
    fn drop(&mut self) {
        if self.held {
            self.keep_alive.release();
            self.held = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        acquired: AtomicUsize,
        released: AtomicUsize,
        fail: bool,
    }

    impl KeepAlive for Counting {
        fn acquire(&self) -> Result<()> {
            if self.fail {
                return Err(MsgReaderError::KeepAlive("nope".into()));
            }
            self.acquired.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn release(&self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_guard_pairs_release() {
        let counting = Arc::new(Counting::default());
        {
            let guard = KeepAliveGuard::acquire(counting.clone());
            assert!(guard.is_held());
        }
        assert_eq!(counting.acquired.load(Ordering::SeqCst), 1);
        assert_eq!(counting.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_acquire_is_not_released() {
        let counting = Arc::new(Counting {
            fail: true,
            ..Counting::default()
        });
        let guard = KeepAliveGuard::acquire(counting.clone());
        assert!(!guard.is_held());
        drop(guard);
        assert_eq!(counting.released.load(Ordering::SeqCst), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_overlapping_guards_share_inhibitor() {
        let inhibit = Arc::new(InhibitKeepAlive::with_command("sleep", ["30"]));
        let shared: Arc<dyn KeepAlive> = inhibit.clone();

        let first = KeepAliveGuard::acquire(Arc::clone(&shared));
        let second = KeepAliveGuard::acquire(Arc::clone(&shared));
        assert!(first.is_held() && second.is_held());
        assert_eq!(inhibit.users(), 2);
        assert!(inhibit.is_inhibiting());

        drop(first);
        assert_eq!(inhibit.users(), 1);
        assert!(inhibit.is_inhibiting(), "second batch lost its inhibitor");

        drop(second);
        assert_eq!(inhibit.users(), 0);
        assert!(!inhibit.is_inhibiting());

        // A fresh batch starts a new inhibitor
        let third = KeepAliveGuard::acquire(shared);
        assert!(inhibit.is_inhibiting());
        drop(third);
        assert!(!inhibit.is_inhibiting());
    }

    #[test]
    fn test_unstartable_inhibitor_is_not_counted() {
        let inhibit = Arc::new(InhibitKeepAlive::with_command("/nonexistent/inhibit", Vec::<String>::new()));
        let guard = KeepAliveGuard::acquire(inhibit.clone());
        assert!(!guard.is_held());
        assert_eq!(inhibit.users(), 0);
        drop(guard);
        assert_eq!(inhibit.users(), 0);
    }
}
