//! Process lifecycle management for external tools
//!
//! Every tool the installer spawns runs in its own process group and is
//! tracked in a global registry. On SIGINT/SIGTERM/SIGHUP outside the critical
//! section the registry terminates the whole group and the installer exits.
//! Inside the critical section (partition table destruction through the final
//! unmount) the signal is recorded and acted on only once the section ends,
//! so a layout is never abandoned halfway through a `gpart` or `zpool` call.

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::HashSet;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

/// Global registry of child process IDs
static CHILD_REGISTRY: OnceLock<Arc<Mutex<ChildRegistry>>> = OnceLock::new();

/// Number of live critical section guards
static CRITICAL_DEPTH: AtomicUsize = AtomicUsize::new(0);

/// Signal received during the critical section, 0 if none
static DEFERRED_SIGNAL: AtomicI32 = AtomicI32::new(0);

/// Registry tracking all spawned tool processes
#[derive(Debug, Default)]
pub struct ChildRegistry {
    pids: HashSet<u32>,
    cleanup_initiated: bool,
}

impl ChildRegistry {
    /// Get or create the global child registry
    pub fn global() -> Arc<Mutex<ChildRegistry>> {
        CHILD_REGISTRY
            .get_or_init(|| Arc::new(Mutex::new(ChildRegistry::default())))
            .clone()
    }

    pub fn register(&mut self, pid: u32) {
        self.pids.insert(pid);
        tracing::debug!("Registered tool process PID {}", pid);
    }

    pub fn unregister(&mut self, pid: u32) {
        self.pids.remove(&pid);
        tracing::debug!("Unregistered tool process PID {}", pid);
    }

    pub fn count(&self) -> usize {
        self.pids.len()
    }

    /// Terminate all tracked process groups.
    /// Sends SIGTERM first, waits up to `grace_period`, then SIGKILL.
    pub fn terminate_all(&mut self, grace_period: Duration) {
        if self.cleanup_initiated {
            return;
        }
        self.cleanup_initiated = true;

        if self.pids.is_empty() {
            return;
        }

        tracing::info!("Terminating {} tool process(es)...", self.pids.len());

        let pids: Vec<u32> = self.pids.iter().copied().collect();
        for &pid in &pids {
            if let Err(e) = send_signal_to_group(pid, Signal::SIGTERM) {
                tracing::warn!("Failed to send SIGTERM to process group {}: {}", pid, e);
                let _ = send_signal(pid, Signal::SIGTERM);
            }
        }

        let start = Instant::now();
        while start.elapsed() < grace_period {
            if pids.iter().all(|&pid| !is_process_alive(pid)) {
                self.pids.clear();
                return;
            }
            std::thread::sleep(Duration::from_millis(100));
        }

        for &pid in &pids {
            if is_process_alive(pid) {
                tracing::warn!("Process group {} did not terminate, sending SIGKILL", pid);
                if send_signal_to_group(pid, Signal::SIGKILL).is_err() {
                    let _ = send_signal(pid, Signal::SIGKILL);
                }
            }
        }

        self.pids.clear();
    }
}

fn send_signal(pid: u32, signal: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(pid as i32), signal)
}

/// Negative PID signals every process in the group
fn send_signal_to_group(pgid: u32, signal: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(-(pgid as i32)), signal)
}

fn is_process_alive(pid: u32) -> bool {
    signal::kill(Pid::from_raw(pid as i32), None).is_ok()
}

/// Scope guard marking the destructive critical section.
///
/// Signals that arrive while a guard is alive are deferred; dropping the guard
/// re-raises the first deferred signal's effect (terminate children, exit).
pub struct CriticalSection {
    _private: (),
}

impl CriticalSection {
    pub fn enter() -> Self {
        CRITICAL_DEPTH.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("Entered critical section");
        Self { _private: () }
    }

    /// Returns true while any guard is alive.
    pub fn is_active() -> bool {
        CRITICAL_DEPTH.load(Ordering::SeqCst) > 0
    }
}

impl Drop for CriticalSection {
    fn drop(&mut self) {
        let remaining = CRITICAL_DEPTH.fetch_sub(1, Ordering::SeqCst) - 1;
        tracing::debug!("Left critical section");
        if remaining > 0 {
            return;
        }

        let deferred = DEFERRED_SIGNAL.swap(0, Ordering::SeqCst);
        if deferred != 0 {
            tracing::warn!("Acting on signal {} deferred during disk writes", deferred);
            shutdown_for_signal(deferred);
        }
    }
}

fn shutdown_for_signal(sig: i32) -> ! {
    if let Ok(mut registry) = ChildRegistry::global().lock() {
        registry.terminate_all(Duration::from_secs(3));
    }
    std::process::exit(128 + sig);
}

/// Initialize global signal handlers. Call once at program start.
pub fn init_signal_handlers() -> Result<(), std::io::Error> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;

    std::thread::spawn(move || {
        for sig in signals.forever() {
            if CriticalSection::is_active() {
                tracing::warn!(
                    "Received signal {} while disks are being rewritten; deferring until the current stage ends",
                    sig
                );
                let _ = DEFERRED_SIGNAL.compare_exchange(0, sig, Ordering::SeqCst, Ordering::SeqCst);
                continue;
            }

            tracing::info!("Received signal {}, cleaning up...", sig);
            shutdown_for_signal(sig);
        }
    });

    Ok(())
}

/// Extension trait for std::process::Command to set up process groups
pub trait CommandProcessGroup {
    /// Run the command as the leader of a new process group.
    fn in_new_process_group(&mut self) -> &mut Self;
}

impl CommandProcessGroup for std::process::Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        self.process_group(0)
    }
}
