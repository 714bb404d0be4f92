//! Session manager: lifecycle of the single headless engine process
//!
//! One live session at most per manager. Launch is lazy, warmup runs once
//! per launch, and the session is recycled when acquisition fails or when
//! the engine process grows past the memory limit after a capture.

use crate::error::{Error, Result};
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, info, warn};
use std::ffi::OsStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Recycle the engine once its resident memory exceeds this after a capture.
pub const DEFAULT_MEMORY_LIMIT_BYTES: u64 = 200 * 1024 * 1024;

/// Hardened argument set: throttling off so background tabs keep painting,
/// GPU rasterization on for emoji and font fidelity.
const ENGINE_ARGS: &[&str] = &[
    "--disable-dev-shm-usage",
    "--no-first-run",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-renderer-backgrounding",
    "--disable-extensions",
    "--disable-default-apps",
    "--disable-sync",
    "--disable-translate",
    "--hide-scrollbars",
    "--mute-audio",
    "--no-default-browser-check",
    "--no-pings",
    "--memory-pressure-off",
    "--enable-font-antialiasing",
    "--font-render-hinting=none",
    "--enable-gpu-rasterization",
];

struct Session {
    browser: Browser,
    id: u64,
}

/// Cloneable handle to the live session. The id is stable for the lifetime
/// of the underlying engine process, so callers can observe session reuse.
#[derive(Clone)]
pub struct SessionHandle {
    pub(crate) browser: Browser,
    id: u64,
}

impl SessionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Owns the one engine session and serializes its lifecycle transitions.
pub struct SessionManager {
    // Acquisition critical section: concurrent acquires converge on at most
    // one underlying launch.
    slot: Mutex<Option<Session>>,
    next_id: AtomicU64,
    memory_limit_bytes: u64,
}

impl SessionManager {
    pub fn new(memory_limit_bytes: u64) -> Self {
        Self {
            slot: Mutex::new(None),
            next_id: AtomicU64::new(1),
            memory_limit_bytes,
        }
    }

    /// Return the live session, launching one if absent. A launch failure is
    /// retried exactly once before surfacing `SessionAcquire`.
    pub fn acquire(&self) -> Result<SessionHandle> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(session) = slot.as_ref() {
            return Ok(SessionHandle {
                browser: session.browser.clone(),
                id: session.id,
            });
        }

        let session = match self.launch() {
            Ok(s) => s,
            Err(first) => {
                warn!("engine launch failed, retrying once: {first}");
                self.launch()
                    .map_err(|second| Error::SessionAcquire(second.to_string()))?
            }
        };
        let handle = SessionHandle {
            browser: session.browser.clone(),
            id: session.id,
        };
        *slot = Some(session);
        Ok(handle)
    }

    fn launch(&self) -> Result<Session> {
        let args: Vec<&OsStr> = ENGINE_ARGS.iter().map(OsStr::new).collect();
        let options = LaunchOptions::default_builder()
            .headless(true)
            // Sandboxing disabled for container compatibility.
            .sandbox(false)
            .args(args)
            .idle_browser_timeout(Duration::from_secs(600))
            .build()
            .map_err(|e| Error::SessionLaunch(format!("failed to build launch options: {e}")))?;

        let browser = Browser::new(options)
            .map_err(|e| Error::SessionLaunch(format!("failed to launch engine: {e}")))?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        // One-time warmup: load a trivial blank document and discard it.
        // Speeds up the first real capture; a warmup failure is not fatal.
        match browser.new_tab() {
            Ok(tab) => {
                if let Err(e) = tab
                    .navigate_to("about:blank")
                    .and_then(|t| t.wait_until_navigated())
                {
                    warn!("warmup navigation failed: {e}");
                }
                if let Err(e) = tab.close(true) {
                    debug!("warmup tab close failed: {e}");
                }
            }
            Err(e) => warn!("warmup pass failed: {e}"),
        }

        info!("rendering engine session {id} ready");
        Ok(Session { browser, id })
    }

    /// Destroy the current session if any. Idempotent; repeated calls (for
    /// example from multiple termination signals) are no-ops.
    pub fn recycle(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(session) = slot.take() {
            info!("recycling rendering engine session {}", session.id);
            drop(session);
        }
    }

    /// Post-capture memory check. Runs only between captures so recycling
    /// never tears a session out from under an in-flight capture, and only
    /// when the session still reports a live engine process.
    pub fn maybe_recycle(&self) {
        let should_recycle = {
            let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
            let Some(session) = slot.as_ref() else {
                return;
            };
            let Some(pid) = session.browser.get_process_id() else {
                return;
            };
            match resident_memory_bytes(pid) {
                Some(rss) if rss > self.memory_limit_bytes => {
                    info!(
                        "engine memory {}MiB over limit, recycling session {}",
                        rss / (1024 * 1024),
                        session.id
                    );
                    true
                }
                _ => false,
            }
        };
        if should_recycle {
            self.recycle();
        }
    }

    /// Teardown hook for the process's signal-handling collaborator.
    pub fn shutdown(&self) {
        self.recycle();
    }
}

/// Resident set size of a process, if the platform exposes it.
#[cfg(target_os = "linux")]
fn resident_memory_bytes(pid: u32) -> Option<u64> {
    let status = std::fs::read_to_string(format!("/proc/{pid}/status")).ok()?;
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb * 1024)
}

#[cfg(not(target_os = "linux"))]
fn resident_memory_bytes(_pid: u32) -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recycle_without_session_is_noop() {
        let manager = SessionManager::new(DEFAULT_MEMORY_LIMIT_BYTES);
        manager.recycle();
        manager.recycle();
        manager.shutdown();
    }

    #[test]
    fn test_maybe_recycle_without_session_is_noop() {
        let manager = SessionManager::new(0);
        manager.maybe_recycle();
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_resident_memory_of_own_process() {
        let rss = resident_memory_bytes(std::process::id()).expect("own VmRSS readable");
        assert!(rss > 0);
    }
}
