//! Vblank-driven disc status watcher.
//!
//! Polled once per vblank by the host; deliberately lock-free (it must
//! never block the foreground) and tolerant of a busy device — a status
//! query failing because a CD operation is already in progress just means
//! try again next tick.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use log::warn;

use crate::device::{DiscStatus, StatusDevice};

fn status_code(status: DiscStatus) -> u8 {
    match status {
        DiscStatus::Ready => 0,
        DiscStatus::TrayOpen => 1,
        DiscStatus::NoDisc => 2,
        DiscStatus::Busy => 3,
    }
}

/// Tracks the last observed disc status and whether the mount is still
/// considered current (i.e. doesn't need re-probing before the next open).
pub struct StatusWatcher {
    last_status: AtomicU8,
    mount_current: AtomicBool,
}

impl StatusWatcher {
    pub const fn new() -> Self {
        StatusWatcher {
            // No status observed yet; any real code differs from this on
            // the first tick, forcing the first comparison to "changed".
            last_status: AtomicU8::new(u8::MAX),
            mount_current: AtomicBool::new(false),
        }
    }

    /// Call once per vblank. Swallows a busy/errored status query — the
    /// watcher just tries again on the next tick.
    pub fn on_vblank(&self, device: &dyn StatusDevice) {
        let Ok((status, _disc_type)) = device.status() else {
            return;
        };

        let code = status_code(status);
        let previous = self.last_status.swap(code, Ordering::Relaxed);

        if previous != code && matches!(status, DiscStatus::TrayOpen | DiscStatus::NoDisc) {
            warn!("disc status changed to {:?}; invalidating mount", status);
            self.mount_current.store(false, Ordering::Relaxed);
        }
    }

    pub fn mount_is_current(&self) -> bool {
        self.mount_current.load(Ordering::Relaxed)
    }

    pub fn mark_mount_current(&self) {
        self.mount_current.store(true, Ordering::Relaxed);
    }

    pub fn invalidate_mount(&self) {
        self.mount_current.store(false, Ordering::Relaxed);
    }
}

impl Default for StatusWatcher {
    fn default() -> Self {
        Self::new()
    }
}
