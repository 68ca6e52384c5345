//! Single-slot streaming DMA session.
//!
//! At most one handle can own the device's streaming engine at a time. The
//! session is a thin `Option<HandleId>` plus the device calls that start,
//! continue, and tear it down — every transition (close, seek, disc change,
//! a different handle starting a stream, natural end-of-range, an explicit
//! reset) funnels through [`StreamSession::abort`].

use log::trace;

use crate::device::StreamDevice;
use crate::error::Result;
use crate::handle::HandleId;
use crate::sync::Mutex;

pub struct StreamSession {
    active: Mutex<Option<HandleId>>,
}

impl StreamSession {
    pub const fn new() -> Self {
        StreamSession { active: Mutex::new(None) }
    }

    pub fn is_active_for(&self, id: HandleId) -> bool {
        *self.active.lock() == Some(id)
    }

    pub fn has_active(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Begin a stream for `sector`/`sector_count` and bind it to `id`.
    /// Any stream already active for a different handle is aborted first.
    pub fn start(&self, device: &dyn StreamDevice, id: HandleId, sector: u32, sector_count: u32) -> Result<()> {
        self.abort(device)?;
        device.start(sector, sector_count)?;
        *self.active.lock() = Some(id);
        Ok(())
    }

    /// Tear down the active stream, if any, regardless of which handle owns
    /// it. Idempotent — a no-op when nothing is active.
    pub fn abort(&self, device: &dyn StreamDevice) -> Result<()> {
        let mut active = self.active.lock();
        if let Some(holder) = *active {
            trace!("aborting stream session held by handle {holder}");
            device.stop()?;
            *active = None;
        }
        Ok(())
    }

    /// Tear down the stream only if it currently belongs to `id` (used on
    /// close, where an unrelated handle's stream must be left alone).
    pub fn abort_if_owned_by(&self, device: &dyn StreamDevice, id: HandleId) -> Result<()> {
        if self.is_active_for(id) {
            self.abort(device)?;
        }
        Ok(())
    }
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}
