//! Open-file handle state and registry.
//!
//! A real VFS typically threads an intrusive doubly-linked handle list
//! through caller-owned storage — a primitive this crate doesn't own.
//! Rather than hand-roll an unsafe intrusive list to imitate that shape,
//! handles live in a single `Mutex<Vec<Handle>>`, giving every operation the
//! same "one mutex, whole critical section" discipline a read, seek, or
//! close needs without the extra unsafety.

use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::error::{Error, Result};
use crate::sync::Mutex;

pub type HandleId = u32;

/// Bytes requested in a single DMA-aligned stream transfer.
pub const STREAM_ALIGNMENT: u32 = 32;

/// One open file or directory.
pub struct Handle {
    pub id: HandleId,
    pub first_extent: u32,
    pub is_dir: bool,
    /// Current byte offset into the file/directory.
    pub pos: u32,
    pub size: u32,
    /// Set one-way, true, on a disc change; every operation past that point
    /// fails with [`Error::BadHandle`] until the handle is closed. Set
    /// either directly by the code that observed the failure, or lazily by
    /// [`HandleRegistry::with_handle`] the next time this handle is looked
    /// up, once it notices `epoch` predates the registry's current epoch.
    pub broken: bool,
    /// The registry's epoch at the time this handle was opened. Compared
    /// against [`HandleRegistry`]'s live counter on every lookup.
    epoch: u32,
    /// Byte offset within the directory extent `readdir` last resumed from.
    /// Separate from `pos` so directory iteration state survives `tell`.
    pub readdir_pos: u32,
    /// Leftover bytes from a sub-32-byte stream request that hasn't been
    /// fully drained into a caller buffer yet. `0` means empty.
    pub stream_part: u8,
    pub stream_data: [u8; STREAM_ALIGNMENT as usize],
}

impl Handle {
    pub(crate) fn new(id: HandleId, first_extent: u32, is_dir: bool, size: u32) -> Self {
        Self::with_epoch(id, first_extent, is_dir, size, 0)
    }

    pub(crate) fn with_epoch(id: HandleId, first_extent: u32, is_dir: bool, size: u32, epoch: u32) -> Self {
        Handle {
            id,
            first_extent,
            is_dir,
            pos: 0,
            size,
            broken: false,
            epoch,
            readdir_pos: 0,
            stream_part: 0,
            stream_data: [0u8; STREAM_ALIGNMENT as usize],
        }
    }

    pub fn check_usable(&self) -> Result<()> {
        if self.first_extent == 0 || self.broken {
            return Err(Error::BadHandle);
        }
        Ok(())
    }
}

/// All currently open handles, guarded by a single mutex, plus a lock-free
/// epoch counter used to poison them.
///
/// Lock ordering: the handle mutex is always taken *before* either cache
/// mutex — every method here that needs to touch the cache does so via a
/// caller-supplied closure run while the handle lock is held, not by calling
/// back into the cache module directly. `break_all` is the one exception to
/// "touch a handle, take the mutex": it only bumps `epoch`, so it can be
/// called from anywhere, including from inside a `with_handle` closure that
/// already holds the mutex on the very same call stack — exactly what a
/// disc-changed error surfacing mid-read needs.
pub struct HandleRegistry {
    handles: Mutex<Vec<Handle>>,
    next_id: AtomicU32,
    epoch: AtomicU32,
}

impl HandleRegistry {
    pub const fn new() -> Self {
        HandleRegistry {
            handles: Mutex::new(Vec::new()),
            next_id: AtomicU32::new(1),
            epoch: AtomicU32::new(0),
        }
    }

    pub fn open(&self, first_extent: u32, is_dir: bool, size: u32) -> Result<HandleId> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let epoch = self.epoch.load(Ordering::Relaxed);
        let handle = Handle::with_epoch(id, first_extent, is_dir, size, epoch);
        let mut handles = self.handles.lock();
        handles.push(handle);
        Ok(id)
    }

    pub fn close(&self, id: HandleId) -> Result<Handle> {
        let mut handles = self.handles.lock();
        let pos = handles.iter().position(|h| h.id == id).ok_or(Error::BadHandle)?;
        Ok(handles.swap_remove(pos))
    }

    /// Run `f` with exclusive access to the handle named by `id`, inside the
    /// registry's single critical section. Lazily materializes poisoning
    /// from a prior `break_all` call: a handle opened before the registry's
    /// current epoch is marked broken here, on its first lookup since.
    pub fn with_handle<R>(&self, id: HandleId, f: impl FnOnce(&mut Handle) -> Result<R>) -> Result<R> {
        let mut handles = self.handles.lock();
        let handle = handles.iter_mut().find(|h| h.id == id).ok_or(Error::BadHandle)?;
        if handle.epoch != self.epoch.load(Ordering::Relaxed) {
            handle.broken = true;
        }
        f(handle)
    }

    /// One-way poison every handle opened before this call. Bumps a shared
    /// epoch counter rather than locking the handle table, so it is safe to
    /// call synchronously from any context — including from inside a
    /// `with_handle` closure already holding that lock. A handle opened
    /// after the bump (e.g. once the mount has been reprobed) captures the
    /// new epoch and is unaffected.
    pub fn break_all(&self) {
        self.epoch.fetch_add(1, Ordering::Relaxed);
    }

    /// Whether `id` currently names the handle bound to the streaming
    /// session, used by [`crate::stream::StreamSession`] without re-locking.
    pub fn is_open(&self, id: HandleId) -> bool {
        self.handles.lock().iter().any(|h| h.id == id)
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
