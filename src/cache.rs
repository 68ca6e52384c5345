//! Two-tier LRU sector cache.
//!
//! Two independent 16-entry queues — one for inode-metadata sectors
//! (volume descriptors, directory extents), one for file data sectors —
//! each backed by a fixed array of owned, 32-byte-aligned buffers that is
//! never freed or reallocated after construction. A hit promotes its slot
//! to the most-recently-used position by rotation; a miss evicts the first
//! empty slot, or position 0 if the queue is full.

use log::error;

use crate::device::{BlockDevice, SECTOR_SIZE};
use crate::error::{Error, Result};
use crate::sync::Mutex;

/// Number of resident sectors per queue — exactly 16, no more, no less.
pub const CACHE_LINES: usize = 16;

/// A 2048-byte sector buffer, aligned for DMA.
#[repr(align(32))]
#[derive(Clone, Copy)]
pub struct SectorBuf(pub [u8; SECTOR_SIZE]);

impl SectorBuf {
    const fn zeroed() -> Self {
        SectorBuf([0u8; SECTOR_SIZE])
    }
}

#[derive(Clone, Copy)]
struct CacheLine {
    /// `None` is the empty sentinel; otherwise the resident sector number.
    sector: Option<u32>,
    buf: SectorBuf,
}

impl CacheLine {
    const fn empty() -> Self {
        CacheLine {
            sector: None,
            buf: SectorBuf::zeroed(),
        }
    }
}

struct Queue {
    lines: [CacheLine; CACHE_LINES],
}

impl Queue {
    const fn new() -> Self {
        Queue {
            lines: [CacheLine::empty(); CACHE_LINES],
        }
    }

    /// Rotate the hit at `pos` into position `CACHE_LINES - 1`, shifting the
    /// intervening entries down by one. Relative order of all other entries
    /// is preserved.
    fn promote(&mut self, pos: usize) {
        let hit = self.lines[pos];
        for i in pos..CACHE_LINES - 1 {
            self.lines[i] = self.lines[i + 1];
        }
        self.lines[CACHE_LINES - 1] = hit;
    }

    fn find(&self, sector: u32) -> Option<usize> {
        // Scan MRU-first; either direction finds the unique hit, but the
        // most recently promoted slot is the likeliest match.
        (0..CACHE_LINES).rev().find(|&p| self.lines[p].sector == Some(sector))
    }

    /// Index to use for a miss: first empty slot, else position 0 (LRU).
    fn victim(&self) -> usize {
        self.lines
            .iter()
            .position(|l| l.sector.is_none())
            .unwrap_or(0)
    }

    fn clear(&mut self) {
        for line in &mut self.lines {
            *line = CacheLine::empty();
        }
    }
}

/// One LRU queue (inode or data). Lookup and promotion on a hit run as one
/// critical section; on a miss the lock is released before the device is
/// asked for the sector (the call may block, and — on a disc-changed
/// error — the reinit hook it triggers may need to reach back into this
/// same cache to clear it), then reacquired to insert the result. An
/// access promotes its slot exactly once, never more.
pub struct SectorCache {
    queue: Mutex<Queue>,
}

impl SectorCache {
    pub const fn new() -> Self {
        SectorCache {
            queue: Mutex::new(Queue::new()),
        }
    }

    /// Read `sector` (a *logical* sector number; this function adds
    /// `lead_in_offset` before talking to the device) through the cache.
    ///
    /// `before_miss_read` runs exactly once, only on a genuine miss, right
    /// before the device is asked for the sector — callers reading through
    /// the inode-cache instance pass a closure that aborts any active
    /// stream session, since a metadata read cannot proceed while a stream
    /// is pulling data off the same device; callers reading through the
    /// data-cache instance pass a no-op.
    ///
    /// `on_disc_changed` runs exactly once, synchronously, in place of the
    /// usual insert, when the device reports `Error::DiscChanged` — mirroring
    /// a cache that reinitializes the whole mount inline before returning the
    /// error to its caller, rather than leaving that reaction to whatever
    /// code happens to poll the disc status next.
    pub fn read(
        &self,
        device: &dyn BlockDevice,
        lead_in_offset: u32,
        sector: u32,
        before_miss_read: impl FnOnce(),
        on_disc_changed: impl FnOnce(),
    ) -> Result<SectorBuf> {
        {
            let mut queue = self.queue.lock();
            if let Some(pos) = queue.find(sector) {
                queue.promote(pos);
                let hit = queue.lines[CACHE_LINES - 1];
                debug_assert_eq!(hit.sector, Some(sector));
                return Ok(hit.buf);
            }
        }

        before_miss_read();

        let mut buf = SectorBuf::zeroed();
        match device.read_sector(sector + lead_in_offset, &mut buf.0) {
            Ok(()) => {
                let mut queue = self.queue.lock();
                let victim = queue.victim();
                queue.lines[victim] = CacheLine {
                    sector: Some(sector),
                    buf,
                };
                queue.promote(victim);
                Ok(queue.lines[CACHE_LINES - 1].buf)
            }
            Err(e @ Error::DiscChanged) => {
                error!("device read of sector {sector} failed: {e:?}; reinitializing mount");
                on_disc_changed();
                Err(e)
            }
            Err(e) => {
                error!("device read of sector {sector} failed: {e:?}");
                Err(e)
            }
        }
    }

    /// Drop all resident sectors without touching the device.
    pub fn clear(&self) {
        self.queue.lock().clear();
    }
}

impl Default for SectorCache {
    fn default() -> Self {
        Self::new()
    }
}

/// The inode-metadata cache and the file-data cache: independent LRU
/// queues, never sharing buffers.
pub struct TwoTierCache {
    pub inode: SectorCache,
    pub data: SectorCache,
}

impl TwoTierCache {
    pub const fn new() -> Self {
        TwoTierCache {
            inode: SectorCache::new(),
            data: SectorCache::new(),
        }
    }

    pub fn clear_all(&self) {
        self.inode.clear();
        self.data.clear();
    }
}

impl Default for TwoTierCache {
    fn default() -> Self {
        Self::new()
    }
}
