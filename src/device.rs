//! External device contracts.
//!
//! The physical CD-ROM device, its streaming DMA engine, and its status
//! line are not implemented here — only their contracts matter. A host
//! environment supplies concrete implementations and hands `Arc<dyn ...>`
//! trait objects to [`crate::Cdfs::new`].

use crate::error::Result;

/// Logical sector size in bytes. Fixed by the ISO 9660 standard.
pub const SECTOR_SIZE: usize = 2048;

/// The disc's table of contents, reduced to what the driver needs: the
/// first sector of the data track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toc {
    pub data_track_start: u32,
}

/// Coarse disc presence/tray status, as reported by the host device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscStatus {
    Ready,
    TrayOpen,
    NoDisc,
    Busy,
}

/// Disc media type, reported alongside [`DiscStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscType {
    Unknown,
    Cdrom,
    CdromXa,
    Gdrom,
}

/// Synchronous block-level access to the disc: single- and multi-sector
/// reads, TOC lookup, and a full device reinitialization used after a
/// disc change is observed.
pub trait BlockDevice: Send + Sync {
    /// Read exactly one sector at `sector` (a physical sector number,
    /// already including any lead-in offset the caller has applied).
    ///
    /// Returns `Err(Error::DiscChanged)`, distinct from any other I/O
    /// failure, when the device itself detects the disc was swapped or
    /// ejected — callers (the sector cache in particular) react to that
    /// condition differently from a plain read error.
    fn read_sector(&self, sector: u32, out: &mut [u8; SECTOR_SIZE]) -> Result<()>;

    /// Read `count` consecutive sectors starting at `sector` into `out`.
    /// `out.len()` must equal `count as usize * SECTOR_SIZE`. Same
    /// `Error::DiscChanged` contract as [`BlockDevice::read_sector`].
    fn read_sectors(&self, sector: u32, count: u32, out: &mut [u8]) -> Result<()>;

    /// Read the disc's table of contents.
    fn read_toc(&self) -> Result<Toc>;

    /// Reinitialize the device after a disc change.
    fn reinit(&self) -> Result<()>;
}

/// The device's asynchronous streaming DMA engine. At most one stream is
/// ever active; arbitration is the stream session's job, not this trait's.
pub trait StreamDevice: Send + Sync {
    /// Begin a stream covering `sector_count` sectors starting at `sector`.
    fn start(&self, sector: u32, sector_count: u32) -> Result<()>;

    /// Request `bytes` from the active stream into `out` (`out.len() >= bytes`).
    fn request(&self, bytes: u32, out: &mut [u8]) -> Result<()>;

    /// Poll whether the most recent `request()` has finished landing: bytes
    /// still in flight for that transfer, 0 once fully delivered. A request
    /// may land over several DMA bursts, so callers spin on this until it
    /// reaches zero rather than trusting a single sample — it says nothing
    /// about how much of the stream's overall sector range remains, which
    /// callers track themselves.
    fn progress(&self) -> Result<u32>;

    /// Abort the active stream, if any.
    fn stop(&self) -> Result<()>;
}

/// Disc presence/tray status query, polled by the status watcher.
pub trait StatusDevice: Send + Sync {
    fn status(&self) -> Result<(DiscStatus, DiscType)>;
}
