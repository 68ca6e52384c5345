//! Error taxonomy surfaced at the VFS boundary.
//!
//! Mirrors the plain-enum-with-no-`Display` style of the pack's kernel
//! `KError`/`KResult` pair rather than reaching for `thiserror`: this crate
//! is `no_std` and the error set is small and stable.

/// Error kinds a caller of the driver's external interface can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Open was attempted in a write mode; the filesystem is read-only.
    ReadOnly,
    /// No disc is present, or the volume probe failed.
    NoDevice,
    /// A device read detected that the disc was swapped or ejected mid-read,
    /// distinct from an ordinary I/O failure — the cache layer reacts to
    /// this immediately rather than waiting for the next status poll.
    DiscChanged,
    /// Path resolution did not find the requested object.
    NotFound,
    /// Handle allocation failed (host allocator exhausted).
    OutOfMemory,
    /// Operation attempted on a broken or zero-extent handle.
    BadHandle,
    /// Bad seek whence, invalid ioctl/fcntl command, or seek before byte 0.
    InvalidArgument,
    /// A device read failed during a read operation.
    Io,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
