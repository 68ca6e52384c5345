//! `cdfs` — a read-only ISO 9660 filesystem driver with Rock Ridge and
//! Joliet naming, for a single-disc optical device.
//!
//! The crate owns no device of its own: a host supplies [`device::BlockDevice`],
//! [`device::StreamDevice`] and [`device::StatusDevice`] implementations to
//! [`Cdfs::new`] and drives [`Cdfs::on_vblank`] from its timer pump. Everything
//! else — path resolution across ISO/Rock Ridge/Joliet names, the two-tier
//! sector cache, the single-slot streaming session, and disc-change recovery
//! — lives here.
#![no_std]

extern crate alloc;

pub mod cache;
pub mod config;
pub mod device;
pub mod dirent;
mod driver;
pub mod error;
pub mod handle;
pub mod joliet;
pub mod path;
pub mod read;
pub mod readdir;
pub mod resolver;
pub mod status;
pub mod stream;
pub mod sync;
pub mod volume;

pub use config::DriverConfig;
pub use device::{BlockDevice, DiscStatus, DiscType, StatusDevice, StreamDevice, Toc};
pub use driver::{Cdfs, FcntlCmd, Mode, OpenFlags, SeekWhence, Stat, IOCTL_DMA_ALIGNMENT};
pub use error::{Error, Result};
pub use handle::HandleId;
pub use readdir::DirEntry;
pub use volume::JolietLevel;
