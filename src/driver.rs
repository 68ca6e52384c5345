//! The driver facade: the single entry point a host's VFS dispatch table
//! holds, wiring the cache, handle table, path resolver, and stream session
//! together behind a small set of mutexes. Everything here is orchestration —
//! the interesting logic lives in the modules it calls into.

use alloc::sync::Arc;

use crate::cache::TwoTierCache;
use crate::config::DriverConfig;
use crate::device::{BlockDevice, StatusDevice, StreamDevice};
use crate::error::{Error, Result};
use crate::handle::{HandleId, HandleRegistry};
use crate::path;
use crate::read;
use crate::readdir::{self, DirEntry};
use crate::status::StatusWatcher;
use crate::stream::StreamSession;
use crate::sync::Mutex;
use crate::volume::{self, JolietLevel, Mount};

/// `st_dev` reported by [`Cdfs::stat`]/[`Cdfs::fstat`]: `'c' | ('d' << 8)`.
pub const STAT_DEV: u32 = (b'c' as u32) | ((b'd' as u32) << 8);

/// The one ioctl command this driver recognizes: report the DMA alignment
/// granularity currently in effect for a handle.
pub const IOCTL_DMA_ALIGNMENT: u32 = 1;

bitflags::bitflags! {
    /// Mode bits reported by `stat`/`fstat`. Every entry this read-only
    /// filesystem exposes is user/group/other read+execute —
    /// there is no notion of a non-executable regular file on this medium.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Mode: u32 {
        const USER_READ = 0o400;
        const USER_EXEC = 0o100;
        const GROUP_READ = 0o040;
        const GROUP_EXEC = 0o010;
        const OTHER_READ = 0o004;
        const OTHER_EXEC = 0o001;
    }
}

impl Mode {
    /// The single mode value every `cdfs` entry carries.
    pub const READ_EXEC_ALL: Mode = Mode::USER_READ
        .union(Mode::USER_EXEC)
        .union(Mode::GROUP_READ)
        .union(Mode::GROUP_EXEC)
        .union(Mode::OTHER_READ)
        .union(Mode::OTHER_EXEC);
}

bitflags::bitflags! {
    /// `open()` mode bits: write modes are always rejected, and
    /// the directory bit selects directory- vs. file-mode resolution.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        const WRITE = 0b01;
        const DIRECTORY = 0b10;
    }
}

/// `seek()` origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekWhence {
    Set,
    Cur,
    End,
}

/// `fcntl()` commands. `SetFl`/`GetFd`/`SetFd` are accepted as
/// no-ops — there is nothing on a read-only handle for them to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FcntlCmd {
    GetFl,
    SetFl,
    GetFd,
    SetFd,
}

/// Fields returned by [`Cdfs::stat`] and [`Cdfs::fstat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    pub st_dev: u32,
    pub mode: Mode,
    /// Entry size in bytes for a file; `-1` for a directory.
    pub size: i64,
    pub nlink: u32,
    pub blksize: u32,
    pub is_dir: bool,
}

impl Stat {
    fn for_entry(is_dir: bool, size: u32) -> Self {
        Stat {
            st_dev: STAT_DEV,
            mode: Mode::READ_EXEC_ALL,
            size: if is_dir { -1 } else { size as i64 },
            nlink: if is_dir { 2 } else { 1 },
            blksize: 512,
            is_dir,
        }
    }
}

/// The driver instance a host's VFS mounts at `/cd`.
///
/// Mount happens lazily on first `open`/`stat`, triggered by a disc-change
/// notification or simply never having probed yet — constructing a `Cdfs`
/// never touches the device.
pub struct Cdfs {
    device: Arc<dyn BlockDevice>,
    stream_device: Arc<dyn StreamDevice>,
    status_device: Arc<dyn StatusDevice>,
    config: DriverConfig,
    cache: TwoTierCache,
    handles: HandleRegistry,
    stream: StreamSession,
    status: StatusWatcher,
    mount: Mutex<Option<Mount>>,
}

impl Cdfs {
    pub fn new(
        device: Arc<dyn BlockDevice>,
        stream_device: Arc<dyn StreamDevice>,
        status_device: Arc<dyn StatusDevice>,
        config: DriverConfig,
    ) -> Self {
        Cdfs {
            device,
            stream_device,
            status_device,
            config,
            cache: TwoTierCache::new(),
            handles: HandleRegistry::new(),
            stream: StreamSession::new(),
            status: StatusWatcher::new(),
            mount: Mutex::new(None),
        }
    }

    /// Pump the status watcher. Call once per vblank.
    pub fn on_vblank(&self) {
        self.status.on_vblank(&*self.status_device);
    }

    /// Read one logical inode-cache sector (a volume descriptor or directory
    /// sector), aborting any active stream on a genuine miss. On an ordinary
    /// device failure this only marks the mount stale, so the next open
    /// re-probes instead of re-entering `reinit` synchronously from inside
    /// an in-flight resolve; on a disc-changed error the cache's reinit hook
    /// poisons every open handle immediately. `break_all` only bumps an
    /// epoch counter, so this is safe even when this call runs from inside
    /// `readdir`'s already-held handle lock.
    fn inode_sector(&self, sector: u32) -> Result<crate::cache::SectorBuf> {
        match self.cache.inode.read(
            &*self.device,
            self.config.lead_in_offset,
            sector,
            || {
                let _ = self.stream.abort(&*self.stream_device);
            },
            || self.handles.break_all(),
        ) {
            Ok(buf) => Ok(buf),
            Err(e) => {
                self.status.invalidate_mount();
                Err(e)
            }
        }
    }

    fn ensure_mount(&self) -> Result<Mount> {
        let cached = *self.mount.lock();
        if let Some(m) = cached {
            if self.status.mount_is_current() {
                return Ok(m);
            }
        }
        self.reinit()
    }

    /// Full volume (re)probe: invalidate every open handle, clear both
    /// caches, abort the stream, reinit the device, and rebuild the mount
    /// snapshot from its TOC and volume descriptors.
    fn reinit(&self) -> Result<Mount> {
        self.handles.break_all();
        self.cache.clear_all();
        let _ = self.stream.abort(&*self.stream_device);

        self.device.reinit()?;
        let toc = self.device.read_toc()?;
        let session_base = toc.data_track_start;
        let lead_in = self.config.lead_in_offset;

        let mount = volume::probe(&*self.device, session_base, lead_in, |_device, sector| {
            self.inode_sector(sector).map(|buf| buf.0)
        })?;

        *self.mount.lock() = Some(mount);
        self.status.mark_mount_current();
        Ok(mount)
    }

    pub fn open(&self, path_str: &str, flags: OpenFlags) -> Result<HandleId> {
        if flags.contains(OpenFlags::WRITE) {
            return Err(Error::ReadOnly);
        }
        let mount = self.ensure_mount()?;
        let want_dir = flags.contains(OpenFlags::DIRECTORY);
        let de = path::resolve_path(
            |s| self.inode_sector(s),
            mount.root_extent,
            mount.root_size,
            mount.joliet,
            want_dir,
            path_str,
        )?;
        self.handles.open(de.extent, de.is_directory(), de.size)
    }

    pub fn close(&self, id: HandleId) -> Result<()> {
        let handle = self.handles.close(id)?;
        let _ = self.stream.abort_if_owned_by(&*self.stream_device, handle.id);
        Ok(())
    }

    pub fn read(&self, id: HandleId, out: &mut [u8]) -> Result<usize> {
        let result = self.handles.with_handle(id, |h| {
            read::read_handle(
                h,
                &self.stream,
                &*self.stream_device,
                &*self.device,
                &self.cache.data,
                self.config.lead_in_offset,
                out,
                &|| self.handles.break_all(),
            )
        });

        match result {
            Ok(n) => Ok(n),
            Err(Error::BadHandle) => Err(Error::BadHandle),
            Err(_) => {
                // Any other failure during a read is reported as I/O error
                // at the boundary; a device error here may well mean the
                // disc changed mid-read, so force a re-probe before the
                // next open. A disc-changed error has already poisoned
                // every handle synchronously, above, before this match runs.
                self.status.invalidate_mount();
                Err(Error::Io)
            }
        }
    }

    pub fn seek(&self, id: HandleId, whence: SeekWhence, offset: i64) -> Result<u32> {
        self.handles.with_handle(id, |h| {
            h.check_usable()?;
            let base = match whence {
                SeekWhence::Set => 0i64,
                SeekWhence::Cur => h.pos as i64,
                SeekWhence::End => h.size as i64,
            };
            let target = base
                .checked_add(offset)
                .ok_or(Error::InvalidArgument)?;
            if target < 0 {
                return Err(Error::InvalidArgument);
            }
            let clamped = (target as u64).min(h.size as u64) as u32;

            if clamped != h.pos {
                let _ = self.stream.abort_if_owned_by(&*self.stream_device, h.id);
                h.stream_part = 0;
            }
            h.pos = clamped;
            Ok(clamped)
        })
    }

    pub fn tell(&self, id: HandleId) -> Result<u32> {
        self.handles.with_handle(id, |h| {
            h.check_usable()?;
            Ok(h.pos)
        })
    }

    pub fn total(&self, id: HandleId) -> Result<u32> {
        self.handles.with_handle(id, |h| {
            h.check_usable()?;
            Ok(h.size)
        })
    }

    pub fn readdir(&self, id: HandleId) -> Result<Option<DirEntry>> {
        let joliet = self.mount.lock().map(|m| m.joliet).unwrap_or(JolietLevel::None);
        self.handles.with_handle(id, |h| readdir::read_next(h, |s| self.inode_sector(s), joliet))
    }

    pub fn rewinddir(&self, id: HandleId) -> Result<()> {
        self.handles.with_handle(id, |h| readdir::rewind(h))
    }

    /// Resolve `path` to its metadata without opening a handle. The root
    /// path (`/` or empty) and any other path resolve to whichever kind
    /// (file or directory) actually exists there — the caller doesn't have
    /// to know in advance.
    pub fn stat(&self, path_str: &str) -> Result<Stat> {
        let mount = self.ensure_mount()?;
        let as_dir = path::resolve_path(
            |s| self.inode_sector(s),
            mount.root_extent,
            mount.root_size,
            mount.joliet,
            true,
            path_str,
        );
        let de = match as_dir {
            Ok(de) => de,
            Err(Error::NotFound) => path::resolve_path(
                |s| self.inode_sector(s),
                mount.root_extent,
                mount.root_size,
                mount.joliet,
                false,
                path_str,
            )?,
            Err(e) => return Err(e),
        };
        Ok(Stat::for_entry(de.is_directory(), de.size))
    }

    pub fn fstat(&self, id: HandleId) -> Result<Stat> {
        self.handles.with_handle(id, |h| {
            h.check_usable()?;
            Ok(Stat::for_entry(h.is_dir, h.size))
        })
    }

    pub fn fcntl(&self, id: HandleId, cmd: FcntlCmd) -> Result<u32> {
        self.handles.with_handle(id, |h| {
            h.check_usable()?;
            match cmd {
                FcntlCmd::GetFl => {
                    let mut bits = 0u32;
                    if h.is_dir {
                        bits |= OpenFlags::DIRECTORY.bits();
                    }
                    Ok(bits)
                }
                FcntlCmd::SetFl | FcntlCmd::GetFd | FcntlCmd::SetFd => Ok(0),
            }
        })
    }

    /// Report the DMA alignment granularity for `id`'s current position:
    /// 32 bytes while the handle holds the stream session, 2048 otherwise.
    /// Fails with [`Error::InvalidArgument`] if the position is not itself
    /// aligned to that granularity, or for any command other than
    /// [`IOCTL_DMA_ALIGNMENT`].
    pub fn ioctl(&self, id: HandleId, cmd: u32, _arg: u32) -> Result<u32> {
        if cmd != IOCTL_DMA_ALIGNMENT {
            return Err(Error::InvalidArgument);
        }
        self.handles.with_handle(id, |h| {
            h.check_usable()?;
            let granularity = if self.stream.is_active_for(h.id) { 32 } else { 2048 };
            if h.pos % granularity == 0 {
                Ok(granularity)
            } else {
                Err(Error::InvalidArgument)
            }
        })
    }
}
