//! Directory iteration: readdir/rewinddir over one open handle.
//!
//! Advances an open directory handle one entry at a time: skipping the
//! zero-length padding at the tail of each sector in a multi-sector extent,
//! skipping the `.`/`..` self-reference entries RRIP never bothers naming,
//! and resolving the display name under whichever of the three naming
//! schemes the mount is using.

use alloc::vec::Vec;

use crate::cache::SectorBuf;
use crate::device::SECTOR_SIZE;
use crate::dirent::{self, RawDirent};
use crate::error::{Error, Result};
use crate::handle::Handle;
use crate::joliet;
use crate::volume::JolietLevel;

/// One entry returned by [`read_next`]. `size` is `-1` for directories, the
/// same sentinel the external interface's `dirent_t` uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: Vec<u8>,
    pub size: i64,
    pub is_directory: bool,
}

/// Return the next entry in `handle`'s directory, or `None` at the end.
pub fn read_next(
    handle: &mut Handle,
    mut read_sector: impl FnMut(u32) -> Result<SectorBuf>,
    joliet: JolietLevel,
) -> Result<Option<DirEntry>> {
    handle.check_usable()?;
    if !handle.is_dir {
        return Err(Error::BadHandle);
    }

    let sector_size = SECTOR_SIZE as u32;

    loop {
        if handle.readdir_pos >= handle.size {
            return Ok(None);
        }

        let sector_index = handle.readdir_pos / sector_size;
        let sector_offset = (handle.readdir_pos % sector_size) as usize;
        let sector = read_sector(handle.first_extent + sector_index)?;

        let Some(de) = RawDirent::parse(&sector.0, sector_offset) else {
            // Zero-length entry: the rest of this sector is padding.
            handle.readdir_pos += sector_size - handle.readdir_pos % sector_size;
            continue;
        };

        // `.` (name byte 0x00) and `..` (name byte 0x01), RRIP's stand-ins
        // for the two entries every ISO 9660 directory starts with.
        if de.name.len() == 1 && (de.name[0] == 0x00 || de.name[0] == 0x01) {
            handle.readdir_pos += de.length as u32;
            continue;
        }

        let name = if joliet.is_joliet() {
            joliet::decode_name(de.name)
        } else {
            match dirent::rock_ridge_name(de.system_use) {
                Some(rr_name) => rr_name,
                None => dirent::ascii_lowercase(dirent::strip_iso_suffix(de.name)),
            }
        };

        let is_directory = de.is_directory();
        let size = if is_directory { -1 } else { de.size as i64 };
        handle.readdir_pos += de.length as u32;

        return Ok(Some(DirEntry { name, size, is_directory }));
    }
}

/// Reset a directory handle back to its first entry.
pub fn rewind(handle: &mut Handle) -> Result<()> {
    handle.check_usable()?;
    if !handle.is_dir {
        return Err(Error::BadHandle);
    }
    handle.readdir_pos = 0;
    Ok(())
}
