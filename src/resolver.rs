//! Single-component name resolution within one directory extent.
//!
//! Walks a directory's sectors record by record, matching each entry's name
//! under whichever of the three naming schemes the mount is using, and
//! returns an owned copy of the winning record — never a borrow into the
//! sector buffer that produced it, so the cache line can be reused the
//! instant this function returns.

use crate::cache::SectorBuf;
use crate::device::SECTOR_SIZE;
use crate::dirent::{self, Dirent, RawDirent};
use crate::error::{Error, Result};
use crate::joliet;
use crate::volume::JolietLevel;

/// Search `dir_extent`/`dir_size` (in logical sectors/bytes) for an entry
/// named `name`, whose directory bit matches `want_dir`.
///
/// `read_sector` reads one logical sector of the directory's extent,
/// relative to the volume (not yet lead-in adjusted) through whichever
/// cache instance the caller is using.
pub fn find_object(
    mut read_sector: impl FnMut(u32) -> Result<SectorBuf>,
    dir_extent: u32,
    dir_size: u32,
    want_dir: bool,
    joliet: JolietLevel,
    name: &[u8],
) -> Result<Dirent> {
    let mut size_left = dir_size as i64;
    let mut sector_offset = 0u32;

    while size_left > 0 {
        let sector = read_sector(dir_extent + sector_offset)?;
        let mut offset = 0usize;

        while offset < SECTOR_SIZE {
            let Some(de) = RawDirent::parse(&sector.0, offset) else {
                break;
            };

            if entry_matches(&de, joliet, name) && de.is_directory() == want_dir {
                return Ok(de.to_owned_fields());
            }

            offset += de.length as usize;
        }

        sector_offset += 1;
        size_left -= SECTOR_SIZE as i64;
    }

    Err(Error::NotFound)
}

fn entry_matches(de: &RawDirent<'_>, joliet: JolietLevel, name: &[u8]) -> bool {
    if joliet.is_joliet() {
        let decoded = joliet::decode_name(de.name);
        return joliet::ascii_eq_ignore_case(&decoded, name);
    }

    if let Some(rr_name) = dirent::rock_ridge_name(de.system_use) {
        return joliet::ascii_eq_ignore_case(&rr_name, name);
    }

    joliet::ascii_eq_ignore_case(dirent::strip_iso_suffix(de.name), name)
}
