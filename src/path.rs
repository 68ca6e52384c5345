//! Full-path resolution relative to the volume root.
//!
//! Splits a path on `/` and calls [`crate::resolver::find_object`] once per
//! component. Every component before the last is resolved as a directory
//! regardless of what the caller ultimately wants — including one that sits
//! before a *trailing* slash, which is what makes `"a/b/"` reject a request
//! for a plain file named `b` even if the intermediate walk would otherwise
//! succeed.

use crate::cache::SectorBuf;
use crate::dirent::{Dirent, FLAG_DIRECTORY};
use crate::error::{Error, Result};
use crate::resolver::find_object;
use crate::volume::JolietLevel;

/// Resolve `path` (absolute, `/`-separated) starting from the volume root.
///
/// `want_dir` gates only the final named component: `true` if the caller is
/// opening a directory (or the path names nothing, i.e. is `"/"` itself),
/// `false` for a file.
pub fn resolve_path(
    mut read_sector: impl FnMut(u32) -> Result<SectorBuf>,
    root_extent: u32,
    root_size: u32,
    joliet: JolietLevel,
    want_dir: bool,
    path: &str,
) -> Result<Dirent> {
    let mut extent = root_extent;
    let mut size = root_size;
    let mut flags = FLAG_DIRECTORY;

    let mut remainder = path.strip_prefix('/').unwrap_or(path);

    while let Some(slash_pos) = remainder.find('/') {
        if slash_pos != 0 {
            let component = &remainder[..slash_pos];
            let de = find_object(&mut read_sector, extent, size, true, joliet, component.as_bytes())?;
            extent = de.extent;
            size = de.size;
            flags = de.flags;
        }
        remainder = &remainder[slash_pos + 1..];
    }

    if remainder.is_empty() {
        return if want_dir {
            Ok(Dirent { extent, size, flags })
        } else {
            Err(Error::NotFound)
        };
    }

    find_object(&mut read_sector, extent, size, want_dir, joliet, remainder.as_bytes())
}
