//! Volume probe and per-disc state.
//!
//! Run once at mount and again every time a disc change is observed: locate
//! the data track, decide between Joliet and plain-ISO/Rock Ridge naming,
//! and snapshot the root directory's extent and size.

use log::{info, warn};

use crate::dirent::RawDirent;
use crate::device::BlockDevice;
use crate::error::{Error, Result};
use crate::joliet;

/// Offset of a volume descriptor's root directory record within its sector.
const ROOT_DIRENT_OFFSET: usize = 156;
/// Offset of the Joliet escape sequence within a supplementary descriptor.
const ESCAPE_SEQUENCE_OFFSET: usize = 88;
/// First sector of the volume descriptor set, relative to the data track.
const VOLUME_DESCRIPTOR_START: u32 = 16;

/// Naming scheme in effect for the mounted volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JolietLevel {
    /// No Joliet descriptor found; names come from ISO 9660 (+ Rock Ridge NM).
    None,
    Level1,
    Level2,
    Level3,
}

impl JolietLevel {
    pub fn is_joliet(self) -> bool {
        !matches!(self, JolietLevel::None)
    }

    fn from_escape_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(JolietLevel::Level1),
            2 => Some(JolietLevel::Level2),
            3 => Some(JolietLevel::Level3),
            _ => None,
        }
    }
}

/// A snapshot of the mounted volume's identity: enough to resolve paths and
/// read files without re-probing the disc on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mount {
    /// First physical sector of the data track (before the lead-in offset).
    pub session_base: u32,
    pub joliet: JolietLevel,
    pub root_extent: u32,
    pub root_size: u32,
}

impl Mount {
    /// True extent of the root directory, irrespective of naming scheme —
    /// both Joliet and ISO/Rock Ridge directories share the same extents,
    /// the volume descriptor just tells us which SVD's root to read from.
    pub fn root(&self) -> (u32, u32) {
        (self.root_extent, self.root_size)
    }
}

/// Probe a freshly (re)initialized device and build a [`Mount`].
///
/// `read_sector` reads one *physical* sector (already lead-in adjusted) via
/// the cache; callers supply it so this function never has to know about
/// caching policy.
pub fn probe(
    device: &dyn BlockDevice,
    session_base: u32,
    lead_in_offset: u32,
    mut read_sector: impl FnMut(&dyn BlockDevice, u32) -> Result<[u8; 2048]>,
) -> Result<Mount> {
    let mut joliet = JolietLevel::None;
    let mut chosen_sector: Option<[u8; 2048]> = None;

    for i in 1..=3u32 {
        let physical = session_base + VOLUME_DESCRIPTOR_START + i - lead_in_offset;
        let sector = read_sector(device, physical)?;

        if &sector[0..6] != b"\x02CD001" {
            continue;
        }

        if let Some(level) = joliet::escape_sequence_level(
            &sector[ESCAPE_SEQUENCE_OFFSET..ESCAPE_SEQUENCE_OFFSET + 3],
        )
        .and_then(JolietLevel::from_escape_level)
        {
            info!("joliet level {:?} extensions detected", level);
            joliet = level;
            chosen_sector = Some(sector);
            break;
        }
    }

    let sector = match chosen_sector {
        Some(sector) => sector,
        None => {
            let physical = session_base + VOLUME_DESCRIPTOR_START - lead_in_offset;
            let sector = read_sector(device, physical)?;
            if &sector[0..6] != b"\x01CD001" {
                warn!("disc is not iso9660");
                return Err(Error::NoDevice);
            }
            sector
        }
    };

    let root = RawDirent::parse(&sector, ROOT_DIRENT_OFFSET).ok_or(Error::NoDevice)?;

    Ok(Mount {
        session_base,
        joliet,
        root_extent: root.extent,
        root_size: root.size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SECTOR_SIZE;
    use crate::error::Result as Res;

    struct FakeDevice;
    impl BlockDevice for FakeDevice {
        fn read_sector(&self, _sector: u32, _out: &mut [u8; SECTOR_SIZE]) -> Res<()> {
            Ok(())
        }
        fn read_sectors(&self, _sector: u32, _count: u32, _out: &mut [u8]) -> Res<()> {
            Ok(())
        }
        fn read_toc(&self) -> Res<crate::device::Toc> {
            Ok(crate::device::Toc { data_track_start: 0 })
        }
        fn reinit(&self) -> Res<()> {
            Ok(())
        }
    }

    fn primary_descriptor_with_root(extent: u32, size: u32) -> [u8; 2048] {
        let mut sector = [0u8; 2048];
        sector[0..6].copy_from_slice(b"\x01CD001");
        sector[156 + 2..156 + 6].copy_from_slice(&extent.to_le_bytes());
        sector[156 + 10..156 + 14].copy_from_slice(&size.to_le_bytes());
        sector[156] = 34; // directory record length, enough for a bare record
        sector
    }

    fn supplementary_descriptor_with_root(level_escape: &[u8; 3], extent: u32, size: u32) -> [u8; 2048] {
        let mut sector = [0u8; 2048];
        sector[0..6].copy_from_slice(b"\x02CD001");
        sector[88..91].copy_from_slice(level_escape);
        sector[156 + 2..156 + 6].copy_from_slice(&extent.to_le_bytes());
        sector[156 + 10..156 + 14].copy_from_slice(&size.to_le_bytes());
        sector[156] = 34;
        sector
    }

    #[test]
    fn falls_back_to_primary_when_no_joliet_descriptor() {
        let primary = primary_descriptor_with_root(20, 2048);
        let empty = [0u8; 2048];
        let device = FakeDevice;
        let mount = probe(&device, 0, 0, |_d, sector| {
            Ok(if sector == 16 { primary } else { empty })
        })
        .unwrap();
        assert_eq!(mount.joliet, JolietLevel::None);
        assert_eq!(mount.root_extent, 20);
        assert_eq!(mount.root_size, 2048);
    }

    #[test]
    fn picks_up_joliet_level_2() {
        let svd = supplementary_descriptor_with_root(b"%/C", 30, 4096);
        let device = FakeDevice;
        let mount = probe(&device, 0, 0, |_d, sector| {
            Ok(if sector == 17 { svd } else { [0u8; 2048] })
        })
        .unwrap();
        assert_eq!(mount.joliet, JolietLevel::Level2);
        assert_eq!(mount.root_extent, 30);
    }

    #[test]
    fn rejects_non_iso9660_disc() {
        let device = FakeDevice;
        let result = probe(&device, 0, 0, |_d, _sector| Ok([0u8; 2048]));
        assert_eq!(result, Err(Error::NoDevice));
    }
}
