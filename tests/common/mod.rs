//! Synthetic ISO 9660 image fixture shared by the integration tests.
//!
//! Builds small in-memory discs by hand (volume descriptors, directory
//! records, file data) and a trio of `cdfs` device trait implementations
//! backed by those bytes, so the scenarios below exercise the real
//! directory-record parser and streaming logic rather than a mock.

use std::sync::Mutex;

use cdfs::{BlockDevice, DiscStatus, DiscType, Error, Result, StatusDevice, StreamDevice, Toc};

pub const SECTOR_SIZE: usize = 2048;

/// Sectors 0..20 are reserved for the volume descriptor set (16: primary,
/// 17..19: supplementary/terminator), mirroring a real disc's system area;
/// data extents start at sector 20, clear of the probe's descriptor scan.
pub const FIRST_DATA_SECTOR: u32 = 20;

pub fn dirent_bytes(name: &[u8], extent: u32, size: u32, flags: u8, system_use: &[u8]) -> Vec<u8> {
    let name_len = name.len();
    let pad = if name_len % 2 == 0 { 1 } else { 0 };
    let length = 33 + name_len + pad + system_use.len();
    let mut buf = vec![0u8; length];
    buf[0] = length as u8;
    buf[2..6].copy_from_slice(&extent.to_le_bytes());
    buf[6..10].copy_from_slice(&extent.to_be_bytes());
    buf[10..14].copy_from_slice(&size.to_le_bytes());
    buf[14..18].copy_from_slice(&size.to_be_bytes());
    buf[25] = flags;
    buf[32] = name_len as u8;
    buf[33..33 + name_len].copy_from_slice(name);
    let su_start = 33 + name_len + pad;
    buf[su_start..su_start + system_use.len()].copy_from_slice(system_use);
    buf
}

pub fn nm_record(name: &[u8]) -> Vec<u8> {
    let mut rec = vec![b'N', b'M', (5 + name.len()) as u8, 1, 0];
    rec.extend_from_slice(name);
    rec
}

/// UCS-2 big-endian encoding of a Joliet name, as stored in a directory
/// record.
pub fn joliet_name(name: &str) -> Vec<u8> {
    name.encode_utf16().flat_map(|c| c.to_be_bytes()).collect()
}

pub fn dot_entry(self_extent: u32, size: u32) -> Vec<u8> {
    dirent_bytes(&[0x00], self_extent, size, cdfs::dirent::FLAG_DIRECTORY, &[])
}

pub fn dotdot_entry(parent_extent: u32, size: u32) -> Vec<u8> {
    dirent_bytes(&[0x01], parent_extent, size, cdfs::dirent::FLAG_DIRECTORY, &[])
}

fn pack_sector(entries: &[Vec<u8>]) -> [u8; SECTOR_SIZE] {
    let mut sector = [0u8; SECTOR_SIZE];
    let mut offset = 0usize;
    for entry in entries {
        sector[offset..offset + entry.len()].copy_from_slice(entry);
        offset += entry.len();
    }
    sector
}

/// Accumulates sectors for a synthetic disc image, starting allocation at
/// [`FIRST_DATA_SECTOR`] and filling in the volume descriptor area last.
pub struct ImageBuilder {
    sectors: Vec<[u8; SECTOR_SIZE]>,
}

impl ImageBuilder {
    pub fn new() -> Self {
        ImageBuilder { sectors: vec![[0u8; SECTOR_SIZE]; FIRST_DATA_SECTOR as usize] }
    }

    /// Write `content` as a new file extent, returning `(extent, size)`.
    pub fn add_file(&mut self, content: &[u8]) -> (u32, u32) {
        let extent = self.sectors.len() as u32;
        let sector_count = ((content.len() + SECTOR_SIZE - 1) / SECTOR_SIZE).max(1);
        for i in 0..sector_count {
            let mut sector = [0u8; SECTOR_SIZE];
            let start = i * SECTOR_SIZE;
            let n = (content.len() - start).min(SECTOR_SIZE);
            sector[..n].copy_from_slice(&content[start..start + n]);
            self.sectors.push(sector);
        }
        (extent, content.len() as u32)
    }

    /// Write a single-sector directory from pre-built directory records,
    /// returning `(extent, size)`.
    pub fn add_directory(&mut self, entries: &[Vec<u8>]) -> (u32, u32) {
        let extent = self.sectors.len() as u32;
        self.sectors.push(pack_sector(entries));
        (extent, SECTOR_SIZE as u32)
    }

    /// Finish the image: stamp the primary volume descriptor (and,
    /// optionally, a Joliet supplementary descriptor) and return the
    /// finished sector list.
    pub fn finish(mut self, root: (u32, u32), joliet: Option<(u8, u32, u32)>) -> Vec<[u8; SECTOR_SIZE]> {
        self.sectors[16][0..6].copy_from_slice(b"\x01CD001");
        write_root_dirent(&mut self.sectors[16], root.0, root.1);

        if let Some((level, extent, size)) = joliet {
            let escape: &[u8; 3] = match level {
                1 => b"%/@",
                2 => b"%/C",
                3 => b"%/E",
                _ => panic!("unsupported joliet level in fixture"),
            };
            self.sectors[17][0..6].copy_from_slice(b"\x02CD001");
            self.sectors[17][88..91].copy_from_slice(escape);
            write_root_dirent(&mut self.sectors[17], extent, size);
        }

        self.sectors
    }
}

fn write_root_dirent(sector: &mut [u8; SECTOR_SIZE], extent: u32, size: u32) {
    let record = dirent_bytes(&[0], extent, size, cdfs::dirent::FLAG_DIRECTORY, &[]);
    sector[156..156 + record.len()].copy_from_slice(&record);
}

/// Read-only block device over a fixed, in-memory disc image.
pub struct MemDisc {
    pub sectors: Vec<[u8; SECTOR_SIZE]>,
}

impl BlockDevice for MemDisc {
    fn read_sector(&self, sector: u32, out: &mut [u8; SECTOR_SIZE]) -> Result<()> {
        *out = *self.sectors.get(sector as usize).ok_or(Error::Io)?;
        Ok(())
    }

    fn read_sectors(&self, sector: u32, count: u32, out: &mut [u8]) -> Result<()> {
        for i in 0..count {
            let s = self.sectors.get((sector + i) as usize).ok_or(Error::Io)?;
            let start = (i as usize) * SECTOR_SIZE;
            out[start..start + SECTOR_SIZE].copy_from_slice(s);
        }
        Ok(())
    }

    fn read_toc(&self) -> Result<Toc> {
        Ok(Toc { data_track_start: 0 })
    }

    fn reinit(&self) -> Result<()> {
        Ok(())
    }
}

/// Wraps a [`MemDisc`], but once armed (via [`DiscChangingDisc::trip`])
/// every read reports `Error::DiscChanged` instead of delegating — lets a
/// test flip the disc mid-session without touching the status line.
pub struct DiscChangingDisc {
    inner: MemDisc,
    tripped: Mutex<bool>,
}

impl DiscChangingDisc {
    pub fn new(sectors: Vec<[u8; SECTOR_SIZE]>) -> Self {
        DiscChangingDisc { inner: MemDisc { sectors }, tripped: Mutex::new(false) }
    }

    pub fn trip(&self) {
        *self.tripped.lock().unwrap() = true;
    }
}

impl BlockDevice for DiscChangingDisc {
    fn read_sector(&self, sector: u32, out: &mut [u8; SECTOR_SIZE]) -> Result<()> {
        if *self.tripped.lock().unwrap() {
            return Err(Error::DiscChanged);
        }
        self.inner.read_sector(sector, out)
    }

    fn read_sectors(&self, sector: u32, count: u32, out: &mut [u8]) -> Result<()> {
        if *self.tripped.lock().unwrap() {
            return Err(Error::DiscChanged);
        }
        self.inner.read_sectors(sector, count, out)
    }

    fn read_toc(&self) -> Result<Toc> {
        self.inner.read_toc()
    }

    fn reinit(&self) -> Result<()> {
        self.inner.reinit()
    }
}

/// A streaming DMA engine backed by the same bytes as a [`MemDisc`],
/// delivering sequential chunks from wherever `start` last pointed.
pub struct MemStream {
    sectors: Vec<[u8; SECTOR_SIZE]>,
    cursor: Mutex<Option<u64>>,
}

impl MemStream {
    pub fn new(sectors: Vec<[u8; SECTOR_SIZE]>) -> Self {
        MemStream { sectors, cursor: Mutex::new(None) }
    }

    fn read_at(&self, start: u64, len: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(len);
        let mut pos = start;
        while out.len() < len {
            let sector_idx = (pos / SECTOR_SIZE as u64) as usize;
            let offset = (pos % SECTOR_SIZE as u64) as usize;
            let sector = &self.sectors[sector_idx];
            let n = (SECTOR_SIZE - offset).min(len - out.len());
            out.extend_from_slice(&sector[offset..offset + n]);
            pos += n as u64;
        }
        out
    }
}

impl StreamDevice for MemStream {
    fn start(&self, sector: u32, _sector_count: u32) -> Result<()> {
        *self.cursor.lock().unwrap() = Some(sector as u64 * SECTOR_SIZE as u64);
        Ok(())
    }

    fn request(&self, bytes: u32, out: &mut [u8]) -> Result<()> {
        let mut guard = self.cursor.lock().unwrap();
        let pos = guard.ok_or(Error::Io)?;
        let data = self.read_at(pos, bytes as usize);
        out[..bytes as usize].copy_from_slice(&data);
        *guard = Some(pos + bytes as u64);
        Ok(())
    }

    fn progress(&self) -> Result<u32> {
        Ok(0)
    }

    fn stop(&self) -> Result<()> {
        *self.cursor.lock().unwrap() = None;
        Ok(())
    }
}

/// A stream device that always declines to start, forcing every read
/// through the plain device-read strategies.
pub struct NoStream;

impl StreamDevice for NoStream {
    fn start(&self, _sector: u32, _sector_count: u32) -> Result<()> {
        Err(Error::Io)
    }
    fn request(&self, _bytes: u32, _out: &mut [u8]) -> Result<()> {
        Err(Error::Io)
    }
    fn progress(&self) -> Result<u32> {
        Ok(0)
    }
    fn stop(&self) -> Result<()> {
        Ok(())
    }
}

/// Disc presence/tray status a test can flip between polls.
pub struct MemStatus {
    state: Mutex<(DiscStatus, DiscType)>,
}

impl MemStatus {
    pub fn new() -> Self {
        MemStatus { state: Mutex::new((DiscStatus::Ready, DiscType::Cdrom)) }
    }

    pub fn set(&self, status: DiscStatus, disc_type: DiscType) {
        *self.state.lock().unwrap() = (status, disc_type);
    }
}

impl StatusDevice for MemStatus {
    fn status(&self) -> Result<(DiscStatus, DiscType)> {
        Ok(*self.state.lock().unwrap())
    }
}

/// A buffer aligned to the driver's DMA granularity, so reads into it can
/// exercise the direct multi-sector and streaming read strategies instead
/// of always falling back to the single-sector cache path.
#[repr(align(32))]
pub struct AlignedBuf<const N: usize>(pub [u8; N]);

impl<const N: usize> AlignedBuf<N> {
    pub fn zeroed() -> Self {
        AlignedBuf([0u8; N])
    }
}

/// Deterministic pseudo-random-looking content, long enough to span several
/// sectors, for tests that read a file back in irregular chunk sizes.
pub fn pattern_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
