//! Read-loop strategy selection, and its tie-breaker with the streaming
//! session.
//!
//! Each iteration picks one of four strategies for the next chunk, in
//! order: continue an already-active stream, start a new stream at a
//! sector boundary, service a sub-32-byte tail of an active stream from its
//! scratch buffer, or fall back to a plain device read (direct multi-sector
//! DMA when the request is sector-aligned and large enough, otherwise a
//! single cached sector). The whole call runs with the handle locked.

use crate::cache::SectorCache;
use crate::device::{BlockDevice, StreamDevice, SECTOR_SIZE};
use crate::error::{Error, Result};
use crate::handle::Handle;
use crate::stream::StreamSession;

/// Read up to `out.len()` bytes from `handle`'s current position, advancing
/// it, and return the number of bytes actually read (fewer than `out.len()`
/// only at end of file).
///
/// `on_disc_changed` runs synchronously the moment either device path
/// detects `Error::DiscChanged` — this call runs with the handle already
/// locked, so it must not try to re-lock the handle table itself.
#[allow(clippy::too_many_arguments)]
pub fn read_handle(
    handle: &mut Handle,
    stream: &StreamSession,
    stream_device: &dyn StreamDevice,
    block_device: &dyn BlockDevice,
    data_cache: &SectorCache,
    lead_in_offset: u32,
    mut out: &mut [u8],
    on_disc_changed: &dyn Fn(),
) -> Result<usize> {
    handle.check_usable()?;
    if handle.is_dir {
        return Err(Error::BadHandle);
    }

    let sector_size = SECTOR_SIZE as u32;
    let mut total = 0usize;

    while !out.is_empty() {
        let remaining_in_file = handle.size.saturating_sub(handle.pos);
        if remaining_in_file == 0 {
            break;
        }

        let to_read = (out.len() as u32).min(remaining_in_file);
        let sector_offset = handle.pos % sector_size;
        let this_sector_remaining = sector_size - sector_offset;
        let sector = handle.first_extent + handle.pos / sector_size;
        let out_aligned = (out.as_ptr() as usize) % 32 == 0;

        if this_sector_remaining % 32 == 0 && to_read >= 32 && out_aligned {
            if stream.is_active_for(handle.id) {
                let n = stream_chunk(stream, stream_device, handle, &mut out, to_read)?;
                total += n;
                continue;
            }

            if this_sector_remaining == sector_size {
                let sector_count = (remaining_in_file + sector_size - 1) / sector_size;
                if stream
                    .start(stream_device, handle.id, sector + lead_in_offset, sector_count)
                    .is_ok()
                {
                    let n = stream_chunk(stream, stream_device, handle, &mut out, to_read)?;
                    total += n;
                    continue;
                }
                // Device declined to start a stream (busy); fall through to
                // the plain device-read strategies below for this chunk.
            }
        } else if stream.is_active_for(handle.id) && to_read < 32 {
            let n = stream_tail(stream, stream_device, handle, &mut out, to_read, this_sector_remaining)?;
            total += n;
            continue;
        }

        if this_sector_remaining == sector_size && to_read >= sector_size && out_aligned {
            let sector_count = to_read / sector_size;
            let bytes = (sector_count * sector_size) as usize;
            if let Err(e) = block_device.read_sectors(sector + lead_in_offset, sector_count, &mut out[..bytes]) {
                if e == Error::DiscChanged {
                    on_disc_changed();
                }
                return Err(e);
            }
            advance(&mut out, handle, bytes);
            total += bytes;
        } else {
            let n = to_read.min(this_sector_remaining) as usize;
            let buf = data_cache.read(block_device, lead_in_offset, sector, || {}, on_disc_changed)?;
            let start = sector_offset as usize;
            out[..n].copy_from_slice(&buf.0[start..start + n]);
            advance(&mut out, handle, n);
            total += n;
        }
    }

    Ok(total)
}

// `StreamDevice::progress` reports bytes still in flight for the most
// recent `request()` call, not bytes left in the streamed range — a stream
// always covers every sector out to EOF (see `read_handle`'s start call),
// so "the streamed range is exhausted" and "the handle has reached EOF"
// are the same condition, and it's the handle's position that decides
// whether to abort, not a device-reported counter.

fn stream_chunk(
    stream: &StreamSession,
    stream_device: &dyn StreamDevice,
    handle: &mut Handle,
    out: &mut &mut [u8],
    to_read: u32,
) -> Result<usize> {
    let chunk = (to_read - (to_read % 32)) as usize;
    stream_device.request(chunk as u32, &mut out[..chunk])?;
    while stream_device.progress()? != 0 {}
    advance(out, handle, chunk);
    if handle.pos >= handle.size {
        stream.abort(stream_device)?;
    }
    Ok(chunk)
}

fn stream_tail(
    stream: &StreamSession,
    stream_device: &dyn StreamDevice,
    handle: &mut Handle,
    out: &mut &mut [u8],
    to_read: u32,
    this_sector_remaining: u32,
) -> Result<usize> {
    let n = to_read.min(this_sector_remaining) as usize;

    if handle.stream_part > 0 {
        let offset = handle.stream_part as usize;
        out[..n].copy_from_slice(&handle.stream_data[offset..offset + n]);
        handle.stream_part = 0;
    } else {
        let mut scratch = [0u8; 32];
        stream_device.request(32, &mut scratch)?;
        handle.stream_data = scratch;
        handle.stream_part = n as u8;
        // Suspension point: yield to the scheduler until the engine has
        // fully delivered this 32-byte block.
        while stream_device.progress()? != 0 {}
        out[..n].copy_from_slice(&handle.stream_data[..n]);
    }

    advance(out, handle, n);
    if handle.pos >= handle.size {
        stream.abort(stream_device)?;
    }
    Ok(n)
}

fn advance(out: &mut &mut [u8], handle: &mut Handle, n: usize) {
    let taken = core::mem::take(out);
    let (_, rest) = taken.split_at_mut(n);
    *out = rest;
    handle.pos += n as u32;
}
