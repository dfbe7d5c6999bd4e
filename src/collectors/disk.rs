use crate::collectors::{DiskSnapshot, ReadError};
use nix::sys::statvfs::statvfs;
use tracing::debug;

const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

pub fn read_disk(volume: &str) -> Result<DiskSnapshot, ReadError> {
    let stat = statvfs(volume).map_err(|errno| ReadError::Io {
        path: volume.to_string(),
        source: std::io::Error::from(errno),
    })?;

    let (total, used) = usage_bytes(
        stat.blocks() as u64,
        stat.blocks_free() as u64,
        stat.fragment_size() as u64,
    );
    debug!(volume, total_bytes = total, used_bytes = used, "прочитан том");
    Ok(disk_snapshot(total, used))
}

// Reserved blocks are free space here: used = blocks - bfree.
pub fn usage_bytes(blocks: u64, blocks_free: u64, fragment_size: u64) -> (u64, u64) {
    let total = blocks.saturating_mul(fragment_size);
    let used = blocks
        .saturating_sub(blocks_free)
        .saturating_mul(fragment_size);
    (total, used)
}

pub fn disk_snapshot(total_bytes: u64, used_bytes: u64) -> DiskSnapshot {
    let used_bytes = used_bytes.min(total_bytes);
    let free = if total_bytes == 0 {
        0
    } else {
        let pct = u128::from(total_bytes - used_bytes) * 100 / u128::from(total_bytes);
        pct as u64
    };

    DiskSnapshot {
        size_gb: total_bytes / BYTES_PER_GB,
        used_gb: used_bytes / BYTES_PER_GB,
        free,
    }
}
