use crate::collectors::{MemorySnapshot, ReadError};
use std::fs;
use std::path::Path;

const KB_PER_MB: u64 = 1024;

pub fn read_memory(meminfo_path: &Path) -> Result<MemorySnapshot, ReadError> {
    let text = fs::read_to_string(meminfo_path).map_err(|source| ReadError::Io {
        path: meminfo_path.display().to_string(),
        source,
    })?;
    parse_meminfo(&text).map_err(|reason| ReadError::Malformed {
        path: meminfo_path.display().to_string(),
        reason,
    })
}

pub fn parse_meminfo(text: &str) -> Result<MemorySnapshot, String> {
    let mut total_kb = None;
    let mut free_kb = None;
    let mut avail_kb = None;

    for line in text.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let slot = match key.trim() {
            "MemTotal" => &mut total_kb,
            "MemFree" => &mut free_kb,
            "MemAvailable" => &mut avail_kb,
            _ => continue,
        };
        let value = rest.split_whitespace().next().unwrap_or_default();
        let parsed = value
            .parse::<u64>()
            .map_err(|_| format!("{}: '{value}' не является числом", key.trim()))?;
        *slot = Some(parsed);
    }

    let total_kb = total_kb.ok_or_else(|| "нет поля MemTotal".to_string())?;
    let free_kb = free_kb.ok_or_else(|| "нет поля MemFree".to_string())?;
    // MemAvailable appeared in 3.14
    let avail_kb = avail_kb.unwrap_or(free_kb);

    let free = free_percent(total_kb, free_kb).ok_or_else(|| "MemTotal равен 0".to_string())?;

    Ok(MemorySnapshot {
        total_mb: total_kb / KB_PER_MB,
        free_mb: free_kb / KB_PER_MB,
        avail_mb: avail_kb / KB_PER_MB,
        free,
    })
}

pub fn free_percent(total: u64, free: u64) -> Option<u64> {
    if total == 0 {
        return None;
    }
    let pct = u128::from(free) * 100 / u128::from(total);
    Some(u64::try_from(pct).unwrap_or(u64::MAX))
}
