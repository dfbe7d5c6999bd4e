use crate::collectors::ReadError;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuSample {
    pub idle_ticks: u64,
    pub total_ticks: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UtilizationError {
    #[error("между замерами CPU не прошло ни одного тика")]
    NoElapsedTicks,
}

pub fn take_sample(stat_path: &Path) -> Result<CpuSample, ReadError> {
    let text = fs::read_to_string(stat_path).map_err(|source| ReadError::Io {
        path: stat_path.display().to_string(),
        source,
    })?;
    parse_stat(&text).map_err(|reason| ReadError::Malformed {
        path: stat_path.display().to_string(),
        reason,
    })
}

// user nice system idle iowait irq softirq steal guest guest_nice; kernels
// before 2.6.33 stop early, so only the first four are required.
pub fn parse_stat(text: &str) -> Result<CpuSample, String> {
    let line = text
        .lines()
        .find(|l| l.split_whitespace().next() == Some("cpu"))
        .ok_or_else(|| "нет строки 'cpu'".to_string())?;

    let fields = line
        .split_whitespace()
        .skip(1)
        .take(10)
        .map(|v| {
            v.parse::<u64>()
                .map_err(|_| format!("поле '{v}' не является числом"))
        })
        .collect::<Result<Vec<u64>, String>>()?;

    if fields.len() < 4 {
        return Err(format!(
            "ожидалось минимум 4 счётчика, получено {}",
            fields.len()
        ));
    }

    Ok(CpuSample {
        idle_ticks: fields[3],
        total_ticks: fields.iter().fold(0_u64, |acc, v| acc.saturating_add(*v)),
    })
}

pub fn compute_utilization(
    previous: CpuSample,
    current: CpuSample,
) -> Result<i64, UtilizationError> {
    let total_delta = i128::from(current.total_ticks) - i128::from(previous.total_ticks);
    if total_delta <= 0 {
        return Err(UtilizationError::NoElapsedTicks);
    }
    let idle_delta = i128::from(current.idle_ticks) - i128::from(previous.idle_ticks);
    let percent = 100 * (total_delta - idle_delta) / total_delta;
    Ok(percent.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64)
}
