pub mod cpu;
pub mod disk;
pub mod memory;

use cpu::CpuSample;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemorySnapshot {
    pub total_mb: u64,
    pub free_mb: u64,
    pub avail_mb: u64,
    pub free: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiskSnapshot {
    pub size_gb: u64,
    pub used_gb: u64,
    pub free: u64,
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("не удалось прочитать {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("некорректные данные в {path}: {reason}")]
    Malformed { path: String, reason: String },
}

pub trait HostProbe {
    fn cpu_sample(&mut self) -> Result<CpuSample, ReadError>;
    fn memory(&mut self) -> Result<MemorySnapshot, ReadError>;
    fn disk(&mut self, volume: &str) -> Result<DiskSnapshot, ReadError>;
}

pub struct LocalHost {
    proc_root: PathBuf,
}

impl LocalHost {
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }
}

impl HostProbe for LocalHost {
    fn cpu_sample(&mut self) -> Result<CpuSample, ReadError> {
        cpu::take_sample(&self.proc_root.join("stat"))
    }

    fn memory(&mut self) -> Result<MemorySnapshot, ReadError> {
        memory::read_memory(&self.proc_root.join("meminfo"))
    }

    fn disk(&mut self, volume: &str) -> Result<DiskSnapshot, ReadError> {
        disk::read_disk(volume)
    }
}
