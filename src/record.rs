use crate::collectors::{DiskSnapshot, MemorySnapshot};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

pub const TAG: &str = "cluster_watch";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsRecord {
    pub tag: &'static str,
    pub hostname: String,
    pub metric: Metric,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub cpu: CpuUsage,
    pub memory: MemorySnapshot,
    pub disks: BTreeMap<String, DiskSnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CpuUsage {
    pub total: i64,
}

pub fn build_record(
    hostname: &str,
    cpu: i64,
    memory: MemorySnapshot,
    disks: &[(String, DiskSnapshot)],
) -> MetricsRecord {
    MetricsRecord {
        tag: TAG,
        hostname: hostname.to_string(),
        metric: Metric {
            cpu: CpuUsage { total: cpu },
            memory,
            disks: disks.iter().cloned().collect(),
        },
        message: summary_message(hostname, cpu, disks),
    }
}

pub fn summary_message(hostname: &str, cpu: i64, disks: &[(String, DiskSnapshot)]) -> String {
    let mut message = format!("host: {hostname}, CPU usage: {cpu}%");
    for (volume, disk) in disks {
        let _ = write!(message, ", disk {volume} {}% free", disk.free);
    }
    message
}
