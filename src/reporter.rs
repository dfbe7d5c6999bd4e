use crate::collectors::cpu::{compute_utilization, CpuSample};
use crate::collectors::{HostProbe, ReadError};
use crate::config::Config;
use crate::record::{build_record, MetricsRecord};
use crate::transport::{Transport, TransportError};
use std::convert::Infallible;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const WARMUP: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub sample: CpuSample,
    pub record: MetricsRecord,
}

pub struct Reporter<P, T> {
    probe: P,
    transport: T,
    hostname: String,
    volumes: Vec<String>,
    warmup: Duration,
    interval: Duration,
}

impl<P: HostProbe, T: Transport> Reporter<P, T> {
    pub fn new(cfg: &Config, probe: P, transport: T) -> Self {
        Self {
            probe,
            transport,
            hostname: cfg.hostname.clone(),
            volumes: cfg.volumes.clone(),
            warmup: WARMUP,
            interval: cfg.interval(),
        }
    }

    #[cfg(test)]
    fn with_delays(mut self, warmup: Duration, interval: Duration) -> Self {
        self.warmup = warmup;
        self.interval = interval;
        self
    }

    pub async fn bootstrap(&mut self) -> Result<CpuSample, CycleError> {
        let sample = self.probe.cpu_sample()?;
        tokio::time::sleep(self.warmup).await;
        Ok(sample)
    }

    pub async fn cycle(&mut self, previous: CpuSample) -> Result<CycleReport, CycleError> {
        let sample = self.probe.cpu_sample()?;
        let cpu = match compute_utilization(previous, sample) {
            Ok(v) => v,
            Err(err) => {
                warn!(error = %err, ?previous, current = ?sample, "загрузка CPU принята за 0");
                0
            }
        };

        let memory = self.probe.memory()?;
        let mut disks = Vec::with_capacity(self.volumes.len());
        for volume in &self.volumes {
            disks.push((volume.clone(), self.probe.disk(volume)?));
        }

        let record = build_record(&self.hostname, cpu, memory, &disks);
        debug!(message = %record.message, "отправка отчёта");

        let response = self.transport.send(&record).await?;
        info!(message = %record.message, response = %response, "отчёт отправлен");

        Ok(CycleReport { sample, record })
    }

    pub async fn run(mut self) -> Result<Infallible, CycleError> {
        let mut previous = self.bootstrap().await?;
        loop {
            let report = self.cycle(previous).await?;
            previous = report.sample;
            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::{DiskSnapshot, MemorySnapshot};
    use crate::config::PartialConfig;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    fn sample(idle: u64, total: u64) -> CpuSample {
        CpuSample {
            idle_ticks: idle,
            total_ticks: total,
        }
    }

    #[derive(Default)]
    struct ScriptedProbe {
        samples: VecDeque<CpuSample>,
        disks: HashMap<String, DiskSnapshot>,
        reads: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedProbe {
        fn new(samples: &[CpuSample]) -> Self {
            let mut disks = HashMap::new();
            disks.insert(
                "/".to_string(),
                DiskSnapshot {
                    size_gb: 100,
                    used_gb: 20,
                    free: 80,
                },
            );
            disks.insert(
                "/data".to_string(),
                DiskSnapshot {
                    size_gb: 200,
                    used_gb: 110,
                    free: 45,
                },
            );
            Self {
                samples: samples.iter().copied().collect(),
                disks,
                reads: Arc::default(),
            }
        }
    }

    impl HostProbe for ScriptedProbe {
        fn cpu_sample(&mut self) -> Result<CpuSample, ReadError> {
            self.reads.lock().unwrap().push("cpu".to_string());
            self.samples.pop_front().ok_or_else(|| ReadError::Malformed {
                path: "/proc/stat".to_string(),
                reason: "замеры закончились".to_string(),
            })
        }

        fn memory(&mut self) -> Result<MemorySnapshot, ReadError> {
            self.reads.lock().unwrap().push("memory".to_string());
            Ok(MemorySnapshot {
                total_mb: 2048,
                free_mb: 512,
                avail_mb: 1024,
                free: 25,
            })
        }

        fn disk(&mut self, volume: &str) -> Result<DiskSnapshot, ReadError> {
            self.reads.lock().unwrap().push(format!("disk {volume}"));
            self.disks
                .get(volume)
                .copied()
                .ok_or_else(|| ReadError::Io {
                    path: volume.to_string(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                })
        }
    }

    #[derive(Clone, Default)]
    struct RecordingTransport {
        sent: Arc<Mutex<Vec<MetricsRecord>>>,
        fail_after: Option<usize>,
    }

    impl Transport for RecordingTransport {
        async fn send(&self, record: &MetricsRecord) -> Result<String, TransportError> {
            let mut sent = self.sent.lock().unwrap();
            if self.fail_after.is_some_and(|n| sent.len() >= n) {
                let encode_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
                return Err(TransportError::Encode(encode_err));
            }
            sent.push(record.clone());
            Ok(format!("accepted {}", sent.len()))
        }
    }

    fn config(volumes: &[&str]) -> Config {
        let cli = PartialConfig {
            interval_secs: Some(1),
            hostname: Some("h1".to_string()),
            volumes: volumes.iter().map(|v| v.to_string()).collect(),
            ..PartialConfig::default()
        };
        Config::resolve(PartialConfig::default(), cli).unwrap()
    }

    fn reporter(
        volumes: &[&str],
        probe: ScriptedProbe,
        transport: RecordingTransport,
    ) -> Reporter<ScriptedProbe, RecordingTransport> {
        Reporter::new(&config(volumes), probe, transport)
            .with_delays(Duration::ZERO, Duration::ZERO)
    }

    #[test]
    fn new_uses_configured_interval_and_fixed_warmup() {
        let r = Reporter::new(
            &config(&["/"]),
            ScriptedProbe::default(),
            RecordingTransport::default(),
        );
        assert_eq!(r.interval, Duration::from_secs(1));
        assert_eq!(r.warmup, WARMUP);
    }

    #[tokio::test]
    async fn first_cycle_reports_delta_against_bootstrap_sample() {
        let probe = ScriptedProbe::new(&[sample(1_000, 4_000), sample(1_150, 4_200)]);
        let transport = RecordingTransport::default();
        let mut r = reporter(&["/"], probe, transport.clone());

        let previous = r.bootstrap().await.expect("bootstrap");
        let report = r.cycle(previous).await.expect("цикл");

        assert_eq!(report.record.metric.cpu.total, 25);
        assert_eq!(report.record.hostname, "h1");
        assert_eq!(report.record.tag, "cluster_watch");
        assert_eq!(report.sample, sample(1_150, 4_200));
        assert_eq!(
            report.record.message,
            "host: h1, CPU usage: 25%, disk / 80% free"
        );
        assert_eq!(transport.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reads_happen_before_send_in_configured_order() {
        let probe = ScriptedProbe::new(&[sample(0, 0), sample(50, 100)]);
        let reads = probe.reads.clone();
        let transport = RecordingTransport::default();
        let mut r = reporter(&["/data", "/"], probe, transport.clone());

        let previous = r.bootstrap().await.unwrap();
        let report = r.cycle(previous).await.unwrap();

        assert_eq!(
            *reads.lock().unwrap(),
            vec!["cpu", "cpu", "memory", "disk /data", "disk /"]
        );
        assert_eq!(
            report.record.message,
            "host: h1, CPU usage: 50%, disk /data 45% free, disk / 80% free"
        );
    }

    #[tokio::test]
    async fn identical_samples_report_zero() {
        let probe = ScriptedProbe::new(&[sample(10, 100), sample(10, 100)]);
        let mut r = reporter(&["/"], probe, RecordingTransport::default());

        let previous = r.bootstrap().await.unwrap();
        let report = r.cycle(previous).await.expect("без тиков цикл не падает");
        assert_eq!(report.record.metric.cpu.total, 0);
    }

    #[tokio::test]
    async fn disk_failure_aborts_cycle_before_send() {
        let probe = ScriptedProbe::new(&[sample(0, 0), sample(50, 100)]);
        let transport = RecordingTransport::default();
        let mut r = reporter(&["/", "/missing"], probe, transport.clone());

        let previous = r.bootstrap().await.unwrap();
        let err = r.cycle(previous).await.expect_err("том не читается");

        assert!(matches!(err, CycleError::Read(ReadError::Io { .. })));
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn run_threads_previous_sample_between_cycles() {
        let probe = ScriptedProbe::new(&[
            sample(0, 0),
            sample(50, 100),
            sample(60, 200),
            sample(160, 300),
        ]);
        let transport = RecordingTransport::default();
        let r = reporter(&["/"], probe, transport.clone());

        let err = match r.run().await {
            Ok(never) => match never {},
            Err(err) => err,
        };
        assert!(matches!(err, CycleError::Read(ReadError::Malformed { .. })));

        let cpu: Vec<i64> = transport
            .sent
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.metric.cpu.total)
            .collect();
        assert_eq!(cpu, vec![50, 90, 0]);
    }

    #[tokio::test]
    async fn run_stops_on_first_transport_failure() {
        let probe = ScriptedProbe::new(&[sample(0, 0), sample(50, 100), sample(60, 200)]);
        let reads = probe.reads.clone();
        let transport = RecordingTransport {
            fail_after: Some(0),
            ..RecordingTransport::default()
        };
        let r = reporter(&["/"], probe, transport);

        let result = r.run().await;
        assert!(matches!(result, Err(CycleError::Transport(_))));
        assert_eq!(
            reads.lock().unwrap().iter().filter(|r| *r == "cpu").count(),
            2
        );
    }

    #[tokio::test]
    async fn bootstrap_read_failure_is_reported() {
        let r = reporter(&["/"], ScriptedProbe::new(&[]), RecordingTransport::default());
        assert!(matches!(r.run().await, Err(CycleError::Read(_))));
    }
}
