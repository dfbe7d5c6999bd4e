mod collectors;
mod config;
mod record;
mod reporter;
mod transport;

use clap::{CommandFactory, Parser};
use collectors::LocalHost;
use config::{Config, ConfigError, LogLevel, PartialConfig};
use reporter::Reporter;
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use transport::LogstashClient;

const LONG_FLAGS: &[&str] = &[
    "logstash",
    "interval",
    "hostname",
    "level",
    "proc-root",
    "config",
    "print-default-config",
    "help",
    "version",
];

#[derive(Parser, Debug)]
#[command(name = "cluster-watch")]
#[command(version)]
#[command(about = "Periodically reports CPU, memory and disk usage to a collector")]
struct Cli {
    #[arg(long, value_name = "URL", help = "Collector endpoint [default: http://logstash:31311]")]
    logstash: Option<String>,
    #[arg(long, value_name = "SECONDS", help = "Seconds between reports [default: 60]")]
    interval: Option<u64>,
    #[arg(long, help = "Host label attached to every report (required)")]
    hostname: Option<String>,
    #[arg(long, value_enum, ignore_case = true, help = "Minimum log level [default: INFO]")]
    level: Option<LogLevel>,
    #[arg(long, value_name = "DIR", help = "Directory holding stat and meminfo [default: /proc]")]
    proc_root: Option<PathBuf>,
    #[arg(long, value_name = "FILE", help = "YAML file with the same settings")]
    config: Option<PathBuf>,
    #[arg(long)]
    print_default_config: bool,
    #[arg(value_name = "VOLUME", help = "Mount paths to report on [default: /]")]
    volumes: Vec<String>,
}

impl Cli {
    fn overrides(&self) -> PartialConfig {
        PartialConfig {
            logstash: self.logstash.clone(),
            interval_secs: self.interval,
            hostname: self.hostname.clone(),
            level: self.level,
            proc_root: self.proc_root.clone(),
            volumes: self.volumes.clone(),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse_from(normalize_go_flags(std::env::args_os()));
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    let cfg = match load_config(&cli) {
        Ok(cfg) => cfg,
        Err(ConfigError::MissingHostname) => {
            eprintln!("{}", ConfigError::MissingHostname);
            eprintln!("{}", usage());
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    init_tracing(cfg.level);
    info!(
        logstash = %cfg.logstash,
        interval = %humantime::format_duration(cfg.interval()),
        hostname = %cfg.hostname,
        volumes = ?cfg.volumes,
        "запуск cluster-watch"
    );

    let probe = LocalHost::new(&cfg.proc_root);
    let transport = LogstashClient::new(cfg.logstash.clone());
    let reporter = Reporter::new(&cfg, probe, transport);

    tokio::select! {
        result = reporter.run() => {
            let err = match result {
                Ok(never) => match never {},
                Err(err) => err,
            };
            error!(error = %err, "цикл отчётов остановлен");
            std::process::exit(1);
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(err) = signal {
                error!(error = %err, "не удалось дождаться Ctrl+C");
            }
            info!("получен Ctrl+C, выполняется остановка");
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config, ConfigError> {
    let file = match &cli.config {
        Some(path) => PartialConfig::load_from_file(path)?,
        None => PartialConfig::default(),
    };
    Config::resolve(file, cli.overrides())
}

fn init_tracing(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.filter_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn usage() -> String {
    format!(
        "{}\nExample: cluster-watch -hostname MyServer -logstash http://logstash:31311 -interval 60 -level INFO / /mount/disk",
        Cli::command().render_usage()
    )
}

fn normalize_go_flags(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    let mut passthrough = false;
    args.into_iter()
        .enumerate()
        .map(|(i, arg)| {
            if i == 0 || passthrough {
                return arg;
            }
            if arg == "--" {
                passthrough = true;
                return arg;
            }
            match arg.to_str() {
                Some(s) if is_go_long_flag(s) => OsString::from(format!("-{s}")),
                _ => arg,
            }
        })
        .collect()
}

fn is_go_long_flag(arg: &str) -> bool {
    let Some(rest) = arg.strip_prefix('-') else {
        return false;
    };
    if rest.starts_with('-') {
        return false;
    }
    let name = rest.split_once('=').map_or(rest, |(name, _)| name);
    LONG_FLAGS.contains(&name)
}
