use std::path::{Path, PathBuf};

use hanpuku_config::{AppConfig, ConfigError, ExtractionConfig};
use hanpuku_engine::{ResultEnvelope, options::ExtractOptions};
use hanpuku_io::{DocumentLoader, DocumentSaver, SnapshotFacade, write_packet};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

const USAGE: &str =
    "用法：hanpuku [--config <path>] [--write-back <path>] [--out <path>] <snapshot.json>";

struct CliArgs {
    config: Option<PathBuf>,
    write_back: Option<PathBuf>,
    out: Option<PathBuf>,
    snapshot: PathBuf,
}

fn main() {
    let args = parse_args();
    let config = load_configuration(args.config.clone());
    init_logging(&config);
    info!(snapshot = %args.snapshot.display(), "启动 hanpuku 文档提取");

    let options = extract_options(&config.extraction);
    let facade = SnapshotFacade::new();
    let (envelope, app) = match facade.load(&args.snapshot) {
        Ok(mut app) => (ResultEnvelope::run(&mut app, &options), Some(app)),
        Err(err) => {
            let mut envelope = ResultEnvelope::new();
            envelope.log_failure(&err);
            (envelope, None)
        }
    };

    if let (Some(path), Some(app)) = (&args.write_back, &app) {
        if let Err(err) = facade.save(app, path) {
            error!(path = %path.display(), error = %err, "写回宿主快照失败");
        }
    }

    if !emit_packet(&envelope, args.out.as_deref(), config.output.pretty) {
        std::process::exit(2);
    }
    if !envelope.is_success() {
        std::process::exit(1);
    }
}

fn parse_args() -> CliArgs {
    let mut args = std::env::args().skip(1);
    let mut config = None;
    let mut write_back = None;
    let mut out = None;
    let mut snapshot = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config = Some(required_value(&mut args, "--config")),
            "--write-back" => write_back = Some(required_value(&mut args, "--write-back")),
            "--out" => out = Some(required_value(&mut args, "--out")),
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other if other.starts_with("--") => {
                eprintln!("未知参数：{other}");
                eprintln!("{USAGE}");
                std::process::exit(1);
            }
            other => {
                if snapshot.is_some() {
                    eprintln!("只能指定一个快照文件：{other}");
                    std::process::exit(1);
                }
                snapshot = Some(PathBuf::from(other));
            }
        }
    }

    let Some(snapshot) = snapshot else {
        eprintln!("{USAGE}");
        std::process::exit(1);
    };
    CliArgs {
        config,
        write_back,
        out,
        snapshot,
    }
}

fn required_value(args: &mut impl Iterator<Item = String>, flag: &str) -> PathBuf {
    let Some(value) = args.next() else {
        eprintln!("`{flag}` 需要提供文件路径");
        std::process::exit(1);
    };
    PathBuf::from(value)
}

fn extract_options(config: &ExtractionConfig) -> ExtractOptions {
    ExtractOptions {
        tag_prefix: config.tag_prefix.clone(),
        default_tag_value: config.default_tag_value.clone(),
        z_order_fallback: config.z_order_fallback,
        absorb_z_order_faults: config.absorb_z_order_faults,
        warn_unsupported_color: config.warn_unsupported_color,
    }
}

/// 输出结果封包。返回 `false` 表示封包没能送达。
fn emit_packet(envelope: &ResultEnvelope, out: Option<&Path>, pretty: bool) -> bool {
    match out {
        Some(path) => match write_packet(envelope, path, pretty) {
            Ok(()) => {
                info!(path = %path.display(), "结果封包已写入");
                true
            }
            Err(err) => {
                error!(path = %path.display(), error = %err, "写入结果封包失败");
                false
            }
        },
        None => {
            if pretty {
                println!("{}", envelope.json_packet_pretty());
            } else {
                println!("{}", envelope.json_packet());
            }
            true
        }
    }
}

fn load_configuration(override_path: Option<PathBuf>) -> AppConfig {
    match override_path {
        Some(path) => AppConfig::from_file(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "加载指定配置失败，使用默认配置");
            AppConfig::default()
        }),
        None => match AppConfig::discover() {
            Ok(cfg) => cfg,
            Err(err) => {
                match &err {
                    ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
                        warn!(path = %path.display(), error = %err, "加载默认配置失败，使用内建默认值");
                    }
                    ConfigError::Context { .. } => {
                        warn!(error = %err, "加载默认配置失败，使用内建默认值");
                    }
                }
                AppConfig::default()
            }
        },
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    // 标准输出只留给结果封包
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
