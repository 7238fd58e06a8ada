mod analyze;
mod cli;
mod devices;
mod error_fmt;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use clap::Parser;
use eyre::{Result, WrapErr};
use froth_config::Config;
use froth_core::error::FrothError;
use froth_core::{Cycle, FrothMetrics, System, SystemStatus};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let json = cli.json;
    let _ = JSON_MODE.set(json);
    if !json {
        let _ = color_eyre::install();
    }

    if let Err(err) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> Result<()> {
    let cfg = load_config(&cli.config)?;
    init_tracing(&cli, &cfg)?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::Run {
            duration_s,
            auto,
            report_every_s,
        } => run(&cfg, duration_s, auto, report_every_s, cli.json),
        Commands::Analyze { image } => {
            let report = analyze::analyze_file(&image, &cfg)?;
            analyze::print_report(&report, cli.json)
        }
        Commands::SelfCheck => self_check(&cfg, cli.json),
    }
}

fn load_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = froth_config::load_toml(&text)
        .map_err(|e| eyre::eyre!(FrothError::Config(e.to_string())))
        .wrap_err("parse config")?;
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(cfg)
}

fn init_tracing(cli: &Cli, cfg: &Config) -> Result<()> {
    // RUST_LOG wins over --log-level, which wins over [logging].level.
    let level = if cli.log_level == "info" {
        cfg.logging.level.clone().unwrap_or_else(|| cli.log_level.clone())
    } else {
        cli.log_level.clone()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (pretty, json) = if cli.json {
        (None, Some(fmt::layer().json().with_writer(std::io::stderr)))
    } else {
        (Some(fmt::layer().with_writer(std::io::stderr)), None)
    };

    let file = match cfg.logging.file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name"))?;
            let appender = match cfg.logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .with(file)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}

fn build_system(cfg: &Config) -> Result<System> {
    let devices = devices::open(cfg)?;
    let mut builder = System::builder()
        .with_config(cfg)
        .with_camera(devices.camera)
        .with_pwm(devices.pwm);
    if let Some(estop) = devices.estop {
        builder = builder.with_estop(estop);
    }
    Ok(builder.build()?)
}

#[derive(Serialize)]
struct Snapshot {
    status: SystemStatus,
    metrics: FrothMetrics,
}

fn report(sys: &System, json: bool) -> Result<()> {
    let snap = Snapshot {
        status: sys.status(),
        metrics: sys.metrics(),
    };
    if json {
        println!("{}", serde_json::to_string(&snap)?);
        return Ok(());
    }
    let (s, m) = (&snap.status, &snap.metrics);
    println!(
        "mode={} pump={:.1}% agitator={:.1}% air={:.1}% feed={:.1}% estop={} running={}",
        s.pump_mode,
        s.pump_duty,
        s.motors.agitator,
        s.motors.air,
        s.motors.feed,
        s.estop_triggered,
        s.running
    );
    if m.available {
        println!(
            "bubbles={} avg_size={:.1} coverage={:.3} stability={:.3}",
            m.bubble_count, m.avg_bubble_size, m.froth_coverage, m.froth_stability
        );
    } else {
        println!("metrics: not yet available");
    }
    Ok(())
}

fn run(cfg: &Config, duration_s: Option<f64>, auto: bool, report_every_s: f64, json: bool) -> Result<()> {
    let sys = build_system(cfg)?;
    if auto {
        sys.set_mode("auto")?;
    }

    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
        .wrap_err("install Ctrl-C handler")?;

    sys.start()?;
    let started = Instant::now();
    let deadline = duration_s
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(Duration::from_secs_f64);
    let report_every = (report_every_s.is_finite() && report_every_s > 0.0)
        .then(|| Duration::from_secs_f64(report_every_s));
    let mut last_report = Instant::now();

    while !stop.load(Ordering::Relaxed) {
        if deadline.is_some_and(|d| started.elapsed() >= d) {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
        if let Some(every) = report_every
            && last_report.elapsed() >= every
        {
            report(&sys, json)?;
            last_report = Instant::now();
        }
    }

    tracing::info!(elapsed_s = started.elapsed().as_secs_f64(), "stopping");
    sys.shutdown();
    report(&sys, json)
}

fn self_check(cfg: &Config, json: bool) -> Result<()> {
    let sys = build_system(cfg)?;
    let metrics = match sys.run_metrics_once() {
        Cycle::Published(m) => m,
        Cycle::Held(why) => {
            sys.shutdown();
            return Err(eyre::eyre!(FrothError::Camera(format!("{why:?}"))));
        }
    };
    let tick = sys.run_control_once();
    let status = sys.status();
    sys.shutdown();

    if json {
        println!(
            "{}",
            serde_json::json!({
                "ok": true,
                "frame": { "bubbles": metrics.bubble_count, "coverage": metrics.froth_coverage },
                "estop": { "enabled": status.estop_enabled, "triggered": status.estop_triggered, "poll": format!("{:?}", tick.poll) },
            })
        );
    } else {
        println!("camera: ok ({} bubbles)", metrics.bubble_count);
        println!(
            "estop: {} ({:?})",
            if status.estop_triggered { "TRIGGERED" } else { "clear" },
            tick.poll
        );
        println!("OK");
    }
    Ok(())
}
