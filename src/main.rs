//! msgreader main entry point
//!
//! Reads one batch of message fragments (JSON, from a file or stdin) and
//! speaks it through the configured speech engine.
//!
//! Usage: msgreader [--debug] [--config PATH] [--alerts-json] [--list-languages] [FILE]

use anyhow::{bail, Context};
use log::{error, info};
use msgreader::alert::{AlertSink, DesktopAlertSink, JsonAlertSink, LogAlertSink};
use msgreader::catalogue::speakable_languages;
use msgreader::config::{AlertTarget, Config};
use msgreader::contacts::IniContacts;
use msgreader::keepalive::KeepAlive;
use msgreader::logging::LogTag;
use msgreader::message::parse_batch;
use msgreader::pipeline::{Pipeline, ReaderService};
use msgreader::platform::SystemEnvironment;
use msgreader::speech::language::CANDIDATE_LANGUAGES;
use msgreader::speech::{create_engine, BackendFactory};
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

/// Parsed command line
struct Args {
    debug: bool,
    config: Option<PathBuf>,
    alerts_json: bool,
    list_languages: bool,
    input: Option<PathBuf>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        debug: false,
        config: None,
        alerts_json: false,
        list_languages: false,
        input: None,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--debug" | "-d" => args.debug = true,
            "--alerts-json" => args.alerts_json = true,
            "--list-languages" => args.list_languages = true,
            "--config" | "-c" => {
                let path = iter.next().context("--config needs a path")?;
                args.config = Some(PathBuf::from(path));
            }
            flag if flag.starts_with('-') && flag != "-" => bail!("unknown option {}", flag),
            "-" => args.input = None,
            path => args.input = Some(PathBuf::from(path)),
        }
    }

    Ok(args)
}

fn init_logging(debug_mode: bool) {
    if debug_mode {
        // Debug mode: write to msgreader.log
        use std::fs::OpenOptions;
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open("msgreader.log")
        {
            Ok(log_file) => {
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Debug)
                    .target(env_logger::Target::Pipe(Box::new(log_file)))
                    .init();
            }
            Err(e) => {
                eprintln!("Warning: Failed to open msgreader.log for debug logging: {}", e);
                eprintln!("Continuing without file logging...");
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Warn)
                    .init();
            }
        }

        info!(
            "msgreader version {} starting (debug mode, logging to msgreader.log)",
            msgreader::VERSION
        );
    } else {
        // Normal mode: errors only, unless RUST_LOG says otherwise
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Error)
            .parse_default_env()
            .init();
    }
}

fn main() {
    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Usage: msgreader [--debug] [--config PATH] [--alerts-json] [--list-languages] [FILE]");
            process::exit(1);
        }
    };

    init_logging(args.debug);

    if let Err(e) = run(args) {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

#[cfg(target_os = "linux")]
fn keep_alive() -> Arc<dyn KeepAlive> {
    Arc::new(msgreader::keepalive::InhibitKeepAlive::new())
}

#[cfg(not(target_os = "linux"))]
fn keep_alive() -> Arc<dyn KeepAlive> {
    Arc::new(msgreader::keepalive::NoopKeepAlive)
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("loading configuration")?;
    info!("Configuration loaded from {:?}", config.path());

    let alerts: Arc<dyn AlertSink> = if args.alerts_json {
        Arc::new(JsonAlertSink::new(io::stdout()))
    } else {
        match config.alert_target() {
            AlertTarget::Desktop => Arc::new(DesktopAlertSink::new()),
            AlertTarget::Log => Arc::new(LogAlertSink),
        }
    };

    let tag = LogTag::new(msgreader::APP_NAME);

    if args.list_languages {
        let languages = speakable_languages(
            create_engine(config.backend()),
            CANDIDATE_LANGUAGES,
            alerts.as_ref(),
            &tag,
        );
        for entry in languages {
            println!("{}\t{}", entry.code, entry.display_name);
        }
        return Ok(());
    }

    let input = match &args.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("reading stdin")?;
            buf
        }
    };
    let batch = parse_batch(&input).context("parsing message batch")?;

    let pipeline = Pipeline::new(
        Arc::new(BackendFactory(config.backend())),
        Arc::new(SystemEnvironment::new()),
        alerts,
        Arc::new(IniContacts::new(config.contacts.clone())),
    )
    .with_log_tag(tag);

    let keep_alive = keep_alive();
    let service = ReaderService::new(pipeline, keep_alive);

    let outcome = service
        .submit(batch, config.settings())
        .context("starting worker")?
        .join()
        .map_err(|_| anyhow::anyhow!("worker thread panicked"))?;

    info!("Outcome: {:?}", outcome);
    if !args.alerts_json {
        println!("{:?}", outcome);
    }
    Ok(())
}
