mod error;
mod routes;
mod state;

use std::ffi::OsString;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use clap::{ArgAction, Parser};
use taskdeck_core::cli::{KeyVal, preprocess_args};
use taskdeck_core::config::{self, Config};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskdeck-server",
    version,
    about = "Taskdeck REST API over a JSON task file"
)]
struct Args {
    /// Config file; defaults to $TASKDECKRC or ~/.taskdeckrc.
    #[arg(long = "config")]
    config: Option<PathBuf>,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    rc_overrides: Vec<KeyVal>,

    /// Address to bind, e.g. 127.0.0.1:5001.
    #[arg(long = "listen")]
    listen: Option<String>,

    /// Task file location.
    #[arg(long = "data")]
    data: Option<PathBuf>,
}

fn init_tracing(log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            EnvFilter::try_new(
                "info,taskdeck_server=debug,taskdeck_core=debug,tower_http=debug",
            )
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log dir {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "taskdeck-server.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let init_result = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_line_number(true))
        .with(file_layer)
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(guard)
}

fn load_config(raw_args: Vec<OsString>) -> anyhow::Result<Config> {
    let pre = preprocess_args(&raw_args);
    let args = Args::parse_from(pre.cleaned_args);

    let mut cfg = Config::load(args.config.as_deref())?;
    cfg.apply_overrides(
        pre.rc_overrides
            .into_iter()
            .chain(args.rc_overrides.into_iter().map(|kv| (kv.key, kv.value))),
    );

    if let Some(listen) = args.listen {
        cfg.apply_overrides([("server.listen".to_string(), listen)]);
    }
    if let Some(data) = args.data {
        cfg.apply_overrides([(
            "data.location".to_string(),
            data.to_string_lossy().to_string(),
        )]);
    }

    Ok(cfg)
}

async fn serve(cfg: Config) -> anyhow::Result<()> {
    let listen = cfg
        .get("server.listen")
        .unwrap_or_else(|| config::DEFAULT_LISTEN.to_string());
    let addr: SocketAddr = listen
        .parse()
        .map_err(|err| anyhow!("invalid server.listen {listen:?}: {err}"))?;

    let data_file = cfg
        .get_path("data.location")
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_DATA_LOCATION));
    let origins = cfg.get_list("cors.origins");

    let state = state::AppState::open(&data_file)?;
    let app = routes::app(state, &origins)?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(
        addr = %addr,
        data = %data_file.display(),
        cors_origins = ?origins,
        "taskdeck server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .context("server error")?;

    info!("taskdeck server stopped");
    Ok(())
}

#[tokio::main]
async fn main() {
    let cfg = match load_config(std::env::args_os().collect()) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    };

    let _guard = match init_tracing(cfg.get_path("log.dir").as_deref()) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    };

    info!(config_files = ?cfg.loaded_files, "starting taskdeck server");

    if let Err(err) = serve(cfg).await {
        error!(error = %format!("{err:#}"), "server failed");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(error) => {
            error!(%error, "failed to register SIGTERM handler; falling back to ctrl_c");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => warn!("received SIGINT; shutting down"),
        _ = sigterm.recv() => warn!("received SIGTERM; shutting down"),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    warn!("received ctrl_c; shutting down");
}
