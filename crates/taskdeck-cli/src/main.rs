mod api;
mod board;
mod cache;
mod cli;
mod commands;
mod render;

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use taskdeck_core::config::{self, Config};
use tracing::{debug, info};

use crate::api::HttpTaskApi;
use crate::board::TaskBoard;
use crate::cache::LocalCache;

#[tracing::instrument(skip_all)]
async fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let pre = taskdeck_core::cli::preprocess_args(&raw_args);
    let cli = cli::GlobalCli::parse_from(pre.cleaned_args);

    taskdeck_core::cli::init_tracing(cli.verbose, cli.quiet)?;
    debug!(?pre.rc_overrides, "preprocessed rc overrides");

    let mut cfg = Config::load(cli.config.as_deref())?;
    cfg.apply_overrides(
        pre.rc_overrides
            .into_iter()
            .chain(cli.rc_overrides.into_iter().map(|kv| (kv.key, kv.value))),
    );
    if let Some(api_url) = cli.api_url {
        cfg.apply_overrides([("api.url".to_string(), api_url)]);
    }

    let api_url = cfg
        .get("api.url")
        .unwrap_or_else(|| config::DEFAULT_API_URL.to_string());
    let timeout = Duration::from_secs(cfg.get_u64("api.timeout")?.unwrap_or(5));
    let cache_path = match cli.cache {
        Some(path) => path,
        None => cfg
            .get_path("cache.location")
            .unwrap_or_else(|| PathBuf::from("taskdeck-cache.json")),
    };

    let api = HttpTaskApi::new(&api_url, timeout)?;
    info!(
        api_url = api.base_url(),
        cache = %cache_path.display(),
        "starting taskdeck client"
    );

    let mut board = TaskBoard::open(api, LocalCache::new(cache_path));
    let renderer = render::Renderer::new(&cfg);
    let command = cli.command.unwrap_or_default();

    let mut out = std::io::stdout().lock();
    commands::dispatch(&mut board, &renderer, &mut out, command)
        .await
        .context("command failed")?;

    info!("done");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args: Vec<OsString> = std::env::args_os().collect();
    if let Err(err) = run(args).await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
