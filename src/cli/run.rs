//! Entry point: parses args, loads configuration, wires up the engine and
//! scheduler, and dispatches to a command handler. Owns all process exit
//! code decisions; `main.rs` only calls `std::process::exit`.

use super::args::{Cli, Commands, ScheduleCommands};
use super::commands;
use aiscout_cache::TtlCache;
use aiscout_config::Config;
use aiscout_http::HttpClient;
use aiscout_llm::Classifier;
use aiscout_pipeline::PipelineEngine;
use aiscout_scheduler::Scheduler;
use aiscout_sink::IncrementalSink;
use aiscout_store::ProjectStore;
use aiscout_translate::Translator;
use aiscout_utils::{exit_codes, logging::LogFormat};
use camino::Utf8PathBuf;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

/// Everything a command handler needs, built once from the loaded config.
pub struct Context {
    pub config: Config,
    pub engine: Arc<PipelineEngine>,
    pub scheduler: Arc<Scheduler>,
    pub store: Arc<ProjectStore>,
    pub sink: Arc<IncrementalSink>,
}

pub async fn run() -> i32 {
    let cli = Cli::parse();

    aiscout_utils::logging::init(if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Human
    });

    let config_path = match Utf8PathBuf::from_path_buf(cli.config.clone()) {
        Ok(p) => p,
        Err(_) => {
            eprintln!("--config path must be valid UTF-8");
            return exit_codes::CONFIG_INVALID;
        }
    };

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load configuration from {config_path}: {e}");
            return exit_codes::CONFIG_INVALID;
        }
    };

    let ctx = match build_context(config) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("failed to initialize: {e}");
            return exit_codes::CONFIG_INVALID;
        }
    };

    match cli.command {
        Commands::Fetch { source, json } => commands::fetch(&ctx, &source, json).await,
        Commands::Schedule(ScheduleCommands::Once { json }) => {
            commands::schedule_once(&ctx, json).await
        }
        Commands::Schedule(ScheduleCommands::Serve) => commands::schedule_serve(&ctx).await,
        Commands::Status { json } => commands::status(&ctx, json),
        Commands::Digest { source, date } => commands::digest(&ctx, &source, date.as_deref()),
    }
}

fn build_context(config: Config) -> anyhow::Result<Context> {
    let http = HttpClient::with_timeout(
        &config.global_settings.user_agent,
        Duration::from_secs(config.global_settings.request_timeout),
    )?
    .with_anti_bot_hosts(config.global_settings.anti_bot_hosts.clone());
    let classifier = Classifier::new(http.clone(), config.llm.clone());
    let translator = Translator::new(http.clone(), config.llm.clone(), config.llm.target_language.clone());

    let output_dir = Utf8PathBuf::from("output");
    aiscout_utils::paths::ensure_dir_all(&output_dir)?;
    let store_path = output_dir.join("projects.json");
    let store = Arc::new(ProjectStore::load(&store_path)?);
    let sink = Arc::new(IncrementalSink::new(output_dir));

    let fetch_cache = Arc::new(TtlCache::new());
    let engine = Arc::new(PipelineEngine::new(
        http,
        classifier,
        translator,
        store.clone(),
        sink.clone(),
        fetch_cache,
        config.global_settings.default_cache_ttl as i64,
    ));

    let scheduler = Arc::new(Scheduler::new(config.clone(), engine.clone()));

    Ok(Context {
        config,
        engine,
        scheduler,
        store,
        sink,
    })
}
