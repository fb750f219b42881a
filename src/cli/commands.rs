//! Command implementations.

use super::Context;
use aiscout_pipeline::PipelineRunSummary;
use aiscout_utils::{exit_codes, time::now};

pub async fn fetch(ctx: &Context, source_key: &str, json: bool) -> i32 {
    let Some(source) = ctx.config.source(source_key) else {
        eprintln!("unknown source: {source_key}");
        return exit_codes::CONFIG_INVALID;
    };

    let summary = ctx
        .engine
        .run_source(source_key, source, ctx.config.llm.recent_days)
        .await;
    print_summary(&summary, json);
    exit_code_for(&[summary.success])
}

pub async fn schedule_once(ctx: &Context, json: bool) -> i32 {
    let summaries = ctx.scheduler.run_once().await;
    if summaries.is_empty() {
        eprintln!("no enabled scheduled sources");
        return exit_codes::SUCCESS;
    }
    for summary in &summaries {
        print_summary(summary, json);
    }
    let ok: Vec<bool> = summaries.iter().map(|s| s.success).collect();
    exit_code_for(&ok)
}

pub async fn schedule_serve(ctx: &Context) -> i32 {
    tokio::select! {
        _ = ctx.scheduler.serve() => exit_codes::SUCCESS,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("interrupted, shutting down");
            exit_codes::INTERRUPTED
        }
    }
}

pub fn status(ctx: &Context, json: bool) -> i32 {
    let stats = ctx.store.statistics();
    if json {
        match serde_json::to_string_pretty(&StatusReport::from(&stats)) {
            Ok(body) => println!("{body}"),
            Err(e) => {
                eprintln!("failed to serialize status: {e}");
                return exit_codes::CONFIG_INVALID;
            }
        }
    } else {
        println!("total projects: {}", stats.total);
        println!("by status:");
        for (status, count) in &stats.by_status {
            println!("  {status}: {count}");
        }
        println!("by origin:");
        for (origin, count) in &stats.by_origin_kind {
            println!("  {origin}: {count}");
        }
        println!("by language:");
        for (lang, count) in &stats.by_language {
            println!("  {lang}: {count}");
        }
    }
    exit_codes::SUCCESS
}

pub fn digest(ctx: &Context, source_key: &str, date: Option<&str>) -> i32 {
    let day = match date {
        Some(d) => match chrono::NaiveDate::parse_from_str(d, "%Y-%m-%d") {
            Ok(d) => d,
            Err(e) => {
                eprintln!("invalid --date {d}: {e}");
                return exit_codes::CONFIG_INVALID;
            }
        },
        None => now().date_naive(),
    };

    match ctx.sink.read(source_key, day) {
        Ok(Some(doc)) => {
            println!("{}", aiscout_sink::render_markdown(&day.format("%Y-%m-%d").to_string(), &doc));
            exit_codes::SUCCESS
        }
        Ok(None) => {
            eprintln!("no output for {source_key} on {day}");
            exit_codes::SUCCESS
        }
        Err(e) => {
            eprintln!("failed to read sink document: {e}");
            exit_codes::PARTIAL_FAILURE
        }
    }
}

#[derive(serde::Serialize)]
struct StatusReport {
    total: usize,
    by_status: std::collections::BTreeMap<String, usize>,
    by_origin_kind: std::collections::BTreeMap<String, usize>,
    by_language: std::collections::BTreeMap<String, usize>,
}

impl From<&aiscout_store::Statistics> for StatusReport {
    fn from(s: &aiscout_store::Statistics) -> Self {
        Self {
            total: s.total,
            by_status: s.by_status.clone(),
            by_origin_kind: s.by_origin_kind.clone(),
            by_language: s.by_language.clone(),
        }
    }
}

fn print_summary(summary: &PipelineRunSummary, json: bool) {
    if json {
        match serde_json::to_string_pretty(summary) {
            Ok(body) => println!("{body}"),
            Err(e) => eprintln!("failed to serialize summary: {e}"),
        }
        return;
    }

    if summary.success {
        println!(
            "{}: fetched={} classified={} emitted={}",
            summary.source, summary.fetched, summary.classified, summary.emitted
        );
    } else {
        println!(
            "{}: failed ({})",
            summary.source,
            summary.reason.as_deref().unwrap_or("unknown reason")
        );
    }
}

fn exit_code_for(outcomes: &[bool]) -> i32 {
    if outcomes.iter().all(|ok| *ok) {
        exit_codes::SUCCESS
    } else {
        exit_codes::PARTIAL_FAILURE
    }
}
