//! Apply command - patch a cache snapshot with a mutation response

use crate::cache::InMemoryCache;
use crate::cli::args::{ApplyArgs, OutputFormat};
use crate::cli::commands::{resolve_collection, resolve_snapshot};
use crate::config::Config;
use crate::error::{MutationError, MutationResult};
use crate::mutation::{MultiQueryUpdater, MutationResponse, UpdateReport};
use crate::ui::{self, UiContext};
use serde_json::Value;
use tokio::fs;
use tracing::info;

/// Execute the apply command
pub async fn execute(args: ApplyArgs, config: &Config) -> MutationResult<()> {
    let (collection, _) = resolve_collection(config, &args.collection)?;
    let snapshot = resolve_snapshot(args.cache, config).ok_or_else(|| {
        MutationError::User("No cache snapshot given, pass --cache or set cache.snapshot".to_string())
    })?;

    let content = fs::read_to_string(&args.response).await.map_err(|e| {
        MutationError::io(format!("reading response from {}", args.response.display()), e)
    })?;
    let body: Value = serde_json::from_str(&content)?;

    let updater = MultiQueryUpdater::for_kind(collection, args.operation);
    MutationResponse::check_errors(updater.resolver_name(), &body)?;

    let mut cache = InMemoryCache::load(&snapshot).await?;
    let report = updater.update(&mut cache, &body)?;

    if args.dry_run {
        info!("Dry run, snapshot not written");
    } else {
        let target = args.output.as_deref().unwrap_or(&snapshot);
        cache.save(target).await?;
    }

    print_report(&report, updater.resolver_name(), args.format)
}

fn print_report(report: &UpdateReport, operation: &str, format: OutputFormat) -> MutationResult<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Plain => println!("{report}"),
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            ui::intro(&ctx, &format!("Cache update for {operation}"));
            let rows = [
                ("scanned", report.scanned),
                ("inserted", report.inserted),
                ("replaced", report.replaced),
                ("removed", report.removed),
                ("unchanged", report.unchanged),
                ("skipped", report.skipped),
                ("failed", report.failed),
                ("written", report.written),
            ];
            for (key, value) in rows {
                ui::key_value(&ctx, key, &value.to_string());
            }
            if report.failed > 0 {
                ui::step_warn_hint(
                    &ctx,
                    &format!("{} cached queries could not be patched", report.failed),
                    "Run with -v for details",
                );
            } else {
                ui::outro_success(&ctx, &format!("{} cached queries updated", report.written));
            }
        }
    }
    Ok(())
}
