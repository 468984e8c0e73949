//! Mutate command - send a mutation and patch the cache snapshot

use crate::cache::{CacheHandle, InMemoryCache};
use crate::cli::args::MutateArgs;
use crate::cli::commands::{resolve_collection, resolve_snapshot};
use crate::config::Config;
use crate::error::MutationResult;
use crate::mutation::{
    use_create, use_delete, use_update, use_upsert, MutationClient, MutationInput, MutationKind,
    MutationOptions,
};
use crate::transport::HttpTransport;
use crate::ui::{self, UiContext};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Execute the mutate command
pub async fn execute(args: MutateArgs, config: &Config) -> MutationResult<()> {
    let ctx = UiContext::detect();
    let (collection, fragment) = resolve_collection(config, &args.collection)?;

    let mut transport_config = config.transport.clone();
    if let Some(endpoint) = &args.endpoint {
        transport_config.endpoint = endpoint.clone();
    }
    let transport = HttpTransport::from_config(&transport_config);

    let snapshot = resolve_snapshot(args.cache.clone(), config);
    let cache = match &snapshot {
        Some(path) => InMemoryCache::load(path).await?,
        None => InMemoryCache::new(),
    };
    let shared = Arc::new(Mutex::new(cache));
    let handle: CacheHandle = shared.clone();

    let client = MutationClient::new(Arc::new(transport), handle);
    let options = MutationOptions::new(collection, fragment);
    let mutation = match args.kind {
        MutationKind::Create => use_create(&client, &options),
        MutationKind::Update => use_update(&client, &options),
        MutationKind::Upsert => use_upsert(&client, &options),
        MutationKind::Delete => use_delete(&client, &options),
    };

    let body = mutation.mutate(build_input(&args)?).await?;
    println!("{}", serde_json::to_string_pretty(&body)?);

    match &snapshot {
        Some(path) => {
            shared.lock().await.save(path).await?;
            ui::step_ok_detail(&ctx, "Cache snapshot updated", &path.display().to_string());
        }
        None => ui::step_info(&ctx, "No cache snapshot configured, nothing patched"),
    }

    Ok(())
}

fn build_input(args: &MutateArgs) -> MutationResult<MutationInput> {
    let data = args
        .data
        .as_deref()
        .map(serde_json::from_str::<Value>)
        .transpose()?;
    let selector = args
        .selector
        .as_deref()
        .map(serde_json::from_str::<Value>)
        .transpose()?;

    Ok(MutationInput {
        data,
        selector,
        document_id: args.document_id.clone(),
    })
}
