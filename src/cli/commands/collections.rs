//! Collections command - list configured collections

use crate::cli::args::{CollectionsArgs, OutputFormat};
use crate::config::{CollectionConfig, Config};
use crate::error::MutationResult;
use crate::ui::{self, UiContext};
use console::style;

/// Execute the collections command
pub async fn execute(args: CollectionsArgs, config: &Config) -> MutationResult<()> {
    let collections = &config.collections;

    if collections.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(&ctx, "No collections configured");
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(collections),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(collections)?),
        OutputFormat::Plain => {
            for collection in collections {
                println!("{}", collection.collection_name);
            }
        }
    }

    Ok(())
}

fn print_table(collections: &[CollectionConfig]) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "Collections");

    println!(
        "{:<20} {:<16} {:<20} {:<30}",
        style("COLLECTION").bold(),
        style("TYPE").bold(),
        style("LIST RESOLVER").bold(),
        style("FRAGMENT").bold()
    );
    println!("{}", "-".repeat(86));

    for collection in collections {
        println!(
            "{:<20} {:<16} {:<20} {:<30}",
            collection.collection_name,
            collection.type_name,
            collection.multi_resolver_name,
            collection.fragment_name()
        );
    }

    println!();
    println!("{} collection(s)", collections.len());
}
