//! Build command - print a mutation document

use crate::cli::args::BuildArgs;
use crate::cli::commands::resolve_collection;
use crate::config::Config;
use crate::error::MutationResult;
use crate::mutation::build_query;
use tracing::debug;

/// Execute the build command
pub async fn execute(args: BuildArgs, config: &Config) -> MutationResult<()> {
    let (collection, fragment) = resolve_collection(config, &args.collection)?;
    let document = build_query(args.kind, collection.type_name(), &fragment);
    debug!("Built {} for {}", document.operation_name, collection.collection_name());

    print!("{document}");
    if args.hash {
        println!("# sha256: {}", document.hash());
    }

    Ok(())
}
