use std::{path::Path, sync::Arc};

use clap::Args;
use snafu::{ensure_whatever, ResultExt, Whatever};
use tracing::info;

use sunder_engine::Recombiner;
use sunder_storage::{BlobStoreRef, OpendalStore};
use sunder_types::{BlobLocation, StoreScheme};
use sunder_utils::{logger::LoggingConfig, object_storage, runtime};

const JOIN_OPTIONS_HEADER: &str = "JOINING";

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Join previously split chunk objects back into one blob.

Lists every chunk named CHUNK_PREFIX_* and concatenates them in name
order into DEST, one fan-in limited page at a time. The chunks must
live in the same store as the destination.

Examples:

# Rebuild a blob from the chunks beside it
sunder join s3://bucket/corpus/huge.log

# Rebuild from chunks under a different prefix
sunder join s3://bucket/corpus/huge.log s3://bucket/parts/huge
")]
pub struct JoinArgs {
    #[arg(
        help = "Blob to write the joined result to, like 's3://bucket/corpus/huge.log'",
        value_name = "DEST"
    )]
    pub dest: String,

    #[arg(
        help = "Prefix the chunk objects are named under [default: DEST]",
        value_name = "CHUNK_PREFIX"
    )]
    pub chunk_prefix: Option<String>,

    #[arg(
        long,
        short,
        help = "How many objects one concatenation call folds together",
        help_heading = JOIN_OPTIONS_HEADER,
        default_value = "32",
        value_parser = validate_fan_in,
    )]
    pub fan_in: usize,

    #[arg(long, short, help = "Log at debug level")]
    pub verbose: bool,
}

impl JoinArgs {
    pub fn run(&self) -> Result<(), Whatever> {
        LoggingConfig::from_verbosity(self.verbose).init_tracing_subscriber()?;

        let dest: BlobLocation = self
            .dest
            .parse()
            .with_whatever_context(|_| format!("invalid destination location {:?}", self.dest))?;
        let prefix: BlobLocation = match &self.chunk_prefix {
            Some(raw) => raw
                .parse()
                .with_whatever_context(|_| format!("invalid chunk prefix {:?}", raw))?,
            None => dest.clone(),
        };
        ensure_whatever!(
            dest.same_store(&prefix),
            "chunks under {} cannot be joined into {}: the destination must live in the same store",
            prefix,
            dest
        );
        if dest.scheme == StoreScheme::Fs {
            // Two fs locations only share an operator when they share a
            // parent directory.
            ensure_whatever!(
                Path::new(&dest.key).parent() == Path::new(&prefix.key).parent(),
                "chunks under {} cannot be joined into {}: fs locations must share a directory",
                prefix,
                dest
            );
        }

        let (op, dest_key) = object_storage::resolve(&dest)?;
        let (_, prefix_key) = object_storage::resolve(&prefix)?;
        let store: BlobStoreRef = Arc::new(OpendalStore::new(op).with_fan_in(self.fan_in));

        let recombiner = Recombiner::new(store, dest_key, prefix_key);
        let summary = runtime::block_on(recombiner.run())
            .with_whatever_context(|e| format!("join into {} failed: {}", dest, e))?;
        println!("{}", summary);
        info!("joined {} from chunks under {} success", dest, prefix);
        Ok(())
    }
}

fn validate_fan_in(s: &str) -> Result<usize, String> {
    clap_num::number_range(s, 2, usize::MAX)
}
