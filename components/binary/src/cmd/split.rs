// Copyright 2026 sunder
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{str::FromStr, sync::Arc};

use clap::Args;
use snafu::{whatever, ResultExt, Whatever};
use tracing::info;

use sunder_common::MAX_SUFFIX_LENGTH;
use sunder_engine::{SplitConfig, Splitter};
use sunder_storage::{BlobStoreRef, OpendalStore};
use sunder_types::{Alignment, BlobLocation, SuffixScheme};
use sunder_utils::{logger::LoggingConfig, object_storage, readable_size::ReadableSize, runtime};

const CHUNK_OPTIONS_HEADER: &str = "CHUNKING";
const RUN_OPTIONS_HEADER: &str = "EXECUTION";

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Split a blob into consecutively named chunk objects.

The chunks are written beside the source (or under OUTPUT_PREFIX) as
OUTPUT_PREFIX_aa, OUTPUT_PREFIX_ab, ... and can be put back together
with 'sunder join'.

Examples:

# 1 MiB chunks next to the source
sunder split s3://bucket/corpus/huge.log

# 64 MiB chunks that end on line terminators, under another prefix
sunder split -l -b 64M s3://bucket/corpus/huge.log s3://bucket/parts/huge
")]
pub struct SplitArgs {
    #[arg(
        help = "Blob to split, like 's3://bucket/corpus/huge.log'",
        value_name = "SOURCE"
    )]
    pub source: String,

    #[arg(
        help = "Prefix the chunk objects are named under [default: SOURCE]",
        value_name = "OUTPUT_PREFIX"
    )]
    pub output_prefix: Option<String>,

    #[arg(
        long,
        short = 'b',
        help = "Nominal chunk size, like '256K' or '64M'",
        help_heading = CHUNK_OPTIONS_HEADER,
        default_value = "1M",
        value_parser = validate_chunk_size,
    )]
    pub chunk_size: String,

    #[arg(
        long,
        short = 'a',
        help = "Number of characters in the chunk name suffix",
        help_heading = CHUNK_OPTIONS_HEADER,
        default_value = "2",
        value_parser = validate_suffix_length,
    )]
    pub suffix_length: usize,

    #[arg(
        long,
        short = 'd',
        help = "Number the chunks 00, 01, ... instead of aa, ab, ...",
        help_heading = CHUNK_OPTIONS_HEADER
    )]
    pub numeric_suffix: bool,

    #[arg(
        long,
        short,
        help = "Shift chunk boundaries onto line terminators",
        help_heading = CHUNK_OPTIONS_HEADER
    )]
    pub lines: bool,

    #[arg(
        long,
        help = "How far past the nominal boundary a line chunk may scan for a terminator",
        help_heading = CHUNK_OPTIONS_HEADER,
        default_value = "5000",
        value_parser = validate_overscan,
    )]
    pub overscan: String,

    #[arg(
        long,
        requires = "lines",
        help = "Fail a chunk whose scan window has no terminator instead of cutting at the byte boundary",
        help_heading = CHUNK_OPTIONS_HEADER
    )]
    pub strict_lines: bool,

    #[arg(
        long,
        short = 't',
        help = "Upper bound on chunk workers in flight",
        help_heading = RUN_OPTIONS_HEADER,
        default_value = "100",
        value_parser = validate_workers,
    )]
    pub workers: usize,

    #[arg(
        long,
        short = 's',
        help = "Write only the single chunk with this 1-based index",
        help_heading = RUN_OPTIONS_HEADER,
        value_name = "INDEX",
        value_parser = validate_chunk_index,
    )]
    pub only: Option<u64>,

    #[arg(
        long,
        help = "Cancel the remaining chunks as soon as one fails",
        help_heading = RUN_OPTIONS_HEADER
    )]
    pub fail_fast: bool,

    #[arg(long, short, help = "Log at debug level")]
    pub verbose: bool,
}

impl SplitArgs {
    fn split_config(&self) -> SplitConfig {
        let chunk_size = ReadableSize::from_str(&self.chunk_size)
            .expect("chunk size should be validated in the argument parser");
        let overscan = ReadableSize::from_str(&self.overscan)
            .expect("overscan should be validated in the argument parser");
        let suffix = if self.numeric_suffix {
            SuffixScheme::numeric(self.suffix_length)
        } else {
            SuffixScheme::alphabetic(self.suffix_length)
        };
        let alignment = if self.lines {
            Alignment::Line
        } else {
            Alignment::Exact
        };
        SplitConfig {
            chunk_size: chunk_size.as_bytes(),
            alignment,
            suffix,
            overscan: overscan.as_bytes(),
            strict_lines: self.strict_lines,
            max_workers: self.workers,
            fail_fast: self.fail_fast,
        }
    }

    pub fn run(&self) -> Result<(), Whatever> {
        LoggingConfig::from_verbosity(self.verbose).init_tracing_subscriber()?;

        let source: BlobLocation = self
            .source
            .parse()
            .with_whatever_context(|_| format!("invalid source location {:?}", self.source))?;
        let output: BlobLocation = match &self.output_prefix {
            Some(raw) => raw
                .parse()
                .with_whatever_context(|_| format!("invalid output prefix {:?}", raw))?,
            None => source.clone(),
        };

        let (source_op, source_key) = object_storage::resolve(&source)?;
        let (dest_op, dest_prefix) = object_storage::resolve(&output)?;
        let source_store: BlobStoreRef = Arc::new(OpendalStore::new(source_op));
        let dest_store: BlobStoreRef = Arc::new(OpendalStore::new(dest_op));

        let splitter = Splitter::new(
            source_store,
            source_key,
            dest_store,
            dest_prefix,
            self.split_config(),
        );
        let cancel = splitter.cancel_token();
        ctrlc::set_handler(move || cancel.cancel())
            .whatever_context("failed to install the interrupt handler")?;

        let result = match self.only {
            Some(index) => runtime::block_on(splitter.run_single(index)),
            None => runtime::block_on(splitter.run()),
        };
        let summary = result.with_whatever_context(|e| format!("split of {} failed: {}", source, e))?;
        println!("{}", summary);
        if !summary.is_complete() {
            whatever!("split of {} is incomplete", source);
        }
        info!("split {} into chunks under {} success", source, output);
        Ok(())
    }
}

fn validate_chunk_size(s: &str) -> Result<String, String> {
    let size = ReadableSize::from_str(s).map_err(|e| format!("invalid chunk size: {}", e))?;
    if size.as_bytes() == 0 {
        return Err("chunk size must be positive".to_string());
    }
    Ok(s.to_string())
}

fn validate_overscan(s: &str) -> Result<String, String> {
    ReadableSize::from_str(s).map_err(|e| format!("invalid overscan: {}", e))?;
    Ok(s.to_string())
}

fn validate_suffix_length(s: &str) -> Result<usize, String> {
    clap_num::number_range(s, 1, MAX_SUFFIX_LENGTH)
}

fn validate_workers(s: &str) -> Result<usize, String> {
    clap_num::number_range(s, 1, usize::MAX)
}

fn validate_chunk_index(s: &str) -> Result<u64, String> {
    clap_num::number_range(s, 1, u64::MAX)
}
