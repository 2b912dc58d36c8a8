use std::fmt::{Display, Formatter};

use snafu::{Location, Snafu};

use sunder_common::ChunkIndex;

/// Which end of a chunk's search window failed to produce a terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEnd {
    Leading,
    Trailing,
}

impl Display for WindowEnd {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowEnd::Leading => write!(f, "leading"),
            WindowEnd::Trailing => write!(f, "trailing"),
        }
    }
}

#[derive(Snafu, Debug)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("invalid split parameters"))]
    InvalidPlan {
        #[snafu(implicit)]
        location: Location,
        source: sunder_types::Error,
    },

    #[snafu(display("stat failed for {key:?}"))]
    Stat {
        key: String,
        #[snafu(implicit)]
        location: Location,
        source: sunder_storage::err::Error,
    },

    #[snafu(display("chunk {index}: reading the source range failed"))]
    ChunkRead {
        index: ChunkIndex,
        #[snafu(implicit)]
        location: Location,
        source: sunder_storage::err::Error,
    },

    #[snafu(display("chunk {index}: writing the chunk object failed"))]
    ChunkWrite {
        index: ChunkIndex,
        #[snafu(implicit)]
        location: Location,
        source: sunder_storage::err::Error,
    },

    #[snafu(display(
        "chunk {index}: no line terminator within {overscan} bytes of the {end} boundary"
    ))]
    Boundary {
        index: ChunkIndex,
        overscan: u64,
        end: WindowEnd,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("the job was cancelled"))]
    Cancelled {
        #[snafu(implicit)]
        location: Location,
    },

    JoinErr {
        #[snafu(implicit)]
        location: Location,
        source: tokio::task::JoinError,
    },

    #[snafu(display("listing chunk objects under {prefix:?} failed"))]
    ListChunks {
        prefix: String,
        #[snafu(implicit)]
        location: Location,
        source: sunder_storage::err::Error,
    },

    #[snafu(display("no chunk objects found under {prefix:?}"))]
    NoChunks {
        prefix: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("concatenating page {page} into the destination failed"))]
    Concat {
        page: usize,
        #[snafu(implicit)]
        location: Location,
        source: sunder_storage::err::Error,
    },

    #[snafu(display("a fan-in limit of {limit} cannot fold chunks into a destination"))]
    FanInTooSmall {
        limit: usize,
        #[snafu(implicit)]
        location: Location,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
