use snafu::{Location, Snafu};

/// Validation failures. All of these are detected before any chunk work
/// starts and are fatal to the whole job.
#[derive(Snafu, Debug)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("malformed store location {url:?}: {reason}"))]
    MalformedLocation {
        url: String,
        reason: &'static str,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("unsupported store scheme {scheme:?}"))]
    UnsupportedScheme {
        scheme: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("chunk size must be greater than zero"))]
    ZeroChunkSize {
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display(
        "{alphabet} suffixes of length {length} give {capacity} names, not enough for {count} chunks"
    ))]
    SuffixNamespaceTooSmall {
        alphabet: crate::suffix::SuffixAlphabet,
        length: usize,
        capacity: u64,
        count: u64,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("chunk index {index} is out of range, the plan has {count} chunks"))]
    ChunkIndexOutOfRange {
        index: u64,
        count: u64,
        #[snafu(implicit)]
        location: Location,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
