pub mod err;
pub mod location;
pub mod plan;
pub mod suffix;

pub use err::Error;
pub use location::{BlobLocation, StoreScheme};
pub use plan::{Alignment, ChunkSpec, SplitPlan};
pub use suffix::{SuffixAlphabet, SuffixScheme};
