use snafu::{Location, Snafu};

#[derive(Snafu, Debug)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("store operation failed on {key:?}"))]
    OpenDal {
        key: String,
        #[snafu(implicit)]
        location: Location,
        #[snafu(source)]
        error: opendal::Error,
    },

    #[snafu(display("concatenate takes at most {limit} sources per call, got {requested}"))]
    FanInExceeded {
        requested: usize,
        limit: usize,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("concatenate requires at least one source"))]
    EmptyConcat {
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("{key:?} returned an empty read inside its range"))]
    ShortRead {
        key: String,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::OpenDal { error, .. } if error.kind() == opendal::ErrorKind::NotFound)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
