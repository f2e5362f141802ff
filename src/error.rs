use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not load reference data")]
    ReferenceData,
    #[display("could not open the progress store")]
    Store,
    #[display("could not sign in")]
    SignIn,
    #[display("could not read or update progress")]
    Progress,
    #[display("invalid argument: {_0}")]
    InvalidArgument(#[error(not(source))] String),
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store | Self::Progress)
    }
}
