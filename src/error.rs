//! Command-line Error Types

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("invalid configuration")]
    Config,
    #[display("could not open the store")]
    Store,
    #[display("could not read input")]
    Input,
    #[display("ingestion stopped")]
    Ingest,
    #[display("purge failed")]
    Purge,
    #[display("could not read the store")]
    Inspect,
    /// The store failed verification; details were logged.
    #[display("store is inconsistent")]
    Inconsistent,
    /// A digest given on the command line or at a prompt was not valid hex.
    #[display("invalid hashed key")]
    InvalidKey,
    /// An interactive answer was not one of the accepted values.
    #[display("invalid answer: {_0:?}")]
    InvalidAnswer(#[error(not(source))] String),
    #[display("could not read from the terminal")]
    Prompt,
    #[display("could not write output")]
    Output,
}
