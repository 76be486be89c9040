pub use crate::combinator::{Failure, FailureKind, ParseState, ParseValue, Parser, Trailing};
pub use crate::errors::{ErrorCategory, ErrorKind, OuroError, SourceContext};

pub mod cli;
pub mod combinator;
pub mod display;
pub mod errors;
pub mod grammar;
