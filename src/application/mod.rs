// Application layer - the caller-facing boundary around the account.
// Parses user input, logs outcomes and turns rejections into messages;
// the domain stays free of I/O.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
