// Document routing for the fit-common document server
//
// Maps a closed set of operations onto files beneath a document root.

pub mod catalog;
pub mod request;
pub mod router;

pub use catalog::{App, AppDoc, ArgumentSpec, CommonDoc, Operation, Skill};
pub use request::{DocRequest, RequestError};
pub use router::{DocError, DocOutcome, DocumentRouter};
