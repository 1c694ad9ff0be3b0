mod dispatcher;
mod executor;

pub use dispatcher::{DispatchError, DispatchResult, Dispatcher, ErrorKind};
pub use executor::{Assistant, RequestOutcome};
