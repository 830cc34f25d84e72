pub mod discussion;
pub mod query;
pub mod response;
pub mod transport;

pub use query::{PageQueryResult, SearchOutcome, WikiClient};
pub use transport::{HttpTransport, Transport};
