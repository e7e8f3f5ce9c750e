pub mod connector;
pub mod envelope;

pub use connector::{FeedConnector, FeedError};
pub use envelope::{decode_message, DecodeError, FeedCommand, FeedMessage};
