pub mod error;
pub mod feed;

pub use error::FeedError;
pub use feed::{select_actionable, DecisionFeed, TickReport};
