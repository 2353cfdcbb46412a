pub mod error;
pub mod memory;
pub mod sqlite;

pub use error::StoreError;
pub use memory::MarketCache;
pub use sqlite::SqliteStore;
