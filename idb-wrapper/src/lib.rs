//! Awaitable IndexedDB for the browser.
//!
//! [`Database::open`] starts opening (and, when the stored version is older, upgrading) a database right away;
//! [`Database::wait`] yields the single outcome of that sequence to any number of callers. Once ready, each query
//! helper runs exactly one request in its own transaction and settles with its result or its error event.
//!
//! ```rust,ignore
//! use idb_wrapper::{Database, DatabaseConfig, KeyRangeSettings, CursorDirection, TransactionMode};
//! use idb_wrapper::schema::{initialize_store, IndexConfig, StoreConfig};
//!
//! let db = Database::open(DatabaseConfig::new("library", 1).persistent(true).on_upgrade(|_event, db| {
//!     initialize_store(db, &StoreConfig::new("books", "isbn").index(IndexConfig::new("by_year", "year")))?;
//!     Ok(())
//! }));
//! db.wait().await?;
//!
//! let newest = KeyRangeSettings::lower_bound(2000).with_direction(CursorDirection::Prev);
//! let cursor = db.open_index_cursor("books", "by_year", TransactionMode::ReadOnly, Some(&newest)).await?;
//! ```

mod bindings;
pub mod database;
pub mod error;
pub mod key_range;
mod query;
mod scanner;
pub mod schema;
mod statics;
mod util;

pub use bindings::{init_logging, JsIdbWrapper};
pub use database::{Database, DatabaseConfig, TransactionMode, UpgradeHandler};
pub use error::{IdbError, Result};
pub use key_range::{create_key_range, CursorDirection, KeyRangeSettings, QueryType};
pub use util::vendor::{FACTORY_GLOBALS, KEY_RANGE_GLOBALS};
