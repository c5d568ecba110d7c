//! KhirStore - keyed JSON record store on SQLite
//!
//! Every record type lives in its own collection and is addressed by a string
//! id. Records are serialized to JSON and written with upsert semantics, so
//! the last writer for a given `(collection, id)` wins.
//!
//! # Example
//!
//! ```ignore
//! use khirstore::{Record, Store};
//!
//! let store = Store::open(".khirstore")?;
//! store.upsert(&session)?;
//! let loaded: Option<Session> = store.get(session.id())?;
//! ```

mod record;
mod store;

pub mod cli;

pub use record::{Record, now_ms};
pub use store::{DB_FILE_NAME, RecordSummary, Store};
