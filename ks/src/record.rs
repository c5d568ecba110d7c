//! Record trait implemented by every persisted type

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A value that can be stored in a [`Store`](crate::Store) collection
pub trait Record: Serialize + DeserializeOwned {
    /// Unique id within the collection
    fn id(&self) -> &str;

    /// Last modification time (unix milliseconds)
    fn updated_at(&self) -> i64;

    /// Name of the collection this type is stored in
    fn collection_name() -> &'static str;
}

/// Current time in unix milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
