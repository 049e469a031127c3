//! External key-value database adapter.
//!
//! The worked MIB examples ([`crate::mibs`]) read their backing data
//! through this trait rather than a concrete store, so they demonstrate the
//! registry against real-shaped data without hardcoding a wire protocol.
//! Grounded in the reference system's `SonicV2Connector`: a thin Redis
//! client reached over a local Unix socket, with one logical "database" per
//! Redis DB index (`APPL_DB`, `ASIC_DB`, `COUNTERS_DB`, ...) and most tables
//! stored as Redis hashes keyed `TABLE:instance`.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use crate::error::Result;

/// Boxed async return type; see [`crate::handler::BoxFuture`] for why -
/// adapters are stored as `Arc<dyn DbAdapter>` so the backing store is
/// swappable without touching the MIB examples built on it.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Logical database name. The adapter implementation maps these to its own
/// namespace (a Redis DB index, a table prefix, whatever fits the backend).
pub type DbName = &'static str;

/// Application-state database: interface and ARP tables live here.
pub const APPL_DB: DbName = "APPL_DB";
/// ASIC-level state: FDB entries, bridge-port mappings.
pub const ASIC_DB: DbName = "ASIC_DB";
/// Per-port counter snapshots, keyed by SAI object ID.
pub const COUNTERS_DB: DbName = "COUNTERS_DB";

/// Read access to an external key-value store.
///
/// All three methods mirror operations the reference MIB updaters actually
/// call: a full hash read (`HGETALL`), a glob-style key scan (`KEYS`), and a
/// single hash field read (`HGET`).
pub trait DbAdapter: Send + Sync + 'static {
    /// Every field of the hash stored at `key` in `db`. An empty map if the
    /// key doesn't exist, not an error - absence is a normal outcome for an
    /// updater polling a table that hasn't populated an entry yet.
    fn get_all<'a>(&'a self, db: DbName, key: &'a str) -> BoxFuture<'a, Result<BTreeMap<String, String>>>;

    /// Every key in `db` matching a glob-style `pattern`
    /// (e.g. `"LAG_TABLE:*"`, `"ASIC_STATE:SAI_OBJECT_TYPE_FDB_ENTRY:*"`).
    fn keys<'a>(&'a self, db: DbName, pattern: &'a str) -> BoxFuture<'a, Result<Vec<String>>>;

    /// One field of the hash stored at `key` in `db`, or `None` if the key
    /// or field doesn't exist.
    fn hget<'a>(&'a self, db: DbName, key: &'a str, field: &'a str) -> BoxFuture<'a, Result<Option<String>>>;
}

#[cfg(feature = "redis-db")]
mod redis_adapter;

#[cfg(feature = "redis-db")]
pub use redis_adapter::RedisDbAdapter;
