//! Redis-backed [`DbAdapter`], reached over a Unix-domain socket.
//!
//! Grounded in the reference `SonicV2Connector`: a single Redis client
//! dialing `/var/run/redis/redis.sock`, with each logical database mapped
//! to a Redis DB index via `SELECT`.

use std::collections::{BTreeMap, HashMap};

use redis::AsyncCommands;

use super::{BoxFuture, DbAdapter, DbName, ASIC_DB, APPL_DB, COUNTERS_DB};
use crate::error::{DbErrorKind, Error, Result};

/// Maps a logical [`DbName`] to the Redis DB index the reference deployment
/// uses for it. Unrecognized names fall back to index 0 rather than
/// erroring - a caller passing a name outside the three exported constants
/// is relying on the backend's default namespace.
fn db_index(name: DbName) -> i64 {
    match name {
        APPL_DB => 0,
        ASIC_DB => 1,
        COUNTERS_DB => 2,
        _ => 0,
    }
}

/// A Redis client dialing a fixed Unix socket path, keeping one dedicated
/// [`redis::aio::ConnectionManager`] per Redis DB index.
///
/// A single `ConnectionManager` multiplexes every clone over one underlying
/// connection, so a shared manager with a `SELECT` issued per-request races:
/// one task's `SELECT` can be clobbered by another's between the `SELECT`
/// and the command it was meant to scope, silently reading the wrong
/// logical database. Provisioning one connection per index and `SELECT`ing
/// it exactly once, at connect time, removes the race instead of trying to
/// serialize around it - concurrent callers targeting different logical
/// databases never share a connection to race over in the first place.
pub struct RedisDbAdapter {
    connections: HashMap<i64, redis::aio::ConnectionManager>,
}

impl RedisDbAdapter {
    /// Connect to a Redis instance over the Unix socket at `socket_path`,
    /// provisioning a dedicated, pre-`SELECT`ed connection for each of
    /// `APPL_DB`/`ASIC_DB`/`COUNTERS_DB`.
    pub async fn connect(socket_path: &str) -> Result<Self> {
        let client = redis::Client::open(format!("redis+unix://{socket_path}"))
            .map_err(|_| Error::db(DbErrorKind::Unavailable))?;

        let mut connections = HashMap::new();
        for name in [APPL_DB, ASIC_DB, COUNTERS_DB] {
            let index = db_index(name);
            if connections.contains_key(&index) {
                continue;
            }
            let mut manager = client
                .get_connection_manager()
                .await
                .map_err(|_| Error::db(DbErrorKind::Unavailable))?;
            let _: std::result::Result<(), redis::RedisError> = redis::cmd("SELECT")
                .arg(index)
                .query_async(&mut manager)
                .await;
            connections.insert(index, manager);
        }
        Ok(Self { connections })
    }

    /// The connection dedicated to `db`'s Redis DB index.
    fn connection_for(&self, db: DbName) -> redis::aio::ConnectionManager {
        self.connections
            .get(&db_index(db))
            .cloned()
            .expect("every db_index() outcome is provisioned in connect()")
    }
}

impl DbAdapter for RedisDbAdapter {
    fn get_all<'a>(&'a self, db: DbName, key: &'a str) -> BoxFuture<'a, Result<BTreeMap<String, String>>> {
        Box::pin(async move {
            let mut conn = self.connection_for(db);
            conn.hgetall(key)
                .await
                .map_err(|_| Error::db(DbErrorKind::MalformedReply))
        })
    }

    fn keys<'a>(&'a self, db: DbName, pattern: &'a str) -> BoxFuture<'a, Result<Vec<String>>> {
        Box::pin(async move {
            let mut conn = self.connection_for(db);
            let mut keys: Vec<String> = conn
                .keys(pattern)
                .await
                .map_err(|_| Error::db(DbErrorKind::MalformedReply))?;
            keys.sort();
            Ok(keys)
        })
    }

    fn hget<'a>(&'a self, db: DbName, key: &'a str, field: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async move {
            let mut conn = self.connection_for(db);
            conn.hget(key, field)
                .await
                .map_err(|_| Error::db(DbErrorKind::MalformedReply))
        })
    }
}
