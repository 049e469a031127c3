//! Shared test support: an in-memory `DbAdapter` usable from integration
//! tests, which can't reach the crate's own `#[cfg(test)]`-only fixture.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use agentx_subagent::db::{DbAdapter, DbName};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Default)]
pub struct MockDb {
    tables: Mutex<BTreeMap<(DbName, String), BTreeMap<String, String>>>,
}

impl MockDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, db: DbName, key: impl Into<String>, fields: &[(&str, &str)]) {
        let mut tables = self.tables.lock().unwrap();
        let entry = tables.entry((db, key.into())).or_default();
        for (field, value) in fields {
            entry.insert((*field).to_string(), (*value).to_string());
        }
    }
}

impl DbAdapter for MockDb {
    fn get_all<'a>(&'a self, db: DbName, key: &'a str) -> BoxFuture<'a, agentx_subagent::Result<BTreeMap<String, String>>> {
        Box::pin(async move {
            Ok(self
                .tables
                .lock()
                .unwrap()
                .get(&(db, key.to_string()))
                .cloned()
                .unwrap_or_default())
        })
    }

    fn keys<'a>(&'a self, db: DbName, pattern: &'a str) -> BoxFuture<'a, agentx_subagent::Result<Vec<String>>> {
        Box::pin(async move {
            let prefix = pattern.trim_end_matches('*');
            let tables = self.tables.lock().unwrap();
            let mut out: Vec<String> = tables
                .keys()
                .filter(|(table_db, key)| *table_db == db && key.starts_with(prefix))
                .map(|(_, key)| key.clone())
                .collect();
            out.sort();
            Ok(out)
        })
    }

    fn hget<'a>(
        &'a self,
        db: DbName,
        key: &'a str,
        field: &'a str,
    ) -> BoxFuture<'a, agentx_subagent::Result<Option<String>>> {
        Box::pin(async move {
            Ok(self
                .tables
                .lock()
                .unwrap()
                .get(&(db, key.to_string()))
                .and_then(|fields| fields.get(field).cloned()))
        })
    }
}
