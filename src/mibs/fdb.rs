//! Forwarding database: `dot1qTpFdbPort` (`.1.3.6.1.2.1.17.7.1.2.2.1.2`).
//!
//! Supplemented from the reference `FdbUpdater`. A forwarding-database
//! entry is indexed by `(vlan, mac)` and names the port it was learned on
//! indirectly: the entry carries a bridge port id, which is looked up in a
//! bridge-port-to-physical-port map (itself rebuilt from the database on
//! `reinit_data`) to reach the ifIndex the rest of the MIB addresses
//! interfaces by. There is no field on the FDB entry that names a port
//! directly - every implementation has to go through this translation.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::db::{DbAdapter, ASIC_DB, COUNTERS_DB};
use crate::error::Result;
use crate::handler::{BoxFuture, GetNextResult, GetResult, MibProducer, OidTable, RequestContext};
use crate::oid::Oid;
use crate::oid;
use crate::updater::Updater;
use crate::value::Value;

use super::interfaces::if_index_from_name;

fn base_oid() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 17, 7, 1, 2, 2, 1, 2)
}

fn entry_oid(vlan: u32, mac: [u8; 6]) -> Oid {
    base_oid().child(&[vlan, mac[0] as u32, mac[1] as u32, mac[2] as u32, mac[3] as u32, mac[4] as u32, mac[5] as u32])
}

const FDB_ENTRY_PREFIX: &str = "ASIC_STATE:SAI_OBJECT_TYPE_FDB_ENTRY:";
const BRIDGE_PORT_PREFIX: &str = "ASIC_STATE:SAI_OBJECT_TYPE_BRIDGE_PORT:";
const BRIDGE_PORT_ID_FIELD: &str = "SAI_FDB_ENTRY_ATTR_BRIDGE_PORT_ID";
const BRIDGE_PORT_PORT_FIELD: &str = "SAI_BRIDGE_PORT_ATTR_PORT_ID";

/// Strips the `oid:0x` prefix the reference system wraps every SAI object
/// id in, leaving the bare hex string used as a map key.
fn strip_sai_oid_prefix(value: &str) -> Option<&str> {
    value.strip_prefix("oid:0x")
}

/// Pulls one `"field":"value"` pair out of the flattened JSON string the
/// reference system keys FDB entries by (e.g. `{"mac":"...","vlan":"100"}`).
/// A deliberately small scanner rather than a general JSON parser - these
/// keys only ever carry flat string fields.
fn extract_json_field<'a>(json: &'a str, field: &str) -> Option<&'a str> {
    let needle = format!("\"{field}\":\"");
    let start = json.find(&needle)? + needle.len();
    let end = json[start..].find('"')? + start;
    Some(&json[start..end])
}

fn parse_mac(text: &str) -> Option<[u8; 6]> {
    let mut mac = [0u8; 6];
    let mut parts = text.split(':');
    for byte in mac.iter_mut() {
        *byte = u8::from_str_radix(parts.next()?, 16).ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(mac)
}

/// Resolved bridge-port and physical-port index, rebuilt by `reinit_data`.
struct IndexSnapshot {
    /// Bridge port id (bare hex, `oid:0x` stripped) -> port SAI object id.
    bridge_port_to_sai: BTreeMap<String, String>,
    /// Port SAI object id -> ifIndex.
    sai_to_index: BTreeMap<String, u32>,
}

impl IndexSnapshot {
    fn empty() -> Self {
        Self { bridge_port_to_sai: BTreeMap::new(), sai_to_index: BTreeMap::new() }
    }
}

struct Snapshot {
    table: OidTable<Value>,
}

impl Snapshot {
    fn empty() -> Self {
        Self { table: OidTable::new() }
    }
}

/// MIB producer and updater pair for the forwarding database.
pub struct FdbMib<D> {
    db: Arc<D>,
    index: Mutex<Arc<IndexSnapshot>>,
    snapshot: Mutex<Arc<Snapshot>>,
}

impl<D: DbAdapter> FdbMib<D> {
    pub fn new(db: Arc<D>) -> Self {
        Self {
            db,
            index: Mutex::new(Arc::new(IndexSnapshot::empty())),
            snapshot: Mutex::new(Arc::new(Snapshot::empty())),
        }
    }

    /// The subtree prefix this producer answers for: `dot1qTpFdbPort`.
    pub fn base_oid() -> Oid {
        base_oid()
    }

    fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.lock().unwrap())
    }

    fn current_index(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&self.index.lock().unwrap())
    }

    async fn build_index(&self) -> Result<IndexSnapshot> {
        let port_sai = self.db.get_all(COUNTERS_DB, "COUNTERS_PORT_NAME_MAP").await?;
        let mut sai_to_index = BTreeMap::new();
        for (name, sai_id) in &port_sai {
            if let Some(index) = if_index_from_name(name) {
                sai_to_index.insert(sai_id.clone(), index);
            }
        }

        let bridge_port_keys = self.db.keys(ASIC_DB, &format!("{BRIDGE_PORT_PREFIX}*")).await?;
        let mut bridge_port_to_sai = BTreeMap::new();
        for key in &bridge_port_keys {
            let Some(bpid_with_prefix) = key.strip_prefix(BRIDGE_PORT_PREFIX) else {
                continue;
            };
            let Some(bpid) = strip_sai_oid_prefix(bpid_with_prefix) else {
                continue;
            };
            let fields = self.db.get_all(ASIC_DB, key).await?;
            let Some(port_sai) = fields.get(BRIDGE_PORT_PORT_FIELD).and_then(|v| strip_sai_oid_prefix(v)) else {
                continue;
            };
            bridge_port_to_sai.insert(bpid.to_string(), port_sai.to_string());
        }

        Ok(IndexSnapshot { bridge_port_to_sai, sai_to_index })
    }
}

impl<D: DbAdapter> MibProducer for FdbMib<D> {
    fn get<'a>(&'a self, _ctx: &'a RequestContext, oid: &'a Oid) -> BoxFuture<'a, GetResult> {
        let snapshot = self.current();
        Box::pin(async move {
            if oid.starts_with(&base_oid()) {
                snapshot.table.get(oid).cloned().map(GetResult::Value).unwrap_or(GetResult::NoSuchInstance)
            } else {
                GetResult::NoSuchObject
            }
        })
    }

    fn get_next<'a>(&'a self, _ctx: &'a RequestContext, oid: &'a Oid) -> BoxFuture<'a, GetNextResult> {
        let snapshot = self.current();
        Box::pin(async move {
            snapshot
                .table
                .get_next(oid)
                .map(|(next_oid, value)| GetNextResult::Value(crate::varbind::VarBind::new(next_oid.clone(), value.clone())))
                .unwrap_or(GetNextResult::EndOfMibView)
        })
    }
}

impl<D: DbAdapter> Updater for FdbMib<D> {
    fn name(&self) -> &str {
        "fdb"
    }

    fn reinit_data<'a>(&'a self) -> crate::updater::BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let index = self.build_index().await?;
            *self.index.lock().unwrap() = Arc::new(index);
            Ok(())
        })
    }

    fn update_data<'a>(&'a self) -> crate::updater::BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let index = self.current_index();
            let keys = self.db.keys(ASIC_DB, &format!("{FDB_ENTRY_PREFIX}*")).await?;
            let mut table = OidTable::with_capacity(keys.len());

            for key in &keys {
                let Some(json) = key.strip_prefix(FDB_ENTRY_PREFIX) else {
                    continue;
                };
                let Some(vlan) = extract_json_field(json, "vlan").and_then(|v| v.parse::<u32>().ok()) else {
                    continue;
                };
                let Some(mac) = extract_json_field(json, "mac").and_then(parse_mac) else {
                    continue;
                };

                let fields = self.db.get_all(ASIC_DB, key).await?;
                let Some(bpid) = fields.get(BRIDGE_PORT_ID_FIELD).and_then(|v| strip_sai_oid_prefix(v)) else {
                    continue;
                };
                let Some(port_sai) = index.bridge_port_to_sai.get(bpid) else {
                    continue;
                };
                let Some(&if_index) = index.sai_to_index.get(port_sai) else {
                    continue;
                };

                table.insert(entry_oid(vlan, mac), Value::Integer(if_index as i32));
            }

            *self.snapshot.lock().unwrap() = Arc::new(Snapshot { table });
            Ok(())
        })
    }
}
