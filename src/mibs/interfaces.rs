//! IF-MIB interface table: `ifNumber`, `ifEntry` (`.1.3.6.1.2.1.2.2.1`), and
//! the RFC 2863 `ifXEntry` high-capacity counters (`.1.3.6.1.2.1.31.1.1.1`).
//!
//! Supplemented from the reference `InterfacesUpdater`: a two-tier refresh
//! split between `reinit_data` (which ports and LAGs exist, and which
//! physical ports back each LAG) and `update_data` (per-port counter
//! values), published as three independent table snapshots that the
//! producer side reads without ever touching the database.
//!
//! `ifInOctets` and its siblings are `Counter32`: for a LAG, the member
//! ports' raw counters are summed and the sum is masked to the low 32 bits
//! at the point of production (see [`crate::value::Value::counter32_masked`]).
//! `ifHCInOctets`/`ifHCOutOctets` are the same per-port counter, summed the
//! same way, but left unmasked as `Counter64` - masking the high-capacity
//! columns would defeat the reason they exist.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use bytes::Bytes;

use crate::db::{DbAdapter, APPL_DB, COUNTERS_DB};
use crate::error::Result;
use crate::handler::{BoxFuture, GetNextResult, GetResult, MibProducer, OidTable, RequestContext};
use crate::oid::Oid;
use crate::oid;
use crate::updater::Updater;
use crate::value::Value;

fn if_number_oid() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 2, 1, 0)
}

fn if_entry_base() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 2, 2, 1)
}

fn if_x_entry_base() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 31, 1, 1, 1)
}

fn column_oid(base: &Oid, column: u32, if_index: u32) -> Oid {
    base.child(&[column, if_index])
}

/// `ifEntry` column numbers this example exposes.
mod if_entry_column {
    pub const IF_INDEX: u32 = 1;
    pub const IF_DESCR: u32 = 2;
    pub const IF_TYPE: u32 = 3;
    pub const IF_MTU: u32 = 4;
    pub const IF_ADMIN_STATUS: u32 = 7;
    pub const IF_OPER_STATUS: u32 = 8;
    pub const IF_IN_OCTETS: u32 = 10;
    pub const IF_IN_UCAST_PKTS: u32 = 11;
    pub const IF_IN_DISCARDS: u32 = 13;
    pub const IF_IN_ERRORS: u32 = 14;
    pub const IF_OUT_OCTETS: u32 = 16;
    pub const IF_OUT_UCAST_PKTS: u32 = 17;
    pub const IF_OUT_DISCARDS: u32 = 19;
    pub const IF_OUT_ERRORS: u32 = 20;
    pub const IF_OUT_QLEN: u32 = 21;
}

/// `ifXEntry` column numbers (RFC 2863) this example exposes.
mod if_x_entry_column {
    pub const IF_HC_IN_OCTETS: u32 = 6;
    pub const IF_HC_OUT_OCTETS: u32 = 10;
}

/// `ethernetCsmacd` / `ieee8023adLag`, per the IANAifType registry.
const IF_TYPE_ETHERNET: i32 = 6;
const IF_TYPE_LAG: i32 = 161;

/// DB field names on `COUNTERS:oid:0x<sai_id>`, matching the reference
/// `DbTables` enum's member names.
const COUNTER_IN_OCTETS: &str = "SAI_PORT_STAT_IF_IN_OCTETS";
const COUNTER_IN_UCAST_PKTS: &str = "SAI_PORT_STAT_IF_IN_UCAST_PKTS";
const COUNTER_IN_DISCARDS: &str = "SAI_PORT_STAT_IF_IN_DISCARDS";
const COUNTER_IN_ERRORS: &str = "SAI_PORT_STAT_IF_IN_ERRORS";
const COUNTER_OUT_OCTETS: &str = "SAI_PORT_STAT_IF_OUT_OCTETS";
const COUNTER_OUT_UCAST_PKTS: &str = "SAI_PORT_STAT_IF_OUT_UCAST_PKTS";
const COUNTER_OUT_DISCARDS: &str = "SAI_PORT_STAT_IF_OUT_DISCARDS";
const COUNTER_OUT_ERRORS: &str = "SAI_PORT_STAT_IF_OUT_ERRORS";
const COUNTER_OUT_QLEN: &str = "SAI_PORT_STAT_IF_OUT_QLEN";

/// Maps a SONiC interface name to its 1-based ifIndex, following the
/// reference `get_index` numbering scheme. Returns `None` for names that
/// don't follow a recognized pattern rather than erroring - an
/// unrecognized name is simply left out of the table.
pub(crate) fn if_index_from_name(name: &str) -> Option<u32> {
    if let Some(n) = name.strip_prefix("Ethernet") {
        return n.parse::<u32>().ok().map(|n| n + 1);
    }
    if let Some(n) = name.strip_prefix("PortChannel") {
        return n.parse::<u32>().ok().map(|n| 1_000_000 + n);
    }
    None
}

/// Index of which interfaces exist, rebuilt by `reinit_data`.
struct IndexSnapshot {
    /// Sorted ifIndex values covering both physical ports and LAGs.
    if_range: Vec<u32>,
    /// ifIndex -> SONiC interface or LAG name.
    names: BTreeMap<u32, String>,
    /// ifIndex -> true if this entry is a LAG rather than a physical port.
    is_lag: BTreeMap<u32, bool>,
    /// SONiC interface name -> COUNTERS_DB SAI object id, physical ports only.
    sai_ids: BTreeMap<String, String>,
    /// LAG name -> member interface names.
    lag_members: BTreeMap<String, Vec<String>>,
}

impl IndexSnapshot {
    fn empty() -> Self {
        Self {
            if_range: Vec::new(),
            names: BTreeMap::new(),
            is_lag: BTreeMap::new(),
            sai_ids: BTreeMap::new(),
            lag_members: BTreeMap::new(),
        }
    }
}

/// Per-interface table snapshots, rebuilt by `update_data` against the
/// current [`IndexSnapshot`].
struct DataSnapshot {
    if_number: Value,
    if_entry: OidTable<Value>,
    if_x_entry: OidTable<Value>,
}

impl DataSnapshot {
    fn empty() -> Self {
        Self {
            if_number: Value::Integer(0),
            if_entry: OidTable::new(),
            if_x_entry: OidTable::new(),
        }
    }
}

fn status_value(status: Option<&String>) -> Value {
    match status.map(String::as_str) {
        Some("up") => Value::Integer(1),
        _ => Value::Integer(2),
    }
}

/// MIB producer and updater triple for `ifNumber`/`ifEntry`/`ifXEntry`.
pub struct InterfacesMib<D> {
    db: Arc<D>,
    index: Mutex<Arc<IndexSnapshot>>,
    data: Mutex<Arc<DataSnapshot>>,
}

impl<D: DbAdapter> InterfacesMib<D> {
    pub fn new(db: Arc<D>) -> Self {
        Self {
            db,
            index: Mutex::new(Arc::new(IndexSnapshot::empty())),
            data: Mutex::new(Arc::new(DataSnapshot::empty())),
        }
    }

    fn current_index(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&self.index.lock().unwrap())
    }

    fn current_data(&self) -> Arc<DataSnapshot> {
        Arc::clone(&self.data.lock().unwrap())
    }

    /// Read-only view backing the `ifNumber` scalar.
    pub fn if_number(self: &Arc<Self>) -> IfNumberView<D> {
        IfNumberView { mib: Arc::clone(self) }
    }

    /// Read-only view backing the `ifEntry` subtree.
    pub fn if_entry(self: &Arc<Self>) -> IfEntryView<D> {
        IfEntryView { mib: Arc::clone(self) }
    }

    /// Read-only view backing the `ifXEntry` subtree.
    pub fn if_x_entry(self: &Arc<Self>) -> IfXEntryView<D> {
        IfXEntryView { mib: Arc::clone(self) }
    }

    async fn build_index(&self) -> Result<IndexSnapshot> {
        let port_sai = self.db.get_all(COUNTERS_DB, "COUNTERS_PORT_NAME_MAP").await?;
        let mut if_range = Vec::new();
        let mut names = BTreeMap::new();
        let mut is_lag = BTreeMap::new();
        let mut sai_ids = BTreeMap::new();

        for name in port_sai.keys() {
            if let Some(index) = if_index_from_name(name) {
                if_range.push(index);
                names.insert(index, name.clone());
                is_lag.insert(index, false);
                sai_ids.insert(name.clone(), port_sai[name].clone());
            }
        }

        let lag_keys = self.db.keys(APPL_DB, "LAG_TABLE:*").await?;
        let mut lag_members = BTreeMap::new();
        for lag_key in &lag_keys {
            let Some(lag_name) = lag_key.strip_prefix("LAG_TABLE:") else {
                continue;
            };
            let Some(index) = if_index_from_name(lag_name) else {
                continue;
            };
            let member_keys = self
                .db
                .keys(APPL_DB, &format!("LAG_MEMBER_TABLE:{lag_name}:*"))
                .await?;
            let prefix = format!("LAG_MEMBER_TABLE:{lag_name}:");
            let members: Vec<String> = member_keys
                .iter()
                .filter_map(|k| k.strip_prefix(prefix.as_str()).map(str::to_string))
                .collect();

            if_range.push(index);
            names.insert(index, lag_name.to_string());
            is_lag.insert(index, true);
            lag_members.insert(lag_name.to_string(), members);
        }

        if_range.sort_unstable();
        if_range.dedup();

        Ok(IndexSnapshot { if_range, names, is_lag, sai_ids, lag_members })
    }

    async fn port_counters(&self, sai_id: &str) -> Result<BTreeMap<String, String>> {
        self.db.get_all(COUNTERS_DB, &format!("COUNTERS:oid:0x{sai_id}")).await
    }

    async fn raw_counter(&self, index: &IndexSnapshot, name: &str, field: &str) -> Result<u64> {
        let Some(sai_id) = index.sai_ids.get(name) else {
            return Ok(0);
        };
        let counters = self.port_counters(sai_id).await?;
        Ok(counters.get(field).and_then(|v| v.parse::<u64>().ok()).unwrap_or(0))
    }

    /// Sum of `field` across every member of `if_index` (a single physical
    /// port's own value if it isn't a LAG), unmasked.
    async fn aggregate_counter(&self, index: &IndexSnapshot, if_index: u32, field: &str) -> Result<u64> {
        let Some(name) = index.names.get(&if_index) else {
            return Ok(0);
        };
        if *index.is_lag.get(&if_index).unwrap_or(&false) {
            let mut total: u64 = 0;
            if let Some(members) = index.lag_members.get(name) {
                for member in members {
                    total = total.wrapping_add(self.raw_counter(index, member, field).await?);
                }
            }
            Ok(total)
        } else {
            self.raw_counter(index, name, field).await
        }
    }

    async fn entry_fields(&self, name: &str, is_lag: bool) -> Result<BTreeMap<String, String>> {
        if is_lag {
            self.db.get_all(APPL_DB, &format!("LAG_TABLE:{name}")).await
        } else {
            self.db.get_all(APPL_DB, &format!("PORT_TABLE:{name}")).await
        }
    }
}

impl<D: DbAdapter> Updater for InterfacesMib<D> {
    fn name(&self) -> &str {
        "interfaces"
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
            let mut if_entry = OidTable::with_capacity(index.if_range.len() * 15);
            let mut if_x_entry = OidTable::with_capacity(index.if_range.len() * 2);

            for &if_index in &index.if_range {
                let name = index.names.get(&if_index).cloned().unwrap_or_default();
                let is_lag = *index.is_lag.get(&if_index).unwrap_or(&false);
                let fields = self.entry_fields(&name, is_lag).await?;

                if_entry.insert(column_oid(&if_entry_base(), if_entry_column::IF_INDEX, if_index), Value::Integer(if_index as i32));
                if_entry.insert(
                    column_oid(&if_entry_base(), if_entry_column::IF_DESCR, if_index),
                    Value::OctetString(Bytes::from(name.clone())),
                );
                if_entry.insert(
                    column_oid(&if_entry_base(), if_entry_column::IF_TYPE, if_index),
                    Value::Integer(if is_lag { IF_TYPE_LAG } else { IF_TYPE_ETHERNET }),
                );
                if_entry.insert(
                    column_oid(&if_entry_base(), if_entry_column::IF_MTU, if_index),
                    Value::Integer(fields.get("mtu").and_then(|v| v.parse().ok()).unwrap_or(0)),
                );
                if_entry.insert(
                    column_oid(&if_entry_base(), if_entry_column::IF_ADMIN_STATUS, if_index),
                    status_value(fields.get("admin_status")),
                );
                if_entry.insert(
                    column_oid(&if_entry_base(), if_entry_column::IF_OPER_STATUS, if_index),
                    status_value(fields.get("oper_status")),
                );

                for (column, field) in [
                    (if_entry_column::IF_IN_OCTETS, COUNTER_IN_OCTETS),
                    (if_entry_column::IF_IN_UCAST_PKTS, COUNTER_IN_UCAST_PKTS),
                    (if_entry_column::IF_IN_DISCARDS, COUNTER_IN_DISCARDS),
                    (if_entry_column::IF_IN_ERRORS, COUNTER_IN_ERRORS),
                    (if_entry_column::IF_OUT_OCTETS, COUNTER_OUT_OCTETS),
                    (if_entry_column::IF_OUT_UCAST_PKTS, COUNTER_OUT_UCAST_PKTS),
                    (if_entry_column::IF_OUT_DISCARDS, COUNTER_OUT_DISCARDS),
                    (if_entry_column::IF_OUT_ERRORS, COUNTER_OUT_ERRORS),
                    (if_entry_column::IF_OUT_QLEN, COUNTER_OUT_QLEN),
                ] {
                    let raw = self.aggregate_counter(&index, if_index, field).await?;
                    if_entry.insert(column_oid(&if_entry_base(), column, if_index), Value::counter32_masked(raw));
                }

                let hc_in = self.aggregate_counter(&index, if_index, COUNTER_IN_OCTETS).await?;
                let hc_out = self.aggregate_counter(&index, if_index, COUNTER_OUT_OCTETS).await?;
                if_x_entry.insert(
                    column_oid(&if_x_entry_base(), if_x_entry_column::IF_HC_IN_OCTETS, if_index),
                    Value::Counter64(hc_in),
                );
                if_x_entry.insert(
                    column_oid(&if_x_entry_base(), if_x_entry_column::IF_HC_OUT_OCTETS, if_index),
                    Value::Counter64(hc_out),
                );
            }

            *self.data.lock().unwrap() = Arc::new(DataSnapshot {
                if_number: Value::Integer(index.if_range.len() as i32),
                if_entry,
                if_x_entry,
            });
            Ok(())
        })
    }
}

/// `ifNumber` scalar (`.1.3.6.1.2.1.2.1.0`).
pub struct IfNumberView<D> {
    mib: Arc<InterfacesMib<D>>,
}

impl<D> IfNumberView<D> {
    pub fn oid() -> Oid {
        if_number_oid()
    }
}

impl<D: DbAdapter> MibProducer for IfNumberView<D> {
    fn get<'a>(&'a self, _ctx: &'a RequestContext, oid: &'a Oid) -> BoxFuture<'a, GetResult> {
        let data = self.mib.current_data();
        Box::pin(async move {
            if *oid == if_number_oid() {
                GetResult::Value(data.if_number.clone())
            } else {
                GetResult::NoSuchObject
            }
        })
    }

    fn get_next<'a>(&'a self, _ctx: &'a RequestContext, oid: &'a Oid) -> BoxFuture<'a, GetNextResult> {
        let data = self.mib.current_data();
        Box::pin(async move {
            if *oid < if_number_oid() {
                GetNextResult::Value(crate::varbind::VarBind::new(if_number_oid(), data.if_number.clone()))
            } else {
                GetNextResult::EndOfMibView
            }
        })
    }
}

/// `ifEntry` subtree (`.1.3.6.1.2.1.2.2.1`).
pub struct IfEntryView<D> {
    mib: Arc<InterfacesMib<D>>,
}

impl<D> IfEntryView<D> {
    pub fn base_oid() -> Oid {
        if_entry_base()
    }
}

impl<D: DbAdapter> MibProducer for IfEntryView<D> {
    fn get<'a>(&'a self, _ctx: &'a RequestContext, oid: &'a Oid) -> BoxFuture<'a, GetResult> {
        let data = self.mib.current_data();
        Box::pin(async move {
            if !oid.starts_with(&if_entry_base()) {
                return GetResult::NoSuchObject;
            }
            data.if_entry.get(oid).cloned().map(GetResult::Value).unwrap_or(GetResult::NoSuchInstance)
        })
    }

    fn get_next<'a>(&'a self, _ctx: &'a RequestContext, oid: &'a Oid) -> BoxFuture<'a, GetNextResult> {
        let data = self.mib.current_data();
        Box::pin(async move {
            data.if_entry
                .get_next(oid)
                .map(|(next_oid, value)| GetNextResult::Value(crate::varbind::VarBind::new(next_oid.clone(), value.clone())))
                .unwrap_or(GetNextResult::EndOfMibView)
        })
    }
}

/// `ifXEntry` subtree (`.1.3.6.1.2.1.31.1.1.1`).
pub struct IfXEntryView<D> {
    mib: Arc<InterfacesMib<D>>,
}

impl<D> IfXEntryView<D> {
    pub fn base_oid() -> Oid {
        if_x_entry_base()
    }
}

impl<D: DbAdapter> MibProducer for IfXEntryView<D> {
    fn get<'a>(&'a self, _ctx: &'a RequestContext, oid: &'a Oid) -> BoxFuture<'a, GetResult> {
        let data = self.mib.current_data();
        Box::pin(async move {
            if !oid.starts_with(&if_x_entry_base()) {
                return GetResult::NoSuchObject;
            }
            data.if_x_entry.get(oid).cloned().map(GetResult::Value).unwrap_or(GetResult::NoSuchInstance)
        })
    }

    fn get_next<'a>(&'a self, _ctx: &'a RequestContext, oid: &'a Oid) -> BoxFuture<'a, GetNextResult> {
        let data = self.mib.current_data();
        Box::pin(async move {
            data.if_x_entry
                .get_next(oid)
                .map(|(next_oid, value)| GetNextResult::Value(crate::varbind::VarBind::new(next_oid.clone(), value.clone())))
                .unwrap_or(GetNextResult::EndOfMibView)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixture::FixtureDb;

    fn ctx() -> RequestContext {
        RequestContext::new(1, 1, 1)
    }

    async fn populated() -> Arc<InterfacesMib<FixtureDb>> {
        let db = Arc::new(FixtureDb::new());
        db.set(COUNTERS_DB, "COUNTERS_PORT_NAME_MAP", &[("Ethernet0", "1000000000001"), ("Ethernet4", "1000000000002")]);
        db.set(APPL_DB, "PORT_TABLE:Ethernet0", &[("admin_status", "up"), ("oper_status", "up"), ("mtu", "9100")]);
        db.set(APPL_DB, "PORT_TABLE:Ethernet4", &[("admin_status", "up"), ("oper_status", "down"), ("mtu", "9100")]);
        db.set(COUNTERS_DB, "COUNTERS:oid:0x1000000000001", &[("SAI_PORT_STAT_IF_IN_OCTETS", "1000"), ("SAI_PORT_STAT_IF_OUT_OCTETS", "2000")]);
        db.set(COUNTERS_DB, "COUNTERS:oid:0x1000000000002", &[("SAI_PORT_STAT_IF_IN_OCTETS", "500"), ("SAI_PORT_STAT_IF_OUT_OCTETS", "700")]);
        db.set(APPL_DB, "LAG_TABLE:PortChannel1", &[("admin_status", "up"), ("oper_status", "up")]);
        db.set(APPL_DB, "LAG_MEMBER_TABLE:PortChannel1:Ethernet0", &[("status", "enabled")]);
        db.set(APPL_DB, "LAG_MEMBER_TABLE:PortChannel1:Ethernet4", &[("status", "enabled")]);

        let mib = Arc::new(InterfacesMib::new(db));
        mib.reinit_data().await.unwrap();
        mib.update_data().await.unwrap();
        mib
    }

    #[tokio::test]
    async fn if_number_counts_physical_and_lag_interfaces() {
        let mib = populated().await;
        match mib.if_number().get(&ctx(), &if_number_oid()).await {
            GetResult::Value(Value::Integer(3)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn if_index_mapping_matches_reference_numbering() {
        assert_eq!(if_index_from_name("Ethernet0"), Some(1));
        assert_eq!(if_index_from_name("Ethernet4"), Some(5));
        assert_eq!(if_index_from_name("PortChannel1"), Some(1_000_001));
        assert_eq!(if_index_from_name("Vlan100"), None);
    }

    #[tokio::test]
    async fn physical_port_oper_status_reflects_db() {
        let mib = populated().await;
        let up = column_oid(&if_entry_base(), if_entry_column::IF_OPER_STATUS, 1);
        let down = column_oid(&if_entry_base(), if_entry_column::IF_OPER_STATUS, 5);
        assert!(matches!(mib.if_entry().get(&ctx(), &up).await, GetResult::Value(Value::Integer(1))));
        assert!(matches!(mib.if_entry().get(&ctx(), &down).await, GetResult::Value(Value::Integer(2))));
    }

    #[tokio::test]
    async fn lag_in_octets_is_masked_sum_of_members() {
        let mib = populated().await;
        let lag_index = 1_000_001;
        let oid = column_oid(&if_entry_base(), if_entry_column::IF_IN_OCTETS, lag_index);
        match mib.if_entry().get(&ctx(), &oid).await {
            GetResult::Value(Value::Counter32(total)) => assert_eq!(total, 1500),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn lag_hc_in_octets_is_unmasked_sum_of_members() {
        let mib = populated().await;
        let lag_index = 1_000_001;
        let oid = column_oid(&if_x_entry_base(), if_x_entry_column::IF_HC_IN_OCTETS, lag_index);
        match mib.if_x_entry().get(&ctx(), &oid).await {
            GetResult::Value(Value::Counter64(total)) => assert_eq!(total, 1500),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn if_entry_get_next_walks_in_oid_order() {
        let mib = populated().await;
        let before = if_entry_base();
        match mib.if_entry().get_next(&ctx(), &before).await {
            GetNextResult::Value(vb) => {
                assert_eq!(vb.oid, column_oid(&if_entry_base(), if_entry_column::IF_INDEX, 1));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn get_outside_base_oid_is_no_such_object() {
        let mib = populated().await;
        let unrelated = oid!(1, 3, 6, 1, 2, 1, 99);
        assert!(matches!(mib.if_entry().get(&ctx(), &unrelated).await, GetResult::NoSuchObject));
    }
}
