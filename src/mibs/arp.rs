//! IP-MIB ARP table: `ipNetToMediaPhysAddress` (`.1.3.6.1.2.1.4.22.1.2`).
//!
//! Supplemented from the reference `ArpUpdater`/`IpMib`: one instance per
//! `(ifIndex, ip address)` pair, the peer's MAC address as the value. This
//! is the literal table the crate's worked end-to-end scenarios exercise.

use std::sync::Arc;
use std::sync::Mutex;

use bytes::Bytes;

use crate::db::{DbAdapter, APPL_DB};
use crate::error::Result;
use crate::handler::{BoxFuture, GetNextResult, GetResult, MibProducer, OidTable, RequestContext};
use crate::oid::Oid;
use crate::oid;
use crate::updater::Updater;
use crate::value::Value;

/// Base OID of `ipNetToMediaPhysAddress`; each entry appends
/// `ifIndex.ip0.ip1.ip2.ip3`.
fn base_oid() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 4, 22, 1, 2)
}

fn entry_oid(if_index: u32, ip: [u8; 4]) -> Oid {
    base_oid().child(&[if_index, ip[0] as u32, ip[1] as u32, ip[2] as u32, ip[3] as u32])
}

/// DB row: `ARP_TABLE:<if_index>:<ip>` with a `neigh` field holding the MAC
/// address in colon-hex notation (`"aa:bb:cc:dd:ee:ff"`).
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

fn parse_key(key: &str) -> Option<(u32, [u8; 4])> {
    let rest = key.strip_prefix("ARP_TABLE:")?;
    let (if_index, ip) = rest.split_once(':')?;
    let if_index: u32 = if_index.parse().ok()?;
    let mut octets = [0u8; 4];
    for (slot, part) in octets.iter_mut().zip(ip.split('.')) {
        *slot = part.parse().ok()?;
    }
    Some((if_index, octets))
}

/// Read-only snapshot of the ARP table, rebuilt wholesale on every refresh.
struct Snapshot {
    table: OidTable<Value>,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            table: OidTable::new(),
        }
    }
}

/// MIB producer and updater pair for the ARP table.
pub struct ArpMib<D> {
    db: Arc<D>,
    snapshot: Mutex<Arc<Snapshot>>,
}

impl<D: DbAdapter> ArpMib<D> {
    pub fn new(db: Arc<D>) -> Self {
        Self {
            db,
            snapshot: Mutex::new(Arc::new(Snapshot::empty())),
        }
    }

    /// The subtree prefix this producer answers for: `ipNetToMediaPhysAddress`.
    pub fn base_oid() -> Oid {
        base_oid()
    }

    fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.lock().unwrap())
    }
}

impl<D: DbAdapter> MibProducer for ArpMib<D> {
    fn get<'a>(&'a self, _ctx: &'a RequestContext, oid: &'a Oid) -> BoxFuture<'a, GetResult> {
        let snapshot = self.current();
        Box::pin(async move {
            if oid.starts_with(&base_oid()) {
                snapshot
                    .table
                    .get(oid)
                    .cloned()
                    .map(GetResult::Value)
                    .unwrap_or(GetResult::NoSuchInstance)
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
                .map(|(next_oid, value)| {
                    GetNextResult::Value(crate::varbind::VarBind::new(next_oid.clone(), value.clone()))
                })
                .unwrap_or(GetNextResult::EndOfMibView)
        })
    }
}

impl<D: DbAdapter> Updater for ArpMib<D> {
    fn name(&self) -> &str {
        "arp"
    }

    fn update_data<'a>(&'a self) -> crate::updater::BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let keys = self.db.keys(APPL_DB, "ARP_TABLE:*").await?;
            let mut table = OidTable::with_capacity(keys.len());
            for key in &keys {
                let Some((if_index, ip)) = parse_key(key) else {
                    continue;
                };
                let Some(mac) = self.db.hget(APPL_DB, key, "neigh").await?.and_then(|s| parse_mac(&s)) else {
                    continue;
                };
                table.insert(entry_oid(if_index, ip), Value::OctetString(Bytes::copy_from_slice(&mac)));
            }
            *self.snapshot.lock().unwrap() = Arc::new(Snapshot { table });
            Ok(())
        })
    }
}
