//! Producer types for answering AgentX MIB operations.
//!
//! This module provides the interface MIB data sources implement:
//!
//! - [`MibProducer`] - trait for answering Get, GetNext, and Set operations
//! - [`RequestContext`] - session/transaction identifiers for the request
//! - [`GetResult`], [`GetNextResult`], [`SetResult`] - operation results
//! - [`OidTable`] - sorted-storage helper for implementing GetNext
//!
//! # Overview
//!
//! Producers are registered with a [`MibBuilder`](crate::mib::MibBuilder)
//! against a scalar OID or a subtree prefix. At request time, the
//! [`MibTable`](crate::mib::MibTable) it builds dispatches to whichever
//! producer's region covers the request, handing it the full request OID.
//!
//! # Basic Producer Example
//!
//! A minimal producer that provides one scalar value:
//!
//! ```rust
//! use agentx_subagent::handler::{MibProducer, RequestContext, GetResult, GetNextResult, BoxFuture};
//! use agentx_subagent::{Oid, Value, VarBind, oid};
//!
//! struct MyProducer;
//!
//! impl MibProducer for MyProducer {
//!     fn get<'a>(&'a self, _ctx: &'a RequestContext, oid: &'a Oid) -> BoxFuture<'a, GetResult> {
//!         Box::pin(async move {
//!             if oid == &oid!(1, 3, 6, 1, 4, 1, 99999, 1, 0) {
//!                 return GetResult::Value(Value::Integer(42));
//!             }
//!             GetResult::NoSuchObject
//!         })
//!     }
//!
//!     fn get_next<'a>(&'a self, _ctx: &'a RequestContext, oid: &'a Oid) -> BoxFuture<'a, GetNextResult> {
//!         Box::pin(async move {
//!             let my_oid = oid!(1, 3, 6, 1, 4, 1, 99999, 1, 0);
//!             if oid < &my_oid {
//!                 return GetNextResult::Value(VarBind::new(my_oid, Value::Integer(42)));
//!             }
//!             GetNextResult::EndOfMibView
//!         })
//!     }
//! }
//! ```
//!
//! # Set Operations and Four-Phase Commit
//!
//! Set operations follow AgentX's four-phase protocol (RFC 2741 §7.2):
//!
//! 1. **TestSet**: [`MibProducer::test_set`] is called for every varbind in
//!    the PDU before any commits. If any test fails, nothing is mutated.
//! 2. **CommitSet**: [`MibProducer::commit_set`] is called for each varbind.
//!    If one fails, [`MibProducer::undo_set`] runs for every varbind
//!    already committed, in reverse order.
//! 3. **CleanupSet**: [`MibProducer::cleanup_set`] always runs last,
//!    releasing anything reserved during `test_set`.
//!
//! By default, producers are read-only (`test_set` returns
//! [`SetResult::NotWritable`]). See [`MibProducer`] for a writable example.
//!
//! # Using OidTable for GetNext
//!
//! For producers with static or slowly-changing data, [`OidTable`]
//! simplifies GetNext by maintaining entries in sorted order:
//!
//! ```rust
//! use agentx_subagent::handler::{MibProducer, RequestContext, GetResult, GetNextResult, OidTable, BoxFuture};
//! use agentx_subagent::{Oid, Value, VarBind, oid};
//!
//! struct StaticProducer {
//!     table: OidTable<Value>,
//! }
//!
//! impl StaticProducer {
//!     fn new() -> Self {
//!         let mut table = OidTable::new();
//!         table.insert(oid!(1, 3, 6, 1, 4, 1, 99999, 1, 0), Value::Integer(100));
//!         table.insert(oid!(1, 3, 6, 1, 4, 1, 99999, 2, 0), Value::OctetString("test".into()));
//!         Self { table }
//!     }
//! }
//!
//! impl MibProducer for StaticProducer {
//!     fn get<'a>(&'a self, _ctx: &'a RequestContext, oid: &'a Oid) -> BoxFuture<'a, GetResult> {
//!         Box::pin(async move {
//!             self.table.get(oid)
//!                 .cloned()
//!                 .map(GetResult::Value)
//!                 .unwrap_or(GetResult::NoSuchObject)
//!         })
//!     }
//!
//!     fn get_next<'a>(&'a self, _ctx: &'a RequestContext, oid: &'a Oid) -> BoxFuture<'a, GetNextResult> {
//!         Box::pin(async move {
//!             self.table.get_next(oid)
//!                 .map(|(o, v)| GetNextResult::Value(VarBind::new(o.clone(), v.clone())))
//!                 .unwrap_or(GetNextResult::EndOfMibView)
//!         })
//!     }
//! }
//! ```

mod context;
mod oid_table;
mod results;
mod traits;

pub use context::RequestContext;
pub use oid_table::OidTable;
pub use results::{GetNextResult, GetResult, Response, SetResult};
pub use traits::{BoxFuture, MibProducer};
