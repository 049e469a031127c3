//! MibProducer trait and related types.

use std::future::Future;
use std::pin::Pin;

use crate::oid::Oid;
use crate::value::Value;

use super::{GetNextResult, GetResult, RequestContext, SetResult};

/// Type alias for a boxed async return type (dyn-compatible).
///
/// Async trait methods cannot be object-safe, and producers are stored as
/// `Arc<dyn MibProducer>` in the MIB registry, so every method returns a
/// `BoxFuture` instead.
///
/// ```rust
/// use agentx_subagent::handler::{BoxFuture, GetResult};
///
/// fn example_async_fn<'a>(value: &'a i32) -> BoxFuture<'a, GetResult> {
///     Box::pin(async move {
///         GetResult::Value(agentx_subagent::Value::Integer(*value))
///     })
/// }
/// ```
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Answers Get/GetNext/Set requests for a region of the OID tree.
///
/// A producer is registered against a prefix (or, for a scalar, a single
/// exact OID) with [`MibBuilder`](crate::mib::MibBuilder). The registry
/// routes each request to the producer whose registered region covers it;
/// the producer is always handed the *full* request OID, not a suffix, so
/// it can reuse whatever indexing scheme fits the table it models.
///
/// # Required methods
///
/// - [`get`](MibProducer::get): answer a Get for a specific OID.
/// - [`get_next`](MibProducer::get_next): answer a GetNext, returning the
///   lexicographically next OID/value pair within this producer's region.
///
/// # Optional methods
///
/// - [`test_set`]/[`commit_set`]/[`undo_set`]/[`cleanup_set`]: the four
///   phases of an AgentX Set (RFC 2741 §7.2). Default to read-only
///   (`SetResult::NotWritable`, no-op cleanup).
///
/// [`test_set`]: MibProducer::test_set
/// [`commit_set`]: MibProducer::commit_set
/// [`undo_set`]: MibProducer::undo_set
/// [`cleanup_set`]: MibProducer::cleanup_set
///
/// # Example: read-only scalar pair
///
/// ```rust
/// use agentx_subagent::handler::{MibProducer, RequestContext, GetResult, GetNextResult, BoxFuture};
/// use agentx_subagent::{Oid, Value, VarBind, oid};
///
/// struct SystemInfo {
///     descr: String,
///     up_time: u32,
/// }
///
/// impl MibProducer for SystemInfo {
///     fn get<'a>(&'a self, _ctx: &'a RequestContext, oid: &'a Oid) -> BoxFuture<'a, GetResult> {
///         Box::pin(async move {
///             if oid == &oid!(1, 3, 6, 1, 2, 1, 1, 1, 0) {
///                 return GetResult::Value(Value::OctetString(self.descr.clone().into()));
///             }
///             if oid == &oid!(1, 3, 6, 1, 2, 1, 1, 3, 0) {
///                 return GetResult::Value(Value::TimeTicks(self.up_time));
///             }
///             GetResult::NoSuchObject
///         })
///     }
///
///     fn get_next<'a>(&'a self, _ctx: &'a RequestContext, oid: &'a Oid) -> BoxFuture<'a, GetNextResult> {
///         Box::pin(async move {
///             let descr = oid!(1, 3, 6, 1, 2, 1, 1, 1, 0);
///             let up_time = oid!(1, 3, 6, 1, 2, 1, 1, 3, 0);
///             if oid < &descr {
///                 return GetNextResult::Value(VarBind::new(descr, Value::OctetString(self.descr.clone().into())));
///             }
///             if oid < &up_time {
///                 return GetNextResult::Value(VarBind::new(up_time, Value::TimeTicks(self.up_time)));
///             }
///             GetNextResult::EndOfMibView
///         })
///     }
/// }
/// ```
///
/// # Set example
///
/// A writable scalar implements all four Set phases. `test_set` validates
/// without mutating; `commit_set` applies; `undo_set` reverts a commit that
/// was followed by a sibling varbind's commit failing; `cleanup_set`
/// releases any resources reserved during `test_set`, whether or not a
/// commit happened.
///
/// ```rust
/// use agentx_subagent::handler::{
///     MibProducer, RequestContext, GetResult, GetNextResult, SetResult, BoxFuture,
/// };
/// use agentx_subagent::{Oid, Value, VarBind, oid};
/// use std::sync::atomic::{AtomicI32, Ordering};
///
/// struct Counter {
///     value: AtomicI32,
/// }
///
/// impl MibProducer for Counter {
///     fn get<'a>(&'a self, _ctx: &'a RequestContext, oid: &'a Oid) -> BoxFuture<'a, GetResult> {
///         Box::pin(async move {
///             if oid == &oid!(1, 3, 6, 1, 4, 1, 99999, 1, 0) {
///                 GetResult::Value(Value::Integer(self.value.load(Ordering::Relaxed)))
///             } else {
///                 GetResult::NoSuchObject
///             }
///         })
///     }
///
///     fn get_next<'a>(&'a self, _ctx: &'a RequestContext, oid: &'a Oid) -> BoxFuture<'a, GetNextResult> {
///         Box::pin(async move {
///             let mine = oid!(1, 3, 6, 1, 4, 1, 99999, 1, 0);
///             if oid < &mine {
///                 GetNextResult::Value(VarBind::new(mine, Value::Integer(self.value.load(Ordering::Relaxed))))
///             } else {
///                 GetNextResult::EndOfMibView
///             }
///         })
///     }
///
///     fn test_set<'a>(&'a self, _ctx: &'a RequestContext, oid: &'a Oid, value: &'a Value) -> BoxFuture<'a, SetResult> {
///         Box::pin(async move {
///             if oid != &oid!(1, 3, 6, 1, 4, 1, 99999, 1, 0) {
///                 return SetResult::NotWritable;
///             }
///             match value {
///                 Value::Integer(_) => SetResult::Ok,
///                 _ => SetResult::WrongType,
///             }
///         })
///     }
///
///     fn commit_set<'a>(&'a self, _ctx: &'a RequestContext, _oid: &'a Oid, value: &'a Value) -> BoxFuture<'a, SetResult> {
///         Box::pin(async move {
///             if let Value::Integer(v) = value {
///                 self.value.store(*v, Ordering::Relaxed);
///                 SetResult::Ok
///             } else {
///                 SetResult::CommitFailed
///             }
///         })
///     }
/// }
/// ```
pub trait MibProducer: Send + Sync + 'static {
    /// Answer a Get for a specific OID.
    ///
    /// Return [`GetResult::Value`] if the OID exists, [`GetResult::NoSuchObject`]
    /// if this producer doesn't implement that object at all, or
    /// [`GetResult::NoSuchInstance`] if the object type is known but this
    /// particular instance (e.g. table row) doesn't exist.
    fn get<'a>(&'a self, ctx: &'a RequestContext, oid: &'a Oid) -> BoxFuture<'a, GetResult>;

    /// Answer a GetNext: the lexicographically next OID/value pair strictly
    /// after `oid`, or [`GetNextResult::EndOfMibView`] if none remain within
    /// this producer's region.
    fn get_next<'a>(
        &'a self,
        ctx: &'a RequestContext,
        oid: &'a Oid,
    ) -> BoxFuture<'a, GetNextResult>;

    /// Phase 1 of a Set: validate without mutating state.
    ///
    /// Called for every varbind in the PDU before any `commit_set`. Default
    /// implementation returns `NotWritable` (read-only producer).
    fn test_set<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        _oid: &'a Oid,
        _value: &'a Value,
    ) -> BoxFuture<'a, SetResult> {
        Box::pin(async { SetResult::NotWritable })
    }

    /// Phase 2 of a Set: apply the change.
    ///
    /// Only called after every `test_set` in the transaction succeeded. If
    /// this fails, `undo_set` runs for every varbind already committed in
    /// this transaction, in reverse order.
    fn commit_set<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        _oid: &'a Oid,
        _value: &'a Value,
    ) -> BoxFuture<'a, SetResult> {
        Box::pin(async { SetResult::NotWritable })
    }

    /// Phase 3 of a Set (on partial failure only): revert a prior commit.
    ///
    /// Best-effort: the master has already decided to fail the transaction,
    /// so a producer that can't undo should log and return.
    fn undo_set<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        _oid: &'a Oid,
        _value: &'a Value,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async {})
    }

    /// Phase 4 of a Set: release any resources reserved during `test_set`.
    ///
    /// Always called exactly once per varbind that went through `test_set`,
    /// regardless of whether `commit_set`/`undo_set` ran. Default is a
    /// no-op; override if `test_set` reserves a lock, buffer, or row.
    fn cleanup_set<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        _oid: &'a Oid,
        _value: &'a Value,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async {})
    }
}
