//! Four-phase Set protocol (RFC 2741 §7.2): TestSet, CommitSet, UndoSet, CleanupSet.
//!
//! AgentX spreads a single Set across up to four separate PDUs. Only the
//! first, TestSet, carries the varbind list; the later three identify the
//! transaction by `(session_id, transaction_id)` alone and expect this
//! subagent to remember what TestSet reserved. [`SetCoordinator`] is that
//! memory.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::ErrorStatus;
use crate::handler::{RequestContext, Response};
use crate::mib::MibTable;
use crate::oid::Oid;
use crate::value::Value;
use crate::varbind::VarBind;

/// A varbind reserved by `test_set`, carried forward to later phases.
#[derive(Clone)]
struct Reserved {
    oid: Oid,
    value: Value,
}

/// Set state for one `(session_id, transaction_id)` pair.
struct Transaction {
    reserved: Vec<Reserved>,
    /// Number of leading entries of `reserved` that `commit_set` applied.
    committed: usize,
}

/// Tracks in-flight Set transactions across the PDUs that make them up.
///
/// One coordinator is shared by a session's whole lifetime; each AgentX
/// session only runs one Set at a time per the RFC, but nothing here assumes
/// that beyond keying on `(session_id, transaction_id)`.
#[derive(Default)]
pub struct SetCoordinator {
    transactions: Mutex<HashMap<(u32, u32), Transaction>>,
}

impl SetCoordinator {
    /// Create an empty coordinator with no in-flight transactions.
    pub fn new() -> Self {
        Self::default()
    }

    fn key(ctx: &RequestContext) -> (u32, u32) {
        (ctx.session_id, ctx.transaction_id)
    }

    /// Phase 1: validate every varbind in the PDU against its producer.
    ///
    /// Stops at the first failure and reports it with the failing varbind's
    /// 1-based index, per RFC 2741 §7.2.4.2. Nothing is mutated in this
    /// phase; a producer that needs to reserve a resource to validate
    /// should release it in `cleanup_set`, which always runs afterward
    /// whether or not the transaction as a whole succeeds.
    pub async fn test_set(
        &self,
        mib: &MibTable,
        ctx: &RequestContext,
        varbinds: &[VarBind],
    ) -> Response {
        let mut reserved = Vec::with_capacity(varbinds.len());

        for (index, vb) in varbinds.iter().enumerate() {
            let Some(producer) = mib.find_producer(&vb.oid) else {
                return Response::error(
                    ErrorStatus::NotWritable,
                    (index + 1) as i32,
                    varbinds.to_vec(),
                );
            };

            let result = producer.test_set(ctx, &vb.oid, &vb.value).await;
            if !result.is_ok() {
                return Response::error(
                    result.to_error_status(),
                    (index + 1) as i32,
                    varbinds.to_vec(),
                );
            }

            reserved.push(Reserved {
                oid: vb.oid.clone(),
                value: vb.value.clone(),
            });
        }

        self.transactions.lock().unwrap().insert(
            Self::key(ctx),
            Transaction {
                reserved,
                committed: 0,
            },
        );
        Response::success(varbinds.to_vec())
    }

    /// Phase 2: apply the change for each varbind `test_set` reserved, in
    /// order.
    ///
    /// If one fails, every varbind already committed in this transaction is
    /// rolled back via `undo_set`, in reverse order, before the failure is
    /// reported - a Set is all-or-nothing from the caller's perspective even
    /// though individual producers apply it one varbind at a time.
    pub async fn commit_set(&self, mib: &MibTable, ctx: &RequestContext) -> Response {
        let reserved = {
            let transactions = self.transactions.lock().unwrap();
            match transactions.get(&Self::key(ctx)) {
                Some(txn) => txn.reserved.clone(),
                None => return Response::error(ErrorStatus::CommitFailed, 0, Vec::new()),
            }
        };
        let varbinds: Vec<VarBind> = reserved
            .iter()
            .map(|r| VarBind::new(r.oid.clone(), r.value.clone()))
            .collect();

        for (index, r) in reserved.iter().enumerate() {
            let Some(producer) = mib.find_producer(&r.oid) else {
                self.rollback(mib, ctx, &reserved[..index]).await;
                return Response::error(ErrorStatus::CommitFailed, (index + 1) as i32, varbinds);
            };

            let result = producer.commit_set(ctx, &r.oid, &r.value).await;
            if !result.is_ok() {
                self.rollback(mib, ctx, &reserved[..index]).await;
                return Response::error(
                    result.to_error_status(),
                    (index + 1) as i32,
                    varbinds,
                );
            }

            if let Some(txn) = self.transactions.lock().unwrap().get_mut(&Self::key(ctx)) {
                txn.committed = index + 1;
            }
        }

        Response::success(varbinds)
    }

    async fn rollback(&self, mib: &MibTable, ctx: &RequestContext, committed: &[Reserved]) {
        for r in committed.iter().rev() {
            if let Some(producer) = mib.find_producer(&r.oid) {
                producer.undo_set(ctx, &r.oid, &r.value).await;
            }
        }
    }

    /// Phase 3: revert every varbind this transaction committed.
    ///
    /// The master only sends an explicit UndoSet PDU when this session's
    /// CommitSet succeeded in full but a sibling session in the same
    /// master-level transaction failed, so this always rolls back the
    /// whole committed prefix, not a partial one.
    pub async fn undo_set(&self, mib: &MibTable, ctx: &RequestContext) -> Response {
        let reserved = {
            let transactions = self.transactions.lock().unwrap();
            match transactions.get(&Self::key(ctx)) {
                Some(txn) => txn.reserved[..txn.committed].to_vec(),
                None => return Response::error(ErrorStatus::UndoFailed, 0, Vec::new()),
            }
        };
        self.rollback(mib, ctx, &reserved).await;
        let varbinds = reserved
            .into_iter()
            .map(|r| VarBind::new(r.oid, r.value))
            .collect();
        Response::success(varbinds)
    }

    /// Phase 4: release whatever `test_set` reserved and forget the
    /// transaction.
    ///
    /// Always runs, whether TestSet failed, CommitSet succeeded, or UndoSet
    /// ran - RFC 2741 requires it as the terminal PDU of every Set attempt.
    pub async fn cleanup_set(&self, mib: &MibTable, ctx: &RequestContext) {
        let txn = self.transactions.lock().unwrap().remove(&Self::key(ctx));
        let Some(txn) = txn else { return };
        for r in &txn.reserved {
            if let Some(producer) = mib.find_producer(&r.oid) {
                producer.cleanup_set(ctx, &r.oid, &r.value).await;
            }
        }
    }
}
