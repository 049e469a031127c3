//! Declarative composition of the OID tree this agent answers for.
//!
//! A [`MibTable`] is built once, at startup, from a [`MibBuilder`]: each
//! call registers either a single scalar OID or a subtree prefix against a
//! [`MibProducer`]. At request time, [`MibTable::get`] and
//! [`MibTable::get_next`] dispatch to whichever producer's region covers
//! the request, handing it the full OID rather than a stripped suffix so
//! it can reuse whatever indexing scheme fits the data it models.

use std::sync::Arc;

use crate::error::{Error, MibErrorKind};
use crate::handler::{GetNextResult, GetResult, MibProducer, OidTable, RequestContext};
use crate::oid::Oid;
use crate::varbind::VarBind;

enum Entry {
    Scalar { oid: Oid, producer: Arc<dyn MibProducer>, order: usize },
    Subtree { prefix: Oid, producer: Arc<dyn MibProducer>, order: usize },
}

impl Entry {
    fn order(&self) -> usize {
        match self {
            Entry::Scalar { order, .. } | Entry::Subtree { order, .. } => *order,
        }
    }
}

/// Builds a [`MibTable`] by registering scalars and subtrees in order.
///
/// Registration order matters twice: it's the order `Register` PDUs are
/// sent to the master at session startup (RFC 2741 recommends registering
/// in ascending priority; this agent just uses registration order as
/// priority), and it's the tie-break when two producers' `get_next`
/// proposals land on the identical next OID.
#[derive(Default)]
pub struct MibBuilder {
    entries: Vec<Entry>,
}

impl MibBuilder {
    /// Start an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a producer for a single, exact OID (a scalar instance,
    /// e.g. `sysDescr.0`).
    pub fn scalar(mut self, oid: Oid, producer: Arc<dyn MibProducer>) -> Result<Self, Error> {
        if self.entries.iter().any(|e| matches!(e, Entry::Scalar { oid: o, .. } if o == &oid)) {
            return Err(Error::mib(MibErrorKind::DuplicateScalar { oid }));
        }
        let order = self.entries.len();
        self.entries.push(Entry::Scalar { oid, producer, order });
        Ok(self)
    }

    /// Register a producer for every OID under `prefix` (a table or a
    /// group of related scalars).
    pub fn subtree(mut self, prefix: Oid, producer: Arc<dyn MibProducer>) -> Result<Self, Error> {
        if self
            .entries
            .iter()
            .any(|e| matches!(e, Entry::Subtree { prefix: p, .. } if p == &prefix))
        {
            return Err(Error::mib(MibErrorKind::DuplicateSubtree { oid: prefix }));
        }
        let order = self.entries.len();
        self.entries.push(Entry::Subtree { prefix, producer, order });
        Ok(self)
    }

    /// Finish composition, producing an immutable [`MibTable`].
    pub fn build(self) -> MibTable {
        let mut scalars = OidTable::new();
        let mut subtrees = Vec::new();
        for entry in self.entries {
            match entry {
                Entry::Scalar { oid, producer, order } => scalars.insert(oid, (order, producer)),
                Entry::Subtree { prefix, producer, order } => {
                    subtrees.push((prefix, order, producer))
                }
            }
        }
        MibTable { scalars, subtrees }
    }
}

/// The composed OID tree: every scalar and subtree this agent registered,
/// ready to answer Get/GetNext/Set requests.
pub struct MibTable {
    scalars: OidTable<(usize, Arc<dyn MibProducer>)>,
    subtrees: Vec<(Oid, usize, Arc<dyn MibProducer>)>,
}

impl MibTable {
    /// The OIDs to send `Register` PDUs for, in registration order.
    pub fn registrations(&self) -> Vec<Oid> {
        let mut ordered: Vec<(usize, Oid)> = self
            .scalars
            .iter()
            .map(|(oid, (order, _))| (*order, oid.clone()))
            .chain(self.subtrees.iter().map(|(prefix, order, _)| (*order, prefix.clone())))
            .collect();
        ordered.sort_by_key(|(order, _)| *order);
        ordered.into_iter().map(|(_, oid)| oid).collect()
    }

    /// Find the producer whose region covers `oid`, preferring an exact
    /// scalar match, otherwise the longest subtree prefix that contains
    /// it. Ties (equal-length covering prefixes) resolve to whichever was
    /// registered first.
    ///
    /// Exposed crate-wide (rather than private) so the Set coordinator can
    /// dispatch `test_set`/`commit_set`/`undo_set`/`cleanup_set` to the same
    /// producer a `get`/`get_next` for that OID would reach.
    pub(crate) fn find_producer(&self, oid: &Oid) -> Option<&Arc<dyn MibProducer>> {
        if let Some((_, p)) = self.scalars.get(oid) {
            return Some(p);
        }
        let mut best: Option<(&Oid, usize, &Arc<dyn MibProducer>)> = None;
        for (prefix, order, producer) in &self.subtrees {
            if !oid.starts_with(prefix) {
                continue;
            }
            match best {
                Some((best_prefix, best_order, _))
                    if best_prefix.len() > prefix.len()
                        || (best_prefix.len() == prefix.len() && best_order <= *order) => {}
                _ => best = Some((prefix, *order, producer)),
            }
        }
        best.map(|(_, _, p)| p)
    }

    /// Answer a Get for `oid`.
    pub async fn get(&self, ctx: &RequestContext, oid: &Oid) -> GetResult {
        match self.find_producer(oid) {
            Some(producer) => producer.get(ctx, oid).await,
            None => GetResult::NoSuchObject,
        }
    }

    /// Answer a GetNext for `oid`: the lexicographically next OID/value
    /// across every registered scalar and subtree.
    ///
    /// Each producer is queried with either `oid` itself (if `oid` already
    /// falls inside or past its region) or its own root OID (if `oid` is
    /// still strictly before it - asking a producer for "next after my own
    /// root" is how its first real entry is discovered). The smallest
    /// resulting OID across every producer wins; a tie resolves to
    /// whichever producer registered first.
    pub async fn get_next(&self, ctx: &RequestContext, oid: &Oid) -> GetNextResult {
        let mut best: Option<(usize, VarBind)> = None;

        for (scalar_oid, (order, producer)) in self.scalars.iter() {
            if oid >= scalar_oid {
                continue;
            }
            if let GetResult::Value(value) = producer.get(ctx, scalar_oid).await {
                let candidate = VarBind::new(scalar_oid.clone(), value);
                best = Some(pick_smaller(best, *order, candidate));
            }
        }

        for (prefix, order, producer) in &self.subtrees {
            let query = if oid < prefix { prefix } else { oid };
            if let GetNextResult::Value(candidate) = producer.get_next(ctx, query).await
                && candidate.oid.starts_with(prefix)
            {
                best = Some(pick_smaller(best, *order, candidate));
            }
        }

        GetNextResult::from_option(best.map(|(_, vb)| vb))
    }
}

/// Keep `current` unless `candidate` sorts strictly earlier; on an exact
/// OID tie, keep whichever side has the lower registration order (i.e.
/// first-registered-wins), independent of which loop produced it.
fn pick_smaller(
    current: Option<(usize, VarBind)>,
    candidate_order: usize,
    candidate: VarBind,
) -> (usize, VarBind) {
    match current {
        Some((cur_order, cur)) if cur.oid < candidate.oid => (cur_order, cur),
        Some((cur_order, cur)) if cur.oid == candidate.oid && cur_order <= candidate_order => {
            (cur_order, cur)
        }
        _ => (candidate_order, candidate),
    }
}
