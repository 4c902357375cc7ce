//! Nested-collection reconciliation.
//!
//! A planned nested list is keyed by a natural key the user can see (a
//! domain, a server group name); the server's copy carries the same key plus
//! server-assigned sub-ids. Matching is on the normalized natural key, never
//! on sub-ids, because the user only learns those after apply.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::diag::Diagnostics;
use crate::error::ProvisionerError;

/// What to do when a plan declares the same natural key twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKeys {
    /// Fail with a validation error naming the key.
    #[default]
    Reject,
    /// The last declaration replaces earlier ones, keeping the first position.
    LastWins,
}

/// Normalized natural key: trimmed and case-folded.
pub fn natural_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// A nested record as the server returns it.
pub trait RemoteRecord {
    fn natural_key(&self) -> &str;

    /// Server-assigned identity, used for explicit deletion.
    fn sub_id(&self) -> &str;
}

/// A nested record as the user declares it.
pub trait PlanRecord: Clone {
    type Remote: RemoteRecord;

    fn natural_key(&self) -> &str;

    /// Copy every server-assigned identity field from `remote`, and any field
    /// left blank here. Fields set here are never overwritten.
    fn absorb(&mut self, remote: &Self::Remote);

    /// Replace identity fields with `remote`'s, or clear them when `None`.
    fn set_identity(&mut self, remote: Option<&Self::Remote>);

    /// Build a record for a server entry that no plan or state declares.
    fn from_remote(remote: &Self::Remote) -> Self;

    /// Whether `remote` is this record on read-back. Key equality by default.
    fn same_record(&self, remote: &Self::Remote) -> bool {
        natural_key(self.natural_key()) == natural_key(remote.natural_key())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled<P> {
    /// Plan records in plan order, with identities absorbed.
    pub records: Vec<P>,
    /// Sub-ids of server records the plan no longer declares.
    pub to_delete: Vec<String>,
    /// Normalized natural keys of those records.
    pub deleted_keys: Vec<String>,
    /// The parent-level key list with deleted keys removed.
    pub parent_keys: Vec<String>,
}

/// Merge planned nested records with the server's authoritative list.
///
/// Output order follows the plan regardless of server order. A blank natural
/// key or (under [`DuplicateKeys::Reject`]) a repeated one is a validation
/// error; all such problems are reported together.
pub fn reconcile<P: PlanRecord>(
    plan: &[P],
    remote: &[P::Remote],
    parent_keys: &[String],
    duplicates: DuplicateKeys,
) -> Result<Reconciled<P>, ProvisionerError> {
    let mut diags = Diagnostics::new();
    let mut planned: HashMap<String, &P> = HashMap::with_capacity(plan.len());
    let mut ordered: Vec<String> = Vec::with_capacity(plan.len());
    let mut reported: HashSet<String> = HashSet::new();

    for (index, record) in plan.iter().enumerate() {
        let key = natural_key(record.natural_key());
        if key.is_empty() {
            diags.error(
                "Missing key",
                format!("nested record #{} has an empty key", index + 1),
            );
            continue;
        }
        if planned.insert(key.clone(), record).is_none() {
            ordered.push(key);
            continue;
        }
        match duplicates {
            DuplicateKeys::Reject => {
                if reported.insert(key.clone()) {
                    diags.error("Duplicate key", format!("{key:?} is declared more than once"));
                }
            }
            DuplicateKeys::LastWins => {
                tracing::debug!(key = %key, "duplicate key, last declaration wins");
            }
        }
    }

    let mut existing: HashMap<String, &P::Remote> = HashMap::with_capacity(remote.len());
    for record in remote {
        existing
            .entry(natural_key(record.natural_key()))
            .or_insert(record);
    }

    let records: Vec<P> = ordered
        .iter()
        .filter_map(|key| {
            let mut record = (*planned.get(key)?).clone();
            if let Some(server) = existing.get(key) {
                record.absorb(server);
            }
            Some(record)
        })
        .collect();

    let mut to_delete = Vec::new();
    let mut deleted_keys: Vec<String> = Vec::new();
    for record in remote {
        let key = natural_key(record.natural_key());
        if planned.contains_key(&key) {
            continue;
        }
        // Several server records may share one dropped key; each goes.
        if !record.sub_id().is_empty() {
            to_delete.push(record.sub_id().to_string());
        }
        if !deleted_keys.contains(&key) {
            deleted_keys.push(key);
        }
    }

    let parent_keys = parent_keys
        .iter()
        .filter(|k| !deleted_keys.contains(&natural_key(k)))
        .cloned()
        .collect();

    diags.into_result(Reconciled {
        records,
        to_delete,
        deleted_keys,
        parent_keys,
    })
}

/// Read-back overlay: keep the state's records and order, refreshing each
/// record's identity from the server copy that is the same record and
/// clearing identities that no longer match. Server records under a key the
/// state does not know are appended, so drift shows up in the next plan.
pub fn overlay_identities<P: PlanRecord>(state: &[P], remote: &[P::Remote]) -> Vec<P> {
    let mut claimed = vec![false; remote.len()];
    let mut out: Vec<P> = Vec::with_capacity(state.len().max(remote.len()));

    for record in state {
        let mut record = record.clone();
        let matched = remote
            .iter()
            .enumerate()
            .find(|(i, server)| !claimed[*i] && record.same_record(server));
        match matched {
            Some((i, server)) => {
                claimed[i] = true;
                record.set_identity(Some(server));
            }
            None => record.set_identity(None),
        }
        out.push(record);
    }

    let known: HashSet<String> = out.iter().map(|r| natural_key(r.natural_key())).collect();
    for (i, server) in remote.iter().enumerate() {
        if !claimed[i] && !known.contains(&natural_key(server.natural_key())) {
            out.push(P::from_remote(server));
        }
    }
    out
}

/// Reorder `items` to follow `plan_keys`. Items the plan does not mention
/// keep their relative order after the planned ones.
pub fn order_like_plan<T>(plan_keys: &[String], items: Vec<T>, key: impl Fn(&T) -> &str) -> Vec<T> {
    let mut rest: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let mut out = Vec::with_capacity(rest.len());

    for wanted in plan_keys.iter().map(|k| natural_key(k)) {
        let slot = rest
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|t| natural_key(key(t)) == wanted));
        if let Some(item) = slot.and_then(Option::take) {
            out.push(item);
        }
    }

    out.extend(rest.into_iter().flatten());
    out
}
