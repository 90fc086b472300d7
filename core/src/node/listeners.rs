//! Listener traits and copy-on-write listener sets.
//!
//! Registration and removal replace the shared list; notification iterates
//! a snapshot taken up front. A listener may therefore add or remove
//! listeners (including itself) while being notified without affecting the
//! iteration in progress.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use super::column::Column;
use super::scalar::Scalar;
use super::table::Table;
use crate::namespace::ObjectId;
use crate::types::{Outcome, RowAction};

/// Handle returned by registration, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerKey(u64);

pub struct ListenerSet<L: ?Sized> {
    entries: RwLock<Arc<Vec<(ListenerKey, Arc<L>)>>>,
    next_key: AtomicU64,
}

impl<L: ?Sized> ListenerSet<L> {
    pub fn new() -> Self {
        ListenerSet {
            entries: RwLock::new(Arc::new(Vec::new())),
            next_key: AtomicU64::new(1),
        }
    }

    pub fn add(&self, listener: Arc<L>) -> ListenerKey {
        let key = ListenerKey(self.next_key.fetch_add(1, Ordering::Relaxed));
        let mut guard = self.entries.write();
        let mut next: Vec<(ListenerKey, Arc<L>)> = (**guard).clone();
        next.push((key, listener));
        *guard = Arc::new(next);
        key
    }

    /// Returns whether `key` was registered.
    pub fn remove(&self, key: ListenerKey) -> bool {
        let mut guard = self.entries.write();
        if !guard.iter().any(|(k, _)| *k == key) {
            return false;
        }
        let next: Vec<(ListenerKey, Arc<L>)> =
            guard.iter().filter(|(k, _)| *k != key).cloned().collect();
        *guard = Arc::new(next);
        true
    }

    /// Listeners in registration order, as of now.
    pub fn snapshot(&self) -> Vec<Arc<L>> {
        let current = self.entries.read().clone();
        current.iter().map(|(_, l)| l.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<L: ?Sized> Default for ListenerSet<L> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Table listeners
// ---------------------------------------------------------------------------

/// Called before a read is served, subject to coalescing. Typically
/// refreshes the table's rows from application state.
pub trait TableGetListener: Send + Sync {
    fn on_get(&self, table: &Table);
}

/// Called after a remote mutation was committed.
pub trait TableSetListener: Send + Sync {
    fn on_set(&self, table: &Table, row: &ObjectId, column: &Column, action: RowAction);
}

/// Called during prepare. Anything other than `Outcome::Success` vetoes
/// the mutation. `value` is `None` for row creation and deletion.
pub trait TableValidationListener: Send + Sync {
    fn validate(
        &self,
        table: &Table,
        value: Option<&Value>,
        row: &ObjectId,
        column: &Column,
        action: RowAction,
    ) -> Outcome;
}

impl<F> TableGetListener for F
where
    F: Fn(&Table) + Send + Sync,
{
    fn on_get(&self, table: &Table) {
        self(table)
    }
}

impl<F> TableSetListener for F
where
    F: Fn(&Table, &ObjectId, &Column, RowAction) + Send + Sync,
{
    fn on_set(&self, table: &Table, row: &ObjectId, column: &Column, action: RowAction) {
        self(table, row, column, action)
    }
}

impl<F> TableValidationListener for F
where
    F: Fn(&Table, Option<&Value>, &ObjectId, &Column, RowAction) -> Outcome + Send + Sync,
{
    fn validate(
        &self,
        table: &Table,
        value: Option<&Value>,
        row: &ObjectId,
        column: &Column,
        action: RowAction,
    ) -> Outcome {
        self(table, value, row, column, action)
    }
}

// ---------------------------------------------------------------------------
// Scalar listeners
// ---------------------------------------------------------------------------

pub trait ScalarGetListener: Send + Sync {
    fn on_get(&self, scalar: &Scalar);
}

pub trait ScalarSetListener: Send + Sync {
    fn on_set(&self, scalar: &Scalar, value: &Value);
}

pub trait ScalarValidationListener: Send + Sync {
    fn validate(&self, scalar: &Scalar, value: &Value) -> Outcome;
}

impl<F> ScalarGetListener for F
where
    F: Fn(&Scalar) + Send + Sync,
{
    fn on_get(&self, scalar: &Scalar) {
        self(scalar)
    }
}

impl<F> ScalarSetListener for F
where
    F: Fn(&Scalar, &Value) + Send + Sync,
{
    fn on_set(&self, scalar: &Scalar, value: &Value) {
        self(scalar, value)
    }
}

impl<F> ScalarValidationListener for F
where
    F: Fn(&Scalar, &Value) -> Outcome + Send + Sync,
{
    fn validate(&self, scalar: &Scalar, value: &Value) -> Outcome {
        self(scalar, value)
    }
}

// ---------------------------------------------------------------------------
// Restore-default
// ---------------------------------------------------------------------------

/// The node a restore-default notification is about.
#[derive(Clone, Copy)]
pub enum NodeRef<'a> {
    Scalar(&'a Scalar),
    Table(&'a Table),
}

impl NodeRef<'_> {
    pub fn id(&self) -> &ObjectId {
        match self {
            NodeRef::Scalar(s) => s.id(),
            NodeRef::Table(t) => t.id(),
        }
    }
}

/// Asked to put a node back to its application defaults after its
/// snapshot was discarded.
pub trait RestoreDefaultListener: Send + Sync {
    fn restore_default(&self, node: NodeRef<'_>);
}

impl<F> RestoreDefaultListener for F
where
    F: Fn(NodeRef<'_>) + Send + Sync,
{
    fn restore_default(&self, node: NodeRef<'_>) {
        self(node)
    }
}
