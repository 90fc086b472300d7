//! Managed-object registry and request routing.
//!
//! Scalars and tables are registered per context name under their base
//! identifier. Registered subtrees may not overlap within one context.
//!
//! Wire identifiers resolve as:
//!
//! ```text
//!   scalar:  <scalar oid>.0
//!   cell:    <table oid>.<column tag>.<row arcs...>
//! ```
//!
//! A SET request is routed in two passes: every target is prepared first,
//! and commits run only when all prepares succeeded.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::namespace::ObjectId;
use crate::node::{RowMutation, RowSnapshot, Scalar, Table};
use crate::types::Outcome;
use crate::value::Variable;

/// The context name used when none is given.
pub const DEFAULT_CONTEXT: &str = "";

/// A registered node.
#[derive(Debug, Clone)]
pub enum ManagedObject {
    Scalar(Arc<Scalar>),
    Table(Arc<Table>),
}

impl ManagedObject {
    pub fn id(&self) -> &ObjectId {
        match self {
            ManagedObject::Scalar(s) => s.id(),
            ManagedObject::Table(t) => t.id(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ManagedObject::Scalar(_) => "scalar",
            ManagedObject::Table(_) => "table",
        }
    }

    pub fn is_volatile(&self) -> bool {
        match self {
            ManagedObject::Scalar(s) => s.is_volatile(),
            ManagedObject::Table(t) => t.is_volatile(),
        }
    }

    pub fn persist_loaded(&self) -> bool {
        match self {
            ManagedObject::Scalar(s) => s.persist_loaded(),
            ManagedObject::Table(t) => t.persist_loaded(),
        }
    }

    pub fn load_persisted(&self) -> bool {
        match self {
            ManagedObject::Scalar(s) => s.load_persisted(),
            ManagedObject::Table(t) => t.load_persisted(),
        }
    }
}

impl From<Arc<Scalar>> for ManagedObject {
    fn from(s: Arc<Scalar>) -> Self {
        ManagedObject::Scalar(s)
    }
}

impl From<Arc<Table>> for ManagedObject {
    fn from(t: Arc<Table>) -> Self {
        ManagedObject::Table(t)
    }
}

/// One identifier/value pair of a request.
#[derive(Debug, Clone, PartialEq)]
pub struct VarBind {
    pub oid: ObjectId,
    pub value: Variable,
}

impl VarBind {
    pub fn new(oid: ObjectId, value: Variable) -> Self {
        VarBind { oid, value }
    }
}

/// Result of a SET request. `index` points at the offending binding when
/// a prepare refused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetResponse {
    pub outcome: Outcome,
    pub index: Option<usize>,
}

impl SetResponse {
    pub fn success() -> Self {
        SetResponse {
            outcome: Outcome::Success,
            index: None,
        }
    }

    pub fn failed(outcome: Outcome, index: Option<usize>) -> Self {
        SetResponse { outcome, index }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Work for one table in a SET request, in request order.
struct TableWork {
    table: Arc<Table>,
    positions: Vec<usize>,
    mutations: Vec<RowMutation>,
}

enum Resolved {
    Scalar(Arc<Scalar>),
    Cell {
        table: Arc<Table>,
        row: ObjectId,
        tag: u32,
    },
}

#[derive(Default)]
pub struct MoServer {
    objects: BTreeMap<(String, ObjectId), ManagedObject>,
}

impl MoServer {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------

    /// Register `object` in `context`. Fails if its identifier equals,
    /// contains or lies inside an already registered one.
    pub fn register(&mut self, context: &str, object: impl Into<ManagedObject>) -> Result<()> {
        let object = object.into();
        let id = object.id().clone();
        let clash = self
            .objects
            .keys()
            .filter(|(ctx, _)| ctx == context)
            .any(|(_, existing)| existing.starts_with(&id) || id.starts_with(existing));
        if clash {
            return Err(Error::DuplicateRegistration {
                id,
                context: context.to_string(),
            });
        }
        info!(node = %id.labelled(), context, kind = object.kind(), "registered");
        self.objects.insert((context.to_string(), id), object);
        Ok(())
    }

    pub fn unregister(&mut self, context: &str, id: &ObjectId) -> Option<ManagedObject> {
        let removed = self.objects.remove(&(context.to_string(), id.clone()));
        if removed.is_some() {
            debug!(node = %id.labelled(), context, "unregistered");
        }
        removed
    }

    /// The object whose subtree holds `oid`.
    pub fn lookup(&self, context: &str, oid: &ObjectId) -> Option<&ManagedObject> {
        self.objects
            .iter()
            .find(|((ctx, id), _)| ctx == context && oid.starts_with(id))
            .map(|(_, object)| object)
    }

    /// Every registration as `(context, object)`, ordered by context then
    /// identifier.
    pub fn objects(&self) -> impl Iterator<Item = (&str, &ManagedObject)> {
        self.objects.iter().map(|((ctx, _), object)| (ctx.as_str(), object))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    // -------------------------------------------------------------------
    // Routing
    // -------------------------------------------------------------------

    fn resolve(&self, context: &str, oid: &ObjectId) -> std::result::Result<Resolved, Outcome> {
        let object = self.lookup(context, oid).ok_or(Outcome::NoSuchName)?;
        let suffix = oid.suffix_after(object.id()).ok_or(Outcome::NoSuchName)?;
        match object {
            ManagedObject::Scalar(s) => {
                if suffix.arcs() != [0] {
                    return Err(Outcome::NoSuchName);
                }
                Ok(Resolved::Scalar(s.clone()))
            }
            ManagedObject::Table(t) => {
                let Some((tag, row)) = suffix.arcs().split_first() else {
                    return Err(Outcome::NoSuchName);
                };
                if row.is_empty() {
                    return Err(Outcome::NoSuchName);
                }
                Ok(Resolved::Cell {
                    table: t.clone(),
                    row: ObjectId::from_arcs(row),
                    tag: *tag,
                })
            }
        }
    }

    /// Read one scalar instance or table cell.
    pub fn get(&self, context: &str, oid: &ObjectId) -> std::result::Result<Variable, Outcome> {
        match self.resolve(context, oid)? {
            Resolved::Scalar(s) => Ok(s.get()),
            Resolved::Cell { table, row, tag } => {
                let column = table.column_by_tag(tag).ok_or(Outcome::NoSuchName)?;
                table.get_cell(&row, &column).map_err(|e| e.outcome())
            }
        }
    }

    /// Read every row of the table registered exactly at `oid`.
    pub fn get_table(&self, context: &str, oid: &ObjectId) -> std::result::Result<Vec<RowSnapshot>, Outcome> {
        match self.objects.get(&(context.to_string(), oid.clone())) {
            Some(ManagedObject::Table(t)) => Ok(t.read_rows()),
            _ => Err(Outcome::NoSuchName),
        }
    }

    /// Route a SET request.
    ///
    /// A refused prepare returns its outcome and the binding's position
    /// with nothing changed. A failure while committing is reported to the
    /// fault registry and answered with `commitFailed`; the remaining
    /// targets are still committed.
    pub fn set(&self, context: &str, bindings: &[VarBind]) -> SetResponse {
        let mut scalars: Vec<(usize, Arc<Scalar>, Variable)> = Vec::new();
        let mut tables: Vec<TableWork> = Vec::new();

        for (position, binding) in bindings.iter().enumerate() {
            match self.resolve(context, &binding.oid) {
                Err(outcome) => return SetResponse::failed(outcome, Some(position)),
                Ok(Resolved::Scalar(s)) => scalars.push((position, s, binding.value.clone())),
                Ok(Resolved::Cell { table, row, tag }) => {
                    let mutation = match table.decode_write(row, tag, binding.value.clone()) {
                        Ok(m) => m,
                        Err(outcome) => return SetResponse::failed(outcome, Some(position)),
                    };
                    match tables.iter_mut().find(|w| Arc::ptr_eq(&w.table, &table)) {
                        Some(work) => {
                            work.positions.push(position);
                            work.mutations.push(mutation);
                        }
                        None => tables.push(TableWork {
                            table,
                            positions: vec![position],
                            mutations: vec![mutation],
                        }),
                    }
                }
            }
        }

        for (position, scalar, value) in &scalars {
            let outcome = scalar.prepare(value.clone());
            if !outcome.is_success() {
                return SetResponse::failed(outcome, Some(*position));
            }
        }
        for work in &tables {
            if let Err((i, outcome)) = work.table.prepare_batch(&work.mutations) {
                return SetResponse::failed(outcome, work.positions.get(i).copied());
            }
        }

        let mut response = SetResponse::success();
        for (_, scalar, value) in scalars {
            if let Err(e) = scalar.commit(value) {
                scalar.context().faults().report(&format!("commit failed for {}", scalar.id()), &e);
                response = SetResponse::failed(Outcome::CommitFailed, None);
            }
        }
        for work in tables {
            let table = work.table;
            if let Err(e) = table.commit_batch(work.mutations) {
                table.context().faults().report(&format!("commit failed for {}", table.id()), &e);
                response = SetResponse::failed(Outcome::CommitFailed, None);
            }
        }
        response
    }
}

impl std::fmt::Debug for MoServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MoServer").field("objects", &self.objects.len()).finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::faults::FaultRegistry;
    use crate::agent::AgentContext;
    use crate::node::{Column, RowStatus};
    use crate::persist::{MemoryBackend, PersistStorage, SavePolicy};
    use crate::types::Access;
    use crate::value::Syntax;
    use serde_json::{json, Value};

    fn oid(s: &str) -> ObjectId {
        ObjectId::parse(s).unwrap()
    }

    struct Fixture {
        backend: MemoryBackend,
        faults: Arc<FaultRegistry>,
        server: MoServer,
        scalar: Arc<Scalar>,
        table: Arc<Table>,
    }

    fn fixture() -> Fixture {
        let backend = MemoryBackend::new();
        let storage = PersistStorage::open(backend.clone(), SavePolicy::OnChange).unwrap();
        let faults = Arc::new(FaultRegistry::new(false));
        let ctx = Arc::new(AgentContext::new(Arc::new(storage)).with_faults(faults.clone()));
        let scalar = Arc::new(Scalar::new(&ctx, oid("1.3.6.1.4.1.99.1.1"), Syntax::OctetString, Access::ReadWrite));
        let table = Arc::new(
            Table::builder(oid("1.3.6.1.4.1.99.2.1"))
                .column(Column::new("name", 0, 2), Syntax::OctetString, Access::ReadCreate)
                .row_status_column(Column::new("status", 1, 3))
                .build(&ctx)
                .unwrap(),
        );
        let mut server = MoServer::new();
        server.register(DEFAULT_CONTEXT, scalar.clone()).unwrap();
        server.register(DEFAULT_CONTEXT, table.clone()).unwrap();
        Fixture {
            backend,
            faults,
            server,
            scalar,
            table,
        }
    }

    fn status(row: u32) -> ObjectId {
        oid(&format!("1.3.6.1.4.1.99.2.1.3.{}", row))
    }

    fn name(row: u32) -> ObjectId {
        oid(&format!("1.3.6.1.4.1.99.2.1.2.{}", row))
    }

    // --- Registration ---

    #[test]
    fn overlapping_registration_fails() {
        let mut f = fixture();
        let inner = f.scalar.clone();
        let err = f.server.register(DEFAULT_CONTEXT, inner).unwrap_err();
        assert!(matches!(err, Error::DuplicateRegistration { .. }));

        let ctx = f.scalar.context().clone();
        let below = Arc::new(Scalar::new(&ctx, oid("1.3.6.1.4.1.99.2.1.9"), Syntax::Integer32, Access::ReadOnly));
        assert!(f.server.register(DEFAULT_CONTEXT, below.clone()).is_err());
        f.server.register("other", below).unwrap();
        assert_eq!(f.server.len(), 3);
    }

    #[test]
    fn unregister_and_lookup() {
        let mut f = fixture();
        assert!(f.server.lookup(DEFAULT_CONTEXT, &name(1)).is_some());
        assert!(f.server.lookup("other", &name(1)).is_none());
        let removed = f.server.unregister(DEFAULT_CONTEXT, f.table.id());
        assert!(removed.is_some());
        assert!(f.server.lookup(DEFAULT_CONTEXT, &name(1)).is_none());
    }

    // --- GET ---

    #[test]
    fn get_scalar_instance() {
        let f = fixture();
        f.scalar.set_value("hello").unwrap();
        let v = f.server.get(DEFAULT_CONTEXT, &oid("1.3.6.1.4.1.99.1.1.0")).unwrap();
        assert_eq!(v, Variable::text("hello"));
        assert_eq!(
            f.server.get(DEFAULT_CONTEXT, &oid("1.3.6.1.4.1.99.1.1")),
            Err(Outcome::NoSuchName)
        );
        assert_eq!(
            f.server.get(DEFAULT_CONTEXT, &oid("1.3.6.1.4.1.99.1.1.1")),
            Err(Outcome::NoSuchName)
        );
    }

    #[test]
    fn get_missing_cell_is_no_such_name() {
        let f = fixture();
        assert_eq!(f.server.get(DEFAULT_CONTEXT, &name(1)), Err(Outcome::NoSuchName));
        assert_eq!(
            f.server.get(DEFAULT_CONTEXT, &oid("1.3.6.1.4.1.99.2.1.7.1")),
            Err(Outcome::NoSuchName)
        );
        assert_eq!(f.server.get(DEFAULT_CONTEXT, &oid("1.3.6.1.4.1.99.9")), Err(Outcome::NoSuchName));
    }

    // --- SET ---

    #[test]
    fn create_read_destroy_through_router() {
        let f = fixture();
        let response = f.server.set(
            DEFAULT_CONTEXT,
            &[
                VarBind::new(name(5), Variable::text("x")),
                VarBind::new(status(5), RowStatus::CreateAndGo.as_variable()),
            ],
        );
        assert_eq!(response, SetResponse::success());
        assert_eq!(f.server.get(DEFAULT_CONTEXT, &name(5)).unwrap(), Variable::text("x"));
        assert_eq!(f.server.get(DEFAULT_CONTEXT, &status(5)).unwrap(), Variable::Integer32(1));

        let rows = f.server.get_table(DEFAULT_CONTEXT, f.table.id()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].values, vec![json!("x"), json!(1)]);

        let response = f.server.set(
            DEFAULT_CONTEXT,
            &[VarBind::new(status(5), RowStatus::Destroy.as_variable())],
        );
        assert!(response.is_success());
        assert_eq!(f.table.row_count(), 0);
    }

    #[test]
    fn refused_prepare_changes_nothing() {
        let f = fixture();
        f.table.add_validation_listener(Arc::new(
            |_: &Table, v: Option<&Value>, _: &ObjectId, _: &Column, _: crate::types::RowAction| {
                if v == Some(&json!("bad")) {
                    Outcome::WrongValue
                } else {
                    Outcome::Success
                }
            },
        ));
        let before = f.backend.write_count();
        let response = f.server.set(
            DEFAULT_CONTEXT,
            &[
                VarBind::new(oid("1.3.6.1.4.1.99.1.1.0"), Variable::text("kept?")),
                VarBind::new(status(1), RowStatus::CreateAndGo.as_variable()),
                VarBind::new(name(1), Variable::text("bad")),
            ],
        );
        assert_eq!(response, SetResponse::failed(Outcome::WrongValue, Some(2)));
        assert_eq!(f.table.row_count(), 0);
        assert_eq!(f.scalar.peek(), Variable::text(""));
        assert_eq!(f.backend.write_count(), before);
    }

    #[test]
    fn cell_write_without_row_is_no_creation() {
        let f = fixture();
        let response = f.server.set(DEFAULT_CONTEXT, &[VarBind::new(name(3), Variable::text("x"))]);
        assert_eq!(response, SetResponse::failed(Outcome::NoCreation, Some(0)));
    }

    #[test]
    fn wrong_type_reports_position() {
        let f = fixture();
        let response = f.server.set(
            DEFAULT_CONTEXT,
            &[
                VarBind::new(status(1), RowStatus::CreateAndGo.as_variable()),
                VarBind::new(oid("1.3.6.1.4.1.99.1.1.0"), Variable::Integer32(1)),
            ],
        );
        assert_eq!(response, SetResponse::failed(Outcome::WrongType, Some(1)));
    }

    #[test]
    fn commit_failure_is_reported() {
        let f = fixture();
        f.backend.set_fail_writes(true);
        let response = f.server.set(
            DEFAULT_CONTEXT,
            &[VarBind::new(oid("1.3.6.1.4.1.99.1.1.0"), Variable::text("v"))],
        );
        assert_eq!(response, SetResponse::failed(Outcome::CommitFailed, None));
        assert_eq!(f.faults.reported(), 1);
        assert_eq!(f.scalar.peek(), Variable::text("v"));
    }
}
