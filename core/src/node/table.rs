//! Table engine: rows keyed by identifier, a fixed column schema, the
//! row-status state machine and the two-phase write pipeline.
//!
//! Remote writes arrive as [`RowMutation`]s. [`Table::prepare`] (or
//! [`Table::prepare_batch`]) runs the state machine and validation
//! listeners without changing anything; [`Table::commit`] (or
//! [`Table::commit_batch`]) applies, fires set listeners and persists.
//!
//! Application code mutates rows directly through `add_row`,
//! `set_value_at` and friends. Those calls neither validate nor persist;
//! call [`Table::persist`] to snapshot after a batch of application edits.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::column::Column;
use super::listeners::{
    ListenerKey, ListenerSet, NodeRef, RestoreDefaultListener, TableGetListener, TableSetListener,
    TableValidationListener,
};
use super::row_status::{RowMutation, RowStatus, Transition};
use crate::agent::AgentContext;
use crate::error::{Error, Result};
use crate::namespace::ObjectId;
use crate::persist::{NodeTraits, Persistable, RowEntry, SchemaMismatch, SnapshotEntry, TableEntry};
use crate::types::{Access, Outcome, RowAction};
use crate::value::{default_variable, to_generic, to_variable, Syntax, ValueInput, Variable};

#[derive(Debug, Clone)]
struct ColumnDef {
    column: Column,
    syntax: Syntax,
    access: Access,
}

/// One row in generic form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowSnapshot {
    pub row: ObjectId,
    pub values: Vec<Value>,
}

/// Column-by-column table definition.
pub struct TableBuilder {
    id: ObjectId,
    columns: Vec<ColumnDef>,
    row_status: Vec<usize>,
}

impl TableBuilder {
    pub fn column(mut self, column: Column, syntax: Syntax, access: Access) -> Self {
        self.columns.push(ColumnDef {
            column,
            syntax,
            access,
        });
        self
    }

    /// The row-status column: `Integer32`, read-create, new rows `active`.
    pub fn row_status_column(mut self, column: Column) -> Self {
        self.row_status.push(self.columns.len());
        self.columns.push(ColumnDef {
            column,
            syntax: Syntax::Integer32,
            access: Access::ReadCreate,
        });
        self
    }

    /// Check the schema and build the table.
    ///
    /// Fails when there are no columns, a column's index does not match
    /// its position, a name or tag repeats, or more than one row-status
    /// column was declared.
    pub fn build(self, ctx: &Arc<AgentContext>) -> Result<Table> {
        if self.columns.is_empty() {
            return Err(Error::Schema(format!("table {} has no columns", self.id)));
        }
        if self.row_status.len() > 1 {
            return Err(Error::Schema(format!("table {} declares more than one row-status column", self.id)));
        }
        let mut names = HashSet::new();
        let mut tags = HashSet::new();
        for (position, def) in self.columns.iter().enumerate() {
            if def.column.index != position {
                return Err(Error::Schema(format!(
                    "column {} has index {} but is declared at position {}",
                    def.column.name, def.column.index, position
                )));
            }
            if !names.insert(def.column.name.clone()) {
                return Err(Error::Schema(format!("duplicate column name '{}'", def.column.name)));
            }
            if !tags.insert(def.column.tag) {
                return Err(Error::Schema(format!("duplicate column tag {}", def.column.tag)));
            }
        }

        let row_status = self.row_status.first().copied();
        let defaults = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, def)| {
                if Some(i) == row_status {
                    RowStatus::Active.as_variable()
                } else {
                    default_variable(def.syntax)
                }
            })
            .collect();

        Ok(Table {
            id: self.id,
            columns: self.columns,
            row_status,
            ctx: ctx.clone(),
            events: ReentrantMutex::new(()),
            state: Mutex::new(TableState {
                rows: BTreeMap::new(),
                defaults,
                volatile: false,
                persist_loaded: false,
                last_get: None,
            }),
            get_listeners: ListenerSet::new(),
            set_listeners: ListenerSet::new(),
            validation_listeners: ListenerSet::new(),
            restore_listeners: ListenerSet::new(),
        })
    }
}

struct TableState {
    /// The row arena; the table is its only mutator.
    rows: BTreeMap<ObjectId, Vec<Variable>>,
    defaults: Vec<Variable>,
    volatile: bool,
    persist_loaded: bool,
    last_get: Option<u64>,
}

pub struct Table {
    id: ObjectId,
    columns: Vec<ColumnDef>,
    row_status: Option<usize>,
    ctx: Arc<AgentContext>,
    events: ReentrantMutex<()>,
    state: Mutex<TableState>,
    get_listeners: ListenerSet<dyn TableGetListener>,
    set_listeners: ListenerSet<dyn TableSetListener>,
    validation_listeners: ListenerSet<dyn TableValidationListener>,
    restore_listeners: ListenerSet<dyn RestoreDefaultListener>,
}

impl Table {
    pub fn builder(id: ObjectId) -> TableBuilder {
        TableBuilder {
            id,
            columns: Vec::new(),
            row_status: Vec::new(),
        }
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn context(&self) -> &Arc<AgentContext> {
        &self.ctx
    }

    pub fn is_volatile(&self) -> bool {
        self.state.lock().volatile
    }

    pub fn persist_loaded(&self) -> bool {
        self.state.lock().persist_loaded
    }

    // -------------------------------------------------------------------
    // Schema
    // -------------------------------------------------------------------

    pub fn columns(&self) -> Vec<Column> {
        self.columns.iter().map(|s| s.column.clone()).collect()
    }

    pub fn syntaxes(&self) -> Vec<Syntax> {
        self.columns.iter().map(|s| s.syntax).collect()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> Result<Column> {
        self.columns
            .get(index)
            .map(|s| s.column.clone())
            .ok_or(Error::IndexOutOfRange {
                index,
                len: self.columns.len(),
            })
    }

    pub fn column_by_tag(&self, tag: u32) -> Option<Column> {
        self.columns
            .iter()
            .find(|s| s.column.tag == tag)
            .map(|s| s.column.clone())
    }

    pub fn column_syntax(&self, column: &Column) -> Result<Syntax> {
        Ok(self.columns[self.check_column(column)?].syntax)
    }

    pub fn column_access(&self, column: &Column) -> Result<Access> {
        Ok(self.columns[self.check_column(column)?].access)
    }

    pub fn row_status_column(&self) -> Option<Column> {
        self.row_status.map(|i| self.columns[i].column.clone())
    }

    /// True if any column accepts remote writes.
    pub fn is_writable(&self) -> bool {
        self.columns.iter().any(|s| s.access.is_writable())
    }

    /// Position of `column`, which must be one of this table's columns
    /// exactly (name, index and tag).
    fn check_column(&self, column: &Column) -> Result<usize> {
        match self.columns.get(column.index) {
            Some(def) if def.column == *column => Ok(column.index),
            _ => Err(Error::NoSuchColumn {
                table: self.id.clone(),
                column: column.to_string(),
            }),
        }
    }

    // -------------------------------------------------------------------
    // Listener registration
    // -------------------------------------------------------------------

    pub fn add_get_listener(&self, l: Arc<dyn TableGetListener>) -> ListenerKey {
        self.get_listeners.add(l)
    }

    pub fn remove_get_listener(&self, key: ListenerKey) -> bool {
        self.get_listeners.remove(key)
    }

    pub fn add_set_listener(&self, l: Arc<dyn TableSetListener>) -> ListenerKey {
        self.set_listeners.add(l)
    }

    pub fn remove_set_listener(&self, key: ListenerKey) -> bool {
        self.set_listeners.remove(key)
    }

    pub fn add_validation_listener(&self, l: Arc<dyn TableValidationListener>) -> ListenerKey {
        self.validation_listeners.add(l)
    }

    pub fn remove_validation_listener(&self, key: ListenerKey) -> bool {
        self.validation_listeners.remove(key)
    }

    pub fn add_restore_default_listener(&self, l: Arc<dyn RestoreDefaultListener>) -> ListenerKey {
        self.restore_listeners.add(l)
    }

    pub fn remove_restore_default_listener(&self, key: ListenerKey) -> bool {
        self.restore_listeners.remove(key)
    }

    // -------------------------------------------------------------------
    // Application-side row access
    // -------------------------------------------------------------------

    pub fn row_count(&self) -> usize {
        self.state.lock().rows.len()
    }

    pub fn row_ids(&self) -> Vec<ObjectId> {
        self.state.lock().rows.keys().cloned().collect()
    }

    pub fn contains_row(&self, row: &ObjectId) -> bool {
        self.state.lock().rows.contains_key(row)
    }

    /// Identifier of the row at `index` in identifier order.
    pub fn row_id(&self, index: usize) -> Result<ObjectId> {
        let state = self.state.lock();
        state.rows.keys().nth(index).cloned().ok_or(Error::IndexOutOfRange {
            index,
            len: state.rows.len(),
        })
    }

    pub fn row_index(&self, row: &ObjectId) -> Option<usize> {
        self.state.lock().rows.keys().position(|k| k == row)
    }

    /// Add a row filled with column defaults.
    pub fn add_row(&self, row: ObjectId) -> Result<()> {
        let _guard = self.events.lock();
        if row.is_empty() {
            return Err(Error::Schema(format!("empty row identifier for {}", self.id)));
        }
        let mut state = self.state.lock();
        if state.rows.contains_key(&row) {
            return Err(Error::DuplicateRow {
                table: self.id.clone(),
                row,
            });
        }
        let values = state.defaults.clone();
        debug!(node = %self.id.labelled(), row = %row, "row added");
        state.rows.insert(row, values);
        Ok(())
    }

    /// Add a row after the greatest existing identifier (`1` when empty).
    pub fn add_row_next(&self) -> Result<ObjectId> {
        let _guard = self.events.lock();
        let next = {
            let state = self.state.lock();
            match state.rows.keys().next_back() {
                Some(last) => last.next(),
                None => Some(ObjectId::from_arcs(&[1])),
            }
        };
        let row = next.ok_or_else(|| Error::Schema(format!("row identifiers exhausted in {}", self.id)))?;
        self.add_row(row.clone())?;
        Ok(row)
    }

    /// Remove a row. Returns the identifier that followed it, wrapping to
    /// the first row, or `None` when no rows remain.
    pub fn delete_row(&self, row: &ObjectId) -> Result<Option<ObjectId>> {
        let _guard = self.events.lock();
        let mut state = self.state.lock();
        if state.rows.remove(row).is_none() {
            return Err(Error::NoSuchRow {
                table: self.id.clone(),
                row: row.clone(),
            });
        }
        debug!(node = %self.id.labelled(), row = %row, "row deleted");
        let following = state
            .rows
            .range(row.clone()..)
            .next()
            .or_else(|| state.rows.iter().next())
            .map(|(k, _)| k.clone());
        Ok(following)
    }

    pub fn delete_all(&self) {
        let _guard = self.events.lock();
        self.state.lock().rows.clear();
    }

    pub fn variable_at(&self, row: &ObjectId, column: &Column) -> Result<Variable> {
        let index = self.check_column(column)?;
        let state = self.state.lock();
        let values = state.rows.get(row).ok_or_else(|| Error::NoSuchRow {
            table: self.id.clone(),
            row: row.clone(),
        })?;
        Ok(values[index].clone())
    }

    pub fn value_at(&self, row: &ObjectId, column: &Column) -> Result<Value> {
        Ok(to_generic(&self.variable_at(row, column)?))
    }

    /// Store a cell value without validation, events or persistence.
    pub fn set_value_at(&self, value: impl Into<ValueInput>, row: &ObjectId, column: &Column) -> Result<()> {
        let _guard = self.events.lock();
        let index = self.check_column(column)?;
        let variable = self.convert(value, index)?;
        let mut state = self.state.lock();
        let values = state.rows.get_mut(row).ok_or_else(|| Error::NoSuchRow {
            table: self.id.clone(),
            row: row.clone(),
        })?;
        values[index] = variable;
        Ok(())
    }

    /// Values new rows start with, one per column. The row-status column
    /// always starts `active` regardless of what is given for it.
    pub fn set_default_values(&self, values: &[Value]) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(Error::Schema(format!(
                "{} default values for {} columns",
                values.len(),
                self.columns.len()
            )));
        }
        let mut defaults = Vec::with_capacity(values.len());
        for (index, value) in values.iter().enumerate() {
            if Some(index) == self.row_status {
                defaults.push(RowStatus::Active.as_variable());
            } else {
                defaults.push(self.convert(value, index)?);
            }
        }
        self.state.lock().defaults = defaults;
        Ok(())
    }

    /// Whether a remote write may change this cell.
    pub fn is_cell_editable(&self, row: &ObjectId, column: &Column) -> Result<bool> {
        let index = self.check_column(column)?;
        if !self.contains_row(row) {
            return Err(Error::NoSuchRow {
                table: self.id.clone(),
                row: row.clone(),
            });
        }
        Ok(self.columns[index].access.is_writable())
    }

    /// All rows in identifier order, without firing GET listeners.
    pub fn rows(&self) -> Vec<RowSnapshot> {
        let state = self.state.lock();
        state
            .rows
            .iter()
            .map(|(row, values)| RowSnapshot {
                row: row.clone(),
                values: values.iter().map(to_generic).collect(),
            })
            .collect()
    }

    fn convert(&self, value: impl Into<ValueInput>, index: usize) -> Result<Variable> {
        let syntax = self.columns[index].syntax;
        let variable = to_variable(value, syntax)?;
        if variable.syntax() != syntax {
            return Err(crate::value::ConversionError::new(
                syntax,
                variable.to_string(),
                format!("value has syntax {}", variable.syntax()),
            )
            .into());
        }
        Ok(variable)
    }

    // -------------------------------------------------------------------
    // Reads with GET events
    // -------------------------------------------------------------------

    /// Fire GET listeners unless one fired within the coalescing window.
    pub fn fire_get_event(&self) -> bool {
        let _guard = self.events.lock();
        if self.get_listeners.is_empty() {
            return false;
        }
        let now = self.ctx.now_ms();
        {
            let mut state = self.state.lock();
            if !self.ctx.get_window_open(state.last_get, now) {
                return false;
            }
            state.last_get = Some(now);
        }
        debug!(node = %self.id.labelled(), "fire get event");
        for l in self.get_listeners.snapshot() {
            l.on_get(self);
        }
        true
    }

    /// All rows after GET listeners had a chance to refresh them.
    pub fn read_rows(&self) -> Vec<RowSnapshot> {
        self.fire_get_event();
        self.rows()
    }

    /// One cell after GET listeners.
    pub fn get_cell(&self, row: &ObjectId, column: &Column) -> Result<Variable> {
        self.fire_get_event();
        self.variable_at(row, column)
    }

    // -------------------------------------------------------------------
    // Remote writes: decode, prepare, commit
    // -------------------------------------------------------------------

    /// Turn a cell write into a mutation. Unknown columns are
    /// `noSuchName`; a status value that is not a known code is
    /// `wrongValue`.
    pub fn decode_write(&self, row: ObjectId, column_tag: u32, value: Variable) -> std::result::Result<RowMutation, Outcome> {
        let column = self.column_by_tag(column_tag).ok_or(Outcome::NoSuchName)?;
        if row.is_empty() {
            return Err(Outcome::NoSuchName);
        }
        if Some(column.index) == self.row_status {
            if !matches!(value, Variable::Integer32(_)) {
                return Err(Outcome::WrongType);
            }
            let target = RowStatus::from_variable(&value).ok_or(Outcome::WrongValue)?;
            return Ok(RowMutation::Status { row, target });
        }
        Ok(RowMutation::Change { row, column, value })
    }

    /// Check one mutation. Changes nothing; safe to repeat.
    pub fn prepare(&self, mutation: &RowMutation) -> Outcome {
        let _guard = self.events.lock();
        match mutation {
            RowMutation::Status { row, target } => {
                let Some(status) = self.row_status_column() else {
                    return Outcome::NotWritable;
                };
                match target.transition(self.contains_row(row)) {
                    Transition::Create => self.fire_validation_event(None, row, &status, RowAction::RowCreate),
                    Transition::Destroy => self.fire_validation_event(None, row, &status, RowAction::RowDelete),
                    Transition::Reject(outcome) => {
                        debug!(node = %self.id.labelled(), row = %row, %target, %outcome, "row status refused");
                        outcome
                    }
                }
            }
            RowMutation::Change { row, column, value } => {
                let Ok(index) = self.check_column(column) else {
                    return Outcome::NoSuchName;
                };
                let def = &self.columns[index];
                if !def.access.is_writable() {
                    return Outcome::NotWritable;
                }
                if value.syntax() != def.syntax {
                    return Outcome::WrongType;
                }
                let generic = to_generic(value);
                self.fire_validation_event(Some(&generic), row, column, RowAction::RowChange)
            }
        }
    }

    /// Check every mutation of one request. The first refusal is returned
    /// with its position in `mutations`.
    ///
    /// Beyond per-mutation checks: a cell write needs its row to exist or
    /// to be created by a `createAndGo` in the same request, and a row may
    /// receive at most one status write.
    pub fn prepare_batch(&self, mutations: &[RowMutation]) -> std::result::Result<(), (usize, Outcome)> {
        let _guard = self.events.lock();
        let created: HashSet<&ObjectId> = mutations
            .iter()
            .filter(|m| m.is_create())
            .map(|m| m.row())
            .collect();
        let mut status_rows = HashSet::new();
        for (i, mutation) in mutations.iter().enumerate() {
            match mutation {
                RowMutation::Change { row, .. } => {
                    if !self.contains_row(row) && !created.contains(row) {
                        return Err((i, Outcome::NoCreation));
                    }
                }
                RowMutation::Status { row, .. } => {
                    if !status_rows.insert(row) {
                        return Err((i, Outcome::InconsistentValue));
                    }
                }
            }
            let outcome = self.prepare(mutation);
            if !outcome.is_success() {
                return Err((i, outcome));
            }
        }
        Ok(())
    }

    /// Apply one prepared mutation, notify set listeners and persist.
    pub fn commit(&self, mutation: RowMutation) -> Result<()> {
        let _guard = self.events.lock();
        let applied = self.apply(mutation, Vec::new());
        let persisted = self.persist();
        applied?;
        persisted?;
        Ok(())
    }

    /// Apply a prepared request: row creations first (taking the request's
    /// cell values for the new rows as initial values), then the remaining
    /// cell changes in order, then destructions. Persists once.
    pub fn commit_batch(&self, mutations: Vec<RowMutation>) -> Result<()> {
        let _guard = self.events.lock();
        let created: HashSet<ObjectId> = mutations
            .iter()
            .filter(|m| m.is_create())
            .map(|m| m.row().clone())
            .collect();

        let mut creates = Vec::new();
        let mut changes = Vec::new();
        let mut destroys = Vec::new();
        let mut initial: HashMap<ObjectId, Vec<(usize, Variable)>> = HashMap::new();
        for mutation in mutations {
            match mutation {
                RowMutation::Change { row, column, value } if created.contains(&row) => {
                    initial.entry(row).or_default().push((column.index, value));
                }
                m @ RowMutation::Change { .. } => changes.push(m),
                m if m.is_create() => creates.push(m),
                m => destroys.push(m),
            }
        }

        let applied = (|| -> Result<()> {
            for m in creates {
                let cells = initial.remove(m.row()).unwrap_or_default();
                self.apply(m, cells)?;
            }
            for m in changes {
                self.apply(m, Vec::new())?;
            }
            for m in destroys {
                self.apply(m, Vec::new())?;
            }
            Ok(())
        })();
        let persisted = self.persist();
        applied?;
        persisted?;
        Ok(())
    }

    fn apply(&self, mutation: RowMutation, initial: Vec<(usize, Variable)>) -> Result<()> {
        match mutation {
            RowMutation::Status { row, target } => {
                let status = self.row_status_column().ok_or_else(|| self.invalid_commit("table has no row-status column"))?;
                match target {
                    RowStatus::CreateAndGo => {
                        {
                            let mut state = self.state.lock();
                            if state.rows.contains_key(&row) {
                                return Err(self.invalid_commit(&format!("row {} already exists", row)));
                            }
                            let mut values = state.defaults.clone();
                            for (index, value) in initial {
                                if index < values.len() {
                                    values[index] = value;
                                }
                            }
                            values[status.index] = RowStatus::Active.as_variable();
                            state.rows.insert(row.clone(), values);
                        }
                        self.fire_set_event(&row, &status, RowAction::RowCreate);
                    }
                    RowStatus::Destroy => {
                        if self.state.lock().rows.remove(&row).is_none() {
                            return Err(self.invalid_commit(&format!("row {} does not exist", row)));
                        }
                        self.fire_set_event(&row, &status, RowAction::RowDelete);
                    }
                    other => {
                        return Err(self.invalid_commit(&format!("status {} cannot be committed", other)));
                    }
                }
            }
            RowMutation::Change { row, column, value } => {
                let index = self.check_column(&column)?;
                {
                    let mut state = self.state.lock();
                    let values = state.rows.get_mut(&row).ok_or_else(|| Error::NoSuchRow {
                        table: self.id.clone(),
                        row: row.clone(),
                    })?;
                    values[index] = value;
                }
                self.fire_set_event(&row, &column, RowAction::RowChange);
            }
        }
        Ok(())
    }

    fn invalid_commit(&self, reason: &str) -> Error {
        Error::InvalidCommit {
            target: self.id.clone(),
            reason: reason.to_string(),
        }
    }

    fn fire_validation_event(&self, value: Option<&Value>, row: &ObjectId, column: &Column, action: RowAction) -> Outcome {
        for l in self.validation_listeners.snapshot() {
            let outcome = l.validate(self, value, row, column, action);
            if !outcome.is_success() {
                debug!(node = %self.id.labelled(), row = %row, %action, %outcome, "validation denied");
                return outcome;
            }
        }
        Outcome::Success
    }

    fn fire_set_event(&self, row: &ObjectId, column: &Column, action: RowAction) {
        debug!(node = %self.id.labelled(), row = %row, column = %column.name, %action, "fire set event");
        for l in self.set_listeners.snapshot() {
            l.on_set(self, row, column, action);
        }
    }

    // -------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------

    /// Snapshot this table unless it is volatile. Returns whether storage
    /// changed.
    pub fn persist(&self) -> Result<bool> {
        if self.is_volatile() {
            return Ok(false);
        }
        self.ctx.storage().put(self)
    }

    /// `true` drops any stored snapshot; `false` loads it.
    pub fn set_volatile(&self, volatile: bool) -> Result<()> {
        let _guard = self.events.lock();
        debug!(node = %self.id.labelled(), volatile, "set volatile");
        self.state.lock().volatile = volatile;
        if volatile {
            self.ctx.storage().remove(&self.id)?;
        } else {
            self.load_persisted();
        }
        Ok(())
    }

    /// Replace all rows with the stored snapshot if its schema matches.
    /// A mismatching snapshot is discarded and the current rows kept.
    /// Validation listeners are not consulted.
    pub fn load_persisted(&self) -> bool {
        let _guard = self.events.lock();
        let Some(entry) = self.ctx.storage().entry(&self.id) else {
            return false;
        };
        let traits = NodeTraits {
            id: &self.id,
            writable: self.is_writable(),
            volatile: self.is_volatile(),
        };
        let columns = self.columns();
        let syntaxes = self.syntaxes();
        let decoded = entry.into_table().and_then(|entry| {
            entry.check(traits, &columns, &syntaxes)?;
            self.decode_rows(&entry)
        });
        match decoded {
            Ok(rows) => {
                self.delete_all();
                let count = rows.len();
                for (row, values) in rows {
                    if let Err(e) = self.restore_row(row, values) {
                        error!(node = %self.id.labelled(), error = %e, "failed to restore row");
                    }
                }
                self.state.lock().persist_loaded = true;
                info!(node = %self.id.labelled(), rows = count, "restored from snapshot");
                true
            }
            Err(mismatch) => {
                warn!(node = %self.id.labelled(), reason = %mismatch, "discarding snapshot entry");
                if let Err(e) = self.ctx.storage().remove(&self.id) {
                    error!(node = %self.id.labelled(), error = %e, "failed to discard snapshot entry");
                }
                false
            }
        }
    }

    fn decode_rows(&self, entry: &TableEntry) -> std::result::Result<Vec<(ObjectId, Vec<Variable>)>, SchemaMismatch> {
        let mut seen = HashSet::new();
        let mut rows = Vec::with_capacity(entry.rows.len());
        for row in &entry.rows {
            if row.row.is_empty() || !seen.insert(row.row.clone()) {
                return Err(SchemaMismatch::Value(format!("invalid or repeated row identifier '{}'", row.row)));
            }
            let mut values = Vec::with_capacity(row.values.len());
            for (def, value) in self.columns.iter().zip(&row.values) {
                let v = to_variable(value, def.syntax).map_err(|e| SchemaMismatch::Value(e.to_string()))?;
                values.push(v);
            }
            rows.push((row.row.clone(), values));
        }
        Ok(rows)
    }

    fn restore_row(&self, row: ObjectId, values: Vec<Variable>) -> Result<()> {
        self.add_row(row.clone())?;
        for (def, value) in self.columns.iter().zip(values) {
            self.set_value_at(value, &row, &def.column)?;
        }
        Ok(())
    }

    /// Drop the stored snapshot, then ask restore-default listeners to
    /// reset the rows.
    pub fn restore_default(&self) -> Result<()> {
        let _guard = self.events.lock();
        self.ctx.storage().remove(&self.id)?;
        debug!(node = %self.id.labelled(), "fire restore default event");
        for l in self.restore_listeners.snapshot() {
            l.restore_default(NodeRef::Table(self));
        }
        Ok(())
    }
}

impl Persistable for Table {
    fn persist_id(&self) -> &ObjectId {
        &self.id
    }

    fn snapshot_entry(&self) -> Result<SnapshotEntry> {
        let rows = self
            .rows()
            .into_iter()
            .map(|r| RowEntry {
                row: r.row,
                values: r.values,
            })
            .collect();
        Ok(SnapshotEntry::Table(TableEntry {
            id: self.id.clone(),
            columns: self.columns(),
            syntaxes: self.syntaxes(),
            rows,
        }))
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("id", &self.id)
            .field("columns", &self.columns)
            .field("rows", &self.row_count())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
