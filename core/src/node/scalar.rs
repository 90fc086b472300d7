//! Scalar node: one value with a syntax, access mode and listeners.
//!
//! Event firing and mutation run inside the node's reentrant critical
//! section, so a listener may call back into the same scalar. The value
//! lock itself is only held for short reads and writes, never across a
//! listener call or a storage write.

use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::listeners::{
    ListenerKey, ListenerSet, NodeRef, RestoreDefaultListener, ScalarGetListener,
    ScalarSetListener, ScalarValidationListener,
};
use crate::agent::AgentContext;
use crate::error::Result;
use crate::namespace::ObjectId;
use crate::persist::{NodeTraits, Persistable, ScalarEntry, SchemaMismatch, SnapshotEntry};
use crate::types::{Access, Outcome};
use crate::value::{default_variable, to_generic, to_variable, ConversionError, Syntax, ValueInput, Variable};

struct ScalarState {
    value: Variable,
    volatile: bool,
    persist_loaded: bool,
    last_get: Option<u64>,
}

pub struct Scalar {
    id: ObjectId,
    syntax: Syntax,
    access: Access,
    ctx: Arc<AgentContext>,
    events: ReentrantMutex<()>,
    state: Mutex<ScalarState>,
    get_listeners: ListenerSet<dyn ScalarGetListener>,
    set_listeners: ListenerSet<dyn ScalarSetListener>,
    validation_listeners: ListenerSet<dyn ScalarValidationListener>,
    restore_listeners: ListenerSet<dyn RestoreDefaultListener>,
}

impl Scalar {
    /// A non-volatile scalar holding its syntax's zero value. The snapshot
    /// is not consulted until [`load_persisted`](Self::load_persisted) or
    /// `set_volatile(false)`.
    pub fn new(ctx: &Arc<AgentContext>, id: ObjectId, syntax: Syntax, access: Access) -> Self {
        Scalar {
            id,
            syntax,
            access,
            ctx: ctx.clone(),
            events: ReentrantMutex::new(()),
            state: Mutex::new(ScalarState {
                value: default_variable(syntax),
                volatile: false,
                persist_loaded: false,
                last_get: None,
            }),
            get_listeners: ListenerSet::new(),
            set_listeners: ListenerSet::new(),
            validation_listeners: ListenerSet::new(),
            restore_listeners: ListenerSet::new(),
        }
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    /// The instance identifier used on the wire: `id.0`.
    pub fn instance_id(&self) -> ObjectId {
        self.id.child(0)
    }

    pub fn syntax(&self) -> Syntax {
        self.syntax
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn is_writable(&self) -> bool {
        self.access.is_writable()
    }

    pub fn is_volatile(&self) -> bool {
        self.state.lock().volatile
    }

    pub fn persist_loaded(&self) -> bool {
        self.state.lock().persist_loaded
    }

    pub fn context(&self) -> &Arc<AgentContext> {
        &self.ctx
    }

    // -------------------------------------------------------------------
    // Listener registration
    // -------------------------------------------------------------------

    pub fn add_get_listener(&self, l: Arc<dyn ScalarGetListener>) -> ListenerKey {
        self.get_listeners.add(l)
    }

    pub fn remove_get_listener(&self, key: ListenerKey) -> bool {
        self.get_listeners.remove(key)
    }

    pub fn add_set_listener(&self, l: Arc<dyn ScalarSetListener>) -> ListenerKey {
        self.set_listeners.add(l)
    }

    pub fn remove_set_listener(&self, key: ListenerKey) -> bool {
        self.set_listeners.remove(key)
    }

    pub fn add_validation_listener(&self, l: Arc<dyn ScalarValidationListener>) -> ListenerKey {
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
    // Reads
    // -------------------------------------------------------------------

    /// Fire GET listeners unless one fired within the coalescing window.
    /// Returns whether they fired.
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

    /// Current value in protocol form, after giving GET listeners a chance
    /// to refresh it.
    pub fn get(&self) -> Variable {
        self.fire_get_event();
        self.peek()
    }

    /// Current value in generic form, after GET listeners.
    pub fn value(&self) -> Value {
        to_generic(&self.get())
    }

    /// Current value without firing any event.
    pub fn peek(&self) -> Variable {
        self.state.lock().value.clone()
    }

    // -------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------

    /// Application-side write: convert, validate, store, notify set
    /// listeners, persist.
    ///
    /// A validation veto is returned as the outcome and nothing changes.
    /// Conversion and persistence failures are errors.
    pub fn set_value(&self, input: impl Into<ValueInput>) -> Result<Outcome> {
        let _guard = self.events.lock();
        let variable = self.convert(input)?;
        let generic = to_generic(&variable);
        let outcome = self.fire_validation_event(&generic);
        if !outcome.is_success() {
            return Ok(outcome);
        }
        self.apply(variable, &generic)?;
        Ok(Outcome::Success)
    }

    /// Remote prepare: access, type and validation checks only.
    pub fn prepare(&self, input: impl Into<ValueInput>) -> Outcome {
        let _guard = self.events.lock();
        if !self.is_writable() {
            return Outcome::NotWritable;
        }
        let variable = match self.convert(input) {
            Ok(v) => v,
            Err(e) => {
                debug!(node = %self.id.labelled(), error = %e, "prepare rejected");
                return Outcome::WrongType;
            }
        };
        self.fire_validation_event(&to_generic(&variable))
    }

    /// Remote commit of a value whose prepare succeeded. Does not validate
    /// again.
    pub fn commit(&self, input: impl Into<ValueInput>) -> Result<()> {
        let _guard = self.events.lock();
        let variable = self.convert(input)?;
        let generic = to_generic(&variable);
        self.apply(variable, &generic)
    }

    fn apply(&self, variable: Variable, generic: &Value) -> Result<()> {
        self.state.lock().value = variable;
        debug!(node = %self.id.labelled(), value = %generic, "fire set event");
        for l in self.set_listeners.snapshot() {
            l.on_set(self, generic);
        }
        self.persist()?;
        Ok(())
    }

    fn fire_validation_event(&self, value: &Value) -> Outcome {
        for l in self.validation_listeners.snapshot() {
            let outcome = l.validate(self, value);
            if !outcome.is_success() {
                debug!(node = %self.id.labelled(), %outcome, "validation denied");
                return outcome;
            }
        }
        Outcome::Success
    }

    fn convert(&self, input: impl Into<ValueInput>) -> std::result::Result<Variable, ConversionError> {
        let variable = to_variable(input, self.syntax)?;
        if variable.syntax() != self.syntax {
            return Err(ConversionError::new(
                self.syntax,
                variable.to_string(),
                format!("value has syntax {}", variable.syntax()),
            ));
        }
        Ok(variable)
    }

    // -------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------

    /// Snapshot this scalar unless it is volatile. Returns whether storage
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

    /// Restore the stored snapshot if its schema matches. A mismatching
    /// snapshot is discarded and the current value kept. Validation
    /// listeners are not consulted.
    pub fn load_persisted(&self) -> bool {
        let _guard = self.events.lock();
        let Some(entry) = self.ctx.storage().entry(&self.id) else {
            return false;
        };
        let volatile = self.is_volatile();
        let traits = NodeTraits {
            id: &self.id,
            writable: self.is_writable(),
            volatile,
        };
        let restored = entry.into_scalar().and_then(|entry| {
            entry.check(traits, self.syntax)?;
            to_variable(&entry.value, self.syntax).map_err(|e| SchemaMismatch::Value(e.to_string()))
        });
        match restored {
            Ok(variable) => {
                let mut state = self.state.lock();
                state.value = variable;
                state.persist_loaded = true;
                info!(node = %self.id.labelled(), "restored from snapshot");
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

    /// Drop the stored snapshot, then ask restore-default listeners to
    /// reset the value.
    pub fn restore_default(&self) -> Result<()> {
        let _guard = self.events.lock();
        self.ctx.storage().remove(&self.id)?;
        debug!(node = %self.id.labelled(), "fire restore default event");
        for l in self.restore_listeners.snapshot() {
            l.restore_default(NodeRef::Scalar(self));
        }
        Ok(())
    }
}

impl Persistable for Scalar {
    fn persist_id(&self) -> &ObjectId {
        &self.id
    }

    fn snapshot_entry(&self) -> Result<SnapshotEntry> {
        Ok(SnapshotEntry::Scalar(ScalarEntry {
            id: self.id.clone(),
            syntax: self.syntax,
            value: to_generic(&self.peek()),
        }))
    }
}

impl std::fmt::Debug for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scalar")
            .field("id", &self.id)
            .field("syntax", &self.syntax)
            .field("access", &self.access)
            .field("value", &self.peek())
            .finish()
    }
}
