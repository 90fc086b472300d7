//! The agent: owns the shared context, the object registry and the MIB
//! modules, and drives them through their lifecycle.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use super::context::AgentContext;
use super::faults::FaultRegistry;
use super::mib::Mib;
use super::state::{AgentState, Transition};
use crate::error::{Error, Result};
use crate::namespace::ObjectId;
use crate::node::{RowSnapshot, Scalar};
use crate::persist::{JsonFileBackend, PersistStorage};
use crate::server::{MoServer, SetResponse, VarBind, DEFAULT_CONTEXT};
use crate::types::{Access, AgentConfig, Outcome};
use crate::value::{Syntax, Variable};

/// `snmpEngineBoots`: how many times the agent has started.
pub const ENGINE_BOOTS_ARCS: [u32; 10] = [1, 3, 6, 1, 6, 3, 10, 2, 1, 2];

const BOOTS_MAX: i64 = i32::MAX as i64;

/// A recorded lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub from: AgentState,
    pub to: AgentState,
    pub transition: Transition,
    pub timestamp_ms: u64,
}

pub struct Agent {
    config: AgentConfig,
    ctx: Arc<AgentContext>,
    server: MoServer,
    mibs: Vec<Box<dyn Mib>>,
    state: AgentState,
    boots: Arc<Scalar>,
    boots_counted: bool,
    history: Vec<LifecycleEvent>,
}

impl Agent {
    /// Build an agent persisting to `config.persist.filename`.
    pub fn new(config: AgentConfig) -> Result<Self> {
        config.validate().map_err(Error::Config)?;
        let backend = JsonFileBackend::new(config.persist.filename.clone())?;
        let storage = PersistStorage::open(backend, config.persist.policy)?;
        let ctx = AgentContext::new(Arc::new(storage))
            .with_faults(Arc::new(FaultRegistry::new(config.faults.console)))
            .with_ignore_update_ms(config.ignore_update_ms);
        Agent::with_context(config, Arc::new(ctx))
    }

    /// Build an agent on an existing context. Storage, clock and coalescing
    /// window come from `ctx`; only the boots policy is read from `config`.
    pub fn with_context(config: AgentConfig, ctx: Arc<AgentContext>) -> Result<Self> {
        let boots = Arc::new(Scalar::new(
            &ctx,
            ObjectId::new(ENGINE_BOOTS_ARCS.to_vec(), "snmpEngineBoots"),
            Syntax::Integer32,
            Access::ReadWrite,
        ));
        let allow_reset = config.allow_boots_count_reset;
        boots.add_validation_listener(Arc::new(move |_: &Scalar, value: &Value| {
            if !allow_reset {
                Outcome::NotWritable
            } else if value.as_i64() == Some(0) {
                Outcome::Success
            } else {
                Outcome::WrongValue
            }
        }));

        let mut server = MoServer::new();
        server.register(DEFAULT_CONTEXT, boots.clone())?;

        Ok(Agent {
            config,
            ctx,
            server,
            mibs: Vec::new(),
            state: AgentState::Created,
            boots,
            boots_counted: false,
            history: Vec::new(),
        })
    }

    /// Add a module. Only allowed before `init`.
    pub fn add_mib(&mut self, mib: Box<dyn Mib>) -> Result<()> {
        if self.state != AgentState::Created {
            return Err(Error::AgentState {
                expected: AgentState::Created.label().to_string(),
                actual: self.state.label().to_string(),
            });
        }
        self.mibs.push(mib);
        Ok(())
    }

    // -------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------

    /// Initialize and register every module, then load the last snapshot
    /// of each non-volatile registered node.
    pub fn init(&mut self) -> Result<()> {
        let next = self.state.apply(Transition::Init)?;
        for mib in self.mibs.iter_mut() {
            mib.init(&self.ctx)?;
            mib.register_mos(&mut self.server, DEFAULT_CONTEXT)?;
            info!(mib = mib.name(), "mib registered");
        }

        let mut restored = 0;
        for (_, object) in self.server.objects() {
            if object.is_volatile() || object.persist_loaded() {
                continue;
            }
            if object.load_persisted() {
                restored += 1;
            }
        }
        info!(objects = self.server.len(), restored, "agent initialized");
        self.record(Transition::Init, next);
        Ok(())
    }

    /// Start serving requests. The first start bumps the boots counter.
    pub fn start(&mut self) -> Result<()> {
        let next = self.state.apply(Transition::Start)?;
        if !self.boots_counted {
            let current = self.boots.peek().as_i64().unwrap_or(0);
            let bumped = (current + 1).min(BOOTS_MAX) as i32;
            self.boots.commit(Variable::Integer32(bumped))?;
            self.boots_counted = true;
            info!(boots = bumped, "engine boots");
        }
        self.record(Transition::Start, next);
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        let next = self.state.apply(Transition::Stop)?;
        self.record(Transition::Stop, next);
        Ok(())
    }

    /// Unregister modules and flush storage. Repeated calls do nothing.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.state.is_terminal() {
            return Ok(());
        }
        let next = self.state.apply(Transition::Shutdown)?;
        for mib in &self.mibs {
            mib.unregister_mos(&mut self.server, DEFAULT_CONTEXT);
        }
        // A failed flush leaves the state alone so a later call (or drop)
        // can retry it.
        self.ctx.storage().shutdown()?;
        self.record(Transition::Shutdown, next);
        Ok(())
    }

    fn record(&mut self, transition: Transition, next: AgentState) {
        let event = LifecycleEvent {
            from: self.state,
            to: next,
            transition,
            timestamp_ms: self.ctx.now_ms(),
        };
        info!(from = %event.from, to = %event.to, %transition, "agent state");
        self.history.push(event);
        self.state = next;
    }

    // -------------------------------------------------------------------
    // Requests
    // -------------------------------------------------------------------

    pub fn get(&self, oid: &ObjectId) -> std::result::Result<Variable, Outcome> {
        if !self.state.is_serving() {
            return Err(Outcome::ResourceUnavailable);
        }
        self.server.get(DEFAULT_CONTEXT, oid)
    }

    pub fn get_table(&self, oid: &ObjectId) -> std::result::Result<Vec<RowSnapshot>, Outcome> {
        if !self.state.is_serving() {
            return Err(Outcome::ResourceUnavailable);
        }
        self.server.get_table(DEFAULT_CONTEXT, oid)
    }

    pub fn set(&self, bindings: &[VarBind]) -> SetResponse {
        if !self.state.is_serving() {
            return SetResponse::failed(Outcome::ResourceUnavailable, None);
        }
        self.server.set(DEFAULT_CONTEXT, bindings)
    }

    // -------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn context(&self) -> &Arc<AgentContext> {
        &self.ctx
    }

    pub fn server(&self) -> &MoServer {
        &self.server
    }

    pub fn server_mut(&mut self) -> &mut MoServer {
        &mut self.server
    }

    pub fn boots(&self) -> i32 {
        match self.boots.peek() {
            Variable::Integer32(n) => n,
            _ => 0,
        }
    }

    pub fn history(&self) -> &[LifecycleEvent] {
        &self.history
    }
}

impl Drop for Agent {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!(error = %e, "shutdown on drop failed");
        }
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("state", &self.state)
            .field("mibs", &self.mibs.iter().map(|m| m.name().to_string()).collect::<Vec<_>>())
            .field("server", &self.server)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
