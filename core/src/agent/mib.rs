//! MIB modules: groups of scalars and tables registered together.

use std::sync::Arc;

use super::context::AgentContext;
use crate::error::Result;
use crate::server::MoServer;

/// A set of managed objects contributed to an agent.
///
/// `init` runs once, before registration, and is where the module builds
/// its nodes against the shared context. `register_mos` and
/// `unregister_mos` may run once per context name.
pub trait Mib: Send {
    fn name(&self) -> &str;

    fn init(&mut self, ctx: &Arc<AgentContext>) -> Result<()>;

    fn register_mos(&self, server: &mut MoServer, context: &str) -> Result<()>;

    fn unregister_mos(&self, server: &mut MoServer, context: &str);
}
