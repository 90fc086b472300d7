pub mod clock;
pub mod context;
pub mod faults;
pub mod lifecycle;
pub mod mib;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::AgentContext;
pub use faults::{FaultListener, FaultRegistry};
pub use lifecycle::{Agent, LifecycleEvent, ENGINE_BOOTS_ARCS};
pub use mib::Mib;
pub use state::{AgentState, Transition};
