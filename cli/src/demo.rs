//! A sample agent with one scalar and a `(name, status)` job table.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use mibkeeper_core::agent::{Agent, AgentContext, Mib};
use mibkeeper_core::error::Result;
use mibkeeper_core::node::{Column, RowStatus, Scalar, Table};
use mibkeeper_core::persist::SavePolicy;
use mibkeeper_core::server::{MoServer, VarBind};
use mibkeeper_core::types::AgentConfig;
use mibkeeper_core::{Access, ObjectId, Syntax, Variable};
use tracing::info;

const DESCR_ARCS: [u32; 9] = [1, 3, 6, 1, 4, 1, 99, 1, 1];
const JOBS_ARCS: [u32; 9] = [1, 3, 6, 1, 4, 1, 99, 2, 1];
const NAME_TAG: u32 = 2;
const STATUS_TAG: u32 = 3;

#[derive(Default)]
struct DemoMib {
    descr: Option<Arc<Scalar>>,
    jobs: Option<Arc<Table>>,
}

impl Mib for DemoMib {
    fn name(&self) -> &str {
        "DEMO-MIB"
    }

    fn init(&mut self, ctx: &Arc<AgentContext>) -> Result<()> {
        let descr = Scalar::new(
            ctx,
            ObjectId::new(DESCR_ARCS.to_vec(), "demoDescr"),
            Syntax::OctetString,
            Access::ReadOnly,
        );
        // Fixed text, kept out of the snapshot.
        descr.set_volatile(true)?;
        descr.set_value("mibkeeper demo agent")?;
        let jobs = Table::builder(ObjectId::new(JOBS_ARCS.to_vec(), "demoJobTable"))
            .column(Column::new("name", 0, NAME_TAG), Syntax::OctetString, Access::ReadCreate)
            .row_status_column(Column::new("status", 1, STATUS_TAG))
            .build(ctx)?;
        self.descr = Some(Arc::new(descr));
        self.jobs = Some(Arc::new(jobs));
        Ok(())
    }

    fn register_mos(&self, server: &mut MoServer, context: &str) -> Result<()> {
        if let Some(descr) = &self.descr {
            server.register(context, descr.clone())?;
        }
        if let Some(jobs) = &self.jobs {
            server.register(context, jobs.clone())?;
        }
        Ok(())
    }

    fn unregister_mos(&self, server: &mut MoServer, context: &str) {
        if let Some(descr) = &self.descr {
            server.unregister(context, descr.id());
        }
        if let Some(jobs) = &self.jobs {
            server.unregister(context, jobs.id());
        }
    }
}

fn cell(tag: u32, row: u32) -> ObjectId {
    ObjectId::from_arcs(&JOBS_ARCS).child(tag).child(row)
}

/// Create row 5 named "x", read it back, destroy it. Returns a transcript.
pub fn run(persist: Option<PathBuf>) -> Result<String> {
    let mut agent = match persist {
        Some(path) => {
            let mut config = AgentConfig::default();
            config.persist.filename = path;
            Agent::new(config)?
        }
        None => Agent::with_context(
            AgentConfig::default(),
            Arc::new(AgentContext::in_memory(SavePolicy::OnChange)),
        )?,
    };
    agent.add_mib(Box::<DemoMib>::default())?;
    agent.init()?;
    agent.start()?;
    info!(boots = agent.boots(), "demo agent running");

    let mut out = String::new();
    let _ = writeln!(out, "boots: {}", agent.boots());
    let descr = agent.get(&ObjectId::from_arcs(&DESCR_ARCS).child(0));
    let _ = writeln!(out, "descr: {}", describe(descr));

    let jobs = ObjectId::from_arcs(&JOBS_ARCS);
    let created = agent.set(&[
        VarBind::new(cell(STATUS_TAG, 5), RowStatus::CreateAndGo.as_variable()),
        VarBind::new(cell(NAME_TAG, 5), Variable::text("x")),
    ]);
    let _ = writeln!(out, "create row 5: {}", created.outcome);
    for row in agent.get_table(&jobs).unwrap_or_default() {
        let values: Vec<String> = row.values.iter().map(|v| v.to_string()).collect();
        let _ = writeln!(out, "  row {}: {}", row.row, values.join(", "));
    }

    let destroyed = agent.set(&[VarBind::new(cell(STATUS_TAG, 5), RowStatus::Destroy.as_variable())]);
    let rows = agent.get_table(&jobs).map(|r| r.len()).unwrap_or(0);
    let _ = writeln!(out, "destroy row 5: {} ({} rows left)", destroyed.outcome, rows);

    agent.shutdown()?;
    Ok(out.trim_end().to_string())
}

fn describe(result: std::result::Result<Variable, mibkeeper_core::Outcome>) -> String {
    match result {
        Ok(v) => v.to_string(),
        Err(outcome) => outcome.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_transcript() {
        let out = run(None).unwrap();
        assert!(out.contains("boots: 1"));
        assert!(out.contains("descr: mibkeeper demo agent"));
        assert!(out.contains("create row 5: success(0)"));
        assert!(out.contains("row 5: \"x\", 1"));
        assert!(out.contains("(0 rows left)"));
    }

    #[test]
    fn persisted_boots_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.json");
        run(Some(path.clone())).unwrap();
        let out = run(Some(path)).unwrap();
        assert!(out.contains("boots: 2"));
    }
}
