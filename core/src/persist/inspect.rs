//! Summaries of what a snapshot store holds, for operators.

use std::fmt::Write;

use serde::Serialize;

use super::entry::{ScalarEntry, TableEntry};
use super::storage::PersistStorage;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalarSummary {
    pub name: String,
    pub oid: String,
    pub syntax: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub name: String,
    pub oid: String,
    pub columns: usize,
    pub rows: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Inventory {
    pub location: String,
    pub scalars: Vec<ScalarSummary>,
    pub tables: Vec<TableSummary>,
}

impl Inventory {
    pub fn is_empty(&self) -> bool {
        self.scalars.is_empty() && self.tables.is_empty()
    }
}

pub fn summarize_scalar(entry: &ScalarEntry) -> ScalarSummary {
    let value = match &entry.value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    ScalarSummary {
        name: entry.id.name().to_string(),
        oid: entry.id.to_string(),
        syntax: entry.syntax.to_string(),
        value,
    }
}

pub fn summarize_table(entry: &TableEntry) -> TableSummary {
    TableSummary {
        name: entry.id.name().to_string(),
        oid: entry.id.to_string(),
        columns: entry.columns.len(),
        rows: entry.rows.len(),
    }
}

/// Everything in `storage`, in identifier order.
pub fn inventory(storage: &PersistStorage) -> Inventory {
    Inventory {
        location: storage.describe(),
        scalars: storage.scalars().iter().map(summarize_scalar).collect(),
        tables: storage.tables().iter().map(summarize_table).collect(),
    }
}

/// Plain-text rendering with aligned columns.
pub fn render(inv: &Inventory) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Snapshot store: {}", inv.location);
    if inv.is_empty() {
        out.push_str("(empty)\n");
        return out;
    }

    if !inv.scalars.is_empty() {
        let name_w = width(inv.scalars.iter().map(|s| s.name.len()), "NAME");
        let oid_w = width(inv.scalars.iter().map(|s| s.oid.len()), "OID");
        let syn_w = width(inv.scalars.iter().map(|s| s.syntax.len()), "SYNTAX");
        let _ = writeln!(out, "\nScalars ({})", inv.scalars.len());
        let _ = writeln!(out, "{:name_w$}  {:oid_w$}  {:syn_w$}  VALUE", "NAME", "OID", "SYNTAX");
        for s in &inv.scalars {
            let _ = writeln!(out, "{:name_w$}  {:oid_w$}  {:syn_w$}  {}", s.name, s.oid, s.syntax, s.value);
        }
    }

    if !inv.tables.is_empty() {
        let name_w = width(inv.tables.iter().map(|t| t.name.len()), "NAME");
        let oid_w = width(inv.tables.iter().map(|t| t.oid.len()), "OID");
        let _ = writeln!(out, "\nTables ({})", inv.tables.len());
        let _ = writeln!(out, "{:name_w$}  {:oid_w$}  COLUMNS  ROWS", "NAME", "OID");
        for t in &inv.tables {
            let _ = writeln!(out, "{:name_w$}  {:oid_w$}  {:7}  {}", t.name, t.oid, t.columns, t.rows);
        }
    }
    out
}

fn width(lens: impl Iterator<Item = usize>, header: &str) -> usize {
    lens.max().unwrap_or(0).max(header.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::ObjectId;
    use crate::node::Column;
    use crate::persist::entry::{RowEntry, SnapshotEntry};
    use crate::persist::SavePolicy;
    use crate::value::Syntax;
    use serde_json::json;

    fn storage() -> PersistStorage {
        let s = PersistStorage::in_memory(SavePolicy::OnChange);
        s.put_entry(SnapshotEntry::Scalar(ScalarEntry {
            id: ObjectId::new(vec![1, 3, 6, 1, 6, 3, 10, 2, 1, 2], "snmpEngineBoots"),
            syntax: Syntax::Integer32,
            value: json!(4),
        }))
        .unwrap();
        s.put_entry(SnapshotEntry::Table(TableEntry {
            id: ObjectId::new(vec![1, 3, 6, 1, 4, 1, 99, 1], "jobTable"),
            columns: vec![Column::new("name", 0, 2), Column::new("status", 1, 3)],
            syntaxes: vec![Syntax::OctetString, Syntax::Integer32],
            rows: vec![RowEntry {
                row: ObjectId::from_arcs(&[5]),
                values: vec![json!("x"), json!(1)],
            }],
        }))
        .unwrap();
        s
    }

    #[test]
    fn inventory_lists_both_kinds() {
        let inv = inventory(&storage());
        assert_eq!(inv.scalars.len(), 1);
        assert_eq!(inv.scalars[0].name, "snmpEngineBoots");
        assert_eq!(inv.scalars[0].value, "4");
        assert_eq!(inv.tables[0].rows, 1);
        assert_eq!(inv.tables[0].columns, 2);
        assert_eq!(inv.location, "memory");
    }

    #[test]
    fn render_contains_rows() {
        let text = render(&inventory(&storage()));
        assert!(text.contains("Scalars (1)"));
        assert!(text.contains("jobTable"));
        assert!(text.contains("1.3.6.1.4.1.99.1"));
    }

    #[test]
    fn render_empty() {
        let s = PersistStorage::in_memory(SavePolicy::OnChange);
        assert!(render(&inventory(&s)).contains("(empty)"));
    }
}
