//! Snapshot entries and the schema checks applied before restoring them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::namespace::ObjectId;
use crate::node::Column;
use crate::value::Syntax;

/// Latest persisted state of one node. Replaced wholesale by key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotEntry {
    Scalar(ScalarEntry),
    Table(TableEntry),
}

impl SnapshotEntry {
    pub fn id(&self) -> &ObjectId {
        match self {
            SnapshotEntry::Scalar(e) => &e.id,
            SnapshotEntry::Table(e) => &e.id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SnapshotEntry::Scalar(_) => "scalar",
            SnapshotEntry::Table(_) => "table",
        }
    }

    /// The scalar entry, or a [`SchemaMismatch::Kind`] if this is a table.
    pub fn into_scalar(self) -> Result<ScalarEntry, SchemaMismatch> {
        match self {
            SnapshotEntry::Scalar(e) => Ok(e),
            other => Err(SchemaMismatch::Kind {
                expected: "scalar",
                found: other.kind(),
            }),
        }
    }

    /// The table entry, or a [`SchemaMismatch::Kind`] if this is a scalar.
    pub fn into_table(self) -> Result<TableEntry, SchemaMismatch> {
        match self {
            SnapshotEntry::Table(e) => Ok(e),
            other => Err(SchemaMismatch::Kind {
                expected: "table",
                found: other.kind(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarEntry {
    pub id: ObjectId,
    pub syntax: Syntax,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEntry {
    pub id: ObjectId,
    pub columns: Vec<Column>,
    /// One syntax per column, same order.
    pub syntaxes: Vec<Syntax>,
    pub rows: Vec<RowEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowEntry {
    pub row: ObjectId,
    /// One generic value per column, same order.
    pub values: Vec<Value>,
}

// ---------------------------------------------------------------------------
// Schema verification
// ---------------------------------------------------------------------------

/// Why an entry cannot be restored into a node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaMismatch {
    #[error("identifier {found} does not match node {expected}")]
    Identifier { expected: ObjectId, found: ObjectId },

    #[error("node is not writable")]
    NotWritable,

    #[error("node is volatile")]
    Volatile,

    #[error("entry is a {found}, node is a {expected}")]
    Kind {
        expected: &'static str,
        found: &'static str,
    },

    #[error("syntax {found} does not match {expected}")]
    Syntax { expected: Syntax, found: Syntax },

    #[error("{found} columns recorded, table has {expected}")]
    ColumnCount { expected: usize, found: usize },

    #[error("column {index} recorded as {found}, table has {expected}")]
    Column {
        index: usize,
        expected: Column,
        found: Column,
    },

    #[error("column {column} recorded with syntax {found}, table has {expected}")]
    ColumnSyntax {
        column: Column,
        expected: Syntax,
        found: Syntax,
    },

    #[error("row {row} has {found} values for {expected} columns")]
    RowWidth {
        row: ObjectId,
        expected: usize,
        found: usize,
    },

    #[error("recorded value unusable: {0}")]
    Value(String),
}

/// Properties of the live node an entry is checked against.
#[derive(Debug, Clone, Copy)]
pub struct NodeTraits<'a> {
    pub id: &'a ObjectId,
    pub writable: bool,
    pub volatile: bool,
}

impl NodeTraits<'_> {
    fn check(&self, found: &ObjectId) -> Result<(), SchemaMismatch> {
        if found != self.id {
            return Err(SchemaMismatch::Identifier {
                expected: self.id.clone(),
                found: found.clone(),
            });
        }
        if !self.writable {
            return Err(SchemaMismatch::NotWritable);
        }
        if self.volatile {
            return Err(SchemaMismatch::Volatile);
        }
        Ok(())
    }
}

impl ScalarEntry {
    /// Identifier, writability, volatility, then syntax.
    pub fn check(&self, node: NodeTraits<'_>, syntax: Syntax) -> Result<(), SchemaMismatch> {
        node.check(&self.id)?;
        if self.syntax != syntax {
            return Err(SchemaMismatch::Syntax {
                expected: syntax,
                found: self.syntax,
            });
        }
        Ok(())
    }
}

impl TableEntry {
    /// Identifier, writability, volatility, column count, then each
    /// column's identity and syntax, then every row's width.
    pub fn check(
        &self,
        node: NodeTraits<'_>,
        columns: &[Column],
        syntaxes: &[Syntax],
    ) -> Result<(), SchemaMismatch> {
        node.check(&self.id)?;
        if self.columns.len() != columns.len() || self.syntaxes.len() != columns.len() {
            return Err(SchemaMismatch::ColumnCount {
                expected: columns.len(),
                found: self.columns.len(),
            });
        }
        for (index, (expected, found)) in columns.iter().zip(&self.columns).enumerate() {
            if expected != found {
                return Err(SchemaMismatch::Column {
                    index,
                    expected: expected.clone(),
                    found: found.clone(),
                });
            }
            if syntaxes[index] != self.syntaxes[index] {
                return Err(SchemaMismatch::ColumnSyntax {
                    column: expected.clone(),
                    expected: syntaxes[index],
                    found: self.syntaxes[index],
                });
            }
        }
        for row in &self.rows {
            if row.values.len() != columns.len() {
                return Err(SchemaMismatch::RowWidth {
                    row: row.row.clone(),
                    expected: columns.len(),
                    found: row.values.len(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id() -> ObjectId {
        ObjectId::from_arcs(&[1, 3, 6, 1, 4, 1, 9])
    }

    fn traits(id: &ObjectId) -> NodeTraits<'_> {
        NodeTraits {
            id,
            writable: true,
            volatile: false,
        }
    }

    fn table_entry() -> TableEntry {
        TableEntry {
            id: id(),
            columns: vec![Column::new("name", 0, 2), Column::new("status", 1, 3)],
            syntaxes: vec![Syntax::OctetString, Syntax::Integer32],
            rows: vec![RowEntry {
                row: ObjectId::from_arcs(&[5]),
                values: vec![json!("x"), json!(1)],
            }],
        }
    }

    #[test]
    fn tagged_json_shape() {
        let entry = SnapshotEntry::Scalar(ScalarEntry {
            id: id(),
            syntax: Syntax::Integer32,
            value: json!(7),
        });
        let v = serde_json::to_value(&entry).unwrap();
        assert_eq!(v["kind"], "scalar");
        assert_eq!(v["syntax"], "integer32");
        assert_eq!(v["id"]["oid"], "1.3.6.1.4.1.9");
        let back: SnapshotEntry = serde_json::from_value(v).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn scalar_check_order() {
        let entry = ScalarEntry {
            id: id(),
            syntax: Syntax::Integer32,
            value: json!(1),
        };
        let me = id();
        assert!(entry.check(traits(&me), Syntax::Integer32).is_ok());

        let other = ObjectId::from_arcs(&[1, 2]);
        assert!(matches!(
            entry.check(traits(&other), Syntax::Integer32),
            Err(SchemaMismatch::Identifier { .. })
        ));

        let ro = NodeTraits { writable: false, ..traits(&me) };
        assert_eq!(entry.check(ro, Syntax::Integer32), Err(SchemaMismatch::NotWritable));

        let vol = NodeTraits { volatile: true, ..traits(&me) };
        assert_eq!(entry.check(vol, Syntax::Integer32), Err(SchemaMismatch::Volatile));

        assert!(matches!(
            entry.check(traits(&me), Syntax::Gauge32),
            Err(SchemaMismatch::Syntax { .. })
        ));
    }

    #[test]
    fn table_check_accepts_matching_schema() {
        let e = table_entry();
        let me = id();
        assert!(e.check(traits(&me), &e.columns.clone(), &e.syntaxes.clone()).is_ok());
    }

    #[test]
    fn table_check_rejects_extra_column() {
        let e = table_entry();
        let me = id();
        let mut columns = e.columns.clone();
        columns.push(Column::new("extra", 2, 4));
        let mut syntaxes = e.syntaxes.clone();
        syntaxes.push(Syntax::Integer32);
        assert_eq!(
            e.check(traits(&me), &columns, &syntaxes),
            Err(SchemaMismatch::ColumnCount { expected: 3, found: 2 })
        );
    }

    #[test]
    fn table_check_rejects_renamed_column() {
        let e = table_entry();
        let me = id();
        let columns = vec![Column::new("label", 0, 2), Column::new("status", 1, 3)];
        let err = e.check(traits(&me), &columns, &e.syntaxes.clone()).unwrap_err();
        assert!(matches!(err, SchemaMismatch::Column { index: 0, .. }));
        assert!(err.to_string().contains("label"));
    }

    #[test]
    fn table_check_rejects_changed_syntax() {
        let e = table_entry();
        let me = id();
        let syntaxes = vec![Syntax::OctetString, Syntax::Gauge32];
        assert!(matches!(
            e.check(traits(&me), &e.columns.clone(), &syntaxes),
            Err(SchemaMismatch::ColumnSyntax { .. })
        ));
    }

    #[test]
    fn table_check_rejects_short_row() {
        let mut e = table_entry();
        e.rows[0].values.pop();
        let me = id();
        assert!(matches!(
            e.check(traits(&me), &e.columns.clone(), &e.syntaxes.clone()),
            Err(SchemaMismatch::RowWidth { .. })
        ));
    }
}
