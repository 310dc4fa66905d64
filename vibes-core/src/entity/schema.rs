//! Static table metadata
//!
//! Tables and columns are `'static` descriptions of what the store holds.
//! Statements are built only from these, so caller text never becomes an
//! identifier.

use crate::value::FieldKind;

/// One column of a table
#[derive(Debug, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl Column {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// A table whose rows are exclusively owned by rows of another table.
///
/// Deleting an owner row deletes every dependent row whose `foreign_key`
/// equals the owner's `references` column.
#[derive(Debug)]
pub struct Dependent {
    pub table: &'static Table,
    pub foreign_key: &'static str,
    pub references: &'static str,
}

/// A table in the store
#[derive(Debug)]
pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
    /// Primary key columns (association tables have two)
    pub primary_key: &'static [&'static str],
    /// Single-column unique constraints besides the primary key
    pub unique: &'static [&'static str],
    /// Ownership edges walked by cascading deletes
    pub dependents: &'static [Dependent],
}

/// Tables are identified by name.
impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Table {}

impl Table {
    /// Look up a column by name.
    pub fn column(&'static self, name: &str) -> Option<&'static Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a column that metadata guarantees to exist.
    ///
    /// Panics on a missing column: table metadata is static and checked by the
    /// catalog tests, so a miss is a programming error.
    pub fn expect_column(&'static self, name: &str) -> &'static Column {
        self.column(name)
            .unwrap_or_else(|| panic!("table '{}' has no column '{}'", self.name, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static WIDGET: Table = Table {
        name: "widget",
        columns: &[
            Column::new("id", FieldKind::Text),
            Column::new("size", FieldKind::Integer),
        ],
        primary_key: &["id"],
        unique: &[],
        dependents: &[],
    };

    #[test]
    fn column_lookup() {
        assert_eq!(WIDGET.column("size").map(|c| c.kind), Some(FieldKind::Integer));
        assert!(WIDGET.column("colour").is_none());
    }

    #[test]
    #[should_panic(expected = "has no column 'colour'")]
    fn expect_column_panics_on_miss() {
        WIDGET.expect_column("colour");
    }
}
