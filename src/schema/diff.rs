//! Reconciles a live [`Snapshot`] with the [`Registry`].
//!
//! The result is an ordered list of operations plus anything that looks
//! ambiguous (renames, key changes). Ambiguous items are never resolved
//! here; callers decide whether to apply a change set that carries them.

use super::registry::order_tables;
use super::{ddl, Column, ColumnType, Constraint, Registry, Snapshot, Table};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Table holding applied migration records. Never diffed.
pub const HISTORY_TABLE: &str = "schema_migrations";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    CreateTable(Table),
    DropTable(Table),
    AddColumn { table: String, column: Column },
    DropColumn { table: String, column: Column },
    AlterColumn { table: String, from: Column, to: Column },
    AddConstraint { table: String, constraint: Constraint },
    DropConstraint { table: String, constraint: Constraint },
}

impl Operation {
    /// The operation that undoes this one.
    pub fn inverse(&self) -> Operation {
        match self {
            Operation::CreateTable(t) => Operation::DropTable(t.clone()),
            Operation::DropTable(t) => Operation::CreateTable(t.clone()),
            Operation::AddColumn { table, column } => Operation::DropColumn {
                table: table.clone(),
                column: column.clone(),
            },
            Operation::DropColumn { table, column } => Operation::AddColumn {
                table: table.clone(),
                column: column.clone(),
            },
            Operation::AlterColumn { table, from, to } => Operation::AlterColumn {
                table: table.clone(),
                from: to.clone(),
                to: from.clone(),
            },
            Operation::AddConstraint { table, constraint } => Operation::DropConstraint {
                table: table.clone(),
                constraint: constraint.clone(),
            },
            Operation::DropConstraint { table, constraint } => Operation::AddConstraint {
                table: table.clone(),
                constraint: constraint.clone(),
            },
        }
    }

    pub fn table(&self) -> &str {
        match self {
            Operation::CreateTable(t) | Operation::DropTable(t) => &t.name,
            Operation::AddColumn { table, .. }
            | Operation::DropColumn { table, .. }
            | Operation::AlterColumn { table, .. }
            | Operation::AddConstraint { table, .. }
            | Operation::DropConstraint { table, .. } => table,
        }
    }

    pub fn to_sql(&self) -> String {
        ddl::render(self)
    }
}

/// A change that cannot be applied without a human deciding what it means.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManualReview {
    PossibleColumnRename {
        table: String,
        from: String,
        to: String,
    },
    PossibleTableRename {
        from: String,
        to: String,
    },
    PrimaryKeyChanged {
        table: String,
        from: Vec<String>,
        to: Vec<String>,
    },
    SerialChanged {
        table: String,
        column: String,
    },
    DependencyCycle(Vec<String>),
}

impl std::fmt::Display for ManualReview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManualReview::PossibleColumnRename { table, from, to } => write!(
                f,
                "{}: column '{}' dropped and '{}' added with the same type, possibly a rename",
                table, from, to
            ),
            ManualReview::PossibleTableRename { from, to } => write!(
                f,
                "table '{}' dropped and '{}' created with the same columns, possibly a rename",
                from, to
            ),
            ManualReview::PrimaryKeyChanged { table, from, to } => write!(
                f,
                "{}: primary key changes from ({}) to ({})",
                table,
                from.join(", "),
                to.join(", ")
            ),
            ManualReview::SerialChanged { table, column } => {
                write!(f, "{}: serial column '{}' changes type", table, column)
            }
            ManualReview::DependencyCycle(tables) => {
                write!(f, "cannot order drops of cyclic tables: {}", tables.join(", "))
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub operations: Vec<Operation>,
    pub review: Vec<ManualReview>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty() && self.review.is_empty()
    }

    pub fn needs_review(&self) -> bool {
        !self.review.is_empty()
    }

    /// Operations undoing this change set, in application order.
    pub fn downgrade(&self) -> Vec<Operation> {
        self.operations.iter().rev().map(Operation::inverse).collect()
    }

    pub fn upgrade_sql(&self) -> Vec<String> {
        self.operations.iter().map(Operation::to_sql).collect()
    }

    pub fn downgrade_sql(&self) -> Vec<String> {
        self.downgrade().iter().map(Operation::to_sql).collect()
    }

    pub fn created_tables(&self) -> impl Iterator<Item = &Table> {
        self.operations.iter().filter_map(|op| match op {
            Operation::CreateTable(t) => Some(t),
            _ => None,
        })
    }
}

#[derive(Default)]
struct Buckets {
    drop_constraints: Vec<Operation>,
    create_tables: Vec<Operation>,
    add_columns: Vec<Operation>,
    alter_columns: Vec<Operation>,
    add_constraints: Vec<Operation>,
    drop_columns: Vec<Operation>,
    drop_tables: Vec<Operation>,
}

impl Buckets {
    fn into_operations(self) -> Vec<Operation> {
        let mut ops = self.drop_constraints;
        ops.extend(self.create_tables);
        ops.extend(self.add_columns);
        ops.extend(self.alter_columns);
        ops.extend(self.add_constraints);
        ops.extend(self.drop_columns);
        ops.extend(self.drop_tables);
        ops
    }
}

/// Compute the operations that bring `live` in line with `target`.
pub fn diff(live: &Snapshot, target: &Registry) -> ChangeSet {
    let mut buckets = Buckets::default();
    let mut review = Vec::new();

    let live_tables: Vec<&Table> = live
        .tables()
        .filter(|t| t.name != HISTORY_TABLE)
        .collect();

    let created: Vec<&Table> = target
        .tables()
        .filter(|t| !live.contains(&t.name))
        .collect();
    let dropped: Vec<&Table> = live_tables
        .iter()
        .copied()
        .filter(|t| !target.contains(&t.name))
        .collect();

    let created_scope: BTreeSet<&str> = created.iter().map(|t| t.name.as_str()).collect();
    match order_tables(created.iter().copied(), &created_scope) {
        Ok(ordered) => buckets.create_tables.extend(
            ordered
                .into_iter()
                .map(|t| Operation::CreateTable(t.clone())),
        ),
        Err(_) => {
            review.push(ManualReview::DependencyCycle(
                created_scope.iter().map(|s| s.to_string()).collect(),
            ));
            buckets
                .create_tables
                .extend(created.iter().map(|t| Operation::CreateTable((*t).clone())));
        }
    }

    let dropped_scope: BTreeSet<&str> = dropped.iter().map(|t| t.name.as_str()).collect();
    match order_tables(dropped.iter().copied(), &dropped_scope) {
        Ok(ordered) => buckets.drop_tables.extend(
            ordered
                .into_iter()
                .rev()
                .map(|t| Operation::DropTable(t.clone())),
        ),
        Err(_) => review.push(ManualReview::DependencyCycle(
            dropped_scope.iter().map(|s| s.to_string()).collect(),
        )),
    }

    for old in &dropped {
        let old_columns: BTreeSet<&str> = old.columns.iter().map(|c| c.name.as_str()).collect();
        for new in &created {
            let new_columns: BTreeSet<&str> =
                new.columns.iter().map(|c| c.name.as_str()).collect();
            if old_columns == new_columns {
                review.push(ManualReview::PossibleTableRename {
                    from: old.name.clone(),
                    to: new.name.clone(),
                });
            }
        }
    }

    for current in live_tables {
        if let Some(wanted) = target.get(&current.name) {
            diff_table(current, wanted, &mut buckets, &mut review);
        }
    }

    ChangeSet {
        operations: buckets.into_operations(),
        review,
    }
}

fn diff_table(current: &Table, wanted: &Table, buckets: &mut Buckets, review: &mut Vec<ManualReview>) {
    let table = wanted.name.clone();

    if current.primary_key != wanted.primary_key {
        review.push(ManualReview::PrimaryKeyChanged {
            table: table.clone(),
            from: current.primary_key.clone(),
            to: wanted.primary_key.clone(),
        });
    }

    let mut added: Vec<&Column> = Vec::new();
    let mut removed: Vec<&Column> = Vec::new();

    for column in &wanted.columns {
        match current.get_column(&column.name) {
            None => added.push(column),
            Some(existing) if existing.ty != column.ty || existing.nullable != column.nullable => {
                let touches_serial =
                    existing.ty != column.ty
                        && (existing.ty == ColumnType::Serial || column.ty == ColumnType::Serial);
                if touches_serial {
                    review.push(ManualReview::SerialChanged {
                        table: table.clone(),
                        column: column.name.clone(),
                    });
                }
                buckets.alter_columns.push(Operation::AlterColumn {
                    table: table.clone(),
                    from: existing.clone(),
                    to: column.clone(),
                });
            }
            Some(_) => {}
        }
    }
    for column in &current.columns {
        if wanted.get_column(&column.name).is_none() {
            removed.push(column);
        }
    }

    for old in &removed {
        for new in &added {
            if old.ty == new.ty {
                review.push(ManualReview::PossibleColumnRename {
                    table: table.clone(),
                    from: old.name.clone(),
                    to: new.name.clone(),
                });
            }
        }
    }

    buckets
        .add_columns
        .extend(added.into_iter().map(|column| Operation::AddColumn {
            table: table.clone(),
            column: column.clone(),
        }));
    buckets
        .drop_columns
        .extend(removed.into_iter().map(|column| Operation::DropColumn {
            table: table.clone(),
            column: column.clone(),
        }));

    for constraint in &current.constraints {
        let keep = wanted
            .get_constraint(constraint.name())
            .map(|w| w.same_rule(constraint))
            .unwrap_or(false);
        if !keep {
            buckets.drop_constraints.push(Operation::DropConstraint {
                table: table.clone(),
                constraint: constraint.clone(),
            });
        }
    }
    for constraint in &wanted.constraints {
        let present = current
            .get_constraint(constraint.name())
            .map(|c| c.same_rule(constraint))
            .unwrap_or(false);
        if !present {
            buckets.add_constraints.push(Operation::AddConstraint {
                table: table.clone(),
                constraint: constraint.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{tables, Column, FkAction, Registry, Table};

    fn registry() -> Registry {
        tables::registry().expect("registry should validate")
    }

    #[test]
    fn test_identical_schema_has_no_changes() {
        let registry = registry();
        let live = Snapshot::from_registry(&registry);
        assert!(diff(&live, &registry).is_empty());
    }

    #[test]
    fn test_history_table_is_ignored() {
        let registry = registry();
        let mut live = Snapshot::from_registry(&registry);
        live.insert(
            Table::new(HISTORY_TABLE)
                .column(Column::text("version"))
                .primary_key(&["version"]),
        );
        assert!(diff(&live, &registry).is_empty());
    }

    #[test]
    fn test_empty_database_creates_every_table_in_dependency_order() {
        let registry = registry();
        let changes = diff(&Snapshot::default(), &registry);

        let created: Vec<&str> = changes.created_tables().map(|t| t.name.as_str()).collect();
        assert_eq!(created.len(), registry.len());
        let pos = |name: &str| created.iter().position(|n| *n == name).unwrap();
        assert!(pos("users") < pos("report"));
        assert!(pos("review") < pos("review_comment"));

        let downgrade = changes.downgrade();
        match downgrade.first() {
            Some(Operation::DropTable(t)) => assert_eq!(t.name, *created.last().unwrap()),
            other => panic!("expected a drop, got {:?}", other),
        }
    }

    #[test]
    fn test_new_nullable_column_is_one_add_with_drop_downgrade() {
        let registry = registry();
        let live = Snapshot::from_registry(&registry);

        let mut changed = registry.clone();
        let users = tables::users().column(Column::varchar("phone", 20).nullable());
        changed.upsert(users);

        let changes = diff(&live, &changed);
        assert!(!changes.needs_review());
        assert_eq!(
            changes.upgrade_sql(),
            vec!["ALTER TABLE \"users\" ADD COLUMN \"phone\" VARCHAR(20)".to_string()]
        );
        assert_eq!(
            changes.downgrade_sql(),
            vec!["ALTER TABLE \"users\" DROP COLUMN \"phone\"".to_string()]
        );
    }

    #[test]
    fn test_column_swap_of_same_type_is_flagged_as_rename() {
        let registry = registry();
        let live = Snapshot::from_registry(&registry);

        let mut changed = registry.clone();
        let mut tag = tables::tag();
        tag.columns[1].name = "label".to_string();
        changed.upsert(tag);

        let changes = diff(&live, &changed);
        assert_eq!(
            changes.review,
            vec![ManualReview::PossibleColumnRename {
                table: "tag".to_string(),
                from: "name".to_string(),
                to: "label".to_string(),
            }]
        );
    }

    #[test]
    fn test_table_with_same_columns_is_flagged_as_rename() {
        let registry = registry();
        let mut live = Snapshot::from_registry(&registry);
        live.remove("tag");
        let mut old = tables::tag();
        old.name = "label".to_string();
        live.insert(old);

        let changes = diff(&live, &registry);
        assert!(changes.review.contains(&ManualReview::PossibleTableRename {
            from: "label".to_string(),
            to: "tag".to_string(),
        }));
    }

    #[test]
    fn test_widening_is_an_alter_with_reverse_downgrade() {
        let registry = registry();
        let mut live = Snapshot::from_registry(&registry);
        let mut old = tables::report();
        old.columns
            .iter_mut()
            .find(|c| c.name == "description")
            .unwrap()
            .ty = ColumnType::Varchar(255);
        live.insert(old);

        let changes = diff(&live, &registry);
        assert_eq!(changes.operations.len(), 1);
        match &changes.operations[0] {
            Operation::AlterColumn { from, to, .. } => {
                assert_eq!(from.ty, ColumnType::Varchar(255));
                assert_eq!(to.ty, ColumnType::Text);
            }
            other => panic!("expected alter, got {:?}", other),
        }
        match &changes.downgrade()[0] {
            Operation::AlterColumn { to, .. } => assert_eq!(to.ty, ColumnType::Varchar(255)),
            other => panic!("expected alter, got {:?}", other),
        }
    }

    #[test]
    fn test_constraint_changes_drop_before_add() {
        let registry = registry();
        let mut live = Snapshot::from_registry(&registry);
        let old = Table::new("review_tag")
            .column(Column::integer("review_id"))
            .column(Column::integer("tag_id"))
            .primary_key(&["review_id", "tag_id"])
            .foreign_key("review_id", "review", "review_id")
            .foreign_key_on_delete("tag_id", "tag", "tag_id", FkAction::Cascade);
        live.insert(old);

        let changes = diff(&live, &registry);
        let kinds: Vec<&str> = changes
            .operations
            .iter()
            .map(|op| match op {
                Operation::DropConstraint { .. } => "drop",
                Operation::AddConstraint { .. } => "add",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["drop", "add"]);
    }

    #[test]
    fn test_stale_tables_drop_dependents_first() {
        let registry = Registry::from_tables(vec![tables::users()]).unwrap();
        let mut live = Snapshot::from_registry(&registry);
        live.insert(
            Table::new("legacy_parent")
                .column(Column::serial("id"))
                .column(Column::integer("flag"))
                .primary_key(&["id"]),
        );
        live.insert(
            Table::new("legacy_child")
                .column(Column::serial("id"))
                .column(Column::integer("parent_id"))
                .primary_key(&["id"])
                .foreign_key("parent_id", "legacy_parent", "id"),
        );

        let changes = diff(&live, &registry);
        let dropped: Vec<&str> = changes
            .operations
            .iter()
            .filter_map(|op| match op {
                Operation::DropTable(t) => Some(t.name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(dropped, vec!["legacy_child", "legacy_parent"]);
    }

    #[test]
    fn test_primary_key_change_needs_review() {
        let registry = registry();
        let mut live = Snapshot::from_registry(&registry);
        let mut old = tables::review_banner();
        old.primary_key = vec!["review_id".to_string()];
        live.insert(old);

        let changes = diff(&live, &registry);
        assert!(changes.needs_review());
    }
}
