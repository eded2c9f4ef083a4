//! The authoritative set of table definitions.

use super::Table;
use std::collections::{BTreeMap, BTreeSet};

/// Registry validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Two definitions share a table name.
    DuplicateTable(String),
    /// A foreign key points at a table the registry does not define.
    UnknownReference { table: String, target: String },
    /// Distinct tables reference each other in a loop. Lists only the
    /// tables on a loop, not those merely depending on one.
    Cycle(Vec<String>),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::DuplicateTable(name) => write!(f, "table '{}' defined twice", name),
            RegistryError::UnknownReference { table, target } => write!(
                f,
                "table '{}' references undefined table '{}'",
                table, target
            ),
            RegistryError::Cycle(tables) => {
                write!(f, "foreign key cycle between tables: {}", tables.join(", "))
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Mapping from table name to its definition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Registry {
    tables: BTreeMap<String, Table>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tables(tables: Vec<Table>) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for table in tables {
            registry.insert(table)?;
        }
        Ok(registry)
    }

    pub fn insert(&mut self, table: Table) -> Result<(), RegistryError> {
        if self.tables.contains_key(&table.name) {
            return Err(RegistryError::DuplicateTable(table.name));
        }
        self.tables.insert(table.name.clone(), table);
        Ok(())
    }

    /// Replace or add a definition, returning the previous one.
    pub fn upsert(&mut self, table: Table) -> Option<Table> {
        self.tables.insert(table.name.clone(), table)
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Check that every foreign key targets a defined table and that the
    /// reference graph is acyclic.
    pub fn validate(&self) -> Result<(), RegistryError> {
        for table in self.tables.values() {
            for target in table.references() {
                if !self.tables.contains_key(target) {
                    return Err(RegistryError::UnknownReference {
                        table: table.name.clone(),
                        target: target.to_string(),
                    });
                }
            }
        }
        self.dependency_order().map(|_| ())
    }

    /// Tables ordered so that every referenced table comes before the
    /// tables referencing it. Ties are broken by name.
    pub fn dependency_order(&self) -> Result<Vec<&Table>, RegistryError> {
        let names: BTreeSet<&str> = self.names().collect();
        order_tables(self.tables.values(), &names)
    }
}

/// Topologically order `tables`, considering only references to tables in
/// `scope`. References outside the scope are assumed to already exist.
pub(crate) fn order_tables<'a, I>(
    tables: I,
    scope: &BTreeSet<&str>,
) -> Result<Vec<&'a Table>, RegistryError>
where
    I: IntoIterator<Item = &'a Table>,
{
    let mut pending: BTreeMap<&str, &Table> =
        tables.into_iter().map(|t| (t.name.as_str(), t)).collect();
    let mut placed: BTreeSet<&str> = BTreeSet::new();
    let mut ordered = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        let ready: Vec<&str> = pending
            .values()
            .filter(|t| {
                t.references().all(|r| {
                    placed.contains(r) || !scope.contains(r) || !pending.contains_key(r)
                })
            })
            .map(|t| t.name.as_str())
            .collect();

        if ready.is_empty() {
            return Err(RegistryError::Cycle(cycle_members(&pending, scope)));
        }

        for name in ready {
            if let Some(table) = pending.remove(name) {
                placed.insert(name);
                ordered.push(table);
            }
        }
    }

    Ok(ordered)
}

/// Tables of `pending` that can reach themselves through in-scope
/// references to other pending tables.
fn cycle_members(pending: &BTreeMap<&str, &Table>, scope: &BTreeSet<&str>) -> Vec<String> {
    let edges = |name: &str| -> Vec<String> {
        pending
            .get(name)
            .map(|t| {
                t.references()
                    .filter(|r| scope.contains(r) && pending.contains_key(r))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    };

    pending
        .keys()
        .filter(|start| {
            let mut stack = edges(start);
            let mut seen = BTreeSet::new();
            while let Some(name) = stack.pop() {
                if name == **start {
                    return true;
                }
                if seen.insert(name.clone()) {
                    stack.extend(edges(&name));
                }
            }
            false
        })
        .map(|k| k.to_string())
        .collect()
}
