use crate::compiler::runtime;
use crate::error::NamingConflict;
use crate::graph::model::NodeId;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// An entry that lives in a [`NameTable`] and must be unique by name.
pub trait Named: Clone {
    fn name(&self) -> &str;

    /// The error reported when the name is already taken.
    fn conflict(name: &str) -> NamingConflict;

    /// Checks the name itself, independent of what else is registered.
    fn check_name(&self) -> Result<(), NamingConflict> {
        Ok(())
    }
}

/// A symbolic value produced by a step, referenced verbatim by later steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub name: String,
    pub display_name: String,
    pub producing_node_id: NodeId,
}

impl Named for Variable {
    fn name(&self) -> &str {
        &self.name
    }

    fn conflict(name: &str) -> NamingConflict {
        NamingConflict::Variable(name.to_string())
    }

    fn check_name(&self) -> Result<(), NamingConflict> {
        if !runtime::is_identifier(&self.name) {
            return Err(NamingConflict::InvalidIdentifier(self.name.clone()));
        }
        if runtime::is_reserved(&self.name) {
            return Err(NamingConflict::ReservedName(self.name.clone()));
        }
        Ok(())
    }
}

/// A reusable remote assistant configuration referenced by query steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assistant {
    pub name: String,
    pub model: String,
    pub personality: String,
}

impl Named for Assistant {
    fn name(&self) -> &str {
        &self.name
    }

    fn conflict(name: &str) -> NamingConflict {
        NamingConflict::Assistant(name.to_string())
    }

    fn check_name(&self) -> Result<(), NamingConflict> {
        if self.name.trim().is_empty() {
            return Err(NamingConflict::InvalidIdentifier(self.name.clone()));
        }
        Ok(())
    }
}

/// An insertion-ordered table of uniquely named entries.
///
/// Inserting returns a new table; the receiver is never modified.
#[derive(Debug, Clone)]
pub struct NameTable<T> {
    entries: Vec<T>,
    index: AHashMap<String, usize>,
}

pub type VariableRegistry = NameTable<Variable>;
pub type AssistantRegistry = NameTable<Assistant>;

impl<T: Named> NameTable<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: AHashMap::new(),
        }
    }

    /// Builds a table from persisted entries, rejecting the first duplicate.
    pub fn from_entries(entries: Vec<T>) -> Result<Self, NamingConflict> {
        entries
            .into_iter()
            .try_fold(Self::new(), |table, entry| table.with(entry))
    }

    /// Returns a copy of the table with `entry` added. First writer wins.
    pub fn with(&self, entry: T) -> Result<Self, NamingConflict> {
        entry.check_name()?;
        if self.contains(entry.name()) {
            return Err(T::conflict(entry.name()));
        }
        let mut next = self.clone();
        next.index.insert(entry.name().to_string(), next.entries.len());
        next.entries.push(entry);
        Ok(next)
    }

    /// Returns a copy of the table keeping only the entries matching `keep`.
    pub fn retained(&self, keep: impl Fn(&T) -> bool) -> Self {
        let entries: Vec<T> = self.entries.iter().filter(|e| keep(e)).cloned().collect();
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name().to_string(), i))
            .collect();
        Self { entries, index }
    }

    pub fn lookup(&self, name: &str) -> Option<&T> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Named> Default for NameTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq> PartialEq for NameTable<T> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl VariableRegistry {
    /// Variables introduced by a given node.
    pub fn produced_by<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Variable> {
        self.entries
            .iter()
            .filter(move |v| v.producing_node_id == node_id)
    }

    /// Whether a template or operand may reference `name`.
    pub fn is_resolvable(&self, name: &str) -> bool {
        self.contains(name) || runtime::is_ambient(name)
    }
}
