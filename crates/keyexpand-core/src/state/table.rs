// Keyexpand Substitution Table
// Concurrency-safe name -> replacement store

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Deserialize;

/// Substrings reserved by the entry file format; never allowed in entries.
pub const RESERVED_DELIMITERS: [&str; 2] = ["*(:", "*):"];

/// Errors raised when an entry is rejected by the table
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntryError {
    #[error("Activation key cannot be empty")]
    EmptyName,

    #[error("Activation key '{0}' cannot contain whitespace")]
    NameContainsWhitespace(String),

    #[error("{field} of '{name}' cannot contain '*(:' or '*):'")]
    ReservedDelimiter { name: String, field: &'static str },

    #[error("Activation key '{0}' already exists")]
    DuplicateName(String),
}

/// One configured substitution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubstitutionEntry {
    /// Token that triggers the expansion
    pub name: String,
    /// Replacement text typed in place of the token
    pub description: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl SubstitutionEntry {
    pub fn new(name: impl Into<String>, description: impl Into<String>, active: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            active,
        }
    }

    /// Check the name and description restrictions.
    pub fn validate(&self) -> Result<(), EntryError> {
        if self.name.is_empty() {
            return Err(EntryError::EmptyName);
        }
        if self.name.chars().any(char::is_whitespace) {
            return Err(EntryError::NameContainsWhitespace(self.name.clone()));
        }
        for (field, value) in [("Name", &self.name), ("Description", &self.description)] {
            if RESERVED_DELIMITERS.iter().any(|d| value.contains(d)) {
                return Err(EntryError::ReservedDelimiter {
                    name: self.name.clone(),
                    field,
                });
            }
        }
        Ok(())
    }
}

/// Read-only view of the substitution table used by device workers.
pub trait SubstitutionLookup: Send + Sync {
    /// Exact, case-sensitive lookup by name.
    fn lookup(&self, name: &str) -> Option<Arc<SubstitutionEntry>>;
}

/// Live substitution entries.
///
/// Entries are stored behind `Arc` and only ever replaced whole, so a lookup
/// returns either the old or the new version of an entry, never a mix.
#[derive(Debug, Default)]
pub struct SubstitutionTable {
    entries: RwLock<HashMap<String, Arc<SubstitutionEntry>>>,
}

impl SubstitutionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from entries, rejecting invalid or duplicate names.
    pub fn from_entries<I>(entries: I) -> Result<Self, EntryError>
    where
        I: IntoIterator<Item = SubstitutionEntry>,
    {
        let table = Self::new();
        table.replace_all(entries)?;
        Ok(table)
    }

    /// Add a new entry. Fails if the name is already present.
    pub fn insert(&self, entry: SubstitutionEntry) -> Result<(), EntryError> {
        entry.validate()?;
        let mut entries = self.entries.write();
        if entries.contains_key(&entry.name) {
            return Err(EntryError::DuplicateName(entry.name));
        }
        entries.insert(entry.name.clone(), Arc::new(entry));
        Ok(())
    }

    /// Add or replace an entry, returning the previous version if any.
    pub fn upsert(
        &self,
        entry: SubstitutionEntry,
    ) -> Result<Option<Arc<SubstitutionEntry>>, EntryError> {
        entry.validate()?;
        Ok(self
            .entries
            .write()
            .insert(entry.name.clone(), Arc::new(entry)))
    }

    /// Toggle an entry on or off. Returns false if the name is unknown.
    pub fn set_active(&self, name: &str, active: bool) -> bool {
        let mut entries = self.entries.write();
        match entries.get_mut(name) {
            Some(entry) => {
                let mut updated = (**entry).clone();
                updated.active = active;
                *entry = Arc::new(updated);
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, name: &str) -> Option<Arc<SubstitutionEntry>> {
        self.entries.write().remove(name)
    }

    /// Swap in a complete new set of entries.
    ///
    /// All entries are validated first; on error the table is unchanged.
    pub fn replace_all<I>(&self, entries: I) -> Result<(), EntryError>
    where
        I: IntoIterator<Item = SubstitutionEntry>,
    {
        let mut fresh = HashMap::new();
        for entry in entries {
            entry.validate()?;
            if fresh.contains_key(&entry.name) {
                return Err(EntryError::DuplicateName(entry.name));
            }
            fresh.insert(entry.name.clone(), Arc::new(entry));
        }
        *self.entries.write() = fresh;
        Ok(())
    }

    /// Entry names in sorted order
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl SubstitutionLookup for SubstitutionTable {
    fn lookup(&self, name: &str) -> Option<Arc<SubstitutionEntry>> {
        self.entries.read().get(name).cloned()
    }
}
