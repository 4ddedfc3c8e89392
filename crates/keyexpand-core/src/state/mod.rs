// Keyexpand Shared State
// Live substitution entries shared between device workers and the editor

mod table;

pub use table::{EntryError, SubstitutionEntry, SubstitutionLookup, SubstitutionTable};
