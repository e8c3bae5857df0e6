//! Canned-response lookup consulted before calling the language model
//!
//! Entries are `(Query, Response)` rows kept in store order. A transcript
//! matches a row when one contains the other, ignoring case; the first
//! matching row wins.

mod sqlite;

pub use sqlite::{LOOKUP_TABLE, SqliteLookup};

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One canned answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupEntry {
    /// Pattern compared against the transcript
    #[serde(rename = "Query", alias = "query")]
    pub query: String,
    /// Reply returned verbatim on match
    #[serde(rename = "Response", alias = "response")]
    pub response: String,
}

impl LookupEntry {
    /// Create an entry
    #[must_use]
    pub fn new(query: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            response: response.into(),
        }
    }

    /// Case-insensitive containment in either direction
    #[must_use]
    pub fn matches(&self, transcript: &str) -> bool {
        let pattern = self.query.trim().to_lowercase();
        let transcript = transcript.trim().to_lowercase();
        if pattern.is_empty() || transcript.is_empty() {
            return false;
        }
        transcript.contains(&pattern) || pattern.contains(&transcript)
    }
}

/// First entry matching `transcript`, in iteration order
pub fn first_match<'a, I>(entries: I, transcript: &str) -> Option<&'a LookupEntry>
where
    I: IntoIterator<Item = &'a LookupEntry>,
{
    entries.into_iter().find(|entry| entry.matches(transcript))
}

/// Read-only canned-response store
#[async_trait]
pub trait LocalLookup: Send + Sync {
    /// Find the response for a transcript
    ///
    /// # Errors
    ///
    /// Returns `Error::Lookup` if the store cannot be read
    async fn find(&self, query: &str) -> Result<Option<String>>;

    /// Store name for logging
    fn name(&self) -> &'static str;
}

/// In-memory ordered lookup table
#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    entries: Vec<LookupEntry>,
}

impl LookupTable {
    /// Create a table from entries in store order
    #[must_use]
    pub const fn new(entries: Vec<LookupEntry>) -> Self {
        Self { entries }
    }

    /// Load a JSON array of `{"Query": ..., "Response": ...}` rows
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let entries: Vec<LookupEntry> = serde_json::from_str(&content)
            .map_err(|e| Error::Lookup(format!("invalid lookup table {}: {e}", path.display())))?;
        tracing::info!(path = %path.display(), entries = entries.len(), "loaded lookup table");
        Ok(Self { entries })
    }

    /// Entries in store order
    #[must_use]
    pub fn entries(&self) -> &[LookupEntry] {
        &self.entries
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl LocalLookup for LookupTable {
    async fn find(&self, query: &str) -> Result<Option<String>> {
        Ok(first_match(&self.entries, query).map(|entry| entry.response.clone()))
    }

    fn name(&self) -> &'static str {
        "table"
    }
}

/// Open the lookup store at `path`
///
/// `.json` files load into memory; anything else is opened as a read-only
/// `SQLite` database. A missing or unparseable JSON file yields an empty
/// table.
///
/// # Errors
///
/// Returns error if the `SQLite` connection pool cannot be created
pub fn open(path: &Path) -> Result<Arc<dyn LocalLookup>> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "lookup store not found, every query will miss");
        return Ok(Arc::new(LookupTable::default()));
    }

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        let table = LookupTable::load_json(path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "lookup table unreadable, every query will miss");
            LookupTable::default()
        });
        Ok(Arc::new(table))
    } else {
        Ok(Arc::new(SqliteLookup::open(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_within_transcript() {
        let entry = LookupEntry::new("hours", "We are open 9-5.");
        assert!(entry.matches("What are your hours?"));
        assert!(entry.matches("HOURS"));
        assert!(!entry.matches("Where are you located?"));
    }

    #[test]
    fn test_transcript_within_pattern() {
        let entry = LookupEntry::new("what are your opening hours", "We are open 9-5.");
        assert!(entry.matches("Opening Hours"));
    }

    #[test]
    fn test_empty_never_matches() {
        assert!(!LookupEntry::new("", "x").matches("anything"));
        assert!(!LookupEntry::new("hours", "x").matches("   "));
    }

    #[test]
    fn test_arabic_case_insensitive_noop() {
        let entry = LookupEntry::new("مرحبا", "أهلا وسهلا");
        assert!(entry.matches("مرحبا بك"));
    }

    #[test]
    fn test_first_match_wins() {
        let entries = vec![
            LookupEntry::new("price", "first"),
            LookupEntry::new("hours", "second"),
            LookupEntry::new("your hours", "third"),
        ];
        let hit = first_match(&entries, "what are your hours").unwrap();
        assert_eq!(hit.response, "second");
    }

    #[tokio::test]
    async fn test_table_find() {
        let table = LookupTable::new(vec![LookupEntry::new("hours", "We are open 9-5.")]);
        assert_eq!(
            table.find("What are your hours?").await.unwrap().as_deref(),
            Some("We are open 9-5.")
        );
        assert!(table.find("Tell me a joke").await.unwrap().is_none());
    }

    #[test]
    fn test_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lookup.json");
        std::fs::write(
            &path,
            r#"[{"Query": "hours", "Response": "We are open 9-5."}, {"query": "where", "response": "Downtown."}]"#,
        )
        .unwrap();

        let table = LookupTable::load_json(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.entries()[1], LookupEntry::new("where", "Downtown."));
    }

    #[test]
    fn test_load_corrupt_json_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lookup.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(LookupTable::load_json(&path), Err(Error::Lookup(_))));
    }

    #[tokio::test]
    async fn test_open_corrupt_json_always_misses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lookup.json");
        std::fs::write(&path, "{not json").unwrap();

        let lookup = open(&path).unwrap();
        assert_eq!(lookup.name(), "table");
        assert!(lookup.find("hours").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_missing_path_always_misses() {
        let lookup = open(Path::new("/nonexistent/lookup.db")).unwrap();
        assert!(lookup.find("hours").await.unwrap().is_none());
    }
}
