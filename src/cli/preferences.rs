//! Preference commands: list, enable, disable, reset.

use std::io::Write;

use crate::error::{ExtrasError, ExtrasResult};
use crate::features::{find_meta, CATALOG};
use crate::storage::PreferenceStore;

/// One line of `extras list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureRow {
    pub identifier: &'static str,
    pub enabled: bool,
    pub name: &'static str,
    pub description: &'static str,
}

/// Every catalog feature with its stored state.
pub fn list(store: &PreferenceStore) -> Vec<FeatureRow> {
    CATALOG
        .iter()
        .map(|meta| FeatureRow {
            identifier: meta.identifier,
            enabled: store.is_enabled(meta.identifier),
            name: meta.name,
            description: meta.description,
        })
        .collect()
}

pub fn write_list(rows: &[FeatureRow], out: &mut impl Write) -> std::io::Result<()> {
    let width = rows.iter().map(|r| r.identifier.len()).max().unwrap_or(0);
    for row in rows {
        let state = if row.enabled { "on" } else { "off" };
        writeln!(out, "{:<width$}  {:<3}  {}", row.identifier, state, row.name)?;
        writeln!(out, "{:<width$}       {}", "", row.description)?;
    }
    Ok(())
}

/// Store `enabled` for a catalog feature.
pub fn set_enabled(store: &PreferenceStore, identifier: &str, enabled: bool) -> ExtrasResult<()> {
    let meta = find_meta(identifier)
        .ok_or_else(|| ExtrasError::UnknownFeature(identifier.to_string()))?;
    store.write(meta.identifier, enabled);
    tracing::info!(feature = meta.identifier, enabled, "Preference updated");
    Ok(())
}

/// Remove every stored key. Returns how many there were.
pub fn reset(store: &PreferenceStore) -> usize {
    let keys: Vec<String> = store.read_all().into_keys().collect();
    for key in &keys {
        store.remove(key);
    }
    keys.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{JsonFileBackend, MemoryBackend};
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_list_follows_catalog() {
        let store = PreferenceStore::new(MemoryBackend::with_values([("timecodes", json!(true))]));
        let rows = list(&store);

        assert_eq!(rows.len(), CATALOG.len());
        assert_eq!(rows[0].identifier, "hideTrends");
        assert!(rows.iter().find(|r| r.identifier == "timecodes").unwrap().enabled);
        assert_eq!(rows.iter().filter(|r| r.enabled).count(), 1);

        let mut out = Vec::new();
        write_list(&rows, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.lines().any(|l| l.starts_with("timecodes") && l.contains(" on ")));
    }

    #[test]
    fn test_set_enabled_rejects_unknown() {
        let store = PreferenceStore::in_memory();
        assert!(matches!(
            set_enabled(&store, "autoplay", true),
            Err(ExtrasError::UnknownFeature(id)) if id == "autoplay"
        ));
        assert!(store.read_all().is_empty());
    }

    #[test]
    fn test_writes_persist_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("preferences.json");

        {
            let store = PreferenceStore::new(JsonFileBackend::open(&path));
            set_enabled(&store, "hideTrends", true).unwrap();
            set_enabled(&store, "formatCodeBlocks", false).unwrap();
        }

        let store = PreferenceStore::new(JsonFileBackend::open(&path));
        assert!(store.is_enabled("hideTrends"));
        assert_eq!(store.read_all().len(), 2);

        assert_eq!(reset(&store), 2);
        assert!(store.read_all().is_empty());
        assert!(PreferenceStore::new(JsonFileBackend::open(&path))
            .read_all()
            .is_empty());
    }
}
