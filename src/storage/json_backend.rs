use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use crate::errors::{Result, WishError};
use crate::utils::paths::{app_data_dir, drafts_dir_in, ensure_dir};
use crate::wizard::autosave::{Draft, DraftSink};

use super::DraftStore;

const DRAFT_EXTENSION: &str = "json";
const TMP_SUFFIX: &str = "tmp";

/// Listing entry for a stored draft.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftInfo {
    pub wizard: String,
    pub step: usize,
    pub fields: usize,
    pub saved_at: DateTime<Utc>,
    pub path: PathBuf,
}

/// Keeps one pretty-printed JSON draft per wizard under `<root>/drafts/`.
#[derive(Debug, Clone)]
pub struct JsonDraftStore {
    root: PathBuf,
    drafts_dir: PathBuf,
}

impl JsonDraftStore {
    pub fn new(root: Option<PathBuf>) -> Result<Self> {
        let root = root.unwrap_or_else(app_data_dir);
        ensure_dir(&root)?;
        let drafts_dir = drafts_dir_in(&root);
        ensure_dir(&drafts_dir)?;
        Ok(Self { root, drafts_dir })
    }

    pub fn new_default() -> Result<Self> {
        Self::new(None)
    }

    pub fn base_dir(&self) -> &Path {
        &self.root
    }

    pub fn draft_path(&self, wizard: &str) -> PathBuf {
        self.drafts_dir
            .join(format!("{}.{}", canonical_name(wizard), DRAFT_EXTENSION))
    }
}

impl DraftStore for JsonDraftStore {
    fn save(&self, draft: &Draft) -> Result<()> {
        let path = self.draft_path(&draft.wizard);
        let json = serde_json::to_string_pretty(draft)?;
        write_atomic(&path, &json)?;
        tracing::debug!(path = %path.display(), "draft written");
        Ok(())
    }

    fn load(&self, wizard: &str) -> Result<Draft> {
        let path = self.draft_path(wizard);
        if !path.exists() {
            return Err(WishError::DraftNotFound(wizard.to_string()));
        }
        let data = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&data)?)
    }

    fn list(&self) -> Result<Vec<DraftInfo>> {
        if !self.drafts_dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.drafts_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(DRAFT_EXTENSION) {
                continue;
            }
            let draft: Draft = match fs::read_to_string(&path)
                .map_err(WishError::from)
                .and_then(|data| serde_json::from_str(&data).map_err(WishError::from))
            {
                Ok(draft) => draft,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping unreadable draft");
                    continue;
                }
            };
            entries.push(DraftInfo {
                fields: draft.values.as_map().len(),
                wizard: draft.wizard,
                step: draft.step,
                saved_at: draft.saved_at,
                path,
            });
        }
        entries.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(entries)
    }

    fn discard(&self, wizard: &str) -> Result<bool> {
        let path = self.draft_path(wizard);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        tracing::info!(wizard, "draft discarded");
        Ok(true)
    }
}

impl DraftSink for JsonDraftStore {
    fn persist(&self, draft: &Draft) -> Result<()> {
        self.save(draft)
    }
}

fn canonical_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '-' => c,
            _ => '_',
        })
        .collect();
    if sanitized.trim_matches('_').is_empty() {
        "wizard".into()
    } else {
        sanitized
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

/// Writes to a sibling temp file and renames it over the target.
pub(crate) fn write_atomic(path: &Path, data: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let tmp = tmp_path(path);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(data.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::values::FormValues;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn store_with_temp_dir() -> (JsonDraftStore, TempDir) {
        let temp = tempfile::tempdir().expect("create temp dir");
        let store = JsonDraftStore::new(Some(temp.path().to_path_buf())).expect("draft store");
        (store, temp)
    }

    fn draft(wizard: &str, step: usize) -> Draft {
        let values = FormValues::new()
            .with("income", 4200)
            .and_then(|values| values.with("housing.rent", 1500))
            .unwrap();
        Draft::new(wizard, Uuid::new_v4(), step, values)
    }

    #[test]
    fn save_and_load_roundtrip() {
        let (store, _guard) = store_with_temp_dir();
        let original = draft("budget-planner", 2);
        store.save(&original).expect("save draft");
        let loaded = store.load("budget-planner").expect("load draft");
        assert_eq!(loaded, original);
        assert!(!tmp_path(&store.draft_path("budget-planner")).exists());
    }

    #[test]
    fn missing_draft_is_reported() {
        let (store, _guard) = store_with_temp_dir();
        let err = store.load("goal").unwrap_err();
        assert!(matches!(err, WishError::DraftNotFound(name) if name == "goal"));
    }

    #[test]
    fn list_skips_corrupt_files_and_sorts_newest_first() {
        let (store, _guard) = store_with_temp_dir();
        let mut older = draft("goal", 0);
        older.saved_at = older.saved_at - chrono::Duration::hours(1);
        store.save(&older).unwrap();
        store.save(&draft("budget-planner", 3)).unwrap();
        fs::write(store.draft_path("broken"), "{ not json").unwrap();

        let listed = store.list().unwrap();
        let names: Vec<_> = listed.iter().map(|info| info.wizard.as_str()).collect();
        assert_eq!(names, vec!["budget-planner", "goal"]);
        assert_eq!(listed[0].step, 3);
        assert_eq!(listed[0].fields, 2);
    }

    #[test]
    fn discard_removes_file_once() {
        let (store, _guard) = store_with_temp_dir();
        store.save(&draft("wish-clarity", 1)).unwrap();
        assert!(store.discard("wish-clarity").unwrap());
        assert!(!store.discard("wish-clarity").unwrap());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn names_are_sanitised_for_the_filesystem() {
        let (store, _guard) = store_with_temp_dir();
        let path = store.draft_path("../Budget Planner");
        assert_eq!(
            path.file_name().and_then(|name| name.to_str()),
            Some("___budget_planner.json")
        );
    }
}
