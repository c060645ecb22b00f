//! Named pipelines persisted as JSON files, one per pipeline.

use crate::operation::Pipeline;
use chrono::{DateTime, Utc};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPipeline {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
    #[serde(default)]
    pub usage_count: usize,
    pub operations: Pipeline,
}

impl SavedPipeline {
    fn file_name(&self) -> String {
        format!("pipeline_{}.json", self.id)
    }
}

pub struct PipelineStore {
    dir: PathBuf,
    pipelines: Vec<SavedPipeline>,
}

impl PipelineStore {
    /// Opens the store at `dir`. The directory is created on first save, not here.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let mut store = Self {
            dir: dir.into(),
            pipelines: Vec::new(),
        };
        store.load()?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reloads every `*.json` file; files that do not parse are skipped.
    pub fn load(&mut self) -> Result<()> {
        self.pipelines.clear();
        if !self.dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    log::warn!("could not read saved pipeline {}: {}", path.display(), e);
                    continue;
                }
            };
            match serde_json::from_str::<SavedPipeline>(&content) {
                Ok(saved) => self.pipelines.push(saved),
                Err(e) => log::warn!("could not parse saved pipeline {}: {}", path.display(), e),
            }
        }
        self.pipelines.sort_by(|a, b| a.created.cmp(&b.created));
        Ok(())
    }

    fn write(&self, saved: &SavedPipeline) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let file_path = self.dir.join(saved.file_name());
        let json = serde_json::to_string_pretty(saved)?;

        use fs2::FileExt;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&file_path)?;

        file.lock_exclusive()?;
        file.write_all(json.as_bytes())?;
        file.flush()?;
        file.unlock()?;

        Ok(())
    }

    /// Lookup by name, ignoring case.
    pub fn find(&self, name: &str) -> Option<&SavedPipeline> {
        self.pipelines
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn all(&self) -> &[SavedPipeline] {
        &self.pipelines
    }

    /// Saves `pipeline` under `name`. An existing pipeline with that name keeps its id,
    /// creation time and usage history; its operations and description are replaced.
    pub fn save(
        &mut self,
        name: &str,
        description: Option<String>,
        pipeline: Pipeline,
    ) -> Result<SavedPipeline> {
        let name = name.trim();
        if name.is_empty() {
            return Err(eyre!("Pipeline name cannot be empty"));
        }

        let saved = match self.find(name) {
            Some(existing) => SavedPipeline {
                description: description.or_else(|| existing.description.clone()),
                operations: pipeline,
                ..existing.clone()
            },
            None => {
                let created = Utc::now();
                let mut hasher = DefaultHasher::new();
                name.hash(&mut hasher);
                created.timestamp_nanos_opt().unwrap_or_default().hash(&mut hasher);
                SavedPipeline {
                    id: format!("{:016x}", hasher.finish()),
                    name: name.to_string(),
                    description,
                    created,
                    last_used: None,
                    usage_count: 0,
                    operations: pipeline,
                }
            }
        };

        self.write(&saved)?;
        match self.pipelines.iter_mut().find(|p| p.id == saved.id) {
            Some(existing) => *existing = saved.clone(),
            None => self.pipelines.push(saved.clone()),
        }
        log::info!("saved pipeline `{}` ({} steps)", saved.name, saved.operations.len());
        Ok(saved)
    }

    /// Deletes the named pipeline. Returns false when there was none.
    pub fn remove(&mut self, name: &str) -> Result<bool> {
        let Some(saved) = self.find(name).cloned() else {
            return Ok(false);
        };
        let file_path = self.dir.join(saved.file_name());
        if file_path.exists() {
            fs::remove_file(&file_path)?;
        }
        self.pipelines.retain(|p| p.id != saved.id);
        Ok(true)
    }

    /// Bumps the usage count and last-used time of the named pipeline.
    pub fn record_usage(&mut self, name: &str) -> Result<()> {
        let mut saved = self
            .find(name)
            .cloned()
            .ok_or_else(|| eyre!("No saved pipeline named `{}`", name))?;
        saved.usage_count += 1;
        saved.last_used = Some(Utc::now());
        self.write(&saved)?;
        if let Some(existing) = self.pipelines.iter_mut().find(|p| p.id == saved.id) {
            *existing = saved;
        }
        Ok(())
    }
}
