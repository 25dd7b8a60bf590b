//! Cron persistence (spec §6 "Cron persistence"): one logical document
//! holding a version tag and the job list, round-tripped losslessly.
//! Grounded on the shape of the session store's atomic-write discipline
//! ([`crate::config::loader::save_config`]'s temp-file + rename pattern),
//! adapted to a single JSON document since cron jobs are a small, whole-file
//! collection rather than a per-row table.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;
use crate::model::CronJob;

const CRON_STORE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CronDocument {
    version: u32,
    jobs: Vec<CronJob>,
}

pub trait CronStore: Send + Sync {
    fn load_all(&self) -> Result<Vec<CronJob>, SchedulerError>;
    fn save_all(&self, jobs: &[CronJob]) -> Result<(), SchedulerError>;
}

pub struct JsonCronStore {
    path: PathBuf,
}

impl JsonCronStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_path() -> Result<PathBuf, String> {
        dirs::home_dir().map(|h| h.join(".clawpoint").join("cron.json")).ok_or_else(|| "could not determine home directory".to_string())
    }
}

impl CronStore for JsonCronStore {
    fn load_all(&self) -> Result<Vec<CronJob>, SchedulerError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SchedulerError::InvalidExpression(format!("failed to read cron store: {e}"))),
        };
        let document: CronDocument = serde_json::from_str(&content).map_err(|e| SchedulerError::InvalidExpression(format!("failed to parse cron store: {e}")))?;
        Ok(document.jobs)
    }

    fn save_all(&self, jobs: &[CronJob]) -> Result<(), SchedulerError> {
        let document = CronDocument { version: CRON_STORE_VERSION, jobs: jobs.to_vec() };
        let content = serde_json::to_string_pretty(&document).map_err(|e| SchedulerError::InvalidExpression(format!("failed to serialize cron store: {e}")))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| SchedulerError::InvalidExpression(format!("failed to create cron store dir: {e}")))?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, &content).map_err(|e| SchedulerError::InvalidExpression(format!("failed to write cron store: {e}")))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| SchedulerError::InvalidExpression(format!("failed to replace cron store: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CronAction, CronJob};
    use tempfile::TempDir;

    fn job(id: &str) -> CronJob {
        CronJob {
            id: id.to_string(),
            name: "nightly summary".into(),
            schedule: "@daily".into(),
            enabled: true,
            actions: vec![CronAction::Message { channel: "cli".into(), text: "good night".into() }],
            timeout_secs: 30,
            retry_count: 0,
            next_run: None,
            run_count: 0,
            fail_count: 0,
            last_run: None,
        }
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonCronStore::new(dir.path().join("cron.json"));
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn save_and_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = JsonCronStore::new(dir.path().join("cron.json"));
        store.save_all(&[job("j1"), job("j2")]).unwrap();
        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, "j1");
    }

    #[test]
    fn save_overwrites_previous_contents() {
        let dir = TempDir::new().unwrap();
        let store = JsonCronStore::new(dir.path().join("cron.json"));
        store.save_all(&[job("j1")]).unwrap();
        store.save_all(&[job("j2")]).unwrap();
        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "j2");
    }
}
