//! Filesystem-backed daily notes for the Memory Controller's system-prompt
//! assembly (spec §4.7 "recent 'daily' notes"). Long-term memory is owned by
//! the identity module's `LONG_TERM_MEMORY.md`; this module is the rolling
//! diary half only.
//!
//! ```text
//! ~/.clawpoint/memory/
//!   2026-02-18.md     ← today's diary
//!   2026-02-17.md     ← yesterday's diary
//! ```
//!
//! Each entry in a daily file is formatted as:
//! ```text
//! ## HH:MM
//! <content>
//!
//! ```

use std::{fs, path::PathBuf};

use chrono::{Local, NaiveDate};

pub struct DailyMemory {
    dir: PathBuf,
}

impl DailyMemory {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn default_dir() -> Result<PathBuf, String> {
        dirs::home_dir()
            .map(|h| h.join(".clawpoint").join("memory"))
            .ok_or_else(|| "could not determine home directory".to_string())
    }

    fn ensure_dir(&self) -> Result<(), String> {
        fs::create_dir_all(&self.dir).map_err(|e| format!("failed to create memory dir {:?}: {e}", self.dir))
    }

    fn day_path(&self, date: &str) -> PathBuf {
        self.dir.join(format!("{date}.md"))
    }

    pub fn store_daily(&self, content: &str) -> Result<(), String> {
        self.ensure_dir()?;
        let now = Local::now();
        let date = now.format("%Y-%m-%d").to_string();
        let time = now.format("%H:%M").to_string();
        let entry = format!("## {time}\n{content}\n\n");
        use std::io::Write as _;
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.day_path(&date))
            .and_then(|mut f| f.write_all(entry.as_bytes()))
            .map_err(|e| format!("failed to write daily entry for '{date}': {e}"))
    }

    pub fn recall_daily(&self, date: &str) -> Result<Option<String>, String> {
        match fs::read_to_string(self.day_path(date)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(format!("failed to read daily file '{date}': {e}")),
        }
    }

    pub fn get_recent_daily(&self) -> Result<(Option<String>, Option<String>), String> {
        let today = Local::now().format("%Y-%m-%d").to_string();
        let yesterday = (Local::now() - chrono::Duration::days(1)).format("%Y-%m-%d").to_string();
        Ok((self.recall_daily(&today)?, self.recall_daily(&yesterday)?))
    }

    /// The daily-notes context block (spec §4.7 step 1), empty string when
    /// neither today nor yesterday has an entry.
    pub fn build_daily_context(&self) -> String {
        let mut sections: Vec<String> = Vec::new();
        let today = Local::now().format("%Y-%m-%d").to_string();
        let yesterday = (Local::now() - chrono::Duration::days(1)).format("%Y-%m-%d").to_string();

        if let Ok(Some(content)) = self.recall_daily(&today) {
            if !content.trim().is_empty() {
                sections.push(format!("## Today's notes ({today})\n\n{content}"));
            }
        }
        if let Ok(Some(content)) = self.recall_daily(&yesterday) {
            if !content.trim().is_empty() {
                sections.push(format!("## Yesterday's notes ({yesterday})\n\n{content}"));
            }
        }
        sections.join("\n\n---\n\n")
    }

    pub fn list_dates(&self) -> Result<Vec<String>, String> {
        match fs::read_dir(&self.dir) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(format!("failed to read memory dir: {e}")),
            Ok(rd) => {
                let mut dates: Vec<String> = rd
                    .filter_map(|entry| entry.ok())
                    .filter_map(|entry| {
                        let name = entry.file_name().to_string_lossy().to_string();
                        let date = name.strip_suffix(".md")?;
                        NaiveDate::parse_from_str(date, "%Y-%m-%d").ok().map(|_| date.to_owned())
                    })
                    .collect();
                dates.sort_by(|a, b| b.cmp(a));
                Ok(dates)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_daily(tmp: &TempDir) -> DailyMemory {
        DailyMemory::new(tmp.path().to_path_buf())
    }

    #[test]
    fn store_daily_creates_file() {
        let tmp = TempDir::new().unwrap();
        let daily = make_daily(&tmp);
        daily.store_daily("Worked on memory system.").unwrap();
        let today = Local::now().format("%Y-%m-%d").to_string();
        assert!(tmp.path().join(format!("{today}.md")).exists());
    }

    #[test]
    fn recall_daily_returns_content() {
        let tmp = TempDir::new().unwrap();
        let daily = make_daily(&tmp);
        daily.store_daily("First entry.").unwrap();
        let today = Local::now().format("%Y-%m-%d").to_string();
        let content = daily.recall_daily(&today).unwrap();
        assert!(content.unwrap().contains("First entry."));
    }

    #[test]
    fn recall_daily_nonexistent_date_returns_none() {
        let tmp = TempDir::new().unwrap();
        let daily = make_daily(&tmp);
        assert!(daily.recall_daily("1970-01-01").unwrap().is_none());
    }

    #[test]
    fn store_daily_appends_multiple_entries() {
        let tmp = TempDir::new().unwrap();
        let daily = make_daily(&tmp);
        daily.store_daily("First.").unwrap();
        daily.store_daily("Second.").unwrap();
        let today = Local::now().format("%Y-%m-%d").to_string();
        let content = daily.recall_daily(&today).unwrap().unwrap();
        assert!(content.contains("First.") && content.contains("Second."));
    }

    #[test]
    fn get_recent_daily_returns_today() {
        let tmp = TempDir::new().unwrap();
        let daily = make_daily(&tmp);
        daily.store_daily("Today's work.").unwrap();
        let (today, _yesterday) = daily.get_recent_daily().unwrap();
        assert!(today.unwrap().contains("Today's work."));
    }

    #[test]
    fn list_dates_returns_todays_date() {
        let tmp = TempDir::new().unwrap();
        let daily = make_daily(&tmp);
        daily.store_daily("Test.").unwrap();
        let today = Local::now().format("%Y-%m-%d").to_string();
        assert!(daily.list_dates().unwrap().contains(&today));
    }

    #[test]
    fn build_daily_context_empty_when_no_files() {
        let tmp = TempDir::new().unwrap();
        assert!(make_daily(&tmp).build_daily_context().is_empty());
    }

    #[test]
    fn build_daily_context_includes_today_entry() {
        let tmp = TempDir::new().unwrap();
        let daily = make_daily(&tmp);
        daily.store_daily("Context content.").unwrap();
        assert!(daily.build_daily_context().contains("Context content."));
    }
}
