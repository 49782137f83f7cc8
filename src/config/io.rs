//! Configuration file I/O operations

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

use super::Config;

impl Config {
    /// Get the global config directory path (~/.bubble-quest/)
    pub fn global_config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".bubble-quest")
    }

    /// Get the global config file path (~/.bubble-quest/config.toml)
    pub fn global_config_path() -> PathBuf {
        Self::global_config_dir().join("config.toml")
    }

    /// Write the config to `path`, creating its directory.
    ///
    /// Concurrent `init` runs are serialized on `config.toml.lock`; readers
    /// only ever see a complete file because the content is renamed into
    /// place from `config.toml.tmp`.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create Bubble Quest directory {}", dir.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Cannot encode Bubble Quest config as TOML")?;

        let lock_path = path.with_extension("toml.lock");
        let lock = open_truncated(&lock_path)?;
        lock.lock_exclusive()
            .with_context(|| format!("Another process holds {}", lock_path.display()))?;

        let staged = path.with_extension("toml.tmp");
        let mut file = open_truncated(&staged)?;
        file.write_all(content.as_bytes())
            .and_then(|()| file.sync_all())
            .with_context(|| format!("Cannot write {}", staged.display()))?;

        std::fs::rename(&staged, path)
            .with_context(|| format!("Cannot move {} into place", staged.display()))?;

        tracing::debug!(path = %path.display(), user_id = ?self.user_id, "saved config");
        Ok(())
    }
}

fn open_truncated(path: &Path) -> Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("Cannot open {}", path.display()))
}
