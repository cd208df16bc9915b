use std::{
    fmt, fs,
    io::{BufWriter, Write},
    path::PathBuf,
};

use serde::{Deserialize, Serialize};

use crate::{
    classifier::types::{ProviderDialect, SenderProfile},
    pipeline::types::ProcessedRecord,
};

const PERSISTENCE_VERSION: u64 = 1;

/// Most-recent delivered records kept across restarts.
pub const MAX_PERSISTED_DELIVERED: usize = 50;

#[derive(Debug, Clone)]
pub struct PersistenceError {
    pub message: String,
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for PersistenceError {}

fn internal_error(message: impl Into<String>) -> PersistenceError {
    PersistenceError {
        message: message.into(),
    }
}

/// The slice of pipeline state that survives a restart: settings plus a
/// bounded tail of the delivered feed. The live buffer and the deferred
/// queue are deliberately absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedShieldState {
    version: u64,
    pub provider: ProviderDialect,
    pub user_profile: Option<SenderProfile>,
    pub delivered: Vec<ProcessedRecord>,
}

impl PersistedShieldState {
    pub fn new(
        provider: ProviderDialect,
        user_profile: Option<SenderProfile>,
        delivered: Vec<ProcessedRecord>,
    ) -> Self {
        let mut delivered = delivered;
        delivered.truncate(MAX_PERSISTED_DELIVERED);
        Self {
            version: PERSISTENCE_VERSION,
            provider,
            user_profile,
            delivered,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotPersistence {
    path: PathBuf,
}

impl SnapshotPersistence {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn load(&self) -> Result<Option<PersistedShieldState>, PersistenceError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(internal_error(format!(
                    "failed to read shield state '{}': {err}",
                    self.path.display()
                )));
            }
        };

        let parsed: PersistedShieldState = serde_json::from_str(&content).map_err(|err| {
            internal_error(format!(
                "failed to parse shield state '{}': {err}",
                self.path.display()
            ))
        })?;
        if parsed.version != PERSISTENCE_VERSION {
            return Err(internal_error(format!(
                "unsupported shield state version {} at '{}'",
                parsed.version,
                self.path.display()
            )));
        }

        Ok(Some(parsed))
    }

    /// Write-then-rename so readers never observe a torn snapshot.
    pub fn save(&self, state: &PersistedShieldState) -> Result<(), PersistenceError> {
        let parent = self.path.parent().ok_or_else(|| {
            internal_error(format!(
                "shield state path '{}' has no parent",
                self.path.display()
            ))
        })?;
        fs::create_dir_all(parent).map_err(|err| {
            internal_error(format!(
                "failed to create shield state directory '{}': {err}",
                parent.display()
            ))
        })?;

        let tmp_path = self.path.with_extension("tmp");
        let file = fs::File::create(&tmp_path).map_err(|err| {
            internal_error(format!(
                "failed to create shield temp file '{}': {err}",
                tmp_path.display()
            ))
        })?;
        {
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, state).map_err(|err| {
                internal_error(format!(
                    "failed to serialize shield state '{}': {err}",
                    tmp_path.display()
                ))
            })?;
            writer.write_all(b"\n").map_err(|err| {
                internal_error(format!(
                    "failed to finalize shield state '{}': {err}",
                    tmp_path.display()
                ))
            })?;
            writer.flush().map_err(|err| {
                internal_error(format!(
                    "failed to flush shield state '{}': {err}",
                    tmp_path.display()
                ))
            })?;
        }

        let tmp_file = fs::OpenOptions::new()
            .read(true)
            .open(&tmp_path)
            .map_err(|err| {
                internal_error(format!(
                    "failed to reopen shield temp file '{}': {err}",
                    tmp_path.display()
                ))
            })?;
        tmp_file.sync_all().map_err(|err| {
            internal_error(format!(
                "failed to sync shield temp file '{}': {err}",
                tmp_path.display()
            ))
        })?;

        fs::rename(&tmp_path, &self.path).map_err(|err| {
            internal_error(format!(
                "failed to replace shield state '{}' from '{}': {err}",
                self.path.display(),
                tmp_path.display()
            ))
        })?;

        if let Ok(parent_file) = fs::File::open(parent) {
            let _ = parent_file.sync_all();
        }

        Ok(())
    }
}
