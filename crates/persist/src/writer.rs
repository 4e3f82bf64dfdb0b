use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::config::WriterConfig;
use crate::error::PersistError;
use crate::store::{FileStore, ManifestStore, MetadataStore};

/// Metadata field the compiler uses to name the output file.
pub const METADATA_FILENAME_FIELD: &str = "filename";

/// Where a write lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    /// Live template directory, visible to the rendering layer at once.
    Permanent,
    /// Scratch directory plus manifest entry, promoted when the batch ends.
    Temporary,
}

impl StorageMode {
    /// Temporary while a batch rebuild is running, permanent otherwise.
    pub fn from_batch_flag(running_batch: bool) -> Self {
        if running_batch {
            StorageMode::Temporary
        } else {
            StorageMode::Permanent
        }
    }
}

/// A finalized template ready for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTemplate {
    pub filename: String,
    pub metadata_key: String,
    pub content: String,
    pub metadata: Option<Map<String, Value>>,
}

/// Result of a stale-file cleanup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaleCleanup {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<PersistError>,
}

/// Commits templates through the injected storage collaborators.
pub struct TemplateWriter<'a> {
    cfg: &'a WriterConfig,
    files: &'a dyn FileStore,
    metadata: &'a dyn MetadataStore,
    manifest: &'a dyn ManifestStore,
}

impl<'a> TemplateWriter<'a> {
    pub fn new(
        cfg: &'a WriterConfig,
        files: &'a dyn FileStore,
        metadata: &'a dyn MetadataStore,
        manifest: &'a dyn ManifestStore,
    ) -> Self {
        Self {
            cfg,
            files,
            metadata,
            manifest,
        }
    }

    /// Writes one template and returns the path it landed at.
    ///
    /// Metadata is stored first and only ever logged on failure; the content
    /// write is what decides the result.
    pub fn write(
        &self,
        mode: StorageMode,
        template: &PersistedTemplate,
    ) -> Result<PathBuf, PersistError> {
        self.cfg.validate()?;
        check_filename(&template.filename)?;

        self.store_metadata(template);

        match mode {
            StorageMode::Permanent => self.write_permanent(template),
            StorageMode::Temporary => self.write_temporary(template),
        }
    }

    /// Deletes every named file that exists in the template directory.
    pub fn remove_stale<I, S>(&self, filenames: I) -> StaleCleanup
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cleanup = StaleCleanup::default();
        for name in filenames {
            let name = name.as_ref();
            if let Err(err) = check_filename(name) {
                cleanup.failed.push(err);
                continue;
            }
            let path = self.cfg.template_dir.join(name);
            if !self.files.exists(&path) {
                continue;
            }
            match self.files.delete(&path) {
                Ok(()) => {
                    info!(template_file = %path.display(), "template_deleted");
                    cleanup.removed.push(path);
                }
                Err(err) => {
                    warn!(template_file = %path.display(), error = %err, "template_delete_failure");
                    cleanup.failed.push(err);
                }
            }
        }
        cleanup
    }

    fn store_metadata(&self, template: &PersistedTemplate) {
        let Some(metadata) = template.metadata.as_ref() else {
            info!(template_file = %template.metadata_key, "template_metadata_missing");
            return;
        };
        if !metadata
            .get(METADATA_FILENAME_FIELD)
            .is_some_and(|v| v.as_str().is_some_and(|s| !s.is_empty()))
        {
            info!(
                template_file = %template.metadata_key,
                "template_metadata_missing_filename"
            );
        }
        if let Err(err) = self.metadata.set(&template.metadata_key, metadata) {
            info!(
                template_file = %template.metadata_key,
                error = %err,
                "template_metadata_store_failure"
            );
        }
    }

    fn write_permanent(&self, template: &PersistedTemplate) -> Result<PathBuf, PersistError> {
        let dir = &self.cfg.template_dir;
        if !self.files.exists(dir) {
            if let Err(err) = self.files.create_dir(dir, self.cfg.dir_mode) {
                error!(dir = %dir.display(), error = %err, "template_dir_create_failure");
                return Err(err);
            }
        }

        let path = dir.join(&template.filename);
        self.commit(&path, template)?;
        info!(template_file = %path.display(), mode = "permanent", "template_written");
        Ok(path)
    }

    fn write_temporary(&self, template: &PersistedTemplate) -> Result<PathBuf, PersistError> {
        let path = self.cfg.scratch_dir.join(&template.filename);
        self.commit(&path, template)?;

        if let Err(err) = self.manifest.append(&self.cfg.manifest_key, &path) {
            // Unregistered staging files would never be promoted or cleaned up.
            if let Err(cleanup) = self.files.delete(&path) {
                warn!(template_file = %path.display(), error = %cleanup, "template_unstage_failure");
            }
            error!(template_file = %path.display(), error = %err, "template_manifest_failure");
            return Err(PersistError::Manifest {
                path,
                reason: err.to_string(),
            });
        }

        info!(template_file = %path.display(), mode = "temporary", "template_written");
        Ok(path)
    }

    fn commit(&self, path: &Path, template: &PersistedTemplate) -> Result<(), PersistError> {
        self.files
            .write_replace(path, template.content.as_bytes())
            .inspect_err(|err| {
                error!(template_file = %path.display(), error = %err, "template_write_failure");
            })
    }
}

fn check_filename(name: &str) -> Result<(), PersistError> {
    let escapes = name.is_empty()
        || name.contains(['/', '\\', '\0'])
        || name == "."
        || name == "..";
    if escapes {
        return Err(PersistError::InvalidFilename(name.to_string()));
    }
    Ok(())
}
