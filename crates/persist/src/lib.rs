//! Template persistence layer.
//!
//! Finalized templates are either written straight into the live template
//! directory ([`StorageMode::Permanent`]) or, while a batch rebuild runs,
//! staged in a scratch directory and registered in a manifest
//! ([`StorageMode::Temporary`]) so a failed rebuild never replaces a working
//! site. Promotion of staged files is the batch driver's job.
//!
//! ## What we do
//!
//! - Store template metadata, best-effort
//! - Create the template directory on demand with a fixed mode
//! - Write with full-replace semantics
//! - Register staged paths in an append-only manifest
//! - Remove stale files idempotently
//!
//! All I/O goes through [`FileStore`], [`MetadataStore`] and
//! [`ManifestStore`], so hosts inject their own storage.
//!
//! ```rust
//! use persist::{
//!     InMemoryFileStore, InMemoryManifest, InMemoryMetadataStore, PersistedTemplate,
//!     StorageMode, TemplateWriter, WriterConfig,
//! };
//!
//! let cfg = WriterConfig::new("/site/templates", "/site/scratch");
//! let files = InMemoryFileStore::new();
//! let metadata = InMemoryMetadataStore::new();
//! let manifest = InMemoryManifest::new();
//! let writer = TemplateWriter::new(&cfg, &files, &metadata, &manifest);
//!
//! let template = PersistedTemplate {
//!     filename: "view--front.html.twig".into(),
//!     metadata_key: "view--front".into(),
//!     content: "<main></main>".into(),
//!     metadata: None,
//! };
//! let path = writer.write(StorageMode::Permanent, &template).unwrap();
//! assert_eq!(files.read(&path).unwrap(), b"<main></main>");
//! ```

mod config;
mod error;
mod store;
mod writer;

pub use crate::config::{ConfigError, WriterConfig, DEFAULT_DIR_MODE, DEFAULT_MANIFEST_KEY};
pub use crate::error::PersistError;
pub use crate::store::{
    FileStore, InMemoryFileStore, InMemoryManifest, InMemoryMetadataStore, LocalFileStore,
    ManifestStore, MetadataStore, DEFAULT_FILE_MODE,
};
pub use crate::writer::{
    PersistedTemplate, StaleCleanup, StorageMode, TemplateWriter, METADATA_FILENAME_FIELD,
};
