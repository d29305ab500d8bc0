use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use time::macros::format_description;
use time::OffsetDateTime;

use super::settings::AppSettings;
use crate::schema::exchange::{self, Imported};
use crate::schema::{PositionMap, SchemaDocument};

// Well-known key the last edited document is cached under
pub const CACHE_KEY: &str = "graph-model-editor-data";

/// Local cache of the last edited document and its positions. The file uses
/// the same JSON shape as an export, so a cache can be opened as a document.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_settings(settings: &AppSettings) -> Self {
        Self::new(settings.cache_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", CACHE_KEY))
    }

    pub fn save(&self, doc: &SchemaDocument, positions: &PositionMap) -> anyhow::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let s = exchange::export_string(doc, positions)?;
        let path = self.path();
        atomic_write(&path, s.as_bytes())?;
        Ok(path)
    }

    /// `Ok(None)` when nothing has been cached yet.
    pub fn load(&self) -> anyhow::Result<Option<Imported>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        load_from_path(&path).map(Some)
    }

    /// Cached session if there is a readable one, otherwise `fallback`.
    /// A corrupt cache is logged and ignored, never fatal.
    pub fn load_or(&self, fallback: Imported) -> Imported {
        match self.load() {
            Ok(Some(state)) => {
                log::info!("resumed cached session from {}", self.path().display());
                state
            }
            Ok(None) => fallback,
            Err(e) => {
                log::warn!("ignoring unreadable cache {}: {:#}", self.path().display(), e);
                fallback
            }
        }
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        let path = self.path();
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    {
        let mut f = File::create(&tmp_path)?;
        f.write_all(data)?;
        f.flush()?;
    }
    fs::rename(tmp_path, path)?;
    Ok(())
}

pub fn load_from_path(path: &Path) -> anyhow::Result<Imported> {
    let mut f = File::open(path)?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let state = exchange::import_str(&buf)?;
    Ok(state)
}

/// Timestamped file name for an export dropped into `dir`.
pub fn export_path_now(dir: &Path) -> PathBuf {
    let now = OffsetDateTime::now_utc();
    let fmt = format_description!("[year][month][day]_[hour][minute][second]");
    let stamp = now.format(fmt).unwrap_or_else(|_| "unknown".to_string());
    dir.join(format!("schema_{}.json", stamp))
}

pub fn export_to_path(path: &Path, doc: &SchemaDocument, positions: &PositionMap) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let s = exchange::export_string(doc, positions)?;
    atomic_write(path, s.as_bytes())?;
    log::info!("exported {} node type(s) to {}", doc.node_count(), path.display());
    Ok(())
}
