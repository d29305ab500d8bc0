use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::canvas::layout::SimulationParams;

const APP_DIR: &str = "Schema-Loom";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    // If None, use OS default cache directory
    pub cache_override: Option<PathBuf>,
    // If None, use OS temporary directory for exports
    pub export_override: Option<PathBuf>,
    pub overview_enabled: bool,
    pub simulation: SimulationParams,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            cache_override: None,
            export_override: None,
            overview_enabled: true,
            simulation: SimulationParams::default(),
        }
    }
}

impl AppSettings {
    fn config_dir() -> PathBuf {
        #[cfg(target_os = "macos")]
        {
            // ~/Library/Application Support/Schema-Loom
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join("Library").join("Application Support").join(APP_DIR);
        }
        #[cfg(target_os = "windows")]
        {
            if let Ok(appdata) = std::env::var("APPDATA") {
                return PathBuf::from(appdata).join(APP_DIR);
            }
            return PathBuf::from(APP_DIR);
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // $XDG_CONFIG_HOME/Schema-Loom or ~/.config/Schema-Loom
            if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
                return PathBuf::from(xdg).join(APP_DIR);
            }
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join(".config").join(APP_DIR);
        }
    }

    fn cache_default_dir() -> PathBuf {
        #[cfg(target_os = "macos")]
        {
            let tmp = std::env::var_os("TMPDIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("/tmp"));
            return tmp.join(APP_DIR);
        }
        #[cfg(target_os = "windows")]
        {
            // %LOCALAPPDATA%\Schema-Loom\Cache else TEMP
            if let Ok(local) = std::env::var("LOCALAPPDATA") {
                return PathBuf::from(local).join(APP_DIR).join("Cache");
            }
            return std::env::temp_dir().join(APP_DIR);
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // $XDG_STATE_HOME/schema-loom or ~/.local/state/schema-loom, else /tmp/Schema-Loom
            if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
                return PathBuf::from(xdg).join("schema-loom");
            }
            if let Ok(home) = std::env::var("HOME") {
                return PathBuf::from(home).join(".local").join("state").join("schema-loom");
            }
            return PathBuf::from("/tmp").join(APP_DIR);
        }
    }

    pub fn settings_path() -> PathBuf {
        Self::config_dir().join("settings.json")
    }

    pub fn load() -> anyhow::Result<Self> {
        let path = Self::settings_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let mut f = fs::File::open(path)?;
        let mut s = String::new();
        f.read_to_string(&mut s)?;
        let v: Self = serde_json::from_str(&s)?;
        Ok(v)
    }

    /// Settings from disk, or defaults when the file is missing or unreadable.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            log::warn!("settings unreadable, using defaults: {:#}", e);
            Self::default()
        })
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let dir = Self::config_dir();
        fs::create_dir_all(&dir)?;
        let s = serde_json::to_string_pretty(self)?;
        let mut f = fs::File::create(dir.join("settings.json"))?;
        f.write_all(s.as_bytes())?;
        Ok(())
    }

    pub fn cache_dir(&self) -> PathBuf {
        if let Some(p) = &self.cache_override { return p.clone(); }
        Self::cache_default_dir()
    }

    /// Default export directory when no override is set.
    /// Example: {temp_dir}/Schema-Loom/exports
    pub fn export_default_dir() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(APP_DIR);
        p.push("exports");
        p
    }

    pub fn export_dir(&self) -> PathBuf {
        if let Some(p) = &self.export_override { return p.clone(); }
        Self::export_default_dir()
    }
}
