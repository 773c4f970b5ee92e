use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::pipeline::cur2png::ConversionOptions;
use crate::pipeline::cur2png::converter::DEFAULT_EXTENSIONS;

const CONFIG_DIR: &str = "cur2png";
const CONFIG_FILE: &str = "config.toml";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Used when no target folder is given on the command line.
    pub input_dir: Option<PathBuf>,
    /// `None` means a `<input>_png` sibling of the input directory.
    pub output_dir: Option<PathBuf>,
    pub thread_count: usize,
    pub extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: None,
            output_dir: None,
            thread_count: 0,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl Config {
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// `<config_dir>/cur2png/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Explicit file if given, else the per-user file if it exists, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => {
                log::debug!("Loading config from {}", path.display());
                Self::load_from_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// The command-line target wins over `input_dir`. The result is canonical.
    pub fn resolve_input_dir(&self, target: Option<&Path>) -> Result<PathBuf> {
        let dir = target
            .or(self.input_dir.as_deref())
            .ok_or_else(|| anyhow!("No input directory given and none set in the config"))?;
        dir.canonicalize()
            .with_context(|| format!("Input directory not found: {}", dir.display()))
    }

    pub fn conversion_options(&self) -> ConversionOptions {
        ConversionOptions::new()
            .with_extensions(self.extensions.iter().cloned())
            .with_thread_count(self.thread_count)
    }
}
