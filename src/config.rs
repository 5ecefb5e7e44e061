use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

use crate::selection::SelectionField;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";

/// Values offered by the configuration form
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct OptionCatalog {
    pub move_modes: Vec<String>,
    pub grasp_modes: Vec<String>,
    pub policies: Vec<String>,
    pub llms: Vec<String>,
    pub vlms: Vec<String>,
    pub vlas: Vec<String>,
}

impl Default for OptionCatalog {
    fn default() -> Self {
        let owned = |values: &[&str]| -> Vec<String> { values.iter().map(|v| v.to_string()).collect() };
        Self {
            move_modes: owned(&["3D Pos"]),
            grasp_modes: owned(&["dg", "cag"]),
            policies: owned(&["vision", "cot"]),
            llms: owned(&["gpt-4-turbo", "gpt-4o"]),
            vlms: owned(&["owl-vit", "owl-v2", "dino"]),
            vlas: owned(&["dp", "dp_nf", "dp_go", "dp_go_nf", "octo_ft", "octo_ft_nf"]),
        }
    }
}

impl OptionCatalog {
    pub fn options(&self, field: SelectionField) -> &[String] {
        match field {
            SelectionField::Move => &self.move_modes,
            SelectionField::Grasp => &self.grasp_modes,
            SelectionField::Policy => &self.policies,
            SelectionField::Llm => &self.llms,
            SelectionField::Vlm => &self.vlms,
            SelectionField::Vla => &self.vlas,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub backend_url: String,
    /// No timeout unless set; a hung request keeps its indicator pending
    pub request_timeout_secs: Option<u64>,
    pub log_file: Option<PathBuf>,
    pub options: OptionCatalog,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout_secs: None,
            log_file: None,
            options: OptionCatalog::default(),
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    /// Load the config file, falling back to defaults when it exists but cannot
    /// be read or parsed. The error is handed back so the caller can report it.
    pub fn load_or_default() -> (Self, Option<anyhow::Error>) {
        match Self::get_config_path() {
            Ok(path) => Self::load_or_default_from(&path),
            Err(e) => (Self::new(), Some(e)),
        }
    }

    pub fn load_or_default_from(config_path: &Path) -> (Self, Option<anyhow::Error>) {
        match Self::load_from(config_path) {
            Ok(config) => (config, None),
            Err(e) => {
                let e = e.context(format!("invalid config file '{}'", config_path.display()));
                (Self::new(), Some(e))
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn log_file_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.log_file {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;

        Ok(data_dir.join("robot-console").join("robot-console.log"))
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("robot-console").join("config.json"))
    }
}
