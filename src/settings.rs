use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_addr: String,
    pub gemini_model: String,
    pub gemini_base_url: Option<String>,
    pub together_model: String,
    pub together_steps: u32,
    pub together_base_url: Option<String>,
    pub font_paths: Vec<String>,
    pub preview_path: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:8787".to_string(),
            gemini_model: "gemini-2.0-flash-exp".to_string(),
            gemini_base_url: None,
            together_model: "black-forest-labs/FLUX.1-schnell".to_string(),
            together_steps: 4,
            together_base_url: None,
            font_paths: Vec::new(),
            preview_path: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    server: Option<ServerSettings>,
    gemini: Option<GeminiSettings>,
    together: Option<TogetherSettings>,
    canvas: Option<CanvasSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    addr: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GeminiSettings {
    model: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TogetherSettings {
    model: Option<String>,
    steps: Option<u32>,
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CanvasSettings {
    font_paths: Option<Vec<String>>,
    preview_path: Option<String>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];

    if let Some(home) = paths::base_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            settings.merge_str(&content).with_context(|| {
                format!("failed to parse settings: {}", path.display())
            })?;
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge_str(&mut self, content: &str) -> Result<()> {
        let parsed: SettingsFile = toml::from_str(content)?;
        self.merge(parsed);
        Ok(())
    }

    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(server) = incoming.server
            && let Some(addr) = non_empty(server.addr)
        {
            self.server_addr = addr;
        }
        if let Some(gemini) = incoming.gemini {
            if let Some(model) = non_empty(gemini.model) {
                self.gemini_model = model;
            }
            if let Some(url) = non_empty(gemini.base_url) {
                self.gemini_base_url = Some(url);
            }
        }
        if let Some(together) = incoming.together {
            if let Some(model) = non_empty(together.model) {
                self.together_model = model;
            }
            if let Some(steps) = together.steps
                && steps > 0
            {
                self.together_steps = steps;
            }
            if let Some(url) = non_empty(together.base_url) {
                self.together_base_url = Some(url);
            }
        }
        if let Some(canvas) = incoming.canvas {
            if let Some(font_paths) = canvas.font_paths {
                self.font_paths = font_paths
                    .into_iter()
                    .filter(|path| !path.trim().is_empty())
                    .collect();
            }
            if let Some(path) = non_empty(canvas.preview_path) {
                self.preview_path = Some(path);
            }
        }
    }

    /// Where the interactive session writes the live preview.
    pub fn preview_path(&self) -> PathBuf {
        self.preview_path
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(paths::preview_path)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = paths::base_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}
