use anyhow::{Result, anyhow};
use directories::UserDirs;
use log::info;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::actions;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub ready_line: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrightnessConfig {
    #[serde(default)]
    pub device: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionsConfig {
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub brightness: BrightnessConfig,
    #[serde(default)]
    pub actions: ActionsConfig,
}

impl Config {
    pub fn parse(txt: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(txt)?;
        validate(&cfg)?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone)]
pub struct ConfigState {
    pub config: Config,
    pub config_path: PathBuf,
}

pub fn config_dir() -> Result<PathBuf> {
    let dirs = UserDirs::new().ok_or_else(|| anyhow!("cannot resolve home directory"))?;
    Ok(dirs.home_dir().join(".config").join("handctl"))
}

fn default_config_text() -> &'static str {
    include_str!("../config/default.toml")
}

impl ConfigState {
    pub fn load_or_install_default() -> Result<Self> {
        let cfgdir = config_dir()?;
        fs::create_dir_all(&cfgdir)?;

        let path = cfgdir.join("config.toml");
        if !path.exists() {
            fs::write(&path, default_config_text())?;
            info!("installed default config at {}", path.display());
        }
        let config = load(&path)?;

        Ok(Self {
            config,
            config_path: path,
        })
    }

    pub fn doctor_report(&self) -> serde_json::Value {
        let uinput_ok = Path::new("/dev/uinput").exists();
        let in_input_group = check_in_input_group();
        serde_json::json!({
            "uinput_present": uinput_ok,
            "input_group_member": in_input_group,
            "backlights": actions::discover_backlights(),
            "config": self.config_path,
            "extractor": self.config.source.command,
            "dry_run": self.config.actions.dry_run,
            "hints": {
                "udev_rule": "/etc/udev/rules.d/80-uinput.rules",
                "add_user_to_input_group": "sudo usermod -aG input $USER && newgrp input",
                "backlight_write_access": "add a udev rule granting the video group write access to brightness"
            }
        })
    }
}

fn load(path: &Path) -> Result<Config> {
    let txt = fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read {}: {e}", path.display()))?;
    Config::parse(&txt).map_err(|e| anyhow!("failed to parse {}: {e}", path.display()))
}

fn validate(c: &Config) -> Result<()> {
    if c.source.command.iter().any(|s| s.trim().is_empty()) {
        return Err(anyhow!("source.command entries must not be empty"));
    }
    if let Some(r) = &c.source.ready_line {
        if r.trim().is_empty() {
            return Err(anyhow!("source.ready_line must not be blank"));
        }
    }
    if let Some(d) = &c.brightness.device {
        if d.is_empty() || d.contains('/') || d == "." || d == ".." {
            return Err(anyhow!(
                "brightness.device must be a name under /sys/class/backlight, got '{d}'"
            ));
        }
    }
    Ok(())
}

fn check_in_input_group() -> bool {
    if let Ok(s) = fs::read_to_string("/etc/group") {
        let user = whoami::username();
        for line in s.lines() {
            if line.starts_with("input:") {
                if line
                    .split(':')
                    .nth(3)
                    .unwrap_or("")
                    .split(',')
                    .any(|u| u == user)
                {
                    return true;
                }
            }
        }
    }
    false
}
