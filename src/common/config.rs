use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

pub fn config_file() -> PathBuf {
    dirs::home_dir().unwrap().join(".config").join("tabgrid").join("config.toml")
}

fn yes() -> bool {
    true
}
fn no() -> bool {
    false
}

/// Which group's stored title/color survives a merge.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MergePrecedence {
    #[default]
    DestinationWins,
    SourceWins,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct ProjectionSettings {
    /// Order the projection by most-recent activity instead of collection order.
    #[serde(default = "no")]
    pub mru_mode: bool,
    /// Treat size-1 groups as real groups; when disabled their metadata is
    /// discarded once the group degenerates.
    #[serde(default = "no")]
    pub singleton_groups: bool,
    /// Issue merges provisionally; an external undo affordance commits them.
    #[serde(default = "yes")]
    pub undoable_merges: bool,
    #[serde(default)]
    pub merge_precedence: MergePrecedence,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            mru_mode: false,
            singleton_groups: false,
            undoable_merges: true,
            merge_precedence: MergePrecedence::default(),
        }
    }
}

fn default_merge_threshold() -> f64 {
    24.0
}
fn default_ungroup_zone_height() -> f64 {
    64.0
}
fn default_ungroup_hover_threshold() -> f64 {
    24.0
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct DragSettings {
    /// Half-width of the merge hover band around one cell pitch, in points.
    #[serde(default = "default_merge_threshold")]
    pub merge_threshold: f64,
    /// Distance from the container bottom at which the ungroup zone engages.
    #[serde(default = "default_ungroup_zone_height")]
    pub ungroup_zone_height: f64,
    /// Tighter distance at which the engaged ungroup zone reads as hovered.
    #[serde(default = "default_ungroup_hover_threshold")]
    pub ungroup_hover_threshold: f64,
}

impl Default for DragSettings {
    fn default() -> Self {
        Self {
            merge_threshold: default_merge_threshold(),
            ungroup_zone_height: default_ungroup_zone_height(),
            ungroup_hover_threshold: default_ungroup_hover_threshold(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub projection: ProjectionSettings,
    #[serde(default)]
    pub drag: DragSettings,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Config::parse(&buf)
    }

    pub fn parse(buf: &str) -> anyhow::Result<Config> {
        let config: Config = toml::from_str(buf)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let drag = &self.settings.drag;
        if drag.merge_threshold <= 0.0 {
            bail!("drag.merge_threshold must be positive");
        }
        if drag.ungroup_hover_threshold > drag.ungroup_zone_height {
            bail!("drag.ungroup_hover_threshold cannot exceed drag.ungroup_zone_height");
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}
