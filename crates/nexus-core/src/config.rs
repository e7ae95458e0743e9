use crate::error::{Result, SyncError};
use crate::git::Transport;
use crate::paths;
use globset::Glob;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// GitConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    #[serde(default = "default_depth")]
    pub depth: u32,
    #[serde(default = "default_ssh")]
    pub ssh: bool,
    /// Host used for both the clone remote and the generated `href` links.
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_depth() -> u32 {
    1
}

fn default_ssh() -> bool {
    true
}

fn default_host() -> String {
    "github.com".to_string()
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            depth: default_depth(),
            ssh: default_ssh(),
            host: default_host(),
        }
    }
}

// ---------------------------------------------------------------------------
// SectionConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionConfig {
    pub id: String,
    pub repo: String,
    #[serde(rename = "ref", default = "default_ref")]
    pub git_ref: String,
    #[serde(default = "default_include")]
    pub include: Vec<String>,
    /// Relative to `root`; defaults to `data/<id>.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<PathBuf>,
}

fn default_ref() -> String {
    "main".to_string()
}

fn default_include() -> Vec<String> {
    vec!["**/*".to_string()]
}

impl SectionConfig {
    pub fn dest_or_default(&self) -> PathBuf {
        self.dest
            .clone()
            .unwrap_or_else(|| paths::default_section_dest(&self.id))
    }
}

// ---------------------------------------------------------------------------
// SyncConfig (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_sources_root")]
    pub sources_root: PathBuf,
    #[serde(default)]
    pub git: GitConfig,
    #[serde(default)]
    pub sections: Vec<SectionConfig>,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_sources_root() -> PathBuf {
    PathBuf::from(paths::DEFAULT_SOURCES_ROOT)
}

impl SyncConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SyncError::ConfigNotFound(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path)?;
        Self::from_yaml(&data)
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        // An empty file is a config with every default and no sections.
        if data.trim().is_empty() {
            return Ok(serde_yaml::from_str("{}")?);
        }
        Ok(serde_yaml::from_str(data)?)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.git.depth == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "git.depth is 0; a depth of 1 will be used".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for section in &self.sections {
            if section.id.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("section for repo '{}' has an empty id", section.repo),
                });
            } else if !seen.insert(section.id.as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("duplicate section id '{}'", section.id),
                });
            }

            if paths::validate_repo_slug(&section.repo).is_err() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!(
                        "section '{}' has bad repo slug '{}' (expected owner/name)",
                        section.id, section.repo
                    ),
                });
            }

            if section.include.is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "section '{}' has no include patterns and will produce no items",
                        section.id
                    ),
                });
            }

            for pattern in &section.include {
                if let Err(e) = Glob::new(pattern) {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Error,
                        message: format!(
                            "section '{}' has invalid include pattern '{}': {}",
                            section.id, pattern, e
                        ),
                    });
                }
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// SyncPlan
// ---------------------------------------------------------------------------

/// Git settings after applying defaults and the `GIT_SSH` override.
#[derive(Debug, Clone, Serialize)]
pub struct GitSettings {
    pub depth: u32,
    pub transport: Transport,
    pub host: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionPlan {
    pub id: String,
    pub repo: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub include: Vec<String>,
    pub dest: PathBuf,
    pub checkout: PathBuf,
}

/// A config with every path resolved against the directory it was loaded from.
#[derive(Debug, Clone, Serialize)]
pub struct SyncPlan {
    pub root: PathBuf,
    pub sources_root: PathBuf,
    pub git: GitSettings,
    pub sections: Vec<SectionPlan>,
}

impl SyncPlan {
    pub fn from_config(config: &SyncConfig, config_dir: &Path, env_git_ssh: Option<&str>) -> Self {
        let root = paths::join_clean(config_dir, &config.root);
        let sources_root = paths::join_clean(config_dir, &config.sources_root);
        let git = GitSettings {
            depth: config.git.depth.max(1),
            transport: Transport::resolve(config.git.ssh, env_git_ssh),
            host: config.git.host.clone(),
        };
        let sections = config
            .sections
            .iter()
            .map(|s| SectionPlan {
                id: s.id.clone(),
                repo: s.repo.clone(),
                git_ref: s.git_ref.clone(),
                include: s.include.clone(),
                dest: paths::join_clean(&root, &s.dest_or_default()),
                checkout: paths::checkout_dir(&sources_root, &s.repo),
            })
            .collect();
        Self {
            root,
            sources_root,
            git,
            sections,
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        paths::manifest_path(&self.root)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
