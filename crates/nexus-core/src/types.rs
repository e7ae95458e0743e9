use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Triage
// ---------------------------------------------------------------------------

/// Five-color severity classification attached to a synced document.
/// `Blue` is the lowest severity and the fallback for anything unrecognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Triage {
    #[default]
    Blue,
    Green,
    Yellow,
    Orange,
    Red,
}

impl Triage {
    pub fn all() -> &'static [Triage] {
        &[
            Triage::Blue,
            Triage::Green,
            Triage::Yellow,
            Triage::Orange,
            Triage::Red,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Triage::Blue => "Blue",
            Triage::Green => "Green",
            Triage::Yellow => "Yellow",
            Triage::Orange => "Orange",
            Triage::Red => "Red",
        }
    }

    /// Trim, capitalize (first char upper, rest lower) and match against the
    /// enumeration. Empty, absent and unknown values all become `Blue`.
    pub fn normalize(value: Option<&str>) -> Triage {
        let Some(value) = value else {
            return Triage::default();
        };
        capitalize(value.trim())
            .parse()
            .unwrap_or_default()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

impl fmt::Display for Triage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Triage {
    type Err = crate::error::SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Blue" => Ok(Triage::Blue),
            "Green" => Ok(Triage::Green),
            "Yellow" => Ok(Triage::Yellow),
            "Orange" => Ok(Triage::Orange),
            "Red" => Ok(Triage::Red),
            _ => Err(crate::error::SyncError::InvalidTriage(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// SyncItem
// ---------------------------------------------------------------------------

/// One normalized record per collected file. Field order is the on-disk order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncItem {
    pub title: String,
    pub summary: Option<String>,
    pub triage: Triage,
    pub repo: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub sha: String,
    /// Relative to the working copy root, always `/`-separated.
    pub path: String,
    pub href: String,
}

// ---------------------------------------------------------------------------
// RunManifest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSummary {
    pub count: usize,
    pub dest: String,
}

/// Summary written to `data/nexus.json` after every section has been synced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub generated_at: String,
    pub sections: BTreeMap<String, SectionSummary>,
}

impl RunManifest {
    pub fn new(sections: BTreeMap<String, SectionSummary>) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            sections,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
