use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::capability::Capabilities;
use crate::paths::ResolvedPaths;

pub const FORMATTING_MARKER: char = '&';

/// Global rendering configuration stored in `wiki.conf`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Settings {
    pub padding: String,
    pub default_title: String,
    pub prefix: String,
    pub primary_color: String,
    pub secondary_color: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            padding: "&3=".to_string(),
            default_title: "&bWiki".to_string(),
            prefix: "&7[] &b".to_string(),
            primary_color: "b".to_string(),
            secondary_color: "3".to_string(),
        }
    }
}

impl Settings {
    /// Prefix both color tokens with the formatting marker when it is missing.
    pub fn normalized(mut self) -> Self {
        self.primary_color = normalize_color_token(&self.primary_color);
        self.secondary_color = normalize_color_token(&self.secondary_color);
        self
    }
}

pub fn normalize_color_token(token: &str) -> String {
    if token.starts_with(FORMATTING_MARKER) {
        token.to_string()
    } else {
        format!("{FORMATTING_MARKER}{token}")
    }
}

/// One wiki record from `entries.conf`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Entry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub permission: Option<String>,
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(default)]
    pub hide: bool,
    #[serde(default = "default_share")]
    pub share: bool,
}

fn default_share() -> bool {
    true
}

impl Entry {
    /// Direct lookup gate: no permission, or the requester holds it.
    pub fn is_viewable_by<R: Capabilities + ?Sized>(&self, requester: &R) -> bool {
        self.permission
            .as_deref()
            .is_none_or(|permission| requester.has(permission))
    }

    /// Listing gate: viewable and not hidden.
    pub fn is_listable_by<R: Capabilities + ?Sized>(&self, requester: &R) -> bool {
        !self.hide && self.is_viewable_by(requester)
    }
}

pub fn default_entries() -> Vec<Entry> {
    vec![
        Entry {
            id: "some_wiki".to_string(),
            name: "Wiki Sample".to_string(),
            permission: Some("wiki.admin".to_string()),
            description: vec![
                "another_wiki|Some description line with click actions to open another wiki. The click action is set by starting the line with the ID of another wiki, followed by a vertical line".to_string(),
                "Another line without click actions".to_string(),
                "This wiki is only visible to players with the wiki.admin permission".to_string(),
            ],
            hide: false,
            share: true,
        },
        Entry {
            id: "another_wiki".to_string(),
            name: "Another Sample".to_string(),
            permission: None,
            description: vec![
                "This wiki will not appear in the list".to_string(),
                "But it will open using the click action on the first line of 'Wiki Sample'".to_string(),
                "Also, the share button is hidden for this wiki, as it is disabled with the 'share' setting".to_string(),
            ],
            hide: true,
            share: false,
        },
    ]
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub wrote_settings: bool,
    pub wrote_entries: bool,
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub settings: Settings,
    pub entries: Vec<Entry>,
    pub bootstrap: BootstrapReport,
}

/// Write whichever default document is missing. Existing documents are left alone.
pub fn bootstrap(paths: &ResolvedPaths) -> Result<BootstrapReport> {
    let wrote_settings = write_default_document(&paths.settings_path, &Settings::default())?;
    let wrote_entries = write_default_document(&paths.entries_path, &default_entries())?;
    Ok(BootstrapReport {
        wrote_settings,
        wrote_entries,
    })
}

/// Bootstrap missing documents, then load both. Either both load or nothing is returned.
pub fn load_or_bootstrap(paths: &ResolvedPaths) -> Result<LoadedConfig> {
    let bootstrap = bootstrap(paths)?;
    let settings = load_settings(&paths.settings_path)?;
    let entries = load_entries(&paths.entries_path)?;
    Ok(LoadedConfig {
        settings,
        entries,
        bootstrap,
    })
}

pub fn load_settings(path: &Path) -> Result<Settings> {
    read_document(path)
}

pub fn load_entries(path: &Path) -> Result<Vec<Entry>> {
    let entries: Vec<Entry> = read_document(path)?;
    validate_entries(&entries).with_context(|| format!("invalid entries in {}", path.display()))?;
    Ok(entries)
}

pub(crate) fn validate_entries(entries: &[Entry]) -> Result<()> {
    let mut seen = HashSet::new();
    for (position, entry) in entries.iter().enumerate() {
        if entry.id.trim().is_empty() {
            bail!("entry #{} has an empty id", position + 1);
        }
        if !seen.insert(entry.id.as_str()) {
            bail!("duplicate entry id '{}'", entry.id);
        }
    }
    Ok(())
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

fn write_default_document<T: Serialize>(path: &Path, document: &T) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }

    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create parent directory {}", parent.display()))?;
    let mut rendered = serde_json::to_string_pretty(document)
        .with_context(|| format!("failed to serialize {}", path.display()))?;
    rendered.push('\n');
    fs::write(path, rendered).with_context(|| format!("failed to write {}", path.display()))?;
    log::info!("wrote default document {}", path.display());
    Ok(true)
}
