use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub const CONFIG_DIR_ENV: &str = "MODWIKI_CONFIG_DIR";
pub const DEFAULT_CONFIG_DIR: &str = "config/modwiki";
pub const SETTINGS_FILENAME: &str = "wiki.conf";
pub const ENTRIES_FILENAME: &str = "entries.conf";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Flag,
    Env,
    Default,
}

impl ValueSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Env => "env",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolutionContext {
    pub cwd: PathBuf,
}

impl ResolutionContext {
    pub fn from_process() -> Result<Self> {
        let cwd = env::current_dir().context("failed to read current directory")?;
        Ok(Self { cwd })
    }
}

/// Locations of the two persisted documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub config_dir: PathBuf,
    pub settings_path: PathBuf,
    pub entries_path: PathBuf,
    pub config_source: ValueSource,
}

impl ResolvedPaths {
    pub fn in_dir(config_dir: impl Into<PathBuf>, config_source: ValueSource) -> Self {
        let config_dir = config_dir.into();
        Self {
            settings_path: config_dir.join(SETTINGS_FILENAME),
            entries_path: config_dir.join(ENTRIES_FILENAME),
            config_dir,
            config_source,
        }
    }

    pub fn diagnostics(&self) -> String {
        format!(
            "config_dir={} ({})\nsettings_path={}\nentries_path={}",
            normalize_for_display(&self.config_dir),
            self.config_source.as_str(),
            normalize_for_display(&self.settings_path),
            normalize_for_display(&self.entries_path),
        )
    }
}

/// Resolve the config directory: flag > `MODWIKI_CONFIG_DIR` > `./config/modwiki`.
pub fn resolve_paths(context: &ResolutionContext, flag: Option<&Path>) -> ResolvedPaths {
    resolve_paths_with_lookup(context, flag, |key| env::var(key).ok())
}

fn resolve_paths_with_lookup<F>(
    context: &ResolutionContext,
    flag: Option<&Path>,
    lookup_env: F,
) -> ResolvedPaths
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = flag {
        return ResolvedPaths::in_dir(absolutize(path, &context.cwd), ValueSource::Flag);
    }

    if let Some(value) = lookup_env(CONFIG_DIR_ENV)
        && !value.trim().is_empty()
    {
        return ResolvedPaths::in_dir(
            absolutize(Path::new(value.trim()), &context.cwd),
            ValueSource::Env,
        );
    }

    ResolvedPaths::in_dir(context.cwd.join(DEFAULT_CONFIG_DIR), ValueSource::Default)
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

pub fn normalize_for_display(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
