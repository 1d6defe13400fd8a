//! Load agent prompts from a directory of YAML files and apply env overrides.
//!
//! **Canonical source**: Default prompt text lives in `loom/prompts/*.yaml`; they are
//! embedded at compile time and used when no `PROMPTS_DIR` or directory is present.
//! See [`load`], [`load_or_default`], [`default_from_embedded`], and [`LoadError`].

use std::path::Path;

use serde::Deserialize;

use super::{HelvePromptsFile, ReactPromptsFile};

/// Embedded default YAML (canonical source: `loom/prompts/*.yaml`).
macro_rules! embed_prompt_yaml {
    ($name:literal) => {
        include_str!(concat!("../../prompts/", $name))
    };
}
const EMBED_REACT: &str = embed_prompt_yaml!("react.yaml");
const EMBED_HELVE: &str = embed_prompt_yaml!("helve.yaml");

/// Error when loading prompts from a directory (missing dir, invalid YAML).
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("prompts directory not found or not readable: {0}")]
    DirNotFound(String),
    #[error("failed to read prompts file {path}: {message}")]
    ReadFile { path: String, message: String },
    #[error("failed to parse YAML in {path}: {message}")]
    ParseYaml { path: String, message: String },
}

/// Names of YAML files under the prompts directory (one per pattern).
const REACT_FILE: &str = "react.yaml";
const HELVE_FILE: &str = "helve.yaml";

/// Default directory name when `PROMPTS_DIR` is not set.
const DEFAULT_PROMPTS_DIR: &str = "prompts";

/// Returns the directory to load prompts from: `dir` if `Some`, else `PROMPTS_DIR` env, else `DEFAULT_PROMPTS_DIR`.
fn prompts_dir(dir: Option<&Path>) -> std::path::PathBuf {
    dir.map(std::path::PathBuf::from).unwrap_or_else(|| {
        std::env::var("PROMPTS_DIR")
            .ok()
            .map(std::path::PathBuf::from)
            .unwrap_or_else(|| std::path::PathBuf::from(DEFAULT_PROMPTS_DIR))
    })
}

/// Tries to read and parse a YAML file into `T`. Missing file or parse error returns `None` or error.
fn read_yaml_file<T>(dir: &Path, name: &str) -> Result<Option<T>, LoadError>
where
    T: for<'de> Deserialize<'de>,
{
    let path = dir.join(name);
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) => {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Ok(None);
            }
            return Err(LoadError::ReadFile {
                path: path.display().to_string(),
                message: e.to_string(),
            });
        }
    };
    let value: T = serde_yaml::from_str(&content).map_err(|e| LoadError::ParseYaml {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(Some(value))
}

/// Applies env override for ReAct: `REACT_SYSTEM_PROMPT` overrides `system_prompt`.
fn apply_react_env(mut file: ReactPromptsFile) -> ReactPromptsFile {
    if let Ok(s) = std::env::var("REACT_SYSTEM_PROMPT") {
        file.system_prompt = Some(s);
    }
    file
}

/// Loads prompts from a directory: reads `react.yaml`, `helve.yaml`, applies env overrides
/// (e.g. `REACT_SYSTEM_PROMPT`), and returns an [`AgentPrompts`](super::resolve::AgentPrompts).
///
/// If `dir` is `None`, uses `PROMPTS_DIR` env or default `./prompts`. Missing files are ignored
/// (that pattern keeps code defaults). Only returns error when the directory is required but missing,
/// or when a present file fails to parse.
pub fn load(dir: Option<&Path>) -> Result<super::resolve::AgentPrompts, LoadError> {
    let base = prompts_dir(dir);
    if !base.exists() || !base.is_dir() {
        return Err(LoadError::DirNotFound(base.display().to_string()));
    }

    let react = read_yaml_file::<ReactPromptsFile>(&base, REACT_FILE)?
        .map(apply_react_env)
        .unwrap_or_default();
    let helve = read_yaml_file::<HelvePromptsFile>(&base, HELVE_FILE)?.unwrap_or_default();

    Ok(super::resolve::AgentPrompts { react, helve })
}

/// Returns default prompts by parsing the embedded YAML in `loom/prompts/*.yaml`.
///
/// This is the single source of truth for default prompt text; no duplicate strings in Rust.
/// Used by [`load_or_default`] when no directory is present and by tests.
pub fn default_from_embedded() -> super::resolve::AgentPrompts {
    let react: ReactPromptsFile = serde_yaml::from_str(EMBED_REACT).unwrap_or_default();
    let react = apply_react_env(react);
    let helve: HelvePromptsFile = serde_yaml::from_str(EMBED_HELVE).unwrap_or_default();
    super::resolve::AgentPrompts { react, helve }
}

/// Loads prompts from `dir` if the directory exists; otherwise returns default from embedded YAML.
///
/// Default text comes from `loom/prompts/*.yaml` (embedded), not from Rust const.
pub fn load_or_default(dir: Option<&Path>) -> super::resolve::AgentPrompts {
    load(dir).unwrap_or_else(|_| default_from_embedded())
}
