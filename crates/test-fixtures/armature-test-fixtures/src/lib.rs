//! Shared JSON fixtures for the armature crates' tests and benches.
//!
//! `fixtures/manifest.json` at the workspace root maps fixture names to files
//! relative to the `fixtures/` directory.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<std::result::Result<Manifest, String>> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).map_err(|err| err.to_string())
});

#[derive(Debug, Deserialize)]
struct Manifest {
    animations: HashMap<String, String>,
    armatures: HashMap<String, String>,
}

/// Bone layout of a fixture armature, in attachment order.
#[derive(Clone, Debug, Deserialize)]
pub struct ArmatureLayout {
    pub name: String,
    pub bones: Vec<String>,
}

fn manifest() -> Result<&'static Manifest> {
    MANIFEST
        .as_ref()
        .map_err(|err| anyhow!("fixtures manifest failed to parse: {err}"))
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn load_json<T: DeserializeOwned>(rel: &str) -> Result<T> {
    let text = read_to_string(rel)?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse JSON fixture {rel}"))
}

fn lookup<'a>(map: &'a HashMap<String, String>, kind: &str, name: &str) -> Result<&'a str> {
    map.get(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

pub mod animations {
    use super::*;

    pub fn keys() -> Result<Vec<String>> {
        Ok(manifest()?.animations.keys().cloned().collect())
    }

    pub fn json(name: &str) -> Result<String> {
        let rel = lookup(&manifest()?.animations, "animation", name)?;
        read_to_string(rel)
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let rel = lookup(&manifest()?.animations, "animation", name)?;
        super::load_json(rel)
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        let rel = lookup(&manifest()?.animations, "animation", name)?;
        Ok(resolve_path(rel))
    }
}

pub mod armatures {
    use super::*;

    pub fn keys() -> Result<Vec<String>> {
        Ok(manifest()?.armatures.keys().cloned().collect())
    }

    pub fn layout(name: &str) -> Result<ArmatureLayout> {
        let rel = lookup(&manifest()?.armatures, "armature", name)?;
        super::load_json(rel)
    }
}
