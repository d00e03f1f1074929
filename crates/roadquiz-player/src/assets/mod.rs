//! Asset registry: resolves model ids to renderable instances.
//!
//! Models are opaque to the player: all it needs from a loaded model is a
//! handle plus the names of the sub-nodes it exposes (wheel nodes). Mesh
//! decoding belongs to the renderer, so the registry only checks that the
//! backing file is there and hands out a `Renderable`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Asset '{id}' not found at {path}")]
    NotFound { id: String, path: PathBuf },

    #[error("Asset '{0}' is unavailable")]
    Unavailable(String),
}

/// A model entry from the scene script
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssetSpec {
    pub id: String,
    /// File name relative to the asset root
    pub file: String,
    #[serde(default = "unit_scale")]
    pub scale: f32,
    /// Named sub-nodes (e.g. wheels) the model exposes
    #[serde(default)]
    pub nodes: Vec<String>,
}

fn unit_scale() -> f32 {
    1.0
}

/// Index of a named sub-node inside a `Renderable`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(pub usize);

/// A loaded model instance
#[derive(Debug, Clone, PartialEq)]
pub struct Renderable {
    pub asset: String,
    pub nodes: Vec<String>,
    pub scale: f32,
}

impl Renderable {
    /// Look up a sub-node by name
    pub fn node(&self, name: &str) -> Option<NodeRef> {
        self.nodes.iter().position(|n| n == name).map(NodeRef)
    }
}

/// Resolves asset specs to renderables
pub trait AssetRegistry {
    fn load(&mut self, spec: &AssetSpec) -> Result<Renderable, AssetError>;
}

fn renderable(spec: &AssetSpec) -> Renderable {
    Renderable {
        asset: spec.id.clone(),
        nodes: spec.nodes.clone(),
        scale: spec.scale,
    }
}

/// Loads models from a directory on disk
pub struct DirectoryAssets {
    root: PathBuf,
}

impl DirectoryAssets {
    pub fn new(root: &Path) -> Self {
        Self { root: root.to_path_buf() }
    }
}

impl AssetRegistry for DirectoryAssets {
    fn load(&mut self, spec: &AssetSpec) -> Result<Renderable, AssetError> {
        let path = self.root.join(&spec.file);
        if !path.is_file() {
            return Err(AssetError::NotFound { id: spec.id.clone(), path });
        }
        tracing::debug!("Loaded '{}' from {}", spec.id, path.display());
        Ok(renderable(spec))
    }
}

/// Resolves every asset without touching the filesystem, except the ids
/// explicitly marked unavailable.
#[derive(Debug, Default)]
pub struct StaticAssets {
    unavailable: HashSet<String>,
}

impl StaticAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make loads of `id` fail
    #[cfg(test)]
    pub fn without(mut self, id: &str) -> Self {
        self.unavailable.insert(id.to_string());
        self
    }
}

impl AssetRegistry for StaticAssets {
    fn load(&mut self, spec: &AssetSpec) -> Result<Renderable, AssetError> {
        if self.unavailable.contains(&spec.id) {
            return Err(AssetError::Unavailable(spec.id.clone()));
        }
        Ok(renderable(spec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(id: &str) -> AssetSpec {
        AssetSpec {
            id: id.to_string(),
            file: format!("{}.glb", id),
            scale: 0.5,
            nodes: vec!["wheel_fl".into(), "wheel_fr".into(), "wheel_b".into()],
        }
    }

    #[test]
    fn node_lookup_by_name() {
        let r = StaticAssets::new().load(&spec("suv")).unwrap();
        assert_eq!(r.node("wheel_fr"), Some(NodeRef(1)));
        assert_eq!(r.node("spoiler"), None);
        assert_eq!(r.scale, 0.5);
    }

    #[test]
    fn unavailable_asset_fails() {
        let mut assets = StaticAssets::new().without("red");
        assert!(matches!(assets.load(&spec("red")), Err(AssetError::Unavailable(_))));
        assert!(assets.load(&spec("suv")).is_ok());
    }

    #[test]
    fn missing_file_is_not_found() {
        let mut assets = DirectoryAssets::new(Path::new("/nonexistent-roadquiz-assets"));
        assert!(matches!(assets.load(&spec("suv")), Err(AssetError::NotFound { .. })));
    }
}
