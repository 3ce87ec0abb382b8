//! Fixture documents - pristine inputs, per-scenario working copies
//!
//! Fixtures are opaque pre-built documents with known initial content. The
//! pristine files are never opened by the editor directly: each scenario
//! checks out a fresh temporary working copy, so "reset between scenarios"
//! is a fresh copy rather than an in-place rewrite, and no scenario can
//! observe another's edits. Pristine digests are recorded at store
//! construction so corruption of the source tree is detectable.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{HarnessError, HarnessResult};

pub struct FixtureStore {
    root: PathBuf,
    digests: HashMap<String, String>,
}

impl FixtureStore {
    /// Open a fixture directory, discovering every regular file in it.
    pub fn open(root: impl Into<PathBuf>) -> HarnessResult<Self> {
        let root = root.into();
        let mut digests = HashMap::new();

        for entry in walkdir::WalkDir::new(&root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let name = entry.file_name().to_string_lossy().to_string();
            let digest = file_digest(entry.path())?;
            debug!("fixture {} ({})", name, &digest[..12]);
            digests.insert(name, digest);
        }

        Ok(Self { root, digests })
    }

    pub fn names(&self) -> Vec<&str> {
        self.digests.keys().map(String::as_str).collect()
    }

    /// Copy the named fixture into a fresh temporary directory.
    pub fn checkout(&self, name: &str) -> HarnessResult<FixtureCheckout> {
        if !self.digests.contains_key(name) {
            return Err(HarnessError::FixtureLoad {
                name: name.to_string(),
                reason: format!("not present in {}", self.root.display()),
            });
        }

        let dir = tempfile::Builder::new()
            .prefix("sheetcheck-fixture-")
            .tempdir()?;
        let source = self.root.join(name);
        let path = dir.path().join(name);
        std::fs::copy(&source, &path).map_err(|e| HarnessError::FixtureLoad {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

        Ok(FixtureCheckout {
            name: name.to_string(),
            path,
            _dir: dir,
        })
    }

    /// Assert the pristine source still matches its recorded digest.
    pub fn verify_pristine(&self, name: &str) -> HarnessResult<()> {
        let recorded = self.digests.get(name).ok_or_else(|| HarnessError::FixtureLoad {
            name: name.to_string(),
            reason: "unknown fixture".into(),
        })?;
        let current = file_digest(&self.root.join(name))?;
        if &current != recorded {
            return Err(HarnessError::FixtureLoad {
                name: name.to_string(),
                reason: format!("pristine file changed (was {recorded}, now {current})"),
            });
        }
        Ok(())
    }
}

/// A scenario-scoped working copy. The temporary directory (and the copy in
/// it) is discarded when the checkout drops, on every exit path.
#[derive(Debug)]
pub struct FixtureCheckout {
    name: String,
    path: PathBuf,
    _dir: tempfile::TempDir,
}

impl FixtureCheckout {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn file_digest(path: &Path) -> HarnessResult<String> {
    let bytes = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}
