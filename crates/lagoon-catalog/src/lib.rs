//! JSON-file backed CRUD store for the introductory catalog service.
//!
//! The catalog is the simplest service in the series: a list of named
//! things persisted as one JSON array, rewritten on every mutation.

use log::{info, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Errors returned by catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Reading or writing the catalog file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Encoding or decoding the catalog file failed.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// One catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Thing {
    /// Unique identifier, minted on creation.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// CRUD store over a single JSON file.
pub struct Catalog {
    /// Location of the catalog file.
    path: PathBuf,
    /// In-memory view of the persisted list.
    things: RwLock<Vec<Thing>>,
}

impl Catalog {
    /// Open the catalog, seeding an empty file when missing or corrupt.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref().to_path_buf();
        let things = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(things) => things,
                Err(err) => {
                    warn!(
                        "catalog file corrupt, reseeding (path={}, error={})",
                        path.display(),
                        err
                    );
                    seed_empty(&path)?
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => seed_empty(&path)?,
            Err(err) => return Err(err.into()),
        };
        info!(
            "opened catalog (path={}, things={})",
            path.display(),
            things.len()
        );
        Ok(Self {
            path,
            things: RwLock::new(things),
        })
    }

    /// All things, in insertion order.
    pub fn list(&self) -> Vec<Thing> {
        self.things.read().clone()
    }

    /// A single thing by id.
    pub fn get(&self, id: &str) -> Option<Thing> {
        self.things.read().iter().find(|t| t.id == id).cloned()
    }

    /// Create a thing with a minted id and persist the list.
    pub fn create(&self, name: impl Into<String>) -> Result<Thing, CatalogError> {
        let thing = Thing {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
        };
        let mut things = self.things.write();
        things.push(thing.clone());
        self.save(&things)?;
        Ok(thing)
    }

    /// Rename an existing thing; `None` when the id is unknown.
    pub fn update(&self, id: &str, name: impl Into<String>) -> Result<Option<Thing>, CatalogError> {
        let mut things = self.things.write();
        let Some(thing) = things.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        thing.name = name.into();
        let updated = thing.clone();
        self.save(&things)?;
        Ok(Some(updated))
    }

    /// Delete a thing by id; `false` when the id is unknown.
    pub fn remove(&self, id: &str) -> Result<bool, CatalogError> {
        let mut things = self.things.write();
        let before = things.len();
        things.retain(|t| t.id != id);
        if things.len() == before {
            return Ok(false);
        }
        self.save(&things)?;
        Ok(true)
    }

    /// Rewrite the catalog file from the current list.
    fn save(&self, things: &[Thing]) -> Result<(), CatalogError> {
        let bytes = serde_json::to_vec_pretty(things)?;
        fs::write(&self.path, bytes)?;
        Ok(())
    }
}

/// Write an empty catalog file and return the empty list.
fn seed_empty(path: &Path) -> Result<Vec<Thing>, CatalogError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, b"[]")?;
    Ok(Vec::new())
}
