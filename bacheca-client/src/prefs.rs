use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::PrefsError;

/// Chiave con cui viene salvato il nome di chi scrive.
pub const NAME_KEY: &str = "messageBoardUserName";

/// Piccolo archivio chiave/valore su file TOML, l'equivalente locale di un localStorage.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    /// `<local data dir>/bacheca/storage.toml`
    pub fn open_default() -> Result<Self, PrefsError> {
        let mut path = dirs::data_local_dir().ok_or(PrefsError::NoDataDir)?;
        path.push("bacheca");
        path.push("storage.toml");
        Ok(Self { path })
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, PrefsError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Un file illeggibile viene trattato come vuoto.
    pub fn get_item(&self, key: &str) -> Option<String> {
        match self.read_all() {
            Ok(mut items) => items.remove(key),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "cannot read local storage: {}", e);
                None
            }
        }
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<(), PrefsError> {
        let mut items = self.read_all().unwrap_or_default();
        items.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, toml::to_string(&items)?)?;
        Ok(())
    }
}
