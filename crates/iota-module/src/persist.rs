//! On-disk form of a module: `<base>/<name>/defs.iota` with the printed
//! definitions and `<base>/<name>/meta.json` with the import list.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use iota_core::{Error, Result};

use crate::module::{Module, ModuleImport};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaObject {
    pub imports: Vec<ModuleImport>,
}

impl Module {
    fn module_dir(&self) -> Result<PathBuf> {
        let Some(base) = &self.fs_base_path else {
            iota_core::bail!("module '{}' has no filesystem path", self.name);
        };
        Ok(base.join(&self.name))
    }

    pub fn defs_path(&self) -> Result<PathBuf> {
        Ok(self.module_dir()?.join("defs.iota"))
    }

    pub fn meta_path(&self) -> Result<PathBuf> {
        Ok(self.module_dir()?.join("meta.json"))
    }

    pub fn save_to_filesystem(&self) -> Result<()> {
        let dir = self.module_dir()?;
        std::fs::create_dir_all(&dir)?;
        std::fs::write(self.defs_path()?, self.print_defs(false))?;
        let meta = MetaObject {
            imports: self.imports().to_vec(),
        };
        let meta_text = serde_json::to_string_pretty(&meta)
            .map_err(|error| Error::Generic(error.to_string()))?;
        std::fs::write(self.meta_path()?, meta_text)?;
        Ok(())
    }

    /// Loads a previously saved module: restores imports from `meta.json`
    /// and re-adds the definitions from `defs.iota`.
    pub fn read_from_filesystem(&mut self) -> Result<()> {
        let meta_text = std::fs::read_to_string(self.meta_path()?)?;
        let meta: MetaObject = serde_json::from_str(&meta_text)
            .map_err(|error| Error::Generic(error.to_string()))?;
        self.imports = meta.imports;
        let defs_path = self.defs_path()?;
        let defs_text = std::fs::read_to_string(&defs_path)?;
        self.add_text(&defs_path.to_string_lossy(), &defs_text);
        Ok(())
    }
}
