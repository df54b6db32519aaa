//! Artifact layout and writing
//!
//! Each hook owns up to two files under the artifact root:
//!
//! ```text
//! <root>/hooks__<name>.nu    primary artifact, autoloaded by the shell
//! <root>/hooks/<name>.nu     module file, for module-based strategies
//! ```
//!
//! The module lives in a subdirectory so the shell's autoloader does not
//! source it a second time.

use super::render;
use super::spec::LoadStrategy;
use crate::system;
use hooksmith_core::{Error, HookName, Result};
use std::path::{Path, PathBuf};

/// Prefix of primary artifact file names
pub const PRIMARY_PREFIX: &str = "hooks__";

/// Subdirectory holding module files
pub const MODULE_DIR: &str = "hooks";

/// Artifact file extension
pub const EXTENSION: &str = "nu";

/// Paths written for one hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArtifact {
    /// Primary artifact
    pub primary: PathBuf,
    /// Module file, for module-based strategies
    pub module: Option<PathBuf>,
}

/// Maps hook names to artifact paths under a root directory
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    /// Layout rooted at the shell's autoload directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Artifact root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the primary artifact
    #[must_use]
    pub fn primary_path(&self, name: &HookName) -> PathBuf {
        self.root
            .join(format!("{PRIMARY_PREFIX}{name}.{EXTENSION}"))
    }

    /// Path of the module file
    #[must_use]
    pub fn module_path(&self, name: &HookName) -> PathBuf {
        self.root
            .join(MODULE_DIR)
            .join(format!("{name}.{EXTENSION}"))
    }

    /// Whether the primary artifact exists
    #[must_use]
    pub fn exists(&self, name: &HookName) -> bool {
        self.primary_path(name).is_file()
    }

    /// Write a hook's artifacts for the given strategy
    ///
    /// Inline hooks get the text as their primary artifact and any leftover
    /// module file is deleted. Module-based hooks get the text in the module
    /// file and a load directive as their primary artifact. The module is
    /// written before the directive that loads it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Artifact`] if a file cannot be written or removed
    pub fn write(
        &self,
        name: &HookName,
        text: &str,
        strategy: LoadStrategy,
    ) -> Result<WrittenArtifact> {
        let primary = self.primary_path(name);
        let module_path = self.module_path(name);

        let module = match render::directive(name.as_str(), strategy, &module_path) {
            Some(directive) => {
                write_file(&module_path, text)?;
                write_file(&primary, &directive)?;
                Some(module_path)
            }
            None => {
                write_file(&primary, text)?;
                if remove_file(&module_path)? {
                    tracing::debug!(hook = %name, "Removed orphaned module file");
                }
                None
            }
        };

        tracing::debug!(hook = %name, path = %primary.display(), strategy = strategy.name(), "Wrote artifact");
        Ok(WrittenArtifact { primary, module })
    }

    /// Remove every artifact of a hook
    ///
    /// Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Artifact`] if an existing file cannot be removed
    pub fn remove(&self, name: &HookName) -> Result<bool> {
        let primary = remove_file(&self.primary_path(name))?;
        let module = remove_file(&self.module_path(name))?;
        Ok(primary || module)
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    system::write_atomic(path, content.as_bytes()).map_err(|source| Error::Artifact {
        path: path.to_path_buf(),
        source,
    })
}

fn remove_file(path: &Path) -> Result<bool> {
    system::remove_if_exists(path).map_err(|source| Error::Artifact {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn name(s: &str) -> HookName {
        HookName::new(s).unwrap()
    }

    #[test]
    fn test_paths() {
        let layout = ArtifactLayout::new("/autoload");
        assert_eq!(
            layout.primary_path(&name("zoxide")),
            PathBuf::from("/autoload/hooks__zoxide.nu")
        );
        assert_eq!(
            layout.module_path(&name("zoxide")),
            PathBuf::from("/autoload/hooks/zoxide.nu")
        );
    }

    #[test]
    fn test_inline_write() {
        let temp = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(temp.path());
        let hook = name("greeter");

        let written = layout
            .write(&hook, "alias hi = echo hello", LoadStrategy::Inline)
            .unwrap();

        assert!(written.module.is_none());
        assert_eq!(
            fs::read_to_string(&written.primary).unwrap(),
            "alias hi = echo hello"
        );
        assert!(layout.exists(&hook));
    }

    #[test]
    fn test_module_write() {
        let temp = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(temp.path());
        let hook = name("zoxide");

        let written = layout
            .write(&hook, "export def z [] {}", LoadStrategy::Module)
            .unwrap();

        let module = written.module.unwrap();
        assert_eq!(fs::read_to_string(&module).unwrap(), "export def z [] {}");
        let primary = fs::read_to_string(&written.primary).unwrap();
        assert!(primary.starts_with("use "));
        assert!(primary.contains(&module.display().to_string()));
    }

    #[test]
    fn test_switch_to_inline_removes_module() {
        let temp = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(temp.path());
        let hook = name("zoxide");

        layout.write(&hook, "export def z [] {}", LoadStrategy::Overlay).unwrap();
        assert!(layout.module_path(&hook).exists());

        layout.write(&hook, "def z [] {}", LoadStrategy::Inline).unwrap();
        assert!(!layout.module_path(&hook).exists());
        assert_eq!(
            fs::read_to_string(layout.primary_path(&hook)).unwrap(),
            "def z [] {}"
        );
    }

    #[test]
    fn test_remove() {
        let temp = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(temp.path());
        let hook = name("zoxide");

        layout.write(&hook, "export def z [] {}", LoadStrategy::Lazy).unwrap();
        assert!(layout.remove(&hook).unwrap());
        assert!(!layout.primary_path(&hook).exists());
        assert!(!layout.module_path(&hook).exists());
        assert!(!layout.remove(&hook).unwrap());
    }
}
