//! Build Profile Preparation
//!
//! Hands the optimizer either the original build profile or a filtered copy
//! under `<build dir>/requirejs-config/filtered-build.js`.

use crate::filter::{FilterError, TokenFilter};
use crate::optimizer::OptimizeError;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory under the build directory holding the filtered profile
pub const FILTERED_CONFIG_DIR: &str = "requirejs-config";

/// File name of the filtered profile
pub const FILTERED_CONFIG_NAME: &str = "filtered-build.js";

/// Produces the build profile path given to the optimizer
#[derive(Debug, Clone)]
pub struct ConfigPreparer {
    build_dir: PathBuf,
}

impl ConfigPreparer {
    pub fn new(build_dir: impl Into<PathBuf>) -> Self {
        Self {
            build_dir: build_dir.into(),
        }
    }

    /// Where a filtered profile is written
    pub fn filtered_path(&self) -> PathBuf {
        self.build_dir
            .join(FILTERED_CONFIG_DIR)
            .join(FILTERED_CONFIG_NAME)
    }

    /// Return `source` untouched, or write a filtered copy and return its path.
    ///
    /// The filtered copy is overwritten on every call.
    pub fn prepare(
        &self,
        source: &Path,
        filtering: bool,
        filter: &dyn TokenFilter,
    ) -> Result<PathBuf, OptimizeError> {
        if !filtering {
            return Ok(source.to_path_buf());
        }

        let dir = self.build_dir.join(FILTERED_CONFIG_DIR);
        fs::create_dir_all(&dir).map_err(|source| OptimizeError::ConfigPreparation {
            source: FilterError::Write {
                path: dir.clone(),
                source,
            },
        })?;

        let target = dir.join(FILTERED_CONFIG_NAME);
        filter
            .copy_filtered(source, &target)
            .map_err(|source| OptimizeError::ConfigPreparation { source })?;

        log::debug!(
            "Filtered {} into {}",
            source.display(),
            target.display()
        );
        Ok(target)
    }
}
