//! Durable destinations for export artifacts

use log::{debug, info, warn};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::geotiff::write_geotiff;
use crate::composite::Raster;
use crate::errors::{PipelineError, PipelineResult};

/// Where finished exports are stored
pub trait ExportSink: Send + Sync {
    /// Stores a raster as `<description>.tif`; returns the location and
    /// whether BigTIFF was used
    fn write_raster(&self, description: &str, raster: &Raster, compression: &str) -> PipelineResult<(PathBuf, bool)>;

    /// Stores a text artifact under `name`
    fn write_text(&self, name: &str, content: &str) -> PipelineResult<PathBuf>;

    /// Human-readable destination for logs
    fn location(&self) -> String;
}

/// Exports into a local directory
///
/// Files are written under a temporary name and renamed when complete, so
/// a reader never sees a partial artifact.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: &Path) -> PipelineResult<Self> {
        fs::create_dir_all(dir)?;
        info!("Exports go to {}", dir.display());
        Ok(DirectorySink { dir: dir.to_path_buf() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn target(&self, name: &str) -> PipelineResult<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(PipelineError::Export(format!("Invalid artifact name '{}'", name)));
        }
        Ok(self.dir.join(name))
    }

    /// Runs `write` against the partial path and renames it onto `target`
    ///
    /// On any failure the partial file is removed.
    fn write_committed<T>(target: &Path, write: impl FnOnce(&Path) -> PipelineResult<T>) -> PipelineResult<T> {
        let partial = partial_path(target);
        let result = write(&partial).and_then(|value| {
            fs::rename(&partial, target)?;
            Ok(value)
        });

        match result {
            Ok(value) => {
                debug!("Committed {}", target.display());
                Ok(value)
            }
            Err(e) => {
                if partial.exists() {
                    if let Err(remove_err) = fs::remove_file(&partial) {
                        warn!("Could not remove {}: {}", partial.display(), remove_err);
                    }
                }
                Err(e)
            }
        }
    }
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

impl ExportSink for DirectorySink {
    fn write_raster(&self, description: &str, raster: &Raster, compression: &str) -> PipelineResult<(PathBuf, bool)> {
        let target = self.target(&format!("{}.tif", description))?;
        let is_big_tiff = Self::write_committed(&target, |partial| {
            let mut writer = BufWriter::new(File::create(partial)?);
            let is_big_tiff = write_geotiff(raster, compression, &mut writer)?;
            writer.flush()?;
            Ok(is_big_tiff)
        })?;
        Ok((target, is_big_tiff))
    }

    fn write_text(&self, name: &str, content: &str) -> PipelineResult<PathBuf> {
        let target = self.target(name)?;
        Self::write_committed(&target, |partial| Ok(fs::write(partial, content)?))?;
        Ok(target)
    }

    fn location(&self) -> String {
        self.dir.display().to_string()
    }
}
