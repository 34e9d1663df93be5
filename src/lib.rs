//! Principal component decomposition for archives of gridded raster
//! fields.
//!
//! An archive is a directory tree of per-timestamp grid files. The crate
//! scans it into an ordered [`FileManifest`], then derives principal
//! components either exactly (whole dataset in memory, [`exact`]) or
//! incrementally: the [`batch`] planner partitions the manifest into
//! viable index ranges and the [`runner`] streams them through an
//! [`IncrementalPca`] twice, an update-only fit pass followed by a
//! projection-only transform pass, keeping peak memory at one batch
//! rather than the whole archive.
//!
//! ```no_run
//! use gridpca::runner::{self, FitConfig};
//!
//! # fn main() -> gridpca::Result<()> {
//! let manifest = gridpca::manifest::scan("data", ".bin")?;
//! let config = FitConfig { n_components: 20, batch_size: 256, ..FitConfig::default() };
//! let model = runner::fit(&manifest, &config)?;
//! let projection = runner::transform(&manifest, &model, config.batch_size)?;
//! assert_eq!(projection.nrows(), manifest.len());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod error;
pub mod exact;
pub mod manifest;
pub mod model;
pub mod output;
pub mod raster;
pub mod runner;

pub use error::{Error, Result};
pub use manifest::FileManifest;
pub use model::IncrementalPca;
