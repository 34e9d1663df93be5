//! Exact whole-dataset decomposition.

use log::debug;
use ndarray::Array2;

use crate::error::{Error, Result};
use crate::manifest::FileManifest;
use crate::model::IncrementalPca;
use crate::raster;

/// Loads every raster in the manifest at once, fits the decomposition in a
/// single step and projects the same samples.
///
/// A whole-dataset update of a fresh model has no history to augment with,
/// so it centers by the dataset mean and factorizes plainly; the result is
/// ordinary one-shot PCA. Memory grows with the dataset, which makes this
/// the reference path and the batch runner the bounded one. An empty
/// manifest is rejected the way any undersized batch is.
pub fn fit_transform(
    manifest: &FileManifest,
    n_components: usize,
    whiten: bool,
) -> Result<(IncrementalPca, Array2<f64>)> {
    let mut model = IncrementalPca::new(n_components, whiten)?;
    if manifest.is_empty() {
        return Err(Error::InsufficientBatchSize {
            rows: 0,
            required: n_components,
        });
    }
    debug!("loading all {} rasters for the exact decomposition", manifest.len());
    let samples = raster::read_many(manifest.iter().map(|e| &e.path))?;
    model.update(&samples)?;
    let projection = model.project(&samples)?;
    Ok((model, projection))
}
