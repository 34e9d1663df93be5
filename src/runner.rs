//! Two-pass batch orchestration.
//!
//! The fit pass streams planned batches through [`IncrementalPca::update`]
//! in plan order; the transform pass re-derives the identical plan and
//! projects each batch into its manifest rows. Peak memory stays at one
//! batch of samples, whatever the dataset size.

use log::{debug, info};
use ndarray::{s, Array2};

use crate::batch;
use crate::error::{Error, Result};
use crate::manifest::FileManifest;
use crate::model::IncrementalPca;
use crate::raster;

/// Configuration for a fit/transform pair.
#[derive(Debug, Clone)]
pub struct FitConfig {
    /// Number of principal directions to derive.
    pub n_components: usize,
    /// Target samples per batch; the planner may extend the final batch.
    pub batch_size: usize,
    /// Scale projected coordinates to unit variance.
    pub whiten: bool,
    /// Fit over a seeded permutation of the manifest instead of timestamp
    /// order. Projection output stays in manifest order either way.
    pub shuffle_seed: Option<u64>,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            n_components: 50,
            batch_size: 1024,
            whiten: true,
            shuffle_seed: None,
        }
    }
}

/// Fits an incremental model over the manifest, one planned batch at a
/// time.
///
/// Batches are strictly sequential; each one is loaded, folded into the
/// model and dropped before the next is touched. The first failing batch
/// aborts the pass with its manifest range attached. An empty manifest is
/// rejected before any raster is opened; it can never produce a fitted
/// model.
pub fn fit(manifest: &FileManifest, config: &FitConfig) -> Result<IncrementalPca> {
    let mut model = IncrementalPca::new(config.n_components, config.whiten)?;
    if manifest.is_empty() {
        return Err(Error::InvalidConfiguration(
            "cannot fit an empty manifest".into(),
        ));
    }
    let plan = batch::plan(manifest.len(), config.batch_size, config.n_components)?;

    let shuffled = config.shuffle_seed.map(|seed| {
        info!("fitting over a shuffled ordering with seed {seed}");
        manifest.shuffled(seed)
    });
    let ordering = shuffled.as_ref().unwrap_or(manifest);

    info!("fit pass: {} rasters in {} batches", manifest.len(), plan.len());
    for range in &plan {
        debug!("fitting batch [{}, {})", range.start, range.end);
        let entries = ordering.slice(range.clone());
        raster::read_many(entries.iter().map(|e| &e.path))
            .and_then(|samples| model.update(&samples))
            .map_err(|e| e.in_batch(range.start, range.end))?;
    }
    Ok(model)
}

/// Projects every manifest entry through a fitted model.
///
/// Re-derives the same plan the fit pass used and writes each batch's
/// coordinates into the rows of its manifest range, so row `i` of the
/// result always belongs to manifest entry `i`.
pub fn transform(
    manifest: &FileManifest,
    model: &IncrementalPca,
    batch_size: usize,
) -> Result<Array2<f64>> {
    let plan = batch::plan(manifest.len(), batch_size, model.n_components())?;
    let mut projection = Array2::zeros((manifest.len(), model.n_components()));

    info!("transform pass: {} rasters in {} batches", manifest.len(), plan.len());
    for range in &plan {
        debug!("projecting batch [{}, {})", range.start, range.end);
        let entries = manifest.slice(range.clone());
        let coords = raster::read_many(entries.iter().map(|e| &e.path))
            .and_then(|samples| model.project(&samples))
            .map_err(|e| e.in_batch(range.start, range.end))?;
        projection
            .slice_mut(s![range.start..range.end, ..])
            .assign(&coords);
    }
    Ok(projection)
}
