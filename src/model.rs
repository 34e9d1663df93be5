//! Incremental principal component model.
//!
//! The model folds batches into running estimates of the dataset mean,
//! per-feature variance and the top principal directions. Each update
//! stacks the scaled previous directions, the centered batch and a mean
//! correction row into one augmented matrix, factorizes it, and keeps the
//! leading right singular vectors. Fed the whole dataset as a single
//! batch, the same update degenerates to ordinary one-shot PCA.

use nalgebra::DMatrix;
use ndarray::{concatenate, s, Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Floor applied to variance estimates before the whitening division, so
/// components with vanishing variance cannot blow up a projection.
const WHITEN_FLOOR: f64 = 1e-12;

/// Incremental principal component model over flattened raster samples.
///
/// Constructed with a fixed component count, mutated only through
/// [`update`](Self::update) and read through [`project`](Self::project)
/// and the accessors. The feature dimensionality is established by the
/// first update and enforced on every later one. Serializes as a
/// self-contained snapshot that projects identically after a round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncrementalPca {
    n_components: usize,
    whiten: bool,
    n_samples_seen: usize,
    n_features: Option<usize>,
    mean: Array1<f64>,
    variance: Array1<f64>,
    components: Array2<f64>,
    singular_values: Array1<f64>,
    explained_variance: Array1<f64>,
    explained_variance_ratio: Array1<f64>,
}

impl IncrementalPca {
    /// Builds an unfitted model deriving `n_components` directions.
    pub fn new(n_components: usize, whiten: bool) -> Result<Self> {
        if n_components == 0 {
            return Err(Error::InvalidConfiguration(
                "component count must be at least 1".into(),
            ));
        }
        Ok(Self {
            n_components,
            whiten,
            n_samples_seen: 0,
            n_features: None,
            mean: Array1::zeros(0),
            variance: Array1::zeros(0),
            components: Array2::zeros((0, 0)),
            singular_values: Array1::zeros(0),
            explained_variance: Array1::zeros(0),
            explained_variance_ratio: Array1::zeros(0),
        })
    }

    pub fn n_components(&self) -> usize {
        self.n_components
    }

    pub fn whiten(&self) -> bool {
        self.whiten
    }

    /// Samples folded in so far.
    pub fn n_samples_seen(&self) -> usize {
        self.n_samples_seen
    }

    /// Feature dimensionality, once a first batch has established it.
    pub fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    /// Running estimate of the dataset mean.
    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// Principal directions, one per row, strongest first.
    pub fn components(&self) -> &Array2<f64> {
        &self.components
    }

    pub fn singular_values(&self) -> &Array1<f64> {
        &self.singular_values
    }

    /// Sample variance captured by each retained direction.
    pub fn explained_variance(&self) -> &Array1<f64> {
        &self.explained_variance
    }

    /// Fraction of the total dataset variance captured by each retained
    /// direction.
    pub fn explained_variance_ratio(&self) -> &Array1<f64> {
        &self.explained_variance_ratio
    }

    /// Folds one batch of samples into the decomposition.
    ///
    /// The batch must be at least `n_components` rows tall, and after the
    /// first update its width must match the established dimensionality.
    /// All preconditions are checked before any state changes, so a failed
    /// update leaves the model exactly as it was.
    pub fn update(&mut self, batch: &Array2<f64>) -> Result<()> {
        let (rows, cols) = batch.dim();
        match self.n_features {
            Some(expected) if expected != cols => {
                return Err(Error::ShapeMismatch { expected, got: cols });
            }
            None if cols < self.n_components => {
                return Err(Error::InvalidConfiguration(format!(
                    "{} components requested from samples with only {cols} features",
                    self.n_components
                )));
            }
            _ => {}
        }
        if rows < self.n_components {
            return Err(Error::InsufficientBatchSize {
                rows,
                required: self.n_components,
            });
        }

        let n_total = self.n_samples_seen + rows;
        let (centered, batch_mean, col_mean, col_var) = self.incremental_mean_var(batch);

        // First batch factorizes plainly; later batches carry the history
        // forward through the scaled components and the mean correction.
        let augmented = if self.n_samples_seen == 0 {
            centered
        } else {
            let ratio = self.n_samples_seen as f64 / n_total as f64 * rows as f64;
            let mean_correction = ((&self.mean - &batch_mean) * ratio.sqrt()).insert_axis(Axis(0));
            let scaled = &self.components * &self.singular_values.view().insert_axis(Axis(1));
            concatenate(Axis(0), &[scaled.view(), centered.view(), mean_correction.view()])
                .map_err(|e| Error::Internal(format!("augmented batch assembly failed: {e}")))?
        };

        let (singular, vt) = thin_svd(&augmented)?;
        let vt = svd_flip(vt);

        let n_total_f = n_total as f64;
        let explained = singular.mapv(|s| s.powi(2) / (n_total_f - 1.0));
        let variance_ratio = singular.mapv(|s| s.powi(2)) / (col_var.sum() * n_total_f);

        let k = self.n_components;
        self.n_samples_seen = n_total;
        self.n_features = Some(cols);
        self.mean = col_mean;
        self.variance = col_var;
        self.components = vt.slice(s![..k, ..]).to_owned();
        self.singular_values = singular.slice(s![..k]).to_owned();
        self.explained_variance = explained.slice(s![..k]).to_owned();
        self.explained_variance_ratio = variance_ratio.slice(s![..k]).to_owned();
        Ok(())
    }

    /// Projects a batch onto the fitted directions, centering by the
    /// running mean and, when whitening is on, scaling each coordinate to
    /// unit variance by its floored variance estimate.
    pub fn project(&self, batch: &Array2<f64>) -> Result<Array2<f64>> {
        let Some(expected) = self.n_features else {
            return Err(Error::NotFitted);
        };
        let got = batch.ncols();
        if got != expected {
            return Err(Error::ShapeMismatch { expected, got });
        }

        let centered = batch - &self.mean;
        let projected = centered.dot(&self.components.t());
        let projected = if self.whiten {
            let scale = self.explained_variance.mapv(|v| v.max(WHITEN_FLOOR).sqrt());
            projected / &scale
        } else {
            projected
        };
        Ok(projected)
    }

    /// Running mean and variance folded with one batch, plus the centered
    /// batch and its mean. The variance merge carries the correction term
    /// for the drift between the historical and the batch mean.
    fn incremental_mean_var(
        &self,
        batch: &Array2<f64>,
    ) -> (Array2<f64>, Array1<f64>, Array1<f64>, Array1<f64>) {
        let n_seen = self.n_samples_seen as f64;
        let n_batch = batch.nrows() as f64;
        let n_total = n_seen + n_batch;

        let new_sum = batch.sum_axis(Axis(0));
        let (last_sum, last_unnormalized_variance) = if self.n_samples_seen == 0 {
            (Array1::zeros(batch.ncols()), Array1::zeros(batch.ncols()))
        } else {
            (&self.mean * n_seen, &self.variance * n_seen)
        };
        let updated_mean = (&last_sum + &new_sum) / n_total;

        let batch_mean = &new_sum / n_batch;
        let centered = batch - &batch_mean;
        let correction = centered.sum_axis(Axis(0));
        let new_unnormalized_variance =
            centered.mapv(|v| v.powi(2)).sum_axis(Axis(0)) - correction.mapv(|c| c.powi(2)) / n_batch;

        let updated_unnormalized_variance = if self.n_samples_seen == 0 {
            new_unnormalized_variance
        } else {
            let last_over_new = n_seen / n_batch;
            last_unnormalized_variance
                + new_unnormalized_variance
                + (&last_sum / last_over_new - &new_sum).mapv(|d| d.powi(2))
                    * (last_over_new / n_total)
        };
        let updated_variance = updated_unnormalized_variance / n_total;
        (centered, batch_mean, updated_mean, updated_variance)
    }
}

/// Thin singular value decomposition: singular values in descending order
/// and the matching right singular vectors, one per row.
///
/// The factorization backend is confined to this seam; the update
/// arithmetic above never touches it directly.
fn thin_svd(a: &Array2<f64>) -> Result<(Array1<f64>, Array2<f64>)> {
    let (rows, cols) = a.dim();
    let m = DMatrix::from_row_iterator(rows, cols, a.iter().copied());
    let svd = m.svd(false, true);
    let v_t = svd
        .v_t
        .ok_or_else(|| Error::Internal("factorization returned no right singular vectors".into()))?;
    let singular = Array1::from_iter(svd.singular_values.iter().copied());
    let vt = Array2::from_shape_fn((v_t.nrows(), cols), |(i, j)| v_t[(i, j)]);
    Ok((singular, vt))
}

/// Deterministic sign convention: every row is scaled so its
/// largest-magnitude entry is positive, which pins down the inherent sign
/// ambiguity of singular vectors.
fn svd_flip(v: Array2<f64>) -> Array2<f64> {
    let signs = v.map_axis(Axis(1), largest_magnitude_sign);
    v * signs.insert_axis(Axis(1))
}

/// Sign of the first largest-magnitude element; zero rows stay zero.
fn largest_magnitude_sign(row: ArrayView1<'_, f64>) -> f64 {
    let mut extreme = 0.0f64;
    for &value in row {
        if value.abs() > extreme.abs() {
            extreme = value;
        }
    }
    if extreme > 0.0 {
        1.0
    } else if extreme < 0.0 {
        -1.0
    } else {
        0.0
    }
}
