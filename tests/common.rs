use std::fs;
use std::path::Path;

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Writes one grid file in the little-endian container layout the raster
/// reader expects.
#[allow(unused)]
pub fn write_grid(path: &Path, rows: u32, cols: u32, values: &[f32]) {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&rows.to_le_bytes());
    bytes.extend_from_slice(&cols.to_le_bytes());
    for v in values {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    fs::write(path, bytes).unwrap();
}

/// Populates `root` with `count` timestamped grid files of shape
/// `rows x cols`, nesting every other file one directory deep, and returns
/// the samples as a matrix in timestamp order.
///
/// The first three features carry strong independent Gaussian signals with
/// well-separated scales; everything else is low-amplitude noise, so the
/// leading principal directions and their variance ratios are stable.
#[allow(unused)]
pub fn synthetic_archive(
    root: &Path,
    count: usize,
    rows: u32,
    cols: u32,
    seed: u64,
) -> Array2<f64> {
    let features = (rows * cols) as usize;
    let mut rng = StdRng::seed_from_u64(seed);
    let scales = [10.0, 5.0, 2.0];
    let unit = Normal::new(0.0, 1.0).unwrap();
    let noise = Normal::new(0.0, 0.1).unwrap();

    let mut data = Array2::zeros((count, features));
    for i in 0..count {
        let mut values = vec![0.0f32; features];
        for (j, value) in values.iter_mut().enumerate() {
            let mut v: f64 = noise.sample(&mut rng);
            if j < scales.len() {
                v += scales[j] * unit.sample(&mut rng);
            }
            *value = v as f32;
            data[[i, j]] = *value as f64;
        }

        let name = format!("{}_field.bin", 1_000_000_000u64 + i as u64);
        let path = if i % 2 == 0 {
            root.join(&name)
        } else {
            root.join("nested").join(&name)
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        write_grid(&path, rows, cols, &values);
    }
    data
}
