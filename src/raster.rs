//! Grid file decoding and batch assembly.
//!
//! A grid file is a little-endian container: two `u32` dimensions (rows,
//! then columns) followed by `rows * cols` IEEE 754 `f32` values in
//! row-major order. Values are widened to `f64` on read; all computation
//! downstream runs in `f64`.

use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use memmap2::MmapOptions;
use ndarray::Array2;

use crate::error::{Error, Result};

/// Bytes taken by the two dimension words.
const HEADER_LEN: usize = 8;

/// One decoded raster grid.
pub type Grid = Array2<f64>;

fn decode_err(path: &Path, reason: impl Into<String>) -> Error {
    Error::Decode {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Reads and decodes a single grid file.
pub fn read_grid<P: AsRef<Path>>(path: P) -> Result<Grid> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::NotFound {
            path: path.to_path_buf(),
        },
        _ => Error::Io(e),
    })?;

    let len = file.metadata()?.len() as usize;
    if len < HEADER_LEN {
        return Err(decode_err(path, "file too short for the dimension header"));
    }
    let mmap = unsafe { MmapOptions::new().map(&file) }?;
    let bytes: &[u8] = &mmap;

    let rows = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
    let cols = u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize;
    if rows == 0 || cols == 0 {
        return Err(decode_err(path, format!("degenerate grid shape ({rows}, {cols})")));
    }
    let expected = rows
        .checked_mul(cols)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| decode_err(path, format!("grid shape ({rows}, {cols}) overflows")))?;
    let payload = &bytes[HEADER_LEN..];
    if payload.len() != expected {
        return Err(decode_err(
            path,
            format!(
                "expected {expected} payload bytes for a ({rows}, {cols}) grid, found {}",
                payload.len()
            ),
        ));
    }

    let values: Vec<f64> = payload
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes(b.try_into().unwrap()) as f64)
        .collect();
    Array2::from_shape_vec((rows, cols), values)
        .map_err(|e| Error::Internal(format!("grid shape ({rows}, {cols}) rejected: {e}")))
}

/// Reads a list of grid files into one sample matrix, flattening each grid
/// row-major into a feature-vector row.
///
/// Every grid must match the shape of the first one read; a divergent grid
/// is a decode error naming the offending file. Callers hand in at least
/// one locator: planned batch ranges are never empty, and an empty list
/// has no shape to establish, so it is reported as an internal error.
pub fn read_many<I, P>(paths: I) -> Result<Array2<f64>>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut samples: Vec<f64> = Vec::new();
    let mut count = 0usize;
    let mut shape: Option<(usize, usize)> = None;

    for path in paths {
        let grid = read_grid(&path)?;
        let dim = grid.dim();
        match shape {
            None => shape = Some(dim),
            Some(expected) if expected != dim => {
                return Err(decode_err(
                    path.as_ref(),
                    format!("grid shape {dim:?} does not match dataset shape {expected:?}"),
                ));
            }
            Some(_) => {}
        }
        samples.extend_from_slice(&grid.into_raw_vec());
        count += 1;
    }

    let Some((rows, cols)) = shape else {
        return Err(Error::Internal("batch assembly over an empty locator list".into()));
    };
    Array2::from_shape_vec((count, rows * cols), samples)
        .map_err(|e| Error::Internal(format!("batch assembly failed: {e}")))
}
