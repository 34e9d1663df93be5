//! Projection and model persistence.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use ndarray::Array2;

use crate::error::{Error, Result};
use crate::manifest::FileManifest;
use crate::model::IncrementalPca;

/// Writes the projection matrix as delimited text, one row per manifest
/// entry in manifest order.
///
/// The header is `timestamp,pc1,...,pcK`; each row carries the entry's
/// timestamp followed by its projected coordinates.
pub fn write_projection_csv<P: AsRef<Path>>(
    path: P,
    manifest: &FileManifest,
    projection: &Array2<f64>,
) -> Result<()> {
    if manifest.len() != projection.nrows() {
        return Err(Error::Internal(format!(
            "projection has {} rows for {} manifest entries",
            projection.nrows(),
            manifest.len()
        )));
    }

    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    write!(writer, "timestamp")?;
    for c in 1..=projection.ncols() {
        write!(writer, ",pc{c}")?;
    }
    writeln!(writer)?;

    for (entry, row) in manifest.iter().zip(projection.rows()) {
        write!(writer, "{}", entry.timestamp)?;
        for value in row {
            write!(writer, ",{value}")?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Serializes a fitted model to a JSON snapshot.
pub fn save_model<P: AsRef<Path>>(path: P, model: &IncrementalPca) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, model)?;
    writer.flush()?;
    Ok(())
}

/// Restores a model snapshot for further projection without refitting.
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<IncrementalPca> {
    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest;
    use ndarray::array;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn csv_layout_matches_manifest_order() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("2021010100.bin"), b"").unwrap();
        fs::write(dir.path().join("2021010106.bin"), b"").unwrap();
        let found = manifest::scan(dir.path(), ".bin").unwrap();

        let projection = array![[1.5, -2.0], [0.25, 3.0]];
        let out = dir.path().join("p.proj.csv");
        write_projection_csv(&out, &found, &projection).unwrap();

        let text = fs::read_to_string(&out).unwrap();
        assert_eq!(
            text,
            "timestamp,pc1,pc2\n2021010100,1.5,-2\n2021010106,0.25,3\n"
        );
    }

    #[test]
    fn row_count_mismatch_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("2021010100.bin"), b"").unwrap();
        let found = manifest::scan(dir.path(), ".bin").unwrap();

        let projection = array![[1.0], [2.0]];
        let out = dir.path().join("p.proj.csv");
        let err = write_projection_csv(&out, &found, &projection).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn snapshot_file_round_trip() {
        let batch = ndarray::Array2::from_shape_fn((10, 4), |(i, j)| {
            ((i as f64) * 0.9 + (j as f64) * 1.7).sin()
        });
        let mut model = IncrementalPca::new(2, true).unwrap();
        model.update(&batch).unwrap();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("p.pca.json");
        save_model(&path, &model).unwrap();
        let restored = load_model(&path).unwrap();

        assert_eq!(restored.n_samples_seen(), model.n_samples_seen());
        assert_eq!(
            restored.project(&batch).unwrap(),
            model.project(&batch).unwrap()
        );
    }

    #[test]
    fn loading_a_missing_snapshot_fails() {
        let dir = TempDir::new().unwrap();
        assert!(load_model(dir.path().join("absent.json")).is_err());
    }
}
