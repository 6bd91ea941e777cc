// crates/aggrow-points/src/io.rs

//! Point-file read/write with extension-based auto-detection.
//!
//! `.json` / `.cbor` hold serde arrays of [`WeightedPoint`]; `.csv` and
//! `.tsv` are delimited triples; `.txt` / `.pts` are whitespace triples.
//! Unknown extensions are rejected for reads and default to JSON for
//! writes.

use crate::format::WeightedPoint;
use crate::parse::parse_points;
use anyhow::{anyhow, Context, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write as _};
use std::path::Path;

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating parent directory {}", dir.display()))?;
        }
    }
    Ok(())
}

fn ext_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// Read points, picking the format from the extension.
pub fn read_points_auto<P: AsRef<Path>>(path: P) -> Result<Vec<WeightedPoint>> {
    let path_ref = path.as_ref();
    let open = || -> Result<BufReader<File>> {
        let f = File::open(path_ref).with_context(|| format!("open {}", path_ref.display()))?;
        Ok(BufReader::new(f))
    };
    match ext_lower(path_ref).as_deref() {
        Some("json") => {
            let v: Vec<WeightedPoint> =
                serde_json::from_reader(open()?).context("deserialize JSON points")?;
            Ok(v)
        }
        Some("cbor") => {
            let v: Vec<WeightedPoint> =
                ciborium::de::from_reader(&mut open()?).context("deserialize CBOR points")?;
            Ok(v)
        }
        Some("csv") => parse_points(open()?, Some(',')),
        Some("tsv") => parse_points(open()?, Some('\t')),
        Some("txt" | "pts") => parse_points(open()?, None),
        Some(other) => Err(anyhow!(
            "unsupported points extension: {other} (supported: .json, .cbor, .csv, .tsv, .txt, .pts)"
        )),
        None => Err(anyhow!("path has no extension")),
    }
}

/// Write points; `.cbor` and `.csv` honored, everything else JSON.
pub fn write_points_auto<P: AsRef<Path>>(path: P, points: &[WeightedPoint]) -> Result<()> {
    let path_ref = path.as_ref();
    ensure_parent_dir(path_ref)?;
    match ext_lower(path_ref).as_deref() {
        Some("cbor") => {
            let f = File::create(path_ref)
                .with_context(|| format!("create {}", path_ref.display()))?;
            let mut w = BufWriter::new(f);
            ciborium::ser::into_writer(&points, &mut w).context("serialize CBOR points")?;
            Ok(())
        }
        Some("csv") => {
            let f = File::create(path_ref)
                .with_context(|| format!("create {}", path_ref.display()))?;
            let mut w = BufWriter::new(f);
            for p in points {
                writeln!(w, "{},{},{}", p.x, p.y, p.n)?;
            }
            w.flush()?;
            Ok(())
        }
        _ => {
            let f = File::create(path_ref)
                .with_context(|| format!("create {}", path_ref.display()))?;
            let w = BufWriter::new(f);
            serde_json::to_writer_pretty(w, points).context("serialize JSON points")?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<WeightedPoint> {
        vec![
            WeightedPoint::new(0.5, 1.5, 2),
            WeightedPoint::new(-3.0, 4.0, 1),
        ]
    }

    #[test]
    fn json_and_cbor_roundtrip() {
        let dir = std::env::temp_dir().join("aggrow-points-io");
        for name in ["pts.json", "pts.cbor"] {
            let path = dir.join(name);
            write_points_auto(&path, &sample()).unwrap();
            assert_eq!(read_points_auto(&path).unwrap(), sample());
        }
    }

    #[test]
    fn csv_roundtrip() {
        let path = std::env::temp_dir().join("aggrow-points-io").join("pts.csv");
        write_points_auto(&path, &sample()).unwrap();
        assert_eq!(read_points_auto(&path).unwrap(), sample());
    }

    #[test]
    fn unknown_extension_rejected() {
        assert!(read_points_auto("points.parquet").is_err());
    }
}
