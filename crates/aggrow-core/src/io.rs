// crates/aggrow-core/src/io.rs

//! Serialization helpers for [`MergeTree`] results.
//!
//! JSON and CBOR read/write utilities with extension-based auto-detection.
//! Unknown/missing extensions are rejected for reads and default to JSON
//! for writes.

use crate::tree::MergeTree;
use anyhow::{anyhow, Context, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Ensure the parent directory for a file exists (no-op if none).
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

/// Read a [`MergeTree`] from **JSON**.
pub fn read_tree_json<P: AsRef<Path>>(path: P) -> Result<MergeTree> {
    let path_ref = path.as_ref();
    let f = File::open(path_ref).with_context(|| format!("open {}", path_ref.display()))?;
    let rdr = BufReader::new(f);
    let t: MergeTree = serde_json::from_reader(rdr).context("deserialize JSON merge tree")?;
    Ok(t)
}

/// Write a [`MergeTree`] to **JSON** (pretty).
pub fn write_tree_json<P: AsRef<Path>>(path: P, tree: &MergeTree) -> Result<()> {
    let path_ref = path.as_ref();
    ensure_parent_dir(path_ref)?;
    let f = File::create(path_ref).with_context(|| format!("create {}", path_ref.display()))?;
    let w = BufWriter::new(f);
    serde_json::to_writer_pretty(w, tree).context("serialize JSON merge tree")?;
    Ok(())
}

/// Read a [`MergeTree`] from **CBOR**.
pub fn read_tree_cbor<P: AsRef<Path>>(path: P) -> Result<MergeTree> {
    let path_ref = path.as_ref();
    let f = File::open(path_ref).with_context(|| format!("open {}", path_ref.display()))?;
    let mut rdr = BufReader::new(f);
    let t: MergeTree =
        ciborium::de::from_reader(&mut rdr).context("deserialize CBOR merge tree")?;
    Ok(t)
}

/// Write a [`MergeTree`] to **CBOR**.
pub fn write_tree_cbor<P: AsRef<Path>>(path: P, tree: &MergeTree) -> Result<()> {
    let path_ref = path.as_ref();
    ensure_parent_dir(path_ref)?;
    let f = File::create(path_ref).with_context(|| format!("create {}", path_ref.display()))?;
    let mut w = BufWriter::new(f);
    ciborium::ser::into_writer(tree, &mut w).context("serialize CBOR merge tree")?;
    Ok(())
}

/// Auto-detect read by extension `.json` / `.cbor` (case-insensitive).
pub fn read_tree_auto<P: AsRef<Path>>(path: P) -> Result<MergeTree> {
    match ext_lower(path.as_ref()).as_deref() {
        Some("json") => read_tree_json(path),
        Some("cbor") => read_tree_cbor(path),
        Some(other) => Err(anyhow!(
            "unsupported merge-tree extension: {other} (supported: .json, .cbor)"
        )),
        None => Err(anyhow!("path has no extension (expected .json or .cbor)")),
    }
}

/// Auto-detect write (defaults to **JSON** if unknown or missing).
pub fn write_tree_auto<P: AsRef<Path>>(path: P, tree: &MergeTree) -> Result<()> {
    match ext_lower(path.as_ref()).as_deref() {
        Some("cbor") => write_tree_cbor(path, tree),
        _ => write_tree_json(path, tree),
    }
}
