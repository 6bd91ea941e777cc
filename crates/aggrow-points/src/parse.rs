// crates/aggrow-points/src/parse.rs

//! Textual point formats: whitespace, CSV and TSV triples `x y n`.
//!
//! Empty lines and lines starting with `#` are skipped; the weight field
//! is optional and defaults to 1. Duplicate centers are pre-summed so the
//! output always satisfies the engine's input contract.

use crate::format::{sum_duplicates, WeightedPoint};
use anyhow::{ensure, Context, Result};
use std::io::BufRead;

/// Parse points from a reader; `delimiter` of `None` splits on any
/// whitespace.
pub fn parse_points<R: BufRead>(reader: R, delimiter: Option<char>) -> Result<Vec<WeightedPoint>> {
    let mut points = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading line {}", lineno + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = match delimiter {
            Some(d) => trimmed.split(d).map(str::trim).collect(),
            None => trimmed.split_whitespace().collect(),
        };
        ensure!(
            fields.len() == 2 || fields.len() == 3,
            "line {}: expected `x y [n]`, found {} fields",
            lineno + 1,
            fields.len()
        );

        let x: f64 = fields[0]
            .parse()
            .with_context(|| format!("line {}: bad x `{}`", lineno + 1, fields[0]))?;
        let y: f64 = fields[1]
            .parse()
            .with_context(|| format!("line {}: bad y `{}`", lineno + 1, fields[1]))?;
        let n: u64 = match fields.get(2) {
            Some(f) => f
                .parse()
                .with_context(|| format!("line {}: bad weight `{f}`", lineno + 1))?,
            None => 1,
        };
        points.push(WeightedPoint::new(x, y, n));
    }
    Ok(sum_duplicates(points))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_triples_with_comments() {
        let input = "# header\n1.0 2.0 3\n\n4.5\t5.5\n";
        let pts = parse_points(input.as_bytes(), None).unwrap();
        assert_eq!(
            pts,
            vec![
                WeightedPoint::new(1.0, 2.0, 3),
                WeightedPoint::new(4.5, 5.5, 1),
            ]
        );
    }

    #[test]
    fn csv_rows() {
        let input = "0.5, 1.5, 7\n2.0,3.0\n";
        let pts = parse_points(input.as_bytes(), Some(',')).unwrap();
        assert_eq!(pts[0], WeightedPoint::new(0.5, 1.5, 7));
        assert_eq!(pts[1], WeightedPoint::new(2.0, 3.0, 1));
    }

    #[test]
    fn duplicate_rows_are_summed() {
        let input = "1 1 2\n1 1 3\n";
        let pts = parse_points(input.as_bytes(), None).unwrap();
        assert_eq!(pts, vec![WeightedPoint::new(1.0, 1.0, 5)]);
    }

    #[test]
    fn malformed_lines_name_their_position() {
        let err = parse_points("1 2\nx 4\n".as_bytes(), None).unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));

        let err = parse_points("1\n".as_bytes(), None).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }
}
