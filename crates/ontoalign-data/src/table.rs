//! Readers for the TSV/CSV tables exchanged with the matching engine.
//!
//! Column layouts are positional: the engine and the benchmark harness agree
//! on column order, not on header names, so readers take the first columns
//! by index and treat everything after (src, tgt) in a score table as one
//! matcher column each.

use std::path::Path;

use ontoalign_core::{AlignError, CandidateAnchor, CandidateSet, MappingRow, Result, ScoreTable};

use crate::literal;

/// Delimiter by file extension: `.tsv` is tab-separated, anything else comma.
fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some("tsv") => b'\t',
        _ => b',',
    }
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter_for(path))
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| AlignError::Table(format!("Failed to open {}: {e}", path.display())))
}

/// Read the engine's score table: `[Src, Tgt, <matcher columns...>]`.
pub fn read_score_table(path: &Path) -> Result<ScoreTable> {
    let mut reader = open_reader(path)?;
    let headers = reader
        .headers()
        .map_err(|e| AlignError::Table(format!("Failed to read {} header: {e}", path.display())))?
        .clone();
    if headers.len() < 3 {
        return Err(AlignError::Table(format!(
            "Score table {} needs at least one matcher column",
            path.display()
        )));
    }
    let matchers: Vec<String> = headers.iter().skip(2).map(str::to_string).collect();

    let mut table = ScoreTable::new(matchers);
    for (i, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| AlignError::Table(format!("Bad record in {}: {e}", path.display())))?;
        let src = record.get(0).unwrap_or_default();
        let tgt = record.get(1).unwrap_or_default();
        let features = record
            .iter()
            .skip(2)
            .map(|cell| {
                cell.trim().parse::<f32>().map_err(|e| {
                    AlignError::Table(format!(
                        "Bad score at {} row {}: {e}",
                        path.display(),
                        i + 1
                    ))
                })
            })
            .collect::<Result<Vec<f32>>>()?;
        table.insert(src, tgt, features);
    }
    Ok(table)
}

/// Read a reference or negatives table: `[Src, Tgt, Label]`.
///
/// A missing label column defaults to 1.0 (reference positives).
pub fn read_mappings(path: &Path) -> Result<Vec<MappingRow>> {
    let mut reader = open_reader(path)?;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record
            .map_err(|e| AlignError::Table(format!("Bad record in {}: {e}", path.display())))?;
        let src = record.get(0).unwrap_or_default().to_string();
        let tgt = record.get(1).unwrap_or_default().to_string();
        let label = match record.get(2) {
            Some(cell) if !cell.trim().is_empty() => cell.trim().parse::<f64>().map_err(|e| {
                AlignError::Table(format!("Bad label in {}: {e}", path.display()))
            })?,
            _ => 1.0,
        };
        rows.push(MappingRow { src, tgt, label });
    }
    Ok(rows)
}

/// Read a candidates table: `[Src, Tgt, Candidates]` with a literal-encoded
/// candidate list per anchor.
pub fn read_candidates(path: &Path) -> Result<CandidateSet> {
    let mut reader = open_reader(path)?;
    let mut anchors = Vec::new();
    for record in reader.records() {
        let record = record
            .map_err(|e| AlignError::Table(format!("Bad record in {}: {e}", path.display())))?;
        let src = record.get(0).unwrap_or_default().to_string();
        let tgt = record.get(1).unwrap_or_default().to_string();
        let candidates = literal::parse_strings(record.get(2).unwrap_or("[]"))?;
        anchors.push(CandidateAnchor {
            src,
            tgt,
            candidates,
        });
    }
    Ok(CandidateSet::new(anchors))
}
