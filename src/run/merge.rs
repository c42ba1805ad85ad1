//! Weekly artifact assembly
//!
//! Concatenates the per-match CSV files into one table. Columns are the union
//! of every input header in first-seen order; a row gets an empty cell for each
//! column its own file did not have. Rows keep input order and are never
//! deduplicated or sorted. A name repeated within one header is kept as
//! `name.1`, `name.2` and so on, so no cell is dropped.

use crate::run::csv::{parse_rows, write_row};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while merging tables
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What a merge produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    pub path: PathBuf,

    /// Input files that contributed a header
    pub inputs: usize,

    /// Data rows written (header excluded)
    pub rows: usize,

    pub columns: Vec<String>,
}

/// Merges every existing, non-empty input into `destination`
///
/// # Arguments
///
/// * `inputs` - Candidate per-item files, in dispatch order
/// * `destination` - Output path, overwritten if present
///
/// # Returns
///
/// * `Ok(Some(summary))` - The artifact was written
/// * `Ok(None)` - No input existed or every input was empty; nothing written
/// * `Err(MergeError)` - An input could not be read or the output written
pub fn merge_tables(
    inputs: &[PathBuf],
    destination: &Path,
) -> Result<Option<MergeSummary>, MergeError> {
    let mut columns: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut tables: Vec<(Vec<String>, Vec<Vec<String>>)> = Vec::new();

    for path in inputs {
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "No output for item, skipping");
            continue;
        }

        let text = fs::read_to_string(path).map_err(|source| MergeError::Read {
            path: path.clone(),
            source,
        })?;

        let mut rows = parse_rows(&text);
        if rows.is_empty() {
            tracing::warn!(path = %path.display(), "Output file is empty, skipping");
            continue;
        }
        let header = disambiguate_header(rows.remove(0));

        for name in &header {
            if !index.contains_key(name) {
                index.insert(name.clone(), columns.len());
                columns.push(name.clone());
            }
        }
        tables.push((header, rows));
    }

    if tables.is_empty() {
        return Ok(None);
    }

    let write_err = |source: io::Error| MergeError::Write {
        path: destination.to_path_buf(),
        source,
    };

    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let file_name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "merged.csv".to_string());
    let temp_path = destination.with_file_name(format!(".{}.tmp", file_name));

    let mut rows_written = 0;
    {
        let file = fs::File::create(&temp_path).map_err(write_err)?;
        let mut writer = BufWriter::new(file);
        write_row(&mut writer, &columns).map_err(write_err)?;

        for (header, rows) in &tables {
            let positions: Vec<usize> = header.iter().map(|name| index[name]).collect();
            for row in rows {
                let mut out = vec![String::new(); columns.len()];
                for (cell, &position) in row.iter().zip(&positions) {
                    out[position] = cell.clone();
                }
                write_row(&mut writer, &out).map_err(write_err)?;
                rows_written += 1;
            }
        }

        writer.flush().map_err(write_err)?;
        writer.get_ref().sync_all().map_err(write_err)?;
    }
    fs::rename(&temp_path, destination).map_err(write_err)?;

    tracing::info!(
        path = %destination.display(),
        inputs = tables.len(),
        rows = rows_written,
        columns = columns.len(),
        "Combined outputs"
    );

    Ok(Some(MergeSummary {
        path: destination.to_path_buf(),
        inputs: tables.len(),
        rows: rows_written,
        columns,
    }))
}

/// Renames repeated column names to `name.1`, `name.2`, ...
fn disambiguate_header(header: Vec<String>) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    header
        .into_iter()
        .map(|name| {
            let mut candidate = name.clone();
            let mut n = 0;
            while used.contains(&candidate) {
                n += 1;
                candidate = format!("{}.{}", name, n);
            }
            used.insert(candidate.clone());
            candidate
        })
        .collect()
}
