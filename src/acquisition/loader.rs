//! Tab-separated sensor and profile file reader
//!
//! Each sensor file holds one row per operating cycle and one column per
//! sample taken within that cycle. The profile file holds one row per cycle
//! with five integer condition columns.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::types::ProfileRecord;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: column {column}: cannot parse {value:?} as a number")]
    Parse {
        path: PathBuf,
        line: usize,
        column: usize,
        value: String,
    },

    #[error("{path}:{line}: expected {expected} columns, found {found}")]
    Ragged {
        path: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("{0} contains no data rows")]
    Empty(PathBuf),

    #[error("None of the configured sensor files were found in {0}")]
    NoSensors(PathBuf),
}

/// Raw readings for one sensor channel. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorChannel {
    id: String,
    cycles: Vec<Vec<f64>>,
}

impl SensorChannel {
    pub fn new(id: impl Into<String>, cycles: Vec<Vec<f64>>) -> Self {
        Self {
            id: id.into(),
            cycles,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn cycles(&self) -> &[Vec<f64>] {
        &self.cycles
    }

    pub fn n_cycles(&self) -> usize {
        self.cycles.len()
    }
}

/// Parse a whitespace-separated numeric table. Blank lines are skipped and
/// every row must be as wide as the first.
pub fn parse_table(path: &Path, contents: &str) -> Result<Vec<Vec<f64>>, LoadError> {
    let mut rows: Vec<Vec<f64>> = Vec::new();
    let mut width: Option<usize> = None;

    for (idx, line) in contents.lines().enumerate() {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }

        let row = line
            .split_whitespace()
            .enumerate()
            .map(|(col, tok)| {
                tok.parse::<f64>().map_err(|_| LoadError::Parse {
                    path: path.to_path_buf(),
                    line: line_no,
                    column: col + 1,
                    value: tok.to_string(),
                })
            })
            .collect::<Result<Vec<f64>, _>>()?;

        match width {
            None => width = Some(row.len()),
            Some(w) if w != row.len() => {
                return Err(LoadError::Ragged {
                    path: path.to_path_buf(),
                    line: line_no,
                    expected: w,
                    found: row.len(),
                });
            }
            Some(_) => {}
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(LoadError::Empty(path.to_path_buf()));
    }
    Ok(rows)
}

fn read_file(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load one sensor channel from `<dir>/<id>.txt`.
pub fn load_sensor(dir: &Path, id: &str) -> Result<SensorChannel, LoadError> {
    let path = dir.join(format!("{id}.txt"));
    let rows = parse_table(&path, &read_file(&path)?)?;
    debug!(sensor = id, cycles = rows.len(), samples = rows[0].len(), "Loaded sensor file");
    Ok(SensorChannel::new(id, rows))
}

/// Load every configured sensor that has a file in `dir`.
///
/// Missing files are skipped with a warning; the call fails only when none of
/// the sensors could be found. Any other read or parse error is returned.
pub fn load_sensors(dir: &Path, ids: &[String]) -> Result<Vec<SensorChannel>, LoadError> {
    let mut channels = Vec::with_capacity(ids.len());
    for id in ids {
        let path = dir.join(format!("{id}.txt"));
        if !path.exists() {
            warn!(sensor = %id, path = %path.display(), "Sensor file not found, skipping");
            continue;
        }
        info!(sensor = %id, "Processing sensor data");
        channels.push(load_sensor(dir, id)?);
    }

    if channels.is_empty() {
        return Err(LoadError::NoSensors(dir.to_path_buf()));
    }
    Ok(channels)
}

/// Load the component condition profile.
pub fn load_profile(path: &Path) -> Result<Vec<ProfileRecord>, LoadError> {
    let rows = parse_table(path, &read_file(path)?)?;

    rows.iter()
        .enumerate()
        .map(|(idx, row)| {
            if row.len() != ProfileRecord::COLUMNS {
                return Err(LoadError::Ragged {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    expected: ProfileRecord::COLUMNS,
                    found: row.len(),
                });
            }
            let mut cols = [0_i64; ProfileRecord::COLUMNS];
            for (col, (slot, &v)) in cols.iter_mut().zip(row).enumerate() {
                if v.fract() != 0.0 || !v.is_finite() {
                    return Err(LoadError::Parse {
                        path: path.to_path_buf(),
                        line: idx + 1,
                        column: col + 1,
                        value: v.to_string(),
                    });
                }
                #[allow(clippy::cast_possible_truncation)]
                {
                    *slot = v as i64;
                }
            }
            Ok(ProfileRecord::from_columns(cols))
        })
        .collect()
}
