use crate::data_loading::{read_pressure_column, write_pressure_column, MERGED_SUFFIX};
use crate::grouping::DayGroup;
use crate::naming::NamingFormat;
use anyhow::{bail, Result};
use log::debug;
use std::path::{Path, PathBuf};

/// Part markers removed from the first fragment's name, checked in this order.
const PART_SUFFIXES: [&str; 4] = ["_part1", "_part 1", "_part1_graph", "_Part1"];

/// One merged pressure series for a subject and date.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalDailyRecord {
    pub subject_id: String,
    pub date_token: String,
    pub format: NamingFormat,
    /// Base name shared by the merged file and the report's date label.
    pub name: String,
    pub fragments: usize,
    pub samples: Vec<f64>,
}

impl CanonicalDailyRecord {
    pub fn file_name(&self) -> String {
        format!("{}{}", self.name, MERGED_SUFFIX)
    }
}

/// Canonical day name from the stem of the day's first fragment.
pub fn canonical_name(first_stem: &str) -> String {
    let mut name = first_stem;
    for suffix in PART_SUFFIXES {
        if let Some(stripped) = name.strip_suffix(suffix) {
            name = stripped;
        }
    }
    name.to_string()
}

/// Concatenates the first column of every fragment, in group order.
pub fn merge_group(group: &DayGroup) -> Result<CanonicalDailyRecord> {
    let Some(first) = group.files.first() else {
        bail!("day group {} has no files", group.date_token);
    };

    let mut samples = Vec::new();
    for file in &group.files {
        let values = read_pressure_column(&file.path)?;
        debug!("{}: {} samples", file.name, values.len());
        samples.extend(values);
    }

    Ok(CanonicalDailyRecord {
        subject_id: first.subject_id.clone(),
        date_token: group.date_token.clone(),
        format: group.format,
        name: canonical_name(first.stem()),
        fragments: group.files.len(),
        samples,
    })
}

/// Writes the record into `dir` as `<name>_full.csv`.
pub fn write_record(record: &CanonicalDailyRecord, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(record.file_name());
    write_pressure_column(&path, &record.samples)?;
    Ok(path)
}
