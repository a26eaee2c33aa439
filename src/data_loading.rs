use crate::{RawFile, Subject, CSV_EXTENSION};
use anyhow::{Context, Result};
use log::{debug, trace};
use std::fs::File;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Suffix of the merged per-day files written into subject directories.
pub const MERGED_SUFFIX: &str = "_full.csv";

/// Header of the single column in a merged file.
pub const PRESSURE_HEADER: &str = "pressure";

/// Immediate child directories whose name starts with `prefix`, sorted by name.
fn child_dirs(dir: &Path, prefix: &str) -> Result<Vec<(String, PathBuf)>> {
    let mut dirs = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("Failed to list directory: {}", dir.display()))?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(prefix) {
            dirs.push((name, entry.into_path()));
        }
    }
    Ok(dirs)
}

/// Cohort directories (e.g. `T7`) under the input root.
pub fn list_cohorts(input_dir: &Path, cohort_prefix: &str) -> Result<Vec<(String, PathBuf)>> {
    child_dirs(input_dir, cohort_prefix)
}

pub fn list_subjects(cohort_id: &str, cohort_dir: &Path, subject_prefix: &str) -> Result<Vec<Subject>> {
    Ok(child_dirs(cohort_dir, subject_prefix)?
        .into_iter()
        .map(|(subject_id, dir)| Subject {
            cohort_id: cohort_id.to_string(),
            subject_id,
            dir,
        })
        .collect())
}

pub fn is_merge_artifact(name: &str) -> bool {
    name.ends_with(MERGED_SUFFIX)
}

/// Raw `.csv` recordings of a subject, merge artifacts excluded.
pub fn list_raw_files(subject: &Subject) -> Result<Vec<RawFile>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(&subject.dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry
            .with_context(|| format!("Failed to list directory: {}", subject.dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.ends_with(CSV_EXTENSION) && !is_merge_artifact(&name) {
            files.push(RawFile::new(subject, name.into_owned()));
        }
    }
    Ok(files)
}

/// Deletes merged files left by an earlier run. Returns how many were removed.
pub fn remove_merge_artifacts(dir: &Path) -> Result<usize> {
    let mut removed = 0;
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("Failed to list directory: {}", dir.display()))?;
        if entry.file_type().is_file() && is_merge_artifact(&entry.file_name().to_string_lossy()) {
            std::fs::remove_file(entry.path())
                .with_context(|| format!("Failed to remove {}", entry.path().display()))?;
            debug!("Removed stale merge artifact {}", entry.path().display());
            removed += 1;
        }
    }
    Ok(removed)
}

/// Reads the first column of a pressure export. Further columns are ignored,
/// as are cells that are blank or not numeric (header rows, padding).
pub fn read_pressure_column(path: &Path) -> Result<Vec<f64>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // exports sometimes carry empty trailing columns
        .from_reader(file);

    let mut values = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.records() {
        let record = result.with_context(|| format!("Failed to read {}", path.display()))?;
        let cell = record
            .get(0)
            .unwrap_or("")
            .trim_start_matches('\u{feff}')
            .trim();
        match cell.parse::<f64>() {
            Ok(value) if !value.is_nan() => values.push(value),
            _ => {
                trace!("Skipping non-numeric cell {:?} in {}", cell, path.display());
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        debug!(
            "{}: read {} values, skipped {} non-numeric rows",
            path.display(),
            values.len(),
            skipped
        );
    }
    Ok(values)
}

pub fn write_pressure_column(path: &Path, values: &[f64]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record([PRESSURE_HEADER])?;
    for value in values {
        writer.write_record([value.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn reads_first_column_and_skips_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("day.csv");
        fs::write(&path, "\u{feff}Pressure,,\n1.5,,\n-2,x,\n,,\n3e-1\n").unwrap();
        let values = read_pressure_column(&path).unwrap();
        assert_eq!(values, vec![1.5, -2.0, 0.3]);
    }

    #[test]
    fn written_column_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x_full.csv");
        write_pressure_column(&path, &[0.1, 5.0, -3.25]).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "pressure\n0.1\n5\n-3.25\n"
        );
        assert_eq!(read_pressure_column(&path).unwrap(), vec![0.1, 5.0, -3.25]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_pressure_column(&dir.path().join("absent.csv")).is_err());
    }

    #[test]
    fn lists_prefixed_dirs_and_raw_csvs() {
        let root = tempfile::tempdir().unwrap();
        let cohort = root.path().join("T7");
        fs::create_dir_all(cohort.join("BPCR01-0001")).unwrap();
        fs::create_dir_all(cohort.join("OTHER")).unwrap();
        fs::create_dir_all(root.path().join("archive")).unwrap();
        fs::write(root.path().join("T9.txt"), "").unwrap();

        let cohorts = list_cohorts(root.path(), "T").unwrap();
        assert_eq!(cohorts.len(), 1);
        assert_eq!(cohorts[0].0, "T7");

        let subjects = list_subjects("T7", &cohort, "BPCR01").unwrap();
        assert_eq!(subjects.len(), 1);
        assert_eq!(subjects[0].subject_id, "BPCR01-0001");
        assert_eq!(list_subjects("T7", &cohort, "").unwrap().len(), 2);

        let subject_dir = &subjects[0].dir;
        fs::write(subject_dir.join("b_T7_1-2-79.csv"), "1\n").unwrap();
        fs::write(subject_dir.join("a_T7_1-1-79.csv"), "1\n").unwrap();
        fs::write(subject_dir.join("a_T7_1-1-79_full.csv"), "1\n").unwrap();
        fs::write(subject_dir.join("notes.txt"), "").unwrap();

        let files = list_raw_files(&subjects[0]).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a_T7_1-1-79.csv", "b_T7_1-2-79.csv"]);
        assert_eq!(files[0].study_group_id, "T7");

        assert_eq!(remove_merge_artifacts(subject_dir).unwrap(), 1);
        assert!(!subject_dir.join("a_T7_1-1-79_full.csv").exists());
        assert_eq!(remove_merge_artifacts(subject_dir).unwrap(), 0);
    }
}
