//! File-name validation ahead of an analysis run.
//!
//! The classifier's patterns are loose. The patterns here spell
//! out each naming convention field by field so that typos are caught before
//! they silently shift a file into the wrong day.

use crate::config::AnalysisConfig;
use crate::data_loading::{list_cohorts, list_raw_files, list_subjects};
use crate::naming::{FormatClassifier, NamingFormat};
use crate::run_log::RunLog;
use anyhow::{Context, Result};
use chrono::Local;
use regex::Regex;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Companion sheets that live next to the recordings and are not checked.
const DATASHEET_MARKERS: [&str; 4] = ["DataSheet", "Datasheet", "datasheet", "Data Sheet"];

const PART: &str = r"(_[Pp]art\d+(_graph)?)?";
const DATE: &str = r"\d{1,2}-\d{1,2}-\d{2,4}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    /// No file of the subject follows any naming format.
    NoReadableData,
    ContainsSpace,
    ContainsPartHyphen,
    PatternMismatch(NamingFormat),
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueKind::NoReadableData => write!(f, "no readable data"),
            IssueKind::ContainsSpace => write!(f, "improper formatting (space included) in name"),
            IssueKind::ContainsPartHyphen => write!(f, "improper formatting (-part) in name"),
            IssueKind::PatternMismatch(format) => {
                write!(f, "improper formatting in name for {}", format)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub cohort_id: String,
    pub subject_id: String,
    /// Empty for subject-level issues.
    pub file_name: String,
    pub kind: IssueKind,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationSummary {
    pub subjects_checked: usize,
    pub files_checked: usize,
    pub issues: Vec<ValidationIssue>,
    pub log_path: PathBuf,
}

/// Full-name patterns of one cohort.
pub struct StrictPatterns {
    format1: Regex,
    format2: Regex,
    format3: Regex,
}

impl StrictPatterns {
    pub fn new(cohort_id: &str, subject_prefix: &str) -> Result<Self, regex::Error> {
        let study = if subject_prefix.is_empty() {
            "[A-Za-z0-9]+".to_string()
        } else {
            regex::escape(subject_prefix)
        };
        Ok(StrictPatterns {
            format1: Regex::new(&format!(
                r"^\d{{5}}_\d{{4}}_{DATE}_\d{{1,2}}-\d{{1,2}}-\d{{1,2}}_\d+{PART}\.csv$"
            ))?,
            format2: Regex::new(&format!(
                r"^\d{{5}}_\d{{4}}___{DATE}___\d{{1,2}}-\d{{1,2}}___\d+(\.\d+)?_mins{PART}\.csv$"
            ))?,
            format3: Regex::new(&format!(
                r"^{}-\d{{4}}-\d{{3}}_{}_{DATE}{PART}\.csv$",
                study,
                regex::escape(cohort_id)
            ))?,
        })
    }

    pub fn is_match(&self, format: NamingFormat, name: &str) -> bool {
        match format {
            NamingFormat::Format1 => self.format1.is_match(name),
            NamingFormat::Format2 => self.format2.is_match(name),
            NamingFormat::Format3 => self.format3.is_match(name),
        }
    }
}

/// Problem with a single file name, `None` if the name is fine or ignored.
pub fn check_file_name(
    patterns: &StrictPatterns,
    format: NamingFormat,
    name: &str,
) -> Option<IssueKind> {
    if DATASHEET_MARKERS.iter().any(|m| name.contains(m)) {
        return None;
    }
    if name.contains(' ') {
        return Some(IssueKind::ContainsSpace);
    }
    if name.contains("-part") {
        return Some(IssueKind::ContainsPartHyphen);
    }
    if !patterns.is_match(format, name) {
        return Some(IssueKind::PatternMismatch(format));
    }
    None
}

/// Checks every subject under `input_dir` and writes the validator log.
pub fn run_validation(
    config: &AnalysisConfig,
    input_dir: &Path,
    output_dir: &Path,
) -> Result<ValidationSummary> {
    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    let log_path = output_dir.join(format!("{}_validator_log_{}.txt", config.study_name, stamp));
    let mut log = RunLog::create(&log_path)?;

    log.banner(&[
        &format!("{} Validator Notes", config.study_name),
        &format!("Run at {}", stamp),
    ]);
    log.section(
        "Naming Format 1: wand#_instance#_date#_timeofday#_lengthoffile(rows)#.csv\n\
         Naming Format 2: wand#_instance#___date#___timeofday#___lengthoffile(mins)#_mins.csv\n\
         Naming Format 3: STUDY-####-subject#_T#_date#-date#-date#_part#.csv",
    );

    let mut summary = validate_tree(&mut log, config, input_dir)?;

    log.banner(&["END LOG"]);
    log.finish()
        .with_context(|| format!("Failed to flush {}", log_path.display()))?;
    summary.log_path = log_path;
    Ok(summary)
}

pub fn validate_tree<W: Write>(
    log: &mut RunLog<W>,
    config: &AnalysisConfig,
    input_dir: &Path,
) -> Result<ValidationSummary> {
    let mut summary = ValidationSummary::default();

    for (cohort_id, cohort_dir) in list_cohorts(input_dir, &config.cohort_prefix)? {
        let classifier = FormatClassifier::new(&cohort_id)?;
        let patterns = StrictPatterns::new(&cohort_id, &config.subject_prefix)?;
        let subjects = match list_subjects(&cohort_id, &cohort_dir, &config.subject_prefix) {
            Ok(subjects) => subjects,
            Err(e) => {
                log.error(format!("Cannot list cohort {}: {:#}", cohort_id, e));
                continue;
            }
        };

        for subject in subjects {
            summary.subjects_checked += 1;
            let files = match list_raw_files(&subject) {
                Ok(files) => files,
                Err(e) => {
                    log.error(format!("Cannot list {}: {:#}", subject.dir.display(), e));
                    continue;
                }
            };

            let names = files.iter().map(|f| f.name.as_str());
            let Some(format) = classifier.detect(names) else {
                log.warn(format!(
                    "No readable data for {} ... check to ensure this is correct and rename if not.",
                    subject.dir.display()
                ));
                summary.issues.push(ValidationIssue {
                    cohort_id: cohort_id.clone(),
                    subject_id: subject.subject_id.clone(),
                    file_name: String::new(),
                    kind: IssueKind::NoReadableData,
                });
                continue;
            };
            log.info(format!("{} data is in {}", subject.dir.display(), format));

            for file in &files {
                summary.files_checked += 1;
                if let Some(kind) = check_file_name(&patterns, format, &file.name) {
                    log.warn(format!("Naming error in file: {} ... {}.", file.name, kind));
                    summary.issues.push(ValidationIssue {
                        cohort_id: cohort_id.clone(),
                        subject_id: subject.subject_id.clone(),
                        file_name: file.name.clone(),
                        kind,
                    });
                }
            }
        }
    }

    Ok(summary)
}
