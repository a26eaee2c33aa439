pub mod config;
pub mod data_loading;
pub mod grouping;
pub mod merge;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod preprocessing;
pub mod run_log;
pub mod statistics;
pub mod validator;

use std::path::PathBuf;

/// File name extension of every raw AcuWand export and merge artifact.
pub const CSV_EXTENSION: &str = ".csv";

/// A subject directory inside a cohort directory, e.g. `T7/BPCR01-0512-001`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub cohort_id: String,
    pub subject_id: String,
    pub dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFile {
    pub name: String,
    pub study_group_id: String,
    pub subject_id: String,
    pub path: PathBuf,
}

impl RawFile {
    pub fn new(subject: &Subject, name: impl Into<String>) -> Self {
        let name = name.into();
        RawFile {
            path: subject.dir.join(&name),
            name,
            study_group_id: subject.cohort_id.clone(),
            subject_id: subject.subject_id.clone(),
        }
    }

    /// File name without the `.csv` extension.
    pub fn stem(&self) -> &str {
        self.name
            .strip_suffix(CSV_EXTENSION)
            .unwrap_or(&self.name)
    }
}
