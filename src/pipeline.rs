//! Batch driver: cohorts, then subjects, strictly in sequence.
//!
//! Each cohort runs in two passes over its subjects, mirroring the two
//! sections of the run log: first every subject's files are classified,
//! grouped and merged into canonical daily records; then statistics are
//! computed from those records. A failing subject is noted and skipped.

use crate::config::AnalysisConfig;
use crate::data_loading::{list_cohorts, list_raw_files, list_subjects, remove_merge_artifacts};
use crate::grouping::group_by_day;
use crate::merge::{merge_group, write_record, CanonicalDailyRecord};
use crate::naming::FormatClassifier;
use crate::output::{table_paths, write_daily_table, write_subject_table};
use crate::preprocessing::{clean_pressure, drop_idle_runs, treatment_time, RunDecision};
use crate::run_log::RunLog;
use crate::statistics::{DailyStats, PressureStats, SubjectStats, TreatmentDuration};
use crate::Subject;
use anyhow::{Context, Result};
use chrono::Local;
use log::debug;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct CohortReport {
    pub cohort_id: String,
    pub daily: Vec<DailyStats>,
    pub subjects: Vec<SubjectStats>,
    pub subjects_skipped: usize,
    pub days_merged: usize,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub cohorts: Vec<CohortReport>,
    pub log_path: PathBuf,
    pub tables: Vec<PathBuf>,
}

impl RunSummary {
    pub fn subjects_processed(&self) -> usize {
        self.cohorts.iter().map(|c| c.subjects.len()).sum()
    }

    pub fn subjects_skipped(&self) -> usize {
        self.cohorts.iter().map(|c| c.subjects_skipped).sum()
    }

    pub fn days_merged(&self) -> usize {
        self.cohorts.iter().map(|c| c.days_merged).sum()
    }
}

/// Runs the whole analysis, stamping outputs with the current local time.
pub fn run_analysis(config: &AnalysisConfig, input_dir: &Path, output_dir: &Path) -> Result<RunSummary> {
    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    run_analysis_with_stamp(config, input_dir, output_dir, &stamp)
}

pub fn run_analysis_with_stamp(
    config: &AnalysisConfig,
    input_dir: &Path,
    output_dir: &Path,
    stamp: &str,
) -> Result<RunSummary> {
    config.validate()?;
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let log_path = output_dir.join(format!("{}_analysis_log_{}.txt", config.study_name, stamp));
    let mut log = RunLog::create(&log_path)?;
    log.banner(&[
        &format!("{} Data Log Notes", config.study_name),
        &format!("Run at {}", stamp),
    ]);

    let mut summary = RunSummary {
        log_path: log_path.clone(),
        ..RunSummary::default()
    };

    let cohorts = list_cohorts(input_dir, &config.cohort_prefix)?;
    if cohorts.is_empty() {
        log.warn(format!(
            "No cohort directories starting with '{}' in {}",
            config.cohort_prefix,
            input_dir.display()
        ));
    }

    for (cohort_id, cohort_dir) in cohorts {
        let report = match analyze_cohort(&mut log, config, &cohort_id, &cohort_dir) {
            Ok(report) => report,
            Err(e) => {
                log.error(format!("Cohort {} skipped: {:#}", cohort_id, e));
                continue;
            }
        };

        let (daily_path, subject_path) =
            table_paths(output_dir, &config.study_name, &cohort_id, stamp);
        let written = write_daily_table(&daily_path, &report.daily)
            .and_then(|_| write_subject_table(&subject_path, &report.subjects));
        match written {
            Ok(()) => summary.tables.extend([daily_path, subject_path]),
            Err(e) => log.error(format!("Results for cohort {} not written: {:#}", cohort_id, e)),
        }
        summary.cohorts.push(report);
    }

    log.banner(&["END LOG"]);
    log.finish()
        .with_context(|| format!("Failed to flush {}", log_path.display()))?;
    Ok(summary)
}

pub fn analyze_cohort<W: Write>(
    log: &mut RunLog<W>,
    config: &AnalysisConfig,
    cohort_id: &str,
    cohort_dir: &Path,
) -> Result<CohortReport> {
    let subjects = list_subjects(cohort_id, cohort_dir, &config.subject_prefix)?;
    let classifier = FormatClassifier::new(cohort_id)?;

    let subject_ids: Vec<&str> = subjects.iter().map(|s| s.subject_id.as_str()).collect();
    log.section(&format!(
        "Subjects included in {} analysis: {:?}\n\
         Lower cutoff for pressure values: {}\n\
         Upper cutoff for pressure values: {}\n\
         Range for consecutive pressure value removal around zero: {}/{}",
        cohort_id,
        subject_ids,
        config.lower_cutoff,
        config.upper_cutoff,
        config.lower_range_for_delete,
        config.upper_range_for_delete
    ));

    let mut report = CohortReport {
        cohort_id: cohort_id.to_string(),
        ..CohortReport::default()
    };

    log.section("File preparation (merge & clean):");
    let mut prepared = Vec::with_capacity(subjects.len());
    for subject in &subjects {
        match prepare_subject(log, &classifier, subject) {
            Ok(Some(records)) => {
                report.days_merged += records.len();
                prepared.push((subject, records));
            }
            Ok(None) => report.subjects_skipped += 1,
            Err(e) => {
                log.error(format!(
                    "subject: {} skipped, merge failed: {:#}",
                    subject.subject_id, e
                ));
                report.subjects_skipped += 1;
            }
        }
    }

    if config.calc_treatment_time {
        log.section("Notes about excessive repeated values in total treatment time calculations:");
    }
    for (subject, records) in &prepared {
        let daily: Vec<DailyStats> = records
            .iter()
            .map(|record| day_stats(log, config, record))
            .collect();
        if let Some(stats) = SubjectStats::summarize(&subject.subject_id, &daily) {
            report.subjects.push(stats);
        }
        report.daily.extend(daily);
    }

    Ok(report)
}

/// Classifies, groups and merges one subject's files.
/// `Ok(None)` when the subject has no file in a known naming format.
pub fn prepare_subject<W: Write>(
    log: &mut RunLog<W>,
    classifier: &FormatClassifier,
    subject: &Subject,
) -> Result<Option<Vec<CanonicalDailyRecord>>> {
    let removed = remove_merge_artifacts(&subject.dir)?;
    if removed > 0 {
        debug!("{}: removed {} merge artifacts", subject.subject_id, removed);
    }

    let files = list_raw_files(subject)?;
    let Some(classified) = classifier.classify(files) else {
        log.info(format!(
            "No readable data for subject: {}... skipping subject.",
            subject.subject_id
        ));
        return Ok(None);
    };
    log.info(format!(
        "subject: {} data is in {}",
        subject.subject_id, classified.format
    ));
    for file in &classified.unmatched {
        log.warn(format!(
            "subject: {} file {} does not follow {}, not merged.",
            subject.subject_id, file.name, classified.format
        ));
    }

    let grouped = group_by_day(classified.format, classified.files);
    for file in &grouped.undated {
        log.warn(format!(
            "subject: {} file {} has no date token, ignored.",
            subject.subject_id, file.name
        ));
    }
    for token in &grouped.unparsed_tokens {
        log.warn(format!(
            "subject: {} date '{}' is not a calendar date; ordered after dated files.",
            subject.subject_id, token
        ));
    }
    if grouped.has_multi_part_days() {
        log.info(format!(
            "Multiple parts for at least 1 date for subject: {}... check participant log to ensure files are not multiple hours apart.",
            subject.subject_id
        ));
    }

    let mut records = Vec::with_capacity(grouped.groups.len());
    for group in &grouped.groups {
        let record = merge_group(group)?;
        let path = write_record(&record, &subject.dir)?;
        debug!(
            "{}: merged {} file(s) into {}",
            subject.subject_id,
            record.fragments,
            path.display()
        );
        records.push(record);
    }
    Ok(Some(records))
}

fn day_stats<W: Write>(
    log: &mut RunLog<W>,
    config: &AnalysisConfig,
    record: &CanonicalDailyRecord,
) -> DailyStats {
    let time = treatment_time(&record.samples, config);

    let pressure = config.calc_pressure_stats.then(|| {
        let cleaned = if config.exclude_idle_from_pressure {
            clean_pressure(&drop_idle_runs(&record.samples, &time.long_runs), config)
        } else {
            clean_pressure(&record.samples, config)
        };
        let stats = PressureStats::from_samples(&cleaned);
        if stats.is_undefined() {
            debug!("{}: no samples inside the pressure band", record.name);
        }
        stats
    });

    let treatment = config.calc_treatment_time.then(|| {
        for long_run in &time.long_runs {
            let seconds = long_run.run.len as f64 / config.sample_rate_hz;
            let decision = match long_run.decision {
                RunDecision::Excluded => "time removed from total treatment time",
                RunDecision::Retained => "time not removed from total treatment time",
            };
            log.info(format!(
                "Case for subject: {} {}: {} consecutive values of {} ({} s from row {}); values {} {}/{} of 0; {}.",
                record.subject_id,
                record.name,
                long_run.run.len,
                long_run.run.value,
                seconds,
                long_run.run.start,
                if long_run.decision == RunDecision::Excluded { "within" } else { "not within" },
                config.lower_range_for_delete,
                config.upper_range_for_delete,
                decision
            ));
        }
        TreatmentDuration {
            seconds: time.seconds,
            minutes: time.minutes,
        }
    });

    DailyStats {
        subject_id: record.subject_id.clone(),
        date_label: record.name.clone(),
        pressure,
        treatment,
    }
}
