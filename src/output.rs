use crate::statistics::{DailyStats, PressureStats, SubjectStats};
use anyhow::{Context, Result};
use log::info;
use std::path::{Path, PathBuf};

pub const DAILY_HEADER: [&str; 12] = [
    "subj_name",
    "date",
    "min_p",
    "max_p",
    "mean_p",
    "median_p",
    "skew_p",
    "kurtosis_p",
    "sd_p",
    "IQR_p",
    "txtime_sec",
    "txtime_min",
];

pub const SUBJECT_HEADER: [&str; 6] = [
    "subj_name",
    "overall_mean_p",
    "overall_sd_p",
    "mean_txtime_sec",
    "mean_txtime_min",
    "number_tx_days",
];

/// `NaN` for an undefined statistic.
fn stat(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "NaN".to_string())
}

/// Output file paths for one cohort of one run.
pub fn table_paths(output_dir: &Path, study_name: &str, cohort_id: &str, stamp: &str) -> (PathBuf, PathBuf) {
    (
        output_dir.join(format!("{}_{}_resultsbydate_{}.csv", study_name, cohort_id, stamp)),
        output_dir.join(format!("{}_{}_resultsbysubj_{}.csv", study_name, cohort_id, stamp)),
    )
}

pub fn write_daily_table(path: &Path, days: &[DailyStats]) -> Result<()> {
    info!("Writing daily results to {}", path.display());
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(DAILY_HEADER)?;

    for day in days {
        // Columns of a switched-off statistic are left empty.
        let pressure: Vec<String> = match &day.pressure {
            Some(p) => pressure_columns(p).into_iter().map(stat).collect(),
            None => vec![String::new(); 8],
        };
        let (seconds, minutes) = match &day.treatment {
            Some(t) => (t.seconds.to_string(), t.minutes.to_string()),
            None => (String::new(), String::new()),
        };

        let mut record = Vec::with_capacity(DAILY_HEADER.len());
        record.push(day.subject_id.clone());
        record.push(day.date_label.clone());
        record.extend(pressure);
        record.push(seconds);
        record.push(minutes);
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

fn pressure_columns(p: &PressureStats) -> [Option<f64>; 8] {
    [
        p.min, p.max, p.mean, p.median, p.skewness, p.kurtosis, p.std_dev, p.iqr,
    ]
}

pub fn write_subject_table(path: &Path, subjects: &[SubjectStats]) -> Result<()> {
    info!("Writing subject results to {}", path.display());
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(SUBJECT_HEADER)?;

    for subject in subjects {
        let (mean, sd) = match &subject.pressure {
            Some(p) => (stat(p.overall_mean), stat(p.overall_sd)),
            None => (String::new(), String::new()),
        };
        let (seconds, minutes) = match &subject.treatment {
            Some(t) => (t.mean_seconds.to_string(), t.mean_minutes.to_string()),
            None => (String::new(), String::new()),
        };
        writer.write_record([
            subject.subject_id.clone(),
            mean,
            sd,
            seconds,
            minutes,
            subject.treatment_days.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
