//! Descriptive statistics per subject-day and per subject.
//!
//! An undefined statistic (empty record after cleaning, too few samples, no
//! spread) is `None` all the way to the report, where it is written as `NaN`.

use statrs::statistics::Statistics;

fn defined(value: f64) -> Option<f64> {
    (!value.is_nan()).then_some(value)
}

fn mean_of<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let values: Vec<f64> = values.into_iter().collect();
    defined(values.iter().mean())
}

/// Linear interpolation between the closest ranks of `sorted`.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PressureStats {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    /// Adjusted Fisher-Pearson skewness, needs three samples.
    pub skewness: Option<f64>,
    /// Excess kurtosis, bias corrected, needs four samples.
    pub kurtosis: Option<f64>,
    pub std_dev: Option<f64>,
    pub iqr: Option<f64>,
}

impl PressureStats {
    /// Statistics of an already cleaned pressure series.
    pub fn from_samples(cleaned: &[f64]) -> Self {
        if cleaned.is_empty() {
            return PressureStats::default();
        }

        let mut sorted = cleaned.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = cleaned.len() as f64;
        let mean = cleaned.iter().mean();
        let (m2, m3, m4) = cleaned.iter().fold((0.0, 0.0, 0.0), |(m2, m3, m4), &x| {
            let d = x - mean;
            let d2 = d * d;
            (m2 + d2, m3 + d2 * d, m4 + d2 * d2)
        });
        let (m2, m3, m4) = (m2 / n, m3 / n, m4 / n);

        // Bias-corrected sample estimators (G1, excess G2), matching the
        // n-1 standard deviation.
        let skewness = (cleaned.len() >= 3 && m2 > 0.0).then(|| {
            let g1 = m3 / m2.powf(1.5);
            g1 * (n * (n - 1.0)).sqrt() / (n - 2.0)
        });
        let kurtosis = (cleaned.len() >= 4 && m2 > 0.0).then(|| {
            let g2 = m4 / (m2 * m2) - 3.0;
            ((n + 1.0) * g2 + 6.0) * (n - 1.0) / ((n - 2.0) * (n - 3.0))
        });

        let q1 = quantile(&sorted, 0.25);
        let q3 = quantile(&sorted, 0.75);

        PressureStats {
            min: sorted.first().copied(),
            max: sorted.last().copied(),
            mean: defined(mean),
            median: quantile(&sorted, 0.5),
            skewness,
            kurtosis,
            std_dev: defined(cleaned.iter().std_dev()),
            iqr: q1.zip(q3).map(|(q1, q3)| q3 - q1),
        }
    }

    pub fn is_undefined(&self) -> bool {
        self.mean.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreatmentDuration {
    pub seconds: f64,
    pub minutes: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyStats {
    pub subject_id: String,
    pub date_label: String,
    /// `None` when pressure statistics are switched off.
    pub pressure: Option<PressureStats>,
    /// `None` when treatment time is switched off.
    pub treatment: Option<TreatmentDuration>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubjectPressure {
    pub overall_mean: Option<f64>,
    pub overall_sd: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubjectTreatment {
    pub mean_seconds: f64,
    pub mean_minutes: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubjectStats {
    pub subject_id: String,
    /// `None` when pressure statistics are switched off.
    pub pressure: Option<SubjectPressure>,
    /// `None` when treatment time is switched off.
    pub treatment: Option<SubjectTreatment>,
    pub treatment_days: usize,
}

impl SubjectStats {
    /// Mean of the per-day values; undefined days are left out, not zeroed.
    /// `None` for a subject without any day.
    pub fn summarize(subject_id: &str, days: &[DailyStats]) -> Option<Self> {
        if days.is_empty() {
            return None;
        }
        let pressure: Vec<PressureStats> = days.iter().filter_map(|d| d.pressure).collect();
        let treatment: Vec<TreatmentDuration> = days.iter().filter_map(|d| d.treatment).collect();

        let pressure = (!pressure.is_empty()).then(|| SubjectPressure {
            overall_mean: mean_of(pressure.iter().filter_map(|p| p.mean)),
            overall_sd: mean_of(pressure.iter().filter_map(|p| p.std_dev)),
        });
        let treatment = mean_of(treatment.iter().map(|t| t.seconds))
            .zip(mean_of(treatment.iter().map(|t| t.minutes)))
            .map(|(mean_seconds, mean_minutes)| SubjectTreatment {
                mean_seconds,
                mean_minutes,
            });

        Some(SubjectStats {
            subject_id: subject_id.to_string(),
            pressure,
            treatment,
            treatment_days: days.len(),
        })
    }
}
