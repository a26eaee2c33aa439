use crate::config::AnalysisConfig;

/// Values strictly inside the configured pressure band.
pub fn clean_pressure(samples: &[f64], config: &AnalysisConfig) -> Vec<f64> {
    samples
        .iter()
        .copied()
        .filter(|&v| config.in_pressure_band(v))
        .collect()
}

/// A maximal span of bit-identical consecutive samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Run {
    pub start: usize,
    pub len: usize,
    pub value: f64,
}

pub fn find_runs(samples: &[f64]) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for (idx, &value) in samples.iter().enumerate() {
        match runs.last_mut() {
            Some(run) if run.value.to_bits() == value.to_bits() => run.len += 1,
            _ => runs.push(Run {
                start: idx,
                len: 1,
                value,
            }),
        }
    }
    runs
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunDecision {
    /// Repeated value lies in the zero band: idle time, removed.
    Excluded,
    /// Sustained genuine reading: still counted as treatment.
    Retained,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LongRun {
    pub run: Run,
    pub decision: RunDecision,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreatmentTime {
    pub total_samples: usize,
    pub treatment_samples: usize,
    pub seconds: f64,
    pub minutes: f64,
    pub long_runs: Vec<LongRun>,
}

/// Runs longer than the threshold, each with its idle/treatment decision.
pub fn long_runs(samples: &[f64], config: &AnalysisConfig) -> Vec<LongRun> {
    find_runs(samples)
        .into_iter()
        .filter(|run| run.len > config.run_length_threshold_samples)
        .map(|run| LongRun {
            run,
            decision: if config.in_zero_band(run.value) {
                RunDecision::Excluded
            } else {
                RunDecision::Retained
            },
        })
        .collect()
}

/// `samples` without the excluded (idle) runs.
pub fn drop_idle_runs(samples: &[f64], long_runs: &[LongRun]) -> Vec<f64> {
    let mut kept = Vec::with_capacity(samples.len());
    let mut next = 0;
    for long_run in long_runs
        .iter()
        .filter(|r| r.decision == RunDecision::Excluded)
    {
        kept.extend_from_slice(&samples[next..long_run.run.start]);
        next = long_run.run.start + long_run.run.len;
    }
    kept.extend_from_slice(&samples[next..]);
    kept
}

/// Recording duration minus idle stretches. Works on the uncleaned series.
pub fn treatment_time(samples: &[f64], config: &AnalysisConfig) -> TreatmentTime {
    let long_runs = long_runs(samples, config);

    let excluded: usize = long_runs
        .iter()
        .filter(|r| r.decision == RunDecision::Excluded)
        .map(|r| r.run.len)
        .sum();
    let treatment_samples = samples.len() - excluded;
    let seconds = treatment_samples as f64 / config.sample_rate_hz;

    TreatmentTime {
        total_samples: samples.len(),
        treatment_samples,
        seconds,
        minutes: seconds / 60.0,
        long_runs,
    }
}
