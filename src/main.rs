use acuwand_analysis::config::{AnalysisConfig, Args, Command};
use acuwand_analysis::pipeline::run_analysis;
use acuwand_analysis::validator::run_validation;
use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    match args.command {
        Command::Analyze(analyze) => {
            let config = AnalysisConfig::from_analyze_args(&analyze)?;
            let input_dir = &analyze.layout.input_dir;
            let output_dir = analyze.layout.output_dir.as_ref().unwrap_or(input_dir);

            let summary = run_analysis(&config, input_dir, output_dir)?;

            println!(
                "Processed {} subjects across {} cohorts ({} skipped), merged {} days",
                summary.subjects_processed(),
                summary.cohorts.len(),
                summary.subjects_skipped(),
                summary.days_merged()
            );
            for table in &summary.tables {
                println!("  {}", table.display());
            }
            println!("Log written to {}", summary.log_path.display());
        }
        Command::Validate(layout) => {
            let config = AnalysisConfig::from_layout_args(&layout)?;
            let output_dir = layout.output_dir.as_ref().unwrap_or(&layout.input_dir);

            let summary = run_validation(&config, &layout.input_dir, output_dir)?;

            println!(
                "Checked {} files in {} subjects, {} naming issues",
                summary.files_checked,
                summary.subjects_checked,
                summary.issues.len()
            );
            for issue in &summary.issues {
                println!(
                    "  {}/{} {}: {}",
                    issue.cohort_id, issue.subject_id, issue.file_name, issue.kind
                );
            }
            println!("Log written to {}", summary.log_path.display());
        }
    }

    Ok(())
}
