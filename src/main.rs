use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use log::info;

use livability::config::StudyConfig;
use livability::criteria::Group;
use livability::io::{load_inputs, read_study_file, write_segments, write_summary};
use livability::study::Study;

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_target(false)
        .format_timestamp(None)
        .target(env_logger::Target::Stderr)
        .init();

    let Some(study_path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        bail!("usage: livability <study.json>");
    };
    info!("Loading study {}", study_path.display());

    let study_file = read_study_file(&study_path)?;
    let config = StudyConfig::try_from(study_file.config.clone())
        .with_context(|| format!("Invalid parameters in {}", study_path.display()))?;
    if config.incident_filter.active_on.is_none() && study_file.datasets.incidents.is_some() {
        info!("No incidents_active_on date given, every incident is kept whatever its period");
    }
    let inputs = load_inputs(&study_file)?;

    let study = Study::new(config)
        .with_parallel(study_file.parallel)
        .with_progress(true);
    let output = study.run(&inputs).context("Scoring failed")?;

    write_segments(
        &study_file.resolve(&study_file.output.segments),
        &output.segments,
        study.registry(),
    )?;
    write_summary(
        &study_file.resolve(&study_file.output.summary),
        &output.summary,
    )?;

    for group in [Group::Circulation, Group::Accessibility] {
        if let Some(index) = output.group_index(group) {
            info!("{} index for '{}': {:.4}", group, study.config().study_name, index);
        }
    }
    Ok(())
}
