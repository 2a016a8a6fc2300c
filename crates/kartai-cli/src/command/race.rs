use std::path::PathBuf;

use anyhow::Context as _;
use kartai_brain::{cache::BrainCache, network::Perceptron};
use kartai_training::simulator::RaceSimulator;

use crate::{
    schema::race_report::RaceReport,
    util::{self, Output},
};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct RaceArg {
    /// Track to race on
    #[arg(long, default_value = "circuit")]
    track: String,
    /// Directory containing `<track>.json` fixtures
    #[arg(long, default_value = "tracks")]
    tracks_dir: PathBuf,
    /// Directory containing trained model artifacts
    #[arg(long, default_value = "models")]
    models_dir: PathBuf,
    /// Training configuration JSON file providing the race settings
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &RaceArg) -> anyhow::Result<()> {
    let RaceArg {
        track: track_name,
        tracks_dir,
        models_dir,
        config,
        output,
    } = arg;

    let config = util::read_training_config(config.as_deref())?;
    let track = util::load_track(tracks_dir, track_name)?;

    let mut cache = BrainCache::<Perceptron>::new(models_dir);
    let loaded = cache
        .get_or_load(track_name)
        .with_context(|| format!("Failed to load best model of track `{track_name}`"))?;

    let simulator = RaceSimulator::new(&track, &loaded.sensors, &config.race);
    let outcome = simulator
        .run(&loaded.brain)
        .context("Model cannot drive with its sensor layout")?;

    let report = RaceReport {
        track: track_name.clone(),
        model_generation: loaded.generation,
        model_fitness: loaded.fitness,
        end: outcome.end.to_string(),
        disqualified: outcome.disqualified,
        fitness: outcome.fitness,
        time: outcome.time,
        progress: outcome.progress,
    };
    Output::save_json(&report, output.as_deref())?;

    eprintln!();
    eprintln!("Race completed");
    eprintln!("  Track: {}", report.track);
    eprintln!(
        "  Model: generation {} (fitness {:.3})",
        report.model_generation, report.model_fitness
    );
    eprintln!("  End: {}", report.end);
    eprintln!("  Time: {:.2}s", report.time);
    eprintln!("  Fitness: {:.3}", report.fitness);

    Ok(())
}
