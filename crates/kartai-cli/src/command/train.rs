use std::path::PathBuf;

use anyhow::Context as _;
use kartai_brain::network::Perceptron;
use kartai_training::{session::TrainingSession, store::ModelStore};

use crate::util;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct TrainArg {
    /// Number of generations to train [default: 50]
    generations: Option<usize>,
    /// Track to train on [default: circuit]
    #[arg(long)]
    track: Option<String>,
    /// Directory containing `<track>.json` fixtures
    #[arg(long, default_value = "tracks")]
    tracks_dir: PathBuf,
    /// Directory model artifacts are written to
    #[arg(long, default_value = "models")]
    models_dir: PathBuf,
    /// Training configuration JSON file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seed of the evolution RNG
    #[arg(long)]
    seed: Option<u64>,
    /// Number of individuals per generation
    #[arg(long)]
    population: Option<usize>,
}

pub(crate) fn run(arg: &TrainArg) -> anyhow::Result<()> {
    let TrainArg {
        generations,
        track,
        tracks_dir,
        models_dir,
        config,
        seed,
        population,
    } = arg;

    let mut config = util::read_training_config(config.as_deref())?;
    if let Some(generations) = generations {
        config.generations = *generations;
    }
    if let Some(track) = track {
        config.track.clone_from(track);
    }
    if let Some(seed) = seed {
        config.seed = Some(*seed);
    }
    if let Some(population) = population {
        config.population_size = *population;
    }

    let track = util::load_track(tracks_dir, &config.track)?;
    let store = ModelStore::new(models_dir, &*config.track, config.sensors.clone());
    let mut session = TrainingSession::<Perceptron>::new(&config, &track, &store)
        .context("Invalid training configuration")?;

    tracing::info!(
        track = %config.track,
        generations = config.generations,
        population = config.population_size,
        topology = %config.topology,
        "training started"
    );

    let summary = session.run(|report| {
        eprintln!(
            "Generation #{:3}: best {:10.3}  mean {:10.3}  median {:10.3}  min {:10.3}  std dev {:9.3}  disqualified {:3}  mutation {:.3}  new blood {:.3}  ({})",
            report.generation,
            report.best,
            report.mean,
            report.median,
            report.min,
            report.std_dev,
            report.disqualified,
            report.mutation_rate,
            report.new_blood_rate,
            report.adaptation,
        );
    });

    eprintln!();
    eprintln!("Training completed");
    eprintln!("  Track: {}", config.track);
    eprintln!("  Generations: {}", summary.generations);
    eprintln!("  Final best fitness: {:.3}", summary.final_best);
    match summary.best_ever {
        Some(record) => {
            eprintln!(
                "  Best model: {:.3} (generation {})",
                record.fitness, record.generation
            );
            eprintln!("  Path: {}", store.best_path().display());
        }
        None => eprintln!("  No driver finished without disqualification; best model not saved"),
    }

    Ok(())
}
