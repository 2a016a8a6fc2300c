use clap::{Parser, Subcommand};

use self::{race::RaceArg, train::TrainArg};

mod race;
mod train;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Train kart drivers using neuroevolution
    Train(#[clap(flatten)] TrainArg),
    /// Race the best trained driver of a track once
    Race(#[clap(flatten)] RaceArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Train(arg) => train::run(&arg)?,
        Mode::Race(arg) => race::run(&arg)?,
    }
    Ok(())
}
