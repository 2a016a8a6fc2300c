use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use kartai_engine::Track;
use kartai_training::config::TrainingConfig;
use serde::{Serialize, de::DeserializeOwned};

/// Where a JSON report goes: stdout, or a file when a path was given.
#[derive(Debug)]
pub enum Output {
    Stdout(io::StdoutLock<'static>),
    File(BufWriter<File>, PathBuf),
}

impl Output {
    /// Writes `value` as pretty JSON to `path`, or to stdout if `path` is `None`.
    pub fn save_json<T>(value: &T, path: Option<&Path>) -> anyhow::Result<()>
    where
        T: Serialize,
    {
        let mut output = match path {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                Output::File(BufWriter::new(file), path.to_owned())
            }
            None => Output::Stdout(io::stdout().lock()),
        };
        output
            .write_pretty(value)
            .with_context(|| format!("Failed to write JSON to {}", output.name()))
    }

    fn write_pretty<T>(&mut self, value: &T) -> anyhow::Result<()>
    where
        T: Serialize,
    {
        serde_json::to_writer_pretty(&mut *self, value)?;
        writeln!(self)?;
        self.flush()?;
        Ok(())
    }

    fn name(&self) -> String {
        match self {
            Output::Stdout(_) => "stdout".to_owned(),
            Output::File(_, path) => path.display().to_string(),
        }
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout(w) => w.write(buf),
            Output::File(w, _) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout(w) => w.flush(),
            Output::File(w, _) => w.flush(),
        }
    }
}

pub fn read_json_file<T>(file_kind: &str, path: &Path) -> anyhow::Result<T>
where
    T: DeserializeOwned,
{
    let file = File::open(path)
        .with_context(|| format!("Failed to open {file_kind} file: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {file_kind} file: {}", path.display()))
}

/// Reads a training configuration, or the defaults when no file is given.
pub fn read_training_config(path: Option<&Path>) -> anyhow::Result<TrainingConfig> {
    path.map_or_else(
        || Ok(TrainingConfig::default()),
        |path| read_json_file("training config", path),
    )
}

/// Loads `<tracks_dir>/<track>.json`.
pub fn load_track(tracks_dir: &Path, track: &str) -> anyhow::Result<Track> {
    let path = tracks_dir.join(format!("{track}.json"));
    Track::load(&path).with_context(|| format!("Failed to load track `{track}`"))
}
