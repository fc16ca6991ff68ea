use std::{
    fs::File,
    io::{self, BufWriter, StdoutLock, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context;
use gazestat_analysis::{
    anchor::WordWindow,
    catalog::{Catalog, CatalogRow},
    config::AnalysisConfig,
    sample::GazeSample,
};

#[derive(Debug)]
pub enum Output {
    Stdout {
        writer: StdoutLock<'static>,
    },
    File {
        writer: BufWriter<File>,
        path: PathBuf,
    },
}

impl Output {
    pub fn save_json<T>(value: &T, output_path: Option<PathBuf>) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        let mut output = Output::from_output_path(output_path)?;
        output.write_json(value)?;
        tracing::info!(path = %output.display_path(), "report written");
        Ok(())
    }

    pub fn from_output_path(output_path: Option<PathBuf>) -> anyhow::Result<Self> {
        match output_path {
            Some(path) => Output::open(path),
            None => Ok(Output::stdout()),
        }
    }

    pub fn stdout() -> Self {
        Output::Stdout {
            writer: io::stdout().lock(),
        }
    }

    pub fn open(path: PathBuf) -> anyhow::Result<Self> {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Output::File {
            writer: BufWriter::new(file),
            path,
        })
    }

    pub fn display_path(&self) -> String {
        match self {
            Output::Stdout { .. } => "stdout".to_string(),
            Output::File { path, .. } => path.display().to_string(),
        }
    }

    pub fn write_json<T>(&mut self, value: T) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        serde_json::to_writer_pretty(&mut *self, &value)
            .with_context(|| format!("Failed to write JSON to {}", self.display_path()))?;
        writeln!(&mut *self).with_context(|| {
            format!(
                "Failed to write newline after JSON to {}",
                self.display_path()
            )
        })?;
        self.flush()
            .with_context(|| format!("Failed to flush output to {}", self.display_path()))?;
        Ok(())
    }
}

impl io::Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout { writer } => writer.write(buf),
            Output::File { writer, .. } => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout { writer } => writer.flush(),
            Output::File { writer, .. } => writer.flush(),
        }
    }
}

pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {} file: {}", file_kind, path.display()))?;

    let reader = io::BufReader::new(file);
    let value = serde_json::from_reader(reader).with_context(|| {
        format!(
            "Failed to parse {} JSON file: {}",
            file_kind,
            path.display()
        )
    })?;

    Ok(value)
}

/// Reads gaze samples (a JSON array of sample objects).
pub fn read_samples_file<P>(path: P) -> anyhow::Result<Vec<GazeSample>>
where
    P: AsRef<Path>,
{
    let samples: Vec<GazeSample> = read_json_file("samples", path)?;
    tracing::info!(samples = samples.len(), "loaded gaze samples");
    Ok(samples)
}

/// Reads the test catalog (a JSON array of catalog rows).
pub fn read_catalog_file<P>(path: P) -> anyhow::Result<Catalog>
where
    P: AsRef<Path>,
{
    let rows: Vec<CatalogRow> = read_json_file("catalog", path)?;
    tracing::info!(tests = rows.len(), "loaded test catalog");
    Ok(Catalog::new(rows))
}

/// Reads word windows, or returns none when no path is given.
pub fn read_words_file(path: Option<&Path>) -> anyhow::Result<Vec<WordWindow>> {
    match path {
        Some(path) => read_json_file("word windows", path),
        None => Ok(vec![]),
    }
}

/// Reads the analysis configuration, or the defaults when no path is given.
///
/// The selection is sanitized either way.
pub fn read_config_file(path: Option<&Path>) -> anyhow::Result<AnalysisConfig> {
    let config: AnalysisConfig = match path {
        Some(path) => read_json_file("config", path)?,
        None => AnalysisConfig::default(),
    };
    Ok(config.sanitized())
}
