//! The `relgraph inspect` command: dump remapped records with label names.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, ValueEnum};
use relgraph_core::output::OutputFormat as CoreOutputFormat;
use relgraph_core::{
    AnnotationRecord, Artifact, ArtifactStore, Config, FsArtifactStore, LabelRemapper,
    OutputWriter, RemappedAnnotationSet, TaskMode, Vocabulary,
};

/// Arguments for the `inspect` command.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Annotation set to read
    #[arg(value_enum)]
    pub artifact: AnnotationSet,

    /// Print at most this many records
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Artifact directory to read from
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

/// Remapped annotation sets.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum AnnotationSet {
    /// Predicate detection
    Preddet,
    /// Predicate classification
    Predcls,
}

impl From<AnnotationSet> for TaskMode {
    fn from(set: AnnotationSet) -> Self {
        match set {
            AnnotationSet::Preddet => TaskMode::Detection,
            AnnotationSet::Predcls => TaskMode::Classification,
        }
    }
}

/// Supported output formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON array
    Json,
    /// One JSON object per line (newline-delimited)
    Jsonl,
}

impl From<OutputFormat> for CoreOutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => CoreOutputFormat::Json,
            OutputFormat::Jsonl => CoreOutputFormat::JsonLines,
        }
    }
}

/// Execute the inspect command.
pub fn execute(args: InspectArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(dir) = &args.output_dir {
        config.general.output_dir = dir.clone();
    }
    let store = FsArtifactStore::new(config.output_dir(), config.artifacts.clone());
    let records = decoded_records(&store, args.artifact.into(), args.limit)?;

    let stdout = std::io::stdout();
    let mut writer = OutputWriter::new(stdout.lock(), args.format.into(), true);
    writer.write_all(&records)?;
    writer.flush()?;
    tracing::debug!("Printed {} records", writer.items_written());
    Ok(())
}

fn decoded_records(
    store: &impl ArtifactStore,
    mode: TaskMode,
    limit: Option<usize>,
) -> anyhow::Result<Vec<AnnotationRecord>> {
    let artifact = Artifact::annotations(mode);
    let set: RemappedAnnotationSet = store
        .load(artifact)
        .with_context(|| format!("No {artifact} annotations; run `relgraph run` first"))?;
    let predicates: Vocabulary = store.load(Artifact::Predicates)?;
    let objects: Vocabulary = store.load(Artifact::Objects)?;
    set.check_vocabularies(&predicates, &objects)?;

    set.records
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|record| {
            LabelRemapper::decode(record, &predicates, &objects)
                .with_context(|| format!("Cannot decode {}", record.filename))
        })
        .collect()
}
