//! The `relgraph run` command.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use relgraph_core::{
    AnnotationBuilder, Config, FixedScale, FsArtifactStore, FsSceneGraphLoader, ImageHeaderScale,
    ImageScale, PipelineOrchestrator, RunReport, TextVectorFile,
};

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Raw corpus root holding the scene-graph files and images
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Directory artifacts are read from and written to
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// word2vec/GloVe text file; without one the word-vector artifact is skipped
    #[arg(long)]
    pub vectors: Option<PathBuf>,

    /// Use an im_scale of 1.0 instead of reading image headers
    #[arg(long)]
    pub no_image_scale: bool,

    /// Pretty-print artifact JSON
    #[arg(long)]
    pub pretty: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.data_dir {
            config.general.data_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.general.output_dir = dir.clone();
        }
        if let Some(path) = &self.vectors {
            config.embedding.vectors_path = Some(path.clone());
        }
        if self.no_image_scale {
            config.image_scale.enabled = false;
        }
        if self.pretty {
            config.artifacts.pretty = true;
        }
    }
}

/// Execute the run command.
pub fn execute(args: RunArgs, mut config: Config) -> anyhow::Result<()> {
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    let loader = FsSceneGraphLoader::from_config(&config);
    let scale: Box<dyn ImageScale> = if config.image_scale.enabled {
        Box::new(ImageHeaderScale::new(config.images_dir(), &config.image_scale))
    } else {
        Box::new(FixedScale(1.0))
    };
    let embedder = config
        .vectors_path()
        .map(|path| TextVectorFile::new(path, config.embedding.dim));

    let output_dir = config.output_dir();
    tracing::info!("Writing artifacts to {:?}", output_dir);
    let store = FsArtifactStore::new(output_dir, config.artifacts.clone());

    let mut pipeline = PipelineOrchestrator::new(
        store,
        &loader,
        AnnotationBuilder::from_config(scale.as_ref(), &config),
    );
    if let Some(embedder) = &embedder {
        pipeline = pipeline.with_embedder(embedder);
    }

    let report = pipeline.run().context("Pipeline failed")?;
    print_report(&report, args.json)
}

fn print_report(report: &RunReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    for entry in &report.artifacts {
        println!("{:<24}{}", entry.artifact.name(), entry.outcome);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> RunArgs {
        RunArgs {
            data_dir: None,
            output_dir: None,
            vectors: None,
            no_image_scale: false,
            pretty: false,
            json: false,
        }
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let mut config = Config::default();
        RunArgs {
            data_dir: Some(PathBuf::from("/data/gqa")),
            vectors: Some(PathBuf::from("/data/glove.txt")),
            no_image_scale: true,
            pretty: true,
            ..args()
        }
        .apply(&mut config);

        assert_eq!(config.data_dir(), PathBuf::from("/data/gqa"));
        assert_eq!(config.vectors_path(), Some(PathBuf::from("/data/glove.txt")));
        assert!(!config.image_scale.enabled);
        assert!(config.artifacts.pretty);
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let mut config = Config::default();
        args().apply(&mut config);
        assert!(config.image_scale.enabled);
        assert!(config.embedding.vectors_path.is_none());
    }

    #[test]
    fn test_execute_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let graphs = dir.path().join("sceneGraphs");
        std::fs::create_dir_all(&graphs).unwrap();
        std::fs::write(
            graphs.join("train_sceneGraphs.json"),
            r#"{"1": {"width": 20, "height": 20, "objects": {
                "10": {"name": "dog", "x": 0, "y": 0, "w": 5, "h": 10,
                       "relations": [{"name": "wearing", "object": "11"}]},
                "11": {"name": "leash", "x": 5, "y": 5, "w": 3, "h": 10}
            }}}"#,
        )
        .unwrap();
        std::fs::write(graphs.join("val_sceneGraphs.json"), "{}").unwrap();

        let out = dir.path().join("out");
        execute(
            RunArgs {
                data_dir: Some(dir.path().to_path_buf()),
                output_dir: Some(out.clone()),
                no_image_scale: true,
                ..args()
            },
            Config::default(),
        )
        .unwrap();

        assert!(out.join("preddet.json").is_file());
        assert!(out.join("predcls_probabilities.json").is_file());
        assert!(!out.join("word2vec.json").exists());
    }
}
