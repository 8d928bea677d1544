//! The `relgraph status` command.

use std::path::PathBuf;

use clap::Args;
use relgraph_core::{Artifact, ArtifactGraph, Config, FsArtifactStore};

/// Arguments for the `status` command.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Artifact directory to inspect
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

/// Execute the status command.
pub fn execute(args: StatusArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(dir) = args.output_dir {
        config.general.output_dir = dir;
    }
    let store = FsArtifactStore::new(config.output_dir(), config.artifacts.clone());
    for line in status_lines(&store) {
        println!("{line}");
    }
    Ok(())
}

fn status_lines(store: &FsArtifactStore) -> Vec<String> {
    let graph = ArtifactGraph::from_store(store);
    Artifact::ALL
        .iter()
        .map(|&artifact| {
            format!(
                "{:<24}{:<8}{}",
                artifact.name(),
                graph.status(artifact),
                store.path(artifact).display()
            )
        })
        .collect()
}
