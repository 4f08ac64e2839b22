//! Async streaming example for archetype_streamable
//!
//! Run with: cargo run --example tokio_streaming --features runtime-tokio -- <asset dir> <asset>...

use archetype_streamable::{
    AssetId, FileSource, LoadOutcome, RequestRegistry, SpawnedLoader, TokioSpawner,
};
use anyhow::Context;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let root = args.next().context("usage: tokio_streaming <asset dir> <asset>...")?;
    let assets: Vec<String> = args.collect();
    anyhow::ensure!(!assets.is_empty(), "no assets given");

    let spawner = TokioSpawner::current().context("not inside a tokio runtime")?;
    let registry = RequestRegistry::with_loader(SpawnedLoader::new(spawner, FileSource::new(root)));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let request = registry.request_assets_with(assets.iter(), move |asset: &AssetId, outcome| {
        let _ = tx.send((asset.clone(), outcome));
    })?;

    for _ in 0..registry.request_assets_of(request).map_or(0, |a| a.len()) {
        let Some((asset, outcome)) = rx.recv().await else {
            break;
        };
        match outcome {
            LoadOutcome::Loaded { .. } => {
                let size = registry.loader().get(&asset).map_or(0, |bytes| bytes.len());
                println!("{asset}: {size} bytes");
            }
            LoadOutcome::Failed => println!("{asset}: failed"),
        }
    }

    println!(
        "Resident: {} bytes across {} assets",
        registry.loader().store().memory_usage(),
        registry.loader().store().len()
    );
    registry.release_assets(request)?;
    Ok(())
}
