//! Basic request/release example for archetype_streamable

use archetype_streamable::{MockLoader, RegistryConfig, RequestRegistry};

fn main() -> anyhow::Result<()> {
    // A mock loader stands in for the host's streamer
    let loader = MockLoader::new();
    let registry = RequestRegistry::new(loader.clone(), RegistryConfig::default());

    println!("archetype_streamable v{}", archetype_streamable::VERSION);

    let level = registry.request_assets_with(
        ["meshes/rock.glb", "textures/rock.png"],
        |asset, outcome| println!("level: {asset} -> {outcome:?}"),
    )?;
    loader.complete_all();

    // Already loaded, so this fires before request_assets_with returns
    let hud = registry.request_assets_with(["textures/rock.png"], |asset, outcome| {
        println!("hud: {asset} -> {outcome:?}")
    })?;

    registry.release_assets(level)?;
    println!("Still tracked after level release: {}", registry.tracked_asset_count());

    registry.release_assets(hud)?;
    println!("Unloaded: {:?}", loader.unload_calls());

    if let Err(err) = registry.release_assets(hud) {
        println!("Second release rejected: {err}");
    }
    Ok(())
}
