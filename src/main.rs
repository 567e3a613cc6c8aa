//! Ashworld - Entry Point
//!
//! Headless runner for the simulation core: loads the data files,
//! builds a world, steps the scheduler, and logs the narrative events
//! that a renderer would normally display.

use std::fs;
use std::path::PathBuf;

use ashworld::core::config::SimConfig;
use ashworld::core::error::Result;
use ashworld::entity::{Entity, TemplateLibrary};
use ashworld::world::loader::{load_features, load_map, MaterialLibrary};
use ashworld::world::World;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "Headless ashworld simulation runner")]
struct Args {
    /// Map name under the data directory
    #[arg(long, default_value = "arena")]
    map: String,

    /// Data directory holding materials, templates, and maps
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// World RNG seed
    #[arg(long, default_value_t = 4)]
    seed: u64,

    /// Number of scheduler ticks to run
    #[arg(long, default_value_t = 200)]
    ticks: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "ashworld=debug".into()),
        )
        .init();

    let args = Args::parse();
    tracing::info!(map = %args.map, seed = args.seed, "ashworld starting");

    let materials = MaterialLibrary::load(&fs::read_to_string(
        args.data_dir.join("materials.json"),
    )?)?;
    let features = load_features(&fs::read_to_string(args.data_dir.join("features.json"))?)?;
    let mut templates = TemplateLibrary::new();
    for entry in fs::read_dir(args.data_dir.join("templates"))? {
        templates.load(&fs::read_to_string(entry?.path())?)?;
    }

    let defs_text = fs::read_to_string(
        args.data_dir
            .join("maps")
            .join(format!("{}_defs.json", args.map)),
    )?;
    let map_text = fs::read_to_string(
        args.data_dir.join("maps").join(format!("{}.map", args.map)),
    )?;
    let (map, spawn_points) = load_map(&materials, &features, &defs_text, &map_text)?;

    let config_path = args.data_dir.join("config.toml");
    let config = match fs::read_to_string(&config_path) {
        Ok(text) => SimConfig::from_toml(&text)?,
        Err(_) => SimConfig::default(),
    };

    let mut world = World::new(map, config, args.seed);
    for spawn in &spawn_points {
        // Spawn directives compose layered templates with '+'.
        let layers: Vec<&str> = spawn.template.split('+').collect();
        let data = templates.compose(&layers)?;
        let material_name = data.material.clone().unwrap_or_else(|| "flesh".into());
        let material = materials.get(&material_name)?.clone();
        let entity = Entity::from_template_data(
            &spawn.template,
            Some(spawn.position),
            &data,
            material,
            false,
        );
        let id = world.add_entity(entity);
        tracing::debug!(template = %spawn.template, position = ?spawn.position, ?id, "spawned");
    }

    for _ in 0..args.ticks {
        world.tick();
        for event in world.drain_events() {
            tracing::info!(tick = world.current_tick, "{}", event.primary());
        }
    }

    tracing::info!(ticks = args.ticks, "run complete");
    Ok(())
}
