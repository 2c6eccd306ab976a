//! Tessera - sparse-set entity component registry
//!
//! Demo entry point: runs a small particle simulation on a registry.
//! Usage: `tessera [config.toml]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use tessera_core::RegistryConfig;
use tessera_ecs::{EcsError, Entity, Registry};

const PARTICLES: usize = 64;
const TICKS: u32 = 8;

#[derive(Debug, Clone, Copy)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy)]
struct Velocity {
    dx: f32,
    dy: f32,
}

/// Ticks left before a particle expires.
#[derive(Debug, Clone, Copy)]
struct Lifetime(u32);

fn load_config() -> Result<RegistryConfig> {
    match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => RegistryConfig::load(&path)
            .with_context(|| format!("Failed to load registry config {}", path.display())),
        None => Ok(RegistryConfig::default()),
    }
}

fn spawn_particles(registry: &mut Registry) -> Result<Vec<Entity>> {
    let mut spawned = Vec::with_capacity(PARTICLES);
    for i in 0..PARTICLES {
        let e = registry.new_entity();
        let f = i as f32;
        registry.add_component(e, Position { x: f, y: 0.0 })?;
        // Every third particle is static scenery.
        if i % 3 != 0 {
            registry.add_component(e, Velocity { dx: 1.0, dy: f * 0.1 })?;
        }
        if i % 4 == 0 {
            registry.add_component(e, Lifetime(2 + (i as u32 % 5)))?;
        }
        spawned.push(e);
    }
    Ok(spawned)
}

fn tick(registry: &mut Registry) -> usize {
    let moved = registry.view_mut::<(Position, Velocity)>(|_, (pos, vel)| {
        pos.x += vel.dx;
        pos.y += vel.dy;
    });

    let mut expired = Vec::new();
    registry.each_mut::<Lifetime>(|entity, lifetime| {
        lifetime.0 = lifetime.0.saturating_sub(1);
        if lifetime.0 == 0 {
            expired.push(entity);
        }
    });
    for entity in &expired {
        registry.remove_entity(*entity);
    }

    info!(
        "Moved {} particles, expired {}, {} alive",
        moved,
        expired.len(),
        registry.entity_count()
    );
    expired.len()
}

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")?;

    info!("Starting Tessera demo...");

    let config = load_config()?;
    info!(
        "Sparse capacity: initial {}, max {}",
        config.effective_initial_capacity(),
        config.max_sparse_capacity
    );

    let mut registry = Registry::with_config(config);
    let particles = spawn_particles(&mut registry)?;
    info!(
        "Spawned {} particles across {} component types",
        particles.len(),
        registry.component_type_count()
    );

    for _ in 0..TICKS {
        tick(&mut registry);
    }

    // Freed ids come back before fresh ones.
    let respawned = registry.new_entity();
    info!("Respawned entity {} with components {:?}", respawned, registry.component_names(respawned));

    let out_of_range = Entity::from_raw(config.max_sparse_capacity as u64);
    match registry.add_component(out_of_range, Position { x: 0.0, y: 0.0 }) {
        Err(EcsError::CapacityExceeded { max, .. }) => {
            info!("Entity {} rejected as expected (max sparse capacity {})", out_of_range, max)
        }
        Ok(()) => warn!("Entity {} unexpectedly accepted", out_of_range),
    }

    let mut total = Position { x: 0.0, y: 0.0 };
    registry.each::<Position>(|_, pos| {
        total.x += pos.x;
        total.y += pos.y;
    });
    info!(
        "Final: {} entities, {} moving, position sum ({:.1}, {:.1})",
        registry.entity_count(),
        registry.component_count::<Velocity>(),
        total.x,
        total.y
    );

    Ok(())
}
