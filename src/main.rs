use gates::{
  config::EngineConfig,
  ecs::{
    components::Component,
    prefab::Prefab,
    scheduler::TickPhase,
    systems::{FunctionSystem, System},
    world::World,
    ComponentTypeId, EntityId, Phase,
  },
  engine::Engine,
  scene::ComponentRegistry,
  Component, ECS,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};

#[derive(Component, Serialize, Deserialize, Debug, Clone, Copy)]
#[component(id = "position")]
struct Position {
  x: f64,
  y: f64,
}

#[derive(Component, Serialize, Deserialize, Debug, Clone, Copy)]
#[component(id = "velocity")]
struct Velocity {
  x: f64,
  y: f64,
}

#[derive(Component, Serialize, Deserialize, Debug)]
#[component(id = "lifetime")]
struct Lifetime(f64);

/// Accelerates every velocity of an entity downwards.
struct Gravity {
  g: f64,
}

impl System for Gravity {
  fn required(&self) -> Vec<ComponentTypeId> {
    vec![Velocity::TYPE.id()]
  }

  fn phase(&self) -> Phase {
    TickPhase::Physics.into()
  }

  fn update(&mut self, ecs: &mut ECS, entities: &[EntityId], delta: f64) {
    for &entity in entities {
      for velocity in velocities_of(ecs, entity) {
        if let Ok(Some(velocity)) = ecs.component_data_mut(velocity, &Velocity::TYPE) {
          velocity.y -= self.g * delta;
        }
      }
    }
  }

  fn on_match(&mut self, _: &World, entity: EntityId) {
    info!("Entity {} is now falling", entity);
  }

  fn on_unmatch(&mut self, _: &World, entity: EntityId) {
    info!("Entity {} stopped falling", entity);
  }
}

fn velocities_of(ecs: &ECS, entity: EntityId) -> Vec<EntityId> {
  ecs
    .components_of(entity, Velocity::TYPE)
    .map(|velocities| velocities.map(|(id, _)| id).collect())
    .unwrap_or_default()
}

fn movement(ecs: &mut ECS, entities: &[EntityId], delta: f64) {
  for &entity in entities {
    let Ok(velocities) = ecs.components_of(entity, Velocity::TYPE) else {
      continue;
    };
    let (dx, dy) = velocities.fold((0.0, 0.0), |(x, y), (_, v)| (x + v.x, y + v.y));

    let Ok(positions) = ecs.components_of(entity, Position::TYPE) else {
      continue;
    };
    let ids = positions.map(|(id, _)| id).collect::<Vec<_>>();

    for position in ids {
      if let Ok(Some(position)) = ecs.component_data_mut(position, &Position::TYPE) {
        position.x += dx * delta;
        position.y += dy * delta;
      }
    }
  }
}

fn lifetime(ecs: &mut ECS, entities: &[EntityId], delta: f64) {
  for &entity in entities {
    let Ok(lifetimes) = ecs.components_of(entity, Lifetime::TYPE) else {
      continue;
    };
    let ids = lifetimes.map(|(id, _)| id).collect::<Vec<_>>();

    let mut expired = false;
    for id in ids {
      if let Ok(Some(lifetime)) = ecs.component_data_mut(id, &Lifetime::TYPE) {
        lifetime.0 -= delta;
        expired |= lifetime.0 <= 0.0;
      }
    }

    if expired {
      info!("Entity {} expired", entity);
      if let Err(err) = ecs.remove(entity) {
        warn!("Could not remove Entity {}: {}", entity, err);
      }
    }
  }
}

fn body_prefab() -> anyhow::Result<Prefab> {
  let mut prefab = Prefab::new("body");
  prefab
    .add_component(Position::TYPE, |_| Position { x: 0.0, y: 100.0 })?
    .add_component(Velocity::TYPE, |_| Velocity { x: 1.0, y: 0.0 })?
    .on_create(|_, entity| info!("Spawned body {}", entity));
  Ok(prefab)
}

fn report(ecs: &ECS) -> anyhow::Result<()> {
  let mut positions = ecs
    .components()?
    .filter(|(_, ty)| *ty == Position::TYPE.id())
    .map(|(id, _)| id)
    .collect::<Vec<_>>();
  positions.sort_unstable();

  for id in positions {
    if let Some(position) = ecs.component_data(id, &Position::TYPE)? {
      info!(
        "Body {:?} at ({:.2}, {:.2})",
        ecs.parent_of(id)?,
        position.x,
        position.y
      );
    }
  }
  info!("{} entities alive", ecs.count_entities());
  Ok(())
}

fn main() -> anyhow::Result<()> {
  env_logger::init();

  let mut registry = ComponentRegistry::new();
  registry
    .register_component::<Position>()?
    .register_component::<Velocity>()?
    .register_component::<Lifetime>()?;

  let config = EngineConfig::default()
    .set_tick_rate(30)
    .set_fixed_delta(true);
  let mut engine = Engine::new(config, registry)?;

  let mut ecs = engine.create_ecs();
  ecs.add_system(Gravity { g: 9.81 });
  ecs.add_system(FunctionSystem::new(
    &[Position::TYPE.id(), Velocity::TYPE.id()],
    TickPhase::Physics,
    movement,
  ));
  ecs.add_system(FunctionSystem::new(
    &[Lifetime::TYPE.id()],
    TickPhase::EarlyUpdate,
    lifetime,
  ));
  ecs.init()?;

  let body = body_prefab()?;
  for i in 0..3 {
    let entity = body.create(&mut ecs)?;
    ecs.add_component(entity, Lifetime(0.5 + i as f64).into_payload())?;
  }
  let anchor = ecs.entity()?;
  ecs.add_component(anchor, Position { x: 0.0, y: 0.0 }.into_payload())?;

  engine.add_scene("falling", ecs)?;
  engine.activate("falling")?;

  engine.run_for(30)?;
  if let Some(ecs) = engine.scenes().active() {
    report(ecs)?;
  }

  engine.scenes_mut().save_active(false)?;
  engine.run_for(60)?;
  if let Some(ecs) = engine.scenes().active() {
    report(ecs)?;
  }

  info!("Reverting to the save taken after the first second");
  engine.scenes_mut().revert_active()?;
  if let Some(ecs) = engine.scenes().active() {
    report(ecs)?;
    info!("{}", gates::scene::save(ecs, engine.scenes().registry())?.to_json()?);
  }

  Ok(())
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn expired_lifetimes_are_removed_after_the_tick() {
    let mut ecs = ECS::default();
    ecs.add_system(FunctionSystem::new(
      &[Lifetime::TYPE.id()],
      TickPhase::EarlyUpdate,
      lifetime,
    ));
    ecs.init().unwrap();

    let short = ecs.entity().unwrap();
    ecs.add_component(short, Lifetime(0.5).into_payload()).unwrap();
    let long = ecs.entity().unwrap();
    ecs.add_component(long, Lifetime(5.0).into_payload()).unwrap();

    ecs.tick(1.0).unwrap();

    assert!(!ecs.is_entity(short));
    assert!(ecs.is_entity(long));
  }
}
