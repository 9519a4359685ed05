use std::{collections::BTreeSet, mem};

#[allow(unused_imports)]
use log::{debug, trace};

use components::{ComponentPayload, ComponentType, StoredComponent};
use config::EcsConfig;
use error::EcsError;
use scheduler::Scheduler;
use systems::{matcher::Matcher, System};
use tick::Tick;
use world::{ComponentsOf, EntityData, World};

pub mod components;
pub mod config;
pub mod error;
pub mod prefab;
pub mod scheduler;
pub(crate) mod storage;
pub mod systems;
pub mod tick;
pub mod world;


pub use gates_ecs_macros::Component;

pub type Id = u64;
pub type EntityId = Id;
pub type SystemId = Id;
pub type Phase = i32;
pub type ComponentTypeId = &'static str;

pub struct ECS {
  config: EcsConfig,
  initialized: bool,
  paused: bool,
  world: World,
  matcher: Matcher,
  scheduler: Scheduler,
  to_destroy: Vec<EntityId>,
  tick: Tick,
  current_system: Option<SystemId>,
}

#[derive(Default)]
pub struct ECSBuilder {
  config: EcsConfig,
  systems: Vec<Box<dyn System>>,
}

impl Default for ECS {
  fn default() -> Self {
    ECS::new(EcsConfig::default())
  }
}

impl ECS {
  pub fn new(config: EcsConfig) -> Self {
    debug!("Creating ECS");

    Self {
      paused: config.start_paused,
      config,
      initialized: false,
      world: World::new(),
      matcher: Matcher::default(),
      scheduler: Scheduler::default(),
      to_destroy: Vec::new(),
      tick: Tick::default(),
      current_system: None,
    }
  }

  pub fn builder() -> ECSBuilder {
    ECSBuilder::new()
  }

  pub fn init(&mut self) -> Result<(), EcsError> {
    if self.initialized {
      return Err(EcsError::AlreadyInitialized);
    }
    debug!("Initializing ECS");

    self.initialized = true;
    Ok(())
  }

  #[inline]
  pub fn is_initialized(&self) -> bool {
    self.initialized
  }

  /// Drops every entity, component and match. Systems stay registered, ids
  /// keep counting up and `init` has to be called again.
  pub fn reset(&mut self) {
    debug!("Resetting ECS");

    self.world.clear();
    self.matcher.clear_matches();
    self.to_destroy.clear();
    self.initialized = false;
  }

  /// Runs every enabled system, phase by phase, then destroys the entities
  /// queued with `remove`. Not allowed from inside a system's update.
  pub fn tick(&mut self, delta: f64) -> Result<(), EcsError> {
    self.check_initialized()?;
    self.check_not_running()?;
    if self.paused {
      return Ok(());
    }

    self.tick = self.tick.next();
    #[cfg(feature = "debug")]
    trace!("Executing Tick {}", self.tick.get());

    for id in self.scheduler.order() {
      self.run_system(id, delta);
    }

    self.flush_destroyed();
    Ok(())
  }

  fn run_system(&mut self, id: SystemId, delta: f64) {
    let Some(slot) = self.matcher.get_mut(id) else {
      return;
    };
    if !slot.enabled {
      return;
    }
    let Some(mut system) = slot.system.take() else {
      return;
    };
    let entities = slot.matched.iter().copied().collect::<Vec<_>>();

    #[cfg(feature = "debug")]
    trace!("Executing System {} on {} entities", slot.name, entities.len());

    self.current_system = Some(id);
    system.update(self, &entities, delta);
    self.current_system = None;

    match self.matcher.get_mut(id) {
      Some(slot) => slot.restore(&self.world, system),
      None => debug!("System {} was removed during its update", system.name()),
    }
  }

  /// Destroys the queued entities now instead of at the end of the next tick.
  /// During a tick the queue belongs to that tick, so this is an error there.
  pub fn flush(&mut self) -> Result<(), EcsError> {
    self.check_initialized()?;
    self.check_not_running()?;
    self.flush_destroyed();
    Ok(())
  }

  fn flush_destroyed(&mut self) {
    while !self.to_destroy.is_empty() {
      for entity in mem::take(&mut self.to_destroy) {
        self.destroy(entity);
      }
    }
  }

  fn destroy(&mut self, entity: EntityId) {
    if !self.world.is_entity(entity) {
      return;
    }

    #[cfg(feature = "debug")]
    trace!("Destroying Entity {}", entity);

    if let Some(owner) = self.world.detach_from_owner(entity) {
      self.matcher.check_entity(&self.world, owner);
    }
    self.matcher.evict(&self.world, entity);

    for carrier in self.world.remove_entity(entity) {
      self.destroy(carrier);
    }
  }

  pub fn pause(&mut self) {
    self.paused = true;
  }

  pub fn resume(&mut self) {
    self.paused = false;
  }

  #[inline]
  pub fn is_paused(&self) -> bool {
    self.paused
  }

  #[inline]
  pub fn current_tick(&self) -> Tick {
    self.tick
  }

  #[inline]
  pub fn config(&self) -> &EcsConfig {
    &self.config
  }

  fn check_initialized(&self) -> Result<(), EcsError> {
    if self.initialized {
      Ok(())
    } else {
      Err(EcsError::UninitializedAccess)
    }
  }

  fn check_not_running(&self) -> Result<(), EcsError> {
    match self.current_system {
      Some(id) => Err(EcsError::SystemRunning(id)),
      None => Ok(()),
    }
  }

  // Entities

  pub fn entity(&mut self) -> Result<EntityId, EcsError> {
    self.check_initialized()?;
    self.world.create_entity()
  }

  /// Creates a component carrying entity. It takes part in matching once it
  /// is added to a container.
  pub fn component<D: 'static>(&mut self, payload: ComponentPayload<D>) -> Result<EntityId, EcsError> {
    self.component_boxed(Box::new(payload))
  }

  pub(crate) fn component_boxed(
    &mut self,
    payload: Box<dyn StoredComponent>,
  ) -> Result<EntityId, EcsError> {
    self.check_initialized()?;
    let id = self.world.create_entity()?;
    self.world.insert_component(id, payload);
    Ok(id)
  }

  /// Creates a component and adds it to `owner`, returning the component.
  pub fn add_component<D: 'static>(
    &mut self,
    owner: EntityId,
    payload: ComponentPayload<D>,
  ) -> Result<EntityId, EcsError> {
    self.check_initialized()?;
    if !self.world.is_entity(owner) {
      return Err(EcsError::EntityNotFound(owner));
    }

    let component = self.component(payload)?;
    self.add_to(owner, &[component])?;
    Ok(component)
  }

  /// Adds `children` to `owner` and rechecks it against every system. A child
  /// that already belongs to another entity is moved.
  pub fn add_to(&mut self, owner: EntityId, children: &[EntityId]) -> Result<EntityId, EcsError> {
    self.check_initialized()?;

    for previous in self.world.add_children(owner, children)? {
      self.matcher.check_entity(&self.world, previous);
    }
    self.matcher.check_entity(&self.world, owner);
    Ok(owner)
  }

  pub fn remove_from(
    &mut self,
    owner: EntityId,
    children: &[EntityId],
  ) -> Result<EntityId, EcsError> {
    self.check_initialized()?;

    self.world.remove_children(owner, children)?;
    self.matcher.check_entity(&self.world, owner);
    Ok(owner)
  }

  /// Queues `entity` for destruction at the end of the current tick.
  /// Queuing an entity twice or queuing an unknown id is harmless.
  pub fn remove(&mut self, entity: EntityId) -> Result<(), EcsError> {
    self.check_initialized()?;
    self.to_destroy.push(entity);
    Ok(())
  }

  /// Removes `component` from `owner` right away and queues its destruction.
  pub fn remove_component(&mut self, owner: EntityId, component: EntityId) -> Result<(), EcsError> {
    self.remove_from(owner, &[component])?;
    self.remove(component)
  }

  /// Live entities, not counting the ones queued for destruction.
  pub fn count_entities(&self) -> usize {
    if !self.initialized {
      return 0;
    }

    let queued = self
      .to_destroy
      .iter()
      .filter(|e| self.world.is_entity(**e))
      .collect::<BTreeSet<_>>()
      .len();
    self.world.len() - queued
  }

  /// Recreates an entity under a given id, for loading saved worlds.
  pub fn replay_entity(&mut self, id: EntityId) -> Result<EntityId, EcsError> {
    self.check_initialized()?;
    self.world.create_entity_with_id(id)?;
    Ok(id)
  }

  /// Recreates a component carrying entity under a given id.
  pub fn replay_component<D: 'static>(
    &mut self,
    id: EntityId,
    payload: ComponentPayload<D>,
  ) -> Result<EntityId, EcsError> {
    self.check_initialized()?;
    self.world.create_entity_with_id(id)?;
    self.world.insert_component(id, Box::new(payload));
    Ok(id)
  }

  // Queries

  pub fn component_data<D: 'static>(
    &self,
    entity: EntityId,
    ty: &ComponentType<D>,
  ) -> Result<Option<&D>, EcsError> {
    self.check_initialized()?;
    Ok(self.world.component_data(entity, ty))
  }

  pub fn component_data_mut<D: 'static>(
    &mut self,
    entity: EntityId,
    ty: &ComponentType<D>,
  ) -> Result<Option<&mut D>, EcsError> {
    self.check_initialized()?;
    Ok(self.world.component_data_mut(entity, ty))
  }

  /// Payload of `entity` if its data is a `D`, whatever its component type.
  pub fn component_data_untyped<D: 'static>(&self, entity: EntityId) -> Result<Option<&D>, EcsError> {
    self.check_initialized()?;
    Ok(self.world.component_data_untyped(entity))
  }

  pub fn component_type_of(&self, entity: EntityId) -> Result<Option<ComponentTypeId>, EcsError> {
    self.check_initialized()?;
    Ok(self.world.component_type_of(entity))
  }

  pub fn has_children(&self, owner: EntityId, children: &[EntityId]) -> Result<bool, EcsError> {
    self.check_initialized()?;
    Ok(self.world.has_children(owner, children))
  }

  pub fn entity_data(&self, entity: EntityId) -> Result<Option<&EntityData>, EcsError> {
    self.check_initialized()?;
    Ok(self.world.entity_data(entity))
  }

  pub fn parent_of(&self, entity: EntityId) -> Result<Option<EntityId>, EcsError> {
    self.check_initialized()?;
    Ok(self.world.owner_of(entity))
  }

  /// Payloads of type `ty` among the direct children of `entity`.
  pub fn components_of<D: 'static>(
    &self,
    entity: EntityId,
    ty: ComponentType<D>,
  ) -> Result<ComponentsOf<'_, D>, EcsError> {
    self.check_initialized()?;
    Ok(self.world.components_of(entity, ty))
  }

  #[inline]
  pub fn is_entity(&self, id: EntityId) -> bool {
    self.world.is_entity(id)
  }

  #[inline]
  pub fn is_component(&self, id: EntityId) -> bool {
    self.world.is_component(id)
  }

  /// Every entity with its container state, in no particular order.
  pub fn entities(
    &self,
  ) -> Result<impl Iterator<Item = (EntityId, Option<&EntityData>)> + '_, EcsError> {
    self.check_initialized()?;
    Ok(self.world.entities())
  }

  /// Every component carrier with its type, in no particular order.
  pub fn components(&self) -> Result<impl Iterator<Item = (EntityId, ComponentTypeId)> + '_, EcsError> {
    self.check_initialized()?;
    Ok(self.world.components())
  }

  // Systems

  /// Adds a system and matches it against every existing entity right away.
  pub fn add_system(&mut self, system: impl System) -> SystemId {
    self.add_boxed_system(Box::new(system))
  }

  pub fn add_boxed_system(&mut self, system: Box<dyn System>) -> SystemId {
    let id = self.matcher.register(&self.world, system);
    if let Some(slot) = self.matcher.get_mut(id) {
      self.scheduler.add_system(id, slot.phase);
      if self.config.enable_systems_on_add {
        slot.set_enabled(&self.world, true);
      }
    }
    id
  }

  /// Unregisters a system and hands it back. A system removing itself during
  /// its own update is dropped once the update returns, so `None` is returned.
  pub fn remove_system(&mut self, id: SystemId) -> Result<Option<Box<dyn System>>, EcsError> {
    let slot = self
      .matcher
      .unregister(id)
      .ok_or(EcsError::SystemNotFound(id))?;
    self.scheduler.remove_system(id, slot.phase);
    Ok(slot.system)
  }

  /// Returns whether the system was disabled before.
  pub fn enable_system(&mut self, id: SystemId) -> Result<bool, EcsError> {
    let slot = self
      .matcher
      .get_mut(id)
      .ok_or(EcsError::SystemNotFound(id))?;
    Ok(slot.set_enabled(&self.world, true))
  }

  /// Returns whether the system was enabled before.
  pub fn disable_system(&mut self, id: SystemId) -> Result<bool, EcsError> {
    let slot = self
      .matcher
      .get_mut(id)
      .ok_or(EcsError::SystemNotFound(id))?;
    Ok(slot.set_enabled(&self.world, false))
  }

  pub fn is_system_enabled(&self, id: SystemId) -> Result<bool, EcsError> {
    self
      .matcher
      .get(id)
      .map(|slot| slot.enabled)
      .ok_or(EcsError::SystemNotFound(id))
  }

  /// The live matched set of a system.
  pub fn matched(&self, id: SystemId) -> Result<&BTreeSet<EntityId>, EcsError> {
    self
      .matcher
      .get(id)
      .map(|slot| &slot.matched)
      .ok_or(EcsError::SystemNotFound(id))
  }

  #[inline]
  pub fn is_matched(&self, id: SystemId, entity: EntityId) -> bool {
    self.matcher.is_matched(id, entity)
  }

  /// The system whose update is running, if any.
  #[inline]
  pub fn current_system(&self) -> Option<SystemId> {
    self.current_system
  }

  #[inline]
  pub fn system_count(&self) -> usize {
    self.matcher.len()
  }

  pub fn phases(&self) -> Vec<Phase> {
    self.scheduler.phases().collect()
  }
}

impl ECSBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn config(mut self, config: EcsConfig) -> Self {
    self.config = config;
    self
  }

  pub fn add_system(mut self, system: impl System) -> Self {
    self.systems.push(Box::new(system));
    self
  }

  pub fn build(self) -> ECS {
    let mut ecs = ECS::new(self.config);
    for system in self.systems {
      ecs.add_boxed_system(system);
    }
    ecs
  }
}
