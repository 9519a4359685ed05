use std::any::type_name;

use crate::{scheduler::TickPhase, world::World, ComponentTypeId, EntityId, Phase, ECS};

pub(crate) mod matcher;

/// A unit of behavior run once per tick against the entities whose children
/// carry every type in `required`.
///
/// `required` and `phase` are read once, when the system is added.
pub trait System: 'static {
  fn required(&self) -> Vec<ComponentTypeId>;

  fn phase(&self) -> Phase {
    TickPhase::Update.into()
  }

  /// `entities` is the matched set as it was when the update started.
  /// Composition changes made during the update are applied immediately and
  /// show up in `ECS::matched` / `ECS::is_matched`, but not in this slice.
  fn update(&mut self, ecs: &mut ECS, entities: &[EntityId], delta: f64);

  fn on_enable(&mut self) {}
  fn on_disable(&mut self) {}

  /// Called when `entity` starts satisfying `required`.
  fn on_match(&mut self, _world: &World, _entity: EntityId) {}
  /// Called when `entity` stops satisfying `required` or is destroyed.
  fn on_unmatch(&mut self, _world: &World, _entity: EntityId) {}

  fn name(&self) -> &str {
    type_name::<Self>()
  }
}

/// System backed by a closure, for behavior that needs no hooks.
pub struct FunctionSystem<F> {
  required: Vec<ComponentTypeId>,
  phase: Phase,
  f: F,
}

impl<F: FnMut(&mut ECS, &[EntityId], f64) + 'static> FunctionSystem<F> {
  pub fn new(required: &[ComponentTypeId], phase: impl Into<Phase>, f: F) -> Self {
    Self {
      required: required.to_vec(),
      phase: phase.into(),
      f,
    }
  }
}

impl<F: FnMut(&mut ECS, &[EntityId], f64) + 'static> System for FunctionSystem<F> {
  fn required(&self) -> Vec<ComponentTypeId> {
    self.required.clone()
  }

  fn phase(&self) -> Phase {
    self.phase
  }

  fn update(&mut self, ecs: &mut ECS, entities: &[EntityId], delta: f64) {
    (self.f)(ecs, entities, delta)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SystemEvent {
  Matched(EntityId),
  Unmatched(EntityId),
  Enabled,
  Disabled,
}

impl SystemEvent {
  pub(crate) fn dispatch(self, system: &mut dyn System, world: &World) {
    match self {
      SystemEvent::Matched(entity) => system.on_match(world, entity),
      SystemEvent::Unmatched(entity) => system.on_unmatch(world, entity),
      SystemEvent::Enabled => system.on_enable(),
      SystemEvent::Disabled => system.on_disable(),
    }
  }
}
