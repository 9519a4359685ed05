use std::collections::{BTreeMap, BTreeSet};

#[allow(unused_imports)]
use log::{debug, trace};

use crate::{
  systems::{System, SystemEvent},
  world::World,
  ComponentTypeId, EntityId, Phase, SystemId,
};

pub(crate) struct SystemSlot {
  /// `None` while the system is running its update.
  pub system: Option<Box<dyn System>>,
  pub name: String,
  pub required: Vec<ComponentTypeId>,
  pub phase: Phase,
  pub enabled: bool,
  pub matched: BTreeSet<EntityId>,
  pending: Vec<SystemEvent>,
}

impl SystemSlot {
  fn new(system: Box<dyn System>) -> Self {
    let mut required = system.required();
    required.sort_unstable();
    required.dedup();

    Self {
      name: system.name().to_string(),
      phase: system.phase(),
      system: Some(system),
      required,
      enabled: false,
      matched: BTreeSet::new(),
      pending: Vec::new(),
    }
  }

  /// Moves `entity` between unmatched and matched. Hooks only fire on a change.
  fn check(&mut self, world: &World, entity: EntityId) {
    let matches = world
      .entity_data(entity)
      .is_some_and(|data| data.has_components_of(&self.required));

    if matches {
      if self.matched.insert(entity) {
        #[cfg(feature = "debug")]
        trace!("Entity {} matched {}", entity, self.name);

        self.notify(world, SystemEvent::Matched(entity));
      }
    } else if self.matched.remove(&entity) {
      #[cfg(feature = "debug")]
      trace!("Entity {} unmatched {}", entity, self.name);

      self.notify(world, SystemEvent::Unmatched(entity));
    }
  }

  fn evict(&mut self, world: &World, entity: EntityId) {
    if self.matched.remove(&entity) {
      self.notify(world, SystemEvent::Unmatched(entity));
    }
  }

  fn notify(&mut self, world: &World, event: SystemEvent) {
    match self.system.as_mut() {
      Some(system) => event.dispatch(system.as_mut(), world),
      None => self.pending.push(event),
    }
  }

  /// Returns whether the state flipped.
  pub fn set_enabled(&mut self, world: &World, enabled: bool) -> bool {
    if self.enabled == enabled {
      return false;
    }
    self.enabled = enabled;

    debug!(
      "{} System {}",
      if enabled { "Enabling" } else { "Disabling" },
      self.name
    );

    let event = if enabled {
      SystemEvent::Enabled
    } else {
      SystemEvent::Disabled
    };
    self.notify(world, event);
    true
  }

  /// Puts a system back after its update and hands it the hooks queued meanwhile.
  pub fn restore(&mut self, world: &World, mut system: Box<dyn System>) {
    for event in self.pending.drain(..) {
      event.dispatch(system.as_mut(), world);
    }
    self.system = Some(system);
  }
}

/// Keeps every system's matched set equal to the entities whose confirmed
/// component types are a superset of the system's required types.
#[derive(Default)]
pub(crate) struct Matcher {
  slots: BTreeMap<SystemId, SystemSlot>,
  next_id: SystemId,
}

impl Matcher {
  /// Registers a system and matches it against every existing entity.
  pub fn register(&mut self, world: &World, system: Box<dyn System>) -> SystemId {
    let id = self.next_id;
    self.next_id += 1;

    let mut slot = SystemSlot::new(system);
    debug!(
      "Registering System {} ({}) requiring {:?} in phase {}",
      slot.name, id, slot.required, slot.phase
    );

    let mut containers = world.containers().collect::<Vec<_>>();
    containers.sort_unstable();
    for entity in containers {
      slot.check(world, entity);
    }

    self.slots.insert(id, slot);
    id
  }

  pub fn unregister(&mut self, id: SystemId) -> Option<SystemSlot> {
    let slot = self.slots.remove(&id)?;
    debug!("Removing System {} ({})", slot.name, id);
    Some(slot)
  }

  /// Rechecks one entity against every system, in registration order.
  pub fn check_entity(&mut self, world: &World, entity: EntityId) {
    for slot in self.slots.values_mut() {
      slot.check(world, entity);
    }
  }

  /// Drops a destroyed entity from every matched set.
  pub fn evict(&mut self, world: &World, entity: EntityId) {
    for slot in self.slots.values_mut() {
      slot.evict(world, entity);
    }
  }

  /// Forgets every match without firing hooks.
  pub fn clear_matches(&mut self) {
    for slot in self.slots.values_mut() {
      slot.matched.clear();
      slot.pending.retain(|e| matches!(e, SystemEvent::Enabled | SystemEvent::Disabled));
    }
  }

  #[inline]
  pub fn get(&self, id: SystemId) -> Option<&SystemSlot> {
    self.slots.get(&id)
  }

  #[inline]
  pub fn get_mut(&mut self, id: SystemId) -> Option<&mut SystemSlot> {
    self.slots.get_mut(&id)
  }

  pub fn is_matched(&self, id: SystemId, entity: EntityId) -> bool {
    self
      .slots
      .get(&id)
      .is_some_and(|slot| slot.matched.contains(&entity))
  }

  pub fn len(&self) -> usize {
    self.slots.len()
  }
}

#[cfg(test)]
mod test {
  use std::{cell::RefCell, rc::Rc};

  use super::Matcher;
  use crate::{
    components::ComponentType,
    systems::System,
    world::World,
    ComponentTypeId, EntityId, ECS,
  };

  const X: ComponentType<()> = ComponentType::new("x");
  const Y: ComponentType<()> = ComponentType::new("y");

  type Log = Rc<RefCell<Vec<(bool, EntityId)>>>;

  struct Probe {
    required: Vec<ComponentTypeId>,
    log: Log,
  }

  impl System for Probe {
    fn required(&self) -> Vec<ComponentTypeId> {
      self.required.clone()
    }

    fn update(&mut self, _: &mut ECS, _: &[EntityId], _: f64) {}

    fn on_match(&mut self, _: &World, entity: EntityId) {
      self.log.borrow_mut().push((true, entity));
    }

    fn on_unmatch(&mut self, _: &World, entity: EntityId) {
      self.log.borrow_mut().push((false, entity));
    }
  }

  fn carrier(world: &mut World, ty: ComponentType<()>) -> EntityId {
    let id = world.create_entity().unwrap();
    world.insert_component(id, Box::new(ty.create(())));
    id
  }

  #[test]
  fn register_is_retroactive() {
    let mut world = World::new();
    let entity = world.create_entity().unwrap();
    let x = carrier(&mut world, X);
    let y = carrier(&mut world, Y);
    world.add_children(entity, &[x, y]).unwrap();

    let log = Log::default();
    let mut matcher = Matcher::default();
    let id = matcher.register(
      &world,
      Box::new(Probe {
        required: vec!["x", "y"],
        log: log.clone(),
      }),
    );

    assert!(matcher.is_matched(id, entity));
    assert_eq!(*log.borrow(), vec![(true, entity)]);
  }

  #[test]
  fn hooks_fire_on_edges_only() {
    let mut world = World::new();
    let entity = world.create_entity().unwrap();
    let x = carrier(&mut world, X);

    let log = Log::default();
    let mut matcher = Matcher::default();
    let id = matcher.register(
      &world,
      Box::new(Probe {
        required: vec!["x"],
        log: log.clone(),
      }),
    );

    world.add_children(entity, &[x]).unwrap();
    matcher.check_entity(&world, entity);
    matcher.check_entity(&world, entity);
    assert!(matcher.is_matched(id, entity));

    world.remove_children(entity, &[x]).unwrap();
    matcher.check_entity(&world, entity);
    matcher.check_entity(&world, entity);
    assert!(!matcher.is_matched(id, entity));

    assert_eq!(*log.borrow(), vec![(true, entity), (false, entity)]);
  }

  #[test]
  fn required_types_are_deduplicated() {
    let world = World::new();
    let mut matcher = Matcher::default();
    let id = matcher.register(
      &world,
      Box::new(Probe {
        required: vec!["y", "x", "y"],
        log: Log::default(),
      }),
    );

    assert_eq!(matcher.get(id).unwrap().required, vec!["x", "y"]);
  }
}
