use std::collections::{btree_set, BTreeSet};

#[allow(unused_imports)]
use log::{debug, trace};
use rustc_hash::FxHashMap;

use crate::{
  components::{ComponentType, StoredComponent},
  error::EcsError,
  storage::ComponentStore,
  ComponentTypeId, EntityId,
};

/// Container state of an entity, materialized the first time it gets children.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct EntityData {
  children: BTreeSet<EntityId>,
  /// Number of children carrying each component type. A type is confirmed
  /// while its count is above zero.
  component_types: FxHashMap<ComponentTypeId, usize>,
}

impl EntityData {
  #[inline]
  pub fn children(&self) -> &BTreeSet<EntityId> {
    &self.children
  }

  #[inline]
  pub fn has_child(&self, id: EntityId) -> bool {
    self.children.contains(&id)
  }

  pub fn component_types(&self) -> impl Iterator<Item = ComponentTypeId> + '_ {
    self.component_types.keys().copied()
  }

  #[inline]
  pub fn has_component_type(&self, ty: &str) -> bool {
    self.component_types.contains_key(ty)
  }

  /// Number of children carrying `ty`.
  #[inline]
  pub fn count_of(&self, ty: &str) -> usize {
    self.component_types.get(ty).copied().unwrap_or(0)
  }

  pub fn has_components_of(&self, required: &[ComponentTypeId]) -> bool {
    required.iter().all(|ty| self.has_component_type(ty))
  }

  fn confirm(&mut self, ty: ComponentTypeId) {
    *self.component_types.entry(ty).or_insert(0) += 1;
  }

  fn unconfirm(&mut self, ty: ComponentTypeId) {
    if let Some(count) = self.component_types.get_mut(ty) {
      *count -= 1;
      if *count == 0 {
        self.component_types.remove(ty);
      }
    }
  }
}

/// Entities, their composition and the payloads of component carriers.
///
/// Entity ids are shared between containers and component carriers; the
/// payloads live in a parallel table keyed by the same id.
#[derive(Default)]
pub struct World {
  entities: FxHashMap<EntityId, Option<EntityData>>,
  owners: FxHashMap<EntityId, EntityId>,
  components: ComponentStore,
  next_id: EntityId,
}

impl World {
  pub fn new() -> Self {
    World::default()
  }

  pub(crate) fn create_entity(&mut self) -> Result<EntityId, EcsError> {
    let id = self.next_id;
    self.next_id = id.checked_add(1).ok_or(EcsError::IdsExhausted(id))?;
    self.entities.insert(id, None);

    #[cfg(feature = "debug")]
    trace!("Creating Entity {}", id);

    Ok(id)
  }

  /// Recreates an entity under a fixed id, moving the id counter past it.
  /// The last id is never handed out, so the counter always has room.
  pub(crate) fn create_entity_with_id(&mut self, id: EntityId) -> Result<(), EcsError> {
    if self.entities.contains_key(&id) {
      return Err(EcsError::EntityExists(id));
    }
    let next = id.checked_add(1).ok_or(EcsError::IdsExhausted(id))?;
    self.entities.insert(id, None);
    self.next_id = self.next_id.max(next);

    #[cfg(feature = "debug")]
    trace!("Replaying Entity {}", id);

    Ok(())
  }

  pub(crate) fn insert_component(&mut self, id: EntityId, payload: Box<dyn StoredComponent>) {
    self.components.insert_boxed(id, payload);
  }

  /// Adds `children` to `owner`, giving it container state even if `children`
  /// is empty. Children owned elsewhere are moved; the previous owners are
  /// returned so they can be rechecked.
  pub(crate) fn add_children(
    &mut self,
    owner: EntityId,
    children: &[EntityId],
  ) -> Result<Vec<EntityId>, EcsError> {
    self.check_entity(owner)?;
    for &child in children {
      self.check_entity(child)?;
      if child == owner {
        return Err(EcsError::SelfContainment(owner));
      }
    }

    if let Some(slot) = self.entities.get_mut(&owner) {
      slot.get_or_insert_with(EntityData::default);
    }

    let mut previous = Vec::new();
    for &child in children {
      match self.owners.get(&child).copied() {
        Some(current) if current == owner => continue,
        Some(current) => {
          self.detach(current, child);
          if !previous.contains(&current) {
            previous.push(current);
          }
        }
        None => {}
      }

      let ty = self.components.type_of(child);
      let Some(slot) = self.entities.get_mut(&owner) else {
        return Err(EcsError::EntityNotFound(owner));
      };
      let data = slot.get_or_insert_with(EntityData::default);
      data.children.insert(child);
      if let Some(ty) = ty {
        data.confirm(ty);
      }
      self.owners.insert(child, owner);

      #[cfg(feature = "debug")]
      trace!("Added {} to {}", child, owner);
    }

    Ok(previous)
  }

  /// Removes `children` from `owner`. Every id has to exist; existing
  /// entities that are not children of `owner` are ignored.
  pub(crate) fn remove_children(
    &mut self,
    owner: EntityId,
    children: &[EntityId],
  ) -> Result<(), EcsError> {
    self.check_entity(owner)?;
    for &child in children {
      self.check_entity(child)?;
    }
    for &child in children {
      self.detach(owner, child);
    }
    Ok(())
  }

  /// Detaches `child` from whatever owns it, returning the former owner.
  pub(crate) fn detach_from_owner(&mut self, child: EntityId) -> Option<EntityId> {
    let owner = self.owners.get(&child).copied()?;
    self.detach(owner, child);
    Some(owner)
  }

  fn detach(&mut self, owner: EntityId, child: EntityId) -> bool {
    let ty = self.components.type_of(child);
    let Some(Some(data)) = self.entities.get_mut(&owner) else {
      return false;
    };
    if !data.children.remove(&child) {
      return false;
    }
    if let Some(ty) = ty {
      data.unconfirm(ty);
    }
    self.owners.remove(&child);

    #[cfg(feature = "debug")]
    trace!("Removed {} from {}", child, owner);

    true
  }

  /// Removes an entity and its payload. Its children are detached; the ones
  /// carrying components are returned so they can be destroyed as well.
  pub(crate) fn remove_entity(&mut self, id: EntityId) -> Vec<EntityId> {
    self.detach_from_owner(id);
    let Some(slot) = self.entities.remove(&id) else {
      return Vec::new();
    };
    self.components.destroy(id);

    let mut carriers = Vec::new();
    if let Some(data) = slot {
      for child in data.children {
        self.owners.remove(&child);
        if self.components.contains(child) {
          carriers.push(child);
        }
      }
    }
    carriers
  }

  /// Drops every entity and runs the destructor of every payload.
  /// The id counter keeps counting.
  pub(crate) fn clear(&mut self) {
    debug!("Clearing World with {} entities", self.entities.len());

    self.components.clear();
    self.entities.clear();
    self.owners.clear();
  }

  fn check_entity(&self, id: EntityId) -> Result<(), EcsError> {
    if self.entities.contains_key(&id) {
      Ok(())
    } else {
      Err(EcsError::EntityNotFound(id))
    }
  }

  #[inline]
  pub fn is_entity(&self, id: EntityId) -> bool {
    self.entities.contains_key(&id)
  }

  #[inline]
  pub fn is_component(&self, id: EntityId) -> bool {
    self.components.contains(id)
  }

  /// Container state, `None` for unknown ids and entities that never had children.
  #[inline]
  pub fn entity_data(&self, id: EntityId) -> Option<&EntityData> {
    self.entities.get(&id)?.as_ref()
  }

  #[inline]
  pub fn owner_of(&self, id: EntityId) -> Option<EntityId> {
    self.owners.get(&id).copied()
  }

  pub fn has_children(&self, owner: EntityId, children: &[EntityId]) -> bool {
    match self.entity_data(owner) {
      Some(data) => children.iter().all(|c| data.has_child(*c)),
      None => false,
    }
  }

  #[inline]
  pub fn component_data<D: 'static>(&self, id: EntityId, ty: &ComponentType<D>) -> Option<&D> {
    self.components.get(id, ty)
  }

  #[inline]
  pub fn component_data_mut<D: 'static>(
    &mut self,
    id: EntityId,
    ty: &ComponentType<D>,
  ) -> Option<&mut D> {
    self.components.get_mut(id, ty)
  }

  #[inline]
  pub fn component_data_untyped<D: 'static>(&self, id: EntityId) -> Option<&D> {
    self.components.get_untyped(id)
  }

  #[inline]
  pub fn component_type_of(&self, id: EntityId) -> Option<ComponentTypeId> {
    self.components.type_of(id)
  }

  /// Payloads of type `ty` among the direct children of `owner`.
  pub fn components_of<D: 'static>(&self, owner: EntityId, ty: ComponentType<D>) -> ComponentsOf<'_, D> {
    ComponentsOf {
      world: self,
      children: self.entity_data(owner).map(|d| d.children.iter()),
      ty,
    }
  }

  pub fn entities(&self) -> impl Iterator<Item = (EntityId, Option<&EntityData>)> + '_ {
    self.entities.iter().map(|(id, data)| (*id, data.as_ref()))
  }

  pub(crate) fn containers(&self) -> impl Iterator<Item = EntityId> + '_ {
    self
      .entities
      .iter()
      .filter(|(_, data)| data.is_some())
      .map(|(id, _)| *id)
  }

  pub fn components(&self) -> impl Iterator<Item = (EntityId, ComponentTypeId)> + '_ {
    self.components.iter()
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.entities.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.entities.is_empty()
  }

  #[inline]
  pub fn next_id(&self) -> EntityId {
    self.next_id
  }
}

/// Lazy iterator over the payloads of one type among an entity's children.
///
/// It borrows the world, so the composition cannot change while it is alive;
/// call `components_of` again for a fresh view after a mutation.
pub struct ComponentsOf<'w, D> {
  world: &'w World,
  children: Option<btree_set::Iter<'w, EntityId>>,
  ty: ComponentType<D>,
}

impl<'w, D: 'static> Iterator for ComponentsOf<'w, D> {
  type Item = (EntityId, &'w D);

  fn next(&mut self) -> Option<Self::Item> {
    let world = self.world;
    let children = self.children.as_mut()?;
    for &child in children {
      if let Some(data) = world.components.get(child, &self.ty) {
        return Some((child, data));
      }
    }
    None
  }
}

#[cfg(test)]
mod test {
  use super::World;
  use crate::{components::ComponentType, error::EcsError};

  const TAG: ComponentType<u32> = ComponentType::new("tag");
  const NAME: ComponentType<&'static str> = ComponentType::new("name");

  fn component<D: 'static>(world: &mut World, ty: ComponentType<D>, data: D) -> u64 {
    let id = world.create_entity().unwrap();
    world.insert_component(id, Box::new(ty.create(data)));
    id
  }

  #[test]
  fn ids_are_monotonic() {
    let mut world = World::new();
    let a = world.create_entity().unwrap();
    let b = world.create_entity().unwrap();
    world.remove_entity(a);
    let c = world.create_entity().unwrap();

    assert!(a < b && b < c);
  }

  #[test]
  fn lazy_container_state() {
    let mut world = World::new();
    let owner = world.create_entity().unwrap();
    assert!(world.entity_data(owner).is_none());

    let tag = component(&mut world, TAG, 1);
    world.add_children(owner, &[tag]).unwrap();

    let data = world.entity_data(owner).unwrap();
    assert!(data.has_child(tag));
    assert!(data.has_component_type("tag"));
    assert_eq!(world.owner_of(tag), Some(owner));
  }

  #[test]
  fn empty_add_creates_container() {
    let mut world = World::new();
    let owner = world.create_entity().unwrap();
    world.add_children(owner, &[]).unwrap();

    let data = world.entity_data(owner).unwrap();
    assert!(data.children().is_empty());
    assert_eq!(world.containers().count(), 1);
  }

  #[test]
  fn type_counts_are_a_multiset() {
    let mut world = World::new();
    let owner = world.create_entity().unwrap();
    let a = component(&mut world, TAG, 1);
    let b = component(&mut world, TAG, 2);

    world.add_children(owner, &[a, b]).unwrap();
    assert_eq!(world.entity_data(owner).unwrap().count_of("tag"), 2);

    world.remove_children(owner, &[a]).unwrap();
    let data = world.entity_data(owner).unwrap();
    assert_eq!(data.count_of("tag"), 1);
    assert!(data.has_component_type("tag"));

    world.remove_children(owner, &[b]).unwrap();
    assert!(!world.entity_data(owner).unwrap().has_component_type("tag"));
  }

  #[test]
  fn adding_twice_counts_once() {
    let mut world = World::new();
    let owner = world.create_entity().unwrap();
    let a = component(&mut world, TAG, 1);

    world.add_children(owner, &[a, a]).unwrap();
    world.add_children(owner, &[a]).unwrap();
    assert_eq!(world.entity_data(owner).unwrap().count_of("tag"), 1);
  }

  #[test]
  fn adding_moves_between_owners() {
    let mut world = World::new();
    let first = world.create_entity().unwrap();
    let second = world.create_entity().unwrap();
    let a = component(&mut world, TAG, 1);

    world.add_children(first, &[a]).unwrap();
    let previous = world.add_children(second, &[a]).unwrap();

    assert_eq!(previous, vec![first]);
    assert!(!world.has_children(first, &[a]));
    assert!(world.has_children(second, &[a]));
    assert!(!world.entity_data(first).unwrap().has_component_type("tag"));
  }

  #[test]
  fn unknown_ids_are_errors() {
    let mut world = World::new();
    let owner = world.create_entity().unwrap();

    assert_eq!(world.add_children(99, &[owner]), Err(EcsError::EntityNotFound(99)));
    assert_eq!(world.add_children(owner, &[99]), Err(EcsError::EntityNotFound(99)));
    assert_eq!(world.remove_children(99, &[owner]), Err(EcsError::EntityNotFound(99)));
    assert_eq!(world.remove_children(owner, &[99]), Err(EcsError::EntityNotFound(99)));
    assert_eq!(
      world.add_children(owner, &[owner]),
      Err(EcsError::SelfContainment(owner))
    );
    assert!(world.entity_data(owner).is_none());
  }

  #[test]
  fn components_of_filters_by_type() {
    let mut world = World::new();
    let owner = world.create_entity().unwrap();
    let a = component(&mut world, TAG, 1);
    let b = component(&mut world, NAME, "b");
    let c = component(&mut world, TAG, 3);
    let plain = world.create_entity().unwrap();
    world.add_children(owner, &[a, b, c, plain]).unwrap();

    let tags = world.components_of(owner, TAG).collect::<Vec<_>>();
    assert_eq!(tags, vec![(a, &1), (c, &3)]);
    assert_eq!(world.components_of(plain, TAG).count(), 0);
    assert_eq!(world.components_of(1234, TAG).count(), 0);
  }

  #[test]
  fn remove_entity_returns_carriers() {
    let mut world = World::new();
    let owner = world.create_entity().unwrap();
    let a = component(&mut world, TAG, 1);
    let plain = world.create_entity().unwrap();
    world.add_children(owner, &[a, plain]).unwrap();

    let carriers = world.remove_entity(owner);
    assert_eq!(carriers, vec![a]);
    assert!(!world.is_entity(owner));
    assert_eq!(world.owner_of(plain), None);
    assert_eq!(world.owner_of(a), None);
  }

  #[test]
  fn replayed_ids_move_the_counter() {
    let mut world = World::new();
    world.create_entity_with_id(10).unwrap();
    assert_eq!(world.create_entity_with_id(10), Err(EcsError::EntityExists(10)));
    assert_eq!(world.create_entity(), Ok(11));
  }

  #[test]
  fn removing_an_unknown_child_detaches_nothing() {
    let mut world = World::new();
    let owner = world.create_entity().unwrap();
    let a = component(&mut world, TAG, 1);
    world.add_children(owner, &[a]).unwrap();

    assert_eq!(
      world.remove_children(owner, &[a, 424242]),
      Err(EcsError::EntityNotFound(424242))
    );
    assert!(world.has_children(owner, &[a]));
    assert_eq!(world.entity_data(owner).unwrap().count_of("tag"), 1);
  }

  #[test]
  fn last_id_is_never_used() {
    let mut world = World::new();
    assert_eq!(
      world.create_entity_with_id(u64::MAX),
      Err(EcsError::IdsExhausted(u64::MAX))
    );
    assert!(!world.is_entity(u64::MAX));

    world.create_entity_with_id(u64::MAX - 1).unwrap();
    assert_eq!(world.create_entity(), Err(EcsError::IdsExhausted(u64::MAX)));
    assert!(!world.is_entity(u64::MAX));
  }
}
