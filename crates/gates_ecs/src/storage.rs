#[cfg(feature = "debug")]
use log::trace;
use rustc_hash::FxHashMap;

use crate::{
  components::{ComponentPayload, ComponentType, StoredComponent},
  ComponentTypeId, EntityId,
};

/// Payloads of component carrying entities, keyed by the carrier's id.
#[derive(Default)]
pub(crate) struct ComponentStore {
  payloads: FxHashMap<EntityId, Box<dyn StoredComponent>>,
}

impl ComponentStore {
  pub fn insert<D: 'static>(&mut self, id: EntityId, payload: ComponentPayload<D>) {
    self.insert_boxed(id, Box::new(payload));
  }

  pub fn insert_boxed(&mut self, id: EntityId, payload: Box<dyn StoredComponent>) {
    #[cfg(feature = "debug")]
    trace!("Storing {} payload on {}", payload.component_type(), id);

    if let Some(old) = self.payloads.insert(id, payload) {
      old.destroy();
    }
  }

  #[inline]
  pub fn contains(&self, id: EntityId) -> bool {
    self.payloads.contains_key(&id)
  }

  #[inline]
  pub fn type_of(&self, id: EntityId) -> Option<ComponentTypeId> {
    self.payloads.get(&id).map(|p| p.component_type())
  }

  /// Typed retrieval: the stored type id has to match exactly.
  pub fn get<D: 'static>(&self, id: EntityId, ty: &ComponentType<D>) -> Option<&D> {
    let payload = self.payloads.get(&id)?;
    if payload.component_type() != ty.id() {
      return None;
    }
    payload.data().downcast_ref()
  }

  pub fn get_mut<D: 'static>(&mut self, id: EntityId, ty: &ComponentType<D>) -> Option<&mut D> {
    let payload = self.payloads.get_mut(&id)?;
    if payload.component_type() != ty.id() {
      return None;
    }
    payload.data_mut().downcast_mut()
  }

  /// Retrieval checked only against the Rust type of the data.
  pub fn get_untyped<D: 'static>(&self, id: EntityId) -> Option<&D> {
    self.payloads.get(&id)?.data().downcast_ref()
  }

  /// Drops the payload of `id`, running its destructor. Returns whether there was one.
  pub fn destroy(&mut self, id: EntityId) -> bool {
    match self.payloads.remove(&id) {
      Some(payload) => {
        #[cfg(feature = "debug")]
        trace!("Destroying {} payload of {}", payload.component_type(), id);

        payload.destroy();
        true
      }
      None => false,
    }
  }

  pub fn clear(&mut self) {
    for (_, payload) in self.payloads.drain() {
      payload.destroy();
    }
  }

  pub fn len(&self) -> usize {
    self.payloads.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = (EntityId, ComponentTypeId)> + '_ {
    self
      .payloads
      .iter()
      .map(|(id, payload)| (*id, payload.component_type()))
  }
}

impl Drop for ComponentStore {
  fn drop(&mut self) {
    self.clear();
  }
}
