use std::collections::BTreeMap;

#[allow(unused_imports)]
use log::{debug, trace};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use gates_ecs::{
  components::{Component, ComponentType},
  error::EcsError,
  ComponentTypeId, EntityId, ECS,
};

use crate::error::SceneError;

type SaveFn = Box<dyn Fn(&ECS, EntityId) -> Result<Value, SceneError>>;
type LoadFn = Box<dyn Fn(&mut ECS, EntityId, Value) -> Result<(), SceneError>>;

struct Codec {
  save: SaveFn,
  load: LoadFn,
}

/// Maps component type ids to the functions that turn their payloads into
/// JSON and back. Only registered types can be saved or loaded.
#[derive(Default)]
pub struct ComponentRegistry {
  codecs: BTreeMap<ComponentTypeId, Codec>,
}

impl ComponentRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers a codec for `ty`. A type id can only be registered once.
  pub fn register<D>(&mut self, ty: ComponentType<D>) -> Result<&mut Self, EcsError>
  where
    D: Serialize + DeserializeOwned + 'static,
  {
    if self.codecs.contains_key(ty.id()) {
      return Err(EcsError::DuplicateRegistration(format!(
        "Component type {}",
        ty.id()
      )));
    }
    debug!("Registering codec for component type {}", ty.id());

    let save: SaveFn = Box::new(move |ecs: &ECS, id: EntityId| -> Result<Value, SceneError> {
      let data = ecs
        .component_data(id, &ty)?
        .ok_or_else(|| SceneError::PayloadMismatch(ty.id().to_string()))?;
      Ok(serde_json::to_value(data)?)
    });
    let load: LoadFn = Box::new(
      move |ecs: &mut ECS, id: EntityId, value: Value| -> Result<(), SceneError> {
        let data: D = serde_json::from_value(value)?;
        ecs.replay_component(id, ty.create(data))?;
        Ok(())
      },
    );

    self.codecs.insert(ty.id(), Codec { save, load });
    Ok(self)
  }

  pub fn register_component<C>(&mut self) -> Result<&mut Self, EcsError>
  where
    C: Component + Serialize + DeserializeOwned,
  {
    self.register(C::TYPE)
  }

  pub(crate) fn save_component(
    &self,
    ecs: &ECS,
    id: EntityId,
    ty: &str,
  ) -> Result<Value, SceneError> {
    let codec = self.codec(ty)?;
    (codec.save)(ecs, id)
  }

  pub(crate) fn load_component(
    &self,
    ecs: &mut ECS,
    id: EntityId,
    ty: &str,
    value: Value,
  ) -> Result<(), SceneError> {
    #[cfg(feature = "debug")]
    trace!("Loading {} component {}", ty, id);

    let codec = self.codec(ty)?;
    (codec.load)(ecs, id, value)
  }

  fn codec(&self, ty: &str) -> Result<&Codec, SceneError> {
    self
      .codecs
      .get(ty)
      .ok_or_else(|| SceneError::UnknownComponentType(ty.to_string()))
  }

  #[inline]
  pub fn contains(&self, ty: &str) -> bool {
    self.codecs.contains_key(ty)
  }

  /// Registered type ids, sorted.
  pub fn types(&self) -> impl Iterator<Item = ComponentTypeId> + '_ {
    self.codecs.keys().copied()
  }
}
