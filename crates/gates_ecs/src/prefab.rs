use log::debug;

use crate::{
  components::{ComponentType, StoredComponent},
  error::EcsError,
  ComponentTypeId, EntityId, ECS,
};

type Factory = Box<dyn Fn(EntityId) -> Box<dyn StoredComponent>>;
type CreateFn = Box<dyn Fn(&mut ECS, EntityId)>;

/// Template for an entity with a fixed set of components.
pub struct Prefab {
  name: String,
  components: Vec<(ComponentTypeId, Factory)>,
  on_create: Option<CreateFn>,
}

impl Prefab {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      components: Vec::new(),
      on_create: None,
    }
  }

  /// Declares a component. The factory receives the id of the new entity.
  /// A type can only be declared once; the first declaration is kept.
  pub fn add_component<D: 'static>(
    &mut self,
    ty: ComponentType<D>,
    factory: impl Fn(EntityId) -> D + 'static,
  ) -> Result<&mut Self, EcsError> {
    if self.components.iter().any(|(id, _)| *id == ty.id()) {
      return Err(EcsError::DuplicateRegistration(format!(
        "Component {} of prefab {}",
        ty.id(),
        self.name
      )));
    }

    let factory: Factory =
      Box::new(move |entity| -> Box<dyn StoredComponent> { Box::new(ty.create(factory(entity))) });
    self.components.push((ty.id(), factory));
    Ok(self)
  }

  /// Runs after every component has been attached.
  pub fn on_create(&mut self, f: impl Fn(&mut ECS, EntityId) + 'static) -> &mut Self {
    self.on_create = Some(Box::new(f));
    self
  }

  pub fn create(&self, ecs: &mut ECS) -> Result<EntityId, EcsError> {
    let entity = ecs.entity()?;

    let mut children = Vec::with_capacity(self.components.len());
    for (_, factory) in &self.components {
      children.push(ecs.component_boxed(factory(entity))?);
    }
    ecs.add_to(entity, &children)?;

    if let Some(on_create) = &self.on_create {
      on_create(ecs, entity);
    }

    debug!("Created {} from prefab {}", entity, self.name);
    Ok(entity)
  }

  #[inline]
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn component_types(&self) -> impl Iterator<Item = ComponentTypeId> + '_ {
    self.components.iter().map(|(id, _)| *id)
  }
}
