use std::{
  any::{type_name, Any},
  fmt,
  marker::PhantomData,
};

use crate::ComponentTypeId;

/// Stable identity of a kind of component payload.
///
/// Two types are the same type only if their ids are equal; retrieval through a
/// `ComponentType` is checked against the stored id, not against the shape of
/// the data.
pub struct ComponentType<D> {
  id: ComponentTypeId,
  destructor: Option<fn(D)>,
  marker: PhantomData<fn() -> D>,
}

impl<D> ComponentType<D> {
  pub const fn new(id: ComponentTypeId) -> Self {
    Self {
      id,
      destructor: None,
      marker: PhantomData,
    }
  }

  /// The destructor runs exactly once, when the payload is discarded.
  pub const fn with_destructor(id: ComponentTypeId, destructor: fn(D)) -> Self {
    Self {
      id,
      destructor: Some(destructor),
      marker: PhantomData,
    }
  }

  #[inline]
  pub const fn id(&self) -> ComponentTypeId {
    self.id
  }

  #[inline]
  pub fn create(&self, data: D) -> ComponentPayload<D> {
    ComponentPayload { ty: *self, data }
  }
}

impl<D> Clone for ComponentType<D> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<D> Copy for ComponentType<D> {}

impl<D> PartialEq for ComponentType<D> {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
  }
}

impl<D> Eq for ComponentType<D> {}

impl<D> fmt::Debug for ComponentType<D> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ComponentType")
      .field("id", &self.id)
      .field("data", &type_name::<D>())
      .finish()
  }
}

/// Types with a canonical `ComponentType`, usually implemented with
/// `#[derive(Component)]`.
pub trait Component: Sized + 'static {
  const TYPE: ComponentType<Self>;

  #[inline]
  fn into_payload(self) -> ComponentPayload<Self> {
    Self::TYPE.create(self)
  }
}

/// Tagged data of a component carrying entity.
pub struct ComponentPayload<D> {
  pub ty: ComponentType<D>,
  pub data: D,
}

impl<D: fmt::Debug> fmt::Debug for ComponentPayload<D> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ComponentPayload")
      .field("ty", &self.ty.id)
      .field("data", &self.data)
      .finish()
  }
}

impl<C: Component> From<C> for ComponentPayload<C> {
  fn from(value: C) -> Self {
    value.into_payload()
  }
}

pub(crate) trait StoredComponent {
  fn component_type(&self) -> ComponentTypeId;
  fn data(&self) -> &dyn Any;
  fn data_mut(&mut self) -> &mut dyn Any;
  fn destroy(self: Box<Self>);
}

impl<D: 'static> StoredComponent for ComponentPayload<D> {
  #[inline]
  fn component_type(&self) -> ComponentTypeId {
    self.ty.id
  }

  #[inline]
  fn data(&self) -> &dyn Any {
    &self.data
  }

  #[inline]
  fn data_mut(&mut self) -> &mut dyn Any {
    &mut self.data
  }

  fn destroy(self: Box<Self>) {
    let ComponentPayload { ty, data } = *self;
    if let Some(destructor) = ty.destructor {
      destructor(data);
    }
  }
}

#[cfg(test)]
mod test {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::{Component, ComponentPayload, ComponentType, StoredComponent};
  use crate as gates_ecs;
  use gates_ecs_macros::Component;

  static DESTROYED: AtomicUsize = AtomicUsize::new(0);

  fn count_destroy(_: Tagged) {
    DESTROYED.fetch_add(1, Ordering::SeqCst);
  }

  #[derive(Component)]
  struct Plain {}

  #[derive(Component)]
  #[component(id = "tagged", destructor = count_destroy)]
  struct Tagged(u32);

  #[test]
  fn derived_ids() {
    assert_eq!(Plain::TYPE.id(), "Plain");
    assert_eq!(Tagged::TYPE.id(), "tagged");
  }

  #[test]
  fn equality_is_by_id() {
    const A: ComponentType<u32> = ComponentType::new("a");
    const A2: ComponentType<u32> = ComponentType::new("a");
    const B: ComponentType<u32> = ComponentType::new("b");

    assert_eq!(A, A2);
    assert_ne!(A, B);
  }

  #[test]
  fn destroy_runs_destructor_once() {
    let payload: Box<dyn StoredComponent> = Box::new(Tagged(3).into_payload());
    assert_eq!(payload.component_type(), "tagged");

    let before = DESTROYED.load(Ordering::SeqCst);
    payload.destroy();
    assert_eq!(DESTROYED.load(Ordering::SeqCst), before + 1);
  }

  #[test]
  fn payload_from_component() {
    let payload: ComponentPayload<Tagged> = Tagged(7).into();
    assert_eq!(payload.ty, Tagged::TYPE);
    assert_eq!(payload.data.0, 7);
  }
}
