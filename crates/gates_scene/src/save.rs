use std::{fs, path::Path};

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use gates_ecs::{error::EcsError, EntityId, ECS};

use crate::{error::SceneError, registry::ComponentRegistry};

/// Snapshot of every entity and component of an engine.
///
/// Entities are sorted by id and components by type id, then entity id, so
/// saving an unchanged engine twice gives the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneSave {
  pub entities: Vec<SavedEntity>,
  pub components: Vec<SavedComponent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedEntity {
  pub id: EntityId,
  /// `None` for entities that never had children added.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub children: Option<Vec<EntityId>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedComponent {
  pub id: EntityId,
  #[serde(rename = "type")]
  pub ty: String,
  pub data: Value,
}

impl SceneSave {
  pub fn to_json(&self) -> Result<String, SceneError> {
    Ok(serde_json::to_string(self)?)
  }

  pub fn from_json(json: &str) -> Result<Self, SceneError> {
    Ok(serde_json::from_str(json)?)
  }

  pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), SceneError> {
    let path = path.as_ref();
    debug!("Writing scene to {}", path.display());

    fs::write(path, serde_json::to_string_pretty(self)?)?;
    Ok(())
  }

  pub fn read_from(path: impl AsRef<Path>) -> Result<Self, SceneError> {
    let path = path.as_ref();
    debug!("Reading scene from {}", path.display());

    Self::from_json(&fs::read_to_string(path)?)
  }
}

/// Saves every entity and component of `ecs`. Each component type has to be
/// registered in `registry`.
pub fn save(ecs: &ECS, registry: &ComponentRegistry) -> Result<SceneSave, SceneError> {
  let mut entities = ecs
    .entities()?
    .map(|(id, data)| SavedEntity {
      id,
      children: data.map(|data| data.children().iter().copied().collect()),
    })
    .collect::<Vec<_>>();
  entities.sort_unstable_by_key(|entity| entity.id);

  let mut components = Vec::new();
  for (id, ty) in ecs.components()? {
    components.push(SavedComponent {
      id,
      ty: ty.to_string(),
      data: registry.save_component(ecs, id, ty)?,
    });
  }
  components.sort_unstable_by(|a, b| a.ty.cmp(&b.ty).then(a.id.cmp(&b.id)));

  debug!(
    "Saved {} entities with {} components",
    entities.len(),
    components.len()
  );
  Ok(SceneSave {
    entities,
    components,
  })
}

/// Initializes `ecs` and replays `save` into it, keeping every id. Components
/// are created first, then the remaining entities, then the children.
///
/// `ecs` must not be initialized. A failed load leaves it partially filled.
pub fn load(ecs: &mut ECS, registry: &ComponentRegistry, save: &SceneSave) -> Result<(), SceneError> {
  if ecs.is_initialized() {
    return Err(EcsError::AlreadyInitialized.into());
  }
  ecs.init()?;

  for component in &save.components {
    registry.load_component(ecs, component.id, &component.ty, component.data.clone())?;
  }
  for entity in &save.entities {
    if !ecs.is_entity(entity.id) {
      ecs.replay_entity(entity.id)?;
    }
  }
  for entity in &save.entities {
    if let Some(children) = &entity.children {
      ecs.add_to(entity.id, children)?;
    }
  }

  debug!(
    "Loaded {} entities with {} components",
    save.entities.len(),
    save.components.len()
  );
  Ok(())
}

#[cfg(test)]
mod test {
  use std::{cell::RefCell, rc::Rc};

  use gates_ecs::{
    components::ComponentType,
    error::EcsError,
    systems::{FunctionSystem, System},
    world::World,
    ComponentTypeId, EntityId, ECS,
  };

  use super::{load, save, SceneSave};
  use crate::{error::SceneError, registry::ComponentRegistry};

  const TAG: ComponentType<String> = ComponentType::new("tag");
  const POSITION: ComponentType<(f32, f32)> = ComponentType::new("position");

  fn registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    registry.register(TAG).unwrap().register(POSITION).unwrap();
    registry
  }

  struct Ids {
    empty: EntityId,
    tagged: EntityId,
    plain: EntityId,
    loose: EntityId,
  }

  fn populate(ecs: &mut ECS) -> Ids {
    ecs.init().unwrap();

    let empty = ecs.entity().unwrap();
    ecs.add_to(empty, &[]).unwrap();

    let tagged = ecs.entity().unwrap();
    ecs.add_component(tagged, TAG.create("a".into())).unwrap();
    ecs.add_component(tagged, TAG.create("b".into())).unwrap();
    ecs.add_component(tagged, POSITION.create((1.0, 2.0))).unwrap();

    let plain = ecs.entity().unwrap();
    ecs.add_to(tagged, &[plain]).unwrap();

    let loose = ecs.component(POSITION.create((3.0, 4.0))).unwrap();

    Ids {
      empty,
      tagged,
      plain,
      loose,
    }
  }

  #[test]
  fn round_trip() {
    let registry = registry();
    let mut ecs = ECS::default();
    let ids = populate(&mut ecs);
    let saved = save(&ecs, &registry).unwrap();

    let mut loaded = ECS::default();
    load(&mut loaded, &registry, &saved).unwrap();

    assert_eq!(save(&loaded, &registry).unwrap(), saved);
    assert!(loaded.entity_data(ids.empty).unwrap().unwrap().children().is_empty());
    assert!(loaded.entity_data(ids.plain).unwrap().is_none());
    assert_eq!(loaded.parent_of(ids.plain).unwrap(), Some(ids.tagged));
    assert_eq!(
      loaded.component_data(ids.loose, &POSITION).unwrap(),
      Some(&(3.0, 4.0))
    );

    let data = loaded.entity_data(ids.tagged).unwrap().unwrap();
    assert_eq!(data.count_of("tag"), 2);
    assert_eq!(data.children().len(), 4);

    let mut tags = loaded
      .components_of(ids.tagged, TAG)
      .unwrap()
      .map(|(_, tag)| tag.clone())
      .collect::<Vec<_>>();
    tags.sort();
    assert_eq!(tags, vec!["a", "b"]);

    assert!(loaded.entity().unwrap() > ids.loose);
  }

  #[test]
  fn saves_are_deterministic() {
    let registry = registry();
    let mut ecs = ECS::default();
    populate(&mut ecs);

    let first = save(&ecs, &registry).unwrap().to_json().unwrap();
    let second = save(&ecs, &registry).unwrap().to_json().unwrap();
    assert_eq!(first, second);

    let parsed = SceneSave::from_json(&first).unwrap();
    assert_eq!(parsed.to_json().unwrap(), first);

    let types = parsed
      .components
      .iter()
      .map(|c| (c.ty.as_str(), c.id))
      .collect::<Vec<_>>();
    let mut sorted = types.clone();
    sorted.sort();
    assert_eq!(types, sorted);
  }

  #[test]
  fn load_rejects_initialized_engines() {
    let registry = registry();
    let mut ecs = ECS::default();
    ecs.init().unwrap();

    assert!(matches!(
      load(&mut ecs, &registry, &SceneSave::default()),
      Err(SceneError::Ecs(EcsError::AlreadyInitialized))
    ));
  }

  #[test]
  fn load_rejects_the_last_id() {
    let registry = registry();
    let mut ecs = ECS::default();
    let json = format!(r#"{{"entities":[{{"id":{}}}],"components":[]}}"#, u64::MAX);
    let save = SceneSave::from_json(&json).unwrap();

    assert!(matches!(
      load(&mut ecs, &registry, &save),
      Err(SceneError::Ecs(EcsError::IdsExhausted(u64::MAX)))
    ));
    assert!(!ecs.is_entity(u64::MAX));
  }

  #[test]
  fn unregistered_types_cannot_be_saved() {
    let mut ecs = ECS::default();
    populate(&mut ecs);

    let mut registry = ComponentRegistry::new();
    registry.register(TAG).unwrap();
    assert!(matches!(
      save(&ecs, &registry),
      Err(SceneError::UnknownComponentType(ty)) if ty == "position"
    ));
  }

  #[test]
  fn loading_notifies_systems() {
    struct Counter {
      log: Rc<RefCell<Vec<EntityId>>>,
    }

    impl System for Counter {
      fn required(&self) -> Vec<ComponentTypeId> {
        vec!["tag", "position"]
      }

      fn update(&mut self, _: &mut ECS, _: &[EntityId], _: f64) {}

      fn on_match(&mut self, _: &World, entity: EntityId) {
        self.log.borrow_mut().push(entity);
      }
    }

    let registry = registry();
    let mut ecs = ECS::default();
    let ids = populate(&mut ecs);
    let saved = save(&ecs, &registry).unwrap();

    let log = Rc::new(RefCell::new(Vec::new()));
    let mut loaded = ECS::default();
    let id = loaded.add_system(Counter { log: log.clone() });
    loaded.add_system(FunctionSystem::new(&["position"], 0, |_, _, _| {}));
    load(&mut loaded, &registry, &saved).unwrap();

    assert_eq!(*log.borrow(), vec![ids.tagged]);
    assert!(loaded.is_matched(id, ids.tagged));
  }

  #[test]
  fn files() {
    let registry = registry();
    let mut ecs = ECS::default();
    populate(&mut ecs);
    let saved = save(&ecs, &registry).unwrap();

    let path = std::env::temp_dir().join(format!("gates_scene_{}.json", std::process::id()));
    saved.write_to(&path).unwrap();
    let read = SceneSave::read_from(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(read, saved);
    assert!(matches!(
      SceneSave::read_from(&path),
      Err(SceneError::Io(_))
    ));
  }
}
