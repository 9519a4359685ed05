use std::collections::BTreeMap;

use log::{debug, info};

use gates_ecs::ECS;

use crate::{
  error::SceneError,
  registry::ComponentRegistry,
  save::{self, SceneSave},
};

/// An engine together with the last snapshot taken of it.
pub struct Scene {
  ecs: ECS,
  last_save: Option<SceneSave>,
}

impl Scene {
  pub fn new(ecs: ECS) -> Self {
    Self {
      ecs,
      last_save: None,
    }
  }

  #[inline]
  pub fn ecs(&self) -> &ECS {
    &self.ecs
  }

  #[inline]
  pub fn ecs_mut(&mut self) -> &mut ECS {
    &mut self.ecs
  }

  #[inline]
  pub fn last_save(&self) -> Option<&SceneSave> {
    self.last_save.as_ref()
  }

  /// Snapshots the engine, replacing the previous snapshot.
  pub fn save(&mut self, registry: &ComponentRegistry) -> Result<&SceneSave, SceneError> {
    let snapshot = save::save(&self.ecs, registry)?;
    Ok(self.last_save.insert(snapshot))
  }

  /// Resets the engine and reloads the last snapshot. Without one the engine
  /// comes back empty.
  pub fn revert(&mut self, registry: &ComponentRegistry) -> Result<(), SceneError> {
    self.ecs.reset();
    match &self.last_save {
      Some(snapshot) => save::load(&mut self.ecs, registry, snapshot),
      None => Ok(self.ecs.init()?),
    }
  }
}

/// Named scenes, at most one of them active.
pub struct SceneManager {
  registry: ComponentRegistry,
  scenes: BTreeMap<String, Scene>,
  active: Option<String>,
}

impl SceneManager {
  pub fn new(registry: ComponentRegistry) -> Self {
    Self {
      registry,
      scenes: BTreeMap::new(),
      active: None,
    }
  }

  /// Adds a scene, snapshotting `ecs` if it is initialized.
  pub fn add(&mut self, id: impl Into<String>, ecs: ECS) -> Result<(), SceneError> {
    let id = id.into();
    if self.scenes.contains_key(&id) {
      return Err(SceneError::SceneExists(id));
    }

    let mut scene = Scene::new(ecs);
    if scene.ecs.is_initialized() {
      scene.save(&self.registry)?;
    }

    debug!("Adding Scene {}", id);
    self.scenes.insert(id, scene);
    Ok(())
  }

  /// Saves and resets the active scene, then restores `id` from its last
  /// snapshot and makes it active.
  pub fn activate(&mut self, id: &str) -> Result<&mut ECS, SceneError> {
    if self.active.as_deref() == Some(id) {
      return Err(SceneError::SceneAlreadyActive(id.to_string()));
    }
    if !self.scenes.contains_key(id) {
      return Err(SceneError::SceneMissing(id.to_string()));
    }

    self.save_active(true)?;

    let scene = self
      .scenes
      .get_mut(id)
      .ok_or_else(|| SceneError::SceneMissing(id.to_string()))?;
    scene.revert(&self.registry)?;

    info!("Activated Scene {}", id);
    self.active = Some(id.to_string());
    Ok(&mut scene.ecs)
  }

  /// Snapshots the active scene, resetting its engine if `reset` is set.
  /// Does nothing without an active scene.
  pub fn save_active(&mut self, reset: bool) -> Result<(), SceneError> {
    let Some(id) = &self.active else {
      return Ok(());
    };
    let scene = self
      .scenes
      .get_mut(id)
      .ok_or_else(|| SceneError::SceneMissing(id.clone()))?;

    debug!("Saving Scene {}", id);
    scene.save(&self.registry)?;
    if reset {
      scene.ecs.reset();
    }
    Ok(())
  }

  #[inline]
  pub fn active_id(&self) -> Option<&str> {
    self.active.as_deref()
  }

  pub fn active(&self) -> Option<&ECS> {
    self.scenes.get(self.active.as_deref()?).map(Scene::ecs)
  }

  pub fn active_mut(&mut self) -> Option<&mut ECS> {
    self.scenes.get_mut(self.active.as_deref()?).map(Scene::ecs_mut)
  }

  /// Reverts the active scene to its last snapshot.
  pub fn revert_active(&mut self) -> Result<(), SceneError> {
    let Some(id) = &self.active else {
      return Ok(());
    };
    match self.scenes.get_mut(id) {
      Some(scene) => scene.revert(&self.registry),
      None => Err(SceneError::SceneMissing(id.clone())),
    }
  }

  pub fn scene(&self, id: &str) -> Option<&Scene> {
    self.scenes.get(id)
  }

  #[inline]
  pub fn registry(&self) -> &ComponentRegistry {
    &self.registry
  }
}
