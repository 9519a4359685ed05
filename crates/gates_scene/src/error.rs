use gates_ecs::error::EcsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SceneError {
  #[error(transparent)]
  Ecs(#[from] EcsError),
  #[error("Invalid scene data: {0}")]
  Json(#[from] serde_json::Error),
  #[error("Scene file error: {0}")]
  Io(#[from] std::io::Error),
  #[error("Component type {0} is not registered")]
  UnknownComponentType(String),
  #[error("Payload of component {0} does not match its registered type")]
  PayloadMismatch(String),
  #[error("Scene {0} already exists")]
  SceneExists(String),
  #[error("Scene {0} does not exist")]
  SceneMissing(String),
  #[error("Scene {0} already active")]
  SceneAlreadyActive(String),
}
