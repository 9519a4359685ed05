use gates_ecs::error::EcsError;
use gates_scene::error::SceneError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
  #[error("Tick rate has to be at least 1")]
  InvalidTickRate,
  #[error("No scene is active")]
  NoActiveScene,
  #[error(transparent)]
  Ecs(#[from] EcsError),
  #[error(transparent)]
  Scene(#[from] SceneError),
}
