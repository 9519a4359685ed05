use thiserror::Error;

use crate::{EntityId, SystemId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
  #[error("ECS is already initialized")]
  AlreadyInitialized,
  #[error("ECS is not initialized")]
  UninitializedAccess,
  #[error("Entity {0} does not exist")]
  EntityNotFound(EntityId),
  #[error("Entity {0} already exists")]
  EntityExists(EntityId),
  #[error("Entity {0} can not contain itself")]
  SelfContainment(EntityId),
  #[error("{0} is already registered")]
  DuplicateRegistration(String),
  #[error("System {0} does not exist")]
  SystemNotFound(SystemId),
  #[error("Can not tick or flush while System {0} is running")]
  SystemRunning(SystemId),
  #[error("No entity ids left after {0}")]
  IdsExhausted(EntityId),
}
