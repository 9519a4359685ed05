pub mod config;
pub mod engine;
pub mod error;

pub use gates_ecs as ecs;
pub use gates_scene as scene;
pub use log;

pub use ecs::{Component, ECS};
