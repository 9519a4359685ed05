pub mod error;
pub mod registry;
pub mod save;
pub mod scene;

pub use registry::ComponentRegistry;
pub use save::{load, save, SceneSave};
pub use scene::{Scene, SceneManager};
