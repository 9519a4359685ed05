#[derive(Debug, Clone)]
pub struct EcsConfig {
  /// Enable systems as they are added, firing their `on_enable` hook.
  pub enable_systems_on_add: bool,
  /// Create the engine paused; `tick` does nothing until `resume`.
  pub start_paused: bool,
}

impl Default for EcsConfig {
  fn default() -> Self {
    Self {
      enable_systems_on_add: true,
      start_paused: false,
    }
  }
}

impl EcsConfig {
  pub fn set_enable_systems_on_add(mut self, enable: bool) -> Self {
    self.enable_systems_on_add = enable;
    self
  }

  pub fn set_start_paused(mut self, paused: bool) -> Self {
    self.start_paused = paused;
    self
  }
}
