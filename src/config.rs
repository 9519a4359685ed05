use gates_ecs::config::EcsConfig;

#[derive(Debug, Clone)]
pub struct EngineConfig {
  /// Ticks per second.
  pub tick_rate: u32,
  /// Pass `1 / tick_rate` to systems instead of the measured time between ticks.
  pub fixed_delta: bool,
  pub ecs: EcsConfig,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      tick_rate: 60,
      fixed_delta: false,
      ecs: EcsConfig::default(),
    }
  }
}

impl EngineConfig {
  pub fn set_tick_rate(mut self, tick_rate: u32) -> Self {
    self.tick_rate = tick_rate;
    self
  }

  pub fn set_fixed_delta(mut self, fixed_delta: bool) -> Self {
    self.fixed_delta = fixed_delta;
    self
  }

  pub fn set_ecs_config(mut self, ecs: EcsConfig) -> Self {
    self.ecs = ecs;
    self
  }
}
