use std::{
  thread,
  time::{Duration, Instant},
};

#[allow(unused_imports)]
use log::{info, trace};

use gates_ecs::ECS;
use gates_scene::{ComponentRegistry, SceneManager};

use crate::{config::EngineConfig, error::EngineError};

/// Drives the active scene of a `SceneManager` at a fixed tick rate.
pub struct Engine {
  config: EngineConfig,
  scenes: SceneManager,
  last_tick: Option<Instant>,
}

impl Engine {
  pub fn new(config: EngineConfig, registry: ComponentRegistry) -> Result<Self, EngineError> {
    if config.tick_rate == 0 {
      return Err(EngineError::InvalidTickRate);
    }
    info!("Creating Engine running at {} ticks/s", config.tick_rate);

    Ok(Self {
      config,
      scenes: SceneManager::new(registry),
      last_tick: None,
    })
  }

  /// A fresh, uninitialized engine using the configured ECS settings.
  pub fn create_ecs(&self) -> ECS {
    ECS::new(self.config.ecs.clone())
  }

  #[inline]
  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  #[inline]
  pub fn scenes(&self) -> &SceneManager {
    &self.scenes
  }

  #[inline]
  pub fn scenes_mut(&mut self) -> &mut SceneManager {
    &mut self.scenes
  }

  pub fn add_scene(&mut self, id: impl Into<String>, ecs: ECS) -> Result<(), EngineError> {
    Ok(self.scenes.add(id, ecs)?)
  }

  pub fn activate(&mut self, id: &str) -> Result<&mut ECS, EngineError> {
    self.last_tick = None;
    Ok(self.scenes.activate(id)?)
  }

  #[inline]
  fn time_per_tick(&self) -> Duration {
    Duration::from_secs(1) / self.config.tick_rate
  }

  /// Ticks the active scene once and returns the delta passed to it.
  pub fn step(&mut self) -> Result<f64, EngineError> {
    let now = Instant::now();
    let delta = match self.last_tick {
      Some(last) if !self.config.fixed_delta => now - last,
      _ => self.time_per_tick(),
    };
    let delta = delta.as_secs_f64();

    let ecs = self.scenes.active_mut().ok_or(EngineError::NoActiveScene)?;
    ecs.tick(delta)?;

    self.last_tick = Some(now);
    Ok(delta)
  }

  /// Steps `ticks` times, sleeping between ticks to hold the tick rate.
  pub fn run_for(&mut self, ticks: u64) -> Result<(), EngineError> {
    info!("Running {} ticks", ticks);
    let time_per_tick = self.time_per_tick();
    let mut last_tick = Instant::now();

    for _ in 0..ticks {
      let elapsed = last_tick.elapsed();
      if elapsed < time_per_tick {
        thread::sleep(time_per_tick - elapsed);
      }
      last_tick = Instant::now();

      self.step()?;

      #[cfg(feature = "debug")]
      trace!("Tick took {:?}", last_tick.elapsed());
    }

    Ok(())
  }
}
