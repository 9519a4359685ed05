use std::collections::BTreeMap;

#[cfg(feature = "debug")]
use log::trace;

use crate::{Phase, SystemId};

/// Phases used by the bundled game loop. Any other `Phase` value works too;
/// phases always run in ascending order.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub enum TickPhase {
  EarlyUpdate = 0,
  Update = 1,
  Physics = 2,
  Presentation = 3,
}

impl From<TickPhase> for Phase {
  fn from(value: TickPhase) -> Self {
    value as Phase
  }
}

/// Execution order of systems: phase buckets in ascending key order, systems
/// within a bucket in insertion order.
#[derive(Default)]
pub(crate) struct Scheduler {
  phases: BTreeMap<Phase, Vec<SystemId>>,
}

impl Scheduler {
  pub fn add_system(&mut self, id: SystemId, phase: Phase) {
    #[cfg(feature = "debug")]
    trace!("Scheduling System {} in phase {}", id, phase);

    self.phases.entry(phase).or_default().push(id);
  }

  /// Empty buckets are dropped.
  pub fn remove_system(&mut self, id: SystemId, phase: Phase) -> bool {
    let Some(bucket) = self.phases.get_mut(&phase) else {
      return false;
    };
    let len = bucket.len();
    bucket.retain(|s| *s != id);
    let removed = bucket.len() != len;

    if bucket.is_empty() {
      self.phases.remove(&phase);
    }
    removed
  }

  pub fn order(&self) -> Vec<SystemId> {
    self.phases.values().flatten().copied().collect()
  }

  pub fn phases(&self) -> impl Iterator<Item = Phase> + '_ {
    self.phases.keys().copied()
  }
}

#[cfg(test)]
mod test {
  use super::{Scheduler, TickPhase};
  use crate::Phase;

  #[test]
  fn phases_run_ascending() {
    let mut scheduler = Scheduler::default();
    scheduler.add_system(0, 2);
    scheduler.add_system(1, 0);
    scheduler.add_system(2, 1);
    scheduler.add_system(3, 0);

    assert_eq!(scheduler.order(), vec![1, 3, 2, 0]);
    assert_eq!(scheduler.phases().collect::<Vec<_>>(), vec![0, 1, 2]);
  }

  #[test]
  fn negative_phases_run_first() {
    let mut scheduler = Scheduler::default();
    scheduler.add_system(0, Phase::from(TickPhase::Presentation));
    scheduler.add_system(1, -5);

    assert_eq!(scheduler.order(), vec![1, 0]);
  }

  #[test]
  fn empty_phase_is_dropped() {
    let mut scheduler = Scheduler::default();
    scheduler.add_system(0, 1);

    assert!(scheduler.remove_system(0, 1));
    assert!(!scheduler.remove_system(0, 1));
    assert_eq!(scheduler.phases().count(), 0);

    scheduler.add_system(1, 1);
    assert_eq!(scheduler.order(), vec![1]);
  }
}
