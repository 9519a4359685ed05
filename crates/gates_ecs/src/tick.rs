/// Number of ticks an engine has run.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Debug, Default)]
pub struct Tick(u64);

impl Tick {
  #[inline]
  pub const fn get(&self) -> u64 {
    self.0
  }

  #[inline]
  pub(crate) const fn next(&self) -> Tick {
    Tick(self.0 + 1)
  }
}
