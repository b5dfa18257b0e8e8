use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;

/// Replayable random word stream.
///
/// Remembers the seed it was created from, so the exact fill of a failing random
/// value run can be reproduced with the same seed. A clone starts over from the seed
/// instead of continuing the stream.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Rng {
    seed: u64,
    #[serde(skip)]
    inner: StdRng,
}

impl Rng {
    /// Creates a stream from `seed`.
    pub fn from_seed(seed: u64) -> Self {
        Rng {
            seed,
            inner: StdRng::seed_from_u64(seed),
        }
    }

    /// Creates a stream from a seed drawn from the operating system.
    pub fn from_os() -> Self {
        Self::from_seed(rand::random())
    }

    /// The seed this stream was created from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Rewinds the stream to its first value.
    pub fn restart(&mut self) {
        self.inner = StdRng::seed_from_u64(self.seed);
    }
}

impl Clone for Rng {
    fn clone(&self) -> Self {
        Rng::from_seed(self.seed)
    }
}

impl RngCore for Rng {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        self.inner.fill_bytes(dst)
    }
}
