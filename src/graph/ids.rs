use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generates short random ids and retries until one is not already taken.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    rng: StdRng,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// A generator with a fixed seed, producing the same id sequence every run.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draws candidates of the form `<prefix>_xxxxxxxx` until `is_taken` rejects none.
    pub fn next_id(&mut self, prefix: &str, is_taken: impl Fn(&str) -> bool) -> String {
        loop {
            let candidate = format!("{}_{:08x}", prefix, self.rng.random::<u32>());
            if !is_taken(&candidate) {
                return candidate;
            }
            tracing::debug!("Id collision on '{}', drawing again", candidate);
        }
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
