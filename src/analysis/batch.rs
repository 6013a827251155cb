// Sequential batching with a fixed pause between batches

use std::thread;
use std::time::Duration;

pub const WHOIS_BATCH_SIZE: usize = 100;
pub const WHOIS_BATCH_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    pub size: usize,
    pub delay: Duration,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        BatchPolicy {
            size: WHOIS_BATCH_SIZE,
            delay: WHOIS_BATCH_DELAY,
        }
    }
}

impl BatchPolicy {
    pub fn batch_count(&self, items: usize) -> usize {
        items.div_ceil(self.size.max(1))
    }

    /// Run `f` on each chunk in order, sleeping `delay` between chunks.
    pub fn run<T, R>(&self, items: &[T], mut f: impl FnMut(&[T]) -> R) -> Vec<R> {
        let mut results = Vec::with_capacity(self.batch_count(items.len()));

        for (index, chunk) in items.chunks(self.size.max(1)).enumerate() {
            if index > 0 && !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            results.push(f(chunk));
        }

        results
    }
}
