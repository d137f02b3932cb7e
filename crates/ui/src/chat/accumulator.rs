use snafu::ensure;

use super::controller::{BackendFailure, ResponseTooLargeSnafu};

/// Concatenates stream fragments in arrival order.
///
/// Unbounded unless a byte limit is configured.
#[derive(Debug, Default)]
pub struct ResponseAccumulator {
    text: String,
    fragment_count: usize,
    limit: Option<usize>,
}

impl ResponseAccumulator {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            text: String::new(),
            fragment_count: 0,
            limit,
        }
    }

    pub fn push(&mut self, fragment: &str) -> Result<(), BackendFailure> {
        if let Some(limit) = self.limit {
            ensure!(
                self.text.len() + fragment.len() <= limit,
                ResponseTooLargeSnafu {
                    stage: "accumulate-fragment",
                    limit,
                }
            );
        }

        self.text.push_str(fragment);
        self.fragment_count += 1;
        Ok(())
    }

    pub fn fragment_count(&self) -> usize {
        self.fragment_count
    }

    pub fn finish(self) -> String {
        self.text
    }
}
