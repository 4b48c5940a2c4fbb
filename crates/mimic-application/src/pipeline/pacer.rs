//! Minimum spacing between consecutive service calls.

use std::time::Duration;
use tokio::time::Instant;

/// Enforces a constant minimum gap between call starts.
#[derive(Debug)]
pub struct Pacer {
    spacing: Duration,
    last_call: Option<Instant>,
}

impl Pacer {
    pub fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            last_call: None,
        }
    }

    /// Waits until `spacing` has passed since the previous call, then records
    /// the current instant as the new call start.
    pub async fn wait_turn(&mut self) {
        if let Some(last) = self.last_call {
            tokio::time::sleep_until(last + self.spacing).await;
        }
        self.last_call = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_spacing_between_calls() {
        let mut pacer = Pacer::new(Duration::from_secs(2));
        let start = Instant::now();

        pacer.wait_turn().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        pacer.wait_turn().await;
        assert_eq!(start.elapsed(), Duration::from_secs(2));

        tokio::time::sleep(Duration::from_secs(5)).await;
        let before = Instant::now();
        pacer.wait_turn().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }
}
