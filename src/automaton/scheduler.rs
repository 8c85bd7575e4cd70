//! Paces simulation steps independently of how often the host polls.

use crate::error::{AutomatonError, Result};

/// Accumulates elapsed wall-clock time and fires once per `step_duration_ms`.
#[derive(Clone, Debug, PartialEq)]
pub struct StepScheduler {
    accumulator_ms: f64,
    step_duration_ms: u32,
}

impl StepScheduler {
    pub fn new(step_duration_ms: u32) -> Result<Self> {
        validate_duration(step_duration_ms)?;
        Ok(StepScheduler {
            accumulator_ms: 0.0,
            step_duration_ms,
        })
    }

    /// Add `elapsed_ms` and report whether a step is due.
    ///
    /// Firing resets the accumulator to zero; leftover time is discarded.
    /// Negative or non-finite values are ignored.
    pub fn tick(&mut self, elapsed_ms: f64) -> bool {
        if elapsed_ms.is_finite() && elapsed_ms > 0.0 {
            self.accumulator_ms += elapsed_ms;
        }
        if self.accumulator_ms >= self.step_duration_ms as f64 {
            self.accumulator_ms = 0.0;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.accumulator_ms = 0.0;
    }

    pub fn step_duration_ms(&self) -> u32 {
        self.step_duration_ms
    }

    /// Takes effect on the next `tick`; accumulated time is kept.
    pub fn set_step_duration(&mut self, step_duration_ms: u32) -> Result<()> {
        validate_duration(step_duration_ms)?;
        self.step_duration_ms = step_duration_ms;
        Ok(())
    }

    pub fn accumulated_ms(&self) -> f64 {
        self.accumulator_ms
    }
}

fn validate_duration(step_duration_ms: u32) -> Result<()> {
    if step_duration_ms == 0 {
        return Err(AutomatonError::InvalidConfig(
            "step duration must be at least 1 ms".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_at_threshold() {
        let mut scheduler = StepScheduler::new(48).unwrap();
        assert!(!scheduler.tick(16.0));
        assert!(!scheduler.tick(16.0));
        assert!(scheduler.tick(16.0));
        assert_eq!(scheduler.accumulated_ms(), 0.0);
    }

    #[test]
    fn test_overshoot_is_discarded() {
        let mut scheduler = StepScheduler::new(10).unwrap();
        assert!(scheduler.tick(25.0));
        assert!(!scheduler.tick(5.0));
        assert!(scheduler.tick(5.0));
    }

    #[test]
    fn test_fast_polling_slow_steps() {
        let mut scheduler = StepScheduler::new(3000).unwrap();
        let fired = (0..1000).filter(|_| scheduler.tick(16.0)).count();
        // 16 s of polling at 16 ms per frame.
        assert_eq!(fired, 5);
    }

    #[test]
    fn test_zero_duration_rejected() {
        assert!(matches!(
            StepScheduler::new(0),
            Err(AutomatonError::InvalidConfig(_))
        ));
        let mut scheduler = StepScheduler::new(5).unwrap();
        assert!(scheduler.set_step_duration(0).is_err());
        assert_eq!(scheduler.step_duration_ms(), 5);
    }

    #[test]
    fn test_reset_clears_accumulator() {
        let mut scheduler = StepScheduler::new(10).unwrap();
        scheduler.tick(9.0);
        scheduler.reset();
        assert!(!scheduler.tick(9.0));
    }

    #[test]
    fn test_bad_elapsed_ignored() {
        let mut scheduler = StepScheduler::new(10).unwrap();
        assert!(!scheduler.tick(-50.0));
        assert!(!scheduler.tick(f64::NAN));
        assert!(!scheduler.tick(f64::INFINITY));
        assert_eq!(scheduler.accumulated_ms(), 0.0);
        assert!(scheduler.tick(10.0));
    }

    #[test]
    fn test_set_step_duration_keeps_accumulator() {
        let mut scheduler = StepScheduler::new(100).unwrap();
        assert!(!scheduler.tick(30.0));
        scheduler.set_step_duration(20).unwrap();
        assert!(scheduler.tick(0.0));
    }
}
