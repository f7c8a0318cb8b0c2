//! Trailing debounce.

use shopview_core::Millis;

/// Coalesces bursts of triggers into one firing `delay` after the last one.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Millis,
    deadline: Option<Millis>,
}

impl Debouncer {
    pub fn new(delay: Millis) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Register a trigger. Pushes the pending deadline back.
    pub fn trigger(&mut self, now: Millis) -> Millis {
        let deadline = now.saturating_add(self.delay);
        self.deadline = Some(deadline);
        deadline
    }

    /// Returns `true` exactly once when the quiet period has elapsed.
    pub fn fire_if_due(&mut self, now: Millis) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn deadline(&self) -> Option<Millis> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_coalesces() {
        let mut debouncer = Debouncer::new(300);
        debouncer.trigger(0);
        debouncer.trigger(100);
        debouncer.trigger(250);

        assert!(!debouncer.fire_if_due(400));
        assert!(debouncer.fire_if_due(550));
        assert!(!debouncer.fire_if_due(600));
    }

    #[test]
    fn test_cancel() {
        let mut debouncer = Debouncer::new(300);
        debouncer.trigger(0);
        debouncer.cancel();
        assert!(!debouncer.is_pending());
        assert!(!debouncer.fire_if_due(1000));
    }
}
