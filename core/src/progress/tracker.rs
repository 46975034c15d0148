/// Monotonic progress for one stage: values reported to observers never go
/// below the last reported value, however late a diagnostic line arrives.
#[derive(Debug, Default, Clone)]
pub struct StageProgress {
    last: Option<u8>,
}

impl StageProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets to zero at stage start; returns the value to report.
    pub fn start(&mut self) -> u8 {
        self.last = Some(0);
        0
    }

    /// Returns `Some(percent)` when it advances the displayed value.
    pub fn observe(&mut self, percent: u8) -> Option<u8> {
        let percent = percent.min(100);
        match self.last {
            Some(last) if percent <= last => None,
            _ => {
                self.last = Some(percent);
                Some(percent)
            }
        }
    }

    /// Forces 100 once the stage has succeeded.
    pub fn complete(&mut self) -> Option<u8> {
        self.observe(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn late_lower_values_do_not_regress() {
        let mut p = StageProgress::new();
        assert_eq!(p.start(), 0);
        assert_eq!(p.observe(42), Some(42));
        assert_eq!(p.observe(35), None);
        assert_eq!(p.observe(42), None);
        assert_eq!(p.complete(), Some(100));
        assert_eq!(p.complete(), None);
    }

    #[test]
    fn restart_resets_to_zero() {
        let mut p = StageProgress::new();
        p.start();
        p.observe(80);
        assert_eq!(p.start(), 0);
        assert_eq!(p.observe(10), Some(10));
    }
}
