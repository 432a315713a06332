use tracing::debug;

/// Outcome of closing an acceptance window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAdjustment {
    Halved,
    Doubled,
    Unchanged,
}

/// Tunes the Monte Carlo trial amplitude over non-overlapping windows of
/// trials.
///
/// More than `upper` acceptances in a window halve the amplitude, fewer than
/// `lower` double it. The window counter restarts after every decision.
#[derive(Debug, Clone, PartialEq)]
pub struct StepController {
    amplitude: f64,
    window: usize,
    upper: usize,
    lower: usize,
    window_accepted: usize,
}

impl StepController {
    pub fn new(initial_amplitude: f64, window: usize, upper: usize, lower: usize) -> Self {
        Self {
            amplitude: initial_amplitude,
            window,
            upper,
            lower,
            window_accepted: 0,
        }
    }

    /// Window of 100 trials, band 45..=55.
    pub fn with_defaults(initial_amplitude: f64) -> Self {
        Self::new(initial_amplitude, 100, 55, 45)
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn window_accepted(&self) -> usize {
        self.window_accepted
    }

    pub fn record_acceptance(&mut self) {
        self.window_accepted += 1;
    }

    /// Apply the threshold rule to the current window and start a new one.
    pub fn adjust(&mut self) -> StepAdjustment {
        let accepted = self.window_accepted;
        let adjustment = if accepted > self.upper {
            self.amplitude /= 2.0;
            StepAdjustment::Halved
        } else if accepted < self.lower {
            self.amplitude *= 2.0;
            StepAdjustment::Doubled
        } else {
            StepAdjustment::Unchanged
        };
        self.window_accepted = 0;
        if adjustment != StepAdjustment::Unchanged {
            debug!(
                accepted,
                window = self.window,
                amplitude = self.amplitude,
                "trial amplitude {:?}",
                adjustment
            );
        }
        adjustment
    }

    /// Close the window when `trials` (completed so far) sits on a window
    /// boundary. Nothing happens before the first trial.
    pub fn end_window_if_due(&mut self, trials: usize) -> Option<StepAdjustment> {
        if trials != 0 && trials % self.window == 0 {
            Some(self.adjust())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn run_window(accepted: usize) -> StepController {
        let mut controller = StepController::with_defaults(0.005);
        for trial in 0..100 {
            assert_eq!(controller.end_window_if_due(trial), None);
            if trial < accepted {
                controller.record_acceptance();
            }
        }
        controller
    }

    #[test]
    fn fifty_six_acceptances_halve_the_amplitude() {
        let mut controller = run_window(56);
        assert_eq!(controller.end_window_if_due(100), Some(StepAdjustment::Halved));
        assert_relative_eq!(controller.amplitude(), 0.0025);
        assert_eq!(controller.window_accepted(), 0);
    }

    #[test]
    fn forty_four_acceptances_double_the_amplitude() {
        let mut controller = run_window(44);
        assert_eq!(controller.end_window_if_due(100), Some(StepAdjustment::Doubled));
        assert_relative_eq!(controller.amplitude(), 0.01);
    }

    #[test]
    fn band_leaves_the_amplitude_alone() {
        for accepted in 45..=55 {
            let mut controller = run_window(accepted);
            assert_eq!(
                controller.end_window_if_due(100),
                Some(StepAdjustment::Unchanged)
            );
            assert_eq!(controller.amplitude(), 0.005);
            assert_eq!(controller.window_accepted(), 0);
        }
    }

    #[test]
    fn windows_do_not_overlap() {
        let mut controller = run_window(80);
        controller.end_window_if_due(100);
        for trial in 101..=200 {
            controller.record_acceptance();
            if trial < 200 {
                assert_eq!(controller.end_window_if_due(trial), None);
            }
        }
        assert_eq!(controller.window_accepted(), 100);
        controller.end_window_if_due(200);
        assert_relative_eq!(controller.amplitude(), 0.005 / 4.0);
    }

    #[test]
    fn custom_window() {
        let mut controller = StepController::new(1.0, 10, 6, 4);
        assert_eq!(controller.window(), 10);
        assert_eq!(controller.end_window_if_due(0), None);
        assert_eq!(controller.end_window_if_due(10), Some(StepAdjustment::Doubled));
        assert_relative_eq!(controller.amplitude(), 2.0);
    }
}
