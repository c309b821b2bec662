use crate::math::scale::{scale, Mapping};

/// Maps the per-sweep change onto a 0 to 100 completion estimate.
///
/// The change decays roughly exponentially, so the estimate follows
/// `(-ln diff)^6` against `(-ln threshold)^6`. Reported values never go
/// backwards.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    end: f64,
    last: u8,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self {
            end: (-threshold.ln()).powi(6),
            last: 0,
        }
    }

    /// Last reported percentage.
    #[must_use]
    pub fn percent(&self) -> u8 {
        self.last
    }

    /// Feeds the latest change and returns the new percentage if it moved.
    pub fn update(&mut self, diff: f64) -> Option<u8> {
        if diff.is_nan() {
            return None;
        }
        let estimate = if self.end.is_nan() || self.end <= 0.0 || diff <= 0.0 {
            100.0
        } else if diff >= 1.0 {
            0.0
        } else {
            let current = (-diff.ln()).powi(6);
            scale(current, (0.0, self.end), (0.0, 100.0), Mapping::Linear, Mapping::Linear)
        };

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let percent = estimate.clamp(0.0, 100.0).floor() as u8;
        if percent <= self.last {
            return None;
        }
        self.last = percent;
        Some(percent)
    }
}
