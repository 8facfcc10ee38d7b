use std::{fmt::Display, ops::Deref};

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percentage(f64);

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0}%", self.0)
    }
}

impl Percentage {
    pub const HALF: Percentage = Percentage(50.);
    pub const FULL: Percentage = Percentage(100.);

    pub fn new_opt(value: f64) -> Option<Percentage> {
        if value < 0. || value.is_nan() {
            None
        } else {
            Some(Percentage(value))
        }
    }

    /// Remaining share up to 100%. Never negative.
    pub fn complement(self) -> Percentage {
        Percentage((100. - self.0).max(0.))
    }

    /// Number of cells out of `width` this percentage covers, used for drawing bars.
    pub fn cells(self, width: usize) -> usize {
        let filled = (self.0.min(100.) / 100. * width as f64).round() as usize;
        filled.min(width)
    }
}

impl Deref for Percentage {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// `part` as a share of `whole`. A zero `whole` yields `None`, callers pick their own neutral
/// value.
pub fn ratio_percentage(part: f64, whole: f64) -> Option<Percentage> {
    if whole <= 0. {
        return None;
    }
    Percentage::new_opt(part / whole * 100.)
}
