//! Complexity bands shared by the language analyzers.

use std::fmt;

use serde::Serialize;

/// Procedural complexity band shown in summary reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ComplexityLevel {
    /// Cyclomatic complexity below 5.
    Low,
    /// Cyclomatic complexity of 5 or more.
    Medium,
}

impl ComplexityLevel {
    /// Determine level from cyclomatic complexity.
    pub fn from_cyclomatic(cc: u32) -> Self {
        if cc < 5 {
            ComplexityLevel::Low
        } else {
            ComplexityLevel::Medium
        }
    }
}

impl fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComplexityLevel::Low => write!(f, "Low"),
            ComplexityLevel::Medium => write!(f, "Medium"),
        }
    }
}

/// Maintainability band derived from cyclomatic complexity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum MaintainabilityRating {
    /// Complexity of 10 or less.
    #[default]
    A,
    /// Complexity between 11 and 20.
    B,
    /// Complexity above 20.
    C,
}

impl MaintainabilityRating {
    /// Determine the band from cyclomatic complexity.
    pub fn from_cyclomatic(cc: u32) -> Self {
        match cc {
            0..=10 => MaintainabilityRating::A,
            11..=20 => MaintainabilityRating::B,
            _ => MaintainabilityRating::C,
        }
    }
}

impl fmt::Display for MaintainabilityRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaintainabilityRating::A => write!(f, "A"),
            MaintainabilityRating::B => write!(f, "B"),
            MaintainabilityRating::C => write!(f, "C"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_thresholds() {
        assert_eq!(MaintainabilityRating::from_cyclomatic(1), MaintainabilityRating::A);
        assert_eq!(MaintainabilityRating::from_cyclomatic(10), MaintainabilityRating::A);
        assert_eq!(MaintainabilityRating::from_cyclomatic(11), MaintainabilityRating::B);
        assert_eq!(MaintainabilityRating::from_cyclomatic(20), MaintainabilityRating::B);
        assert_eq!(MaintainabilityRating::from_cyclomatic(21), MaintainabilityRating::C);
    }

    #[test]
    fn test_complexity_level() {
        assert_eq!(ComplexityLevel::from_cyclomatic(4), ComplexityLevel::Low);
        assert_eq!(ComplexityLevel::from_cyclomatic(5).to_string(), "Medium");
    }
}
