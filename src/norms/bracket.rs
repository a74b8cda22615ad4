//! Age brackets used as part of the demographic lookup key

use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open age range `[lower, upper)`; `upper == None` is open-ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeBracket {
    pub lower: u32,
    pub upper: Option<u32>,
}

impl AgeBracket {
    /// Parse a source key: `"20-29"` (inclusive years, so `[20, 30)`) or `"60+"`
    pub fn parse(key: &str) -> Option<Self> {
        let key = key.trim();
        if let Some(lower) = key.strip_suffix('+') {
            let lower = lower.trim().parse().ok()?;
            return Some(Self { lower, upper: None });
        }
        let (lo, hi) = key.split_once('-')?;
        let lower: u32 = lo.trim().parse().ok()?;
        let last: u32 = hi.trim().parse().ok()?;
        if last < lower {
            return None;
        }
        Some(Self {
            lower,
            upper: Some(last.checked_add(1)?),
        })
    }

    pub fn contains(&self, age: u32) -> bool {
        age >= self.lower && self.upper.map_or(true, |u| age < u)
    }

    pub fn is_open_ended(&self) -> bool {
        self.upper.is_none()
    }

    /// Same lower bound, no upper bound
    pub fn open_ended(self) -> Self {
        Self {
            lower: self.lower,
            upper: None,
        }
    }
}

impl fmt::Display for AgeBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upper {
            Some(upper) => write!(f, "{}-{}", self.lower, upper - 1),
            None => write!(f, "{}+", self.lower),
        }
    }
}
