//! Transition timing.

use serde::{Deserialize, Serialize};

/// How long the bridge should animate a change, held in milliseconds.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TransitionTime {
    pub(crate) millis: u32,
}

impl Default for TransitionTime {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TransitionTime {
    /// The bridge applies 400 ms when no transition is given.
    pub const DEFAULT: TransitionTime = TransitionTime { millis: 400 };
    /// Used by fade up / fade down.
    pub const FADE: TransitionTime = TransitionTime { millis: 4000 };
    /// Used by fast on / fast off.
    pub const INSTANT: TransitionTime = TransitionTime { millis: 0 };

    pub fn from_millis(millis: u32) -> Self {
        TransitionTime { millis }
    }

    pub fn millis(&self) -> u32 {
        self.millis
    }

    pub fn is_default(&self) -> bool {
        *self == Self::DEFAULT
    }

    /// Bridge units (deciseconds), rounded.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_node_rs::TransitionTime;
    ///
    /// assert_eq!(TransitionTime::FADE.deciseconds(), 40);
    /// assert_eq!(TransitionTime::from_millis(250).deciseconds(), 3);
    /// assert_eq!(TransitionTime::INSTANT.deciseconds(), 0);
    /// ```
    pub fn deciseconds(&self) -> u16 {
        let ds = (f64::from(self.millis) / 100.0).round();
        ds.min(f64::from(u16::MAX)) as u16
    }
}
