//! Frame clock and per-entity frame stamps
//!
//! Every lattice point, edge and cube carries a `Stamp`. Its cached value is
//! valid for frame `f` iff the stamp reads `f`. The clock only moves forward,
//! one step per extracted frame.

use serde::{Deserialize, Serialize};

/// Identifier of one extracted frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Frame(u64);

impl Frame {
    /// The frame before any extraction
    pub const NEVER: Frame = Frame(0);

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Monotonic frame counter owned by the extractor
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    current: Frame,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new frame and return it
    pub fn advance(&mut self) -> Frame {
        self.current = Frame(self.current.0 + 1);
        self.current
    }

    /// The frame most recently started
    pub fn current(&self) -> Frame {
        self.current
    }
}

/// Last frame in which an entity's cached value was computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stamp(Frame);

impl Stamp {
    /// Whether the cached value belongs to `frame`
    pub fn is_current(self, frame: Frame) -> bool {
        self.0 == frame
    }

    /// Mark the cached value as computed in `frame`
    pub fn touch(&mut self, frame: Frame) {
        debug_assert!(frame >= self.0, "stamp moved backwards: {:?} -> {:?}", self.0, frame);
        self.0 = frame;
    }

    pub fn frame(self) -> Frame {
        self.0
    }
}
