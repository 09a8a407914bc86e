use core::sync::atomic::{AtomicBool, Ordering};

use super::traits::InputLevels;
use crate::blinds::line::{Edge, Line};

/// Mirror of the four input levels.
///
/// Each edge watcher owns its pin and stores the level after every edge and
/// on a short refresh tick; timer handlers re-sample from here. A refresh
/// that finds a different level reports the edge the interrupt missed.
pub struct LineLevels([AtomicBool; 4]);

impl LineLevels {
    pub const fn new() -> Self {
        Self([
            AtomicBool::new(false),
            AtomicBool::new(false),
            AtomicBool::new(false),
            AtomicBool::new(false),
        ])
    }

    pub fn store(&self, line: Line, high: bool) {
        self.0[line.index()].store(high, Ordering::Release);
    }

    /// Stores the refreshed level and returns the transition if it changed.
    pub fn update(&self, line: Line, high: bool) -> Option<Edge> {
        let was_high = self.0[line.index()].swap(high, Ordering::AcqRel);
        match (was_high, high) {
            (false, true) => Some(Edge::Rising),
            (true, false) => Some(Edge::Falling),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> [bool; 4] {
        Line::ALL.map(|line| self.is_high(line))
    }
}

impl Default for LineLevels {
    fn default() -> Self {
        Self::new()
    }
}

impl InputLevels for LineLevels {
    fn is_high(&self, line: Line) -> bool {
        self.0[line.index()].load(Ordering::Acquire)
    }
}
