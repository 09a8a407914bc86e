//! Delay-and-resample debouncer.
//!
//! A raw edge masks the lines of its class and arms the class's one-shot
//! timer. When the timer fires the tracked line is re-sampled:
//!
//! - still high after a rise confirms the press once, then keeps re-arming
//!   so a held press is watched without relying on further raw edges;
//! - low confirms the release (a button tap shorter than the debounce window
//!   is reported as a release only) and hands the lines back to the caller
//!   for re-arming.
//!
//! Lines of the two classes use separate slots and timers, a bounce on a
//! button never delays a limit switch and vice versa.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use super::line::{Edge, EdgeMask, InterruptMask, Line, LineClass};

/// Outcome of a debounce timer expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Sample {
    /// Stable press, reported once per press.
    Press(Line),
    /// Still high: press already reported, or a fall that has not settled yet.
    /// The caller re-arms the timer.
    Held(Line),
    /// Stable release, the slot is free again.
    Release(Line),
    /// A limit-switch glitch that never held through the window.
    Noise(Line),
    /// Timer fired with nothing tracked.
    Idle,
}

const NO_LINE: u8 = u8::MAX;

struct Slot {
    line: AtomicU8,
    edge: AtomicU8,
    busy: AtomicBool,
    confirmed: AtomicBool,
}

impl Slot {
    const fn new() -> Self {
        Self {
            line: AtomicU8::new(NO_LINE),
            edge: AtomicU8::new(0),
            busy: AtomicBool::new(false),
            confirmed: AtomicBool::new(false),
        }
    }

    fn line(&self) -> Option<Line> {
        Line::from_index(self.line.load(Ordering::Acquire))
    }

    fn edge(&self) -> Edge {
        if self.edge.load(Ordering::Acquire) == Edge::Rising as u8 {
            Edge::Rising
        } else {
            Edge::Falling
        }
    }

    fn release(&self) {
        self.confirmed.store(false, Ordering::Relaxed);
        self.line.store(NO_LINE, Ordering::Relaxed);
        self.busy.store(false, Ordering::Release);
    }
}

pub struct Debouncer {
    slots: [Slot; 2],
}

impl Debouncer {
    pub const fn new() -> Self {
        Self {
            slots: [Slot::new(), Slot::new()],
        }
    }

    fn slot(&self, class: LineClass) -> &Slot {
        match class {
            LineClass::Button => &self.slots[0],
            LineClass::Limit => &self.slots[1],
        }
    }

    /// Handles a raw edge interrupt.
    ///
    /// Returns the edge to debounce if the caller has to arm the class timer,
    /// `None` if the event was ignored.
    pub fn on_raw_edge(
        &self,
        line: Line,
        edges: EdgeMask,
        interrupts: &InterruptMask,
    ) -> Option<Edge> {
        let class = line.class();
        let slot = self.slot(class);

        if slot.busy.load(Ordering::Acquire) {
            trace!("{}: edge while debouncing, ignored", line);
            return None;
        }

        let edge = match class {
            LineClass::Button => {
                if edges.is_ambiguous() {
                    warn!("{}: rise and fall reported together, treating as fall", line);
                    Edge::Falling
                } else if edges.contains(Edge::Rising) {
                    Edge::Rising
                } else if edges.contains(Edge::Falling) {
                    Edge::Falling
                } else {
                    return None;
                }
            }
            // Limit releases are never taken from an interrupt; the guard
            // re-samples the switch after its reaction time instead.
            LineClass::Limit => {
                if edges.contains(Edge::Rising) {
                    Edge::Rising
                } else {
                    warn!("{}: unexpected limit switch event {}", line, edges);
                    return None;
                }
            }
        };

        for masked in class.lines() {
            interrupts.disable(masked);
        }

        slot.line.store(line as u8, Ordering::Relaxed);
        slot.edge.store(edge as u8, Ordering::Relaxed);
        slot.confirmed.store(false, Ordering::Relaxed);
        slot.busy.store(true, Ordering::Release);

        debug!("{}: {} edge, debouncing", line, edge);
        Some(edge)
    }

    /// Re-samples the tracked line of `class` once its debounce timer fires.
    pub fn on_expiry(&self, class: LineClass, is_high: impl FnOnce(Line) -> bool) -> Sample {
        let slot = self.slot(class);
        if !slot.busy.load(Ordering::Acquire) {
            return Sample::Idle;
        }
        let Some(line) = slot.line() else {
            slot.release();
            return Sample::Idle;
        };

        if is_high(line) {
            if slot.edge() == Edge::Rising && !slot.confirmed.swap(true, Ordering::AcqRel) {
                debug!("{}: stable press", line);
                return Sample::Press(line);
            }
            return Sample::Held(line);
        }

        let was_confirmed = slot.confirmed.load(Ordering::Acquire);
        slot.release();

        if class == LineClass::Limit && !was_confirmed {
            debug!("{}: glitch, ignored", line);
            Sample::Noise(line)
        } else {
            debug!("{}: released", line);
            Sample::Release(line)
        }
    }

    /// The line currently tracked by `class`, if any.
    pub fn tracked(&self, class: LineClass) -> Option<Line> {
        let slot = self.slot(class);
        if slot.busy.load(Ordering::Acquire) {
            slot.line()
        } else {
            None
        }
    }

    /// Drops whatever `class` is tracking.
    pub fn reset(&self, class: LineClass) {
        self.slot(class).release();
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}
