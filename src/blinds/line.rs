//! Input lines: identities, edge bits, per-line channel records, the edge
//! interrupt mask and the pin dispatch table.

use core::ops::BitOr;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use heapless::FnvIndexMap;

/// One physical contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Line {
    ButtonUp = 0,
    ButtonDown = 1,
    TopLimit = 2,
    BottomLimit = 3,
}

/// Lines of one class share a debounce timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineClass {
    Button,
    Limit,
}

impl Line {
    pub const ALL: [Line; 4] = [
        Line::ButtonUp,
        Line::ButtonDown,
        Line::TopLimit,
        Line::BottomLimit,
    ];

    pub const BUTTONS: [Line; 2] = [Line::ButtonUp, Line::ButtonDown];

    /// Limits are listed top first; the arbitrator services them in this order.
    pub const LIMITS: [Line; 2] = [Line::TopLimit, Line::BottomLimit];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn from_index(index: u8) -> Option<Line> {
        match index {
            0 => Some(Line::ButtonUp),
            1 => Some(Line::ButtonDown),
            2 => Some(Line::TopLimit),
            3 => Some(Line::BottomLimit),
            _ => None,
        }
    }

    pub const fn class(self) -> LineClass {
        match self {
            Line::ButtonUp | Line::ButtonDown => LineClass::Button,
            Line::TopLimit | Line::BottomLimit => LineClass::Limit,
        }
    }
}

impl LineClass {
    pub const fn lines(self) -> [Line; 2] {
        match self {
            LineClass::Button => Line::BUTTONS,
            LineClass::Limit => Line::LIMITS,
        }
    }
}

/// A stable transition. Rising is a press, falling a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Edge {
    Rising = 1,
    Falling = 2,
}

impl Edge {
    const fn from_bits(bits: u8) -> Option<Edge> {
        match bits {
            1 => Some(Edge::Rising),
            2 => Some(Edge::Falling),
            _ => None,
        }
    }
}

/// Edge event bits as delivered by the GPIO edge callback, also used as the
/// per-line interrupt enable mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EdgeMask(u8);

impl EdgeMask {
    pub const RISE: EdgeMask = EdgeMask(Edge::Rising as u8);
    pub const FALL: EdgeMask = EdgeMask(Edge::Falling as u8);
    pub const BOTH: EdgeMask = EdgeMask(Edge::Rising as u8 | Edge::Falling as u8);

    pub const fn from_bits(bits: u8) -> EdgeMask {
        EdgeMask(bits & Self::BOTH.0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, edge: Edge) -> bool {
        self.0 & edge as u8 != 0
    }

    pub const fn intersects(self, other: EdgeMask) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Both rise and fall reported for one event, a known hardware artifact.
    pub const fn is_ambiguous(self) -> bool {
        self.0 == Self::BOTH.0
    }
}

impl From<Edge> for EdgeMask {
    fn from(edge: Edge) -> Self {
        EdgeMask(edge as u8)
    }
}

impl BitOr for EdgeMask {
    type Output = EdgeMask;

    fn bitor(self, rhs: EdgeMask) -> EdgeMask {
        EdgeMask(self.0 | rhs.0)
    }
}

/// Confirmed-transition record of one line.
///
/// `confirm` is only called from timer context and `take` only from the
/// arbitrator, so each field has a single writer at a time.
pub struct InputChannel {
    pending: AtomicBool,
    edge: AtomicU8,
}

impl InputChannel {
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
            edge: AtomicU8::new(0),
        }
    }

    /// Publishes a confirmed transition.
    pub fn confirm(&self, edge: Edge) {
        self.edge.store(edge as u8, Ordering::Relaxed);
        self.pending.store(true, Ordering::Release);
    }

    /// Consumes the pending transition, if any.
    pub fn take(&self) -> Option<Edge> {
        if self.pending.swap(false, Ordering::AcqRel) {
            self.last_confirmed_edge()
        } else {
            None
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    pub fn last_confirmed_edge(&self) -> Option<Edge> {
        Edge::from_bits(self.edge.load(Ordering::Relaxed))
    }
}

impl Default for InputChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// The four channel records, indexed by [`Line`].
pub struct InputChannels([InputChannel; 4]);

impl InputChannels {
    pub const fn new() -> Self {
        Self([
            InputChannel::new(),
            InputChannel::new(),
            InputChannel::new(),
            InputChannel::new(),
        ])
    }

    pub fn get(&self, line: Line) -> &InputChannel {
        &self.0[line.index()]
    }
}

impl Default for InputChannels {
    fn default() -> Self {
        Self::new()
    }
}

/// Which edges each line currently forwards to the debouncer. An empty mask
/// means the line's interrupt is disabled.
pub struct InterruptMask([AtomicU8; 4]);

impl InterruptMask {
    /// All lines start disabled; nothing is forwarded until the inputs are armed.
    pub const fn new() -> Self {
        Self([
            AtomicU8::new(0),
            AtomicU8::new(0),
            AtomicU8::new(0),
            AtomicU8::new(0),
        ])
    }

    pub fn enable(&self, line: Line, edges: EdgeMask) {
        self.0[line.index()].store(edges.bits(), Ordering::Release);
    }

    pub fn disable(&self, line: Line) {
        self.0[line.index()].store(0, Ordering::Release);
    }

    pub fn disable_all(&self) {
        for line in Line::ALL {
            self.disable(line);
        }
    }

    /// Re-arms every line on its expected edge.
    pub fn enable_all(&self, expected: &ExpectedEdges) {
        for line in Line::ALL {
            self.enable(line, expected.get(line));
        }
    }

    pub fn enabled(&self, line: Line) -> EdgeMask {
        EdgeMask::from_bits(self.0[line.index()].load(Ordering::Acquire))
    }

    /// True if the event shares at least one edge with the enabled mask.
    pub fn accepts(&self, line: Line, edges: EdgeMask) -> bool {
        self.enabled(line).intersects(edges)
    }
}

impl Default for InterruptMask {
    fn default() -> Self {
        Self::new()
    }
}

/// The edge each line is expected to produce next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedEdges([EdgeMask; 4]);

impl ExpectedEdges {
    /// Every line waits for a press.
    pub const RISING: ExpectedEdges = ExpectedEdges([EdgeMask::RISE; 4]);

    /// A line that is high waits for its fall, a low line for its rise.
    pub fn from_levels(levels: [bool; 4]) -> Self {
        Self(levels.map(|high| if high { EdgeMask::FALL } else { EdgeMask::RISE }))
    }

    pub fn get(&self, line: Line) -> EdgeMask {
        self.0[line.index()]
    }

    pub fn set(&mut self, line: Line, edges: EdgeMask) {
        self.0[line.index()] = edges;
    }
}

/// Single edge callback to logical line demultiplexer, built once at init.
pub struct DispatchTable {
    lines: FnvIndexMap<u8, Line, 4>,
}

impl DispatchTable {
    pub fn new(pins: [(u8, Line); 4]) -> Self {
        let mut lines = FnvIndexMap::new();
        for (pin, line) in pins {
            if lines.insert(pin, line).is_err() {
                error!("dispatch table full, pin {} dropped", pin);
            }
        }
        Self { lines }
    }

    pub fn lookup(&self, pin: u8) -> Option<Line> {
        self.lines.get(&pin).copied()
    }
}

/// Reads a line `samples` times and reports it high if at least `threshold`
/// of the reads were high.
pub fn majority_level(samples: u8, threshold: u8, mut read: impl FnMut() -> bool) -> bool {
    let high = (0..samples).filter(|_| read()).count();
    high >= threshold as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_pending_is_consumed_once() {
        let channel = InputChannel::new();
        assert_eq!(channel.take(), None);

        channel.confirm(Edge::Rising);
        assert!(channel.is_pending());
        assert_eq!(channel.take(), Some(Edge::Rising));
        assert_eq!(channel.take(), None);
        assert_eq!(channel.last_confirmed_edge(), Some(Edge::Rising));
    }

    #[test]
    fn newer_confirmation_overwrites_unconsumed_edge() {
        let channel = InputChannel::new();
        channel.confirm(Edge::Rising);
        channel.confirm(Edge::Falling);
        assert_eq!(channel.take(), Some(Edge::Falling));
        assert!(!channel.is_pending());
    }

    #[test]
    fn mask_starts_disabled_and_filters_edges() {
        let mask = InterruptMask::new();
        for line in Line::ALL {
            assert!(!mask.accepts(line, EdgeMask::BOTH));
        }

        mask.enable(Line::ButtonDown, EdgeMask::RISE);
        assert!(mask.accepts(Line::ButtonDown, EdgeMask::RISE));
        assert!(mask.accepts(Line::ButtonDown, EdgeMask::BOTH));
        assert!(!mask.accepts(Line::ButtonDown, EdgeMask::FALL));

        mask.disable_all();
        assert!(mask.enabled(Line::ButtonDown).is_empty());
    }

    #[test]
    fn expected_edges_follow_startup_levels() {
        let expected = ExpectedEdges::from_levels([true, false, false, false]);
        assert_eq!(expected.get(Line::ButtonUp), EdgeMask::FALL);
        assert_eq!(expected.get(Line::ButtonDown), EdgeMask::RISE);

        let mask = InterruptMask::new();
        mask.enable_all(&expected);
        assert_eq!(mask.enabled(Line::ButtonUp), EdgeMask::FALL);
        assert_eq!(mask.enabled(Line::BottomLimit), EdgeMask::RISE);
    }

    #[test]
    fn ambiguous_mask() {
        assert!(EdgeMask::BOTH.is_ambiguous());
        assert!((EdgeMask::RISE | EdgeMask::FALL).is_ambiguous());
        assert!(!EdgeMask::RISE.is_ambiguous());
        assert_eq!(EdgeMask::from_bits(0xff), EdgeMask::BOTH);
    }

    #[test]
    fn dispatch_table_misses_unknown_pins() {
        let table = DispatchTable::new([
            (30, Line::ButtonUp),
            (29, Line::ButtonDown),
            (24, Line::TopLimit),
            (25, Line::BottomLimit),
        ]);
        assert_eq!(table.lookup(24), Some(Line::TopLimit));
        assert_eq!(table.lookup(29), Some(Line::ButtonDown));
        assert_eq!(table.lookup(7), None);
    }

    #[test]
    fn majority_vote_threshold() {
        let mut n = 0;
        // 70 of 100 reads high
        assert!(majority_level(100, 70, || {
            n += 1;
            n <= 70
        }));

        let mut n = 0;
        assert!(!majority_level(100, 70, || {
            n += 1;
            n <= 69
        }));
    }
}
