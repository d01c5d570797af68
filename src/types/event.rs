//! State-tracker events: one contiguous run of an atom in one state.

use serde::{Deserialize, Serialize};

/// One run of an atom in state `current`.
///
/// - `previous == current` marks the atom's first event in the window
/// - `next == current` marks the atom's last event, whose run was cut by the
///   end of the window
///
/// `duration` counts the frames after the run opened; the first event of an
/// atom therefore spans `duration + 1` frames and every later one `duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    pub previous: usize,
    pub current: usize,
    pub next: usize,
    pub duration: usize,
}

impl Event {
    pub fn new(previous: usize, current: usize, next: usize, duration: usize) -> Self {
        Self {
            previous,
            current,
            next,
            duration,
        }
    }

    /// Event opened in `state` with no predecessor observed.
    pub fn opening(state: usize) -> Self {
        Self::new(state, state, state, 0)
    }

    pub fn is_first(&self) -> bool {
        self.previous == self.current
    }

    pub fn is_last(&self) -> bool {
        self.next == self.current
    }
}

/// Anything that can be walked as a sequence of events: a flat list, or one
/// list per atom.
pub trait EventHistory {
    fn iter_events(&self) -> impl Iterator<Item = &Event>;
}

impl EventHistory for [Event] {
    fn iter_events(&self) -> impl Iterator<Item = &Event> {
        self.iter()
    }
}

impl EventHistory for [Vec<Event>] {
    fn iter_events(&self) -> impl Iterator<Item = &Event> {
        self.iter().flatten()
    }
}

impl EventHistory for Vec<Event> {
    fn iter_events(&self) -> impl Iterator<Item = &Event> {
        self.as_slice().iter_events()
    }
}

impl EventHistory for Vec<Vec<Event>> {
    fn iter_events(&self) -> impl Iterator<Item = &Event> {
        self.as_slice().iter_events()
    }
}
