//! Movement list sequencing.
//!
//! A list plays its movements back to back as one session. The driver asks for
//! the next entry each time the current one completes.

use crate::inputs::BlendDuration;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct MovementList {
    names: Vec<String>,
    cursor: usize,
    looping: bool,
    duration_to: BlendDuration,
}

impl MovementList {
    /// `None` for an empty list.
    pub fn new(names: Vec<String>, looping: bool, duration_to: BlendDuration) -> Option<Self> {
        if names.is_empty() {
            return None;
        }
        Some(Self {
            names,
            cursor: 0,
            looping,
            duration_to,
        })
    }

    pub fn duration_to(&self) -> BlendDuration {
        self.duration_to
    }

    /// Name of the entry to play next, advancing the cursor. Past the end the
    /// cursor wraps for a looping list; otherwise the list is exhausted.
    pub fn next_entry(&mut self) -> Option<&str> {
        if self.cursor >= self.names.len() {
            if !self.looping {
                return None;
            }
            self.cursor = 0;
        }
        let name = &self.names[self.cursor];
        self.cursor += 1;
        Some(name)
    }
}
