use std::collections::HashMap;

use crate::tree::{MidiEvent, MidiEventKind};

/// Assigns distinct note values to MIDI track indices in first-seen order,
/// wrapping round-robin once `track_limit` distinct notes have been seen.
pub struct NoteRouter {
    assignments: HashMap<u8, u16>,
    counter: u16,
    unique_counter: u16,
    track_limit: u16,
}

impl NoteRouter {
    pub fn new(track_limit: u16) -> Self {
        NoteRouter {
            assignments: HashMap::new(),
            counter: 0,
            unique_counter: 0,
            track_limit: track_limit.max(1),
        }
    }

    pub fn track_count(&self) -> u16 {
        self.unique_counter.max(1)
    }

    pub fn track_for_note(&mut self, note: u8) -> u16 {
        if let Some(&track) = self.assignments.get(&note) {
            return track;
        }
        let track = self.counter;
        self.assignments.insert(note, track);
        self.counter += 1;
        self.unique_counter = self.unique_counter.saturating_add(1).min(self.track_limit);
        if self.counter >= self.track_limit {
            self.counter = 0;
        }
        track
    }

    /// Pre-assigns tracks for every NoteOn event in `events`, a pre-pass
    /// used to size the output file before any event is rendered.
    pub fn add_notes(&mut self, events: &[MidiEvent]) {
        for event in events {
            if let MidiEventKind::NoteOn { note, .. } = event.kind {
                self.track_for_note(note);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_in_first_seen_order() {
        let mut router = NoteRouter::new(4);
        assert_eq!(router.track_for_note(60), 0);
        assert_eq!(router.track_for_note(62), 1);
        assert_eq!(router.track_for_note(60), 0);
    }

    #[test]
    fn wraps_round_robin_after_limit() {
        let mut router = NoteRouter::new(2);
        assert_eq!(router.track_for_note(1), 0);
        assert_eq!(router.track_for_note(2), 1);
        assert_eq!(router.track_for_note(3), 0);
        assert_eq!(router.track_count(), 2);
    }
}
