use std::collections::HashMap;

use crate::tree::{Folder, MidiSection};

/// Parse-wide state threaded explicitly through the decode/link/emit
/// phases instead of living at module scope: the folder tree under
/// construction, the track-name lookups, and the descriptor index.
#[derive(Debug)]
pub struct ParseContext {
    pub root: Folder,
    /// `recordNumber -> track name`, populated from `qSxT` records.
    pub track_name_lookup: HashMap<u32, String>,
    /// `trackId -> trackNameBlock`, populated from `karT` records.
    pub track_lookup: HashMap<u32, u32>,
    /// `(recordNumber, associatedMidiID) -> descriptor`.
    pub descriptors: HashMap<(u32, u32), MidiSection>,
    /// Record number of the descriptor most recently decoded whose label is
    /// "Root Folder" -- `karT` records are only honoured while this is set,
    /// since their target depends on stream decode order.
    pub current_is_root_folder: bool,
    pub warnings: Vec<String>,
}

impl Default for ParseContext {
    fn default() -> Self {
        ParseContext::new()
    }
}

impl ParseContext {
    pub fn new() -> Self {
        ParseContext {
            root: Folder::root(),
            track_name_lookup: HashMap::new(),
            track_lookup: HashMap::new(),
            descriptors: HashMap::new(),
            current_is_root_folder: false,
            warnings: Vec::new(),
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{message}");
        self.warnings.push(message);
    }
}
