use derive_more::{Display, Error, From};

/// Errors from reading the fixed-offset header fields (tempo, time signature).
#[derive(Debug, Display, Error)]
pub enum SongMetaError {
    #[display("buffer too short to contain header at offset {offset}")]
    BufferTooShort { offset: usize },
}

/// Errors from decoding a single record header or dispatching its body.
#[derive(Debug, Display, Error)]
pub enum RecordError {
    #[display("truncated record header at offset {offset}")]
    TruncatedHeader { offset: usize },
    #[display("track name record {record_number}: payload length {length} < 98")]
    TrackNameTooShort { record_number: u32, length: u32 },
    #[display("track name record {record_number}: invalid UTF-8")]
    TrackNameNotUtf8 { record_number: u32 },
    #[display("duplicate descriptor for (record {record_number}, midi {midi_id})")]
    DuplicateDescriptor { record_number: u32, midi_id: u32 },
    #[display("descriptor {record_number}: section length marker not found within 100 bytes")]
    MarkerNotFound { record_number: u32 },
    #[display("record overran its declared payload length at offset {offset}")]
    Overrun { offset: usize },
}

/// Errors from the folder-body opcode decoder.
#[derive(Debug, Display, Error)]
pub enum FolderDecodeError {
    #[display("truncated folder entry at offset {offset}")]
    Truncated { offset: usize },
    #[display("folder body overran its declared payload length at offset {offset}")]
    Overrun { offset: usize },
}

/// Errors from the MIDI event opcode decoder.
#[derive(Debug, Display, Error)]
pub enum EventDecodeError {
    #[display("note-on at offset {offset} not followed by a note-off")]
    MissingNoteOff { offset: usize },
    #[display("unrecognised command 0x{opcode:02X} at offset {offset}")]
    UnrecognisedCommand { opcode: u8, offset: usize },
    #[display("event stream overran its declared payload length at offset {offset}")]
    Overrun { offset: usize },
    #[display("truncated event at offset {offset}")]
    Truncated { offset: usize },
}

/// Errors from the bundle/XML/base64 boundary.
#[derive(Debug, Display, Error)]
pub enum BundleError {
    #[display("bundle directory does not exist: {path}")]
    MissingBundle { path: String },
    #[display("projectData not found in bundle")]
    MissingProjectData,
    #[display("could not read projectData: {source}")]
    Io {
        source: std::io::Error,
    },
    #[display("malformed projectData XML: {source}")]
    Xml {
        source: quick_xml::Error,
    },
    #[display("NS.data element not found in projectData")]
    MissingNsData,
    #[display("base64 decode of NS.data failed: {source}")]
    Base64 {
        source: base64::DecodeError,
    },
    #[display("could not create output directory: {source}")]
    OutputDir {
        source: std::io::Error,
    },
}

/// Top-level error aggregate returned by the library's public API.
#[derive(Debug, Display, Error, From)]
pub enum ParseError {
    #[display("{_0}")]
    SongMeta(SongMetaError),
    #[display("{_0}")]
    Record(RecordError),
    #[display("{_0}")]
    Folder(FolderDecodeError),
    #[display("{_0}")]
    Event(EventDecodeError),
    #[display("{_0}")]
    Bundle(BundleError),
    #[display("I/O error: {_0}")]
    Io(std::io::Error),
}

pub type Result<T> = std::result::Result<T, ParseError>;
