pub mod modes;
pub mod note_router;
pub mod smf;

pub use modes::EmitOutput;
