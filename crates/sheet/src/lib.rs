//! Sheet music for tubechord MIDI files.
//!
//! A MIDI file is first quantised into a renderer-neutral [`ScoreDocument`]
//! (a grand staff in 4/4 with quarter-note resolution), then handed to a
//! [`SheetRenderer`]:
//!
//! - [`HtmlRenderer`]: printable HTML, engraved in the browser by abcjs from [`ABCJS_URL`]
//! - [`VexflowMarkdownRenderer`]: Markdown with an embedded VexFlow script from [`VEXFLOW_URL`]
//! - [`AbcRenderer`]: plain ABC notation
//!
//! Both browser formats need network access to engrave. ABC output does not.

pub mod model;
pub mod render;
pub mod score;

pub use model::{Clef, Measure, ScoreDocument, StaffNote};
pub use render::{
    AbcRenderer, HtmlRenderer, SheetFormat, SheetRenderer, VexflowMarkdownRenderer, ABCJS_URL,
    MEASURES_PER_PAGE, VEXFLOW_URL,
};
pub use score::{score_from_midi, score_from_notes};

/// Errors from score building and rendering.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Midi(#[from] chord_midi::Error),

    #[error("failed to serialise score: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown sheet format '{0}' (expected html, md-vexflow or abc)")]
    UnknownFormat(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Parse a MIDI file and render it in one step.
pub fn render_midi(midi_bytes: &[u8], title: &str, format: SheetFormat) -> Result<String> {
    let score = score_from_midi(midi_bytes, title)?;
    format.renderer().render(&score)
}
