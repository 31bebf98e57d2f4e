//! Output formats for a [`ScoreDocument`].

mod abc;
mod html;
mod vexflow;

pub use abc::AbcRenderer;
pub use html::{HtmlRenderer, ABCJS_URL, MEASURES_PER_PAGE};
pub use vexflow::{VexflowMarkdownRenderer, VEXFLOW_URL};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::ScoreDocument;
use crate::{Error, Result};

/// Turns a score into the text of one output file.
pub trait SheetRenderer {
    /// Extension including the leading dot, e.g. `".html"`.
    fn default_extension(&self) -> &'static str;

    fn render(&self, score: &ScoreDocument) -> Result<String>;
}

/// Selectable output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SheetFormat {
    #[default]
    Html,
    MdVexflow,
    Abc,
}

impl SheetFormat {
    pub const ALL: [SheetFormat; 3] = [SheetFormat::Html, SheetFormat::MdVexflow, SheetFormat::Abc];

    pub fn as_str(&self) -> &'static str {
        match self {
            SheetFormat::Html => "html",
            SheetFormat::MdVexflow => "md-vexflow",
            SheetFormat::Abc => "abc",
        }
    }

    pub fn renderer(&self) -> Box<dyn SheetRenderer> {
        match self {
            SheetFormat::Html => Box::new(HtmlRenderer),
            SheetFormat::MdVexflow => Box::new(VexflowMarkdownRenderer),
            SheetFormat::Abc => Box::new(AbcRenderer),
        }
    }
}

impl fmt::Display for SheetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SheetFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SheetFormat::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownFormat(s.to_string()))
    }
}

/// Escape the characters that are unsafe in HTML text content.
pub(crate) fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
