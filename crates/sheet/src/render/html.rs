//! Printable HTML sheet music.
//!
//! The page loads abcjs from the jsDelivr CDN at [`ABCJS_URL`] and engraves
//! in the browser, so viewing it needs network access. Without it the page
//! shows only the title. The `.abc` format is the offline alternative.

use crate::model::ScoreDocument;
use crate::render::abc::tune;
use crate::render::{escape_html, SheetRenderer};
use crate::Result;

/// Measures drawn on each printed page.
pub const MEASURES_PER_PAGE: usize = 8;

/// Script the page loads to engrave its ABC tunes.
pub const ABCJS_URL: &str = "https://cdn.jsdelivr.net/npm/abcjs@6.4.4/dist/abcjs-basic-min.js";

const STYLE: &str = r#"    *, *::before, *::after { box-sizing: border-box; }
    body {
      font-family: Georgia, serif;
      background: #f0f0f0;
      margin: 0;
      padding: 2rem;
    }
    h1 {
      text-align: center;
      font-size: 1.6rem;
      margin-bottom: 2rem;
      color: #222;
    }
    .page {
      background: #fff;
      box-shadow: 0 2px 8px rgba(0, 0, 0, 0.15);
      margin: 0 auto 3rem;
      max-width: 860px;
      padding: 1rem;
    }
    .page svg {
      display: block;
      width: 100%;
      height: auto;
    }
    .abc-source { display: none; }
    @media print {
      body {
        background: #fff;
        padding: 0;
        margin: 0;
      }
      h1 {
        margin-top: 1rem;
      }
      .page {
        box-shadow: none;
        page-break-after: always;
        max-width: 100%;
        padding: 0;
        margin: 0;
      }
      .page:last-child {
        page-break-after: avoid;
      }
    }
"#;

const SCRIPT: &str = r#"  <script>
    document.querySelectorAll(".page").forEach((page) => {
      const source = page.querySelector(".abc-source");
      const target = page.querySelector(".score");
      if (source && target) {
        ABCJS.renderAbc(target, source.textContent, { responsive: "resize", add_classes: true });
      }
    });
  </script>
"#;

/// Printable HTML: one `.page` per [`MEASURES_PER_PAGE`] measures, each page
/// carrying its own ABC tune that abcjs engraves in the browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl SheetRenderer for HtmlRenderer {
    fn default_extension(&self) -> &'static str {
        ".html"
    }

    fn render(&self, score: &ScoreDocument) -> Result<String> {
        let title_safe = escape_html(&score.title);
        let heading = if score.title.is_empty() {
            String::new()
        } else {
            format!("  <h1>{}</h1>\n", title_safe)
        };

        let chunks: Vec<_> = if score.measures.is_empty() {
            vec![&score.measures[..]]
        } else {
            score.measures.chunks(MEASURES_PER_PAGE).collect()
        };

        let pages: Vec<String> = chunks
            .iter()
            .enumerate()
            .map(|(i, measures)| {
                let abc = tune(score, measures, i + 1, false);
                format!(
                    "  <div class=\"page\">\n    <div class=\"score\" id=\"page-{}\"></div>\n    <pre class=\"abc-source\">{}</pre>\n  </div>",
                    i + 1,
                    escape_html(&abc)
                )
            })
            .collect();

        Ok(format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n  <meta charset=\"UTF-8\" />\n  \
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\" />\n  \
             <title>{title}</title>\n  <style>\n{style}  </style>\n  \
             <script src=\"{abcjs}\"></script>\n</head>\n<body>\n{heading}{pages}\n{script}</body>\n</html>\n",
            title = title_safe,
            style = STYLE,
            abcjs = ABCJS_URL,
            heading = heading,
            pages = pages.join("\n"),
            script = SCRIPT,
        ))
    }
}
