//! Markdown sheet music engraved by VexFlow.
//!
//! The module script imports VexFlow from the jsDelivr CDN at
//! [`VEXFLOW_URL`], so the viewer needs network access as well as script
//! execution.

use crate::model::ScoreDocument;
use crate::render::{escape_html, SheetRenderer};
use crate::Result;

/// ES module the Markdown imports VexFlow from.
pub const VEXFLOW_URL: &str = "https://cdn.jsdelivr.net/npm/vexflow@4.2.3/build/esm/entry/vexflow.js";

const STYLE: &str = r#"<style>
  #tubechord-score {
    display: grid;
    gap: 1.25rem;
    margin-top: 1rem;
  }
  .tubechord-measure {
    border: 1px solid #d8d8d8;
    border-radius: 8px;
    background: #ffffff;
    padding: 0.5rem;
    overflow-x: auto;
  }
</style>
"#;

// Draws one system per measure from the JSON payload. The bass staff and
// brace appear only when some measure has a bass note.
const SCRIPT_BODY: &str = r#"
  const host = document.getElementById("tubechord-score");
  const payloadNode = document.getElementById("tubechord-score-data");
  if (!host || !payloadNode) {
    throw new Error("Missing VexFlow score container.");
  }

  const payload = JSON.parse(payloadNode.textContent || "{}");
  const beats = Number(payload.beats) || 4;
  const beatValue = Number(payload.beat_value) || 4;
  const timeSignature = payload.time_signature || "4/4";

  const defaultTreble = [{ keys: ["b/4"], duration: "wr", accidentals: [null] }];
  const defaultBass = [{ keys: ["d/3"], duration: "wr", accidentals: [null] }];
  const measures = Array.isArray(payload.measures) && payload.measures.length > 0
    ? payload.measures
    : [{ treble: defaultTreble, bass: defaultBass }];
  const hasBass = measures.some((measure) =>
    (measure.bass || []).some((entry) => !String(entry.duration).endsWith("r")));

  const toStaveNotes = (entries, clef) => entries.map((entry) => {
    const note = new StaveNote({ clef, keys: entry.keys, duration: entry.duration });
    (entry.accidentals || []).forEach((symbol, index) => {
      if (symbol) {
        note.addModifier(new Accidental(symbol), index);
      }
    });
    return note;
  });

  measures.forEach((measure, index) => {
    const root = document.createElement("div");
    root.className = "tubechord-measure";
    host.appendChild(root);

    const renderer = new Renderer(root, Renderer.Backends.SVG);
    renderer.resize(760, hasBass ? 230 : 130);
    const context = renderer.getContext();

    const treble = new Stave(20, 24, 700).addClef("treble");
    if (index === 0) {
      treble.addTimeSignature(timeSignature);
    }
    treble.setContext(context).draw();

    const trebleVoice = new Voice({ num_beats: beats, beat_value: beatValue }).setMode(Voice.Mode.SOFT);
    trebleVoice.addTickables(toStaveNotes(measure.treble.length ? measure.treble : defaultTreble, "treble"));

    if (!hasBass) {
      new Formatter().joinVoices([trebleVoice]).format([trebleVoice], 580);
      trebleVoice.draw(context, treble);
      return;
    }

    const bass = new Stave(20, 130, 700).addClef("bass");
    if (index === 0) {
      bass.addTimeSignature(timeSignature);
    }
    bass.setContext(context).draw();

    for (const type of [StaveConnector.type.BRACE, StaveConnector.type.SINGLE_LEFT, StaveConnector.type.SINGLE_RIGHT]) {
      new StaveConnector(treble, bass).setType(type).setContext(context).draw();
    }

    const bassVoice = new Voice({ num_beats: beats, beat_value: beatValue }).setMode(Voice.Mode.SOFT);
    bassVoice.addTickables(toStaveNotes(measure.bass.length ? measure.bass : defaultBass, "bass"));

    new Formatter().joinVoices([trebleVoice]).joinVoices([bassVoice]).format([trebleVoice, bassVoice], 580);
    trebleVoice.draw(context, treble);
    bassVoice.draw(context, bass);
  });
"#;

/// Markdown with the score as a JSON payload and a VexFlow module script that
/// engraves it. Needs a viewer that runs scripts.
#[derive(Debug, Clone, Copy, Default)]
pub struct VexflowMarkdownRenderer;

impl SheetRenderer for VexflowMarkdownRenderer {
    fn default_extension(&self) -> &'static str {
        ".md"
    }

    fn render(&self, score: &ScoreDocument) -> Result<String> {
        // A literal "</script>" in a title would end the data block early.
        let payload = serde_json::to_string(score)?.replace("</", "<\\/");

        let mut out = String::new();
        if !score.title.is_empty() {
            out.push_str(&format!("# {}\n\n", escape_html(&score.title)));
        }
        out.push_str(
            "This Markdown uses embedded JavaScript + VexFlow. \
             Open it in a Markdown viewer that allows script execution.\n\n",
        );
        out.push_str(STYLE);
        out.push('\n');
        out.push_str("<div id=\"tubechord-score\"></div>\n");
        out.push_str(&format!(
            "<script id=\"tubechord-score-data\" type=\"application/json\">{}</script>\n",
            payload
        ));
        out.push_str("<script type=\"module\">\n");
        out.push_str(&format!(
            "  import {{ Accidental, Formatter, Renderer, Stave, StaveConnector, StaveNote, Voice }} from \"{}\";\n",
            VEXFLOW_URL
        ));
        out.push_str(SCRIPT_BODY);
        out.push_str("</script>\n");

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Clef, Measure, StaffNote};

    fn score(title: &str) -> ScoreDocument {
        let mut doc = ScoreDocument::new(title);
        doc.measures.push(Measure {
            treble: vec![StaffNote::chord(&[61, 65, 68], 4)],
            bass: vec![StaffNote::rest(Clef::Bass, 4)],
        });
        doc
    }

    fn payload(markdown: &str) -> serde_json::Value {
        let start_tag = "<script id=\"tubechord-score-data\" type=\"application/json\">";
        let start = markdown.find(start_tag).unwrap() + start_tag.len();
        let end = start + markdown[start..].find("</script>").unwrap();
        serde_json::from_str(&markdown[start..end]).unwrap()
    }

    #[test]
    fn heading_and_containers() {
        let md = VexflowMarkdownRenderer.render(&score("My <Song>")).unwrap();
        assert!(md.starts_with("# My &lt;Song&gt;\n"));
        assert!(md.contains("<div id=\"tubechord-score\"></div>"));
        assert!(md.contains(VEXFLOW_URL));
        assert!(md.contains("<script type=\"module\">"));
    }

    #[test]
    fn payload_round_trips_the_score() {
        let doc = score("Song");
        let md = VexflowMarkdownRenderer.render(&doc).unwrap();
        let value = payload(&md);

        assert_eq!(value["beats"], 4);
        assert_eq!(value["measures"][0]["treble"][0]["keys"][1], "f/4");
        assert_eq!(value["measures"][0]["treble"][0]["accidentals"][0], "#");
        assert_eq!(value["measures"][0]["bass"][0]["duration"], "wr");
        let parsed: ScoreDocument = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn bass_staff_is_drawn_only_for_bass_notes() {
        let md = VexflowMarkdownRenderer.render(&score("Song")).unwrap();
        assert!(md.contains("const hasBass = measures.some("));
        assert!(md.contains("if (!hasBass) {"));
        assert!(!score("Song").has_bass_notes());
    }

    #[test]
    fn payload_is_compact() {
        let md = VexflowMarkdownRenderer.render(&score("Song")).unwrap();
        assert!(md.contains("{\"title\":\"Song\",\"time_signature\":\"4/4\",\"beats\":4,"));
    }

    #[test]
    fn closing_tags_in_payload_are_escaped() {
        let md = VexflowMarkdownRenderer.render(&score("</script><b>")).unwrap();
        assert!(md.contains("<\\/script><b>"));
        assert_eq!(payload(&md)["title"], "</script><b>");
    }
}
