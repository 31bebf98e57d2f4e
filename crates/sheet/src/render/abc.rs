use std::collections::HashMap;

use crate::model::{Clef, Measure, ScoreDocument, StaffNote};
use crate::render::SheetRenderer;
use crate::Result;

/// Measures per source line.
const MEASURES_PER_LINE: usize = 4;

/// ABC 2.1 text with one voice per staff and `L:1/4`. The bass voice is
/// left out when the score has no bass notes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbcRenderer;

impl SheetRenderer for AbcRenderer {
    fn default_extension(&self) -> &'static str {
        ".abc"
    }

    fn render(&self, score: &ScoreDocument) -> Result<String> {
        Ok(tune(score, &score.measures, 1, true))
    }
}

/// One ABC tune covering `measures`. An empty slice renders a bar of rests.
///
/// Whether the bass voice appears is decided on the whole score, so every
/// page of a paginated score has the same staves.
pub(crate) fn tune(score: &ScoreDocument, measures: &[Measure], number: usize, with_title: bool) -> String {
    let mut out = format!("X:{}\n", number);
    let title = score.title.replace(['\r', '\n'], " ");
    if with_title && !title.trim().is_empty() {
        out.push_str(&format!("T:{}\n", title.trim()));
    }
    out.push_str(&format!("M:{}\n", score.time_signature));
    out.push_str(&format!("L:1/{}\n", score.beat_value));
    let voices: &[(usize, Clef)] = if score.has_bass_notes() {
        out.push_str("%%score {1 2}\n");
        &[(1, Clef::Treble), (2, Clef::Bass)]
    } else {
        &[(1, Clef::Treble)]
    };
    out.push_str("K:C\n");

    for &(voice, clef) in voices {
        let clef_name = match clef {
            Clef::Treble => "treble",
            Clef::Bass => "bass",
        };
        out.push_str(&format!("V:{} clef={}\n", voice, clef_name));
        out.push_str(&voice_body(score, measures, clef));
        out.push('\n');
    }

    out
}

fn voice_body(score: &ScoreDocument, measures: &[Measure], clef: Clef) -> String {
    let bars: Vec<String> = if measures.is_empty() {
        vec![format!("z{}", score.beats)]
    } else {
        measures
            .iter()
            .map(|m| {
                let notes = match clef {
                    Clef::Treble => &m.treble,
                    Clef::Bass => &m.bass,
                };
                bar(notes)
            })
            .collect()
    };

    let lines: Vec<String> = bars
        .chunks(MEASURES_PER_LINE)
        .map(|line| line.join(" | "))
        .collect();
    format!("{} |]", lines.join(" |\n"))
}

/// One measure. Accidentals carry to the end of an ABC bar, so a natural that
/// follows a sharp on the same line or space gets an explicit `=`.
fn bar(notes: &[StaffNote]) -> String {
    let mut altered: HashMap<(char, i32), char> = HashMap::new();
    notes
        .iter()
        .map(|note| token(note, &mut altered))
        .collect::<Vec<_>>()
        .join(" ")
}

fn token(note: &StaffNote, altered: &mut HashMap<(char, i32), char>) -> String {
    let length = duration_suffix(&note.duration);
    if note.is_rest() {
        return format!("z{}", length);
    }

    let pitches: Vec<String> = note
        .keys
        .iter()
        .filter_map(|key| parse_key(key))
        .map(|(letter, sharp, octave)| {
            let accidental = if sharp {
                altered.insert((letter, octave), '^');
                "^"
            } else if altered.get(&(letter, octave)).is_some_and(|a| *a != '=') {
                altered.insert((letter, octave), '=');
                "="
            } else {
                ""
            };
            format!("{}{}", accidental, abc_pitch(letter, octave))
        })
        .collect();

    match pitches.len() {
        0 => format!("z{}", length),
        1 => format!("{}{}", pitches[0], length),
        _ => format!("[{}]{}", pitches.concat(), length),
    }
}

fn duration_suffix(duration: &str) -> &'static str {
    match duration.strip_suffix('r').unwrap_or(duration) {
        "h" => "2",
        "hd" => "3",
        "w" => "4",
        _ => "",
    }
}

/// `"c#/4"` into `('c', true, 4)`.
fn parse_key(key: &str) -> Option<(char, bool, i32)> {
    let (name, octave) = key.split_once('/')?;
    let mut chars = name.chars();
    let letter = chars.next()?.to_ascii_lowercase();
    let sharp = chars.next() == Some('#');
    Some((letter, sharp, octave.parse().ok()?))
}

/// ABC spelling of a letter in a scientific octave: uppercase is the middle C
/// octave, lowercase the one above, with `,` and `'` beyond.
fn abc_pitch(letter: char, octave: i32) -> String {
    if octave >= 5 {
        let marks = "'".repeat((octave - 5) as usize);
        format!("{}{}", letter, marks)
    } else {
        let marks = ",".repeat((4 - octave) as usize);
        format!("{}{}", letter.to_ascii_uppercase(), marks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn score(measures: Vec<Measure>) -> ScoreDocument {
        let mut doc = ScoreDocument::new("Test Song");
        doc.measures = measures;
        doc
    }

    #[test]
    fn octave_marks() {
        assert_eq!(abc_pitch('c', 4), "C");
        assert_eq!(abc_pitch('c', 5), "c");
        assert_eq!(abc_pitch('c', 6), "c'");
        assert_eq!(abc_pitch('g', 3), "G,");
        assert_eq!(abc_pitch('e', 2), "E,,");
    }

    #[test]
    fn renders_header_and_both_voices() {
        let doc = score(vec![Measure {
            treble: vec![StaffNote::chord(&[60, 64, 67], 2), StaffNote::chord(&[67, 71, 74], 2)],
            bass: vec![StaffNote::chord(&[48], 2), StaffNote::chord(&[55], 2)],
        }]);
        let abc = AbcRenderer.render(&doc).unwrap();

        assert_eq!(
            abc,
            "X:1\nT:Test Song\nM:4/4\nL:1/4\n%%score {1 2}\nK:C\n\
             V:1 clef=treble\n[CEG]2 [GBd]2 |]\n\
             V:2 clef=bass\nC,2 G,2 |]\n"
        );
    }

    #[test]
    fn sharps_and_cancelling_naturals() {
        let notes = vec![
            StaffNote::chord(&[61, 65, 68], 1), // C# F G#
            StaffNote::chord(&[60], 1),
            StaffNote::chord(&[60], 1),
            StaffNote::rest(Clef::Treble, 1),
        ];
        let mut altered = HashMap::new();
        let tokens: Vec<_> = notes.iter().map(|n| token(n, &mut altered)).collect();
        assert_eq!(tokens, vec!["[^CF^G]", "=C", "C", "z"]);
    }

    #[test]
    fn accidentals_reset_each_bar() {
        let doc = score(vec![
            Measure {
                treble: vec![StaffNote::chord(&[61], 4)],
                bass: vec![StaffNote::rest(Clef::Bass, 4)],
            },
            Measure {
                treble: vec![StaffNote::chord(&[60], 4)],
                bass: vec![StaffNote::rest(Clef::Bass, 4)],
            },
        ]);
        let abc = AbcRenderer.render(&doc).unwrap();
        assert!(abc.contains("^C4 | C4 |]"));
    }

    #[test]
    fn resting_bass_is_left_out() {
        let doc = score(vec![Measure {
            treble: vec![StaffNote::chord(&[60, 64, 67], 4)],
            bass: vec![StaffNote::rest(Clef::Bass, 4)],
        }]);
        let abc = AbcRenderer.render(&doc).unwrap();

        assert_eq!(
            abc,
            "X:1\nT:Test Song\nM:4/4\nL:1/4\nK:C\n\
             V:1 clef=treble\n[CEG]4 |]\n"
        );
    }

    #[test]
    fn bass_on_a_later_page_keeps_both_voices_on_every_page() {
        let doc = score(vec![
            Measure {
                treble: vec![StaffNote::chord(&[72], 4)],
                bass: vec![StaffNote::rest(Clef::Bass, 4)],
            },
            Measure {
                treble: vec![StaffNote::chord(&[72], 4)],
                bass: vec![StaffNote::chord(&[48], 4)],
            },
        ]);
        let first_page = tune(&doc, &doc.measures[..1], 1, true);
        assert!(first_page.contains("%%score {1 2}\n"));
        assert!(first_page.contains("V:2 clef=bass\nz4 |]\n"));
    }

    #[test]
    fn long_scores_wrap_every_four_bars() {
        let bar = Measure {
            treble: vec![StaffNote::chord(&[72], 4)],
            bass: vec![StaffNote::rest(Clef::Bass, 4)],
        };
        let abc = AbcRenderer.render(&score(vec![bar; 5])).unwrap();
        assert!(abc.contains("c4 | c4 | c4 | c4 |\nc4 |]"));
    }

    #[test]
    fn empty_score_is_a_bar_of_rest() {
        let abc = AbcRenderer.render(&score(vec![])).unwrap();
        assert!(abc.contains("V:1 clef=treble\nz4 |]\n"));
        assert!(!abc.contains("%%score"));
        assert!(!abc.contains("V:2"));
    }

    #[test]
    fn blank_title_is_omitted() {
        let mut doc = score(vec![]);
        doc.title = "  ".to_string();
        assert!(!AbcRenderer.render(&doc).unwrap().contains("T:"));
    }
}
