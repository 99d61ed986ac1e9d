//! Stroke numbering overlay.
//!
//! Overlays a small numeral marker per stroke, in document order. Document
//! order is stroke-writing order, and that ordering is the pedagogical
//! contract of the feature: marker `i` labels stroke `i`, never re-sorted.
//! The overlay is purely additive - existing drawable content is untouched.

use crate::sanitize::{SanitizedDocument, stroke_paths};

/// Marker circle radius in viewBox units (corpus viewBox is 109x109).
const MARKER_RADIUS: f32 = 5.0;
/// Numeral font size in viewBox units.
const FONT_SIZE: f32 = 7.0;
/// Marker palette: a white disc with a colored rim stays legible when the
/// whole image is later tinted or inverted.
const DISC_FILL: &str = "#ffffff";
const RIM_STROKE: &str = "#e05050";
const NUMERAL_FILL: &str = "#e05050";

/// Add stroke-order numerals to a sanitized document.
///
/// Anchors come from the corpus' label positions when the source carried
/// them (one per stroke); otherwise each stroke's initial MoveTo
/// coordinate is used, nudged off the stroke so the numeral does not sit
/// on the ink.
pub fn annotate(doc: &SanitizedDocument) -> SanitizedDocument {
    let anchors = resolve_anchors(doc);

    let mut markers = String::with_capacity(anchors.len() * 160);
    markers.push_str("<g id=\"stroke-numbers\">");
    for (i, (x, y)) in anchors.iter().enumerate() {
        let n = i + 1;
        markers.push_str(&format!(
            "<circle cx=\"{x}\" cy=\"{y}\" r=\"{MARKER_RADIUS}\" \
             fill=\"{DISC_FILL}\" fill-opacity=\"0.85\" \
             stroke=\"{RIM_STROKE}\" stroke-width=\"0.75\"/>"
        ));
        markers.push_str(&format!(
            "<text x=\"{x}\" y=\"{}\" font-size=\"{FONT_SIZE}\" \
             fill=\"{NUMERAL_FILL}\" text-anchor=\"middle\" \
             font-family=\"sans-serif\">{n}</text>",
            // Baseline shift to visually center the numeral in the disc
            y + FONT_SIZE * 0.36,
        ));
    }
    markers.push_str("</g>");

    // Splice the marker group in before the closing root tag
    let text = match doc.text.rfind("</svg>") {
        Some(pos) => {
            let mut out = String::with_capacity(doc.text.len() + markers.len());
            out.push_str(&doc.text[..pos]);
            out.push_str(&markers);
            out.push_str(&doc.text[pos..]);
            out
        }
        // Sanitizer output always ends in </svg>; degrade to unannotated
        None => doc.text.clone(),
    };

    SanitizedDocument {
        text,
        stroke_count: doc.stroke_count,
        view_box: doc.view_box.clone(),
        label_anchors: doc.label_anchors.clone(),
    }
}

/// One anchor per stroke: corpus label positions if complete, else
/// computed from each stroke's starting coordinate.
fn resolve_anchors(doc: &SanitizedDocument) -> Vec<(f32, f32)> {
    if doc.label_anchors.len() == doc.stroke_count {
        return doc.label_anchors.clone();
    }

    stroke_paths(&doc.text)
        .iter()
        .map(|d| {
            let (x, y) = path_start(d).unwrap_or((0.0, 0.0));
            (x - 2.0, y - 2.0)
        })
        .collect()
}

/// Parse the initial MoveTo coordinate of an SVG path.
fn path_start(d: &str) -> Option<(f32, f32)> {
    let rest = d.trim_start();
    let rest = rest.strip_prefix(['M', 'm'])?;

    let mut numbers = rest
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty());
    let x = parse_leading_number(numbers.next()?)?;
    let y = parse_leading_number(numbers.next()?)?;
    Some((x, y))
}

/// Parse a float from the front of a token that may run straight into the
/// next path command (`17.5c-0.73` -> 17.5).
fn parse_leading_number(token: &str) -> Option<f32> {
    let mut end = 0;
    for (i, c) in token.char_indices() {
        let part_of_number =
            c.is_ascii_digit() || c == '.' || ((c == '-' || c == '+') && i == 0);
        if part_of_number {
            end = i + c.len_utf8();
        } else {
            break;
        }
    }
    token[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::CharacterCode;
    use crate::sanitize::sanitize;

    fn sanitized(raw: &str) -> SanitizedDocument {
        sanitize(raw, &CharacterCode::normalize("79c1").unwrap()).unwrap()
    }

    const THREE_STROKES: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 109 109">
<g id="strokes">
<path d="M33.25,17.5c-0.73,1.2-1.5,2.4-2.2,3.1"/>
<path d="M12.5 34.23 L40 34"/>
<path d="m54,20 c1,2 3,4 5,6"/>
</g>
</svg>"#;

    #[test]
    fn test_marker_count_matches_strokes() {
        let doc = sanitized(THREE_STROKES);
        let annotated = annotate(&doc);
        assert_eq!(annotated.text.matches("<circle").count(), 3);
        assert_eq!(annotated.text.matches("<text").count(), 3);
        for n in 1..=3 {
            assert!(annotated.text.contains(&format!(">{n}</text>")));
        }
    }

    #[test]
    fn test_original_content_untouched() {
        let doc = sanitized(THREE_STROKES);
        let annotated = annotate(&doc);
        // Additive only: the original markup is still present verbatim
        let body = doc.text.strip_suffix("</svg>").unwrap();
        assert!(annotated.text.starts_with(body));
        assert!(annotated.text.ends_with("</svg>"));
        assert_eq!(annotated.stroke_count, doc.stroke_count);
    }

    #[test]
    fn test_corpus_anchors_win_when_complete() {
        let raw = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 109 109">
<path d="M10,10 L20,20"/>
<g id="kvg:StrokeNumbers_x"><text transform="matrix(1 0 0 1 42.5 43.5)">1</text></g>
</svg>"#;
        let doc = sanitized(raw);
        let annotated = annotate(&doc);
        assert!(annotated.text.contains("cx=\"42.5\""));
    }

    #[test]
    fn test_fallback_anchor_from_move_to() {
        let doc = sanitized(THREE_STROKES);
        assert!(doc.label_anchors.is_empty());
        let annotated = annotate(&doc);
        // 33.25 - 2.0 nudge
        assert!(annotated.text.contains("cx=\"31.25\""));
    }

    #[test]
    fn test_path_start_parsing() {
        assert_eq!(path_start("M33.25,17.5c-0.73"), Some((33.25, 17.5)));
        assert_eq!(path_start("  m54,20 c1,2"), Some((54.0, 20.0)));
        assert_eq!(path_start("M 12.5 34.23"), Some((12.5, 34.23)));
        assert_eq!(path_start("M-3,-4"), Some((-3.0, -4.0)));
        assert_eq!(path_start("L10,10"), None);
    }
}
