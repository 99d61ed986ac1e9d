//! Document sanitization.
//!
//! Reduces a fetched vector document to a minimal, renderer-safe subset:
//! only the first `<svg>` subtree survives, foreign-namespace vocabularies
//! (authoring-tool and licensing metadata) are removed, and the corpus'
//! own `kvg:`-prefixed stroke vocabulary is normalized to unprefixed names
//! so the group nesting that encodes stroke and radical boundaries stays
//! intact for the numbering overlay.
//!
//! This is the tree-based replacement for the regex find/replace the old
//! per-script sanitizers used: events are parsed, filtered by name
//! predicate and re-serialized, so hostile quoting inside attribute values
//! cannot break the stripping.

use crate::code::CharacterCode;
use crate::error::PipelineError;
use anyhow::{Context, Result, bail};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use std::io::Cursor;

/// The corpus' stroke vocabulary prefix, normalized to unprefixed names.
/// Every other prefix (sodipodi, inkscape, rdf, cc, dc, ...) belongs to a
/// non-rendering vocabulary and is dropped with its whole subtree.
const STROKE_PREFIX: &str = "kvg";

const SVG_NS: &str = "http://www.w3.org/2000/svg";

/// The cleaned, renderer-safe vector document.
#[derive(Debug, Clone)]
pub struct SanitizedDocument {
    /// Cleaned markup, exactly one `<svg>` root, no prefixed names.
    pub text: String,
    /// Number of drawable stroke elements (paths in document order).
    pub stroke_count: usize,
    /// Root `viewBox` attribute, when present.
    pub view_box: Option<String>,
    /// Corpus-supplied stroke label positions, in stroke order. Empty when
    /// the source carried no numbering group.
    pub label_anchors: Vec<(f32, f32)>,
}

/// Sanitize a raw document for `code`.
pub fn sanitize(raw: &str, code: &CharacterCode) -> Result<SanitizedDocument, PipelineError> {
    run(raw).map_err(|e| PipelineError::UnsanitizableDocument {
        code: code.hex4(),
        reason: format!("{e:#}"),
    })
}

fn run(raw: &str) -> Result<SanitizedDocument> {
    let mut reader = Reader::from_str(raw);
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    let mut stroke_count = 0usize;
    let mut view_box = None;
    let mut label_anchors = Vec::new();
    let mut root_seen = false;
    let mut depth = 0usize;

    loop {
        let event = reader.read_event().context("malformed XML")?;
        match event {
            Event::Eof => break,

            // Everything before the root element is discarded: BOM and
            // prolog/doctype, leading junk from sloppy mirrors.
            _ if !root_seen => match event {
                Event::Start(ref e) if local_name(e.name().as_ref()) == b"svg" => {
                    root_seen = true;
                    depth = 1;
                    let clean = clean_start(e, "svg", true, &mut view_box)?;
                    writer.write_event(Event::Start(clean))?;
                }
                _ => {}
            },

            Event::Start(e) => {
                let name = e.name();
                let name = name.as_ref();
                if let Some(prefix) = prefix_of(name) {
                    if prefix == STROKE_PREFIX.as_bytes() {
                        let local = std::str::from_utf8(local_name(name))?.to_string();
                        depth += 1;
                        let clean = clean_start(&e, &local, false, &mut view_box)?;
                        writer.write_event(Event::Start(clean))?;
                    } else {
                        // Foreign vocabulary: drop the whole subtree
                        skip_subtree(&mut reader)?;
                    }
                    continue;
                }

                let local = local_name(name);
                if local == b"metadata" {
                    skip_subtree(&mut reader)?;
                    continue;
                }
                if local == b"g" && is_number_group(&e) {
                    // The corpus keeps stroke label positions in a separate
                    // numbering group; harvest the anchors, drop the markup.
                    collect_label_anchors(&mut reader, &mut label_anchors)?;
                    continue;
                }

                if local == b"path" {
                    stroke_count += 1;
                }
                depth += 1;
                let local = std::str::from_utf8(local)?.to_string();
                let clean = clean_start(&e, &local, false, &mut view_box)?;
                writer.write_event(Event::Start(clean))?;
            }

            Event::Empty(e) => {
                let name = e.name();
                let name = name.as_ref();
                if let Some(prefix) = prefix_of(name) {
                    if prefix != STROKE_PREFIX.as_bytes() {
                        continue; // foreign, drop
                    }
                }
                let local = local_name(name);
                if local == b"metadata" {
                    continue;
                }
                if local == b"path" {
                    stroke_count += 1;
                }
                let local = std::str::from_utf8(local)?.to_string();
                let clean = clean_start(&e, &local, false, &mut view_box)?;
                writer.write_event(Event::Empty(clean))?;
            }

            Event::End(e) => {
                depth -= 1;
                let name = e.name();
                let local = std::str::from_utf8(local_name(name.as_ref()))?.to_string();
                writer.write_event(Event::End(BytesEnd::new(local)))?;
                if depth == 0 {
                    break; // root closed; trailing junk is discarded
                }
            }

            Event::Text(e) => {
                let text = e.unescape().context("bad text escape")?;
                writer.write_event(Event::Text(BytesText::new(&text)))?;
            }

            Event::CData(e) => {
                let text = String::from_utf8(e.to_vec())?;
                writer.write_event(Event::Text(BytesText::new(&text)))?;
            }

            // Comments, PIs and doctypes inside the root are dropped
            _ => {}
        }
    }

    if !root_seen {
        bail!("no <svg> root element found");
    }
    if depth != 0 {
        bail!("unbalanced root element");
    }
    if stroke_count == 0 {
        bail!("no stroke paths after cleaning");
    }

    let text = String::from_utf8(writer.into_inner().into_inner())?;
    Ok(SanitizedDocument {
        text,
        stroke_count,
        view_box,
        label_anchors,
    })
}

/// Rebuild a start tag with a clean name and filtered attributes.
///
/// Drops `xmlns:*` declarations and foreign-prefixed attributes, renames
/// `kvg:*` attributes to their unprefixed form and captures `viewBox`.
/// The root element always carries the SVG default namespace.
fn clean_start(
    e: &BytesStart<'_>,
    local: &str,
    is_root: bool,
    view_box: &mut Option<String>,
) -> Result<BytesStart<'static>> {
    let mut out = BytesStart::new(local.to_string());
    let mut has_default_ns = false;

    for attr in e.attributes() {
        let attr = attr.context("malformed attribute")?;
        let key = attr.key.as_ref();

        if key == b"xmlns" {
            has_default_ns = true;
            out.push_attribute(("xmlns", SVG_NS));
            continue;
        }
        if key.starts_with(b"xmlns:") {
            continue; // prefix declarations are unreferenced after cleaning
        }

        let clean_key = match prefix_of(key) {
            None => std::str::from_utf8(key)?.to_string(),
            Some(prefix) if prefix == STROKE_PREFIX.as_bytes() => {
                std::str::from_utf8(local_name(key))?.to_string()
            }
            Some(_) => continue, // foreign attribute (incl. xml:space)
        };

        let value = attr.unescape_value().context("bad attribute escape")?;
        if is_root && clean_key == "viewBox" {
            *view_box = Some(value.to_string());
        }
        out.push_attribute((clean_key.as_str(), value.as_ref()));
    }

    if is_root && !has_default_ns {
        out.push_attribute(("xmlns", SVG_NS));
    }

    Ok(out)
}

/// Consume events until the current element's subtree is closed.
fn skip_subtree(reader: &mut Reader<&[u8]>) -> Result<()> {
    let mut depth = 1usize;
    while depth > 0 {
        match reader.read_event().context("malformed XML in skipped subtree")? {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth -= 1,
            Event::Eof => bail!("unexpected EOF inside skipped subtree"),
            _ => {}
        }
    }
    Ok(())
}

/// Is this `<g>` the corpus' stroke numbering group?
fn is_number_group(e: &BytesStart<'_>) -> bool {
    e.attributes().flatten().any(|attr| {
        attr.key.as_ref() == b"id"
            && String::from_utf8_lossy(&attr.value).contains("StrokeNumbers")
    })
}

/// Harvest label anchor points from the numbering group, then drop it.
///
/// Anchors come from `<text transform="matrix(1 0 0 1 X Y)">` elements, in
/// document order (which is stroke order).
fn collect_label_anchors(
    reader: &mut Reader<&[u8]>,
    anchors: &mut Vec<(f32, f32)>,
) -> Result<()> {
    let mut depth = 1usize;
    while depth > 0 {
        match reader.read_event().context("malformed numbering group")? {
            Event::Start(e) => {
                harvest_anchor(&e, anchors);
                depth += 1;
            }
            Event::Empty(e) => harvest_anchor(&e, anchors),
            Event::End(_) => depth -= 1,
            Event::Eof => bail!("unexpected EOF inside numbering group"),
            _ => {}
        }
    }
    Ok(())
}

fn harvest_anchor(e: &BytesStart<'_>, anchors: &mut Vec<(f32, f32)>) {
    if local_name(e.name().as_ref()) != b"text" {
        return;
    }
    if let Some(attr) = e
        .attributes()
        .flatten()
        .find(|a| a.key.as_ref() == b"transform")
        && let Some(point) = parse_matrix_anchor(&String::from_utf8_lossy(&attr.value))
    {
        anchors.push(point);
    }
}

/// Extract the translation of a `matrix(a b c d e f)` transform.
fn parse_matrix_anchor(transform: &str) -> Option<(f32, f32)> {
    let inner = transform
        .trim()
        .strip_prefix("matrix(")?
        .strip_suffix(')')?;
    let parts: Vec<f32> = inner
        .split([' ', ','])
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();
    if parts.len() == 6 {
        Some((parts[4], parts[5]))
    } else {
        None
    }
}

/// Collect the `d` attribute of every stroke path, in document order.
///
/// Document order is stroke-writing order - a corpus invariant the
/// numbering overlay and the fallback renderer both rely on.
pub fn stroke_paths(text: &str) -> Vec<String> {
    let mut reader = Reader::from_str(text);
    let mut paths = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if local_name(e.name().as_ref()) == b"path"
                    && let Some(attr) =
                        e.attributes().flatten().find(|a| a.key.as_ref() == b"d")
                {
                    paths.push(String::from_utf8_lossy(&attr.value).into_owned());
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }
    paths
}

fn prefix_of(name: &[u8]) -> Option<&[u8]> {
    name.iter().position(|&b| b == b':').map(|i| &name[..i])
}

fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().position(|&b| b == b':') {
        Some(i) => &name[i + 1..],
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code() -> CharacterCode {
        CharacterCode::normalize("79c1").unwrap()
    }

    const KANJIVG_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd">
<svg xmlns="http://www.w3.org/2000/svg" xmlns:kvg="http://kanjivg.tagaini.net" width="109" height="109" viewBox="0 0 109 109">
<g id="kvg:StrokePaths_079c1" style="fill:none;stroke:#000000">
  <g id="kvg:079c1" kvg:element="私">
    <g id="kvg:079c1-g1" kvg:element="禾" kvg:position="left">
      <path id="kvg:079c1-s1" kvg:type="㇒" d="M33.25,17.5c0.07,0.62-0.2,1.46-0.71,2.04"/>
      <path id="kvg:079c1-s2" kvg:type="㇐" d="M12.5,34.23c0.69,0.25,1.95,0.3,2.64,0.25"/>
    </g>
  </g>
</g>
<g id="kvg:StrokeNumbers_079c1" style="font-size:8">
  <text transform="matrix(1 0 0 1 26.25 16.63)">1</text>
  <text transform="matrix(1 0 0 1 5.50 31.50)">2</text>
</g>
</svg>"#;

    #[test]
    fn test_sanitize_kanjivg_sample() {
        let doc = sanitize(KANJIVG_SAMPLE, &code()).unwrap();
        assert_eq!(doc.stroke_count, 2);
        assert_eq!(doc.view_box.as_deref(), Some("0 0 109 109"));
        assert_eq!(doc.label_anchors, vec![(26.25, 16.63), (5.50, 31.50)]);
        assert!(doc.text.starts_with("<svg"));
        assert!(doc.text.contains(r#"element="私""#));
        assert!(!doc.text.contains("StrokeNumbers"));
        assert!(!doc.text.contains("<?xml"));
    }

    #[test]
    fn test_no_prefixed_names_survive() {
        let doc = sanitize(KANJIVG_SAMPLE, &code()).unwrap();
        // No colon-prefixed attribute or element name after processing:
        // every remaining colon belongs to an attribute value (style, url)
        for piece in doc.text.split('<').skip(1) {
            let tag = piece.split('>').next().unwrap_or("");
            let name = tag.split_whitespace().next().unwrap_or("");
            assert!(!name.contains(':'), "prefixed element `{name}` survived");
        }
        assert!(!doc.text.contains("kvg:"));
        assert!(!doc.text.contains("xmlns:"));
    }

    #[test]
    fn test_strips_authoring_tool_metadata() {
        let raw = r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:sodipodi="http://x" xmlns:inkscape="http://y">
<metadata><rdf:RDF xmlns:rdf="http://z"><cc:Work>junk</cc:Work></rdf:RDF></metadata>
<sodipodi:namedview pagecolor="#ffffff"/>
<path d="M1,1 L2,2" inkscape:label="stroke"/>
</svg>"##;
        let doc = sanitize(raw, &code()).unwrap();
        assert_eq!(doc.stroke_count, 1);
        assert!(!doc.text.contains("metadata"));
        assert!(!doc.text.contains("sodipodi"));
        assert!(!doc.text.contains("inkscape"));
    }

    #[test]
    fn test_leading_and_trailing_junk_discarded() {
        let raw = "\u{feff}garbage before\n<svg xmlns=\"http://www.w3.org/2000/svg\"><path d=\"M1,1\"/></svg>\ntrailing junk";
        let doc = sanitize(raw, &code()).unwrap();
        assert!(doc.text.starts_with("<svg"));
        assert!(doc.text.ends_with("</svg>"));
        assert!(!doc.text.contains("junk"));
    }

    #[test]
    fn test_hostile_quoting_in_attributes() {
        // A regex-based stripper trips over quotes inside values; the
        // event parser must not
        let raw = r#"<svg xmlns="http://www.w3.org/2000/svg"><g desc="a &quot;quoted&quot; > value"><path d="M1,1"/></g></svg>"#;
        let doc = sanitize(raw, &code()).unwrap();
        assert_eq!(doc.stroke_count, 1);
        assert!(doc.text.contains("path"));
    }

    #[test]
    fn test_missing_root_rejected() {
        let err = sanitize("<html><body>404</body></html>", &code()).unwrap_err();
        assert!(matches!(err, PipelineError::UnsanitizableDocument { .. }));
    }

    #[test]
    fn test_zero_strokes_rejected() {
        let raw = r#"<svg xmlns="http://www.w3.org/2000/svg"><g id="empty"/></svg>"#;
        assert!(sanitize(raw, &code()).is_err());
    }

    #[test]
    fn test_missing_xmlns_added_to_root() {
        let raw = r#"<svg viewBox="0 0 10 10"><path d="M1,1"/></svg>"#;
        let doc = sanitize(raw, &code()).unwrap();
        assert!(doc.text.contains(r#"xmlns="http://www.w3.org/2000/svg""#));
    }

    #[test]
    fn test_parse_matrix_anchor() {
        assert_eq!(
            parse_matrix_anchor("matrix(1 0 0 1 26.25 16.63)"),
            Some((26.25, 16.63))
        );
        assert_eq!(
            parse_matrix_anchor("matrix(1,0,0,1,5.5,31.5)"),
            Some((5.5, 31.5))
        );
        assert_eq!(parse_matrix_anchor("translate(3 4)"), None);
    }
}
