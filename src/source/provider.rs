//! Candidate generation strategies, one per external provider.
//!
//! Each provider turns a [`CharacterCode`] into the URLs it would live at
//! on that source. The resolver composes an ordered list of providers and
//! flattens their candidates into one strict priority order, replacing the
//! per-script URL lists the duplicate asset scripts used to carry.

use crate::code::CharacterCode;
use crate::source::candidate::{CandidateKind, SourceCandidate};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use url::Url;

/// A strategy that knows where one provider keeps stroke diagrams.
pub trait CandidateSource: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &'static str;

    /// Candidate URLs for this code, most likely first. Priorities are
    /// assigned by the resolver from overall position.
    fn urls(&self, code: &CharacterCode) -> Vec<(Url, CandidateKind)>;
}

/// Raw git repository mirror: `<base>/kanji/{hex5}.svg`.
pub struct RawRepoMirror {
    base: String,
}

impl RawRepoMirror {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }
}

impl CandidateSource for RawRepoMirror {
    fn name(&self) -> &'static str {
        "raw-repo"
    }

    fn urls(&self, code: &CharacterCode) -> Vec<(Url, CandidateKind)> {
        parse_one(
            format!("{}/kanji/{}.svg", self.base, code.hex5()),
            CandidateKind::RawMirror,
        )
    }
}

/// CDN mirror of the corpus repository: `<base>/kanji/{hex5}.svg`.
pub struct CdnMirror {
    base: String,
}

impl CdnMirror {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }
}

impl CandidateSource for CdnMirror {
    fn name(&self) -> &'static str {
        "cdn"
    }

    fn urls(&self, code: &CharacterCode) -> Vec<(Url, CandidateKind)> {
        parse_one(
            format!("{}/kanji/{}.svg", self.base, code.hex5()),
            CandidateKind::CdnMirror,
        )
    }
}

/// Filename-permutation fallbacks on a mirror base.
///
/// Tries, in order: sharded layout (`{shard}/{hex5}.svg`), the unpadded
/// 4-digit name, calligraphic style suffixes (`{hex5}-Kaisho.svg`), and a
/// percent-encoded glyph-named path for encyclopedia-style sources.
pub struct VariantMirror {
    base: String,
    style_suffixes: Vec<&'static str>,
}

impl VariantMirror {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            style_suffixes: vec!["Kaisho"],
        }
    }
}

impl CandidateSource for VariantMirror {
    fn name(&self) -> &'static str {
        "variants"
    }

    fn urls(&self, code: &CharacterCode) -> Vec<(Url, CandidateKind)> {
        let mut out = Vec::new();
        let hex4 = code.hex4();
        let hex5 = code.hex5();

        out.extend(parse_one(
            format!("{}/kanji/{}/{}.svg", self.base, code.shard(), hex5),
            CandidateKind::FilepathVariant,
        ));

        // Unpadded name only differs below U+10000
        if hex4 != hex5 {
            out.extend(parse_one(
                format!("{}/kanji/{}.svg", self.base, hex4),
                CandidateKind::FilepathVariant,
            ));
        }

        for suffix in &self.style_suffixes {
            out.extend(parse_one(
                format!("{}/kanji/{}-{}.svg", self.base, hex5, suffix),
                CandidateKind::FilepathVariant,
            ));
        }

        if let Some(glyph) = code.glyph() {
            let encoded = utf8_percent_encode(&glyph.to_string(), NON_ALPHANUMERIC).to_string();
            out.extend(parse_one(
                format!("{}/glyph/{}.svg", self.base, encoded),
                CandidateKind::FilepathVariant,
            ));
        }

        out
    }
}

fn parse_one(raw: String, kind: CandidateKind) -> Vec<(Url, CandidateKind)> {
    // A provider base that produces an unparseable URL contributes nothing;
    // the resolver treats the remaining candidates normally.
    Url::parse(&raw).map(|url| vec![(url, kind)]).unwrap_or_default()
}

/// Default provider order: raw repository mirror, CDN mirror, then
/// filename permutations on the raw mirror.
pub fn default_providers() -> Vec<Box<dyn CandidateSource>> {
    vec![
        Box::new(RawRepoMirror::new(
            "https://raw.githubusercontent.com/KanjiVG/kanjivg/master",
        )),
        Box::new(CdnMirror::new(
            "https://cdn.jsdelivr.net/gh/KanjiVG/kanjivg@master",
        )),
        Box::new(VariantMirror::new(
            "https://raw.githubusercontent.com/KanjiVG/kanjivg/master",
        )),
    ]
}

/// Flatten providers into one strictly ordered candidate list.
pub fn candidates_for(
    providers: &[Box<dyn CandidateSource>],
    code: &CharacterCode,
) -> Vec<SourceCandidate> {
    let mut priority = 0;
    let mut out = Vec::new();
    for provider in providers {
        let urls = provider.urls(code);
        crate::debug!("fetch"; "{}: {} candidate(s) from {}", code.hex4(), urls.len(), provider.name());
        for (url, kind) in urls {
            out.push(SourceCandidate::new(url, kind, priority));
            priority += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(token: &str) -> CharacterCode {
        CharacterCode::normalize(token).unwrap()
    }

    #[test]
    fn test_raw_mirror_url() {
        let provider = RawRepoMirror::new("https://example.com/kanjivg");
        let urls = provider.urls(&code("79c1"));
        assert_eq!(
            urls[0].0.as_str(),
            "https://example.com/kanjivg/kanji/079c1.svg"
        );
        assert_eq!(urls[0].1, CandidateKind::RawMirror);
    }

    #[test]
    fn test_variant_mirror_permutations() {
        let provider = VariantMirror::new("https://example.com/m");
        let urls = provider.urls(&code("私"));
        let paths: Vec<&str> = urls.iter().map(|(u, _)| u.path()).collect();
        assert_eq!(
            paths,
            vec![
                "/m/kanji/079/079c1.svg",
                "/m/kanji/79c1.svg",
                "/m/kanji/079c1-Kaisho.svg",
                "/m/glyph/%E7%A7%81.svg",
            ]
        );
    }

    #[test]
    fn test_candidates_strict_priority_order() {
        let providers = default_providers();
        let candidates = candidates_for(&providers, &code("4e00"));
        assert!(candidates.len() >= 4);
        for (i, candidate) in candidates.iter().enumerate() {
            assert_eq!(candidate.priority, i);
        }
        assert_eq!(candidates[0].kind, CandidateKind::RawMirror);
        assert_eq!(candidates[1].kind, CandidateKind::CdnMirror);
    }

    #[test]
    fn test_candidates_deterministic() {
        let providers = default_providers();
        let a = candidates_for(&providers, &code("79c1"));
        let b = candidates_for(&providers, &code("79c1"));
        let urls_a: Vec<_> = a.iter().map(|c| c.url.as_str().to_string()).collect();
        let urls_b: Vec<_> = b.iter().map(|c| c.url.as_str().to_string()).collect();
        assert_eq!(urls_a, urls_b);
    }
}
