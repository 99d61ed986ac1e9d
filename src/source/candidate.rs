//! Source candidate types.

use url::Url;

/// Where a candidate location comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    /// Raw git repository mirror
    RawMirror,
    /// CDN mirror of the same repository
    CdnMirror,
    /// Encyclopedia-style filename permutation (suffix/shard variants)
    FilepathVariant,
    /// Local on-disk cache
    LocalCache,
}

impl std::fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::RawMirror => "raw-mirror",
            Self::CdnMirror => "cdn-mirror",
            Self::FilepathVariant => "filepath-variant",
            Self::LocalCache => "local-cache",
        };
        f.write_str(s)
    }
}

/// One potential location to fetch a vector document for a code.
///
/// Candidates for a given code are generated deterministically and tried
/// strictly in `priority` order; the first success short-circuits the rest.
#[derive(Debug, Clone)]
pub struct SourceCandidate {
    pub url: Url,
    pub kind: CandidateKind,
    pub priority: usize,
}

impl SourceCandidate {
    pub fn new(url: Url, kind: CandidateKind, priority: usize) -> Self {
        Self {
            url,
            kind,
            priority,
        }
    }
}
