//! Template placeholder tokens
//!
//! Decoder and encoder command templates and the metadata format string
//! embed fixed `@X@` markers that are substituted at run time.

use std::fmt;

/// A placeholder marker recognised in templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// `@M@`: the formatted metadata string
    Metadata,
    /// `@a@`: artist
    Artist,
    /// `@b@`: album
    Album,
    /// `@t@`: title
    Title,
    /// `@T@`: track file name
    Track,
    /// `@s@`: assembled songinfo
    String,
    /// `@u@`: stream start timestamp
    Timestamp,
}

impl Placeholder {
    /// Every marker, in table order
    pub const ALL: [Placeholder; 7] = [
        Self::Metadata,
        Self::Artist,
        Self::Album,
        Self::Title,
        Self::Track,
        Self::String,
        Self::Timestamp,
    ];

    /// The literal token as it appears in a template
    pub fn token(self) -> &'static str {
        match self {
            Self::Metadata => "@M@",
            Self::Artist => "@a@",
            Self::Album => "@b@",
            Self::Title => "@t@",
            Self::Track => "@T@",
            Self::String => "@s@",
            Self::Timestamp => "@u@",
        }
    }

    /// Number of non-overlapping occurrences in `s`
    pub fn count_in(self, s: &str) -> usize {
        s.matches(self.token()).count()
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Substitute placeholders in a single left-to-right pass.
///
/// Values are inserted verbatim and never rescanned, so a title that
/// happens to contain `@a@` is not expanded a second time. Markers without
/// a value in `values` are left untouched.
pub fn expand(template: &str, values: &[(Placeholder, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(at) = rest.find('@') {
        out.push_str(&rest[..at]);
        let tail = &rest[at..];
        match values
            .iter()
            .find(|(marker, _)| tail.starts_with(marker.token()))
        {
            Some((marker, value)) => {
                out.push_str(value);
                rest = &tail[marker.token().len()..];
            }
            None => {
                out.push('@');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_every_occurrence() {
        assert_eq!(Placeholder::Track.count_in("@T@"), 1);
        assert_eq!(Placeholder::Track.count_in("a @T@ b @T@ c @T@"), 3);
        assert_eq!(Placeholder::Track.count_in("@t@"), 0);
    }

    #[test]
    fn expand_is_single_pass() {
        let out = expand(
            "@a@ / @t@",
            &[(Placeholder::Artist, "@t@"), (Placeholder::Title, "Song")],
        );
        assert_eq!(out, "@t@ / Song");
    }

    #[test]
    fn expand_leaves_unknown_markers() {
        let out = expand("x@@T@y@z", &[(Placeholder::Track, "f.ogg")]);
        assert_eq!(out, "x@f.oggy@z");
    }

    #[test]
    fn tokens_are_distinct() {
        let mut tokens: Vec<_> = Placeholder::ALL.iter().map(|p| p.token()).collect();
        tokens.sort_unstable();
        tokens.dedup();
        assert_eq!(tokens.len(), Placeholder::ALL.len());
    }
}
