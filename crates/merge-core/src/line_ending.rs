//! Line ending helpers.
//!
//! Documents store text internally with LF (`'\n'`) line breaks. CRLF input is normalized on
//! load, and the detected line ending is remembered so that whole-document rewrites (such as a
//! merge result reset) can be joined with the document's own line break.

/// The line break sequence a document was loaded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// `'\n'`.
    #[default]
    Lf,
    /// `"\r\n"`.
    Crlf,
}

impl LineEnding {
    /// Line ending of a document's initial text.
    ///
    /// A single CRLF is enough to make the whole document CRLF, so a result that was checked out
    /// with Windows line breaks keeps them when it is rewritten.
    pub fn detect_in_text(text: &str) -> Self {
        match text.find("\r\n") {
            Some(_) => Self::Crlf,
            None => Self::Lf,
        }
    }

    /// Re-expand LF-joined lines (a snapshot's text) to this line ending.
    pub fn apply_to_text(self, text: &str) -> String {
        match self {
            Self::Lf => text.to_owned(),
            Self::Crlf => text.replace('\n', self.as_str()),
        }
    }

    /// Separator used when joining result lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::Crlf => "\r\n",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_and_apply() {
        assert_eq!(LineEnding::detect_in_text("a\r\nb\n"), LineEnding::Crlf);
        assert_eq!(LineEnding::detect_in_text("a\nb"), LineEnding::Lf);
        assert_eq!(LineEnding::detect_in_text("a\rb"), LineEnding::Lf);
        assert_eq!(LineEnding::Crlf.apply_to_text("a\nb"), "a\r\nb");
        assert_eq!(LineEnding::Lf.apply_to_text("a\nb"), "a\nb");
    }

    #[test]
    fn test_joined_lines_match_applied_text() {
        let lines = ["x", "y", ""];
        let ending = LineEnding::Crlf;
        assert_eq!(lines.join(ending.as_str()), ending.apply_to_text(&lines.join("\n")));
    }
}
