use serde::{Deserialize, Serialize};

/// Terminator of one physical line, kept so a rewrite does not normalize endings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
    /// Last line of a file that does not end with a newline.
    None,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
            LineEnding::None => "",
        }
    }
}

/// One line of a directive file. Its position is its index in the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub ending: LineEnding,
}

impl Line {
    pub fn new(text: impl Into<String>, ending: LineEnding) -> Self {
        Self {
            text: text.into(),
            ending,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Narrows which occurrences of a repeated directive (or key) are touched.
///
/// The default selector matches every occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default)]
    pub use_marker: bool,
}

impl Selector {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn tagged(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            use_marker: false,
        }
    }

    pub fn marked(tag: Option<String>) -> Self {
        Self {
            tag,
            use_marker: true,
        }
    }

    /// True when no filtering applies.
    pub fn is_all(&self) -> bool {
        self.tag.is_none() && !self.use_marker
    }
}

/// Whether a leading `#` switches a directive on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// `#NAME` is commented out; bare `NAME` is active.
    #[default]
    Comment,
    /// `#NAME` is an active command; bare `NAME` is ignored by the solver.
    Command,
}

impl Activation {
    /// Whether a line carrying the leading `#` counts as active.
    pub fn hash_is_active(self) -> bool {
        matches!(self, Activation::Command)
    }
}
