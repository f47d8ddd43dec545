use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a component title, in characters, including the ellipsis.
pub const MAX_TITLE_CHARS: usize = 50;

const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Returns true if `other` lies entirely within `self`.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// The four structural units recognized in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComponentKind {
    DocumentClass,
    Section,
    Subsection,
    Subsubsection,
}

impl ComponentKind {
    /// Nesting depth. Lower levels take priority when delimiting bodies.
    pub fn level(self) -> u8 {
        match self {
            ComponentKind::DocumentClass => 0,
            ComponentKind::Section => 1,
            ComponentKind::Subsection => 2,
            ComponentKind::Subsubsection => 3,
        }
    }

    /// Human-readable label, e.g. `Document Class`.
    pub fn label(self) -> &'static str {
        match self {
            ComponentKind::DocumentClass => "Document Class",
            ComponentKind::Section => "Section",
            ComponentKind::Subsection => "Subsection",
            ComponentKind::Subsubsection => "Subsubsection",
        }
    }

    /// Prefix used when building component identifiers.
    pub fn id_prefix(self) -> &'static str {
        match self {
            ComponentKind::DocumentClass => "DocumentClass",
            ComponentKind::Section => "Section",
            ComponentKind::Subsection => "Subsection",
            ComponentKind::Subsubsection => "Subsubsection",
        }
    }

    /// Maps a sectioning command (with its backslash) to its kind.
    pub fn from_command(command: &str) -> Option<Self> {
        match command {
            "\\section" => Some(ComponentKind::Section),
            "\\subsection" => Some(ComponentKind::Subsection),
            "\\subsubsection" => Some(ComponentKind::Subsubsection),
            _ => None,
        }
    }

    pub fn is_preamble(self) -> bool {
        self == ComponentKind::DocumentClass
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A structural unit extracted from a source document.
///
/// `body` is the raw source text of the unit including its own heading
/// command. Components are created by a single extraction pass and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub kind: ComponentKind,
    pub title: String,
    pub span: Span,
    pub is_preamble: bool,
    pub body: String,
}

impl Component {
    /// Byte offset of the heading in the original document.
    pub fn start(&self) -> usize {
        self.span.start
    }

    /// Byte offset one past the end of the body.
    pub fn end(&self) -> usize {
        self.span.end
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.title)
    }
}

/// Builds the identifier of the `seq`-th (1-based) component of `kind`.
pub fn component_id(kind: ComponentKind, seq: usize) -> String {
    format!("{}_{}", kind.id_prefix(), seq)
}

/// Collapses whitespace runs and truncates to [`MAX_TITLE_CHARS`].
pub fn normalize_title(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= MAX_TITLE_CHARS {
        return collapsed;
    }
    let mut title: String = collapsed
        .chars()
        .take(MAX_TITLE_CHARS - ELLIPSIS.len())
        .collect();
    title.push_str(ELLIPSIS);
    title
}
