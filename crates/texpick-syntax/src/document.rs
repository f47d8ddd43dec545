use crate::component::{Component, ComponentKind, Span, component_id, normalize_title};
use crate::lexer::{HeadingMarker, heading_markers};
use crate::outline::extent_ends;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const BEGIN_DOCUMENT: &str = "\\begin{document}";
pub const END_DOCUMENT: &str = "\\end{document}";

static DOCUMENT_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\documentclass(?:\[[^\]]*\])?\{([^}]+)\}").expect("valid documentclass regex")
});

/// Failure to load a source document.
#[derive(Debug, Error)]
pub enum SyntaxError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to build a single component. The component is dropped and
/// extraction continues with the next one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{kind} at offset {offset}: title runs past the end of its body")]
    TitleOverrunsBody { kind: ComponentKind, offset: usize },
    #[error("{kind} at offset {offset}: empty body")]
    EmptyBody { kind: ComponentKind, offset: usize },
}

/// A loaded source document and the components extracted from it.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedDocument {
    pub source_path: PathBuf,
    #[serde(skip)]
    pub full_text: String,
    /// Offset of `\begin{document}`, if present.
    pub begin_document: Option<usize>,
    /// From `\begin{document}` up to `\end{document}`, or the whole file when
    /// the markers are missing.
    pub body_range: Span,
    pub components: Vec<Component>,
}

/// Reads `path` and extracts its components.
pub fn load(path: impl AsRef<Path>) -> Result<ParsedDocument, SyntaxError> {
    let path = path.as_ref();
    let full_text = fs::read_to_string(path).map_err(|source| SyntaxError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("Loaded {} ({} bytes)", path.display(), full_text.len());
    Ok(ParsedDocument::from_source(full_text, path))
}

impl ParsedDocument {
    /// Builds a document from text already in memory.
    pub fn from_source(full_text: String, source_path: impl Into<PathBuf>) -> Self {
        let begin_document = full_text.find(BEGIN_DOCUMENT);
        let body_range = body_range(&full_text, begin_document);
        let components = extract_components(&full_text);
        Self {
            source_path: source_path.into(),
            full_text,
            begin_document,
            body_range,
            components,
        }
    }

    /// Re-runs extraction over the loaded text.
    pub fn extract(&self) -> Vec<Component> {
        extract_components(&self.full_text)
    }

    /// Text before `\begin{document}`, or `None` when the marker is absent.
    pub fn preamble(&self) -> Option<&str> {
        self.begin_document.map(|offset| &self.full_text[..offset])
    }

    /// Directory that relative references in the source resolve against.
    pub fn source_dir(&self) -> &Path {
        self.source_path.parent().unwrap_or_else(|| Path::new("."))
    }

    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.id == id)
    }

    /// Components that can be selected into an assembled document.
    pub fn body_components(&self) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(|c| !c.is_preamble)
    }
}

fn body_range(text: &str, begin_document: Option<usize>) -> Span {
    let start = begin_document.unwrap_or(0);
    let end = text[start..]
        .find(END_DOCUMENT)
        .map_or(text.len(), |rel| start + rel);
    Span::new(start, end)
}

/// Extracts the structural components of `text`, sorted by start offset.
///
/// Never fails: headings that do not match are ignored and components that
/// cannot be built are logged and skipped.
pub fn extract_components(text: &str) -> Vec<Component> {
    let begin_document = text.find(BEGIN_DOCUMENT);
    let body = body_range(text, begin_document);

    let mut components = Vec::new();
    if let Some(class) = document_class(&text[..begin_document.unwrap_or(0)]) {
        components.push(class);
    }

    let markers = heading_markers(&text[body.start..body.end], body.start);
    let ends = extent_ends(&markers, body.end);
    let mut counters = [0usize; 4];

    for (marker, end) in markers.iter().zip(ends) {
        let Some(title_end) = title_end(text, marker) else {
            continue;
        };
        let counter = &mut counters[marker.level() as usize];
        *counter += 1;
        match heading_component(text, marker, title_end, end, *counter) {
            Ok(component) => components.push(component),
            Err(e) => log::warn!("Skipping component: {}", e),
        }
    }

    components.sort_by_key(|c| c.span.start);
    components
}

fn document_class(preamble: &str) -> Option<Component> {
    let captures = DOCUMENT_CLASS.captures(preamble)?;
    let whole = captures.get(0)?;
    let name = captures.get(1)?;
    Some(Component {
        id: component_id(ComponentKind::DocumentClass, 1),
        kind: ComponentKind::DocumentClass,
        title: normalize_title(name.as_str()),
        span: Span::new(whole.start(), whole.end()),
        is_preamble: true,
        body: whole.as_str().to_string(),
    })
}

/// Offset of the `}` closing a heading title, if the title is non-empty and
/// terminated.
fn title_end(text: &str, marker: &HeadingMarker) -> Option<usize> {
    let close = text[marker.title_start..].find('}')?;
    if close == 0 {
        return None;
    }
    Some(marker.title_start + close)
}

fn heading_component(
    text: &str,
    marker: &HeadingMarker,
    title_end: usize,
    end: usize,
    seq: usize,
) -> Result<Component, ParseError> {
    if title_end >= end {
        return Err(ParseError::TitleOverrunsBody {
            kind: marker.kind,
            offset: marker.offset,
        });
    }
    let span = Span::new(marker.offset, end);
    if span.is_empty() {
        return Err(ParseError::EmptyBody {
            kind: marker.kind,
            offset: marker.offset,
        });
    }
    Ok(Component {
        id: component_id(marker.kind, seq),
        kind: marker.kind,
        title: normalize_title(&text[marker.title_start..title_end]),
        span,
        is_preamble: false,
        body: text[span.start..span.end].to_string(),
    })
}
