use crate::assets::AssetResolver;
use crate::preamble::normalize_preamble;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use texpick_syntax::{BEGIN_DOCUMENT, Component, END_DOCUMENT, ParsedDocument};
use thiserror::Error;

/// How to treat a selected component that lies inside another selected one,
/// e.g. a `\subsection` selected together with its `\section`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NestedSelection {
    /// Emit only the outer component. Its body already contains the inner one.
    #[default]
    Skip,
    /// Emit both, duplicating the inner text.
    Keep,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssembleOptions {
    #[serde(default)]
    pub nested: NestedSelection,
}

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("{0} has no \\begin{{document}}")]
    MissingBeginDocument(PathBuf),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What an assembly run produced.
#[derive(Debug, Clone, Serialize)]
pub struct Assembly {
    pub output: PathBuf,
    /// Ids of the components written, in document order.
    pub included: Vec<String>,
    /// Selected ids dropped because an enclosing component was also selected.
    pub nested: Vec<String>,
    /// Image files copied next to the output.
    pub images: Vec<PathBuf>,
}

/// Builds a standalone document from a subset of components.
#[derive(Debug, Clone, Default)]
pub struct DocumentAssembler {
    options: AssembleOptions,
}

impl DocumentAssembler {
    pub fn new(options: AssembleOptions) -> Self {
        Self { options }
    }

    /// Writes a document containing the selected components to `output_file`.
    ///
    /// Components are emitted in source order no matter the order of
    /// `selected`. Unknown ids and the document class are ignored. Images are
    /// copied into `images/` beside `output_file`.
    pub fn assemble<I, S>(
        &self,
        doc: &ParsedDocument,
        selected: I,
        output_file: &Path,
    ) -> Result<Assembly, AssembleError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if doc.preamble().is_none() {
            return Err(AssembleError::MissingBeginDocument(doc.source_path.clone()));
        }

        let output_dir = match output_file.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&output_dir).map_err(|source| AssembleError::Io {
            path: output_dir.clone(),
            source,
        })?;

        let mut resolver = AssetResolver::new(doc.source_dir(), &output_dir);
        let selected: HashSet<String> = selected
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .collect();
        let (text, included, nested) = self.render(doc, &selected, &mut resolver)?;

        fs::write(output_file, text).map_err(|source| AssembleError::Io {
            path: output_file.to_path_buf(),
            source,
        })?;
        log::info!(
            "Wrote {} with {} component(s)",
            output_file.display(),
            included.len()
        );

        Ok(Assembly {
            output: output_file.to_path_buf(),
            included,
            nested,
            images: resolver.copied(),
        })
    }

    /// Builds the document text. Image files are copied as a side effect.
    pub fn render(
        &self,
        doc: &ParsedDocument,
        selected: &HashSet<String>,
        resolver: &mut AssetResolver,
    ) -> Result<(String, Vec<String>, Vec<String>), AssembleError> {
        let preamble = doc
            .preamble()
            .ok_or_else(|| AssembleError::MissingBeginDocument(doc.source_path.clone()))?
            .trim_end();

        let chosen: Vec<&Component> = doc
            .body_components()
            .filter(|c| selected.contains(&c.id))
            .collect();
        let (chosen, nested) = match self.options.nested {
            NestedSelection::Keep => (chosen, Vec::new()),
            NestedSelection::Skip => drop_nested(chosen),
        };
        for id in &nested {
            log::debug!("{} is contained in another selected component", id);
        }

        let mut out = resolver.relocate(&normalize_preamble(preamble));
        out.push('\n');
        out.push_str(BEGIN_DOCUMENT);
        for component in &chosen {
            out.push_str("\n\n");
            out.push_str(&resolver.relocate(component.body.trim()));
        }
        out.push_str("\n\n");
        out.push_str(END_DOCUMENT);
        out.push('\n');

        let included = chosen.iter().map(|c| c.id.clone()).collect();
        Ok((out, included, nested))
    }
}

/// Splits `chosen` into components to emit and ids of components enclosed by
/// another chosen component.
fn drop_nested(chosen: Vec<&Component>) -> (Vec<&Component>, Vec<String>) {
    let mut kept = Vec::with_capacity(chosen.len());
    let mut nested = Vec::new();
    for component in &chosen {
        let enclosed = chosen
            .iter()
            .any(|other| other.id != component.id && other.span.contains(&component.span));
        if enclosed {
            nested.push(component.id.clone());
        } else {
            kept.push(*component);
        }
    }
    (kept, nested)
}
