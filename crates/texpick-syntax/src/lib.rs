//! # texpick syntax
//!
//! Structural extraction of LaTeX documents without a grammar.
//!
//! ## Overview
//!
//! The crate turns raw LaTeX source into an ordered list of
//! [`Component`]s: the document class plus every `\section`,
//! `\subsection` and `\subsubsection` found between `\begin{document}` and
//! `\end{document}`.
//!
//! Extraction works in three steps:
//!
//! 1. The [`lexer`] scans the body for heading markers (`\section{` and
//!    friends).
//! 2. The [`outline`] state machine closes each heading at the next marker of
//!    the same or higher priority.
//! 3. [`document`] cuts the bodies out of the source, numbers them per kind
//!    and sorts them by offset.
//!
//! A `\section` body contains its subsections, and those subsections are
//! also reported on their own. Consumers decide how to treat the overlap.
//!
//! ## Examples
//!
//! ```
//! use texpick_syntax::{ComponentKind, extract_components};
//!
//! let source = r"\documentclass{article}
//! \begin{document}
//! \section{Intro}
//! Hello.
//! \subsection{Detail}
//! More.
//! \end{document}";
//!
//! let components = extract_components(source);
//! assert_eq!(components.len(), 3);
//! assert_eq!(components[0].kind, ComponentKind::DocumentClass);
//! assert_eq!(components[1].id, "Section_1");
//! assert_eq!(components[2].title, "Detail");
//! ```

pub mod component;
pub mod document;
pub mod lexer;
pub mod outline;

pub use component::{Component, ComponentKind, Span};
pub use document::{
    BEGIN_DOCUMENT, END_DOCUMENT, ParseError, ParsedDocument, SyntaxError, extract_components,
    load,
};
