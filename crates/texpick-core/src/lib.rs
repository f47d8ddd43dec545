//! # texpick core
//!
//! Assembly of standalone LaTeX documents from extracted components.
//!
//! ## Overview
//!
//! Given a [`ParsedDocument`](texpick_syntax::ParsedDocument) and a set of
//! selected component ids, the [`DocumentAssembler`] writes a new `.tex` file
//! that compiles on its own:
//!
//! - the source preamble, normalized by [`preamble`] so figures render at
//!   final quality;
//! - the selected components in source order, with image references
//!   rewritten by the [`AssetResolver`];
//! - a single `\begin{document}` / `\end{document}` pair.
//!
//! ## Modules
//!
//! - [`assembler`] - Selection, ordering and output writing
//! - [`assets`] - Image lookup, copying and reference rewriting
//! - [`preamble`] - `draft` to `final` rewriting and graphicx insertion
//!
//! ## Examples
//!
//! ```no_run
//! use std::path::Path;
//! use texpick_core::{AssembleOptions, DocumentAssembler};
//!
//! let doc = texpick_syntax::load("thesis/main.tex")?;
//! let assembly = DocumentAssembler::new(AssembleOptions::default())
//!     .assemble(&doc, ["Section_2", "Section_1"], Path::new("out/custom_report.tex"))?;
//!
//! println!("wrote {} component(s)", assembly.included.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod assembler;
pub mod assets;
pub mod preamble;

pub use assembler::{AssembleError, AssembleOptions, Assembly, DocumentAssembler, NestedSelection};
pub use assets::{AssetError, AssetResolver, IMAGES_DIR};
