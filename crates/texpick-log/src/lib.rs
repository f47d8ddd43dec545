//! # texpick log classifier
//!
//! Turns the unstructured log of a `pdflatex` run into a short list of
//! categorized, human-readable errors.
//!
//! ## Overview
//!
//! TeX reports problems as lines starting with `!` (or, with
//! `-file-line-error`, with `file:line:`). The [`LogClassifier`] matches the
//! log against a fixed, ordered set of rules:
//!
//! | Category | Matches |
//! |----------|---------|
//! | LaTeX Error | `! LaTeX Error: ...` |
//! | Package Error | `! Package <name> Error: ...` |
//! | Missing Element | `! Missing ...` |
//! | Missing File | `No file ...` |
//! | Undefined Command | `! Undefined control sequence` |
//! | Emergency Stop | `! Emergency stop` |
//!
//! Every match is reported in log order. Anything else in the log, including
//! warnings, is ignored.
//!
//! ## Examples
//!
//! ```
//! use texpick_log::LogClassifier;
//!
//! let log = "(./main.tex\n! LaTeX Error: File `tikz.sty' not found.\n";
//! let messages = LogClassifier::new().messages(log);
//!
//! assert_eq!(messages, vec!["LaTeX Error: File `tikz.sty' not found."]);
//! ```
//!
//! The IR types implement `serde::Serialize`:
//!
//! ```
//! use texpick_log::LogClassifier;
//!
//! let errors = LogClassifier::new().classify("! Emergency stop.\n");
//! let json = serde_json::to_string(&errors)?;
//! assert!(json.contains("EmergencyStop"));
//! # Ok::<(), serde_json::Error>(())
//! ```

/// Error categories and classified error records.
pub mod ir;
/// Rule table and classifier.
pub mod classifier;


pub use classifier::{LogClassifier, LogError, read_log};
pub use ir::{ClassifiedError, ErrorCategory};
