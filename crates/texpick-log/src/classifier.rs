use crate::ir::{ClassifiedError, ErrorCategory, Span};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors are printed either as `! message` or, with `-file-line-error`, as
/// `./file.tex:12: message`.
const ERROR_PREFIX: &str = r"(?:! |\S+:\d+: )";

/// Extensions of files the engine writes itself. A fresh first run always
/// reports them as missing.
const AUXILIARY_EXTENSIONS: &[&str] = &[
    "aux", "toc", "lof", "lot", "out", "bbl", "nav", "snm", "bcf", "idx", "ind", "glo",
];

struct Rule {
    category: ErrorCategory,
    pattern: Regex,
    detail: fn(&Captures<'_>) -> String,
}

fn group(caps: &Captures<'_>, index: usize) -> String {
    caps.get(index)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

fn rule(category: ErrorCategory, pattern: &str, detail: fn(&Captures<'_>) -> String) -> Rule {
    Rule {
        category,
        pattern: Regex::new(pattern).expect("valid log rule"),
        detail,
    }
}

/// Builds a multi-line pattern for a `!`-style error message.
fn error_line(message: &str) -> String {
    format!("(?m){}{}", ERROR_PREFIX, message)
}

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule(
            ErrorCategory::LatexError,
            &error_line(r"LaTeX Error: (.*)$"),
            |c| group(c, 1),
        ),
        rule(
            ErrorCategory::PackageError,
            &error_line(r"Package (.+?) Error: (.*)$"),
            |c| format!("{}: {}", group(c, 1), group(c, 2)),
        ),
        rule(
            ErrorCategory::MissingElement,
            &error_line(r"Missing (.*)$"),
            |c| group(c, 1),
        ),
        rule(ErrorCategory::MissingFile, r"(?m)No file (.*)$", |c| {
            group(c, 1)
        }),
        rule(
            ErrorCategory::UndefinedCommand,
            &error_line(r"Undefined control sequence\.?[ \t]*(?:\r?\n(l\.\d+ .*)$)?"),
            |c| match c.get(1) {
                Some(context) => format!("Undefined control sequence ({})", context.as_str().trim()),
                None => "Undefined control sequence".to_string(),
            },
        ),
        rule(
            ErrorCategory::EmergencyStop,
            &error_line("Emergency stop"),
            |_| "Emergency stop".to_string(),
        ),
    ]
});

#[derive(Debug, Error)]
pub enum LogError {
    #[error("failed to read log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reads a log file. TeX logs are not guaranteed to be UTF-8, so invalid
/// sequences are replaced rather than rejected.
pub fn read_log(path: impl AsRef<Path>) -> Result<String, LogError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| LogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Scans TeX logs for the six known error categories.
///
/// Every match of every rule is reported, ordered by its position in the log.
/// Lines that match no rule are ignored.
#[derive(Debug, Clone, Copy)]
pub struct LogClassifier {
    skip_auxiliary_missing: bool,
}

impl Default for LogClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl LogClassifier {
    /// A classifier that reports every match, including `No file main.aux.`.
    pub fn new() -> Self {
        Self {
            skip_auxiliary_missing: false,
        }
    }

    /// Suppresses Missing File reports for auxiliary files written by the
    /// engine itself (`.aux`, `.toc`, ...).
    pub fn skip_auxiliary_missing(mut self, skip: bool) -> Self {
        self.skip_auxiliary_missing = skip;
        self
    }

    pub fn classify(&self, log: &str) -> Vec<ClassifiedError> {
        let line_starts: Vec<usize> = std::iter::once(0)
            .chain(log.match_indices('\n').map(|(i, _)| i + 1))
            .collect();

        let mut found: Vec<(usize, ClassifiedError)> = Vec::new();
        for (order, rule) in RULES.iter().enumerate() {
            for caps in rule.pattern.captures_iter(log) {
                let Some(whole) = caps.get(0) else {
                    continue;
                };
                let detail = (rule.detail)(&caps);
                if rule.category == ErrorCategory::MissingFile
                    && self.skip_auxiliary_missing
                    && is_auxiliary(&detail)
                {
                    continue;
                }
                let line = line_starts.partition_point(|&start| start <= whole.start());
                found.push((
                    order,
                    ClassifiedError {
                        category: rule.category,
                        detail,
                        line,
                        span: Span::new(whole.start(), whole.end()),
                    },
                ));
            }
        }

        found.sort_by_key(|(order, e)| (e.span.start, *order));
        found.into_iter().map(|(_, e)| e).collect()
    }

    /// Classifies and renders each error as `<category>: <detail>`.
    pub fn messages(&self, log: &str) -> Vec<String> {
        self.classify(log).iter().map(ToString::to_string).collect()
    }
}

fn is_auxiliary(detail: &str) -> bool {
    let name = detail.trim_end_matches('.');
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| AUXILIARY_EXTENSIONS.contains(&ext))
}
