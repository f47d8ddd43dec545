//! Preamble normalization.
//!
//! An assembled document must be able to render its figures at final
//! quality, whatever draft settings the source used.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

pub const GRAPHICX_FINAL: &str = "\\usepackage[final]{graphicx}";

static USE_PACKAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\(usepackage|RequirePackage)(?:\[([^\]]*)\])?\{([^}]*)\}")
        .expect("valid usepackage regex")
});

static CLASS_OPTIONS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\documentclass\[([^\]]*)\]").expect("valid documentclass regex")
});

fn loads_graphicx(packages: &str) -> bool {
    packages.split(',').any(|p| p.trim() == "graphicx")
}

/// Replaces a `draft` option with `final`. Returns `None` when the list has
/// no `draft` token.
pub fn finalize_options(options: &str) -> Option<String> {
    let tokens: Vec<&str> = options.split(',').map(str::trim).collect();
    if !tokens.contains(&"draft") {
        return None;
    }
    let has_final = tokens.contains(&"final");
    let mut rewritten: Vec<&str> = Vec::with_capacity(tokens.len());
    for token in tokens {
        match token {
            "draft" if has_final => {}
            "draft" => rewritten.push("final"),
            other => rewritten.push(other),
        }
    }
    Some(rewritten.join(","))
}

/// Normalizes a preamble for final-quality output.
///
/// - `\documentclass[...draft...]` becomes `final`;
/// - a graphicx inclusion with a `draft` option becomes `final`;
/// - without any graphicx inclusion, `\usepackage[final]{graphicx}` is
///   appended.
pub fn normalize_preamble(preamble: &str) -> String {
    let preamble = CLASS_OPTIONS.replace_all(preamble, |caps: &Captures<'_>| {
        match finalize_options(&caps[1]) {
            Some(options) => {
                log::debug!("Document class options [{}] -> [{}]", &caps[1], options);
                format!("\\documentclass[{}]", options)
            }
            None => caps[0].to_string(),
        }
    });

    let mut has_graphicx = false;
    let preamble = USE_PACKAGE.replace_all(&preamble, |caps: &Captures<'_>| {
        let packages = &caps[3];
        if !loads_graphicx(packages) {
            return caps[0].to_string();
        }
        has_graphicx = true;
        match caps.get(2).and_then(|options| finalize_options(options.as_str())) {
            Some(options) => format!("\\{}[{}]{{{}}}", &caps[1], options, packages),
            None => caps[0].to_string(),
        }
    });
    let mut preamble = preamble.into_owned();

    if !has_graphicx {
        if !preamble.is_empty() {
            preamble.push('\n');
        }
        preamble.push_str(GRAPHICX_FINAL);
    }
    preamble
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finalize_options() {
        assert_eq!(finalize_options("draft"), Some("final".to_string()));
        assert_eq!(finalize_options("a4paper, draft, 11pt"), Some("a4paper,final,11pt".to_string()));
        assert_eq!(finalize_options("draft,final"), Some("final".to_string()));
        assert_eq!(finalize_options("draftmode"), None);
        assert_eq!(finalize_options("11pt"), None);
    }

    #[test]
    fn test_appends_graphicx_when_missing() {
        let preamble = "\\documentclass{article}\n\\usepackage{amsmath}";
        assert_eq!(
            normalize_preamble(preamble),
            "\\documentclass{article}\n\\usepackage{amsmath}\n\\usepackage[final]{graphicx}"
        );
    }

    #[test]
    fn test_draft_graphicx_becomes_final() {
        let preamble = "\\documentclass{article}\n\\usepackage[draft]{graphicx}";
        let normalized = normalize_preamble(preamble);
        assert_eq!(normalized, "\\documentclass{article}\n\\usepackage[final]{graphicx}");
        assert_eq!(normalized.matches("graphicx").count(), 1);
    }

    #[test]
    fn test_plain_graphicx_untouched() {
        let preamble = "\\documentclass{article}\n\\usepackage{graphicx}";
        assert_eq!(normalize_preamble(preamble), preamble);
    }

    #[test]
    fn test_graphicx_in_package_list() {
        let preamble = "\\usepackage[draft]{xcolor, graphicx}";
        assert_eq!(normalize_preamble(preamble), "\\usepackage[final]{xcolor, graphicx}");
    }

    #[test]
    fn test_required_graphicx_counts_as_loaded() {
        let preamble = "\\RequirePackage{graphicx}\n\\documentclass{article}";
        assert_eq!(normalize_preamble(preamble), preamble);

        let draft = "\\RequirePackage[draft]{graphicx}";
        assert_eq!(normalize_preamble(draft), "\\RequirePackage[final]{graphicx}");
    }

    #[test]
    fn test_draft_document_class() {
        let preamble = "\\documentclass[draft,12pt]{report}";
        assert_eq!(
            normalize_preamble(preamble),
            "\\documentclass[final,12pt]{report}\n\\usepackage[final]{graphicx}"
        );
    }

    #[test]
    fn test_other_draft_packages_untouched() {
        let preamble = "\\usepackage[draft]{hyperref}\n\\usepackage{graphicx}";
        assert_eq!(normalize_preamble(preamble), preamble);
    }

    #[test]
    fn test_empty_preamble() {
        assert_eq!(normalize_preamble(""), GRAPHICX_FINAL);
    }
}
