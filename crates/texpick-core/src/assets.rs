//! Image relocation.
//!
//! The [`AssetResolver`] finds the images referenced by a block of LaTeX,
//! copies them into `<output_dir>/images/` and rewrites the references so the
//! assembled document compiles from its own directory.
//!
//! Three reference shapes are recognized:
//!
//! - `\includegraphics[options]{path}` (options optional)
//! - `\graphicspath{{dir/}{other/}}`
//! - `\figure{path}`
//!
//! A reference that cannot be resolved is left exactly as written. Missing
//! images never abort assembly.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the image directory created next to the assembled document.
pub const IMAGES_DIR: &str = "images";

/// Extensions tried, in order, for references written without one.
pub const IMAGE_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg", "eps"];

static INCLUDE_GRAPHICS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\includegraphics(?:\[[^\]]*\])?\{([^}]*)\}").expect("valid includegraphics regex")
});

static GRAPHICS_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\graphicspath\{((?:\s*\{[^}]*\})+)\s*\}").expect("valid graphicspath regex")
});

static FIGURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\figure\{([^}]*)\}").expect("valid figure regex"));

static BRACED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^}]*)\}").expect("valid group regex"));

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to create image directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image has no file name: {0}")]
    NoFileName(PathBuf),
}

/// Locates, copies and rewrites image references.
///
/// One resolver is meant to serve one assembled document: it remembers which
/// files it already copied and which `\graphicspath` directories it has seen.
#[derive(Debug)]
pub struct AssetResolver {
    source_dir: PathBuf,
    output_dir: PathBuf,
    search_dirs: Vec<PathBuf>,
    /// Resolved source file -> reference written into the output.
    copied: BTreeMap<PathBuf, String>,
}

impl AssetResolver {
    pub fn new(source_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            output_dir: output_dir.into(),
            search_dirs: Vec::new(),
            copied: BTreeMap::new(),
        }
    }

    pub fn images_dir(&self) -> PathBuf {
        self.output_dir.join(IMAGES_DIR)
    }

    /// Extra directories searched for relative references, in order.
    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Source files copied so far.
    pub fn copied(&self) -> Vec<PathBuf> {
        self.copied.keys().cloned().collect()
    }

    /// Rewrites every resolvable image reference in `text`.
    ///
    /// `\graphicspath` declarations are handled first so the directories they
    /// name are searched for the includes that follow.
    pub fn relocate(&mut self, text: &str) -> String {
        let text = GRAPHICS_PATH
            .replace_all(text, |caps: &Captures<'_>| self.rewrite_graphics_path(caps))
            .into_owned();

        let text = INCLUDE_GRAPHICS
            .replace_all(&text, |caps: &Captures<'_>| match self.relocate_reference(&caps[1]) {
                Some(target) => format!("\\includegraphics[width=\\textwidth]{{{}}}", target),
                None => caps[0].to_string(),
            })
            .into_owned();

        FIGURE
            .replace_all(&text, |caps: &Captures<'_>| match self.relocate_reference(&caps[1]) {
                Some(target) => format!("\\figure{{{}}}", target),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    fn rewrite_graphics_path(&mut self, caps: &Captures<'_>) -> String {
        let mut found = false;
        for entry in BRACED.captures_iter(&caps[1]) {
            let dir = entry[1].trim();
            if dir.is_empty() {
                continue;
            }
            let resolved = self.source_dir.join(dir);
            if resolved.is_dir() {
                log::debug!("Adding graphics search directory {}", resolved.display());
                if !self.search_dirs.contains(&resolved) {
                    self.search_dirs.push(resolved);
                }
                found = true;
            } else {
                log::warn!("Graphics path {} does not exist", resolved.display());
            }
        }
        if found {
            format!("\\graphicspath{{{{{}/}}}}", IMAGES_DIR)
        } else {
            caps[0].to_string()
        }
    }

    /// Resolves, copies and returns the new reference for one image path.
    fn relocate_reference(&mut self, reference: &str) -> Option<String> {
        let Some(source) = self.resolve(reference) else {
            log::warn!("Image {} not found; reference left unchanged", reference.trim());
            return None;
        };
        match self.import(&source) {
            Ok(target) => Some(target),
            Err(e) => {
                log::warn!("{}", e);
                None
            }
        }
    }

    /// Finds the file a reference points at, if it exists.
    pub fn resolve(&self, reference: &str) -> Option<PathBuf> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        let path = Path::new(reference);
        let candidates: Vec<PathBuf> = if path.is_absolute() {
            vec![path.to_path_buf()]
        } else {
            std::iter::once(&self.source_dir)
                .chain(self.search_dirs.iter())
                .map(|dir| dir.join(path))
                .collect()
        };

        for candidate in candidates {
            if candidate.is_file() {
                return Some(candidate);
            }
            if candidate.extension().is_none() {
                for ext in IMAGE_EXTENSIONS {
                    let with_ext = candidate.with_extension(ext);
                    if with_ext.is_file() {
                        return Some(with_ext);
                    }
                }
            }
        }
        None
    }

    /// Copies `source` into the image directory. Files sharing a basename
    /// overwrite each other.
    fn import(&mut self, source: &Path) -> Result<String, AssetError> {
        if let Some(target) = self.copied.get(source) {
            return Ok(target.clone());
        }
        let name = source
            .file_name()
            .ok_or_else(|| AssetError::NoFileName(source.to_path_buf()))?;

        let images_dir = self.images_dir();
        fs::create_dir_all(&images_dir).map_err(|e| AssetError::CreateDir {
            path: images_dir.clone(),
            source: e,
        })?;

        let destination = images_dir.join(name);
        fs::copy(source, &destination).map_err(|e| AssetError::Copy {
            from: source.to_path_buf(),
            to: destination.clone(),
            source: e,
        })?;
        log::info!("Copied {} -> {}", source.display(), destination.display());

        let target = format!("{}/{}", IMAGES_DIR, name.to_string_lossy());
        self.copied.insert(source.to_path_buf(), target.clone());
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let root = tempfile::tempdir().unwrap();
        let src = root.path().join("src");
        let out = root.path().join("out");
        fs::create_dir_all(src.join("figs")).unwrap();
        fs::create_dir_all(&out).unwrap();
        fs::write(src.join("fig.png"), b"png").unwrap();
        fs::write(src.join("figs").join("plot.pdf"), b"pdf").unwrap();
        (root, src, out)
    }

    #[test]
    fn test_include_rewritten_and_copied() {
        let (_root, src, out) = fixture();
        let mut resolver = AssetResolver::new(&src, &out);

        let text = resolver.relocate(r"\includegraphics[width=2cm]{fig.png}");

        assert_eq!(text, r"\includegraphics[width=\textwidth]{images/fig.png}");
        assert_eq!(fs::read(out.join("images").join("fig.png")).unwrap(), b"png");
    }

    #[test]
    fn test_include_without_options() {
        let (_root, src, out) = fixture();
        let mut resolver = AssetResolver::new(&src, &out);
        let text = resolver.relocate(r"\includegraphics{fig.png}");
        assert_eq!(text, r"\includegraphics[width=\textwidth]{images/fig.png}");
    }

    #[test]
    fn test_missing_image_left_unchanged() {
        let (_root, src, out) = fixture();
        let mut resolver = AssetResolver::new(&src, &out);
        let input = r"\includegraphics[scale=0.5]{missing.png}";
        assert_eq!(resolver.relocate(input), input);
        assert!(!out.join("images").exists());
    }

    #[test]
    fn test_extension_probing() {
        let (_root, src, out) = fixture();
        let mut resolver = AssetResolver::new(&src, &out);
        let text = resolver.relocate(r"\includegraphics{fig}");
        assert_eq!(text, r"\includegraphics[width=\textwidth]{images/fig.png}");
    }

    #[test]
    fn test_graphicspath_enables_search() {
        let (_root, src, out) = fixture();
        let mut resolver = AssetResolver::new(&src, &out);
        let text = resolver.relocate("\\graphicspath{{figs/}{nowhere/}}\n\\includegraphics{plot}");
        assert_eq!(
            text,
            "\\graphicspath{{images/}}\n\\includegraphics[width=\\textwidth]{images/plot.pdf}"
        );
        assert!(out.join("images").join("plot.pdf").is_file());
        assert_eq!(resolver.search_dirs(), &[src.join("figs/")]);
    }

    #[test]
    fn test_graphicspath_without_existing_dirs_is_kept() {
        let (_root, src, out) = fixture();
        let mut resolver = AssetResolver::new(&src, &out);
        let input = "\\graphicspath{{gone/}}";
        assert_eq!(resolver.relocate(input), input);
    }

    #[test]
    fn test_figure_shape() {
        let (_root, src, out) = fixture();
        let mut resolver = AssetResolver::new(&src, &out);
        assert_eq!(resolver.relocate(r"\figure{figs/plot.pdf}"), r"\figure{images/plot.pdf}");
    }

    #[test]
    fn test_absolute_reference() {
        let (_root, src, out) = fixture();
        let absolute = src.join("fig.png");
        let mut resolver = AssetResolver::new("/nonexistent", &out);
        let text = resolver.relocate(&format!("\\includegraphics{{{}}}", absolute.display()));
        assert_eq!(text, r"\includegraphics[width=\textwidth]{images/fig.png}");
    }

    #[test]
    fn test_each_file_copied_once() {
        let (_root, src, out) = fixture();
        let mut resolver = AssetResolver::new(&src, &out);
        resolver.relocate(r"\includegraphics{fig.png} \includegraphics[angle=90]{fig.png}");
        assert_eq!(resolver.copied(), vec![src.join("fig.png")]);
    }

    #[test]
    fn test_basename_collision_last_reference_wins() {
        let (_root, src, out) = fixture();
        fs::create_dir_all(src.join("a")).unwrap();
        fs::create_dir_all(src.join("b")).unwrap();
        fs::write(src.join("a").join("fig.png"), b"first").unwrap();
        fs::write(src.join("b").join("fig.png"), b"second").unwrap();
        let mut resolver = AssetResolver::new(&src, &out);

        let text = resolver.relocate(r"\includegraphics{a/fig.png} \includegraphics{b/fig.png}");

        assert_eq!(
            text,
            r"\includegraphics[width=\textwidth]{images/fig.png} \includegraphics[width=\textwidth]{images/fig.png}"
        );
        assert_eq!(fs::read(out.join("images").join("fig.png")).unwrap(), b"second");
        assert_eq!(
            resolver.copied(),
            vec![src.join("a").join("fig.png"), src.join("b").join("fig.png")]
        );
    }
}
