use std::fmt::Debug;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

/// The kind of engine invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Halts on the first error and writes no PDF. Used to catch structural
    /// errors cheaply before the full passes.
    Check,
    /// Produces the PDF; errors do not halt the run.
    Full,
    /// Single-pass schedule: halts on error and produces the PDF.
    Single,
}

/// A Compiler holds the configuration for executing an external TeX engine.
#[derive(Debug, Clone)]
pub struct Compiler {
    pub engine: String, // e.g., "pdflatex", "xelatex", "/opt/tex/bin/pdflatex"
    pub output_dir: PathBuf,
    pub extra_args: Vec<String>,
}

impl Compiler {
    pub fn new(engine: &str, output_dir: PathBuf) -> Self {
        Self {
            engine: engine.to_string(),
            output_dir,
            extra_args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// pdfTeX suppresses PDF output with `-draftmode`; XeTeX uses `-no-pdf`.
    fn no_pdf_flag(&self) -> &'static str {
        let name = Path::new(&self.engine)
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if name.starts_with("xe") {
            "-no-pdf"
        } else {
            "-draftmode"
        }
    }

    /// Command-line arguments for one pass over `tex_path`.
    pub fn args(&self, pass: Pass, tex_path: &Path) -> Vec<String> {
        let mut args = vec![
            "-interaction=nonstopmode".to_string(),
            "-file-line-error".to_string(),
        ];
        match pass {
            Pass::Check => {
                args.push("-halt-on-error".to_string());
                args.push(self.no_pdf_flag().to_string());
            }
            Pass::Single => args.push("-halt-on-error".to_string()),
            Pass::Full => {}
        }
        args.push(format!("-output-directory={}", self.output_dir.display()));
        args.extend(self.extra_args.iter().cloned());
        args.push(tex_path.to_string_lossy().to_string());
        args
    }

    /// `<output_dir>/<stem>.<extension>` for the given input file.
    pub fn output_file(&self, tex_path: &Path, extension: &str) -> PathBuf {
        let stem = tex_path.file_stem().unwrap_or_default().to_string_lossy();
        self.output_dir.join(format!("{}.{}", stem, extension))
    }

    pub fn log_path(&self, tex_path: &Path) -> PathBuf {
        self.output_file(tex_path, "log")
    }

    pub fn pdf_path(&self, tex_path: &Path) -> PathBuf {
        self.output_file(tex_path, "pdf")
    }
}

/// Trait for executing system commands.
/// This allows us to substitute a fake engine in tests.
pub trait CommandExecutor: Send + Sync + Debug {
    /// Finds the executable for `program`, searching `PATH` for bare names.
    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }

    /// Runs `program` to completion in `working_dir` with stdout and stderr
    /// captured.
    fn execute(&self, program: &Path, args: &[String], working_dir: &Path) -> io::Result<Output>;
}

/// Default implementation of [`CommandExecutor`] using `std::process::Command`.
#[derive(Debug, Default)]
pub struct RealCommandExecutor;

impl CommandExecutor for RealCommandExecutor {
    fn execute(&self, program: &Path, args: &[String], working_dir: &Path) -> io::Result<Output> {
        Command::new(program)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .output()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_pass_args() {
        let compiler = Compiler::new("pdflatex", PathBuf::from("/out"));
        let args = compiler.args(Pass::Check, Path::new("/out/report.tex"));
        assert_eq!(
            args,
            vec![
                "-interaction=nonstopmode",
                "-file-line-error",
                "-halt-on-error",
                "-draftmode",
                "-output-directory=/out",
                "/out/report.tex",
            ]
        );
    }

    #[test]
    fn test_full_pass_args() {
        let compiler = Compiler::new("pdflatex", PathBuf::from("/out"))
            .with_args(vec!["-synctex=1".to_string()]);
        let args = compiler.args(Pass::Full, Path::new("/out/report.tex"));
        assert!(!args.iter().any(|a| a == "-halt-on-error" || a == "-draftmode"));
        assert_eq!(args[args.len() - 2], "-synctex=1");
        assert_eq!(args.last().map(String::as_str), Some("/out/report.tex"));
    }

    #[test]
    fn test_xelatex_uses_no_pdf() {
        let compiler = Compiler::new("/usr/bin/xelatex", PathBuf::from("/out"));
        let args = compiler.args(Pass::Check, Path::new("a.tex"));
        assert!(args.contains(&"-no-pdf".to_string()));
    }

    #[test]
    fn test_single_pass_halts_and_writes_pdf() {
        let compiler = Compiler::new("pdflatex", PathBuf::from("/out"));
        let args = compiler.args(Pass::Single, Path::new("a.tex"));
        assert!(args.contains(&"-halt-on-error".to_string()));
        assert!(!args.contains(&"-draftmode".to_string()));
    }

    #[test]
    fn test_artifact_paths() {
        let compiler = Compiler::new("pdflatex", PathBuf::from("/build"));
        assert_eq!(compiler.log_path(Path::new("/src/custom_report.tex")), PathBuf::from("/build/custom_report.log"));
        assert_eq!(compiler.pdf_path(Path::new("notes.v2.tex")), PathBuf::from("/build/notes.v2.pdf"));
    }
}
