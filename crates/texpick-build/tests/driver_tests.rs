use crossbeam_channel::Receiver;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::sync::{Arc, Mutex};
use texpick_build::{BuildConfig, BuildError, BuildEvent, CommandExecutor, CompilationDriver, Notifier};

fn exit_status(code: i32) -> ExitStatus {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        ExitStatus::from_raw(code << 8)
    }
    #[cfg(windows)]
    {
        use std::os::windows::process::ExitStatusExt;
        ExitStatus::from_raw(code as u32)
    }
}

/// Stands in for pdflatex: writes the configured log, and a PDF unless the
/// invocation is a draft pass or `writes_pdf` is off.
#[derive(Debug, Default)]
struct FakeEngine {
    log: String,
    pdf: Vec<u8>,
    calls: Mutex<Vec<(Vec<String>, PathBuf)>>,
    gate: Option<Mutex<Receiver<()>>>,
    writes_pdf: bool,
}

impl FakeEngine {
    fn new(log: &str, pdf: &[u8]) -> Self {
        Self {
            log: log.to_string(),
            pdf: pdf.to_vec(),
            writes_pdf: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<(Vec<String>, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandExecutor for FakeEngine {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        Some(PathBuf::from("/usr/bin").join(program))
    }

    fn execute(&self, _program: &Path, args: &[String], working_dir: &Path) -> io::Result<Output> {
        if let Some(gate) = &self.gate {
            let _ = gate.lock().unwrap().recv();
        }
        self.calls
            .lock()
            .unwrap()
            .push((args.to_vec(), working_dir.to_path_buf()));

        let out_dir = args
            .iter()
            .find_map(|a| a.strip_prefix("-output-directory="))
            .map(PathBuf::from)
            .unwrap();
        let input = PathBuf::from(args.last().unwrap());
        let stem = input.file_stem().unwrap().to_string_lossy().to_string();

        fs::write(out_dir.join(format!("{}.log", stem)), &self.log)?;
        if self.writes_pdf && !args.iter().any(|a| a == "-draftmode") {
            fs::write(out_dir.join(format!("{}.pdf", stem)), &self.pdf)?;
        }
        Ok(Output {
            status: exit_status(0),
            stdout: b"This is pdfTeX".to_vec(),
            stderr: Vec::new(),
        })
    }
}

fn source(dir: &Path) -> PathBuf {
    let tex = dir.join("custom_report.tex");
    fs::write(&tex, "\\documentclass{article}\n\\begin{document}\nHi\n\\end{document}\n").unwrap();
    tex
}

fn compile(engine: Arc<FakeEngine>, config: BuildConfig, tex: &Path) -> (texpick_build::CompilationResult, Vec<BuildEvent>) {
    let driver = CompilationDriver::with_executor(config, engine);
    let (tx, rx) = crossbeam_channel::unbounded();
    let result = driver.compile(tex, &mut Notifier::new(tx));
    (result, rx.try_iter().collect())
}

fn progress(events: &[BuildEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            BuildEvent::Progress(p) => Some(*p),
            _ => None,
        })
        .collect()
}

#[test]
fn test_successful_three_pass_build() {
    let dir = tempfile::tempdir().unwrap();
    let tex = source(dir.path());
    let engine = Arc::new(FakeEngine::new("This is pdfTeX\nOutput written.\n", b"%PDF-1.5"));

    let (result, events) = compile(engine.clone(), BuildConfig::default(), &tex);

    assert!(result.succeeded, "{}", result.message);
    let pdf = std::path::absolute(dir.path().join("custom_report.pdf")).unwrap();
    assert_eq!(result.artifact.as_deref(), Some(pdf.as_path()));
    assert!(result.errors.is_empty());
    assert!(result.raw_log.contains("Output written"));

    let calls = engine.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[0].0.contains(&"-halt-on-error".to_string()));
    assert!(calls[0].0.contains(&"-draftmode".to_string()));
    for (args, _) in &calls[1..] {
        assert!(!args.contains(&"-halt-on-error".to_string()));
        assert!(!args.contains(&"-draftmode".to_string()));
    }
    let working_dir = std::path::absolute(dir.path()).unwrap();
    assert!(calls.iter().all(|(_, wd)| *wd == working_dir));

    assert_eq!(progress(&events), vec![10, 20, 40, 80, 100]);
    assert!(events.contains(&BuildEvent::Status("Finalizing references...".to_string())));
    assert_eq!(
        events.last(),
        Some(&BuildEvent::Finished {
            success: true,
            message: pdf.display().to_string(),
        })
    );
}

#[test]
fn test_latex_error_fails_after_first_pass() {
    let dir = tempfile::tempdir().unwrap();
    let tex = source(dir.path());
    let engine = Arc::new(FakeEngine::new(
        "(./custom_report.tex\n! LaTeX Error: File not found\n",
        b"%PDF",
    ));

    let (result, events) = compile(engine.clone(), BuildConfig::default(), &tex);

    assert!(!result.succeeded);
    assert!(result.artifact.is_none());
    assert_eq!(result.errors, vec!["LaTeX Error: File not found"]);
    assert_eq!(result.message, "LaTeX Errors Found:\nLaTeX Error: File not found");
    assert_eq!(engine.calls().len(), 1);
    assert_eq!(progress(&events), vec![10, 20]);
    assert!(matches!(
        events.last(),
        Some(BuildEvent::Finished { success: false, .. })
    ));
}

#[test]
fn test_empty_pdf_is_a_failure() {
    let dir = tempfile::tempdir().unwrap();
    let tex = source(dir.path());
    let engine = Arc::new(FakeEngine::new("clean\n", b""));

    let (result, events) = compile(engine, BuildConfig::default(), &tex);

    assert!(!result.succeeded);
    assert!(result.artifact.is_none());
    assert_eq!(result.message, "PDF file was not generated successfully");
    assert_eq!(progress(&events), vec![10, 20, 40, 80]);
}

#[test]
fn test_auxiliary_missing_files_fail_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let tex = source(dir.path());
    let log = "No file custom_report.aux.\nNo file custom_report.toc.\n";

    let engine = Arc::new(FakeEngine::new(log, b"%PDF"));
    let (result, _) = compile(engine, BuildConfig::default(), &tex);
    assert!(!result.succeeded);
    assert_eq!(
        result.errors,
        vec![
            "Missing File: custom_report.aux.",
            "Missing File: custom_report.toc.",
        ]
    );

    let lenient = BuildConfig {
        skip_auxiliary_missing: true,
        ..BuildConfig::default()
    };
    let engine = Arc::new(FakeEngine::new(log, b"%PDF"));
    let (result, _) = compile(engine, lenient, &tex);
    assert!(result.succeeded);
    assert!(result.errors.is_empty());
}

#[test]
fn test_pdf_from_previous_build_is_not_reused() {
    let dir = tempfile::tempdir().unwrap();
    let tex = source(dir.path());
    fs::write(dir.path().join("custom_report.pdf"), b"%PDF-old").unwrap();
    fs::write(dir.path().join("custom_report.log"), "! LaTeX Error: old run\n").unwrap();
    let engine = Arc::new(FakeEngine {
        writes_pdf: false,
        ..FakeEngine::new(
            "! Paragraph ended before \\foo was complete.\n==> Fatal error occurred, no output PDF file produced!\n",
            b"",
        )
    });

    let (result, _) = compile(engine, BuildConfig::default(), &tex);

    assert!(!result.succeeded);
    assert!(result.artifact.is_none());
    assert_eq!(result.message, "PDF file was not generated successfully");
    assert!(!result.raw_log.contains("old run"));
    assert!(!dir.path().join("custom_report.pdf").exists());
}

#[test]
fn test_single_pass_schedule() {
    let dir = tempfile::tempdir().unwrap();
    let tex = source(dir.path());
    let engine = Arc::new(FakeEngine::new("ok\n", b"%PDF"));
    let config = BuildConfig {
        passes: 1,
        ..BuildConfig::default()
    };

    let (result, events) = compile(engine.clone(), config, &tex);

    assert!(result.succeeded);
    let calls = engine.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].0.contains(&"-halt-on-error".to_string()));
    assert!(!calls[0].0.contains(&"-draftmode".to_string()));
    assert_eq!(progress(&events), vec![10, 20, 80, 100]);
}

#[test]
fn test_two_passes_skip_finalizing_status() {
    let dir = tempfile::tempdir().unwrap();
    let tex = source(dir.path());
    let engine = Arc::new(FakeEngine::new("ok\n", b"%PDF"));
    let config = BuildConfig {
        passes: 2,
        ..BuildConfig::default()
    };

    let (result, events) = compile(engine.clone(), config, &tex);

    assert!(result.succeeded);
    assert_eq!(engine.calls().len(), 2);
    assert!(!events.contains(&BuildEvent::Status("Finalizing references...".to_string())));
}

#[test]
fn test_spawned_build_streams_events() {
    let dir = tempfile::tempdir().unwrap();
    let tex = source(dir.path());
    let engine = Arc::new(FakeEngine::new("ok\n", b"%PDF"));
    let driver = CompilationDriver::with_executor(BuildConfig::default(), engine);

    let handle = driver.spawn(&tex).unwrap();
    let events: Vec<BuildEvent> = handle.events().iter().collect();
    let result = handle.join();

    assert!(result.succeeded);
    assert_eq!(events.first(), Some(&BuildEvent::Status("Preparing output directory...".to_string())));
    assert!(matches!(events.last(), Some(BuildEvent::Finished { success: true, .. })));
}

#[test]
fn test_second_spawn_for_same_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let tex = source(dir.path());
    let (open, gate) = crossbeam_channel::unbounded();
    let engine = Arc::new(FakeEngine {
        gate: Some(Mutex::new(gate)),
        ..FakeEngine::new("ok\n", b"%PDF")
    });
    let driver = CompilationDriver::with_executor(BuildConfig::default(), engine);

    let first = driver.spawn(&tex).unwrap();
    assert!(driver.is_running(&tex));
    assert!(matches!(driver.spawn(&tex), Err(BuildError::AlreadyRunning(_))));
    assert!(matches!(
        driver.clone().spawn(&tex),
        Err(BuildError::AlreadyRunning(_))
    ));

    drop(open);
    assert!(first.join().succeeded);
    assert!(!driver.is_running(&tex));
    assert!(driver.spawn(&tex).unwrap().join().succeeded);
}
