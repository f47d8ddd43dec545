use crate::compiler::{CommandExecutor, Compiler, Pass, RealCommandExecutor};
use crate::events::{BuildEvent, Notifier};
use crate::{BuildConfig, BuildError, CompilationResult};
use crossbeam_channel::Receiver;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use texpick_log::{LogClassifier, read_log};

/// Runs the pass schedule for a `.tex` file.
///
/// The file's directory is both the working directory of the engine and its
/// output directory.
#[derive(Debug, Clone)]
pub struct CompilationDriver {
    config: BuildConfig,
    executor: Arc<dyn CommandExecutor>,
    in_flight: Arc<Mutex<HashSet<PathBuf>>>,
}

impl CompilationDriver {
    pub fn new(config: BuildConfig) -> Self {
        Self::with_executor(config, Arc::new(RealCommandExecutor))
    }

    pub fn with_executor(config: BuildConfig, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            config,
            executor,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    fn in_flight(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_running(&self, tex_path: &Path) -> bool {
        self.in_flight().contains(&in_flight_key(tex_path))
    }

    /// Compiles on a new worker thread.
    ///
    /// Fails with [`BuildError::AlreadyRunning`] while another compilation of
    /// the same file is in progress on this driver or one of its clones.
    pub fn spawn(&self, tex_path: impl Into<PathBuf>) -> Result<CompilationHandle, BuildError> {
        let tex_path = tex_path.into();
        let key = in_flight_key(&tex_path);
        if !self.in_flight().insert(key.clone()) {
            return Err(BuildError::AlreadyRunning(tex_path));
        }
        let guard = InFlightGuard {
            in_flight: self.in_flight.clone(),
            key,
        };

        let (sender, events) = crossbeam_channel::unbounded();
        let driver = self.clone();
        let input = tex_path.clone();
        let worker = thread::Builder::new()
            .name("texpick-build".to_string())
            .spawn(move || {
                let _guard = guard;
                let mut notifier = Notifier::new(sender);
                driver.compile(&input, &mut notifier)
            })
            .map_err(|source| BuildError::Io {
                path: tex_path,
                source,
            })?;

        Ok(CompilationHandle { events, worker })
    }

    /// Compiles on the calling thread, reporting through `notifier`.
    ///
    /// Every failure ends up in the returned result.
    pub fn compile(&self, tex_path: &Path, notifier: &mut Notifier) -> CompilationResult {
        let result = match self.run_schedule(tex_path, notifier) {
            Ok(result) => result,
            Err(err) => {
                log::warn!("Compilation of {} failed: {}", tex_path.display(), err);
                CompilationResult::failure(err.to_string())
            }
        };

        if result.succeeded {
            notifier.status(format!("PDF generated successfully: {}", result.message));
        } else {
            notifier.status(format!("Error during compilation: {}", result.message));
        }
        notifier.finished(result.succeeded, result.message.clone());
        result
    }

    fn run_schedule(
        &self,
        tex_path: &Path,
        notifier: &mut Notifier,
    ) -> Result<CompilationResult, BuildError> {
        self.config.validate()?;
        let tex_path = std::path::absolute(tex_path).map_err(|source| BuildError::Io {
            path: tex_path.to_path_buf(),
            source,
        })?;
        let working_dir = match tex_path.parent() {
            Some(dir) => dir.to_path_buf(),
            None => PathBuf::from("."),
        };

        notifier.status("Preparing output directory...");
        notifier.progress(10);
        fs::create_dir_all(&working_dir).map_err(|source| BuildError::Io {
            path: working_dir.clone(),
            source,
        })?;

        let program = self
            .executor
            .locate(&self.config.engine)
            .ok_or_else(|| BuildError::EngineNotFound(self.config.engine.clone()))?;
        let compiler = Compiler::new(&self.config.engine, working_dir.clone())
            .with_args(self.config.extra_args.clone());
        let passes = self.config.passes();

        // Outputs of an earlier build must not pass for this one's.
        remove_stale(&compiler.pdf_path(&tex_path))?;
        remove_stale(&compiler.log_path(&tex_path))?;

        notifier.status("Running first compilation pass...");
        notifier.progress(20);
        let first = if passes == 1 { Pass::Single } else { Pass::Check };
        self.run_pass(&program, &compiler, first, &tex_path)?;

        let raw_log = match read_log(compiler.log_path(&tex_path)) {
            Ok(text) => text,
            Err(err) => {
                log::debug!("{}", err);
                String::new()
            }
        };
        let errors = LogClassifier::new()
            .skip_auxiliary_missing(self.config.skip_auxiliary_missing)
            .messages(&raw_log);
        if !errors.is_empty() {
            let message = format!("LaTeX Errors Found:\n{}", errors.join("\n"));
            return Ok(CompilationResult {
                succeeded: false,
                artifact: None,
                errors,
                raw_log,
                message,
            });
        }

        if passes > 1 {
            notifier.progress(40);
            notifier.status("Generating PDF...");
            let full_passes = passes - 1;
            for n in 1..=full_passes {
                if n == full_passes && full_passes > 1 {
                    notifier.status("Finalizing references...");
                }
                self.run_pass(&program, &compiler, Pass::Full, &tex_path)?;
                if n == 1 {
                    notifier.progress(80);
                }
            }
        } else {
            notifier.progress(80);
        }

        let pdf = compiler.pdf_path(&tex_path);
        match fs::metadata(&pdf) {
            Ok(meta) if meta.len() > 0 => {
                notifier.progress(100);
                Ok(CompilationResult::success(pdf, raw_log))
            }
            _ => Ok(CompilationResult {
                raw_log,
                ..CompilationResult::failure("PDF file was not generated successfully")
            }),
        }
    }

    fn run_pass(
        &self,
        program: &Path,
        compiler: &Compiler,
        pass: Pass,
        tex_path: &Path,
    ) -> Result<(), BuildError> {
        let args = compiler.args(pass, tex_path);
        log::info!("Running {} ({:?} pass)", program.display(), pass);
        log::debug!("Arguments: {:?}", args);

        let output = self
            .executor
            .execute(program, &args, &compiler.output_dir)
            .map_err(|source| BuildError::Spawn {
                program: program.to_path_buf(),
                source,
            })?;

        if !output.status.success() {
            log::debug!("{} exited with {}", program.display(), output.status);
        }
        log::debug!("stdout:\n{}", String::from_utf8_lossy(&output.stdout));
        log::debug!("stderr:\n{}", String::from_utf8_lossy(&output.stderr));
        Ok(())
    }
}

fn remove_stale(path: &Path) -> Result<(), BuildError> {
    match fs::remove_file(path) {
        Ok(()) => {
            log::debug!("Removed stale {}", path.display());
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(BuildError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn in_flight_key(tex_path: &Path) -> PathBuf {
    std::path::absolute(tex_path).unwrap_or_else(|_| tex_path.to_path_buf())
}

/// Clears the in-flight entry when the worker ends, panics included.
struct InFlightGuard {
    in_flight: Arc<Mutex<HashSet<PathBuf>>>,
    key: PathBuf,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.key);
    }
}

/// A compilation running on a worker thread.
#[derive(Debug)]
pub struct CompilationHandle {
    events: Receiver<BuildEvent>,
    worker: JoinHandle<CompilationResult>,
}

impl CompilationHandle {
    /// Events in emission order. The channel closes when the worker ends.
    pub fn events(&self) -> &Receiver<BuildEvent> {
        &self.events
    }

    pub fn join(self) -> CompilationResult {
        match self.worker.join() {
            Ok(result) => result,
            Err(_) => CompilationResult::failure("compilation worker panicked"),
        }
    }
}
