//! Byte-stream adapters around external programs.
//!
//! [`run_pipeline`] chains child processes the way a shell pipe does: stage
//! N's stdout is stage N+1's stdin, the caller's reader feeds stage 0, and
//! the last stage's stdout is copied into the caller's writer. Aligners and
//! pileup tools are driven this way; their reference FASTA goes into a
//! [`Scratch`] directory because they want a real path.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{after, select};
use tempfile::TempDir;

use basepair_core::{BasepairError, Result, WriteTo};

use crate::context::Context;

/// How often child exit status is polled while waiting for cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A temporary directory for files a child process needs by path. Removed
/// with everything in it when dropped.
#[derive(Debug)]
pub struct Scratch {
    dir: TempDir,
}

impl Scratch {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::Builder::new().prefix("basepair-").tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `records` back to back into `name` and return its path.
    pub fn write_records<T: WriteTo>(&self, name: &str, records: &[T]) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        let mut file = io::BufWriter::new(std::fs::File::create(&path)?);
        for record in records {
            record.write_to(&mut file)?;
        }
        file.flush()?;
        Ok(path)
    }

    /// Copy `reader` into `name` and return its path.
    pub fn write_reader<R: Read>(&self, name: &str, mut reader: R) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        let mut file = std::fs::File::create(&path)?;
        io::copy(&mut reader, &mut file)?;
        Ok(path)
    }
}

struct Stage {
    program: String,
    child: Child,
    stderr: Option<thread::JoinHandle<String>>,
    status: Option<ExitStatus>,
}

fn describe(command: &Command) -> String {
    command.get_program().to_string_lossy().into_owned()
}

fn drain_stderr(stderr: Option<ChildStderr>) -> Option<thread::JoinHandle<String>> {
    stderr.map(|mut stderr| {
        thread::spawn(move || {
            let mut text = String::new();
            let _ = stderr.read_to_string(&mut text);
            text
        })
    })
}

fn kill_all(stages: &mut [Stage]) {
    for stage in stages.iter_mut().filter(|s| s.status.is_none()) {
        log::debug!("terminating {}", stage.program);
        let _ = stage.child.kill();
        stage.status = stage.child.wait().ok();
    }
}

/// Treat a closed pipe as the child choosing to stop reading.
fn ignore_broken_pipe(result: io::Result<u64>) -> io::Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        Err(e) => Err(e),
    }
}

fn spawn_all(commands: Vec<Command>) -> Result<Vec<Stage>> {
    let mut stages: Vec<Stage> = Vec::with_capacity(commands.len());
    for mut command in commands {
        let stdin = match stages.last_mut().and_then(|s| s.child.stdout.take()) {
            Some(previous) => Stdio::from(previous),
            None => Stdio::piped(),
        };
        command
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let program = describe(&command);
        match command.spawn() {
            Ok(mut child) => {
                log::debug!("started {program} (pid {})", child.id());
                let stderr = drain_stderr(child.stderr.take());
                stages.push(Stage {
                    program,
                    child,
                    stderr,
                    status: None,
                });
            }
            Err(e) => {
                kill_all(&mut stages);
                return Err(BasepairError::Process(format!("cannot start {program}: {e}")));
            }
        }
    }
    Ok(stages)
}

/// Run `commands` as a pipe, feeding `input` to the first and copying the
/// last one's output into `output`.
///
/// On cancellation every child still running is killed and `Cancelled` is
/// returned. A child exiting unsuccessfully is a [`BasepairError::Process`]
/// carrying its stderr. All pipes are closed before this returns.
pub fn run_pipeline<R, W>(ctx: &Context, commands: Vec<Command>, mut input: R, mut output: W) -> Result<()>
where
    R: Read + Send,
    W: Write + Send,
{
    if commands.is_empty() {
        return Err(BasepairError::InvalidInput("pipeline has no stages".into()));
    }
    ctx.check()?;
    let mut stages = spawn_all(commands)?;
    let stdin = stages[0].child.stdin.take();
    let last = stages.len() - 1;
    let stdout = stages[last].child.stdout.take();

    let (feed, drain, cancelled) = thread::scope(|scope| {
        let feeder = scope.spawn(move || match stdin {
            // Dropping the handle at the end closes the child's stdin.
            Some(mut stdin) => ignore_broken_pipe(io::copy(&mut input, &mut stdin)),
            None => Ok(()),
        });
        let drainer = scope.spawn(move || match stdout {
            Some(mut stdout) => io::copy(&mut stdout, &mut output).and_then(|_| output.flush()),
            None => Ok(()),
        });

        let mut cancelled = false;
        while stages.iter().any(|s| s.status.is_none()) {
            for stage in stages.iter_mut().filter(|s| s.status.is_none()) {
                match stage.child.try_wait() {
                    Ok(Some(status)) => {
                        log::debug!("{} exited with {status}", stage.program);
                        stage.status = Some(status);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        log::warn!("cannot poll {}: {e}", stage.program);
                        cancelled = true;
                    }
                }
            }
            if cancelled {
                kill_all(&mut stages);
                break;
            }
            select! {
                recv(ctx.done()) -> _ => {
                    log::info!("pipeline cancelled, terminating children");
                    cancelled = true;
                    kill_all(&mut stages);
                }
                recv(after(POLL_INTERVAL)) -> _ => {}
            }
        }

        let feed = feeder.join();
        let drain = drainer.join();
        (feed, drain, cancelled)
    });

    if cancelled {
        ctx.check()?;
    }
    for stage in &mut stages {
        let stderr = stage.stderr.take().and_then(|h| h.join().ok()).unwrap_or_default();
        match stage.status {
            Some(status) if status.success() => {}
            Some(status) => {
                return Err(BasepairError::Process(format!(
                    "{} exited with {status}: {}",
                    stage.program,
                    stderr.trim()
                )));
            }
            None => {
                return Err(BasepairError::Process(format!("{} did not exit cleanly", stage.program)));
            }
        }
    }

    let panicked = |what: &str| BasepairError::Invariant(format!("{what} thread panicked"));
    feed.map_err(|_| panicked("stdin feeder"))??;
    drain.map_err(|_| panicked("stdout drainer"))??;
    Ok(())
}
