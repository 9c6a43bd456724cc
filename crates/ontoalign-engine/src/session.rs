//! A live matching-engine process and its command protocol.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use tracing::debug;

use ontoalign_core::{AlignError, Result};

use crate::driver::EngineConfig;

/// Line the engine prints once it is ready to accept commands.
const ACTIVATION_BANNER: &str = "matcha cli activated";

/// How long the waiter sleeps on the queue between liveness checks.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One running engine process.
///
/// A dedicated reader thread drains the process's stdout into a channel so
/// the command-waiting logic never blocks the reader; the two sides
/// synchronize only through that channel. The child is killed when the
/// session drops, on success and error paths alike.
pub struct EngineSession {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<String>,
    reader: Option<JoinHandle<()>>,
    log: std::fs::File,
    log_path: PathBuf,
}

impl EngineSession {
    /// Spawn the engine for one ontology pair and block until its
    /// activation banner appears.
    ///
    /// The child runs with the engine's install directory as its working
    /// directory (scoped to this process only); stderr goes straight to the
    /// engine log file.
    pub fn spawn(
        config: &EngineConfig,
        source: &Path,
        target: &Path,
        log_path: &Path,
    ) -> Result<Self> {
        let log = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        let mut child = Command::new(&config.java_path)
            .arg(format!("-Xmx{}", config.max_heap))
            .arg("-jar")
            .arg(&config.jar_path)
            .arg(source)
            .arg(target)
            .current_dir(&config.install_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::from(log.try_clone()?))
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| std::io::Error::other("engine stdin was not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("engine stdout was not captured"))?;

        let (tx, rx) = unbounded();
        let reader = std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });

        let mut session = Self {
            child,
            stdin,
            lines: rx,
            reader: Some(reader),
            log,
            log_path: log_path.to_path_buf(),
        };
        session.wait_for(ACTIVATION_BANNER)?;
        Ok(session)
    }

    /// Step 1: select the matchers whose scores the engine will compute.
    pub fn set_matchers(&mut self, matchers: &[String]) -> Result<()> {
        self.command(
            &format!("Matchers {{{}}}", matchers.join(", ")),
            "matchers set",
        )
    }

    /// Step 2: run matching above `threshold`, writing the candidates file.
    pub fn match_ontologies(&mut self, threshold: f64, candidates: &Path) -> Result<()> {
        self.command(
            &format!("Match {threshold} {}", candidates.display()),
            "finished matching",
        )
    }

    /// Step 3: generate `cardinality` negatives per reference source.
    pub fn generate_negatives(
        &mut self,
        reference: &Path,
        negatives: &Path,
        cardinality: usize,
    ) -> Result<()> {
        self.command(
            &format!(
                "Negatives {} {} {cardinality}",
                reference.display(),
                negatives.display()
            ),
            "finished generating negatives",
        )
    }

    /// Step 4: score every pair in the pairs file.
    pub fn score_pairs(&mut self, pairs: &Path, scores: &Path) -> Result<()> {
        self.command(
            &format!("Score {} {}", pairs.display(), scores.display()),
            "finished calculating scores",
        )
    }

    fn command(&mut self, line: &str, marker: &str) -> Result<()> {
        debug!(command = line, "sending engine command");
        writeln!(self.stdin, "{line}")?;
        self.stdin.flush()?;
        self.wait_for(marker)
    }

    /// Pull drained output lines until `marker` appears (case-insensitive
    /// substring) or the process exits. A nonzero exit while waiting is an
    /// engine failure; a clean exit without the marker is left for the
    /// caller's artifact check to judge.
    fn wait_for(&mut self, marker: &str) -> Result<()> {
        let marker = marker.to_lowercase();
        loop {
            match self.lines.recv_timeout(POLL_INTERVAL) {
                Ok(line) => {
                    if self.consume(&line, &marker)? {
                        return Ok(());
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if let Some(status) = self.child.try_wait()? {
                        return self.finish(status, &marker);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    let status = self.child.wait()?;
                    return self.finish(status, &marker);
                }
            }
        }
    }

    /// Log one output line and report whether it carries the marker.
    fn consume(&mut self, line: &str, marker: &str) -> Result<bool> {
        debug!(engine = line, "engine output");
        writeln!(self.log, "{line}")?;
        Ok(line.to_lowercase().contains(marker))
    }

    /// The process exited while a step was pending: let the reader reach
    /// EOF, drain what is left in the queue, then judge the exit status.
    fn finish(&mut self, status: std::process::ExitStatus, marker: &str) -> Result<()> {
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
        while let Ok(line) = self.lines.try_recv() {
            if self.consume(&line, marker)? {
                return Ok(());
            }
        }
        if status.success() {
            Ok(())
        } else {
            Err(AlignError::EngineProcess {
                log_file: self.log_path.clone(),
            })
        }
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}
