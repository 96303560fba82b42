//! Batch tagging on a bounded worker pool.
//!
//! # Design
//!
//! - **Queue**: every song is pushed onto one channel which is then closed;
//!   workers drain it and exit when it is empty
//! - **Workers**: scoped threads, so `run` returns only after every song has
//!   an outcome
//! - **Progress**: counters and the run log writers live behind one mutex;
//!   each outcome is recorded and flushed while holding it
//! - **Isolation**: a failing song is recorded as failed, never retried, and
//!   never stops the batch

use chrono::Local;
use crossbeam_channel::unbounded;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result, ResultExt};
use crate::media::MediaTool;
use crate::model::Song;

use super::{Outcome, Tagger};

/// A song whose pipeline failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub id: String,
    /// `Artist - Title`
    pub name: String,
    pub error: String,
}

/// Tally of one batch run.
#[derive(Debug, Clone, Default)]
pub struct Summary {
    pub total: usize,
    pub workers: usize,
    pub skipped: usize,
    pub dry_run: usize,
    pub tagged: usize,
    pub failures: Vec<Failure>,
    /// Run log, when a log directory was given
    pub log_file: Option<PathBuf>,
    /// Failure report, when a log directory was given
    pub failures_file: Option<PathBuf>,
}

impl Summary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Songs that did not fail.
    pub fn succeeded(&self) -> usize {
        self.total - self.failed()
    }
}

impl<T: MediaTool> Tagger<T> {
    /// Tag every song in `songs` using `workers` threads.
    ///
    /// With a `log_dir`, writes a timestamped run log and failure report
    /// there (skipped in dry-run mode).
    pub fn run(&self, songs: &[Song], workers: usize, log_dir: Option<&Path>) -> Result<Summary> {
        if workers == 0 {
            return Err(Error::config("worker count must be at least 1"));
        }
        let workers = workers.min(songs.len()).max(1);

        let log = match log_dir {
            Some(dir) if !self.options.dry_run => Some(RunLog::create(dir, workers, songs.len())?),
            Some(_) => {
                tracing::info!("Dry run: no run log written");
                None
            }
            None => None,
        };

        tracing::info!(songs = songs.len(), workers, "Starting tagging run");
        let progress = Mutex::new(Progress::new(songs.len(), workers, log));

        if workers == 1 {
            for song in songs {
                let outcome = self.tag_song(song);
                progress.lock().record(song, outcome);
            }
        } else {
            let (tx, rx) = unbounded::<&Song>();
            for song in songs {
                if tx.send(song).is_err() {
                    break;
                }
            }
            drop(tx);

            std::thread::scope(|scope| {
                for _ in 0..workers {
                    let rx = rx.clone();
                    let progress = &progress;
                    scope.spawn(move || {
                        for song in rx.iter() {
                            let outcome = self.tag_song(song);
                            progress.lock().record(song, outcome);
                        }
                    });
                }
            });
        }

        Ok(progress.into_inner().finish())
    }
}

/// Shared state updated by every worker.
struct Progress {
    completed: usize,
    summary: Summary,
    log: Option<RunLog>,
    /// Console output; write errors (a closed pipe) are ignored
    console: Box<dyn Write + Send>,
}

impl Progress {
    fn new(total: usize, workers: usize, log: Option<RunLog>) -> Self {
        Self::with_console(total, workers, log, Box::new(io::stdout()))
    }

    fn with_console(
        total: usize,
        workers: usize,
        log: Option<RunLog>,
        console: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            completed: 0,
            summary: Summary {
                total,
                workers,
                log_file: log.as_ref().map(|l| l.log_path.clone()),
                failures_file: log.as_ref().map(|l| l.failures_path.clone()),
                ..Default::default()
            },
            log,
            console,
        }
    }

    fn record(&mut self, song: &Song, outcome: Outcome) {
        self.completed += 1;
        let _ = write!(
            self.console,
            "\r[{}/{}] {} - {}    ",
            self.completed, self.summary.total, song.id, outcome
        );
        let _ = self.console.flush();

        if let Some(log) = self.log.as_mut()
            && let Err(e) = log.record(song, &outcome)
        {
            tracing::warn!(path = %log.log_path.display(), error = %e, "Failed to write run log");
        }

        match outcome {
            Outcome::Skipped => self.summary.skipped += 1,
            Outcome::DryRun(_) => self.summary.dry_run += 1,
            Outcome::Tagged(_) => self.summary.tagged += 1,
            Outcome::Failed(error) => self.summary.failures.push(Failure {
                id: song.id.clone(),
                name: song.display_name(),
                error,
            }),
        }
    }

    fn finish(mut self) -> Summary {
        let summary = self.summary;
        let console = &mut self.console;
        let _ = writeln!(console);

        if let Some(log) = self.log.as_mut()
            && let Err(e) = log.finish(&summary)
        {
            tracing::warn!(path = %log.log_path.display(), error = %e, "Failed to close run log");
        }

        let _ = writeln!(
            console,
            "Done tagging {} files with {} workers ({} failures)",
            summary.total,
            summary.workers,
            summary.failed()
        );
        if let Some(path) = &summary.log_file {
            let _ = writeln!(console, "Log: {}", path.display());
        }
        if summary.failed() > 0
            && let Some(path) = &summary.failures_file
        {
            let _ = writeln!(console, "Failures: {}", path.display());
        }
        let _ = console.flush();

        tracing::info!(
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            "Finished tagging run"
        );
        summary
    }
}

/// The run log and failure report of one batch.
struct RunLog {
    log: BufWriter<File>,
    failures: BufWriter<File>,
    log_path: PathBuf,
    failures_path: PathBuf,
}

impl RunLog {
    fn create(dir: &Path, workers: usize, total: usize) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(format!("Failed to create log directory {}", dir.display()))?;

        let stamp = Local::now().format("%Y%m%d-%H%M%S");
        let log_path = dir.join(format!("music-tag-{}.log", stamp));
        let failures_path = dir.join(format!("music-tag-{}.failures", stamp));

        let mut log = BufWriter::new(open_append(&log_path)?);
        let failures = BufWriter::new(open_append(&failures_path)?);

        writeln!(
            log,
            "Starting tagging at {} with {} workers for {} items",
            Local::now(),
            workers,
            total
        )?;
        log.flush()?;

        Ok(Self {
            log,
            failures,
            log_path,
            failures_path,
        })
    }

    fn record(&mut self, song: &Song, outcome: &Outcome) -> io::Result<()> {
        writeln!(self.log, "[{}] {} - {}", Local::now(), song.id, outcome)?;
        if let Outcome::Failed(error) = outcome {
            writeln!(self.failures, "{} | {}", song.id, song.display_name())?;
            writeln!(self.failures, "  Error: {}", error)?;
            writeln!(self.failures)?;
        }
        self.log.flush()?;
        self.failures.flush()
    }

    fn finish(&mut self, summary: &Summary) -> io::Result<()> {
        writeln!(
            self.log,
            "Finished at {}: {} succeeded, {} failed",
            Local::now(),
            summary.succeeded(),
            summary.failed()
        )?;
        self.log.flush()?;
        self.failures.flush()
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(format!("Failed to open {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunOptions;
    use crate::test_utils::{FakeTool, TestLibrary, song};

    /// Ten songs needing a genre update; `missing` of them have no file.
    fn batch(lib: &TestLibrary, missing: &[usize]) -> Vec<Song> {
        (0..10)
            .map(|i| {
                let id = format!("song-{:02}", i);
                if !missing.contains(&i) {
                    lib.add_audio(&id, &[("artist", "X"), ("genre", "old")]);
                }
                song(&id, "X", &format!("Title {}", i), "Road", Some("new"))
            })
            .collect()
    }

    fn failure_entries(path: &Path) -> usize {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .filter(|l| l.starts_with("  Error:"))
            .count()
    }

    #[test]
    fn test_failures_are_isolated() {
        let lib = TestLibrary::empty();
        let songs = batch(&lib, &[3, 7]);
        let tagger = lib.tagger(FakeTool::new(), RunOptions::default());

        let summary = tagger.run(&songs, 4, Some(&lib.log_dir())).unwrap();

        assert_eq!(summary.total, 10);
        assert_eq!(summary.tagged, 8);
        assert_eq!(summary.succeeded(), 8);
        assert_eq!(summary.failed(), 2);
        let mut failed: Vec<_> = summary.failures.iter().map(|f| f.id.as_str()).collect();
        failed.sort();
        assert_eq!(failed, vec!["song-03", "song-07"]);

        let failures_file = summary.failures_file.as_ref().unwrap();
        assert_eq!(failure_entries(failures_file), 2);
        let report = std::fs::read_to_string(failures_file).unwrap();
        assert!(report.contains("song-03 | X - Title 3"));
    }

    #[test]
    fn test_run_log_has_one_line_per_song() {
        let lib = TestLibrary::empty();
        let songs = batch(&lib, &[0]);
        let tagger = lib.tagger(FakeTool::new(), RunOptions::default());

        let summary = tagger.run(&songs, 3, Some(&lib.log_dir())).unwrap();

        let log = std::fs::read_to_string(summary.log_file.as_ref().unwrap()).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert!(lines[0].starts_with("Starting tagging at"));
        assert!(lines.last().unwrap().contains("9 succeeded, 1 failed"));
        for song in &songs {
            let needle = format!("] {} - ", song.id);
            assert_eq!(lines.iter().filter(|l| l.contains(&needle)).count(), 1);
        }
        assert!(log.contains("] song-00 - failed"));
        assert!(log.contains("] song-01 - tagged"));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let seq_lib = TestLibrary::empty();
        let par_lib = TestLibrary::empty();
        let seq_songs = batch(&seq_lib, &[2, 5, 9]);
        let par_songs = batch(&par_lib, &[2, 5, 9]);

        let seq = seq_lib
            .tagger(FakeTool::new(), RunOptions::default())
            .run(&seq_songs, 1, None)
            .unwrap();
        let par = par_lib
            .tagger(FakeTool::new(), RunOptions::default())
            .run(&par_songs, 8, None)
            .unwrap();

        assert_eq!(seq.tagged, par.tagged);
        assert_eq!(seq.skipped, par.skipped);
        let mut seq_failed = seq.failures.clone();
        let mut par_failed = par.failures.clone();
        seq_failed.sort_by(|a, b| a.id.cmp(&b.id));
        par_failed.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(seq_failed.len(), par_failed.len());
        for (a, b) in seq_failed.iter().zip(&par_failed) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.name, b.name);
        }
    }

    #[test]
    fn test_second_run_skips_everything() {
        let lib = TestLibrary::empty();
        let songs = batch(&lib, &[]);
        let tagger = lib.tagger(FakeTool::new(), RunOptions::default());

        let first = tagger.run(&songs, 4, None).unwrap();
        let second = tagger.run(&songs, 4, None).unwrap();

        assert_eq!(first.tagged, 10);
        assert_eq!(second.skipped, 10);
        assert_eq!(tagger.tool().encode_count(), 10);
    }

    #[test]
    fn test_encoder_failures_are_reported() {
        let lib = TestLibrary::empty();
        let songs = batch(&lib, &[]);
        let tagger = lib.tagger(
            FakeTool::failing_for(["song-01", "song-04", "song-08"]),
            RunOptions::default(),
        );

        let summary = tagger.run(&songs, 4, Some(&lib.log_dir())).unwrap();

        assert_eq!(summary.failed(), 3);
        assert_eq!(summary.tagged, 7);
        assert_eq!(failure_entries(summary.failures_file.as_ref().unwrap()), 3);
        assert!(
            summary
                .failures
                .iter()
                .all(|f| f.error.contains("simulated encoder failure"))
        );
    }

    #[test]
    fn test_dry_run_writes_no_artifacts() {
        let lib = TestLibrary::empty();
        let songs = batch(&lib, &[4]);
        let options = RunOptions {
            dry_run: true,
            ..Default::default()
        };
        let tagger = lib.tagger(FakeTool::new(), options);

        let summary = tagger.run(&songs, 2, Some(&lib.log_dir())).unwrap();

        assert_eq!(summary.dry_run, 9);
        assert_eq!(summary.failed(), 1);
        assert!(summary.log_file.is_none());
        assert!(!lib.log_dir().exists());
        assert_eq!(tagger.tool().encode_count(), 0);
    }

    #[test]
    fn test_zero_workers_is_rejected() {
        let lib = TestLibrary::empty();
        let tagger = lib.tagger(FakeTool::new(), RunOptions::default());
        let err = tagger.run(&[], 0, None).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    /// A console whose reader has gone away, like `music sync | head`.
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
    }

    #[test]
    fn test_closed_console_does_not_stop_the_batch() {
        let mut progress = Progress::with_console(3, 1, None, Box::new(ClosedPipe));
        let a = song("aa11", "X", "One", "Road", None);
        let b = song("bb22", "Y", "Two", "Road", None);

        progress.record(&a, Outcome::Skipped);
        progress.record(&b, Outcome::Failed("boom".to_string()));
        progress.record(&a, Outcome::Skipped);
        let summary = progress.finish();

        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.failures[0].id, "bb22");
    }

    #[test]
    fn test_empty_batch() {
        let lib = TestLibrary::empty();
        let tagger = lib.tagger(FakeTool::new(), RunOptions::default());
        let summary = tagger.run(&[], 4, None).unwrap();
        assert_eq!(summary.total, 0);
        assert_eq!(summary.workers, 1);
    }
}
