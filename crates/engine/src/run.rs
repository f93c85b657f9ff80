// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A run directory with its writer, logger, checkpoint and step counter

use crate::config::RunConfig;
use crate::error::EngineError;
use crate::logger::Logger;
use el_core::when::{self, Trigger};
use el_core::{Clock, Counter, Every, SystemClock};
use el_storage::{AsyncWriter, Checkpoint, Checkpointable, Resume};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Entry name of the step counter inside checkpoints
pub const STEP_KEY: &str = "step";

/// What happened when a step ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// The step that just ended
    pub step: i64,
    pub flushed: bool,
    pub saved: bool,
}

/// Everything a training-style loop needs to log and checkpoint
///
/// Metrics and checkpoints share one writer, so a flush issued before a
/// save always reaches the backends before the archive is published.
pub struct Run<C: Clock = SystemClock> {
    directory: PathBuf,
    writer: Arc<AsyncWriter>,
    logger: Logger,
    checkpoint: Checkpoint,
    step: Arc<Mutex<Counter>>,
    should_log: Every,
    should_save: when::Clock<C>,
}

impl Run<SystemClock> {
    pub fn open(directory: &Path, config: &RunConfig) -> Result<Self, EngineError> {
        Self::open_with_clock(directory, config, SystemClock)
    }
}

impl<C: Clock> Run<C> {
    /// Open a run whose checkpoint period is measured by `clock`
    pub fn open_with_clock(directory: &Path, config: &RunConfig, clock: C) -> Result<Self, EngineError> {
        std::fs::create_dir_all(directory).map_err(|source| EngineError::Directory {
            path: directory.to_path_buf(),
            source,
        })?;

        let backends = config.build_backends(directory)?;
        let writer = Arc::new(AsyncWriter::new()?);
        let logger = Logger::new(Arc::clone(&writer), backends);

        let step = Arc::new(Mutex::new(Counter::default()));
        let mut checkpoint = Checkpoint::new(config.checkpoint_dir(directory), Arc::clone(&writer))
            .with_write(config.checkpoint.write);
        checkpoint.attach(STEP_KEY, &step)?;

        info!(
            directory = %directory.display(),
            backends = ?logger.backends().collect::<Vec<_>>(),
            "opened run"
        );
        Ok(Self {
            directory: directory.to_path_buf(),
            writer,
            logger,
            checkpoint,
            step,
            should_log: Every::new(config.logger.log_every),
            should_save: when::Clock::with_clock(config.checkpoint.every, clock),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Current step
    pub fn step(&self) -> i64 {
        self.step.lock().unwrap_or_else(|e| e.into_inner()).get()
    }

    pub fn logger(&mut self) -> &mut Logger {
        &mut self.logger
    }

    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    pub fn writer(&self) -> &Arc<AsyncWriter> {
        &self.writer
    }

    /// Include a caller-owned object in every checkpoint of this run
    pub fn attach<T>(&mut self, name: &str, object: &Arc<Mutex<T>>) -> Result<(), EngineError>
    where
        T: Checkpointable + 'static,
    {
        self.checkpoint.attach(name, object)?;
        Ok(())
    }

    /// Restore the latest checkpoint, or write the first one
    pub fn resume(&mut self) -> Result<Resume, EngineError> {
        let resume = self.checkpoint.load_or_save()?;
        info!(step = self.step(), ?resume, "resumed run");
        Ok(resume)
    }

    /// Log a scalar at the current step
    pub fn scalar(&mut self, name: &str, value: f64) {
        let step = self.step();
        self.logger.scalar(name, value, step);
    }

    /// Finish the current step: flush and save when due, then advance
    pub fn advance(&mut self) -> Result<Tick, EngineError> {
        let step = self.step();

        let flushed = self.should_log.fires(step);
        if flushed {
            self.logger.flush()?;
        }

        // The saved counter already points at the next step to run
        let next = self.step.lock().unwrap_or_else(|e| e.into_inner()).increment();
        let saved = self.should_save.fires_now();
        if saved {
            self.logger.flush()?;
            self.checkpoint.save()?;
        }

        tracing::trace!(step, next, flushed, saved, "advanced");
        Ok(Tick { step, flushed, saved })
    }

    /// Flush and save everything, then wait for every write to land
    pub fn close(mut self) -> Result<(), EngineError> {
        let result = self.finish();
        let closed = self.writer.close();
        result?;
        closed?;
        info!(directory = %self.directory.display(), step = self.step(), "closed run");
        Ok(())
    }

    fn finish(&mut self) -> Result<(), EngineError> {
        self.logger.close()?;
        self.checkpoint.save()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
