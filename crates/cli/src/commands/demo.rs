// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Synthetic training loop that logs metrics and resumes from checkpoints

use anyhow::Result;
use el_engine::{Run, RunConfig};
use el_storage::{from_payload, to_payload, CheckpointError, Checkpointable, Payload, Resume};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(clap::Args)]
pub struct DemoArgs {
    /// Run directory for metrics and checkpoints
    dir: PathBuf,

    /// Stop once this many steps have run in total
    #[arg(long, default_value = "100")]
    steps: i64,

    /// TOML run configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pause after every step (milliseconds)
    #[arg(long, default_value = "0")]
    delay_ms: u64,
}

/// Toy model: a single weight descending towards zero
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Model {
    weight: f64,
    learning_rate: f64,
}

impl Model {
    fn train_step(&mut self) -> f64 {
        let loss = self.weight * self.weight;
        self.weight -= self.learning_rate * 2.0 * self.weight;
        loss
    }
}

impl Checkpointable for Model {
    fn save(&self) -> Result<Payload, CheckpointError> {
        to_payload(self)
    }

    fn load(&mut self, payload: Payload) -> Result<(), CheckpointError> {
        *self = from_payload(payload)?;
        Ok(())
    }
}

pub fn handle(args: DemoArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nStopping after the current step...");
        r.store(false, Ordering::SeqCst);
    })?;

    let model = Arc::new(Mutex::new(Model {
        weight: 4.0,
        learning_rate: 0.05,
    }));
    let mut run = Run::open(&args.dir, &config)?;
    run.attach("model", &model)?;

    match run.resume()? {
        Resume::Loaded => println!("Resumed at step {}", run.step()),
        Resume::Saved => println!("Started new run in {}", args.dir.display()),
    }

    while run.step() < args.steps && running.load(Ordering::SeqCst) {
        let loss = model.lock().unwrap_or_else(|e| e.into_inner()).train_step();
        run.scalar("loss", loss);
        run.advance()?;
        if args.delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(args.delay_ms));
        }
    }

    let step = run.step();
    run.close()?;
    println!("Stopped at step {}", step);
    Ok(())
}
