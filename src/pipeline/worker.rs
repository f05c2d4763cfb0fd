//! Bounded worker pool for batch runs.
//!
//! Characters share no mutable state, so the batch fans out over a fixed
//! number of threads. OCR subprocesses are the dominant cost; the worker
//! count bounds how many run at once. A failed character yields a
//! placeholder record and the batch keeps going.

use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::record::CharacterRecord;

use super::queue::{CharacterJob, create_work_queue};
use super::Pipeline;

/// Processes all jobs through the pipeline's worker pool and returns the
/// records sorted by character id.
pub fn run_batch(pipeline: &Pipeline, jobs: Vec<CharacterJob>) -> Vec<CharacterRecord> {
    let total = jobs.len();
    let workers = pipeline.workers().min(total.max(1));

    let (job_tx, job_rx) = create_work_queue();
    for job in jobs {
        // Receiver outlives the loop; send cannot fail here.
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    let shared_rx = Arc::new(Mutex::new(job_rx));
    let (result_tx, result_rx) = channel();

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let rx = Arc::clone(&shared_rx);
            let tx = result_tx.clone();
            scope.spawn(move || worker_loop(pipeline, rx, tx));
        }
        drop(result_tx);
    });

    let mut records: Vec<CharacterRecord> = result_rx.iter().collect();
    records.sort_by(|a, b| a.id.cmp(&b.id));
    log::info!("batch finished: {} of {total} characters", records.len());
    records
}

fn worker_loop(
    pipeline: &Pipeline,
    jobs: Arc<Mutex<Receiver<CharacterJob>>>,
    results: Sender<CharacterRecord>,
) {
    loop {
        // Hold the lock only for the recv itself.
        let job = match jobs.lock() {
            Ok(rx) => rx.recv(),
            Err(_) => break,
        };
        let Ok(job) = job else { break };

        let started = Instant::now();
        let record = match pipeline.process_character(&job) {
            Ok(record) => record,
            Err(err) => {
                log::error!("character {} failed: {err:#}", job.id);
                pipeline.failure_record(&job, &err)
            }
        };

        let elapsed = started.elapsed();
        if elapsed > pipeline.character_budget() {
            log::warn!(
                "character {} took {:.1}s (budget {:.1}s)",
                job.id,
                elapsed.as_secs_f32(),
                pipeline.character_budget().as_secs_f32()
            );
        }

        if results.send(record).is_err() {
            break;
        }
    }
}
