//! Multi-threaded track encoder.
//!
//! Three roles share a scoped thread region:
//!
//! - a generator thread walks the spiral plan, reports progress, checks for
//!   cancellation and feeds a bounded job queue;
//! - worker threads turn jobs into palette bytes, including alignment padding;
//! - the calling thread reassembles results by track index and feeds the
//!   single [`TrackSink`], so interleaving sees the same stream as the
//!   sequential encoder. It keeps checking for cancellation while the last
//!   tracks drain.
//!
//! A credit channel caps the number of tracks in flight (queued, computing or
//! waiting for reassembly) at four per worker.

use std::any::Any;
use std::io::Write;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{
    bounded, unbounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender,
};

use crate::prepare::DiscImage;
use crate::quantize::{Dither, TrackSampler, PALETTE};

use super::reorder::ReorderBuffer;
use super::sequential::image_mapping;
use super::types::check_image;
use super::{
    CancelToken, EncodeError, EncodeOutcome, EncodeParams, RunControl, SpiralPlan, TrackJob,
    TrackResult, TrackSink,
};

/// How long a blocked role waits before looking at the cancellation token.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Samples computed between two cancellation checks inside a worker.
const CANCEL_CHECK_INTERVAL: usize = 4096;

/// Job queue slots per worker.
const QUEUE_SLOTS_PER_WORKER: usize = 2;

/// Tracks in flight per worker.
const IN_FLIGHT_PER_WORKER: usize = 4;

/// Palette bytes of one track, followed by its alignment padding.
///
/// Returns `None` when `token` is cancelled mid-track.
pub fn compute_track(
    image: &DiscImage,
    dither: Dither,
    job: &TrackJob,
    token: &CancelToken,
) -> Option<Vec<u8>> {
    let mut symbols = Vec::with_capacity(job.symbol_count());
    for (i, symbol) in TrackSampler::new(image, job.mapping, &job.ring(), dither).enumerate() {
        if i % CANCEL_CHECK_INTERVAL == 0 && token.is_cancelled() {
            return None;
        }
        symbols.push(symbol);
    }
    symbols.resize(job.symbol_count(), PALETTE[0]);
    Some(symbols)
}

/// Encodes tracks on a pool of worker threads.
#[derive(Debug, Clone)]
pub struct ParallelEncoder {
    params: EncodeParams,
    workers: usize,
}

impl ParallelEncoder {
    /// Uses `params.workers` threads, or the default count when it is 0.
    ///
    /// # Errors
    /// Returns [`EncodeError::InvalidParameter`] for out-of-range parameters.
    pub fn new(params: EncodeParams) -> Result<Self, EncodeError> {
        params.validate()?;
        let workers = match params.workers {
            0 => super::default_workers(),
            n => n,
        };
        Ok(Self { params, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn params(&self) -> &EncodeParams {
        &self.params
    }

    /// Encode `image` into `out`. Output is byte-identical to
    /// [`super::SequentialEncoder::run`] with the same parameters.
    pub fn run<W: Write>(
        &self,
        image: &DiscImage,
        out: W,
        control: &mut RunControl<'_>,
    ) -> Result<EncodeOutcome, EncodeError> {
        let dither = self.params.dither_config();
        self.run_with_processor(
            image,
            |job: &TrackJob, token: &CancelToken| Ok(compute_track(image, dither, job, token)),
            out,
            control,
        )
    }

    /// Like [`ParallelEncoder::run`], with a custom per-track processor.
    ///
    /// The processor returns the track's symbols including padding, `None`
    /// when it gave up because of cancellation, or an error that aborts the
    /// run.
    ///
    /// # Errors
    /// [`EncodeError::InvalidParameter`] for an empty or malformed image; the
    /// first processor error or write failure otherwise. Every thread has
    /// stopped by the time this returns.
    pub fn run_with_processor<W, P>(
        &self,
        image: &DiscImage,
        processor: P,
        out: W,
        control: &mut RunControl<'_>,
    ) -> Result<EncodeOutcome, EncodeError>
    where
        W: Write,
        P: Fn(&TrackJob, &CancelToken) -> Result<Option<Vec<u8>>, EncodeError> + Sync,
    {
        check_image(image)?;
        let plan = SpiralPlan::new(&self.params, image_mapping(image));
        let sink = TrackSink::new(out, self.params.layout);
        let token = control.token().clone();
        let window = self.workers * IN_FLIGHT_PER_WORKER;

        tracing::info!(
            workers = self.workers,
            tr0 = self.params.tr0,
            dtr = self.params.dtr,
            r0 = self.params.r0,
            budget = self.params.total_budget(),
            "parallel encode started"
        );

        let (job_tx, job_rx) = bounded::<TrackJob>(self.workers * QUEUE_SLOTS_PER_WORKER);
        let (result_tx, result_rx) = unbounded::<TrackResult>();
        let (credit_tx, credit_rx) = bounded::<()>(window);
        for _ in 0..window {
            credit_tx
                .send(())
                .map_err(|_| EncodeError::PipelineDisconnected { next_expected: 0 })?;
        }

        let shared_control = Mutex::new(&mut *control);
        let outcome = thread::scope(|scope| {
            let generator_token = token.clone();
            let generator_control = &shared_control;
            scope.spawn(move || {
                generate_jobs(plan, job_tx, credit_rx, generator_control, &generator_token)
            });

            for worker_id in 0..self.workers {
                let jobs = job_rx.clone();
                let results = result_tx.clone();
                let processor = &processor;
                let token = &token;
                scope.spawn(move || run_worker(worker_id, jobs, results, processor, token));
            }
            drop(job_rx);
            drop(result_tx);

            let outcome = reassemble(result_rx, credit_tx, sink, &shared_control, window);
            if !matches!(outcome, Ok(EncodeOutcome::Completed(_))) {
                token.cancel();
            }
            outcome
        });

        drop(shared_control);

        match &outcome {
            Ok(EncodeOutcome::Completed(summary)) => {
                control.report_progress(100);
                tracing::info!(
                    tracks = summary.tracks,
                    symbols = summary.symbols,
                    bytes = summary.bytes_written,
                    "parallel encode finished"
                );
            }
            Ok(EncodeOutcome::Cancelled(summary)) => {
                tracing::warn!(tracks = summary.tracks, "encode cancelled");
            }
            Err(e) => tracing::warn!(error = %e, "parallel encode aborted"),
        }
        outcome
    }
}

fn lock_control<'m, 'c, 'a>(
    control: &'m Mutex<&'c mut RunControl<'a>>,
) -> MutexGuard<'m, &'c mut RunControl<'a>> {
    match control.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Walk the plan and queue one job per track. Returns the number queued.
fn generate_jobs(
    plan: SpiralPlan,
    jobs: Sender<TrackJob>,
    credits: Receiver<()>,
    control: &Mutex<&mut RunControl<'_>>,
    token: &CancelToken,
) -> u64 {
    let mut queued = 0;
    for job in plan {
        {
            let mut control = lock_control(control);
            if control.should_cancel() {
                tracing::debug!(track = job.track_index, "generator saw cancellation");
                break;
            }
            control.report_progress(job.progress);
        }

        if !acquire_credit(&credits, token) || !send_job(&jobs, job, token) {
            break;
        }
        queued += 1;
    }
    tracing::debug!(queued, "generator finished");
    queued
}

fn acquire_credit(credits: &Receiver<()>, token: &CancelToken) -> bool {
    loop {
        match credits.recv_timeout(POLL_INTERVAL) {
            Ok(()) => return true,
            Err(RecvTimeoutError::Timeout) if !token.is_cancelled() => {}
            Err(_) => return false,
        }
    }
}

fn send_job(jobs: &Sender<TrackJob>, mut job: TrackJob, token: &CancelToken) -> bool {
    loop {
        match jobs.send_timeout(job, POLL_INTERVAL) {
            Ok(()) => return true,
            Err(SendTimeoutError::Timeout(returned)) if !token.is_cancelled() => job = returned,
            Err(_) => return false,
        }
    }
}

fn run_worker<P>(
    worker_id: usize,
    jobs: Receiver<TrackJob>,
    results: Sender<TrackResult>,
    processor: &P,
    token: &CancelToken,
) where
    P: Fn(&TrackJob, &CancelToken) -> Result<Option<Vec<u8>>, EncodeError> + Sync,
{
    tracing::debug!(worker_id, "track worker started");
    let mut completed = 0u64;

    for job in jobs.iter() {
        if token.is_cancelled() {
            break;
        }

        let symbols = match catch_unwind(AssertUnwindSafe(|| processor(&job, token))) {
            Ok(Ok(Some(symbols))) => Ok(symbols),
            Ok(Ok(None)) => break,
            Ok(Err(e)) => Err(e),
            Err(payload) => Err(EncodeError::WorkerFailure {
                track_index: job.track_index,
                message: panic_message(payload.as_ref()),
            }),
        };

        let result = TrackResult {
            track_index: job.track_index,
            symbols,
        };
        if results.send(result).is_err() {
            break;
        }
        completed += 1;
    }

    tracing::debug!(worker_id, completed, "track worker stopped");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("worker panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("worker panicked: {message}")
    } else {
        "worker panicked".to_string()
    }
}

/// Write results in track order until the workers are gone.
///
/// Polls for cancellation before every receive, so a cancel request is seen
/// even after the generator has queued its last job.
fn reassemble<W: Write>(
    results: Receiver<TrackResult>,
    credits: Sender<()>,
    mut sink: TrackSink<W>,
    control: &Mutex<&mut RunControl<'_>>,
    window: usize,
) -> Result<EncodeOutcome, EncodeError> {
    let mut reorder = ReorderBuffer::with_limit(window);

    loop {
        if lock_control(control).should_cancel() {
            return Ok(EncodeOutcome::Cancelled(sink.summary()));
        }
        let result = match results.recv_timeout(POLL_INTERVAL) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let symbols = result.symbols?;
        for track in reorder.push(result.track_index, symbols)? {
            sink.push_track(&track)?;
            // the generator may already be done
            let _ = credits.try_send(());
        }
    }

    if lock_control(control).token().is_cancelled() {
        return Ok(EncodeOutcome::Cancelled(sink.summary()));
    }
    if reorder.pending_len() > 0 {
        return Err(EncodeError::PipelineDisconnected {
            next_expected: reorder.next_expected(),
        });
    }

    let (summary, _) = sink.finish()?;
    Ok(EncodeOutcome::Completed(summary))
}
