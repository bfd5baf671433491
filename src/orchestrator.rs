//! Runs every registered scanner and gathers their results.
//!
//! Parallel runs use a fixed pool of worker threads that pull scanner indices
//! from a shared cursor, so at most `concurrency` scans touch the disk at once.
//! Results come back in registration order; progress events arrive in
//! completion order on the calling thread.

use crate::config::Config;
use crate::model::{CategoryId, ScanResult};
use crate::scanner::{ScanContext, Scanner};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use tracing::{debug, warn};

/// Called once per finished scanner with (completed, total, category).
pub type ScanProgress<'a> = &'a dyn Fn(usize, usize, CategoryId);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub parallel: bool,
    pub concurrency: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            concurrency: 4,
        }
    }
}

impl ScanOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            parallel: config.parallel_scans,
            concurrency: config.concurrency,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Runs one scanner; its failure never escapes.
fn run_isolated(scanner: &dyn Scanner, ctx: &ScanContext) -> ScanResult {
    let category = scanner.category();
    match panic::catch_unwind(AssertUnwindSafe(|| scanner.scan(ctx))) {
        Ok(Ok(result)) => {
            debug!("{category}: {} item(s)", result.items.len());
            result
        }
        Ok(Err(err)) => {
            warn!("{category}: scan failed: {err:#}");
            ScanResult::failed(category, format!("{err:#}"))
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!("{category}: scanner panicked: {message}");
            ScanResult::failed(category, format!("scanner panicked: {message}"))
        }
    }
}

pub fn run_all_scans(
    scanners: &[Box<dyn Scanner>],
    ctx: &ScanContext,
    options: ScanOptions,
    on_progress: Option<ScanProgress<'_>>,
) -> Vec<ScanResult> {
    let total = scanners.len();
    if total == 0 {
        return Vec::new();
    }

    if !options.parallel {
        return scanners
            .iter()
            .enumerate()
            .map(|(index, scanner)| {
                let result = run_isolated(scanner.as_ref(), ctx);
                if let Some(cb) = on_progress {
                    cb(index + 1, total, result.category);
                }
                result
            })
            .collect();
    }

    let workers = options.concurrency.clamp(1, total);
    let cursor = AtomicUsize::new(0);
    let mut slots: Vec<Option<ScanResult>> = (0..total).map(|_| None).collect();
    let (tx, rx) = mpsc::channel::<(usize, ScanResult)>();

    thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let cursor = &cursor;
            scope.spawn(move || {
                loop {
                    let index = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(scanner) = scanners.get(index) else {
                        break;
                    };
                    let result = run_isolated(scanner.as_ref(), ctx);
                    if tx.send((index, result)).is_err() {
                        break;
                    }
                }
            });
        }
        // Only worker clones remain, so the loop below ends with the last worker.
        drop(tx);

        let mut completed = 0;
        for (index, result) in rx {
            completed += 1;
            if let Some(cb) = on_progress {
                cb(completed, total, result.category);
            }
            slots[index] = Some(result);
        }
    });

    slots.into_iter().flatten().collect()
}
