// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The worker pool.  Jobs are numbered `0..jobs`; a fixed set of
//! scoped threads pulls numbers off a shared queue until it is empty
//! or the request is cancelled, so a slow row (or frame) never holds
//! up the others.

use crossbeam::channel;

use crate::error::{FractalError, Result};
use crate::task::CancelToken;

/// Threads to use when the caller does not say.
pub fn default_threads() -> usize {
    num_cpus::get()
}

/// Run `work(job)` for every job in `0..jobs` on up to `threads`
/// scoped threads.  Before each job the token is checked; once it is
/// cancelled no further jobs start, but jobs already running finish
/// (or poll the token themselves).  Returns after every thread has
/// exited.
pub fn dispatch<F>(jobs: usize, threads: usize, token: &CancelToken, work: F) -> Result<()>
where
    F: Fn(usize) + Sync,
{
    if jobs == 0 {
        return Ok(());
    }
    let threads = threads.max(1).min(jobs);

    let (sender, receiver) = channel::bounded(jobs);
    for job in 0..jobs {
        if sender.send(job).is_err() {
            break;
        }
    }
    drop(sender);

    let work = &work;
    crossbeam::scope(|spawner| {
        for _ in 0..threads {
            let receiver = receiver.clone();
            spawner.spawn(move |_| {
                for job in receiver.iter() {
                    if token.is_cancelled() {
                        break;
                    }
                    work(job);
                }
            });
        }
    })
    .map_err(|_| FractalError::WorkerPanicked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn every_job_runs_once() {
        let seen = Mutex::new(vec![0; 100]);
        dispatch(100, 4, &CancelToken::new(), |job| {
            seen.lock().unwrap()[job] += 1;
        })
        .unwrap();
        assert!(seen.into_inner().unwrap().iter().all(|&n| n == 1));
    }

    #[test]
    fn no_jobs_start_after_cancel() {
        let token = CancelToken::new();
        let ran = AtomicUsize::new(0);
        dispatch(1000, 1, &token, |job| {
            ran.fetch_add(1, Ordering::SeqCst);
            if job == 9 {
                token.cancel();
            }
        })
        .unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn zero_jobs_is_a_no_op() {
        dispatch(0, 8, &CancelToken::new(), |_| panic!("no job expected")).unwrap();
    }

    #[test]
    fn worker_panic_becomes_an_error() {
        let result = dispatch(4, 2, &CancelToken::new(), |job| {
            if job == 2 {
                panic!("boom");
            }
        });
        assert!(result.is_err());
    }
}
