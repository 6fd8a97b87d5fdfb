use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use fuserank_core::ScoreMatrix;
use fuserank_scorer::{ScoreRequest, ScoreResponse, Scorer, ScorerError};

#[derive(Debug)]
pub struct ScoringOutcome {
    pub matrix: ScoreMatrix,
    pub degraded_models: usize,
}

// one scoring task per model; results arrive in completion order but land in
// the matrix by original model index, so row order is deterministic no
// matter which model finishes first
pub fn collect_score_matrix(
    query: &str,
    texts: &[String],
    scorers: &[Arc<dyn Scorer>],
    parallelism: usize,
) -> ScoringOutcome {
    let mut matrix = ScoreMatrix::zeroed(scorers.len(), texts.len());
    if scorers.is_empty() || texts.is_empty() {
        return ScoringOutcome {
            matrix,
            degraded_models: 0,
        };
    }

    let workers = parallelism.max(1).min(scorers.len());
    let next_job = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<(usize, Result<ScoreResponse, ScorerError>)>();
    let mut degraded = 0usize;

    thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let next_job = &next_job;
            scope.spawn(move || {
                let runtime = tokio::runtime::Runtime::new();
                loop {
                    let idx = next_job.fetch_add(1, Ordering::Relaxed);
                    let Some(scorer) = scorers.get(idx) else { break };
                    let request = ScoreRequest {
                        query: query.to_string(),
                        texts: texts.to_vec(),
                    };
                    let outcome = match &runtime {
                        Ok(rt) => rt.block_on(scorer.score(request)),
                        Err(err) => Err(ScorerError::Config(format!(
                            "scoring runtime unavailable: {err}"
                        ))),
                    };
                    if tx.send((idx, outcome)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        while let Ok((idx, outcome)) = rx.recv() {
            match outcome {
                Ok(response) => {
                    let row: Vec<f64> = response
                        .scores
                        .iter()
                        .map(|s| if s.is_finite() { *s } else { 0.0 })
                        .collect();
                    if !matrix.set_row(idx, row) {
                        degraded += 1;
                    }
                }
                Err(_) => degraded += 1,
            }
        }
    });

    ScoringOutcome {
        matrix,
        degraded_models: degraded,
    }
}
