use crate::types::ScoreMatrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationPolicy {
    Mean,
    Rrf,
}

impl AggregationPolicy {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "rrf" => Self::Rrf,
            _ => Self::Mean,
        }
    }
}

pub fn aggregate(
    matrix: &ScoreMatrix,
    policy: AggregationPolicy,
    rrf_k: u32,
    weights: Option<&[f64]>,
) -> Vec<f64> {
    match policy {
        AggregationPolicy::Mean => weighted_mean(matrix, weights),
        AggregationPolicy::Rrf => reciprocal_rank_fusion(matrix, rrf_k),
    }
}

fn weighted_mean(matrix: &ScoreMatrix, weights: Option<&[f64]>) -> Vec<f64> {
    let models = matrix.model_count();
    let mut fused = vec![0.0; matrix.candidate_count()];
    if models == 0 {
        return fused;
    }

    let weight_of =
        |idx: usize| -> f64 { weights.and_then(|w| w.get(idx)).copied().unwrap_or(1.0) };
    let weight_sum: f64 = (0..models).map(weight_of).sum();

    for (m, row) in matrix.rows().iter().enumerate() {
        let w = if weight_sum == 0.0 { 1.0 } else { weight_of(m) };
        for (c, score) in row.iter().enumerate() {
            if let Some(slot) = fused.get_mut(c) {
                *slot += w * score;
            }
        }
    }

    let denom = if weight_sum == 0.0 {
        models as f64
    } else {
        weight_sum
    };
    for slot in &mut fused {
        *slot /= denom;
    }
    fused
}

fn reciprocal_rank_fusion(matrix: &ScoreMatrix, rrf_k: u32) -> Vec<f64> {
    let width = matrix.candidate_count();
    let mut fused = vec![0.0; width];
    let k = f64::from(rrf_k);

    for row in matrix.rows() {
        let mut order: Vec<usize> = (0..width).collect();
        order.sort_by(|&a, &b| {
            let sa = row.get(a).copied().unwrap_or(0.0);
            let sb = row.get(b).copied().unwrap_or(0.0);
            sb.total_cmp(&sa).then_with(|| a.cmp(&b))
        });
        for (rank, idx) in order.iter().enumerate() {
            if let Some(slot) = fused.get_mut(*idx) {
                *slot += 1.0 / (k + rank as f64);
            }
        }
    }
    fused
}
