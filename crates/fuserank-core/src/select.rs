use crate::types::{Candidate, ScoredCandidate};

pub fn select_top(candidates: &[Candidate], fused: &[f64], final_k: usize) -> Vec<ScoredCandidate> {
    let mut order: Vec<usize> = (0..candidates.len().min(fused.len())).collect();
    order.sort_by(|&a, &b| {
        let sa = fused.get(a).copied().unwrap_or(0.0);
        let sb = fused.get(b).copied().unwrap_or(0.0);
        sb.total_cmp(&sa).then_with(|| a.cmp(&b))
    });

    order
        .iter()
        .take(final_k)
        .enumerate()
        .filter_map(|(pos, &idx)| {
            let candidate = candidates.get(idx)?.clone();
            Some(ScoredCandidate {
                candidate,
                score: fused.get(idx).copied().unwrap_or(0.0),
                rerank_rank: pos as u32 + 1,
            })
        })
        .collect()
}

pub fn zero_scored_prefix(candidates: &[Candidate], final_k: usize) -> Vec<ScoredCandidate> {
    candidates
        .iter()
        .take(final_k)
        .enumerate()
        .map(|(pos, candidate)| ScoredCandidate {
            candidate: candidate.clone(),
            score: 0.0,
            rerank_rank: pos as u32 + 1,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(ids: &[&str]) -> Vec<Candidate> {
        ids.iter()
            .map(|id| Candidate::new(*id, format!("text for {id}")))
            .collect()
    }

    #[test]
    fn selects_by_score_then_position() {
        let cands = candidates(&["a", "b", "c"]);
        let out = select_top(&cands, &[0.9, 0.9, 0.5], 2);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].candidate.id, "a");
        assert_eq!(out[0].rerank_rank, 1);
        assert_eq!(out[1].candidate.id, "b");
        assert_eq!(out[1].rerank_rank, 2);
    }

    #[test]
    fn selects_highest_regardless_of_position() {
        let cands = candidates(&["a", "b", "c"]);
        let out = select_top(&cands, &[0.1, 0.7, 0.4], 3);
        let ids: Vec<&str> = out.iter().map(|s| s.candidate.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert_eq!(out[0].score, 0.7);
    }

    #[test]
    fn final_k_larger_than_input_returns_everything() {
        let cands = candidates(&["a", "b"]);
        let out = select_top(&cands, &[0.2, 0.4], 5);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn zero_scored_prefix_keeps_upstream_order() {
        let cands = candidates(&["a", "b", "c"]);
        let out = zero_scored_prefix(&cands, 2);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].candidate.id, "a");
        assert_eq!(out[0].score, 0.0);
        assert_eq!(out[1].candidate.id, "b");
        assert_eq!(out[1].rerank_rank, 2);
    }
}
