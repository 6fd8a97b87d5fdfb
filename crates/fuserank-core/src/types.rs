use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub rank: u32,
}

impl Candidate {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: Map::new(),
            rank: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub score: f64,
    pub rerank_rank: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreMatrix {
    rows: Vec<Vec<f64>>,
    width: usize,
}

impl ScoreMatrix {
    pub fn zeroed(models: usize, candidates: usize) -> Self {
        Self {
            rows: vec![vec![0.0; candidates]; models],
            width: candidates,
        }
    }

    pub fn set_row(&mut self, model_idx: usize, scores: Vec<f64>) -> bool {
        if scores.len() != self.width {
            return false;
        }
        match self.rows.get_mut(model_idx) {
            Some(row) => {
                *row = scores;
                true
            }
            None => false,
        }
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn model_count(&self) -> usize {
        self.rows.len()
    }

    pub fn candidate_count(&self) -> usize {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.width == 0
    }
}
