use std::collections::HashSet;

use crate::error::ScorerError;
use crate::traits::Scorer;
use crate::types::{ScoreRequest, ScoreResponse};

const BM25_K1: f64 = 1.2;
const BM25_B: f64 = 0.75;
const BM25_AVG_LEN: f64 = 32.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexicalFamily {
    Bm25,
    TermOverlap,
}

pub struct LocalScorer {
    model: String,
    family: LexicalFamily,
}

impl LocalScorer {
    pub fn load(model_id: &str) -> Result<Self, ScorerError> {
        let family = match model_id.trim().to_ascii_lowercase().as_str() {
            "lexical-bm25" | "bm25" => LexicalFamily::Bm25,
            "lexical-overlap" | "term-overlap" => LexicalFamily::TermOverlap,
            other => {
                return Err(ScorerError::Load(format!(
                    "no local scorer family for model id {other}"
                )));
            }
        };
        Ok(Self {
            model: model_id.to_string(),
            family,
        })
    }

    fn score_pair(&self, query_terms: &[String], text: &str) -> f64 {
        match self.family {
            LexicalFamily::Bm25 => bm25_score(query_terms, text),
            LexicalFamily::TermOverlap => overlap_score(query_terms, text),
        }
    }
}

#[async_trait::async_trait]
impl Scorer for LocalScorer {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn score(&self, request: ScoreRequest) -> Result<ScoreResponse, ScorerError> {
        let query_terms = tokenize(&request.query);
        let scores = request
            .texts
            .iter()
            .map(|text| self.score_pair(&query_terms, text))
            .collect();
        Ok(ScoreResponse {
            scorer: self.name().to_string(),
            model: self.model.clone(),
            scores,
        })
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

fn bm25_score(query_terms: &[String], text: &str) -> f64 {
    let doc_terms = tokenize(text);
    if query_terms.is_empty() || doc_terms.is_empty() {
        return 0.0;
    }
    let doc_len = doc_terms.len() as f64;
    let mut score = 0.0;
    for term in query_terms {
        let tf = doc_terms.iter().filter(|t| *t == term).count() as f64;
        if tf <= 0.0 {
            continue;
        }
        let denom = tf + BM25_K1 * (1.0 - BM25_B + BM25_B * (doc_len / BM25_AVG_LEN));
        score += (tf * (BM25_K1 + 1.0)) / denom.max(1e-9);
    }
    score / query_terms.len() as f64
}

fn overlap_score(query_terms: &[String], text: &str) -> f64 {
    let unique_query: HashSet<&String> = query_terms.iter().collect();
    if unique_query.is_empty() {
        return 0.0;
    }
    let doc_terms: HashSet<String> = tokenize(text).into_iter().collect();
    let hits = unique_query
        .iter()
        .filter(|term| doc_terms.contains(term.as_str()))
        .count();
    hits as f64 / unique_query.len() as f64
}
