#[derive(Debug, Clone)]
pub struct ScoreRequest {
    pub query: String,
    pub texts: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ScoreResponse {
    pub scorer: String,
    pub model: String,
    pub scores: Vec<f64>,
}
