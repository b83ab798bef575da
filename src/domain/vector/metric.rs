//! Distance metrics and their ranking direction

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::embedding::cosine_similarity;
use crate::domain::DomainError;

/// Which end of the score range is the better match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreOrder {
    /// Distances: smaller is closer
    LowerIsBetter,
    /// Similarities: larger is closer
    HigherIsBetter,
}

/// Function used to rank vector-store results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Euclidean distance
    L2,
    /// Dot-product similarity
    InnerProduct,
    /// Cosine similarity
    Cosine,
}

impl DistanceMetric {
    pub fn order(&self) -> ScoreOrder {
        match self {
            Self::L2 => ScoreOrder::LowerIsBetter,
            Self::InnerProduct | Self::Cosine => ScoreOrder::HigherIsBetter,
        }
    }

    /// Score `candidate` against `query` in this metric's own units
    pub fn score(&self, query: &[f32], candidate: &[f32]) -> f32 {
        match self {
            Self::L2 => euclidean_distance(query, candidate),
            Self::InnerProduct => dot_product(query, candidate),
            Self::Cosine => cosine_similarity(query, candidate),
        }
    }

    /// Orders two scores so that the better match sorts first
    ///
    /// A total order: NaN scores rank after every real score.
    pub fn compare(&self, a: f32, b: f32) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            (false, false) => {}
        }

        let ordering = a.total_cmp(&b);
        match self.order() {
            ScoreOrder::LowerIsBetter => ordering,
            ScoreOrder::HigherIsBetter => ordering.reverse(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::L2 => "l2",
            Self::InnerProduct => "ip",
            Self::Cosine => "cosine",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "l2" | "euclidean" => Ok(Self::L2),
            "ip" | "inner_product" | "dot" => Ok(Self::InnerProduct),
            "cosine" => Ok(Self::Cosine),
            other => Err(DomainError::validation(format!(
                "Unknown distance metric: {}",
                other
            ))),
        }
    }
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }

    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::NEG_INFINITY;
    }

    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
