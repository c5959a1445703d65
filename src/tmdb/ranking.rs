//! Choosing one catalog entry out of a list of search hits.
use std::fmt::Debug;
use std::sync::Arc;

use crate::models::SearchCandidate;

pub trait RankingPolicy: Send + Sync + Debug {
    fn pick<'a>(&self, candidates: &'a [SearchCandidate]) -> Option<&'a SearchCandidate>;
}

/// Trusts TMDB's own ordering.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstResult;

impl RankingPolicy for FirstResult {
    fn pick<'a>(&self, candidates: &'a [SearchCandidate]) -> Option<&'a SearchCandidate> {
        candidates.first()
    }
}

/// Highest `popularity` wins; ties go to the earlier hit.
#[derive(Debug, Clone, Copy, Default)]
pub struct MostPopular;

impl RankingPolicy for MostPopular {
    fn pick<'a>(&self, candidates: &'a [SearchCandidate]) -> Option<&'a SearchCandidate> {
        candidates.iter().fold(None, |best, c| match best {
            Some(b) if b.popularity >= c.popularity => Some(b),
            _ => Some(c),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Ranking {
    #[default]
    First,
    Popularity,
}

impl Ranking {
    pub fn policy(self) -> Arc<dyn RankingPolicy> {
        match self {
            Ranking::First => Arc::new(FirstResult),
            Ranking::Popularity => Arc::new(MostPopular),
        }
    }
}
