use std::collections::VecDeque;

use crate::{
    error::{Error, Result},
    search::{Choice, SearchCoordinator},
};

/// Replays a fixed list of choices and remembers what was offered.
pub struct Script {
    picks: VecDeque<Choice>,
    pub offered: Vec<Vec<Choice>>,
}

impl Script {
    pub fn new(picks: impl IntoIterator<Item = Choice>) -> Self {
        Self {
            picks: picks.into_iter().collect(),
            offered: Vec::new(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.picks.is_empty()
    }
}

impl SearchCoordinator<Choice> for Script {
    fn choose(&mut self, candidates: &[Choice]) -> Result<Choice> {
        self.offered.push(candidates.to_vec());
        self.picks.pop_front().ok_or(Error::NoCandidates)
    }

    fn terminate(&mut self, _reward: f64) {}
}
