use ndarray::{Array2, Zip};
use crate::{mode::CombinationMode, traits::CombinationRule};

/// Quorum vote: a pixel is fire when at least `quorum` masks flag it
#[derive(Debug, Clone)]
pub struct VotingRule {
    pub quorum: u32,
}

impl Default for VotingRule {
    fn default() -> Self {
        Self { quorum: 2 }
    }
}

impl VotingRule {
    /// Per-pixel count of masks that flag fire.
    pub fn tally(&self, shape: (usize, usize), masks: &[Array2<bool>]) -> Array2<u32> {
        let mut votes = Array2::<u32>::zeros(shape);
        for mask in masks {
            Zip::from(&mut votes).and(mask).for_each(|count, &fire| {
                if fire {
                    *count += 1;
                }
            });
        }
        votes
    }
}

impl CombinationRule for VotingRule {
    fn mode(&self) -> CombinationMode {
        CombinationMode::Voting
    }

    fn combine(&self, shape: (usize, usize), masks: &[Array2<bool>]) -> Array2<bool> {
        self.tally(shape, masks).mapv(|count| count >= self.quorum)
    }
}
