pub mod intersection;
pub mod voting;
pub mod union;

pub use intersection::*;
pub use voting::*;
pub use union::*;

use crate::{mode::CombinationMode, traits::CombinationRule};

/// Rule implementing `mode`; `quorum` only applies to voting.
pub fn rule_for(mode: CombinationMode, quorum: u32) -> Box<dyn CombinationRule> {
    match mode {
        CombinationMode::Intersection => Box::new(IntersectionRule),
        CombinationMode::Voting => Box::new(VotingRule { quorum }),
        CombinationMode::Union => Box::new(UnionRule),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ndarray::Array2;
    use proptest::prelude::*;

    /// A random grid shape with one to four random masks of that shape.
    pub(crate) fn mask_sets() -> impl Strategy<Value = ((usize, usize), Vec<Array2<bool>>)> {
        (1usize..6, 1usize..6, 1usize..5).prop_flat_map(|(rows, cols, count)| {
            prop::collection::vec(prop::collection::vec(any::<bool>(), rows * cols), count).prop_map(
                move |cells| {
                    let masks = cells
                        .into_iter()
                        .map(|data| Array2::from_shape_vec((rows, cols), data).unwrap())
                        .collect();
                    ((rows, cols), masks)
                },
            )
        })
    }

    #[test]
    fn test_rule_for_each_mode() {
        assert_eq!(rule_for(CombinationMode::Intersection, 2).mode(), CombinationMode::Intersection);
        assert_eq!(rule_for(CombinationMode::Voting, 2).mode(), CombinationMode::Voting);
        assert_eq!(rule_for(CombinationMode::Union, 2).mode(), CombinationMode::Union);
    }
}
