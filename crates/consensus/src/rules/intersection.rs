use ndarray::{Array2, Zip};
use crate::{mode::CombinationMode, traits::CombinationRule};

/// Logical AND over all masks, seeded all-true
#[derive(Debug, Clone, Default)]
pub struct IntersectionRule;

impl CombinationRule for IntersectionRule {
    fn mode(&self) -> CombinationMode {
        CombinationMode::Intersection
    }

    fn combine(&self, shape: (usize, usize), masks: &[Array2<bool>]) -> Array2<bool> {
        let mut accumulator = Array2::from_elem(shape, true);
        for mask in masks {
            Zip::from(&mut accumulator)
                .and(mask)
                .for_each(|acc, &fire| *acc = *acc && fire);
        }
        accumulator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::tests::mask_sets;
    use ndarray::array;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_matches_pixelwise_and((shape, masks) in mask_sets()) {
            let combined = IntersectionRule.combine(shape, &masks);
            prop_assert_eq!(combined.dim(), shape);
            for ((row, col), &fire) in combined.indexed_iter() {
                prop_assert_eq!(fire, masks.iter().all(|mask| mask[[row, col]]));
            }
        }
    }

    #[test]
    fn test_true_only_where_all_agree() {
        let masks = vec![
            array![[true, true], [false, true]],
            array![[true, false], [false, true]],
            array![[true, true], [true, true]],
        ];
        let combined = IntersectionRule.combine((2, 2), &masks);
        assert_eq!(combined, array![[true, false], [false, true]]);
    }

    #[test]
    fn test_all_true_inputs_stay_all_true() {
        let masks = vec![Array2::from_elem((2, 2), true); 3];
        let combined = IntersectionRule.combine((2, 2), &masks);
        assert!(combined.iter().all(|&fire| fire));
    }

    #[test]
    fn test_single_false_mask_clears_everything() {
        let masks = vec![
            Array2::from_elem((3, 3), true),
            Array2::from_elem((3, 3), false),
        ];
        let combined = IntersectionRule.combine((3, 3), &masks);
        assert!(combined.iter().all(|&fire| !fire));
    }
}
