use ndarray::{Array2, Zip};
use crate::{mode::CombinationMode, traits::CombinationRule};

/// Logical OR over all available masks
#[derive(Debug, Clone, Default)]
pub struct UnionRule;

impl CombinationRule for UnionRule {
    fn mode(&self) -> CombinationMode {
        CombinationMode::Union
    }

    fn combine(&self, shape: (usize, usize), masks: &[Array2<bool>]) -> Array2<bool> {
        let mut accumulator = Array2::from_elem(shape, false);
        for mask in masks {
            Zip::from(&mut accumulator)
                .and(mask)
                .for_each(|acc, &fire| *acc = *acc || fire);
        }
        accumulator
    }
}
