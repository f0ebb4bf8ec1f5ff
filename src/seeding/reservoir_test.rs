#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::driver::CancelFlag;
    use crate::error::Error;
    use crate::seeding::reservoir::{self, WeightedReservoir};
    use crate::seeding::SampleSpace;
    use crate::storage::FeatureBlock;

    fn block(n: usize) -> FeatureBlock {
        let rows: Vec<Vec<f32>> = (0..n).map(|i| vec![i as f32, (i * 2) as f32]).collect();
        FeatureBlock::from_rows(&rows).unwrap()
    }

    /// Test the uniform sampler: size caps and determinism.
    #[test]
    fn test_uniform_sizes() {
        let data = block(100);
        let space = SampleSpace::Memory(&data);
        let cancel = CancelFlag::new();

        let mut rng = StdRng::seed_from_u64(7);
        let sample = reservoir::uniform(&space, 10, &mut rng, &cancel).unwrap();
        assert_eq!(sample.len(), 10);

        // Without replacement the sample is capped by the population.
        let small = block(4);
        let small_space = SampleSpace::Memory(&small);
        let mut rng = StdRng::seed_from_u64(7);
        let sample = reservoir::uniform(&small_space, 10, &mut rng, &cancel).unwrap();
        assert_eq!(sample.len(), 4);

        // Same seed, same sample.
        let mut a = StdRng::seed_from_u64(11);
        let mut b = StdRng::seed_from_u64(11);
        assert_eq!(
            reservoir::uniform(&space, 5, &mut a, &cancel).unwrap(),
            reservoir::uniform(&space, 5, &mut b, &cancel).unwrap()
        );
    }

    /// Test with-replacement sampling: exact size even past the population.
    #[test]
    fn test_sample_with_replacement() {
        let data = block(5);
        let space = SampleSpace::Memory(&data);
        let cancel = CancelFlag::new();

        let mut rng = StdRng::seed_from_u64(3);
        let sample = reservoir::sample_with_replacement(&space, 12, &mut rng, &cancel).unwrap();
        assert_eq!(sample.len(), 12);
        for row in &sample {
            assert!(data.iter_rows().any(|r| r == row.as_slice()));
        }

        // Draw order is reproducible.
        let mut a = StdRng::seed_from_u64(9);
        let mut b = StdRng::seed_from_u64(9);
        assert_eq!(
            reservoir::sample_with_replacement(&space, 8, &mut a, &cancel).unwrap(),
            reservoir::sample_with_replacement(&space, 8, &mut b, &cancel).unwrap()
        );
    }

    /// Test that a set flag stops a sampling pass at the block boundary.
    #[test]
    fn test_sampling_observes_cancellation() {
        let data = block(50);
        let space = SampleSpace::Memory(&data);
        let cancel = CancelFlag::new();
        cancel.cancel();

        let mut rng = StdRng::seed_from_u64(1);
        match reservoir::uniform(&space, 5, &mut rng, &cancel) {
            Err(Error::Cancelled) => {}
            other => panic!("expected cancellation, got {other:?}"),
        }
        match reservoir::sample_with_replacement(&space, 5, &mut rng, &cancel) {
            Err(Error::Cancelled) => {}
            other => panic!("expected cancellation, got {other:?}"),
        }
    }

    /// Test the weighted reservoir: capacity bound and zero-weight exclusion.
    #[test]
    fn test_weighted_capacity_and_zero_weights() {
        let data = block(50);
        let mut weights = vec![1.0f32; 50];
        weights[10] = 0.0;
        weights[20] = 0.0;

        let mut res = WeightedReservoir::new(8);
        res.observe_block(&data, &weights, 42);
        assert_eq!(res.len(), 8);

        let zero_row_a = data.row(10).to_vec();
        let zero_row_b = data.row(20).to_vec();
        for item in res.into_sorted() {
            assert_ne!(item.row, zero_row_a);
            assert_ne!(item.row, zero_row_b);
        }

        // All weights zero: nothing enters.
        let mut empty = WeightedReservoir::new(4);
        empty.observe_block(&data, &vec![0.0; 50], 42);
        assert!(empty.is_empty());
    }

    /// Test that overwhelming weight dominates the selection.
    #[test]
    fn test_weighted_prefers_heavy_rows() {
        let data = block(3);
        let weights = [1e-6f32, 1e6, 1e-6];

        let mut res = WeightedReservoir::new(1);
        res.observe_block(&data, &weights, 5);
        let picked = res.into_sorted();
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].row, data.row(1).to_vec());
        assert_eq!(picked[0].weight, 1e6);
    }

    /// Test merge determinism across repeated observations with fixed seeds.
    #[test]
    fn test_weighted_deterministic() {
        let data = block(200);
        let weights: Vec<f32> = (0..200).map(|i| (i + 1) as f32).collect();

        let run = || {
            let mut res = WeightedReservoir::new(16);
            res.observe_block(&data, &weights, 1234);
            res.into_sorted()
                .into_iter()
                .map(|item| item.row)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
