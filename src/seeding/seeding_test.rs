#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::config::Configuration;
    use crate::distance::DistanceKind;
    use crate::driver::CancelFlag;
    use crate::engine::DistanceEngine;
    use crate::error::Error;
    use crate::paths::qx_path;
    use crate::seeding::{self, mc2, SeedContext, SeederKind};
    use crate::storage::{self, DataSource, Shard, StorageFormat, SHARD_ROWS};

    /// Forty distinct rows in three loose groups.
    fn write_points(dir: &std::path::Path) -> std::path::PathBuf {
        let path = dir.join("points.parquet");
        let columns: Vec<String> = vec!["wins".into(), "losses".into(), "draws".into()];
        let rows: Vec<Vec<f32>> = (0..40)
            .map(|i| {
                let base = (i % 3) as f32 * 100.0;
                vec![base + i as f32, base + (i * 2) as f32, i as f32]
            })
            .collect();
        let shard = Shard::from_feature_rows(&columns, &rows).unwrap();
        StorageFormat::Parquet
            .write(&path, std::iter::once(Ok(shard)))
            .unwrap();
        path
    }

    fn run_seeder(kind: SeederKind, seed: u64, dir: &std::path::Path) -> crate::model::CentroidTable {
        let path = write_points(dir);
        let mut config = Configuration::new(&path, 3).with_distance(DistanceKind::Euclidean);
        config.seeder = kind;
        config.use_accelerator = false;
        config.rng_seed = Some(seed);

        let mut source = DataSource::from_path(&path).unwrap();
        source.resolve_columns(&[]).unwrap();
        let engine = DistanceEngine::new(config.distance, config.k, source.dim(), false).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        let cancel = CancelFlag::new();
        let mut ctx = SeedContext {
            config: &config,
            engine: &engine,
            source: &source,
            rng: &mut rng,
            cancel: &cancel,
        };
        seeding::seed(&mut ctx).unwrap()
    }

    /// Test that every seeder yields k distinct rows of the right shape.
    #[test]
    fn test_all_seeders_produce_k_distinct_rows() {
        for kind in [
            SeederKind::Naive,
            SeederKind::KMeansPlusPlus,
            SeederKind::KMeansParallel,
            SeederKind::Kmc2,
            SeederKind::AfkMc2,
        ] {
            let dir = tempfile::tempdir().unwrap();
            let table = run_seeder(kind, 17, dir.path());
            assert_eq!(table.k(), 3, "seeder {:?}", kind);
            assert_eq!(table.dim(), 3, "seeder {:?}", kind);
            table.ensure_distinct().unwrap();
        }
    }

    /// Test that a fixed seed reproduces seeding exactly.
    #[test]
    fn test_seeding_is_deterministic() {
        for kind in [SeederKind::KMeansPlusPlus, SeederKind::AfkMc2] {
            let dir_a = tempfile::tempdir().unwrap();
            let dir_b = tempfile::tempdir().unwrap();
            let a = run_seeder(kind, 99, dir_a.path());
            let b = run_seeder(kind, 99, dir_b.path());
            assert!(a.bitwise_eq(&b), "seeder {:?} not reproducible", kind);
        }
    }

    /// Test that afk-mc² persists q(x) and that it sums to one.
    #[test]
    fn test_afk_writes_normalized_qx() {
        let dir = tempfile::tempdir().unwrap();
        let _ = run_seeder(SeederKind::AfkMc2, 4, dir.path());

        let qx = qx_path(&dir.path().join("points.parquet"), StorageFormat::Parquet);
        assert!(qx.exists());

        let mut total = 0f64;
        let mut rows = 0u64;
        for shard in storage::open(&qx).unwrap() {
            let shard = shard.unwrap();
            let block = shard.features(&["q(x)".to_string()]).unwrap();
            rows += block.rows() as u64;
            for q in block.as_slice() {
                assert!(*q > 0.0, "q(x) must be strictly positive");
                total += f64::from(*q);
            }
        }
        assert_eq!(rows, 40);
        let eps = 1e-4 * rows as f64;
        assert!((total - 1.0).abs() <= eps, "sum q = {total}");
    }

    /// Test that a cancel request from another thread lands during seeding,
    /// at a shard boundary, instead of waiting for the seeder to finish.
    #[test]
    fn test_cancel_mid_seed_from_other_thread() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.parquet");
        let columns: Vec<String> = vec!["wins".into(), "losses".into(), "draws".into()];

        // Three shards of distinct rows; k-means++ with a large k makes the
        // seeding phase span many multi-shard passes.
        let mut remaining = SHARD_ROWS * 2 + 4096;
        let mut next = 0usize;
        let shards = std::iter::from_fn(|| {
            if remaining == 0 {
                return None;
            }
            let take = remaining.min(SHARD_ROWS);
            let rows: Vec<Vec<f32>> = (next..next + take)
                .map(|i| vec![i as f32, (i * 2) as f32, (i % 97) as f32])
                .collect();
            next += take;
            remaining -= take;
            Some(Shard::from_feature_rows(&columns, &rows))
        });
        StorageFormat::Parquet.write(&path, shards).unwrap();

        let mut config = Configuration::new(&path, 100).with_distance(DistanceKind::Euclidean);
        config.seeder = SeederKind::KMeansPlusPlus;
        config.use_accelerator = false;

        let mut source = DataSource::from_path(&path).unwrap();
        source.resolve_columns(&[]).unwrap();
        let engine = DistanceEngine::new(config.distance, config.k, source.dim(), false).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let cancel = CancelFlag::new();

        let canceller = {
            let cancel = cancel.clone();
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_millis(5));
                cancel.cancel();
            })
        };

        let mut ctx = SeedContext {
            config: &config,
            engine: &engine,
            source: &source,
            rng: &mut rng,
            cancel: &cancel,
        };
        match seeding::seed(&mut ctx) {
            Err(Error::Cancelled) => {}
            other => panic!("expected mid-seed cancellation, got {other:?}"),
        }
        canceller.join().unwrap();
    }

    /// Test the acceptance walk edge cases.
    #[test]
    fn test_chain_walk() {
        let mut rng = StdRng::seed_from_u64(1);
        // A zero-weight current state accepts whatever comes next.
        assert_eq!(mc2::walk_chain(&[0.0, 0.0, 0.0, 5.0], &mut rng), 3);
        // A single candidate is its own terminal state.
        assert_eq!(mc2::walk_chain(&[2.0], &mut rng), 0);
        // Strictly increasing weights always accept.
        assert_eq!(mc2::walk_chain(&[1.0, 2.0, 4.0, 8.0], &mut rng), 3);
    }

    /// Test seeder key parsing.
    #[test]
    fn test_seeder_keys() {
        for key in ["naive", "k-means++", "k-means||", "k-mc2", "afk-mc2"] {
            assert_eq!(SeederKind::from_key(key).unwrap().key(), key);
        }
        assert!(SeederKind::from_key("random").is_err());
    }
}
