#[cfg(test)]
mod tests {
    use crate::config::Configuration;
    use crate::model::{CentroidTable, ClusterResult};

    /// Test that save-then-load yields structural equality, centroid rows
    /// float bit-exact.
    #[test]
    fn test_save_load_roundtrip() {
        let cols: Vec<String> = vec!["wins".into(), "losses".into()];
        let table = CentroidTable::from_rows(
            &[vec![0.1, 2.5e-8], vec![3.0, -0.0], vec![1.0 / 3.0, 7.25]],
            &cols,
        )
        .unwrap();
        let result = ClusterResult::new(&table, 42.75, Configuration::new("points.parquet", 3));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.points.json");
        result.save(&path).unwrap();
        let loaded = ClusterResult::load(&path).unwrap();

        assert_eq!(result, loaded);
        for (a, b) in result
            .centroids
            .iter()
            .flatten()
            .zip(loaded.centroids.iter().flatten())
        {
            assert_eq!(a.to_bits(), b.to_bits());
        }
        assert!(loaded.table().unwrap().bitwise_eq(&table));
    }
}
