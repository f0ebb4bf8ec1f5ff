#[cfg(test)]
mod tests {
    use crate::model::CentroidTable;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn table(rows: &[Vec<f32>]) -> CentroidTable {
        CentroidTable::from_rows(rows, &cols(&["a", "b", "c"])).unwrap()
    }

    /// Test shape validation at construction.
    #[test]
    fn test_shape_checks() {
        assert!(CentroidTable::from_rows(&[vec![1.0, 2.0]], &cols(&["a", "b", "c"])).is_err());
        assert!(CentroidTable::from_rows(&[vec![1.0, f32::NAN, 0.0]], &cols(&["a", "b", "c"])).is_err());
        let t = table(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        assert_eq!(t.k(), 2);
        assert_eq!(t.dim(), 3);
    }

    /// Test construction-time row uniqueness.
    #[test]
    fn test_ensure_distinct() {
        let distinct = table(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        assert!(distinct.ensure_distinct().is_ok());

        let collapsed = table(&[vec![1.0, 2.0, 3.0], vec![1.0, 2.0, 3.0]]);
        assert!(collapsed.ensure_distinct().is_err());
    }

    /// Test the bitwise stabilization backstop.
    #[test]
    fn test_bitwise_eq() {
        let a = table(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        let b = table(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        assert!(a.bitwise_eq(&b));

        let c = table(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0 + 1e-6]]);
        assert!(!a.bitwise_eq(&c));

        // Negative zero differs bitwise from positive zero.
        let z0 = table(&[vec![0.0, 0.0, 0.0], vec![1.0, 1.0, 1.0]]);
        let z1 = table(&[vec![-0.0, 0.0, 0.0], vec![1.0, 1.0, 1.0]]);
        assert!(!z0.bitwise_eq(&z1));
    }

    /// Test the row-shift stabilization measure.
    #[test]
    fn test_max_row_shift() {
        let a = table(&[vec![0.0, 0.0, 0.0], vec![1.0, 1.0, 1.0]]);
        let b = table(&[vec![3.0, 4.0, 0.0], vec![1.0, 1.0, 1.0]]);
        assert_eq!(a.max_row_shift(&b), 5.0);
        assert_eq!(a.max_row_shift(&a), 0.0);
        assert_eq!(b.max_abs(), 4.0);
    }

    /// Test the flat row-major copy used for device upload.
    #[test]
    fn test_to_flat_row_major() {
        let t = table(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        assert_eq!(t.to_flat(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }
}
