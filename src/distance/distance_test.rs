#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use crate::distance::{chebyshev, emd, euclidean, manhattan, DistanceKind};

    /// Test the scalar catalog on hand-checked values.
    #[test]
    fn test_scalar_values() {
        let a = [1.0f32, 2.0, 3.0];
        let b = [4.0f32, 6.0, 3.0];
        assert_approx_eq!(f32, euclidean(&a, &b), 5.0);
        assert_approx_eq!(f32, manhattan(&a, &b), 7.0);
        assert_approx_eq!(f32, chebyshev(&a, &b), 4.0);

        assert_eq!(euclidean(&a, &a), 0.0);
        assert_eq!(emd(&a, &a), 0.0);
    }

    /// Test emd as the cumulative absolute-difference distance.
    ///
    /// With centroids [2,0,0], [0,2,0], [1,1,0] and point [0,2,0], the
    /// per-centroid costs are [2, 0, 1].
    #[test]
    fn test_emd_histogram_distance() {
        let point = [0.0f32, 2.0, 0.0];
        assert_eq!(emd(&[2.0, 0.0, 0.0], &point), 2.0);
        assert_eq!(emd(&[0.0, 2.0, 0.0], &point), 0.0);
        assert_eq!(emd(&[1.0, 1.0, 0.0], &point), 1.0);
    }

    /// Test key lookup and the accelerated subset.
    #[test]
    fn test_keys_and_kernels() {
        for key in ["euclidean", "manhattan", "chebyshev", "emd"] {
            assert_eq!(DistanceKind::from_key(key).unwrap().key(), key);
        }
        assert!(DistanceKind::from_key("cosine").is_err());

        assert!(DistanceKind::Euclidean.kernel_source().is_some());
        assert!(DistanceKind::Manhattan.kernel_source().is_some());
        assert!(DistanceKind::Emd.kernel_source().is_none());
        assert!(DistanceKind::Chebyshev.kernel_source().is_none());

        // Kernel snippets define the symbol the engine splices in.
        let src = DistanceKind::Euclidean.kernel_source().unwrap();
        assert!(src.contains("point_distance"));
        assert!(src.contains("DIM"));
    }

    /// Test dispatch through the scalar function pointer.
    #[test]
    fn test_scalar_dispatch() {
        let f = DistanceKind::Manhattan.scalar();
        assert_eq!(f(&[0.0, 0.0], &[1.0, 1.0]), 2.0);
    }
}
