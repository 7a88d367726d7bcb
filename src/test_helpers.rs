pub(crate) trait TestHelper {
    fn assert_approx_eq<const N: usize>(&self, expected: [f32; N]);
}

impl TestHelper for [f32] {
    fn assert_approx_eq<const N: usize>(&self, expected: [f32; N]) {
        assert_eq!(self.len(), N, "length mismatch: {} vs {N}", self.len());
        for (index, (got, want)) in self.iter().zip(expected).enumerate() {
            let tolerance = want.abs().max(1.0) * 1e-4;
            assert!(
                (got - want).abs() <= tolerance,
                "index {index}: got {got}, want {want}"
            );
        }
    }
}
