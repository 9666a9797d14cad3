//! Multiple-testing correction.

/// Benjamini-Hochberg adjusted p-values (q-values), in input order.
///
/// Ranks ascending p with ties broken by position, scales each by
/// `m / rank`, then takes the running minimum from the largest rank down so
/// the result is monotone in p. Values are capped at 1.
pub fn benjamini_hochberg(p_values: &[f64]) -> Vec<f64> {
    let m = p_values.len();
    if m == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]).then(a.cmp(&b)));

    let mut q = vec![1.0; m];
    let mut running = 1.0_f64;
    for (rank0, &idx) in order.iter().enumerate().rev() {
        let adjusted = (p_values[idx] * m as f64 / (rank0 + 1) as f64).min(1.0);
        running = running.min(adjusted);
        q[idx] = running;
    }
    q
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-12)
    }

    #[test]
    fn test_bh_known_values() {
        let p = [0.01, 0.04, 0.03, 0.005];
        let q = benjamini_hochberg(&p);
        println!("[AFTER] p={:?} q={:?}", p, q);
        assert!(close(&q, &[0.02, 0.04, 0.04, 0.02]));
        println!("[VERIFIED] step-up adjustment with running minimum");
    }

    #[test]
    fn test_bh_is_monotone_and_capped() {
        let p = [0.9, 0.2, 0.8, 0.5, 0.7];
        let q = benjamini_hochberg(&p);
        assert!(q.iter().all(|&v| v <= 1.0));
        let mut pairs: Vec<(f64, f64)> = p.iter().copied().zip(q.iter().copied()).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        assert!(pairs.windows(2).all(|w| w[0].1 <= w[1].1));
        assert!(q.iter().zip(&p).all(|(q, p)| q >= p));
    }

    #[test]
    fn test_bh_edge_cases() {
        assert!(benjamini_hochberg(&[]).is_empty());
        assert_eq!(benjamini_hochberg(&[0.3]), vec![0.3]);
        assert_eq!(benjamini_hochberg(&[1.0, 1.0]), vec![1.0, 1.0]);
    }
}
