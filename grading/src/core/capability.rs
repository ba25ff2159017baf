//! Capability and consistency estimates over binary trial outcomes.
//!
//! `pass@k` asks whether any of k trials succeeded; `pass^k` asks whether all
//! of them did. Both are false for an empty sequence.

/// True iff at least one outcome passed.
pub fn pass_at_k(outcomes: &[bool]) -> bool {
    outcomes.iter().any(|passed| *passed)
}

/// True iff the sequence is non-empty and every outcome passed.
pub fn pass_caret_k(outcomes: &[bool]) -> bool {
    !outcomes.is_empty() && outcomes.iter().all(|passed| *passed)
}

/// Probability that at least one of `k` samples drawn without replacement from
/// `n` (of which `c` are correct) is correct: `1 - C(n-c, k) / C(n, k)`.
///
/// Computed in floating point; large inputs are approximate.
pub fn pass_at_k_probability(n: usize, c: usize, k: usize) -> f64 {
    if n == 0 || k > n || c == 0 {
        return 0.0;
    }
    if n.saturating_sub(c) < k {
        return 1.0;
    }
    let denominator = binomial(n, k);
    if denominator == 0.0 {
        return 0.0;
    }
    1.0 - binomial(n - c, k) / denominator
}

/// Derive `n` and `c` from the outcome sequence and estimate pass@k.
pub fn estimate_pass_at_k(outcomes: &[bool], k: usize) -> f64 {
    let n = outcomes.len();
    let c = outcomes.iter().filter(|passed| **passed).count();
    pass_at_k_probability(n, c, k)
}

/// Multiplicative binomial coefficient in floating point.
fn binomial(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    let mut result = 1.0_f64;
    for i in 0..k {
        result *= (n - i) as f64;
        result /= (i + 1) as f64;
    }
    result
}
