// ============================================================
// Layer 3 — Kendall Tau Metric
// ============================================================
// Compares predicted notebook orders with the true ones.
//
// For each notebook the predicted cell ids are mapped to their
// ground-truth positions; the number of inversions in that
// sequence is the number of adjacent swaps needed to fix it.
// Inversions are summed over all notebooks and normalised:
//
//   tau = 1 - 4 * Σ inversions / Σ n(n-1)
//
// 1 means every notebook is in the right order, -1 means every
// notebook is exactly reversed.

use anyhow::{anyhow, bail, Result};
use std::collections::HashMap;

use crate::domain::cell::NotebookOrders;

/// Number of pairs (i, j) with i < j and a[i] > a[j].
pub fn count_inversions(a: &[usize]) -> usize {
    let mut inversions = 0;
    let mut sorted_so_far: Vec<usize> = Vec::with_capacity(a.len());
    for (i, &u) in a.iter().enumerate() {
        // first index whose value is greater than u
        let j = sorted_so_far.partition_point(|&x| x <= u);
        inversions += i - j;
        sorted_so_far.insert(j, u);
    }
    inversions
}

/// Aggregate Kendall tau over a set of (ground truth, prediction) pairs.
pub fn kendall_tau<S: AsRef<str>>(pairs: &[(Vec<S>, Vec<S>)]) -> Result<f64> {
    let mut total_inversions = 0usize;
    let mut total_2max = 0usize;

    for (truth, pred) in pairs {
        let position: HashMap<&str, usize> = truth
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_ref(), i))
            .collect();

        let ranks = pred
            .iter()
            .map(|id| {
                position
                    .get(id.as_ref())
                    .copied()
                    .ok_or_else(|| anyhow!("cell '{}' is not in the ground-truth order", id.as_ref()))
            })
            .collect::<Result<Vec<usize>>>()?;

        total_inversions += count_inversions(&ranks);
        let n = truth.len();
        total_2max += n * n.saturating_sub(1);
    }

    if total_2max == 0 {
        bail!("kendall tau needs at least one notebook with two or more cells");
    }
    Ok(1.0 - 4.0 * total_inversions as f64 / total_2max as f64)
}

/// Score predicted orders against the ground-truth order table.
pub fn score_orders(
    truth:     &NotebookOrders,
    predicted: &[(String, Vec<String>)],
) -> Result<f64> {
    let pairs = predicted
        .iter()
        .map(|(id, order)| {
            let gt = truth
                .get(id)
                .ok_or_else(|| anyhow!("notebook '{id}' has no ground-truth order"))?;
            Ok((gt.clone(), order.clone()))
        })
        .collect::<Result<Vec<_>>>()?;
    kendall_tau(&pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn inversions_of_sorted_and_reversed() {
        assert_eq!(count_inversions(&[0, 1, 2, 3]), 0);
        assert_eq!(count_inversions(&[3, 2, 1, 0]), 6);
        assert_eq!(count_inversions(&[1, 0, 2]), 1);
        assert_eq!(count_inversions(&[]), 0);
    }

    #[test]
    fn identical_order_scores_one() {
        let tau = kendall_tau(&[(ids("a b c"), ids("a b c"))]).unwrap();
        assert_eq!(tau, 1.0);
    }

    #[test]
    fn reversed_order_scores_minus_one() {
        let tau = kendall_tau(&[(ids("a b c"), ids("c b a"))]).unwrap();
        assert_eq!(tau, -1.0);
    }

    #[test]
    fn score_aggregates_across_notebooks() {
        // 1 inversion out of n(n-1)=6, plus a perfect 2-cell notebook (2)
        let tau = kendall_tau(&[
            (ids("a b c"), ids("b a c")),
            (ids("x y"), ids("x y")),
        ])
        .unwrap();
        assert!((tau - (1.0 - 4.0 / 8.0)).abs() < 1e-12);
    }

    #[test]
    fn score_is_bounded_for_all_permutations() {
        let truth = ids("a b c d");
        let mut perm = truth.clone();
        // walk every permutation of four ids via Heap's algorithm
        fn heap(k: usize, v: &mut Vec<String>, truth: &[String]) {
            if k == 1 {
                let tau = kendall_tau(&[(truth.to_vec(), v.clone())]).unwrap();
                assert!((-1.0..=1.0).contains(&tau), "tau {tau} out of range");
                return;
            }
            for i in 0..k {
                heap(k - 1, v, truth);
                let j = if k % 2 == 0 { i } else { 0 };
                v.swap(j, k - 1);
            }
        }
        heap(perm.len(), &mut perm, &truth);
    }

    #[test]
    fn unknown_predicted_id_is_an_error() {
        assert!(kendall_tau(&[(ids("a b"), ids("a z"))]).is_err());
    }

    #[test]
    fn empty_input_is_an_error() {
        let pairs: Vec<(Vec<String>, Vec<String>)> = Vec::new();
        assert!(kendall_tau(&pairs).is_err());
    }

    #[test]
    fn score_orders_looks_up_notebooks() {
        let mut truth = NotebookOrders::new();
        truth.insert("nb".into(), ids("a b c"));
        let tau = score_orders(&truth, &[("nb".into(), ids("a b c"))]).unwrap();
        assert_eq!(tau, 1.0);
        assert!(score_orders(&truth, &[("other".into(), ids("a"))]).is_err());
    }
}
