//! # Permutation flow-shop model
//! This module holds the problem definition of `F|prmu|C_max` and the machinery shared by all
//! heuristics working with job sequences.
//!
//! ## Instance
//! An [Instance] is an `n x m` matrix of processing times `p[j][k]` of job `j` on machine `k`.
//!
//! ## Sequences
//! A sequence is a slice of job indices. Heuristics keep it as an explicit permutation of `0..n`
//! and never move the processing times themselves.
//!
//! ## Makespan
//! The completion time `C[i][k]` of the `i`-th job of a sequence on machine `k` is given by the
//! recurrence `C[i][k] = max(C[i-1][k], C[i][k-1]) + p[i][k]` with `C[-1][k] = C[i][-1] = 0`, and
//! the makespan of the first `l` jobs is `C[l-1][m-1]`.
use std::cmp::max;

use fixedbitset::FixedBitSet;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, Time};

/// Processing times of a permutation flow-shop problem, `p[j][k]` for job `j` and machine `k`.
///
/// The matrix is validated on construction and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance<T> {
    p: Vec<Vec<T>>,
    m: usize,
}

impl<T: Time> Instance<T> {
    /// Create new instance from the processing times `p[job][machine]`.
    ///
    /// Fails with [Error::InvalidInstance] if there are no jobs or machines, if the matrix is not
    /// rectangular, if any processing time is negative or not below [Time::inf] (which for floats
    /// also rejects NaN), or if the sum of all processing times does not fit into `T`.
    ///
    /// ## Example
    /// ```
    /// # extern crate flowshop;
    /// use flowshop::pfsp::Instance;
    ///
    /// let instance = Instance::new(vec![vec![1u8, 2], vec![3, 4], vec![5, 6]])
    ///     .expect("valid instance");
    ///
    /// assert_eq!(instance.num_jobs(), 3);
    /// assert_eq!(instance.num_machines(), 2);
    ///
    /// assert!(Instance::new(vec![vec![1u8, 2], vec![3]]).is_err());
    /// ```
    pub fn new(p: Vec<Vec<T>>) -> Result<Self> {
        let m = match p.first() {
            None => return Err(Error::InvalidInstance("there are no jobs".into())),
            Some(row) if row.is_empty() => {
                return Err(Error::InvalidInstance("there are no machines".into()))
            }
            Some(row) => row.len(),
        };

        for (j, row) in p.iter().enumerate() {
            if row.len() != m {
                return Err(Error::InvalidInstance(format!(
                    "job {j} has {} processing times, expected {m}",
                    row.len()
                )));
            }

            if let Some(k) = row.iter().position(|&p| p < T::zero() || p >= T::inf()) {
                return Err(Error::InvalidInstance(format!(
                    "invalid processing time p[{j}][{k}] = {:?}",
                    row[k]
                )));
            }
        }

        // bounds every row total and every (partial) makespan
        p.iter()
            .flatten()
            .try_fold(T::zero(), |total, &t| total.checked_add(t))
            .ok_or_else(|| {
                Error::InvalidInstance("total processing time overflows the time domain".into())
            })?;

        Ok(Self { p, m })
    }

    #[inline]
    pub fn num_jobs(&self) -> usize {
        self.p.len()
    }

    #[inline]
    pub fn num_machines(&self) -> usize {
        self.m
    }

    /// Processing times of job `j` on all machines.
    #[inline]
    pub fn job(&self, j: usize) -> Option<&[T]> {
        self.p.get(j).map(Vec::as_slice)
    }

    /// All processing times as rows indexed by jobs.
    #[inline]
    pub fn processing_times(&self) -> &[Vec<T>] {
        &self.p
    }

    /// Total processing time `sum_k p[j][k]` of job `j` (panics if `j` is not a job).
    pub fn total_time(&self, j: usize) -> T {
        self.p[j].iter().fold(T::zero(), |acc, &p| acc + p)
    }

    pub(crate) fn row(&self, j: usize) -> Result<&[T]> {
        self.job(j).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "job {j} is out of range for {} jobs",
                self.num_jobs()
            ))
        })
    }
}

/// Flow-shop schedule and corresponding makespan value
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule<T> {
    /// `s[j][k]` is the starting time of job `j` on machine `k`
    pub s: Vec<Vec<T>>,
    /// completion time of the last job on the last machine (a.k.a the **makespan**)
    pub c: T,
}

#[inline]
fn check_depth(seq: &[usize], l: usize) -> Result<()> {
    if l == 0 || l > seq.len() {
        return Err(Error::InvalidArgument(format!(
            "depth {l} is out of range 1..={}",
            seq.len()
        )));
    }
    Ok(())
}

/// Compute the makespan of the first `l` jobs of sequence `seq`.
///
/// Runs in `O(l*m)` time and keeps just a single row of completion times.
///
/// Fails with [Error::InvalidArgument] if `l` is not in `1..=seq.len()` or the prefix contains
/// a job that is not part of the instance.
///
/// ## Example
/// ```
/// # extern crate flowshop;
/// use flowshop::pfsp::{makespan, Instance};
///
/// let instance = Instance::new(vec![vec![4u32, 3], vec![2, 5]]).expect("valid instance");
///
/// assert_eq!(makespan(&instance, &[0, 1], 2), Ok(12));
/// assert_eq!(makespan(&instance, &[1, 0], 2), Ok(10));
/// assert_eq!(makespan(&instance, &[1, 0], 1), Ok(7));
/// ```
pub fn makespan<T: Time>(instance: &Instance<T>, seq: &[usize], l: usize) -> Result<T> {
    check_depth(seq, l)?;

    let m = instance.num_machines();
    let mut c = vec![T::zero(); m];

    for &j in seq[..l].iter() {
        // completion time of job j on the previous machine
        let mut prev = T::zero();
        for (c, &p) in c.iter_mut().zip(instance.row(j)?) {
            prev = max(*c, prev) + p;
            *c = prev;
        }
    }

    Ok(c[m - 1])
}

/// Compute the full table of completion times `C[i][k]` of the first `l` jobs of `seq`, where `i`
/// is the position in the sequence and `k` is a machine.
///
/// Fails under the same conditions as [makespan].
pub fn completion_times<T: Time>(
    instance: &Instance<T>,
    seq: &[usize],
    l: usize,
) -> Result<Vec<Vec<T>>> {
    check_depth(seq, l)?;

    let m = instance.num_machines();
    let p = seq[..l]
        .iter()
        .map(|&j| instance.row(j))
        .collect::<Result<Vec<_>>>()?;

    let mut c = vec![vec![T::zero(); m]; l];

    c[0][0] = p[0][0];

    // first job flows through machines without waiting
    for k in 1..m {
        c[0][k] = c[0][k - 1] + p[0][k];
    }

    // first machine processes jobs back to back
    for i in 1..l {
        c[i][0] = c[i - 1][0] + p[i][0];
    }

    // job can start on k once it leaves k - 1 and the previous job leaves k
    for i in 1..l {
        for k in 1..m {
            c[i][k] = max(c[i - 1][k], c[i][k - 1]) + p[i][k];
        }
    }

    Ok(c)
}

/// Derive the [Schedule] (starting times of each job on each machine) of a complete sequence.
///
/// Fails with [Error::InvalidArgument] if `seq` is not a permutation of the instance's jobs.
///
/// ## Example
/// ```
/// # extern crate flowshop;
/// use flowshop::pfsp::{schedule, Instance, Schedule};
///
/// let instance = Instance::new(vec![vec![4u32, 3], vec![2, 5]]).expect("valid instance");
///
/// let expected = Schedule { s: vec![vec![2, 7], vec![0, 2]], c: 10 };
/// assert_eq!(schedule(&instance, &[1, 0]), Ok(expected));
/// ```
pub fn schedule<T: Time>(instance: &Instance<T>, seq: &[usize]) -> Result<Schedule<T>> {
    let n = instance.num_jobs();
    let m = instance.num_machines();

    if !is_permutation(seq, n) {
        return Err(Error::InvalidArgument(format!(
            "sequence {seq:?} is not a permutation of {n} jobs"
        )));
    }

    let mut s = vec![vec![T::zero(); m]; n];
    let mut c = vec![T::zero(); m];

    for &j in seq.iter() {
        let mut prev = T::zero();
        for (k, &p) in instance.row(j)?.iter().enumerate() {
            s[j][k] = max(c[k], prev);
            prev = s[j][k] + p;
            c[k] = prev;
        }
    }

    Ok(Schedule { s, c: c[m - 1] })
}

/// Check that `seq` contains each job of `0..n` exactly once.
pub fn is_permutation(seq: &[usize], n: usize) -> bool {
    if seq.len() != n {
        return false;
    }
    let mut seen = FixedBitSet::with_capacity(n);
    seq.iter().all(|&j| j < n && !seen.put(j))
}

/// Move the element at position `from` to position `to` while preserving the relative order of
/// all other elements.
///
/// The element travels through a chain of adjacent swaps, so only the span between the two
/// positions is touched and the operation runs in `O(|to - from|)`. Relocating to the same
/// position is a no-op.
///
/// Fails with [Error::InvalidArgument] if any of the positions is out of bounds.
///
/// ## Example
/// ```
/// # extern crate flowshop;
/// use flowshop::pfsp::relocate;
///
/// let mut seq = vec![0, 1, 2, 3, 4];
///
/// relocate(&mut seq, 3, 0).expect("valid positions");
/// assert_eq!(seq, vec![3, 0, 1, 2, 4]);
///
/// relocate(&mut seq, 0, 3).expect("valid positions");
/// assert_eq!(seq, vec![0, 1, 2, 3, 4]);
/// ```
pub fn relocate<E>(seq: &mut [E], from: usize, to: usize) -> Result<()> {
    let n = seq.len();

    if from >= n || to >= n {
        return Err(Error::InvalidArgument(format!(
            "cannot relocate {from} -> {to} in a sequence of length {n}"
        )));
    }

    if from < to {
        for i in from..to {
            seq.swap(i, i + 1);
        }
    } else {
        for i in (to + 1..=from).rev() {
            seq.swap(i, i - 1);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;
    use ordered_float::OrderedFloat;
    use rstest::*;

    fn instance(p: &[&[u32]]) -> Instance<u32> {
        Instance::new(p.iter().map(|row| row.to_vec()).collect()).expect("valid instance")
    }

    #[rstest]
    #[case::no_jobs(vec![])]
    #[case::no_machines(vec![vec![]])]
    #[case::ragged(vec![vec![1., 2.], vec![3.]])]
    #[case::negative(vec![vec![1., -2.]])]
    #[case::infinite(vec![vec![1., f64::INFINITY]])]
    #[case::nan(vec![vec![f64::NAN, 1.]])]
    #[case::overflow(vec![vec![f64::MAX, 1.], vec![f64::MAX, 1.]])]
    fn instance_invalid(#[case] p: Vec<Vec<f64>>) {
        let p = p
            .into_iter()
            .map(|row| row.into_iter().map(OrderedFloat).collect_vec())
            .collect_vec();

        assert!(matches!(Instance::new(p), Err(Error::InvalidInstance(_))));
    }

    #[rstest]
    #[case::single_row(vec![vec![200, 100]])]
    #[case::across_rows(vec![vec![200, 27], vec![28, 1]])]
    fn instance_overflow(#[case] p: Vec<Vec<u8>>) {
        assert!(matches!(Instance::new(p), Err(Error::InvalidInstance(_))));
    }

    #[test]
    fn instance_at_capacity() {
        let instance = Instance::new(vec![vec![100u8, 27], vec![28, 100]]).expect("valid instance");
        assert_eq!(makespan(&instance, &[0, 1], 2), Ok(228));
        assert_eq!(makespan(&instance, &[1, 0], 2), Ok(155));
    }

    #[test]
    fn instance_valid() {
        let instance = instance(&[&[5, 9, 8], &[9, 3, 4], &[9, 4, 3]]);
        assert_eq!(instance.num_jobs(), 3);
        assert_eq!(instance.num_machines(), 3);
        assert_eq!(instance.job(1), Some(&[9u32, 3, 4][..]));
        assert_eq!(instance.job(3), None);
        assert_eq!(instance.total_time(0), 22);
        assert_eq!(instance.total_time(2), 16);
    }

    #[rstest]
    #[case::single(&[&[5][..]], &[0], 1, 5)]
    #[case::single_job_flows(&[&[1, 2, 3][..]], &[0], 1, 6)]
    #[case::single_machine(&[&[1][..], &[2][..], &[3][..]], &[2, 0, 1], 3, 6)]
    #[case::given(&[&[4, 3][..], &[2, 5][..]], &[0, 1], 2, 12)]
    #[case::swapped(&[&[4, 3][..], &[2, 5][..]], &[1, 0], 2, 10)]
    #[case::prefix(&[&[5, 9, 8][..], &[9, 3, 4][..], &[9, 4, 3][..]], &[0, 1, 2], 2, 26)]
    #[case::full(&[&[5, 9, 8][..], &[9, 3, 4][..], &[9, 4, 3][..]], &[0, 1, 2], 3, 30)]
    #[case::inserted_first(&[&[5, 9, 8][..], &[9, 3, 4][..], &[9, 4, 3][..]], &[2, 0, 1], 3, 35)]
    fn makespan_feasible(
        #[case] p: &[&[u32]],
        #[case] seq: &[usize],
        #[case] l: usize,
        #[case] expected: u32,
    ) {
        let instance = instance(p);
        assert_eq!(makespan(&instance, seq, l), Ok(expected));

        let c = completion_times(&instance, seq, l).expect("valid depth");
        assert_eq!(c.len(), l);
        assert_eq!(c[l - 1][instance.num_machines() - 1], expected);
    }

    #[rstest]
    #[case::zero(&[0, 1], 0)]
    #[case::too_deep(&[0, 1], 3)]
    #[case::unknown_job(&[0, 7], 2)]
    fn makespan_invalid(#[case] seq: &[usize], #[case] l: usize) {
        let instance = instance(&[&[4, 3], &[2, 5]]);
        assert!(matches!(
            makespan(&instance, seq, l),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            completion_times(&instance, seq, l),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn completion_times_table() {
        let instance = instance(&[&[4, 3], &[2, 5]]);

        let c = completion_times(&instance, &[0, 1], 2).expect("valid depth");
        assert_eq!(c, vec![vec![4, 7], vec![6, 12]]);

        let c = completion_times(&instance, &[1, 0], 2).expect("valid depth");
        assert_eq!(c, vec![vec![2, 7], vec![6, 10]]);
    }

    #[test]
    fn makespan_non_decreasing_in_depth() {
        let instance = instance(&[&[5, 9, 8, 1], &[9, 3, 4, 0], &[9, 4, 3, 2], &[0, 0, 0, 0]]);
        let seq = [3, 1, 0, 2];

        let values = (1..=seq.len())
            .map(|l| makespan(&instance, &seq, l).expect("valid depth"))
            .collect_vec();

        assert!(values.windows(2).all(|w| w[0] <= w[1]), "{values:?}");
    }

    #[test]
    fn schedule_respects_flow() {
        let instance = instance(&[&[5, 9, 8], &[9, 3, 4], &[9, 4, 3]]);
        let seq = [0, 2, 1];

        let Schedule { s, c } = schedule(&instance, &seq).expect("feasible schedule");
        assert_eq!(c, 30);

        let p = instance.processing_times();

        // each job visits machines in order
        for j in 0..3 {
            for k in 1..3 {
                assert!(s[j][k - 1] + p[j][k - 1] <= s[j][k]);
            }
        }

        // each machine processes jobs in sequence order
        for (&a, &b) in seq.iter().tuple_windows() {
            for k in 0..3 {
                assert!(s[a][k] + p[a][k] <= s[b][k]);
            }
        }
    }

    #[rstest]
    #[case(&[0, 0, 1])]
    #[case(&[0, 1])]
    #[case(&[0, 1, 3])]
    fn schedule_invalid(#[case] seq: &[usize]) {
        let instance = instance(&[&[1], &[2], &[3]]);
        assert!(matches!(
            schedule(&instance, seq),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[rstest]
    #[case(&[], 0, true)]
    #[case(&[2, 0, 1], 3, true)]
    #[case(&[2, 0, 2], 3, false)]
    #[case(&[0, 1], 3, false)]
    #[case(&[0, 1, 3], 3, false)]
    fn permutation_check(#[case] seq: &[usize], #[case] n: usize, #[case] expected: bool) {
        assert_eq!(is_permutation(seq, n), expected);
    }

    #[rstest]
    #[case::forward(1, 3, vec!['a', 'c', 'd', 'b', 'e'])]
    #[case::backward(3, 1, vec!['a', 'd', 'b', 'c', 'e'])]
    #[case::to_front(4, 0, vec!['e', 'a', 'b', 'c', 'd'])]
    #[case::to_back(0, 4, vec!['b', 'c', 'd', 'e', 'a'])]
    #[case::same(2, 2, vec!['a', 'b', 'c', 'd', 'e'])]
    fn relocate_feasible(#[case] from: usize, #[case] to: usize, #[case] expected: Vec<char>) {
        let mut seq = vec!['a', 'b', 'c', 'd', 'e'];
        relocate(&mut seq, from, to).expect("valid positions");
        assert_eq!(seq, expected);
    }

    #[rstest]
    #[case(5, 0)]
    #[case(0, 5)]
    fn relocate_infeasible(#[case] from: usize, #[case] to: usize) {
        let mut seq = vec![0, 1, 2, 3, 4];
        assert!(matches!(
            relocate(&mut seq, from, to),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(seq, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn relocate_there_and_back() {
        let original = vec![7, 3, 9, 1, 4, 0];
        for (i, j) in (0..original.len()).cartesian_product(0..original.len()) {
            let mut seq = original.clone();
            relocate(&mut seq, i, j).expect("valid positions");
            relocate(&mut seq, j, i).expect("valid positions");
            assert_eq!(seq, original, "relocate({i}, {j}) and back");
        }
    }
}
