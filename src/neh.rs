//! # NEH heuristic
//! The *Nawaz–Enscore–Ham* heuristic builds a job sequence for `F|prmu|C_max` by insertion.
//!
//! ## Initial ordering
//! Jobs are sorted by their total processing time `sum_k p[j][k]` in non-increasing order. Ties
//! are resolved deterministically by the original job index (see [TieBreak]). The better of the
//! two orderings of the first two jobs is then kept.
//!
//! ## Insertion
//! For each depth `l = 3, 4, ...` the job at position `l - 1` is tried at every position `0..l` of
//! the partial sequence and left at the position with the minimal partial makespan of the first
//! `l` jobs (the first such position on ties). Jobs already placed are only shifted to make room,
//! there is no backtracking.
//!
//! The number of depths is given by [InsertionDepth] and the way trial positions are scored by
//! [Evaluation].
//!
//! ## Complexity
//! With [Evaluation::Recurrence] every trial recomputes the partial makespan, which gives
//! `O(n^3*m)` in total. [Evaluation::Accelerated] scores all positions of a depth at once in
//! `O(n*m)` using Taillard's head and tail tables, which gives `O(n^2*m)`.
use std::cmp::max;
use std::time::{Duration, Instant};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::monitor::{DepthEvent, InsertionMonitor, NoOpMonitor, SearchCommand};
use crate::pfsp::{is_permutation, makespan, relocate, schedule, Instance, Schedule};
use crate::{Error, Result, Time};

/// Resolution of equal total processing times in the initial ordering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// jobs with equal total time keep ascending order of their indices
    #[default]
    LowestIndex,
    /// jobs with equal total time are ordered by descending indices
    HighestIndex,
}

/// Range of insertion depths.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsertionDepth {
    /// depths `3..n`, the last job of the initial ordering keeps the last position
    #[default]
    Reference,
    /// depths `3..=n`, every job beyond the first two is inserted
    Full,
}

/// Scoring of trial positions at a single insertion depth.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Evaluation {
    /// move the job through all positions and evaluate the recurrence for each of them
    #[default]
    Recurrence,
    /// evaluate all positions from head and tail completion times (Taillard's acceleration)
    ///
    /// Yields the same partial makespans as [Evaluation::Recurrence]. Floating point times may
    /// round differently though, which can change the winner of an exact tie.
    Accelerated,
}

/// Configuration of the [Neh] heuristic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NehConfig {
    pub tie_break: TieBreak,
    pub depth: InsertionDepth,
    pub evaluation: Evaluation,
}

/// Data structure holding resulting job `sequence` and its makespan `value`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution<T> {
    /// permutation of jobs, `sequence[i]` is the job processed `i`-th on every machine
    pub sequence: Vec<usize>,
    /// makespan of the complete sequence
    pub value: T,
}

impl<T: Time> Solution<T> {
    /// Starting times of all jobs on all machines for this solution.
    pub fn schedule(&self, instance: &Instance<T>) -> Result<Schedule<T>> {
        schedule(instance, &self.sequence)
    }
}

/// Data structure that contains various statistics collected during a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// number of jobs of the instance
    pub num_jobs: usize,
    /// number of machines of the instance
    pub num_machines: usize,
    /// no. evaluated (partial) makespans
    pub evaluations: u64,
    /// no. completed insertion depths
    pub depths: usize,
    /// elapsed time since the run started
    pub elapsed: Duration,
    /// reason of an early termination requested by a monitor
    pub termination: Option<String>,
}

impl Stats {
    /// True iff all insertion depths have been completed.
    pub fn is_complete(&self) -> bool {
        self.termination.is_none()
    }
}

/// NEH heuristic for `F|prmu|C_max` with given [NehConfig].
///
/// ## Example
/// ```
/// # extern crate flowshop;
/// use flowshop::neh::{Neh, NehConfig};
/// use flowshop::pfsp::Instance;
///
/// let p: Vec<Vec<u32>> = vec![vec![5, 9, 8], vec![9, 3, 4], vec![9, 4, 3]];
/// let instance = Instance::new(p).expect("valid instance");
///
/// let (solution, stats) = Neh::new(NehConfig::default())
///     .solve(&instance)
///     .expect("feasible solution");
///
/// assert_eq!(solution.sequence, vec![0, 1, 2]);
/// assert_eq!(solution.value, 30);
/// assert!(stats.is_complete());
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Neh {
    config: NehConfig,
}

impl Neh {
    pub fn new(config: NehConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NehConfig {
        &self.config
    }

    /// Run the complete heuristic (initial ordering and insertion) on given instance.
    pub fn solve<T: Time>(&self, instance: &Instance<T>) -> Result<(Solution<T>, Stats)> {
        self.solve_with(instance, &mut NoOpMonitor)
    }

    /// Run the complete heuristic reporting to and controlled by given `monitor`.
    pub fn solve_with<T, M>(
        &self,
        instance: &Instance<T>,
        monitor: &mut M,
    ) -> Result<(Solution<T>, Stats)>
    where
        T: Time,
        M: InsertionMonitor<T> + ?Sized,
    {
        let start = Instant::now();

        let mut search = Search::new(instance, sort_by_total_time(instance, self.config.tie_break));
        search.order_first_pair()?;

        self.run(search, monitor, start)
    }

    /// Run just the insertion phase starting from given `seed` sequence.
    ///
    /// Fails with [Error::PreconditionViolation] if the seed has fewer than two jobs and with
    /// [Error::InvalidArgument] if it is not a permutation of the instance's jobs.
    pub fn construct<T: Time>(
        &self,
        instance: &Instance<T>,
        seed: Vec<usize>,
    ) -> Result<(Solution<T>, Stats)> {
        self.construct_with(instance, seed, &mut NoOpMonitor)
    }

    /// Run just the insertion phase reporting to and controlled by given `monitor`.
    pub fn construct_with<T, M>(
        &self,
        instance: &Instance<T>,
        seed: Vec<usize>,
        monitor: &mut M,
    ) -> Result<(Solution<T>, Stats)>
    where
        T: Time,
        M: InsertionMonitor<T> + ?Sized,
    {
        let start = Instant::now();

        if seed.len() < 2 {
            return Err(Error::PreconditionViolation(format!(
                "insertion needs at least 2 jobs, got {}",
                seed.len()
            )));
        }

        if !is_permutation(&seed, instance.num_jobs()) {
            return Err(Error::InvalidArgument(format!(
                "seed {seed:?} is not a permutation of {} jobs",
                instance.num_jobs()
            )));
        }

        self.run(Search::new(instance, seed), monitor, start)
    }

    fn run<T, M>(
        &self,
        mut search: Search<'_, T>,
        monitor: &mut M,
        start: Instant,
    ) -> Result<(Solution<T>, Stats)>
    where
        T: Time,
        M: InsertionMonitor<T> + ?Sized,
    {
        let instance = search.instance;
        let n = instance.num_jobs();

        monitor.on_start(instance, &search.seq);

        let mut depths = 0;
        let mut termination = None;

        // one or two jobs are already settled by the initial ordering
        if n >= 3 {
            let last = match self.config.depth {
                InsertionDepth::Reference => n - 1,
                InsertionDepth::Full => n,
            };

            for l in 3..=last {
                if let SearchCommand::Terminate(reason) = monitor.search_command() {
                    termination = Some(reason);
                    break;
                }

                let event = match self.config.evaluation {
                    Evaluation::Recurrence => search.insert(l)?,
                    Evaluation::Accelerated => search.insert_accelerated(l)?,
                };

                depths += 1;
                monitor.on_depth(&event);
            }
        }

        let value = search.makespan(n)?;

        let stats = Stats {
            num_jobs: n,
            num_machines: instance.num_machines(),
            evaluations: search.evaluations,
            depths,
            elapsed: start.elapsed(),
            termination,
        };

        let solution = Solution {
            sequence: search.seq,
            value,
        };

        monitor.on_finish(&solution, &stats);

        Ok((solution, stats))
    }
}

/// Run the NEH heuristic with default configuration.
///
/// ## Example
/// ```
/// # extern crate flowshop;
/// use flowshop::pfsp::Instance;
/// use flowshop::neh::neh;
/// use ordered_float::OrderedFloat;
///
/// let instance = Instance::new(vec![vec![OrderedFloat(5.)]]).expect("valid instance");
/// let solution = neh(&instance).expect("feasible solution");
///
/// assert_eq!(solution.sequence, vec![0]);
/// assert_eq!(solution.value, OrderedFloat(5.));
/// ```
pub fn neh<T: Time>(instance: &Instance<T>) -> Result<Solution<T>> {
    Neh::default().solve(instance).map(|(solution, _)| solution)
}

/// Initial ordering of the NEH heuristic: all jobs sorted by non-increasing total processing
/// time with `tie_break` applied to equal totals, and with the better ordering of the first two
/// jobs.
///
/// The first two jobs are swapped unless the sorted order is strictly better.
///
/// ## Example
/// ```
/// # extern crate flowshop;
/// use flowshop::neh::{initial_order, TieBreak};
/// use flowshop::pfsp::Instance;
///
/// let instance = Instance::new(vec![vec![4u32, 3], vec![2, 5]]).expect("valid instance");
///
/// assert_eq!(initial_order(&instance, TieBreak::LowestIndex), Ok(vec![1, 0]));
/// ```
pub fn initial_order<T: Time>(instance: &Instance<T>, tie_break: TieBreak) -> Result<Vec<usize>> {
    let mut search = Search::new(instance, sort_by_total_time(instance, tie_break));
    search.order_first_pair()?;
    Ok(search.seq)
}

/// Sort jobs in non-increasing order of their total processing times - O(n*log(n))
fn sort_by_total_time<T: Time>(instance: &Instance<T>, tie_break: TieBreak) -> Vec<usize> {
    let totals = (0..instance.num_jobs())
        .map(|j| instance.total_time(j))
        .collect_vec();

    (0..instance.num_jobs())
        .sorted_by(|&a, &b| {
            totals[b].cmp(&totals[a]).then_with(|| match tie_break {
                TieBreak::LowestIndex => a.cmp(&b),
                TieBreak::HighestIndex => b.cmp(&a),
            })
        })
        .collect()
}

/// Working state of a single run: the instance, current sequence and evaluation counter.
struct Search<'a, T> {
    instance: &'a Instance<T>,
    seq: Vec<usize>,
    evaluations: u64,
}

impl<'a, T: Time> Search<'a, T> {
    fn new(instance: &'a Instance<T>, seq: Vec<usize>) -> Self {
        Self {
            instance,
            seq,
            evaluations: 0,
        }
    }

    #[inline]
    fn makespan(&mut self, l: usize) -> Result<T> {
        self.evaluations += 1;
        makespan(self.instance, &self.seq, l)
    }

    fn order_first_pair(&mut self) -> Result<()> {
        if self.seq.len() < 2 {
            return Ok(());
        }

        let given = self.makespan(2)?;
        self.seq.swap(0, 1);
        let swapped = self.makespan(2)?;

        // swap back only if the original order was strictly better
        if given < swapped {
            self.seq.swap(0, 1);
        }

        Ok(())
    }

    /// Move the job at position `l - 1` through all positions `0..l`, evaluating each of them, and
    /// leave it at the best one.
    fn insert(&mut self, l: usize) -> Result<DepthEvent<T>> {
        let mut cur = l - 1;
        let job = self.seq[cur];

        let mut trials = Vec::with_capacity(l);

        for i in 0..l {
            relocate(&mut self.seq, cur, i)?;
            cur = i;
            trials.push(self.makespan(l)?);
        }

        let position = best_position(&trials, l)?;
        relocate(&mut self.seq, cur, position)?;

        Ok(DepthEvent {
            depth: l,
            job,
            position,
            value: trials[position],
            trials,
        })
    }

    /// Same as [Search::insert] but all positions are scored from the head `e`, tail `q` and
    /// forward `f` completion times of the `l - 1` jobs in front of the inserted one:
    ///  - `e[i][k] = max(e[i-1][k], e[i][k-1]) + p[i][k]`
    ///  - `q[i][k] = max(q[i+1][k], q[i][k+1]) + p[i][k]`
    ///  - `f[i][k] = max(f[i][k-1], e[i-1][k]) + p[job][k]`
    ///
    /// Makespan with the job at position `i` is then `max_k f[i][k] + q[i][k]`.
    fn insert_accelerated(&mut self, l: usize) -> Result<DepthEvent<T>> {
        let instance = self.instance;
        let m = instance.num_machines();
        let job = self.seq[l - 1];

        let p = self.seq[..l - 1]
            .iter()
            .map(|&j| instance.row(j))
            .collect::<Result<Vec<_>>>()?;
        let p_job = instance.row(job)?;

        let zero = T::zero();

        let mut e = vec![vec![zero; m]; l - 1];
        for i in 0..l - 1 {
            for k in 0..m {
                let above = if i > 0 { e[i - 1][k] } else { zero };
                let left = if k > 0 { e[i][k - 1] } else { zero };
                e[i][k] = max(above, left) + p[i][k];
            }
        }

        // q[l - 1] stays zero: nothing follows the job inserted at the end
        let mut q = vec![vec![zero; m]; l];
        for i in (0..l - 1).rev() {
            for k in (0..m).rev() {
                let right = if k + 1 < m { q[i][k + 1] } else { zero };
                q[i][k] = max(q[i + 1][k], right) + p[i][k];
            }
        }

        let mut f = vec![zero; m];
        let trials = (0..l)
            .map(|i| {
                let mut prev = zero;
                for k in 0..m {
                    let above = if i > 0 { e[i - 1][k] } else { zero };
                    prev = max(prev, above) + p_job[k];
                    f[k] = prev;
                }
                f.iter().zip(q[i].iter()).map(|(&f, &q)| f + q).fold(zero, max)
            })
            .collect_vec();

        self.evaluations += l as u64;

        let position = best_position(&trials, l)?;
        relocate(&mut self.seq, l - 1, position)?;

        Ok(DepthEvent {
            depth: l,
            job,
            position,
            value: trials[position],
            trials,
        })
    }
}

/// First position with the minimal partial makespan.
#[inline]
fn best_position<T: Time>(trials: &[T], l: usize) -> Result<usize> {
    trials
        .iter()
        .position_min()
        .ok_or_else(|| Error::InvalidArgument(format!("no trial positions at depth {l}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordered_float::OrderedFloat;
    use rstest::*;

    const CLASSIC: [[u32; 3]; 3] = [[5, 9, 8], [9, 3, 4], [9, 4, 3]];

    fn instance<const M: usize>(p: &[[u32; M]]) -> Instance<u32> {
        Instance::new(p.iter().map(|row| row.to_vec()).collect()).expect("valid instance")
    }

    #[test]
    fn trivial_instance() {
        let instance = Instance::new(vec![vec![OrderedFloat(5.0)]]).expect("valid instance");

        let (solution, stats) = Neh::default().solve(&instance).expect("feasible solution");

        assert_eq!(solution.sequence, vec![0]);
        assert_eq!(solution.value, OrderedFloat(5.0));
        assert_eq!(stats.depths, 0);
        assert_eq!(stats.evaluations, 1);
    }

    #[test]
    fn two_jobs_are_swapped() {
        let instance = instance(&[[4, 3], [2, 5]]);

        let (solution, stats) = Neh::default().solve(&instance).expect("feasible solution");

        assert_eq!(solution.sequence, vec![1, 0]);
        assert_eq!(solution.value, 10);
        assert_eq!(stats.depths, 0);
        // two for the first pair and the final evaluation
        assert_eq!(stats.evaluations, 3);
    }

    #[test]
    fn largest_fitting_instance() {
        // all processing times sum up to u8::MAX
        let instance = Instance::new(vec![vec![100u8, 27], vec![28, 100]]).expect("valid instance");

        let solution = neh(&instance).expect("feasible solution");

        assert_eq!(solution.sequence, vec![1, 0]);
        assert_eq!(solution.value, 155);

        let config = NehConfig {
            depth: InsertionDepth::Full,
            evaluation: Evaluation::Accelerated,
            ..Default::default()
        };
        let instance = Instance::new(vec![vec![60u8, 20], vec![10, 50], vec![40, 30], vec![25, 20]])
            .expect("valid instance");

        let (solution, _) = Neh::new(config).solve(&instance).expect("feasible solution");
        assert!(is_permutation(&solution.sequence, 4));
        assert_eq!(makespan(&instance, &solution.sequence, 4), Ok(solution.value));
    }

    #[test]
    fn equal_first_pair_prefers_swapped() {
        // both orders yield makespan 4
        let instance = instance(&[[2, 2], [2, 2]]);
        assert_eq!(initial_order(&instance, TieBreak::LowestIndex), Ok(vec![1, 0]));
    }

    #[rstest]
    #[case::lowest(TieBreak::LowestIndex, vec![0, 1, 2])]
    #[case::highest(TieBreak::HighestIndex, vec![0, 2, 1])]
    fn classic_initial_order(#[case] tie_break: TieBreak, #[case] expected: Vec<usize>) {
        let instance = instance(&CLASSIC);
        assert_eq!(initial_order(&instance, tie_break), Ok(expected));
    }

    #[rstest]
    #[case::reference_lowest(TieBreak::LowestIndex, InsertionDepth::Reference, vec![0, 1, 2], 0)]
    #[case::reference_highest(TieBreak::HighestIndex, InsertionDepth::Reference, vec![0, 2, 1], 0)]
    #[case::full_lowest(TieBreak::LowestIndex, InsertionDepth::Full, vec![0, 2, 1], 1)]
    #[case::full_highest(TieBreak::HighestIndex, InsertionDepth::Full, vec![0, 1, 2], 1)]
    fn classic_instance(
        #[case] tie_break: TieBreak,
        #[case] depth: InsertionDepth,
        #[case] sequence: Vec<usize>,
        #[case] depths: usize,
    ) {
        let instance = instance(&CLASSIC);

        for evaluation in [Evaluation::Recurrence, Evaluation::Accelerated] {
            let config = NehConfig {
                tie_break,
                depth,
                evaluation,
            };

            let (solution, stats) = Neh::new(config).solve(&instance).expect("feasible solution");

            assert_eq!(solution.sequence, sequence);
            assert_eq!(solution.value, 30);
            assert_eq!(stats.depths, depths);
            assert!(stats.is_complete());
        }
    }

    #[test]
    fn full_depth_trials() {
        let instance = instance(&CLASSIC);
        let mut search = Search::new(&instance, vec![0, 1, 2]);

        let event = search.insert(3).expect("valid depth");

        assert_eq!(event.job, 2);
        assert_eq!(event.trials, vec![35, 30, 30]);
        assert_eq!(event.position, 1);
        assert_eq!(event.value, 30);
        assert_eq!(search.seq, vec![0, 2, 1]);
        assert_eq!(search.evaluations, 3);
    }

    #[test]
    fn accelerated_trials_match_recurrence() {
        let instance = instance(&[[3, 1, 4, 1], [5, 9, 2, 6], [5, 3, 5, 8], [9, 7, 9, 3], [2, 3, 8, 4]]);

        for l in 3..=5 {
            let seed = vec![4, 2, 0, 3, 1];

            let mut plain = Search::new(&instance, seed.clone());
            let mut fast = Search::new(&instance, seed);

            let expected = plain.insert(l).expect("valid depth");
            let actual = fast.insert_accelerated(l).expect("valid depth");

            assert_eq!(expected, actual, "depth {l}");
            assert_eq!(plain.seq, fast.seq, "depth {l}");
        }
    }

    #[rstest]
    #[case(vec![])]
    #[case(vec![0])]
    fn construct_needs_two_jobs(#[case] seed: Vec<usize>) {
        let instance = instance(&[[1, 2]]);
        assert!(matches!(
            Neh::default().construct(&instance, seed),
            Err(Error::PreconditionViolation(_))
        ));
    }

    #[rstest]
    #[case(vec![0, 0, 1])]
    #[case(vec![0, 1])]
    #[case(vec![0, 1, 3])]
    fn construct_needs_permutation(#[case] seed: Vec<usize>) {
        let instance = instance(&CLASSIC);
        assert!(matches!(
            Neh::default().construct(&instance, seed),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn construct_from_seed() {
        let instance = instance(&CLASSIC);
        let config = NehConfig {
            depth: InsertionDepth::Full,
            ..Default::default()
        };

        let (solution, stats) = Neh::new(config)
            .construct(&instance, vec![2, 1, 0])
            .expect("feasible solution");

        // job 0 is tried at positions 0..3 of [2, 1, 0]
        assert_eq!(solution.sequence, vec![0, 2, 1]);
        assert_eq!(solution.value, 30);
        assert_eq!(stats.depths, 1);
    }

    #[test]
    fn config_from_json() {
        let config: NehConfig =
            serde_json::from_str(r#"{"tie_break": "highest-index", "evaluation": "accelerated"}"#)
                .expect("valid config");

        assert_eq!(
            config,
            NehConfig {
                tie_break: TieBreak::HighestIndex,
                depth: InsertionDepth::Reference,
                evaluation: Evaluation::Accelerated,
            }
        );
    }
}
