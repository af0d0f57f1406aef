//! # Instance files and result reports
//!
//! ## Instance format
//! The first line holds the number of machines `m` and the number of jobs `n`. It is followed by
//! `m` lines, one per machine, each with the processing times of all `n` jobs on that machine
//! separated by whitespace. Blank lines are ignored.
//!
//! ```text
//! 3 3
//! 5 9 9
//! 9 3 4
//! 8 4 3
//! ```
//!
//! ## Result reports
//! [ResultWriter] keeps one CSV file per instance size `(m, n)` with the columns
//! `InputFileName,Result,Time` where time is in milliseconds.
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use itertools::Itertools;
use serde::Serialize;

use crate::pfsp::Instance;
use crate::{Error, Result, Time};

/// Read an [Instance] from the machine-major text format (see module docs).
///
/// ## Example
/// ```
/// # extern crate flowshop;
/// use flowshop::io::read_instance;
///
/// let text = "2 3\n1 2 3\n4 5 6\n";
/// let instance = read_instance::<u32, _>(text.as_bytes()).expect("valid instance");
///
/// assert_eq!(instance.num_machines(), 2);
/// assert_eq!(instance.num_jobs(), 3);
/// assert_eq!(instance.job(0), Some(&[1, 4][..]));
/// ```
pub fn read_instance<T, R>(reader: R) -> Result<Instance<T>>
where
    T: Time + FromStr,
    T::Err: Display,
    R: BufRead,
{
    let mut lines = reader
        .lines()
        .map_ok(|line| line.trim().to_string())
        .filter_ok(|line| !line.is_empty());

    let header = lines
        .next()
        .ok_or_else(|| Error::Parse("missing header line".into()))??;

    let (m, n) = header
        .split_whitespace()
        .map(|x| {
            x.parse::<usize>()
                .map_err(|err| Error::Parse(format!("invalid header value '{x}': {err}")))
        })
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .collect_tuple()
        .ok_or_else(|| Error::Parse(format!("header '{header}' must be 'machines jobs'")))?;

    if m == 0 || n == 0 {
        return Err(Error::InvalidInstance(format!(
            "instance has {m} machines and {n} jobs"
        )));
    }

    let mut p = vec![Vec::with_capacity(m); n];

    for k in 0..m {
        let line = lines.next().ok_or_else(|| {
            Error::Parse(format!("expected {m} machine lines, found {k}"))
        })??;

        let times = line
            .split_whitespace()
            .map(|x| {
                x.parse::<T>().map_err(|err| {
                    Error::Parse(format!("invalid processing time '{x}' of machine {k}: {err}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if times.len() != n {
            return Err(Error::Parse(format!(
                "machine {k} has {} processing times, expected {n}",
                times.len()
            )));
        }

        for (row, t) in p.iter_mut().zip(times) {
            row.push(t);
        }
    }

    if let Some(line) = lines.next() {
        let line = line?;
        return Err(Error::Parse(format!("unexpected trailing line '{line}'")));
    }

    Instance::new(p)
}

/// Read an [Instance] from a file (see [read_instance]).
pub fn read_instance_file<T, P>(path: P) -> Result<Instance<T>>
where
    T: Time + FromStr,
    T::Err: Display,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|err| Error::Io(format!("cannot open '{}': {err}", path.display())))?;
    read_instance(BufReader::new(file))
}

/// List regular files of a directory in the order of their names.
pub fn instance_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let mut files = fs::read_dir(dir)?
        .map_ok(|entry| entry.path())
        .filter_ok(|path| path.is_file())
        .collect::<std::io::Result<Vec<_>>>()?;
    files.sort();
    Ok(files)
}

#[derive(Serialize)]
struct Record<'a, T> {
    #[serde(rename = "InputFileName")]
    name: &'a str,
    #[serde(rename = "Result")]
    value: T,
    #[serde(rename = "Time")]
    time: f64,
}

/// Result sink which writes one CSV report per instance size.
///
/// Reports are named `{m}M{n}J{suffix}.csv` and created (truncated) on the first result of the
/// given size. Every row is flushed immediately.
pub struct ResultWriter {
    dir: PathBuf,
    suffix: String,
    writers: BTreeMap<(usize, usize), csv::Writer<File>>,
}

impl ResultWriter {
    pub const DEFAULT_SUFFIX: &'static str = "_NEH_results";

    /// Create new writer storing reports to `dir` (which is created if missing).
    pub fn new<P: Into<PathBuf>>(dir: P) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            suffix: Self::DEFAULT_SUFFIX.to_string(),
            writers: BTreeMap::new(),
        })
    }

    pub fn with_suffix<S: Into<String>>(mut self, suffix: S) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Path of the report for instances with `m` machines and `n` jobs.
    pub fn report_path(&self, m: usize, n: usize) -> PathBuf {
        self.dir.join(format!("{m}M{n}J{}.csv", self.suffix))
    }

    /// Paths of all reports written so far.
    pub fn reports(&self) -> Vec<PathBuf> {
        self.writers
            .keys()
            .map(|&(m, n)| self.report_path(m, n))
            .collect()
    }

    /// Append result `value` of instance `name` with `m` machines and `n` jobs solved in `elapsed`
    /// time to the corresponding report.
    pub fn write<T: Serialize>(
        &mut self,
        name: &str,
        m: usize,
        n: usize,
        value: T,
        elapsed: Duration,
    ) -> Result<()> {
        let path = self.report_path(m, n);

        let writer = match self.writers.entry((m, n)) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(csv::Writer::from_path(path)?),
        };

        writer.serialize(Record {
            name,
            value,
            time: elapsed.as_nanos() as f64 / 1e6,
        })?;
        writer.flush()?;

        Ok(())
    }
}
