//! Stratified K-fold splits with a train/validation hold-out per fold.
//!
//! Every index lands in exactly one test partition. Within a fold, the
//! non-test indices are split again into train and validation so that both
//! keep the fold's class proportions.
//!
//! Fold sets are persisted as `<root>/<name>_splits.json`:
//!
//! ```json
//! { "train": [[...], ...], "val": [[...], ...], "test": [[...], ...],
//!   "fingerprint": "9f2c..." }
//! ```
//!
//! The fingerprint hashes everything the folds depend on. A file whose
//! fingerprint disagrees with the current labels or settings is regenerated.

use crate::config::SplitConfig;
use crate::{Error, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Stratified K-fold over integer labels.
///
/// Classes are processed in ascending label order. Each class is shuffled and
/// dealt across the folds; the folds that receive a class's remainder rotate
/// from class to class, so fold sizes differ by at most one.
///
/// # Example
///
/// ```rust
/// use planetix_data::StratifiedKFold;
///
/// let labels = [0, 0, 0, 1, 1, 1, 2, 2, 2];
/// let folds = StratifiedKFold::new(3).with_seed(Some(0)).test_folds(&labels).unwrap();
/// assert_eq!(folds.len(), 3);
/// assert!(folds.iter().all(|f| f.len() == 3));
/// ```
#[derive(Debug, Clone)]
pub struct StratifiedKFold {
    n_splits: usize,
    seed: Option<u64>,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Test partitions, one per fold, each sorted ascending.
    pub fn test_folds(&self, labels: &[i64]) -> Result<Vec<Vec<usize>>> {
        let mut rng = make_rng(self.seed);
        self.test_folds_with(labels, &mut rng)
    }

    fn test_folds_with(&self, labels: &[i64], rng: &mut ChaCha8Rng) -> Result<Vec<Vec<usize>>> {
        let k = self.n_splits;
        if k < 2 {
            return Err(Error::InvalidConfig(format!(
                "n_splits must be at least 2, got {k}"
            )));
        }

        let classes = group_by_label(labels.iter().copied().enumerate());
        if let Some((&label, members)) = classes.iter().find(|(_, m)| m.len() < k) {
            return Err(Error::InsufficientClassMembers {
                label,
                count: members.len(),
                n_splits: k,
            });
        }

        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); k];
        let mut offset = 0;
        for mut members in classes.into_values() {
            members.shuffle(rng);
            let base = members.len() / k;
            let remainder = members.len() % k;

            let mut start = 0;
            for (f, fold) in folds.iter_mut().enumerate() {
                // folds offset..offset+remainder (mod k) take one extra
                let extra = usize::from((f + k - offset) % k < remainder);
                let end = start + base + extra;
                fold.extend_from_slice(&members[start..end]);
                start = end;
            }
            offset = (offset + remainder) % k;
        }

        for fold in &mut folds {
            fold.sort_unstable();
        }
        Ok(folds)
    }
}

/// Split `indices` into `(train, validation)` keeping class proportions.
///
/// `labels` is indexed by the values in `indices`. The validation set has
/// `ceil(val_fraction * n)` members; each class gets the floor of its
/// proportional share and leftover slots go to the largest fractional
/// remainders (lower label first on ties). Both outputs are sorted.
pub fn stratified_holdout(
    indices: &[usize],
    labels: &[i64],
    val_fraction: f64,
    rng: &mut ChaCha8Rng,
) -> Result<(Vec<usize>, Vec<usize>)> {
    let n = indices.len();
    if !(val_fraction > 0.0 && val_fraction < 1.0) {
        return Err(Error::InvalidConfig(format!(
            "val_fraction must lie in (0, 1), got {val_fraction}"
        )));
    }
    let n_val = (val_fraction * n as f64).ceil() as usize;

    let classes = group_by_label(indices.iter().map(|&i| (i, labels[i])));
    if n_val < classes.len() {
        return Err(Error::InvalidConfig(format!(
            "validation size {n_val} is smaller than the number of classes {}",
            classes.len()
        )));
    }
    if n_val >= n {
        return Err(Error::InvalidConfig(format!(
            "validation size {n_val} leaves no training indices out of {n}"
        )));
    }
    if let Some((label, members)) = classes.iter().find(|(_, m)| m.len() < 2) {
        return Err(Error::InvalidConfig(format!(
            "class {label} has {} member(s), at least 2 are needed for a hold-out",
            members.len()
        )));
    }

    // exact integer shares: n_val * count / n
    let mut counts: Vec<(i64, usize, usize)> = classes
        .iter()
        .map(|(&label, m)| {
            let scaled = n_val * m.len();
            (label, scaled / n, scaled % n)
        })
        .collect();
    let assigned: usize = counts.iter().map(|c| c.1).sum();
    let mut by_remainder: Vec<usize> = (0..counts.len()).collect();
    by_remainder.sort_by(|&a, &b| counts[b].2.cmp(&counts[a].2).then(counts[a].0.cmp(&counts[b].0)));
    for &i in by_remainder.iter().take(n_val - assigned) {
        counts[i].1 += 1;
    }

    let mut train = Vec::with_capacity(n - n_val);
    let mut val = Vec::with_capacity(n_val);
    for ((_, mut members), (_, take, _)) in classes.into_iter().zip(counts) {
        members.shuffle(rng);
        val.extend_from_slice(&members[..take]);
        train.extend_from_slice(&members[take..]);
    }
    train.sort_unstable();
    val.sort_unstable();
    Ok((train, val))
}

fn group_by_label(pairs: impl Iterator<Item = (usize, i64)>) -> BTreeMap<i64, Vec<usize>> {
    let mut classes: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, label) in pairs {
        classes.entry(label).or_default().push(i);
    }
    classes
}

fn make_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// K folds of `(train, val, test)` index lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldSet {
    pub train: Vec<Vec<usize>>,
    pub val: Vec<Vec<usize>>,
    pub test: Vec<Vec<usize>>,
    /// Hash of the inputs the folds were generated from. Absent in files
    /// written by older tools.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// Borrowed view of one fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fold<'a> {
    pub train: &'a [usize],
    pub val: &'a [usize],
    pub test: &'a [usize],
}

impl FoldSet {
    /// Generate folds for `labels`.
    pub fn generate(labels: &[i64], config: &SplitConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = make_rng(config.seed);

        let test = StratifiedKFold::new(config.n_splits)
            .with_seed(config.seed)
            .test_folds_with(labels, &mut rng)?;

        let mut train = Vec::with_capacity(config.n_splits);
        let mut val = Vec::with_capacity(config.n_splits);
        for test_fold in &test {
            let rest = complement(test_fold, labels.len());
            let (tr, va) = stratified_holdout(&rest, labels, config.val_fraction, &mut rng)?;
            train.push(tr);
            val.push(va);
        }

        Ok(Self {
            train,
            val,
            test,
            fingerprint: Some(fingerprint(labels, config)),
        })
    }

    pub fn num_folds(&self) -> usize {
        self.test.len()
    }

    /// Fold `i`, or [`Error::FoldOutOfRange`].
    pub fn fold(&self, i: usize) -> Result<Fold<'_>> {
        if i >= self.num_folds() {
            return Err(Error::FoldOutOfRange {
                fold: i,
                num_folds: self.num_folds(),
            });
        }
        Ok(Fold {
            train: &self.train[i],
            val: &self.val[i],
            test: &self.test[i],
        })
    }

    pub fn folds(&self) -> impl Iterator<Item = Fold<'_>> {
        (0..self.num_folds()).map(move |i| Fold {
            train: &self.train[i],
            val: &self.val[i],
            test: &self.test[i],
        })
    }

    fn check_shape(&self) -> Result<()> {
        if self.train.len() != self.test.len() || self.val.len() != self.test.len() {
            return Err(Error::InvalidConfig(format!(
                "split file has {} train, {} val and {} test lists",
                self.train.len(),
                self.val.len(),
                self.test.len()
            )));
        }
        Ok(())
    }

    /// Reject folds that cannot belong to `num_samples` samples split
    /// `n_splits` ways.
    fn check_fits(&self, num_samples: usize, n_splits: usize) -> Result<()> {
        if self.num_folds() != n_splits {
            return Err(Error::InvalidConfig(format!(
                "split file has {} folds, expected {n_splits}",
                self.num_folds()
            )));
        }
        let mut indices = self.train.iter().chain(&self.val).chain(&self.test).flatten();
        if let Some(&bad) = indices.find(|&&i| i >= num_samples) {
            return Err(Error::InvalidConfig(format!(
                "split file names index {bad}, dataset has {num_samples} samples"
            )));
        }
        Ok(())
    }
}

/// Indices in `0..n` not present in the sorted list `taken`.
fn complement(taken: &[usize], n: usize) -> Vec<usize> {
    let mut rest = Vec::with_capacity(n - taken.len());
    let mut it = taken.iter().peekable();
    for i in 0..n {
        if it.peek() == Some(&&i) {
            it.next();
        } else {
            rest.push(i);
        }
    }
    rest
}

/// SHA-256 over the labels and split settings, hex encoded.
pub fn fingerprint(labels: &[i64], config: &SplitConfig) -> String {
    let mut hasher = Sha256::new();
    hasher.update((labels.len() as u64).to_le_bytes());
    for &label in labels {
        hasher.update(label.to_le_bytes());
    }
    hasher.update((config.n_splits as u64).to_le_bytes());
    hasher.update(config.val_fraction.to_bits().to_le_bytes());
    match config.seed {
        Some(seed) => {
            hasher.update([1u8]);
            hasher.update(seed.to_le_bytes());
        }
        None => hasher.update([0u8]),
    }
    format!("{:x}", hasher.finalize())
}

/// Reads and writes split files under a root directory.
#[derive(Debug, Clone)]
pub struct SplitStore {
    root: PathBuf,
}

impl SplitStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<root>/<name>_splits.json`
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}_splits.json"))
    }

    /// Load the persisted folds for `name`, generating them if needed.
    ///
    /// - no file, or `force_recompute`: generate and write;
    /// - fingerprint matches: load verbatim;
    /// - fingerprint differs: regenerate and overwrite (warn);
    /// - no fingerprint: load verbatim (warn), provided the fold count matches
    ///   and every index is in range; otherwise [`Error::InvalidConfig`].
    pub fn load_or_generate(
        &self,
        name: &str,
        labels: &[i64],
        config: &SplitConfig,
    ) -> Result<FoldSet> {
        let path = self.path(name);
        let expected = fingerprint(labels, config);

        if path.exists() && !config.force_recompute {
            let stored = read_fold_set(&path)?;
            match stored.fingerprint.as_deref() {
                Some(fp) if fp == expected => {
                    info!(path = %path.display(), folds = stored.num_folds(), "loaded split file");
                    return Ok(stored);
                }
                Some(_) => {
                    warn!(path = %path.display(), "split file fingerprint mismatch, regenerating");
                }
                None => {
                    stored.check_fits(labels.len(), config.n_splits)?;
                    warn!(path = %path.display(), "split file has no fingerprint, using it as is");
                    return Ok(stored);
                }
            }
        }

        let folds = FoldSet::generate(labels, config)?;
        write_atomic(&path, &folds)?;
        info!(
            path = %path.display(),
            folds = folds.num_folds(),
            samples = labels.len(),
            "wrote split file"
        );
        Ok(folds)
    }
}

fn read_fold_set(path: &Path) -> Result<FoldSet> {
    let text = std::fs::read_to_string(path)?;
    let folds: FoldSet = serde_json::from_str(&text)?;
    folds.check_shape()?;
    Ok(folds)
}

/// Write through a temp file in the target directory, then rename over it.
fn write_atomic(path: &Path, folds: &FoldSet) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer(&mut tmp, folds)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
