//! Balanced and sub-sampled batches drawn from an instance source.
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::config::{BalanceMode, RefreshMode, SamplerConfig};
use crate::data_handling::{InstanceSource, InstanceStore, Schema};
use crate::error::{EvalError, Result};

/// One cell of the balancing probability table.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Stratum {
    class: usize,
    value: Option<f64>,
}

/// Draws batches from a single bound source.
///
/// Every call to [`BatchSampler::next_batch`] regenerates the index list; the
/// sampler then acts as an [`InstanceSource`] whose store is a shallow view of
/// the current batch.
pub struct BatchSampler<S: InstanceSource> {
    source: S,
    config: SamplerConfig,
    num_classes: usize,
    indices: Vec<usize>,
    view: InstanceStore,
    primed: bool,
}

impl<S: InstanceSource> BatchSampler<S> {
    pub fn new(source: S, schema: &Schema, config: SamplerConfig) -> Result<Self> {
        config.validate()?;
        if config.balance != BalanceMode::None && schema.num_classes == 0 {
            return Err(EvalError::configuration(
                "class balancing needs a schema with goal classes",
            ));
        }
        let view = source.store().clone();
        Ok(Self {
            source,
            config,
            num_classes: schema.num_classes,
            indices: Vec::new(),
            view,
            primed: false,
        })
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Positions in the source store making up the current batch.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Shallow store over the current batch.
    pub fn view(&self) -> &InstanceStore {
        &self.view
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Draw the next batch and return its positions in the source store.
    pub fn next_batch<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<&[usize]> {
        if self.config.refresh == RefreshMode::Refresh || !self.primed {
            self.source.reload()?;
        }
        self.primed = true;

        let n = self.source.store().count();
        let batch_size = (self.config.sample_fraction * n as f64).floor() as usize;

        let indices = match self.config.balance {
            BalanceMode::None if batch_size >= n => (0..n).collect(),
            BalanceMode::None => {
                let mut drawn = draw_distinct(n, batch_size, rng);
                shuffle_pairs(&mut drawn, rng);
                drawn
            }
            BalanceMode::Class | BalanceMode::ClassValue => {
                let mut drawn = self.draw_balanced(batch_size, rng)?;
                shuffle_pairs(&mut drawn, rng);
                drawn
            }
        };

        log::debug!(
            "Drew batch of {} from {} instances ({:?} balancing)",
            indices.len(),
            n,
            self.config.balance
        );

        let mut view = self.source.store().clone();
        view.reorder(&indices)?;
        self.view = view;
        self.indices = indices;
        Ok(&self.indices)
    }

    fn strata(&self) -> Vec<(Stratum, f64)> {
        let class_mass = 1.0 / self.num_classes as f64;
        let mut table = Vec::new();
        for class in 0..self.num_classes {
            let values = match self.config.balance {
                BalanceMode::ClassValue => self.source.store().distinct_goal_values(class),
                _ => Vec::new(),
            };
            if values.is_empty() {
                table.push((Stratum { class, value: None }, class_mass));
            } else {
                let value_mass = class_mass / values.len() as f64;
                table.extend(
                    values
                        .into_iter()
                        .map(|v| (Stratum { class, value: Some(v) }, value_mass)),
                );
            }
        }
        table
    }

    fn draw_balanced<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Result<Vec<usize>> {
        let table = self.strata();
        let dist = WeightedIndex::new(table.iter().map(|(_, mass)| *mass))
            .map_err(|e| EvalError::configuration(format!("balancing table: {}", e)))?;

        let store = self.source.store();
        let mut drawn = Vec::with_capacity(batch_size);
        for _ in 0..batch_size {
            let stratum = table[dist.sample(rng)].0;
            let pos = match stratum.value {
                Some(value) => store.index_with_goal_class_value(stratum.class, value)?,
                None => store.index_with_goal_class(stratum.class)?,
            };
            drawn.push(pos);
        }
        Ok(drawn)
    }

    /// Compose the current batch order with `positions` and apply it to the
    /// source store itself.
    pub fn reorder(&mut self, positions: &[usize]) -> Result<()> {
        let composed = positions
            .iter()
            .map(|&p| {
                self.indices.get(p).copied().ok_or(EvalError::IndexOutOfRange {
                    index: p,
                    count: self.indices.len(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let store = self.source.store_mut().ok_or_else(|| {
            EvalError::unsupported("source does not support direct instance mutation")
        })?;
        store.reorder(&composed)?;
        self.view = store.clone();
        self.indices = (0..composed.len()).collect();
        Ok(())
    }
}

impl<S: InstanceSource> InstanceSource for BatchSampler<S> {
    fn store(&self) -> &InstanceStore {
        &self.view
    }

    fn reload(&mut self) -> Result<()> {
        self.source.reload()
    }

    fn duplicate(&self) -> Result<InstanceStore> {
        if !self.primed {
            return Err(EvalError::CloneFailure(
                "no batch has been drawn from the sampler yet".to_string(),
            ));
        }
        Ok(self.view.clone())
    }
}

/// `k` distinct positions out of `n`, resolving collisions by linear probing.
fn draw_distinct<R: Rng + ?Sized>(n: usize, k: usize, rng: &mut R) -> Vec<usize> {
    let mut taken = vec![false; n];
    let mut drawn = Vec::with_capacity(k);
    for _ in 0..k.min(n) {
        let mut pos = rng.gen_range(0..n);
        while taken[pos] {
            pos = (pos + 1) % n;
        }
        taken[pos] = true;
        drawn.push(pos);
    }
    drawn
}

/// `len` random pairwise swaps.
fn shuffle_pairs<R: Rng + ?Sized>(indices: &mut [usize], rng: &mut R) {
    let len = indices.len();
    if len < 2 {
        return;
    }
    for _ in 0..len {
        let a = rng.gen_range(0..len);
        let b = rng.gen_range(0..len);
        indices.swap(a, b);
    }
}
