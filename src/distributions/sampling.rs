//! Random variate generation.
//!
//! Draws are produced in fixed-size chunks. Each chunk owns a `StdRng` seeded
//! from the caller's generator before any work starts, so a given seed yields
//! the same sample whether chunks run sequentially or on the Rayon pool.

use super::instance::Distribution;
use super::spec::SamplerFn;
use crate::error::DistError;
#[cfg(feature = "parallel")]
use crate::math::PARALLEL_THRESHOLD;
use rand::distr::Open01;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

const CHUNK_SIZE: usize = 4096;

type Seed = <StdRng as SeedableRng>::Seed;

/// How variates are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SamplingStrategy {
    /// Uniforms mapped through `ppf`, analytic or solved per draw.
    Inversion,
    /// Uniforms mapped through the cached [`QuantileTable`](super::QuantileTable).
    TableInversion,
    /// The family's own sampler.
    Native,
    /// `Native` when a sampler is supplied, otherwise `Inversion` when an
    /// analytic quantile exists, otherwise `TableInversion`.
    #[default]
    Auto,
}

#[derive(Clone, Copy)]
enum Resolved<'a> {
    Inversion,
    Table,
    Native(&'a SamplerFn),
}

impl Distribution {
    /// Draws `count` variates with the instance's strategy.
    pub fn sample<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Result<Vec<f64>, DistError> {
        self.sample_with(self.strategy(), count, rng)
    }

    /// Draws `count` variates with an explicit strategy.
    pub fn sample_with<R: Rng + ?Sized>(
        &self,
        strategy: SamplingStrategy,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<f64>, DistError> {
        self.ensure_valid()?;
        let resolved = self.resolve(strategy)?;
        if let Resolved::Table = resolved {
            // Build the shared table once, before workers race for it.
            self.table()?;
        }

        let seeds: Vec<Seed> = (0..count.div_ceil(CHUNK_SIZE))
            .map(|_| {
                let mut seed = Seed::default();
                rng.fill_bytes(&mut seed);
                seed
            })
            .collect();

        tracing::debug!(
            distribution = self.name(),
            count,
            chunks = seeds.len(),
            ?strategy,
            "sampling"
        );

        #[cfg(feature = "parallel")]
        {
            if count >= PARALLEL_THRESHOLD {
                let chunks = seeds
                    .into_par_iter()
                    .enumerate()
                    .map(|(i, seed)| self.draw_chunk(resolved, i, count, seed))
                    .collect::<Result<Vec<Vec<f64>>, DistError>>()?;
                return Ok(chunks.concat());
            }
        }

        let chunks = seeds
            .into_iter()
            .enumerate()
            .map(|(i, seed)| self.draw_chunk(resolved, i, count, seed))
            .collect::<Result<Vec<Vec<f64>>, DistError>>()?;
        Ok(chunks.concat())
    }

    fn resolve(&self, strategy: SamplingStrategy) -> Result<Resolved<'_>, DistError> {
        let members = &self.spec().inner.members;
        match strategy {
            SamplingStrategy::Inversion => Ok(Resolved::Inversion),
            SamplingStrategy::TableInversion => Ok(Resolved::Table),
            SamplingStrategy::Native => match &members.sampler {
                Some(sampler) => Ok(Resolved::Native(sampler)),
                None => Err(DistError::UnsupportedOperation {
                    distribution: self.name().to_string(),
                    operation: "native sampling",
                }),
            },
            SamplingStrategy::Auto => Ok(match &members.sampler {
                Some(sampler) => Resolved::Native(sampler),
                None if members.ppf.is_some() || members.isf.is_some() => Resolved::Inversion,
                None => Resolved::Table,
            }),
        }
    }

    fn draw_chunk(
        &self,
        resolved: Resolved<'_>,
        index: usize,
        count: usize,
        seed: Seed,
    ) -> Result<Vec<f64>, DistError> {
        let n = CHUNK_SIZE.min(count - index * CHUNK_SIZE);
        let mut rng = StdRng::from_seed(seed);
        let (loc, scale) = (self.loc(), self.scale());

        let mut out = Vec::with_capacity(n);
        match resolved {
            Resolved::Inversion => {
                for _ in 0..n {
                    let u: f64 = rng.sample(Open01);
                    out.push(loc + scale * self.std_ppf(u)?);
                }
            }
            Resolved::Table => {
                let table = self.table()?;
                for _ in 0..n {
                    let u: f64 = rng.sample(Open01);
                    out.push(loc + scale * table.quantile(u));
                }
            }
            Resolved::Native(sampler) => {
                for _ in 0..n {
                    out.push(loc + scale * sampler(self.shapes(), &mut rng));
                }
            }
        }
        Ok(out)
    }
}
