//! Uncertainty sampling.
//!
//! Every uncertain parameter is described by a [`DistributionSpec`] and drawn
//! into its own column of N values. Columns are grouped into [`SampleTable`]s
//! purely for output organisation; each column has an independent RNG stream
//! derived from the run seed and its `(group, label)` pair.

use std::hash::{Hash, Hasher};

use rand::distr::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rustc_hash::{FxHashMap, FxHashSet, FxHasher};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, StoreError};
use crate::store::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMethod {
    /// Stratified: one draw per 1/N probability stratum, then shuffled
    #[default]
    LatinHypercube,
    /// Plain inverse-transform Monte Carlo
    SimpleRandom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionKind {
    Uniform,
    Triangular,
}

/// One uncertain parameter.
///
/// Support is `[minimum, minimum + width]`. Triangular parameters peak at
/// `minimum + peak_fraction * width`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSpec {
    pub label: String,
    pub kind: DistributionKind,
    pub minimum: f64,
    pub width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_fraction: Option<f64>,
}

impl DistributionSpec {
    #[must_use]
    pub fn uniform(label: impl Into<String>, minimum: f64, width: f64) -> Self {
        Self {
            label: label.into(),
            kind: DistributionKind::Uniform,
            minimum,
            width,
            peak_fraction: None,
        }
    }

    #[must_use]
    pub fn triangular(
        label: impl Into<String>,
        minimum: f64,
        width: f64,
        peak_fraction: f64,
    ) -> Self {
        Self {
            label: label.into(),
            kind: DistributionKind::Triangular,
            minimum,
            width,
            peak_fraction: Some(peak_fraction),
        }
    }

    #[must_use]
    pub fn maximum(&self) -> f64 {
        self.minimum + self.width
    }

    /// Mode of the distribution (midpoint for uniform)
    #[must_use]
    pub fn peak(&self) -> f64 {
        self.minimum + self.peak_fraction.unwrap_or(0.5) * self.width
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.minimum.is_finite() {
            return Err(ConfigError::NonFiniteParameter {
                label: self.label.clone(),
                field: "minimum",
            });
        }
        if !self.width.is_finite() {
            return Err(ConfigError::NonFiniteParameter {
                label: self.label.clone(),
                field: "width",
            });
        }
        if self.width < 0.0 {
            return Err(ConfigError::NegativeWidth {
                label: self.label.clone(),
                width: self.width,
            });
        }
        if self.kind == DistributionKind::Triangular {
            match self.peak_fraction {
                None => {
                    return Err(ConfigError::MissingPeakFraction {
                        label: self.label.clone(),
                    });
                }
                Some(c) if !(0.0..=1.0).contains(&c) => {
                    return Err(ConfigError::PeakFractionOutOfRange {
                        label: self.label.clone(),
                        peak_fraction: c,
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Inverse CDF at probability `u` in `[0, 1]`.
    ///
    /// A zero-width spec is constant at `minimum` for every `u`.
    #[must_use]
    pub fn inverse_cdf(&self, u: f64) -> f64 {
        let w = self.width;
        if w == 0.0 {
            return self.minimum;
        }
        match self.kind {
            DistributionKind::Uniform => self.minimum + w * u,
            DistributionKind::Triangular => {
                let c = self.peak_fraction.unwrap_or(0.5);
                if u < c {
                    self.minimum + w * (u * c).sqrt()
                } else {
                    self.maximum() - w * ((1.0 - u) * (1.0 - c)).sqrt()
                }
            }
        }
    }

    /// Draw `n` values with the given method
    pub fn draw<R: Rng + ?Sized>(
        &self,
        n: usize,
        method: SamplingMethod,
        rng: &mut R,
    ) -> Result<Vec<f64>, ConfigError> {
        if self.width == 0.0 {
            return Ok(vec![self.minimum; n]);
        }
        match method {
            SamplingMethod::LatinHypercube => Ok(stratified_unit_samples(n, rng)
                .into_iter()
                .map(|u| self.inverse_cdf(u))
                .collect()),
            SamplingMethod::SimpleRandom => match self.kind {
                DistributionKind::Uniform => Uniform::new_inclusive(self.minimum, self.maximum())
                    .map(|d| d.sample_iter(rng).take(n).collect())
                    .map_err(|e| ConfigError::InvalidDistribution {
                        label: self.label.clone(),
                        reason: e.to_string(),
                    }),
                DistributionKind::Triangular => {
                    rand_distr::Triangular::new(self.minimum, self.maximum(), self.peak())
                        .map(|d| d.sample_iter(rng).take(n).collect())
                        .map_err(|e| ConfigError::InvalidDistribution {
                            label: self.label.clone(),
                            reason: e.to_string(),
                        })
                }
            },
        }
    }
}

/// Latin hypercube draws on the unit interval.
///
/// Value `k` lies in stratum `[k/n, (k+1)/n)` before the shuffle, so every
/// stratum holds exactly one sample.
pub fn stratified_unit_samples<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<f64> {
    let scale = n as f64;
    let mut samples: Vec<f64> = (0..n)
        .map(|k| (k as f64 + rng.random::<f64>()) / scale)
        .collect();
    samples.shuffle(rng);
    samples
}

/// A named batch of parameters written to one sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterGroup {
    pub name: String,
    pub parameters: Vec<DistributionSpec>,
}

impl ParameterGroup {
    pub fn get(&self, label: &str) -> Option<&DistributionSpec> {
        self.parameters.iter().find(|p| p.label == label)
    }
}

/// Every uncertain parameter of an analysis, grouped by sheet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterCatalog {
    pub groups: Vec<ParameterGroup>,
}

impl ParameterCatalog {
    pub fn group(&self, name: &str) -> Option<&ParameterGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn parameter_count(&self) -> usize {
        self.groups.iter().map(|g| g.parameters.len()).sum()
    }

    /// Reject the first malformed spec, empty group, or duplicated label
    pub fn validate(&self) -> Result<(), ConfigError> {
        for group in &self.groups {
            if group.parameters.is_empty() {
                return Err(ConfigError::EmptyGroup(group.name.clone()));
            }
            let mut seen = FxHashSet::default();
            for spec in &group.parameters {
                spec.validate()?;
                if !seen.insert(spec.label.as_str()) {
                    return Err(ConfigError::DuplicateLabel {
                        group: group.name.clone(),
                        label: spec.label.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Seed for one parameter's stream
fn stream_seed(seed: u64, group: &str, label: &str) -> u64 {
    let mut hasher = FxHasher::default();
    seed.hash(&mut hasher);
    group.hash(&mut hasher);
    label.hash(&mut hasher);
    hasher.finish()
}

/// Sampled columns of one parameter group
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTable {
    pub group: String,
    labels: Vec<String>,
    columns: FxHashMap<String, Vec<f64>>,
}

impl SampleTable {
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn column(&self, label: &str) -> Option<&[f64]> {
        self.columns.get(label).map(Vec::as_slice)
    }

    /// Row-major copy for writing to a store
    pub fn to_table(&self) -> Result<Table, StoreError> {
        let columns = self
            .labels
            .iter()
            .map(|l| {
                self.column(l).ok_or_else(|| StoreError::MissingColumn {
                    table: self.group.clone(),
                    column: l.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Table::from_columns(self.labels.clone(), &columns)
    }
}

/// The complete output of one sampling run
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    pub samples: usize,
    pub tables: Vec<SampleTable>,
}

impl SampleSet {
    pub fn table(&self, group: &str) -> Option<&SampleTable> {
        self.tables.iter().find(|t| t.group == group)
    }
}

/// Validate the catalog and draw `samples` values for every parameter
pub fn draw_samples(
    catalog: &ParameterCatalog,
    samples: usize,
    method: SamplingMethod,
    seed: u64,
) -> Result<SampleSet, ConfigError> {
    if samples == 0 {
        return Err(ConfigError::ZeroSampleCount);
    }
    catalog.validate()?;

    let mut tables = Vec::with_capacity(catalog.groups.len());
    for group in &catalog.groups {
        let mut columns = FxHashMap::default();
        let mut labels = Vec::with_capacity(group.parameters.len());
        for spec in &group.parameters {
            let mut rng = StdRng::seed_from_u64(stream_seed(seed, &group.name, &spec.label));
            let values = spec.draw(samples, method, &mut rng)?;
            labels.push(spec.label.clone());
            columns.insert(spec.label.clone(), values);
        }
        tables.push(SampleTable {
            group: group.name.clone(),
            labels,
            columns,
        });
    }

    Ok(SampleSet { samples, tables })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean(values: &[f64]) -> f64 {
        values.iter().sum::<f64>() / values.len() as f64
    }

    #[test]
    fn stratified_samples_cover_every_stratum_once() {
        let mut rng = StdRng::seed_from_u64(42);
        let n = 500;
        let samples = stratified_unit_samples(n, &mut rng);

        let mut hits = vec![0usize; n];
        for u in &samples {
            assert!((0.0..1.0).contains(u));
            hits[(u * n as f64).floor() as usize] += 1;
        }
        assert!(hits.iter().all(|&h| h == 1));
    }

    #[test]
    fn uniform_latin_hypercube_stays_in_support() {
        let spec = DistributionSpec::uniform("cost_resin", 4.0, 2.0);
        let mut rng = StdRng::seed_from_u64(42);
        let values = spec
            .draw(10_000, SamplingMethod::LatinHypercube, &mut rng)
            .unwrap();

        assert!(values.iter().all(|v| (4.0..=6.0).contains(v)));
        let m = mean(&values);
        assert!((m - 5.0).abs() < 1e-3, "Mean {m} too far from expected 5.0");
    }

    #[test]
    fn triangular_mode_near_peak() {
        let spec = DistributionSpec::triangular("discount_rate", 0.0, 10.0, 0.3);
        let mut rng = StdRng::seed_from_u64(7);
        let values = spec
            .draw(20_000, SamplingMethod::LatinHypercube, &mut rng)
            .unwrap();

        assert!(values.iter().all(|v| (0.0..=10.0).contains(v)));

        let mut bins = [0usize; 20];
        for v in &values {
            let idx = ((v / 10.0) * 20.0).floor().min(19.0) as usize;
            bins[idx] += 1;
        }
        let (mode_bin, _) = bins
            .iter()
            .enumerate()
            .max_by_key(|(_, count)| **count)
            .unwrap();
        let mode = (mode_bin as f64 + 0.5) * 0.5;
        assert!((mode - 3.0).abs() <= 0.75, "Mode {mode} too far from 3.0");

        // mean of triangular(a, b, c) is (a + b + c) / 3
        let m = mean(&values);
        assert!((m - 13.0 / 3.0).abs() < 0.01, "Mean {m} too far");
    }

    #[test]
    fn triangular_inverse_cdf_hits_endpoints_and_peak() {
        let spec = DistributionSpec::triangular("loss_cons", 2.0, 4.0, 0.25);
        assert_eq!(spec.inverse_cdf(0.0), 2.0);
        assert_eq!(spec.inverse_cdf(1.0), 6.0);
        assert!((spec.inverse_cdf(0.25) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn peak_at_either_edge_is_valid() {
        let left = DistributionSpec::triangular("a", 0.0, 1.0, 0.0);
        let right = DistributionSpec::triangular("b", 0.0, 1.0, 1.0);
        assert!(left.validate().is_ok());
        assert!(right.validate().is_ok());
        assert_eq!(left.inverse_cdf(0.0), 0.0);
        assert_eq!(right.inverse_cdf(1.0), 1.0);
    }

    #[test]
    fn zero_width_is_constant_column() {
        let mut rng = StdRng::seed_from_u64(1);
        for spec in [
            DistributionSpec::uniform("u", 3.5, 0.0),
            DistributionSpec::triangular("t", 3.5, 0.0, 0.4),
        ] {
            for method in [SamplingMethod::LatinHypercube, SamplingMethod::SimpleRandom] {
                let values = spec.draw(100, method, &mut rng).unwrap();
                assert!(values.iter().all(|&v| v == 3.5));
            }
        }
    }

    #[test]
    fn simple_random_stays_in_support() {
        let spec = DistributionSpec::triangular("ad_density", 1.0, 2.0, 0.5);
        let mut rng = StdRng::seed_from_u64(99);
        let values = spec
            .draw(5_000, SamplingMethod::SimpleRandom, &mut rng)
            .unwrap();
        assert_eq!(values.len(), 5_000);
        assert!(values.iter().all(|v| (1.0..=3.0).contains(v)));
    }

    #[test]
    fn invalid_specs_are_rejected() {
        let negative = DistributionSpec::uniform("x", 0.0, -1.0);
        assert!(matches!(
            negative.validate(),
            Err(ConfigError::NegativeWidth { .. })
        ));

        let out_of_range = DistributionSpec::triangular("y", 0.0, 1.0, 1.5);
        assert!(matches!(
            out_of_range.validate(),
            Err(ConfigError::PeakFractionOutOfRange { .. })
        ));

        let mut missing = DistributionSpec::triangular("z", 0.0, 1.0, 0.5);
        missing.peak_fraction = None;
        assert!(matches!(
            missing.validate(),
            Err(ConfigError::MissingPeakFraction { .. })
        ));

        let nan = DistributionSpec::uniform("w", f64::NAN, 1.0);
        assert!(matches!(
            nan.validate(),
            Err(ConfigError::NonFiniteParameter { field: "minimum", .. })
        ));
    }

    #[test]
    fn catalog_rejects_duplicate_labels_and_empty_groups() {
        let catalog = ParameterCatalog {
            groups: vec![ParameterGroup {
                name: "DCA_parameters".into(),
                parameters: vec![
                    DistributionSpec::uniform("income_tax", 0.0, 0.3),
                    DistributionSpec::uniform("income_tax", 0.0, 0.3),
                ],
            }],
        };
        assert!(matches!(
            catalog.validate(),
            Err(ConfigError::DuplicateLabel { .. })
        ));

        let empty = ParameterCatalog {
            groups: vec![ParameterGroup {
                name: "transport_costs".into(),
                parameters: vec![],
            }],
        };
        assert_eq!(
            empty.validate(),
            Err(ConfigError::EmptyGroup("transport_costs".into()))
        );
    }

    #[test]
    fn adding_a_parameter_leaves_other_columns_unchanged() {
        let base = ParameterCatalog {
            groups: vec![ParameterGroup {
                name: "RR_uniform".into(),
                parameters: vec![DistributionSpec::uniform("e_cal", 2000.0, 500.0)],
            }],
        };
        let mut extended = base.clone();
        extended.groups[0]
            .parameters
            .insert(0, DistributionSpec::uniform("p_veg", 40.0, 20.0));

        let a = draw_samples(&base, 200, SamplingMethod::LatinHypercube, 11).unwrap();
        let b = draw_samples(&extended, 200, SamplingMethod::LatinHypercube, 11).unwrap();

        assert_eq!(
            a.table("RR_uniform").unwrap().column("e_cal"),
            b.table("RR_uniform").unwrap().column("e_cal")
        );
    }

    #[test]
    fn same_seed_reproduces_samples() {
        let catalog = ParameterCatalog {
            groups: vec![ParameterGroup {
                name: "transport_costs".into(),
                parameters: vec![
                    DistributionSpec::uniform("cart", 0.01, 0.02),
                    DistributionSpec::uniform("truck", 5000.0, 5000.0),
                ],
            }],
        };
        let a = draw_samples(&catalog, 50, SamplingMethod::LatinHypercube, 3).unwrap();
        let b = draw_samples(&catalog, 50, SamplingMethod::LatinHypercube, 3).unwrap();
        let c = draw_samples(&catalog, 50, SamplingMethod::LatinHypercube, 4).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn zero_samples_is_a_config_error() {
        let catalog = ParameterCatalog::default();
        assert_eq!(
            draw_samples(&catalog, 0, SamplingMethod::LatinHypercube, 0),
            Err(ConfigError::ZeroSampleCount)
        );
    }
}
