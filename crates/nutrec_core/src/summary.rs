//! Cross-scenario statistics, computed only once every scenario is done.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::model::ScenarioCase;
use crate::pipeline::PipelineOutput;
use crate::schema::*;
use crate::store::{ITERATION_COLUMN, TableStore, check_iteration_order, check_len};

const SYSTEMS: [&str; 2] = ["storage_only", "full_treatment"];

/// Moments and percentiles of the finite values of one column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    /// Finite values summarised
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub p5: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
}

/// Linear interpolation between closest ranks
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

impl DistributionSummary {
    /// `None` when no value is finite
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut sorted: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let std_dev = if count > 1 {
            let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (count - 1) as f64).sqrt()
        } else {
            0.0
        };

        Some(Self {
            count,
            mean,
            std_dev,
            min: sorted[0],
            max: sorted[count - 1],
            p5: percentile(&sorted, 0.05),
            p25: percentile(&sorted, 0.25),
            p50: percentile(&sorted, 0.50),
            p75: percentile(&sorted, 0.75),
            p95: percentile(&sorted, 0.95),
        })
    }
}

/// Break-even and rate-of-return statistics of one case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseSummary {
    pub case: String,
    pub break_even: Option<DistributionSummary>,
    /// Scenarios whose break-even price is undefined
    pub break_even_issues: usize,
    /// Share of all rate-of-return solves that converged
    pub converged_share: f64,
    /// Share of all rate-of-return solves with no rate balancing the cash flow
    pub no_root_share: f64,
    /// Median rate of return per candidate price
    pub median_curve: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSummary {
    pub system: String,
    pub weighted_total: Option<DistributionSummary>,
}

/// Report of one completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub samples: usize,
    pub cases: Vec<CaseSummary>,
    pub market_value: Vec<MarketSummary>,
}

fn median(values: impl IntoIterator<Item = f64>) -> f64 {
    DistributionSummary::from_values(values).map_or(f64::NAN, |s| s.p50)
}

impl RunSummary {
    #[must_use]
    pub fn from_output(output: &PipelineOutput) -> Self {
        let records = &output.records;
        let cases = ScenarioCase::ALL
            .iter()
            .enumerate()
            .map(|(index, case)| {
                let results = records.iter().map(|r| &r.cases[index]);
                let solves = records.len() * output.prices.len();
                let converged: usize = results
                    .clone()
                    .map(|c| c.rate_of_return.converged_count())
                    .sum();
                let no_root: usize = results
                    .clone()
                    .map(|c| c.rate_of_return.no_root_count())
                    .sum();
                let median_curve = output
                    .prices
                    .iter()
                    .enumerate()
                    .map(|(j, &price)| {
                        let rates = results
                            .clone()
                            .map(|c| c.rate_of_return.points[j].solution.rate);
                        (price, median(rates))
                    })
                    .collect();
                CaseSummary {
                    case: case.key().to_string(),
                    break_even: DistributionSummary::from_values(results.clone().map(|c| c.price())),
                    break_even_issues: results.filter(|c| c.break_even.is_err()).count(),
                    converged_share: share(converged, solves),
                    no_root_share: share(no_root, solves),
                    median_curve,
                }
            })
            .collect();

        let market_value = SYSTEMS
            .iter()
            .map(|&system| {
                let totals = records.iter().filter_map(|r| {
                    let weighted = match system {
                        "storage_only" => r.storage_only_market,
                        _ => r.full_treatment_market,
                    };
                    weighted.ok().map(|w| w.total)
                });
                MarketSummary {
                    system: system.to_string(),
                    weighted_total: DistributionSummary::from_values(totals),
                }
            })
            .collect();

        Self {
            samples: records.len(),
            cases,
            market_value,
        }
    }

    /// Rebuild the report from result sheets written by an earlier run
    pub fn from_store<S: TableStore + ?Sized>(store: &S, config: &AnalysisConfig) -> Result<Self> {
        let iterations = store.read(RESULTS_TABLE, SHEET_BREAK_EVEN, ITERATION_COLUMN)?;
        let n = iterations.len();
        let break_even_sheet = format!("{RESULTS_TABLE}/{SHEET_BREAK_EVEN}");
        check_iteration_order(&break_even_sheet, &iterations, n)?;

        let column = |sheet: &str, name: &str| -> Result<Vec<f64>> {
            let values = store.read(RESULTS_TABLE, sheet, name)?;
            check_len(&format!("{RESULTS_TABLE}/{sheet}"), name, &values, n)?;
            Ok(values)
        };

        let prices = config.rate_of_return.prices();
        let mut cases = Vec::with_capacity(ScenarioCase::ALL.len());
        for case in ScenarioCase::ALL {
            let key = case.key();
            let price = column(SHEET_BREAK_EVEN, key)?;
            let issues = column(SHEET_BREAK_EVEN, &issue_column(key))?;
            let converged = column(SHEET_RATE_OF_RETURN_STATUS, &format!("{key}_converged"))?;
            let no_root = column(SHEET_RATE_OF_RETURN_STATUS, &format!("{key}_no_root"))?;

            let sheet = rate_of_return_sheet(key);
            let mut median_curve = Vec::with_capacity(prices.len());
            for &p in &prices {
                let rates = column(&sheet, &format!("{p:.2}"))?;
                median_curve.push((p, median(rates)));
            }

            cases.push(CaseSummary {
                case: key.to_string(),
                break_even: DistributionSummary::from_values(price),
                break_even_issues: issues.iter().filter(|&&code| code != 0.0).count(),
                converged_share: share(
                    converged.iter().sum::<f64>() as usize,
                    n * prices.len(),
                ),
                no_root_share: share(no_root.iter().sum::<f64>() as usize, n * prices.len()),
                median_curve,
            });
        }

        let mut market_value = Vec::with_capacity(SYSTEMS.len());
        for system in SYSTEMS {
            let totals = column(SHEET_MARKET_VALUE, &format!("{system}_weighted_total"))?;
            market_value.push(MarketSummary {
                system: system.to_string(),
                weighted_total: DistributionSummary::from_values(totals),
            });
        }

        Ok(Self {
            samples: n,
            cases,
            market_value,
        })
    }
}

fn share(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

impl fmt::Display for DistributionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mean {:>9.3}  sd {:>8.3}  P5 {:>9.3}  P50 {:>9.3}  P95 {:>9.3}  [{:.3}, {:.3}]",
            self.mean, self.std_dev, self.p5, self.p50, self.p95, self.min, self.max
        )
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} scenarios", self.samples)?;
        writeln!(f)?;
        writeln!(f, "Break-even price (USD/kg N+P+K)")?;
        for case in &self.cases {
            match &case.break_even {
                Some(s) => writeln!(f, "  {:<28} {s}", case.case)?,
                None => writeln!(f, "  {:<28} undefined", case.case)?,
            }
            if case.break_even_issues > 0 {
                writeln!(f, "  {:<28} {} undefined", "", case.break_even_issues)?;
            }
        }
        writeln!(f)?;
        writeln!(f, "Rate of return")?;
        for case in &self.cases {
            let at = |price: f64| {
                case.median_curve
                    .iter()
                    .find(|(p, _)| (p - price).abs() < 1e-9)
                    .map_or(f64::NAN, |&(_, r)| r)
            };
            writeln!(
                f,
                "  {:<28} converged {:>6.2}%  no root {:>6.2}%  median at 1.00: {:.3}  at 5.00: {:.3}",
                case.case,
                case.converged_share * 100.0,
                case.no_root_share * 100.0,
                at(1.0),
                at(5.0)
            )?;
        }
        writeln!(f)?;
        writeln!(f, "Weighted fertilizer market value (USD/kg)")?;
        for market in &self.market_value {
            match &market.weighted_total {
                Some(s) => writeln!(f, "  {:<28} {s}", market.system)?,
                None => writeln!(f, "  {:<28} undefined", market.system)?,
            }
        }
        Ok(())
    }
}
