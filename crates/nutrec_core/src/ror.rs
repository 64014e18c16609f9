//! Rate of return at fixed nutrient prices.
//!
//! For each candidate price, find the rate `r` in `[lower, upper]` zeroing
//!
//! ```text
//! f(r) = capital + ongoing * A(r) + maintenance * (1 + r)^-m - price * mass * A(r)
//! ```
//!
//! where `A(r) = ((1 + r)^n - 1) / (r (1 + r)^n)` is the annuity factor. The
//! solver is a projected Newton iteration with backtracking, started fresh at
//! the initial guess for every price.
//!
//! As `r` grows `f` tends to `capital`; as `r` falls towards -1 the annual net
//! flow dominates. When the iterate is pushed against a bound, comparing the
//! sign of `f` at each bound with these limits tells a root beyond that bound
//! (rate clamped) from a cash flow that never balances at any rate (flagged).

use serde::{Deserialize, Serialize};

use crate::config::RateOfReturnConfig;
use crate::error::NumericalIssue;

/// Below this rate the annuity factor uses its Taylor expansion
const SMALL_RATE: f64 = 1e-8;
const MIN_STEP_FRACTION: f64 = 1e-10;

/// Present value of 1 paid yearly for `n` years at rate `r`
#[must_use]
pub fn annuity_factor(r: f64, n: u32) -> f64 {
    let n_f = f64::from(n);
    if r.abs() < SMALL_RATE {
        return n_f - n_f * (n_f + 1.0) / 2.0 * r;
    }
    (1.0 - (1.0 + r).powi(-(n as i32))) / r
}

fn annuity_factor_derivative(r: f64, n: u32) -> f64 {
    let n_f = f64::from(n);
    if r.abs() < SMALL_RATE {
        return -n_f * (n_f + 1.0) / 2.0;
    }
    let v = (1.0 + r).powi(-(n as i32));
    (n_f * r * v / (1.0 + r) - (1.0 - v)) / (r * r)
}

/// Cost side of one scenario's rate-of-return equation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateOfReturnProblem {
    /// Material plus labor, USD
    pub capital: f64,
    /// Operating plus consumables, USD/yr
    pub annual_ongoing: f64,
    /// One-off maintenance, USD
    pub maintenance: f64,
    pub maintenance_year: u32,
    pub lifetime: u32,
    /// kg N+P+K per year
    pub annual_nutrient_mass: f64,
}

impl RateOfReturnProblem {
    /// Net present cost at `rate` when nutrients sell for `price`
    #[must_use]
    pub fn residual(&self, rate: f64, price: f64) -> f64 {
        let net_annual = self.annual_ongoing - price * self.annual_nutrient_mass;
        self.capital
            + net_annual * annuity_factor(rate, self.lifetime)
            + self.maintenance * (1.0 + rate).powi(-(self.maintenance_year as i32))
    }

    fn derivative(&self, rate: f64, price: f64) -> f64 {
        let net_annual = self.annual_ongoing - price * self.annual_nutrient_mass;
        let m = f64::from(self.maintenance_year);
        net_annual * annuity_factor_derivative(rate, self.lifetime)
            - m * self.maintenance * (1.0 + rate).powi(-(self.maintenance_year as i32) - 1)
    }

    /// Sign `f` approaches as the rate grows without bound
    fn high_rate_limit(&self, price: f64) -> f64 {
        let net_annual = self.annual_ongoing - price * self.annual_nutrient_mass;
        if self.capital != 0.0 {
            self.capital
        } else if net_annual != 0.0 {
            net_annual
        } else {
            self.maintenance
        }
    }

    /// Sign `f` approaches as the rate falls towards -1
    fn low_rate_limit(&self, price: f64) -> f64 {
        let net_annual = self.annual_ongoing - price * self.annual_nutrient_mass;
        if self.lifetime > 0 && net_annual != 0.0 {
            net_annual
        } else if self.maintenance_year > 0 && self.maintenance != 0.0 {
            self.maintenance
        } else {
            self.residual(0.0, price)
        }
    }

    /// Magnitude of the terms of `f`, used to scale the tolerance
    fn scale(&self, price: f64) -> f64 {
        let net_annual = self.annual_ongoing - price * self.annual_nutrient_mass;
        (self.capital.abs() + net_annual.abs() * f64::from(self.lifetime) + self.maintenance.abs())
            .max(1.0)
    }
}

/// How a root search ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RootStatus {
    /// Residual within tolerance
    Converged,
    /// Root lies below the lower bound; rate clamped
    AtLowerBound,
    /// Root lies above the upper bound; rate clamped
    AtUpperBound,
    /// `f` keeps one sign at every rate; the rate is where the search stopped
    NoRoot,
    /// Backtracking could not reduce the residual
    Stalled,
    /// Iteration cap reached
    MaxIterations,
}

impl RootStatus {
    /// Stable numeric code used in output tables
    #[must_use]
    pub fn code(&self) -> f64 {
        match self {
            RootStatus::Converged => 0.0,
            RootStatus::AtLowerBound => 1.0,
            RootStatus::AtUpperBound => 2.0,
            RootStatus::Stalled => 3.0,
            RootStatus::MaxIterations => 4.0,
            RootStatus::NoRoot => 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RootSolution {
    pub rate: f64,
    pub residual: f64,
    pub iterations: usize,
    pub status: RootStatus,
}

impl RootSolution {
    pub fn is_converged(&self) -> bool {
        self.status == RootStatus::Converged
    }

    /// Searches that neither converged nor stopped short of a root beyond a bound
    pub fn issue(&self, price: f64) -> Option<NumericalIssue> {
        match self.status {
            RootStatus::NoRoot => Some(NumericalIssue::NoRateOfReturn {
                price,
                residual: self.residual,
            }),
            RootStatus::Stalled | RootStatus::MaxIterations => {
                Some(NumericalIssue::NonConvergence {
                    iterations: self.iterations,
                    residual: self.residual,
                })
            }
            _ => None,
        }
    }
}

/// Where `f` changes sign relative to the bounds
#[derive(Debug, Clone, Copy, PartialEq)]
enum SignChange {
    Inside,
    AboveUpper { residual: f64 },
    BelowLower { residual: f64 },
    Nowhere,
}

fn locate_sign_change(
    problem: &RateOfReturnProblem,
    price: f64,
    settings: &RateOfReturnConfig,
    prefer_upper: bool,
) -> SignChange {
    let at_lower = problem.residual(settings.lower_bound, price);
    let at_upper = problem.residual(settings.upper_bound, price);
    let above = at_upper * problem.high_rate_limit(price) < 0.0;
    let below = at_lower * problem.low_rate_limit(price) < 0.0;

    if at_lower * at_upper < 0.0 {
        SignChange::Inside
    } else if above && (prefer_upper || !below) {
        SignChange::AboveUpper { residual: at_upper }
    } else if below {
        SignChange::BelowLower { residual: at_lower }
    } else {
        SignChange::Nowhere
    }
}

/// Solve for the rate of return at one price
#[must_use]
pub fn solve_rate(
    problem: &RateOfReturnProblem,
    price: f64,
    settings: &RateOfReturnConfig,
) -> RootSolution {
    let (lower, upper) = (settings.lower_bound, settings.upper_bound);
    let clamp = |r: f64| r.clamp(lower, upper);
    let tolerance = settings.tolerance * problem.scale(price);

    let mut rate = clamp(settings.initial_guess);
    let mut residual = problem.residual(rate, price);
    let finish = |rate: f64, residual: f64, iterations: usize, status: RootStatus| RootSolution {
        rate,
        residual,
        iterations,
        status,
    };
    // Failed searches are only numerical trouble when some rate balances the flow
    let give_up = |rate: f64, residual: f64, iterations: usize, status: RootStatus| {
        let status = match locate_sign_change(problem, price, settings, false) {
            SignChange::Nowhere => RootStatus::NoRoot,
            _ => status,
        };
        finish(rate, residual, iterations, status)
    };

    for iteration in 0..settings.max_iterations {
        if residual.abs() <= tolerance {
            return finish(rate, residual, iteration, RootStatus::Converged);
        }

        let slope = problem.derivative(rate, price);
        if slope == 0.0 || !slope.is_finite() || !residual.is_finite() {
            return give_up(rate, residual, iteration, RootStatus::Stalled);
        }
        let step = residual / slope;

        // A projected step that cannot move leaves the iterate on a bound
        if clamp(rate - step) == rate {
            return match locate_sign_change(problem, price, settings, step < 0.0) {
                SignChange::Inside => finish(rate, residual, iteration, RootStatus::Stalled),
                SignChange::AboveUpper { residual } => {
                    finish(upper, residual, iteration, RootStatus::AtUpperBound)
                }
                SignChange::BelowLower { residual } => {
                    finish(lower, residual, iteration, RootStatus::AtLowerBound)
                }
                SignChange::Nowhere => finish(rate, residual, iteration, RootStatus::NoRoot),
            };
        }

        let mut fraction = 1.0;
        let (candidate, candidate_residual) = loop {
            let candidate = clamp(rate - fraction * step);
            let candidate_residual = problem.residual(candidate, price);
            if candidate_residual.abs() < residual.abs() || fraction < MIN_STEP_FRACTION {
                break (candidate, candidate_residual);
            }
            fraction *= 0.5;
        };

        if candidate_residual.abs() >= residual.abs() {
            return give_up(rate, residual, iteration + 1, RootStatus::Stalled);
        }
        rate = candidate;
        residual = candidate_residual;
    }

    if residual.abs() <= tolerance {
        finish(rate, residual, settings.max_iterations, RootStatus::Converged)
    } else {
        give_up(rate, residual, settings.max_iterations, RootStatus::MaxIterations)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatePoint {
    /// USD/kg
    pub price: f64,
    pub solution: RootSolution,
}

/// Rate of return across the candidate price grid
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateOfReturnCurve {
    pub points: Vec<RatePoint>,
}

impl RateOfReturnCurve {
    pub fn rates(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.solution.rate)
    }

    pub fn converged_count(&self) -> usize {
        self.points
            .iter()
            .filter(|p| p.solution.is_converged())
            .count()
    }

    /// Prices at which no rate balances the cash flow
    pub fn no_root_count(&self) -> usize {
        self.points
            .iter()
            .filter(|p| p.solution.status == RootStatus::NoRoot)
            .count()
    }

    pub fn statuses(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.solution.status.code())
    }

    pub fn first_issue(&self) -> Option<NumericalIssue> {
        self.points.iter().find_map(|p| p.solution.issue(p.price))
    }
}

/// Independent solves for every price, each from the initial guess
#[must_use]
pub fn rate_of_return_curve(
    problem: &RateOfReturnProblem,
    prices: &[f64],
    settings: &RateOfReturnConfig,
) -> RateOfReturnCurve {
    RateOfReturnCurve {
        points: prices
            .iter()
            .map(|&price| RatePoint {
                price,
                solution: solve_rate(problem, price, settings),
            })
            .collect(),
    }
}
