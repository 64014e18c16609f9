//! Tests for rate-of-return curves over whole runs
//!
//! These tests verify that:
//! - Where a root lies inside the bounds, nearly every solve finds it
//! - Cash flows that balance at no rate are flagged, never reported clean
//! - Clamped rates stay within the configured bounds
//! - The stored curves and status codes match the in-memory solutions

use super::fixtures::{reference_catalog, reference_materials, small_config};
use crate::config::RateOfReturnConfig;
use crate::model::ScenarioCase;
use crate::pipeline::sample_and_run;
use crate::ror::{RateOfReturnProblem, RootStatus};
use crate::schema::*;
use crate::store::{MemoryStore, TableStore};

fn scale(problem: &RateOfReturnProblem, price: f64) -> f64 {
    let net = problem.annual_ongoing - price * problem.annual_nutrient_mass;
    (problem.capital.abs() + net.abs() * f64::from(problem.lifetime) + problem.maintenance.abs())
        .max(1.0)
}

/// Whether `f` changes sign on a grid packed towards the lower bound
fn has_root_in_bounds(problem: &RateOfReturnProblem, price: f64, bounds: &RateOfReturnConfig) -> bool {
    const STEPS: usize = 400;
    let width = bounds.upper_bound - bounds.lower_bound;
    let rates = (0..=STEPS).map(|k| bounds.lower_bound + width * (k as f64 / STEPS as f64).powi(3));
    let values: Vec<f64> = rates.map(|r| problem.residual(r, price)).collect();
    values.windows(2).any(|w| w[0] * w[1] <= 0.0)
}

#[test]
fn test_converged_rates_zero_the_cash_flow_equation() {
    let config = small_config(30);
    let bounds = &config.rate_of_return;
    let mut store = MemoryStore::new();
    let output =
        sample_and_run(&mut store, &reference_catalog(), &config, &reference_materials()).unwrap();

    let mut solves = 0usize;
    let mut bracketed = 0usize;
    let mut zeroed = 0usize;
    let mut never_balanced = 0usize;
    for record in &output.records {
        let baseline = record.toilets.pit * config.sanitation.pit_units;
        for case in &record.cases {
            let problem = record.layout(case.case.system).rate_of_return_problem(
                case.case.financing,
                &baseline,
                &config.finance,
            );
            for point in &case.rate_of_return.points {
                solves += 1;
                let price = point.price;
                let solution = point.solution;
                assert!(solution.rate >= bounds.lower_bound);
                assert!(solution.rate <= bounds.upper_bound);

                if has_root_in_bounds(&problem, price, bounds) {
                    bracketed += 1;
                    let residual = problem.residual(solution.rate, price);
                    if solution.is_converged() && residual.abs() <= 1e-6 * scale(&problem, price) {
                        zeroed += 1;
                    }
                    continue;
                }

                let net = problem.annual_ongoing - price * problem.annual_nutrient_mass;
                let at_lower = problem.residual(bounds.lower_bound, price);
                let at_upper = problem.residual(bounds.upper_bound, price);
                if at_lower * net > 0.0 && at_upper * problem.capital > 0.0 {
                    never_balanced += 1;
                    assert_eq!(solution.status, RootStatus::NoRoot, "{} at {price:.2}", case.case);
                }
                match solution.status {
                    RootStatus::AtLowerBound => assert_eq!(solution.rate, bounds.lower_bound),
                    RootStatus::AtUpperBound => assert_eq!(solution.rate, bounds.upper_bound),
                    RootStatus::Converged => {}
                    RootStatus::NoRoot | RootStatus::Stalled | RootStatus::MaxIterations => {
                        assert!(solution.issue(price).is_some());
                    }
                }
            }
        }
    }
    assert_eq!(solves, 30 * 4 * 101);
    assert!(bracketed > 0);
    assert!(never_balanced > 0);
    assert!(
        zeroed as f64 >= 0.99 * bracketed as f64,
        "only {zeroed} of {bracketed} solves with a root in bounds zeroed the equation"
    );
}

#[test]
fn test_stored_curves_match_solutions() {
    let config = small_config(12);
    let mut store = MemoryStore::new();
    let output =
        sample_and_run(&mut store, &reference_catalog(), &config, &reference_materials()).unwrap();

    let case = ScenarioCase::ALL[0];
    let sheet = rate_of_return_sheet(case.key());
    let at_two = store.read(RESULTS_TABLE, &sheet, "2.00").unwrap();
    let index = output
        .prices
        .iter()
        .position(|p| format!("{p:.2}") == "2.00")
        .unwrap();
    for (record, stored) in output.records.iter().zip(&at_two) {
        let solved = record.cases[0].rate_of_return.points[index].solution.rate;
        assert_eq!(solved.to_bits(), stored.to_bits());
    }

    let converged = store
        .read(
            RESULTS_TABLE,
            SHEET_RATE_OF_RETURN_STATUS,
            &format!("{}_converged", case.key()),
        )
        .unwrap();
    for (record, stored) in output.records.iter().zip(&converged) {
        assert_eq!(
            record.cases[0].rate_of_return.converged_count() as f64,
            *stored
        );
    }

    let codes = store
        .read(RESULTS_TABLE, &rate_of_return_status_sheet(case.key()), "0.00")
        .unwrap();
    let no_root = store
        .read(
            RESULTS_TABLE,
            SHEET_RATE_OF_RETURN_STATUS,
            &format!("{}_no_root", case.key()),
        )
        .unwrap();
    for ((record, code), count) in output.records.iter().zip(&codes).zip(&no_root) {
        let curve = &record.cases[0].rate_of_return;
        assert_eq!(curve.points[0].solution.status.code(), *code);
        assert_eq!(curve.no_root_count() as f64, *count);
    }
}
