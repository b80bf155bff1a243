use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rebalance_core::numeric::{squared_distance, DEFAULT_TOLERANCE};
use rebalance_core::rebalance::forecast::final_share;
use rebalance_core::rebalance::projection::{allocation_sum, project, project_detailed};
use rebalance_core::rebalance::reference::compute_reference;
use rebalance_core::{BoundSide, RebalanceError, Share};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Bounded projection properties, checked over seeded random allocations.
// ===========================================================================

/// Slack for comparisons that go through non-terminating decimal division.
const SLACK: Decimal = dec!(0.000000000001);

struct Case {
    reference: Vec<Share>,
    lower: Vec<Share>,
    upper: Vec<Share>,
    target_sum: Share,
}

fn cents(rng: &mut StdRng, lo: i64, hi: i64) -> Decimal {
    Decimal::new(rng.gen_range(lo..=hi), 2)
}

/// Random percentage allocation whose box always contains the target sum.
fn random_case(rng: &mut StdRng) -> Case {
    let n = rng.gen_range(1..=8);
    let mut lower = Vec::with_capacity(n);
    let mut upper = Vec::with_capacity(n);
    let mut reference = Vec::with_capacity(n);
    for _ in 0..n {
        let lo = cents(rng, 0, 1500);
        let hi = lo + cents(rng, 0, 8000);
        lower.push(lo);
        upper.push(hi);
        reference.push(cents(rng, -5000, 15000));
    }
    let lower_total: Decimal = lower.iter().sum();
    let upper_total: Decimal = upper.iter().sum();
    let span = upper_total - lower_total;
    let target_sum = lower_total + span * Decimal::new(rng.gen_range(0..=100), 2);
    Case {
        reference,
        lower,
        upper,
        target_sum,
    }
}

fn assert_feasible(x: &[Share], case: &Case) {
    for i in 0..x.len() {
        assert!(
            x[i] >= case.lower[i] && x[i] <= case.upper[i],
            "component {} = {} outside [{}, {}]",
            i,
            x[i],
            case.lower[i],
            case.upper[i]
        );
    }
    let total: Decimal = x.iter().sum();
    let tol = DEFAULT_TOLERANCE * case.target_sum.abs().max(Decimal::ONE);
    assert!(
        (total - case.target_sum).abs() <= tol,
        "sum {} misses target {}",
        total,
        case.target_sum
    );
}

// ---------------------------------------------------------------------------
// Feasibility
// ---------------------------------------------------------------------------

#[test]
fn test_random_projections_are_feasible() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..300 {
        let case = random_case(&mut rng);
        let x = project(
            &case.reference,
            &case.lower,
            &case.upper,
            case.target_sum,
            DEFAULT_TOLERANCE,
        )
        .unwrap();
        assert_feasible(&x, &case);
    }
}

// ---------------------------------------------------------------------------
// Optimality
// ---------------------------------------------------------------------------

#[test]
fn test_no_feasible_pair_move_gets_closer() {
    // Moving mass between two coordinates keeps the sum; it must never
    // reduce the distance to the reference.
    let mut rng = StdRng::seed_from_u64(11);
    let steps = [dec!(0.01), dec!(0.5), dec!(3)];
    for _ in 0..150 {
        let case = random_case(&mut rng);
        let x = project(
            &case.reference,
            &case.lower,
            &case.upper,
            case.target_sum,
            DEFAULT_TOLERANCE,
        )
        .unwrap();
        let best = squared_distance(&x, &case.reference).unwrap();
        let n = x.len();
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                for d in steps {
                    let mut moved = x.clone();
                    moved[i] += d;
                    moved[j] -= d;
                    if moved[i] > case.upper[i] || moved[j] < case.lower[j] {
                        continue;
                    }
                    let dist = squared_distance(&moved, &case.reference).unwrap();
                    assert!(
                        dist >= best - SLACK,
                        "moving {} from {} to {} improved {} -> {}",
                        d,
                        j,
                        i,
                        best,
                        dist
                    );
                }
            }
        }
    }
}

#[test]
fn test_three_category_grid_never_beats_projection() {
    let reference = vec![dec!(72.5), dec!(41), dec!(-13.5)];
    let lower = vec![dec!(5), dec!(10), dec!(0)];
    let upper = vec![dec!(60), dec!(60), dec!(60)];
    let x = project(&reference, &lower, &upper, dec!(100), DEFAULT_TOLERANCE).unwrap();
    let best = squared_distance(&x, &reference).unwrap();

    for a in 5..=60 {
        for b in 10..=60 {
            let c = 100 - a - b;
            if !(0..=60).contains(&c) {
                continue;
            }
            let point = vec![Decimal::from(a), Decimal::from(b), Decimal::from(c)];
            assert!(squared_distance(&point, &reference).unwrap() >= best - SLACK);
        }
    }
    // 72.5 capped at 60; the other two share the remaining 40.
    assert_eq!(x, vec![dec!(60), dec!(40), dec!(0)]);
}

// ---------------------------------------------------------------------------
// Monotonicity and determinism
// ---------------------------------------------------------------------------

#[test]
fn test_allocation_sum_monotone_on_random_cases() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..100 {
        let case = random_case(&mut rng);
        let mut lambdas: Vec<Decimal> = (0..20).map(|_| cents(&mut rng, -20000, 20000)).collect();
        lambdas.sort();
        let sums: Vec<Decimal> = lambdas
            .iter()
            .map(|l| allocation_sum(&case.reference, &case.lower, &case.upper, *l))
            .collect();
        for w in sums.windows(2) {
            assert!(w[0] >= w[1]);
        }
    }
}

#[test]
fn test_repeated_projection_identical() {
    let mut rng = StdRng::seed_from_u64(19);
    for _ in 0..50 {
        let case = random_case(&mut rng);
        let a = project_detailed(
            &case.reference,
            &case.lower,
            &case.upper,
            case.target_sum,
            DEFAULT_TOLERANCE,
        )
        .unwrap();
        let b = project_detailed(
            &case.reference,
            &case.lower,
            &case.upper,
            case.target_sum,
            DEFAULT_TOLERANCE,
        )
        .unwrap();
        assert_eq!(a, b);
    }
}

// ---------------------------------------------------------------------------
// Fixed scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_no_binding_bounds() {
    let reference = vec![dec!(30), dec!(30), dec!(40)];
    let x = project(
        &reference,
        &[dec!(0); 3],
        &[dec!(100); 3],
        dec!(100),
        DEFAULT_TOLERANCE,
    )
    .unwrap();
    assert_eq!(x, reference);
}

#[test]
fn test_one_bound_binds() {
    let reference = vec![dec!(59.97), dec!(14.08), dec!(12.18), dec!(13.78), dec!(-0.01)];
    let x = project(
        &reference,
        &[dec!(0); 5],
        &[dec!(100); 5],
        dec!(100),
        DEFAULT_TOLERANCE,
    )
    .unwrap();
    for (got, want) in x.iter().zip(reference.iter().take(4)) {
        assert!((*got - *want).abs() < dec!(0.01));
    }
    assert_eq!(x[4], Decimal::ZERO);
    assert_eq!(x.iter().sum::<Decimal>(), dec!(100));
}

#[test]
fn test_infeasible_lower_bounds() {
    let err = project(
        &[dec!(10), dec!(0)],
        &[dec!(50), dec!(50)],
        &[dec!(100), dec!(100)],
        dec!(10),
        DEFAULT_TOLERANCE,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        RebalanceError::InfeasibleBounds {
            side: BoundSide::Lower,
            ..
        }
    ));
    assert!(err.to_string().contains("lower bounds"));
}

#[test]
fn test_lower_bounds_exactly_at_target() {
    let lower = vec![dec!(0.25), dec!(0.25), dec!(0.5)];
    let x = project(
        &[dec!(0.9), dec!(0.05), dec!(0.05)],
        &lower,
        &[dec!(1); 3],
        dec!(1),
        DEFAULT_TOLERANCE,
    )
    .unwrap();
    assert_eq!(x, lower);
}

#[test]
fn test_catch_up_pipeline() {
    let targets = vec![dec!(28), dec!(22), dec!(15), dec!(25), dec!(10)];
    let current = vec![dec!(16.2), dec!(23.5), dec!(14.8), dec!(27.6), dec!(17.9)];

    let reference = compute_reference(&targets, &current, 24, 32).unwrap();
    assert_eq!(
        reference,
        vec![dec!(63.4), dec!(17.5), dec!(15.6), dec!(17.2), dec!(-13.7)]
    );

    let new_targets = project(
        &reference,
        &[dec!(0); 5],
        &[dec!(100); 5],
        dec!(100),
        DEFAULT_TOLERANCE,
    )
    .unwrap();
    assert_eq!(
        new_targets,
        vec![dec!(59.975), dec!(14.075), dec!(12.175), dec!(13.775), dec!(0)]
    );

    let finals = final_share(&new_targets, &current, 24, 32).unwrap();
    assert_eq!(finals.iter().sum::<Decimal>(), dec!(100));
    // The clamped category overshoots; everything else undershoots evenly.
    assert_eq!(finals[4], dec!(13.425));
    assert_eq!(finals[1], dec!(21.14375));
}
