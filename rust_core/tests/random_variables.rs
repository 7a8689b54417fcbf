use approx::{assert_abs_diff_eq, assert_relative_eq};
use nanoppl_core::distributions::{Bernoulli, Binomial, Normal};
use nanoppl_core::sampler::{sample, sample_named, SamplerConfig};
use nanoppl_core::{
    functions, Error, Operand, RandomVariable, Sample, Universe, UniverseSnapshot, Value,
};
use ndarray::Array1;
use proptest::prelude::*;

fn real(value: Value) -> f64 {
    value.as_real().expect("scalar value")
}

#[test]
fn test_golden_first_draw() {
    let universe = Universe::with_seed(0);
    let x = universe.uniform(0.0, 1.0);
    assert_eq!(real(x.draw().unwrap()), 0.7090754154265618);

    let universe = Universe::with_seed(0);
    let a = universe.uniform(0.0, 1.0);
    let b = universe.uniform(0.0, 1.0);
    let s = universe.sample();
    assert_eq!(real(a.evaluate(&s).unwrap()), 0.7090754154265618);
    assert_eq!(real(b.evaluate(&s).unwrap()), 0.46592172228961026);
}

#[test]
fn test_same_seed_same_stream() {
    let build = |seed| {
        let universe = Universe::with_seed(seed);
        let x = Normal::standard(&universe);
        let y = &x * &x + Bernoulli::standard(&universe);
        (universe, y)
    };
    let (_a, ya) = build(17);
    let (_b, yb) = build(17);
    for _ in 0..10 {
        assert_eq!(ya.draw().unwrap(), yb.draw().unwrap());
    }
}

#[test]
fn test_slots_are_unique_and_dense() {
    let universe = Universe::new();
    let mut vars: Vec<RandomVariable> = Vec::new();
    for i in 0..5 {
        let x = universe.uniform(0.0, 1.0);
        vars.push(Normal::new(&universe, &x, 1.0));
        vars.push(Binomial::new(&universe, i, 0.5));
        vars.push(x);
        assert_eq!(universe.sample().dim(), universe.n());
    }
    let mut slots: Vec<usize> = vars.iter().flat_map(|v| v.slots().unwrap()).collect();
    slots.sort_unstable();
    slots.dedup();
    let n = universe.n();
    assert_eq!(n, 5 * 2 + (0..5).sum::<usize>());
    assert_eq!(slots, (0..n).collect::<Vec<_>>());
}

#[test]
fn test_restart_invalidates_everything_built_before() {
    let universe = Universe::with_seed(3);
    let x = universe.uniform(0.0, 1.0);
    let y = Normal::new(&universe, &x, 2.0);
    let c = universe.constant(1.0);
    universe.restart(3);

    assert_eq!(universe.n(), 0);
    for rv in [&x, &y, &c] {
        assert!(!rv.is_valid());
        assert_eq!(rv.draw().unwrap_err(), Error::InvalidRandomVariable);
    }
    let fresh = universe.uniform(0.0, 1.0);
    assert!(fresh.is_valid());
    assert_eq!(fresh.slots().unwrap(), vec![0]);
    assert!(!(&fresh + &y).is_valid());
}

#[test]
fn test_wrong_sample_dimension() {
    let universe = Universe::new();
    let x = universe.uniform(0.0, 1.0);
    let early = universe.sample();
    universe.uniform(0.0, 1.0);
    assert_eq!(
        x.evaluate(&early).unwrap_err(),
        Error::InvalidSample {
            expected: 2,
            found: 1
        }
    );
}

#[test]
fn test_booleans_do_not_escape() {
    let universe = Universe::new();
    let x = universe.uniform(0.0, 1.0);
    let y = universe.uniform(0.0, 1.0);
    let cond = x.lt(&y);
    assert_eq!(bool::try_from(&cond), Err(Error::BooleanCoercion));
    let truth = functions::truth(&cond).into_random().unwrap();
    assert!(matches!(truth.draw().unwrap(), Value::Bool(_)));
}

#[test]
fn test_normal_statistics() {
    let universe = Universe::with_seed(0);
    let x = Normal::new(&universe, 2.0, 0.09);
    let xs = x.draw_batch(100_000).unwrap();
    let mean = xs.mean().unwrap();
    let var = xs.var(1.0);
    assert_abs_diff_eq!(mean, 2.0, epsilon = 0.01);
    assert_abs_diff_eq!(var, 0.09, epsilon = 0.01);
}

#[test]
fn test_bernoulli_rate() {
    let universe = Universe::with_seed(0);
    let x = Bernoulli::new(&universe, 0.3);
    let xs = x.draw_batch(100_000).unwrap();
    assert_abs_diff_eq!(xs.mean().unwrap(), 0.3, epsilon = 0.01);
}

#[test]
fn test_joint_sampling_keeps_dependence() {
    let universe = Universe::with_seed(8);
    let x = universe.uniform(0.0, 1.0);
    let y = universe.uniform(0.0, &x);
    let result = sample_named(
        &[("x", &x), ("y", &y)],
        SamplerConfig {
            num_draws: 10_000,
            ..SamplerConfig::default()
        },
    )
    .unwrap();
    let (xs, ys) = (&result.columns[0], &result.columns[1]);
    assert!(xs.iter().zip(ys.iter()).all(|(&x, &y)| 0.0 <= y && y <= x));
    let means = result.mean();
    assert_abs_diff_eq!(means[0], 0.5, epsilon = 0.02);
    assert_abs_diff_eq!(means[1], 0.25, epsilon = 0.02);
}

#[test]
fn test_batch_equals_sequential_draws() {
    let build = || {
        let universe = Universe::with_seed(21);
        let x = Normal::standard(&universe);
        let y = x.exp() + universe.uniform(-1.0, 1.0);
        (universe, y)
    };
    let (_a, batched) = build();
    let (_b, sequential) = build();
    let batch = batched.draw_batch(25).unwrap();
    let singles: Array1<f64> = (0..25).map(|_| real(sequential.draw().unwrap())).collect();
    assert_eq!(batch, singles);
}

#[test]
fn test_save_load_replays_draws() {
    let universe = Universe::with_seed(4);
    let x = Normal::standard(&universe);
    let snapshot = universe.save();
    let first: Vec<Value> = (0..5).map(|_| x.draw().unwrap()).collect();
    universe.load(&snapshot).unwrap();
    let replay: Vec<Value> = (0..5).map(|_| x.draw().unwrap()).collect();
    assert_eq!(first, replay);
    assert!(x.is_valid());
}

#[test]
fn test_snapshot_json_round_trip() {
    let universe = Universe::with_seed(12);
    let x = universe.uniform(0.0, 1.0);
    x.draw().unwrap();
    let json = serde_json::to_string(&universe.save()).unwrap();
    let expected = x.draw_batch(4).unwrap();

    let restored: UniverseSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.n(), 1);
    assert_eq!(restored.seed(), 12);
    universe.load(&restored).unwrap();
    assert_eq!(x.draw_batch(4).unwrap(), expected);
}

#[test]
fn test_snapshot_does_not_cross_restart() {
    let universe = Universe::new();
    let snapshot = universe.save();
    universe.restart(1);
    assert!(matches!(
        universe.load(&snapshot),
        Err(Error::StaleSnapshot { .. })
    ));
}

#[test]
fn test_registry_functions_on_random_variables() {
    let universe = Universe::new();
    let x = universe.uniform(1.0, 3.0);
    let hypot = functions::lookup("hypot").unwrap();
    let h = hypot
        .call(vec![Operand::from(&x), 4.0.into()])
        .unwrap()
        .into_random()
        .unwrap();
    let s = Sample::from(vec![1.0]);
    assert_eq!(real(h.evaluate(&s).unwrap()), 5.0);
    assert!(sample(&[&h], SamplerConfig::default()).is_ok());
}

#[test]
fn test_long_running_sum_builds_and_draws() {
    let universe = Universe::with_seed(0);
    let x = universe.uniform(0.0, 1.0);
    let mut acc = universe.constant(0.0);
    for _ in 0..100_000 {
        acc = &acc + &x;
    }
    let s = universe.sample();
    let xv = real(x.evaluate(&s).unwrap());
    let total = real(acc.evaluate(&s).unwrap());
    assert_relative_eq!(total, 100_000.0 * xv, max_relative = 1e-9);
    assert_eq!(acc.draw_batch(3).unwrap().len(), 3);
}

fn apply(op: usize, a: &RandomVariable, b: &RandomVariable) -> RandomVariable {
    match op {
        0 => a + b,
        1 => a - b,
        2 => a * b,
        3 => a / b,
        4 => a % b,
        5 => a.pow(b),
        6 => a.max(b),
        _ => a.floor_div(b),
    }
}

fn apply_values(op: usize, a: f64, b: f64) -> f64 {
    match op {
        0 => a + b,
        1 => a - b,
        2 => a * b,
        3 => a / b,
        4 => a % b,
        5 => a.powf(b),
        6 => a.max(b),
        _ => (a / b).floor(),
    }
}

proptest! {
    #[test]
    fn prop_operators_commute_with_evaluation(
        op in 0usize..8,
        u in 0.001f64..0.999,
        v in 0.001f64..0.999,
    ) {
        let universe = Universe::new();
        let x = universe.uniform(0.5, 4.0);
        let y = universe.uniform(0.5, 4.0);
        let z = apply(op, &x, &y);
        let s = Sample::from(vec![u, v]);
        let (xv, yv) = (real(x.evaluate(&s).unwrap()), real(y.evaluate(&s).unwrap()));
        prop_assert_eq!(real(z.evaluate(&s).unwrap()), apply_values(op, xv, yv));
    }

    #[test]
    fn prop_reflected_scalar_operators(c in -10.0f64..10.0, u in 0.001f64..0.999) {
        let universe = Universe::new();
        let x = universe.uniform(1.0, 2.0);
        let s = Sample::from(vec![u]);
        let xv = real(x.evaluate(&s).unwrap());
        prop_assert_eq!(real((c - &x).evaluate(&s).unwrap()), c - xv);
        prop_assert_eq!(real((c / &x).evaluate(&s).unwrap()), c / xv);
        prop_assert_eq!(real((&x - c).evaluate(&s).unwrap()), xv - c);
        prop_assert_eq!(real((&x * c).evaluate(&s).unwrap()), xv * c);
    }

    #[test]
    fn prop_comparisons_commute_with_evaluation(u in 0.001f64..0.999, v in 0.001f64..0.999) {
        let universe = Universe::new();
        let x = universe.uniform(0.0, 1.0);
        let y = universe.uniform(0.0, 1.0);
        let s = Sample::from(vec![u, v]);
        let (xv, yv) = (real(x.evaluate(&s).unwrap()), real(y.evaluate(&s).unwrap()));
        prop_assert_eq!(x.lt(&y).evaluate(&s).unwrap(), Value::Bool(xv < yv));
        prop_assert_eq!(x.ge(&y).evaluate(&s).unwrap(), Value::Bool(xv >= yv));
        prop_assert_eq!(x.equals(&x).evaluate(&s).unwrap(), Value::Bool(true));
    }
}
