use nalgebra::*;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use rand_distr::StandardNormal;
use approx::{assert_relative_eq, assert_abs_diff_eq};
use proptest::prelude::*;
use condgauss::{Model, CondGaussian, Aggregation, ModelConfig, ModeHeuristic, Value, FieldKind, ModelError, Sample};
use condgauss::{Condition, Operator};
use condgauss::prob::{is_psd, Params, MultiNormal};
use condgauss::sample::Column;

const EPS : f64 = 1E-9;

/// Cell means of the four clusters, in row-major order of (a, b).
const MEANS : [[f64; 2]; 4] = [[0., 0.], [1., 3.], [-10., 1.], [-5., -6.]];

const COUNTS : [usize; 4] = [800, 600, 400, 200];

/// Draws the four clusters with the shared covariance [[3, 0.5], [0.5, 1]].
fn clusters(seed : u64) -> anyhow::Result<Sample> {
    let sigma = DMatrix::from_row_slice(2, 2, &[3., 0.5, 0.5, 1.]);
    let chol = Cholesky::new(sigma).ok_or_else(|| anyhow::anyhow!("Covariance is not positive-definite"))?;
    let mut rng = StdRng::seed_from_u64(seed);
    let (mut a, mut b, mut x, mut y) = (Vec::new(), Vec::new(), Vec::new(), Vec::new());
    let labels = [("a0", "b0"), ("a0", "b1"), ("a1", "b0"), ("a1", "b1")];
    for ((mean, n), (la, lb)) in MEANS.iter().zip(COUNTS.iter()).zip(labels.iter()) {
        for _ in 0..*n {
            let z = DVector::from_fn(2, |_, _| rng.sample::<f64, _>(StandardNormal) );
            let v = chol.l() * z;
            a.push(la.to_string());
            b.push(lb.to_string());
            x.push(mean[0] + v[0]);
            y.push(mean[1] + v[1]);
        }
    }
    Ok(Sample::new(vec![
        Column::new_text("a", a),
        Column::new_text("b", b),
        Column::new_num("x", x),
        Column::new_num("y", y)
    ])?)
}

fn fitted(config : ModelConfig) -> anyhow::Result<CondGaussian> {
    Ok(CondGaussian::fit(&clusters(42)?, config)?)
}

fn gauss(x : &DVector<f64>, mu : &DVector<f64>, sigma : &DMatrix<f64>) -> f64 {
    let k = x.nrows() as f64;
    let d = x - mu;
    let inv = sigma.clone().try_inverse().unwrap();
    let q = (d.transpose() * inv * &d)[0];
    (2. * std::f64::consts::PI).powf(-k / 2.) * sigma.determinant().powf(-0.5) * (-0.5 * q).exp()
}

/// Density at x of the component of x given y, for a component over (x, y).
fn conditional_x(mn : &MultiNormal, x : f64, y : f64) -> f64 {
    let (mu, s) = (mn.mean(), mn.cov());
    let k = s[(0, 1)] / s[(1, 1)];
    let mean = mu[0] + k * (y - mu[1]);
    let var = s[(0, 0)] - k * s[(1, 0)];
    gauss(&DVector::from_element(1, x), &DVector::from_element(1, mean), &DMatrix::from_element(1, 1, var))
}

fn point(a : &str, b : &str, x : f64, y : f64) -> Vec<Value> {
    vec![Value::from(a), Value::from(b), Value::from(x), Value::from(y)]
}

#[test]
fn cluster_parameters_are_recovered() -> anyhow::Result<()> {
    let m = fitted(ModelConfig::default())?;
    assert_eq!(m.names(), vec!["a", "b", "x", "y"]);
    let params = m.params();
    assert_relative_eq!(params.p().total(), 1.0, epsilon = EPS);
    for (p, n) in params.p().iter().zip(COUNTS.iter()) {
        assert_relative_eq!(*p, *n as f64 / 2000., epsilon = EPS);
    }
    let g = params.gauss().unwrap();
    for (mn, mean) in g.iter().zip(MEANS.iter()) {
        assert_abs_diff_eq!(mn.mean()[0], mean[0], epsilon = 0.5);
        assert_abs_diff_eq!(mn.mean()[1], mean[1], epsilon = 0.5);
        assert_abs_diff_eq!(mn.cov()[(0, 0)], 3.0, epsilon = 0.4);
        assert_abs_diff_eq!(mn.cov()[(0, 1)], 0.5, epsilon = 0.4);
        assert_abs_diff_eq!(mn.cov()[(1, 1)], 1.0, epsilon = 0.4);
    }

    // All cells share the pooled covariance, so the mode is the mean of the heaviest cell.
    let mode = m.aggregate(Aggregation::Maximum)?;
    assert_eq!(&mode[..2], &[Value::from("a0"), Value::from("b0")]);
    assert_abs_diff_eq!(mode[2].as_num().unwrap(), 0.0, epsilon = 0.5);
    assert_eq!(m.aggregate(Aggregation::Average)?, mode);
    Ok(())
}

#[test]
fn keeping_every_field_is_a_noop() -> anyhow::Result<()> {
    for config in [ModelConfig::default(), ModelConfig::shadowed()].iter() {
        let m = fitted(config.clone())?;
        let mut kept = m.copy();
        kept.marginalize(&["a", "b", "x", "y"])?;
        assert_eq!(kept, m);
        let none : [&str; 0] = [];
        kept.marginalize_out(&none)?.condition(&[])?;
        assert_eq!(kept, m);
    }
    Ok(())
}

#[test]
fn conditioning_decomposes_the_joint() -> anyhow::Result<()> {
    let m = fitted(ModelConfig::default())?;
    let mut cond = m.copy();
    cond.condition(&[("a", Value::from("a1"))])?;
    assert_eq!(cond.names(), vec!["b", "x", "y"]);
    let mut marg = m.copy();
    marg.marginalize(&["a"])?;
    let p_a1 = marg.density(&[Value::from("a1")])?;
    assert_relative_eq!(p_a1, 0.3, epsilon = EPS);
    for (b, x, y) in [("b0", -10., 1.), ("b1", -4., -5.5), ("b0", 0., 0.)].iter() {
        let joint = m.density(&point("a1", b, *x, *y))?;
        let rest = cond.density(&[Value::from(*b), Value::from(*x), Value::from(*y)])?;
        assert_relative_eq!(rest, joint / p_a1, max_relative = 1E-9);
    }
    Ok(())
}

#[test]
fn weak_marginal_matches_mixture_moments() -> anyhow::Result<()> {
    let m = fitted(ModelConfig::default())?;
    let full = m.params().clone();
    let mut weak = m.copy();
    weak.marginalize(&["a", "x", "y"])?;
    let g = full.gauss().unwrap();
    for (i, level) in ["a0", "a1"].iter().enumerate() {
        let cells = [2 * i, 2 * i + 1];
        let mass : f64 = cells.iter().map(|c| full.p().cell(*c) ).sum();
        let mu = cells.iter().fold(DVector::<f64>::zeros(2), |acc, c| acc + g.cell(*c).mean() * (*full.p().cell(*c) / mass) );
        let sigma = cells.iter().fold(DMatrix::<f64>::zeros(2, 2), |acc, c| {
            let d = g.cell(*c).mean() - &mu;
            acc + (g.cell(*c).cov() + &d * d.transpose()) * (*full.p().cell(*c) / mass)
        });
        let merged = weak.params().gauss().unwrap().cell(i);
        assert_eq!(weak.params().p().axes()[0].levels[i], level.to_string());
        assert_relative_eq!(*weak.params().p().cell(i), mass, epsilon = EPS);
        for (m, r) in merged.mean().iter().zip(mu.iter()) {
            assert_relative_eq!(*m, *r, epsilon = EPS);
        }
        for (m, r) in merged.cov().iter().zip(sigma.iter()) {
            assert_relative_eq!(*m, *r, epsilon = EPS);
        }
    }
    Ok(())
}

#[test]
fn shadowed_marginal_is_exact() -> anyhow::Result<()> {
    let weak = fitted(ModelConfig::default())?;
    let shadowed = fitted(ModelConfig::shadowed())?;
    let pt = point("a1", "b0", -9., 0.5);
    assert_eq!(weak.density(&pt)?, shadowed.density(&pt)?);

    let mut hidden = shadowed.copy();
    hidden.marginalize_out(&["b"])?;
    assert_eq!(hidden.names(), vec!["a", "x", "y"]);
    assert_eq!(hidden.params().p(), shadowed.params().p());
    assert_eq!(hidden.params().gauss(), shadowed.params().gauss());
    assert_eq!(hidden.params().shadow_mask(), &[false, true]);

    let full = shadowed.params();
    let g = full.gauss().unwrap();
    let x = DVector::from_vec(vec![-3., -2.]);
    for (i, level) in ["a0", "a1"].iter().enumerate() {
        let expected : f64 = [2 * i, 2 * i + 1].iter()
            .map(|c| full.p().cell(*c) * gauss(&x, g.cell(*c).mean(), g.cell(*c).cov()) )
            .sum();
        let d = hidden.density(&[Value::from(*level), Value::from(x[0]), Value::from(x[1])])?;
        assert_relative_eq!(d, expected, max_relative = 1E-9);
    }

    // The exact marginal over x alone differs from the moment-matched one.
    let mut weak_x = weak.copy();
    weak_x.marginalize(&["x"])?;
    let mut exact_x = shadowed.copy();
    exact_x.marginalize(&["x"])?;
    let expected : f64 = (0..4)
        .map(|c| full.p().cell(c) * gauss(&DVector::from_element(1, -3.), &g.cell(c).mean().rows(0, 1).into_owned(), &g.cell(c).cov().slice((0, 0), (1, 1)).into_owned()) )
        .sum();
    assert_relative_eq!(exact_x.density(&[Value::from(-3.)])?, expected, max_relative = 1E-9);
    assert!((weak_x.density(&[Value::from(-3.)])? - expected).abs() > 1E-6);
    Ok(())
}

#[test]
fn shadowed_mode_picks_a_component_mean() -> anyhow::Result<()> {
    let mut m = fitted(ModelConfig::shadowed())?;
    m.marginalize(&["x", "y"])?;
    let mode = m.aggregate(Aggregation::Maximum)?;
    assert_eq!(mode.len(), 2);
    let g = m.params().gauss().unwrap();
    assert!(g.iter().any(|mn| mn.mean()[0] == mode[0].as_num().unwrap() && mn.mean()[1] == mode[1].as_num().unwrap() ));

    let mut cfg = ModelConfig::shadowed();
    cfg.mode = ModeHeuristic::BestComponent;
    let mut h1 = fitted(cfg)?;
    h1.marginalize(&["x", "y"])?;
    let best = h1.aggregate(Aggregation::Maximum)?;
    assert_abs_diff_eq!(best[0].as_num().unwrap(), 0.0, epsilon = 0.5);
    Ok(())
}

#[test]
fn conditioning_out_numericals_leaves_categorical_marginal() -> anyhow::Result<()> {
    let m = fitted(ModelConfig::default())?;
    let mut cat = m.copy();
    cat.condition(&[("x", Value::from(0.)), ("y", Value::from(0.))])?;
    assert!(cat.params().gauss().is_none());
    let mut marg = m.copy();
    marg.marginalize(&["a", "b"])?;
    assert_eq!(cat.params().p(), marg.params().p());
    assert_eq!(cat.aggregate(Aggregation::Maximum)?, vec![Value::from("a0"), Value::from("b0")]);
    Ok(())
}

#[test]
fn invalid_requests() -> anyhow::Result<()> {
    let mut m = fitted(ModelConfig::default())?;
    assert!(matches!(m.density(&point("a0", "b0", 0., 0.)[..3]), Err(ModelError::DimensionMismatch { .. })));
    assert!(matches!(m.density(&point("a0", "b9", 0., 0.)), Err(ModelError::InvalidDomain(_))));
    assert!(matches!(
        m.density(&[Value::from(0.), Value::from("b0"), Value::from(0.), Value::from(0.)]),
        Err(ModelError::UnsupportedDtype(_))
    ));
    assert!(matches!(m.condition(&[("a", Value::from("a9"))]), Err(ModelError::InvalidDomain(_))));
    assert!(matches!(m.marginalize(&["z"]), Err(ModelError::UnknownField(_))));
    assert_eq!(m.dim(), 4);
    Ok(())
}

#[test]
fn sampled_rows_follow_the_model() -> anyhow::Result<()> {
    let m = fitted(ModelConfig::default())?;
    let mut rng = StdRng::seed_from_u64(7);
    let sample = m.sample(4000, &mut rng)?;
    assert_eq!(sample.names(), vec!["a", "b", "x", "y"]);
    let refit = CondGaussian::fit(&sample, ModelConfig::default())?;
    for (p, q) in refit.params().p().iter().zip(m.params().p().iter()) {
        assert_abs_diff_eq!(*p, *q, epsilon = 0.05);
    }
    Ok(())
}

#[test]
fn csv_round_trip_through_the_model() -> anyhow::Result<()> {
    let content = "group,score\nA,1.0\nB,2.5\nA,1.4\nB,3.1\nA,0.8\n";
    let sample = condgauss::sample::csv::load(content.as_bytes())?;
    let m = CondGaussian::fit(&sample, ModelConfig::default())?;
    assert_eq!(m.by_name("group").map(|f| f.kind()), Some(FieldKind::Categorical));
    assert_eq!(m.by_name("score").map(|f| f.kind()), Some(FieldKind::Numerical));
    assert_relative_eq!(m.params().p().total(), 1.0, epsilon = EPS);
    Ok(())
}

#[test]
fn conditioning_beyond_the_training_range() -> anyhow::Result<()> {
    let m = fitted(ModelConfig::default())?;
    let y = 40.;
    let mut cond = m.copy();
    cond.condition(&[("y", Value::from(y))])?;
    assert_eq!(cond.names(), vec!["a", "b", "x"]);
    let full = m.params();
    let g = full.gauss().unwrap();
    let cells = [("a0", "b0"), ("a0", "b1"), ("a1", "b0"), ("a1", "b1")];
    for (c, (a, b)) in cells.iter().enumerate() {
        let expected = full.p().cell(c) * conditional_x(g.cell(c), 25., y);
        let d = cond.density(&[Value::from(*a), Value::from(*b), Value::from(25.)])?;
        assert_relative_eq!(d, expected, max_relative = 1E-9);
    }

    let mut far = m.copy();
    far.restrict(&[Condition::new("x", Operator::Less(-100.))])?;
    assert!(far.by_name("x").map(|f| !f.is_singular() ).unwrap_or(false));
    far.condition(&[("x", Value::from(-150.))])?;
    assert_eq!(far.names(), vec!["a", "b", "y"]);
    Ok(())
}

#[test]
fn conditioning_keeps_hidden_mixture() -> anyhow::Result<()> {
    let m = fitted(ModelConfig::shadowed())?;
    let full = m.params().clone();
    let g = full.gauss().unwrap();
    let mut hidden = m.copy();
    hidden.marginalize_out(&["b"])?;

    // Pinning the visible categorical slices away its axis only.
    let mut on_a = hidden.copy();
    on_a.condition(&[("a", Value::from("a1"))])?;
    assert_eq!(on_a.names(), vec!["x", "y"]);
    assert_eq!(on_a.params().shadow_mask(), &[true]);
    assert_eq!(on_a.params().shadows(), vec!["b"]);
    let p_a1 = full.p().cell(2) + full.p().cell(3);
    let x = DVector::from_vec(vec![-7., 0.]);
    let expected : f64 = [2, 3].iter()
        .map(|c| full.p().cell(*c) / p_a1 * gauss(&x, g.cell(*c).mean(), g.cell(*c).cov()) )
        .sum();
    let joint = hidden.density(&[Value::from("a1"), Value::from(x[0]), Value::from(x[1])])?;
    let d = on_a.density(&[Value::from(x[0]), Value::from(x[1])])?;
    assert_relative_eq!(d, expected, max_relative = 1E-9);
    assert_relative_eq!(d, joint / p_a1, max_relative = 1E-9);

    // Pinning a numerical conditions every hidden component.
    let mut on_y = hidden.copy();
    on_y.condition(&[("y", Value::from(0.5))])?;
    assert_eq!(on_y.names(), vec!["a", "x"]);
    assert_eq!(on_y.params().shadow_mask(), &[false, true]);
    let expected : f64 = [2, 3].iter()
        .map(|c| full.p().cell(*c) * conditional_x(g.cell(*c), -7., 0.5) )
        .sum();
    let d = on_y.density(&[Value::from("a1"), Value::from(-7.)])?;
    assert_relative_eq!(d, expected, max_relative = 1E-9);
    assert!(matches!(on_y.condition(&[("b", Value::from("b0"))]), Err(ModelError::AlreadyMarginalized(_))));
    Ok(())
}

proptest! {

    #[test]
    fn fitted_probabilities_sum_to_one(
        rows in prop::collection::vec((0usize..3, 0usize..2), 1..60),
        smoothing in 0.0f64..2.0
    ) {
        let a : Vec<String> = rows.iter().map(|(a, _)| format!("a{}", a) ).collect();
        let b : Vec<String> = rows.iter().map(|(_, b)| format!("b{}", b) ).collect();
        let sample = Sample::new(vec![Column::new_text("a", a), Column::new_text("b", b)]).unwrap();
        let mut cfg = ModelConfig::default();
        cfg.smoothing = smoothing;
        let m = CondGaussian::fit(&sample, cfg).unwrap();
        prop_assert!((m.params().p().total() - 1.0).abs() < EPS);
        let mode = m.aggregate(Aggregation::Maximum).unwrap();
        let best = m.density(&mode[..]).unwrap();
        prop_assert!(m.params().p().iter().all(|p| *p <= best + EPS ));
    }

    #[test]
    fn conditioned_covariance_is_psd(v in -20.0f64..20.0, which in 0usize..2) {
        let m = fitted(ModelConfig::default()).unwrap();
        let mut cond = m.copy();
        let name = ["x", "y"][which];
        cond.condition(&[(name, Value::from(v))]).unwrap();
        let g = cond.params().gauss().unwrap();
        for mn in g.iter() {
            prop_assert!(is_psd(mn.cov(), 1E-12));
            prop_assert!(mn.cov()[(0, 0)] > 0.0);
        }
    }

    #[test]
    fn shadowing_preserves_parameters(which in 0usize..2) {
        let m = fitted(ModelConfig::shadowed()).unwrap();
        let mut hidden = m.copy();
        hidden.marginalize_out(&[["a", "b"][which]]).unwrap();
        prop_assert_eq!(hidden.params().p(), m.params().p());
        prop_assert_eq!(hidden.params().gauss(), m.params().gauss());
        prop_assert_eq!(hidden.dim(), 3);
        let empty = Params::empty();
        prop_assert!(hidden.params() != &empty);
    }

}
