use nalgebra::DVector;
use crate::error::{ModelError, Result};
use super::params::Params;

/// Log-density of the parameters at a point split into the levels of the visible
/// categorical axes (in axis order) and the numerical coordinates.
///
/// Every stored cell consistent with the categorical levels contributes
/// P · N(x; μ, Σ). Without shadow axes this is a single cell; with shadow axes it is
/// the finite mixture over all shadow combinations, accumulated in log-space.
pub fn log_density<S>(params : &Params, levels : &[S], x : &DVector<f64>) -> Result<f64>
where
    S : AsRef<str>
{
    let visible = params.visible();
    if levels.len() != visible.len() {
        return Err(ModelError::DimensionMismatch { expected : visible.len(), found : levels.len() });
    }
    if x.nrows() != params.numericals.len() {
        return Err(ModelError::DimensionMismatch { expected : params.numericals.len(), found : x.nrows() });
    }
    let pins : Vec<(&str, &str)> = visible.iter().zip(levels.iter())
        .map(|(n, l)| (*n, l.as_ref()) )
        .collect();
    let cells = params.p.matching(&pins[..])?;
    let terms : Vec<f64> = cells.iter()
        .filter(|i| *params.p.cell(**i) > 0.0 )
        .map(|i| {
            let lp = params.p.cell(*i).ln();
            match &params.gauss {
                Some(g) => lp + g.cell(*i).log_density(x),
                None => lp
            }
        })
        .collect();
    Ok(log_sum_exp(&terms[..]))
}

pub fn density<S>(params : &Params, levels : &[S], x : &DVector<f64>) -> Result<f64>
where
    S : AsRef<str>
{
    log_density(params, levels, x).map(|l| l.exp() )
}

/// ln Σ exp(t), which is -∞ for an empty slice.
fn log_sum_exp(terms : &[f64]) -> f64 {
    let max = terms.iter().cloned().fold(std::f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + terms.iter().map(|t| (t - max).exp() ).sum::<f64>().ln()
}

#[cfg(test)]
mod tests {

    use super::*;
    use nalgebra::DMatrix;
    use crate::table::{Axis, Table};
    use crate::prob::multinormal::MultiNormal;

    #[test]
    fn mixture_over_shadows() {
        let axes = vec![Axis::new("a", vec!["x", "y"]), Axis::new("b", vec!["s", "t"])];
        let p = Table::new(axes.clone(), vec![0.1, 0.2, 0.3, 0.4]).unwrap();
        let comps : Vec<MultiNormal> = (0..4).map(|i| MultiNormal::new(DVector::from_element(1, i as f64), DMatrix::identity(1, 1)).unwrap() ).collect();
        let mut params = Params::new(p, Some(Table::new(axes, comps.clone()).unwrap()), vec!["u".to_string()]).unwrap();
        params.shadowed[0] = true;
        let x = DVector::from_element(1, 0.7);
        let expected = 0.1 * comps[0].density(&x) + 0.3 * comps[2].density(&x);
        let d = density(&params, &["s"], &x).unwrap();
        assert!((d - expected).abs() < 1E-12);
        assert!(matches!(density(&params, &["s", "x"], &x), Err(ModelError::DimensionMismatch { .. })));
        assert!(matches!(density(&params, &["q"], &x), Err(ModelError::InvalidDomain(_))));
    }

    #[test]
    fn empty_point() {
        let params = Params::empty();
        let none : [&str; 0] = [];
        assert_eq!(density(&params, &none, &DVector::zeros(0)).unwrap(), 1.0);
    }

    #[test]
    fn zero_cell() {
        let axes = vec![Axis::new("a", vec!["x", "y"])];
        let params = Params::new(Table::new(axes, vec![1.0, 0.0]).unwrap(), None, Vec::new()).unwrap();
        assert_eq!(density(&params, &["y"], &DVector::zeros(0)).unwrap(), 0.0);
        assert_eq!(log_density(&params, &["y"], &DVector::zeros(0)).unwrap(), std::f64::NEG_INFINITY);
    }

}
