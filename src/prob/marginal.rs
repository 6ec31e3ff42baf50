use nalgebra::{DVector, DMatrix};
use log::{debug, warn};
use crate::config::Strategy;
use crate::table::Table;
use crate::error::{ModelError, Result};
use super::params::Params;
use super::multinormal::{self, MultiNormal};

/// Removes the informed categorical and numerical fields from the parameters.
///
/// Numerical fields are dropped exactly by selecting the kept block of every component.
/// Categorical fields are either merged into moment-matched components
/// (Strategy::WeakMarginal) or kept in the store as shadow axes (Strategy::Shadowed).
pub fn marginalize_out(
    params : &mut Params,
    categorical : &[String],
    numerical : &[String],
    strategy : Strategy
) -> Result<()> {
    if !numerical.is_empty() {
        drop_numerical(params, numerical)?;
    }
    if !categorical.is_empty() {
        for name in categorical.iter() {
            match params.is_shadowed(name) {
                Some(false) => { },
                Some(true) => return Err(ModelError::AlreadyMarginalized(name.clone())),
                None => return Err(ModelError::UnknownField(name.clone()))
            }
        }
        match strategy {
            Strategy::WeakMarginal => weak_marginal(params, categorical)?,
            Strategy::Shadowed => shadow(params, categorical)
        }
    }
    params.update()
}

fn drop_numerical(params : &mut Params, remove : &[String]) -> Result<()> {
    for name in remove.iter() {
        if params.numerical_index(name).is_none() {
            return Err(ModelError::UnknownField(name.clone()));
        }
    }
    let keep : Vec<usize> = params.numericals.iter().enumerate()
        .filter(|(_, n)| !remove.contains(*n) )
        .map(|(i, _)| i )
        .collect();
    if keep.is_empty() {
        params.gauss = None;
        params.numericals.clear();
    } else {
        let gauss = params.gauss.as_ref().map(|g| g.map(|mn| mn.marginal(&keep[..]) ) );
        let numericals = keep.iter().map(|i| params.numericals[*i].clone() ).collect();
        params.gauss = gauss;
        params.numericals = numericals;
    }
    debug!("Marginalized numerical fields {:?}", remove);
    Ok(())
}

/// Sums P over the removed axes and replaces each group of merged components by the
/// Gaussian with the same first and second moments:
///
/// P' = Σ P
/// μ' = Σ P μ / P'
/// Σ' = Σ P (Σ + (μ - μ')(μ - μ')ᵀ) / P'
///
/// Groups of zero mass take the unweighted average of their components.
fn weak_marginal(params : &mut Params, remove : &[String]) -> Result<()> {
    let keep : Vec<String> = params.p.names().iter()
        .filter(|n| !remove.iter().any(|r| r == *n ) )
        .map(|n| n.to_string() )
        .collect();
    let red = params.p.reduce(&keep[..])?;
    let mut mass = vec![0.0; red.len()];
    let mut members : Vec<Vec<usize>> = vec![Vec::new(); red.len()];
    for (i, t) in red.target.iter().enumerate() {
        mass[*t] += params.p.cell(i);
        members[*t].push(i);
    }
    let gauss = match &params.gauss {
        Some(g) => {
            let k = params.numericals.len();
            let mut comps = Vec::with_capacity(red.len());
            for (t, group) in members.iter().enumerate() {
                let weights : Vec<f64> = if mass[t] > 0.0 {
                    group.iter().map(|i| params.p.cell(*i) / mass[t] ).collect()
                } else {
                    warn!("Zero-mass cell while marginalizing {:?}: averaging its {} components", remove, group.len());
                    vec![1. / group.len() as f64; group.len()]
                };
                let mut mu = DVector::zeros(k);
                for (i, w) in group.iter().zip(weights.iter()) {
                    mu += g.cell(*i).mean() * *w;
                }
                let mut sigma = DMatrix::zeros(k, k);
                for (i, w) in group.iter().zip(weights.iter()) {
                    let d = g.cell(*i).mean() - &mu;
                    sigma += (g.cell(*i).cov() + multinormal::dyad(&d)) * *w;
                }
                comps.push(MultiNormal::from_moments(mu, multinormal::build_symmetric(sigma))?);
            }
            Some(Table::new(red.axes.clone(), comps)?)
        },
        None => None
    };
    let shadowed = params.p.axes().iter().zip(params.shadowed.iter())
        .filter(|(a, _)| !remove.contains(&a.name) )
        .map(|(_, s)| *s )
        .collect();
    params.p = Table::new(red.axes, mass)?;
    params.gauss = gauss;
    params.shadowed = shadowed;
    debug!("Weak marginal over {:?} leaves {} cells", keep, params.p.len());
    Ok(())
}

/// Flags the removed axes as shadowed. The tensors are left untouched.
fn shadow(params : &mut Params, remove : &[String]) {
    for name in remove.iter() {
        if let Some(ix) = params.p.axis_index(name) {
            params.shadowed[ix] = true;
        }
    }
    debug!("Shadowed {:?}; stored axes {:?}", remove, params.p.names());
}
