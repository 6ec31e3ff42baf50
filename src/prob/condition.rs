use nalgebra::DVector;
use log::debug;
use crate::error::{ModelError, Result};
use super::params::Params;

/// Conditions the parameters on categorical fields pinned at a level and numerical fields
/// pinned at a value, removing those fields from the store.
///
/// Categorical pins slice P and the Gaussian components at the pinned combination and
/// renormalize the slice by its mass. Shadow axes are never pinned and survive the
/// slice. Numerical pins replace every component by its conditional distribution
/// (Schur complement of the pinned block).
pub fn condition_out(
    params : &mut Params,
    categorical : &[(String, String)],
    numerical : &[(String, f64)]
) -> Result<()> {
    if !categorical.is_empty() {
        condition_categorical(params, categorical)?;
    }
    if !numerical.is_empty() {
        condition_numerical(params, numerical)?;
    }
    params.update()
}

fn condition_categorical(params : &mut Params, pins : &[(String, String)]) -> Result<()> {
    for (name, _) in pins.iter() {
        match params.is_shadowed(name) {
            Some(false) => { },
            Some(true) => return Err(ModelError::AlreadyMarginalized(name.clone())),
            None => return Err(ModelError::UnknownField(name.clone()))
        }
    }
    let mut p = params.p.slice(pins)?;
    let mass = p.normalize().map_err(|_| {
        let desc : Vec<String> = pins.iter().map(|(n, l)| format!("{}={}", n, l) ).collect();
        ModelError::ZeroProbability(desc.join(", "))
    })?;
    let gauss = match &params.gauss {
        Some(g) => Some(g.slice(pins)?),
        None => None
    };
    let shadowed = params.p.axes().iter().zip(params.shadowed.iter())
        .filter(|(a, _)| !pins.iter().any(|(n, _)| *n == a.name ) )
        .map(|(_, s)| *s )
        .collect();
    debug!("Conditioned on {:?} (mass {})", pins, mass);
    params.p = p;
    params.gauss = gauss;
    params.shadowed = shadowed;
    Ok(())
}

fn condition_numerical(params : &mut Params, pins : &[(String, f64)]) -> Result<()> {
    let mut fixed = Vec::with_capacity(pins.len());
    for (name, _) in pins.iter() {
        let ix = params.numerical_index(name).ok_or_else(|| ModelError::UnknownField(name.clone()) )?;
        fixed.push(ix);
    }
    let keep : Vec<usize> = (0..params.numericals.len()).filter(|i| !fixed.contains(i) ).collect();
    if keep.is_empty() {
        params.gauss = None;
        params.numericals.clear();
        debug!("Conditioned out every numerical field");
        return Ok(());
    }
    let value = DVector::from_iterator(pins.len(), pins.iter().map(|(_, v)| *v ));
    let gauss = match &params.gauss {
        Some(g) => Some(g.try_map(|mn| mn.conditional(&keep[..], &fixed[..], &value) )?),
        None => None
    };
    let numericals = keep.iter().map(|i| params.numericals[*i].clone() ).collect();
    params.gauss = gauss;
    params.numericals = numericals;
    debug!("Conditioned on {:?}", pins);
    Ok(())
}

#[cfg(test)]
mod tests {

    use super::*;
    use nalgebra::DMatrix;
    use crate::table::{Axis, Table};
    use crate::prob::multinormal::MultiNormal;

    fn store() -> Params {
        let axes = vec![Axis::new("a", vec!["x", "y"])];
        let p = Table::new(axes.clone(), vec![0.25, 0.75]).unwrap();
        let sigma = DMatrix::from_row_slice(2, 2, &[2., 1., 1., 2.]);
        let g = Table::new(axes, vec![
            MultiNormal::from_moments(DVector::from_vec(vec![0., 0.]), sigma.clone()).unwrap(),
            MultiNormal::from_moments(DVector::from_vec(vec![1., 2.]), sigma).unwrap()
        ]).unwrap();
        Params::new(p, Some(g), vec!["u".to_string(), "v".to_string()]).unwrap()
    }

    #[test]
    fn categorical_slice_renormalizes() {
        let mut params = store();
        condition_out(&mut params, &[("a".to_string(), "y".to_string())], &[]).unwrap();
        assert!(params.p().is_scalar());
        assert_eq!(params.p().data(), &[1.0]);
        assert_eq!(params.gauss().unwrap().cell(0).mean()[1], 2.);
        assert!(params.shadow_mask().is_empty());
    }

    #[test]
    fn numerical_schur_update() {
        let mut params = store();
        condition_out(&mut params, &[], &[("v".to_string(), 1.)]).unwrap();
        assert_eq!(params.numericals(), &["u".to_string()]);
        let g = params.gauss().unwrap();
        // 0 + 1/2 * (1 - 0); 2 - 1/2
        assert!((g.cell(0).mean()[0] - 0.5).abs() < 1E-12);
        assert!((g.cell(0).cov()[(0, 0)] - 1.5).abs() < 1E-12);
        assert!((g.cell(1).mean()[0] - 0.5).abs() < 1E-12);
        assert_eq!(params.p().data(), &[0.25, 0.75]);
    }

    #[test]
    fn zero_mass_outcome() {
        let axes = vec![Axis::new("a", vec!["x", "y"])];
        let mut params = Params::new(Table::new(axes, vec![1.0, 0.0]).unwrap(), None, Vec::new()).unwrap();
        let res = condition_out(&mut params, &[("a".to_string(), "y".to_string())], &[]);
        assert!(matches!(res, Err(ModelError::ZeroProbability(_))));
    }

    #[test]
    fn all_numericals_removed() {
        let mut params = store();
        condition_out(&mut params, &[], &[("u".to_string(), 0.), ("v".to_string(), 3.)]).unwrap();
        assert!(params.gauss().is_none());
        assert!(params.numericals().is_empty());
        assert_eq!(params.p().data(), &[0.25, 0.75]);
    }

}
