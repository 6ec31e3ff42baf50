use nalgebra::DVector;
use log::debug;
use crate::config::ModeHeuristic;
use crate::table::Table;
use crate::error::{ModelError, Result};
use super::params::Params;
use super::density;
use super::multinormal::MultiNormal;

/// Point of (approximately) maximal density: levels of the visible categorical axes
/// plus the numerical coordinates.
///
/// Without shadow axes the mode is exact: every cell peaks at its mean with height
/// P · (2π)^(-k/2) |Σ|^-1/2, so the best cell wins. Shadowed models are finite mixtures
/// without a closed-form mode, so one of two heuristics is used:
///
/// BestComponent: the mean of the single component with the highest peak, shadow
/// coordinates dropped.
///
/// BestMixture: the component mean at which the full mixture density is highest.
///
/// Ties resolve to the first cell in row-major order.
pub fn mode(params : &Params, heuristic : ModeHeuristic) -> Result<(Vec<String>, DVector<f64>)> {
    let best = match (&params.gauss, params.has_shadows()) {
        (None, true) => {
            let shadows = params.shadows();
            let visible = params.p.sum(&shadows[..])?;
            let ix = visible.argmax().ok_or_else(empty_table)?;
            return Ok((visible.labels(&visible.coord(ix)[..]), DVector::zeros(0)));
        },
        (None, false) => params.p.argmax(),
        (Some(g), false) => peaks(params.p(), g)?.argmax(),
        (Some(g), true) => match heuristic {
            ModeHeuristic::BestComponent => peaks(params.p(), g)?.argmax(),
            ModeHeuristic::BestMixture => {
                let mut scores = Vec::with_capacity(g.len());
                for (i, mn) in g.iter().enumerate() {
                    let levels = visible_labels(params, i);
                    scores.push(density::density(params, &levels[..], mn.mean())?);
                }
                Table::new(params.p.axes().to_vec(), scores)?.argmax()
            }
        }
    };
    let ix = best.ok_or_else(empty_table)?;
    let levels = visible_labels(params, ix);
    let values = match &params.gauss {
        Some(g) => g.cell(ix).mean().clone(),
        None => DVector::zeros(0)
    };
    debug!("Mode at cell {} of {}: {:?}", ix, params.p.len(), levels);
    Ok((levels, values))
}

fn peaks(p : &Table<f64>, g : &Table<MultiNormal>) -> Result<Table<f64>> {
    let scores = p.iter().zip(g.iter()).map(|(p, mn)| p * mn.peak() ).collect();
    Table::new(p.axes().to_vec(), scores)
}

/// Levels of the visible axes at the informed stored cell.
fn visible_labels(params : &Params, flat : usize) -> Vec<String> {
    let coord = params.p.coord(flat);
    params.p.axes().iter()
        .zip(coord.iter())
        .zip(params.shadowed.iter())
        .filter(|(_, s)| !**s )
        .map(|((a, c), _)| a.levels[*c].clone() )
        .collect()
}

fn empty_table() -> ModelError {
    ModelError::UnsupportedOperation("mode of a table without cells".to_string())
}
