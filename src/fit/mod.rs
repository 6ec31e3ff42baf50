use nalgebra::{DVector, DMatrix};
use log::{debug, warn};
use crate::field::{Field, FieldKind};
use crate::table::{Axis, Table};
use crate::sample::{Sample, Column};
use crate::prob::{Params, MultiNormal};
use crate::error::{ModelError, Result};

/// Trait shared by the estimation algorithms, parametrized by what they produce.
/// Estimators own their last result, so fit(.) hands out a reference to it.
pub trait Estimator<D> {

    /// Runs the estimation for the informed sample, returning a reference to the
    /// estimate.
    fn fit<'a>(&'a mut self, sample : &Sample) -> Result<&'a D>;

    /// If fit(.) has been called successfully at least once, returns the current
    /// estimate.
    fn estimate<'a>(&'a self) -> Option<&'a D>;

}

/// Fields and parameters of a conditional-Gaussian model, as estimated from a sample.
#[derive(Debug, Clone)]
pub struct Estimate {
    pub fields : Vec<Field>,
    pub params : Params
}

/// Maximum-likelihood estimator for conditional-Gaussian models with a covariance
/// matrix shared by all categorical cells:
///
/// P(c) = (n_c + α) / (n + α |C|)
/// μ(c) = mean of the rows falling into c
/// Σ = 1/n Σ_rows (y - μ(c))(y - μ(c))ᵀ
///
/// where α is the smoothing pseudo-count. Cells without rows take the overall mean.
#[derive(Debug, Clone, Default)]
pub struct MaxLikelihood {
    smoothing : f64,
    estimate : Option<Estimate>
}

impl MaxLikelihood {

    pub fn new(smoothing : f64) -> Self {
        Self { smoothing, estimate : None }
    }

}

impl Estimator<Estimate> for MaxLikelihood {

    fn fit<'a>(&'a mut self, sample : &Sample) -> Result<&'a Estimate> {
        let n = sample.nrows();
        if n == 0 || sample.ncols() == 0 {
            return Err(ModelError::EmptySample);
        }
        let mut cat_cols = Vec::new();
        let mut num_cols = Vec::new();
        for col in sample.columns() {
            match col.kind()? {
                FieldKind::Categorical => cat_cols.push(col),
                FieldKind::Numerical => num_cols.push(col)
            }
        }

        let mut fields = Vec::with_capacity(sample.ncols());
        let mut axes = Vec::with_capacity(cat_cols.len());
        let mut cat_data : Vec<Vec<&str>> = Vec::with_capacity(cat_cols.len());
        for col in cat_cols.iter() {
            let values : Vec<&str> = text_of(col)?;
            let mut levels : Vec<String> = values.iter().map(|v| v.to_string() ).collect();
            levels.sort();
            levels.dedup();
            fields.push(Field::categorical(&col.name, levels.clone())?);
            axes.push(Axis::new(&col.name, levels));
            cat_data.push(values);
        }
        let mut num_data : Vec<Vec<f64>> = Vec::with_capacity(num_cols.len());
        for col in num_cols.iter() {
            let values = col.get_if_numeric()
                .ok_or_else(|| ModelError::UnsupportedDtype(format!("column '{}' is not numeric", col.name)) )?;
            if values.iter().any(|v| !v.is_finite() ) {
                return Err(ModelError::UnsupportedDtype(format!("column '{}' has non-finite entries", col.name)));
            }
            let lower = values.iter().cloned().fold(std::f64::INFINITY, f64::min);
            let upper = values.iter().cloned().fold(std::f64::NEG_INFINITY, f64::max);
            fields.push(Field::numerical(&col.name, lower, upper)?);
            num_data.push(values);
        }

        let mut counts : Table<f64> = Table::from_fn(axes.clone(), |_| 0.0 );
        let mut cells = Vec::with_capacity(n);
        for r in 0..n {
            let labels : Vec<&str> = cat_data.iter().map(|c| c[r] ).collect();
            let flat = counts.locate(&labels[..])?;
            *counts.cell_mut(flat) += 1.0;
            cells.push(flat);
        }
        let alpha = self.smoothing;
        if alpha > 0.0 && counts.iter().any(|c| *c == 0.0 ) {
            warn!("Smoothing empty cells of {:?} with pseudo-count {}", counts.names(), alpha);
        }
        let denom = n as f64 + alpha * counts.len() as f64;
        let p = counts.map(|c| (c + alpha) / denom );

        let (gauss, numericals) = if num_data.is_empty() {
            (None, Vec::new())
        } else {
            let k = num_data.len();
            let rows : Vec<DVector<f64>> = (0..n)
                .map(|r| DVector::from_iterator(k, num_data.iter().map(|c| c[r] )) )
                .collect();
            let overall = rows.iter().fold(DVector::zeros(k), |acc, y| acc + y ) / n as f64;
            let mut sums = vec![DVector::<f64>::zeros(k); counts.len()];
            for (y, c) in rows.iter().zip(cells.iter()) {
                sums[*c] += y;
            }
            let mut n_empty = 0;
            let means : Vec<DVector<f64>> = sums.into_iter().zip(counts.iter())
                .map(|(s, c)| if *c > 0.0 { s / *c } else { n_empty += 1; overall.clone() } )
                .collect();
            if n_empty > 0 {
                warn!("{} empty cell(s) take the overall mean", n_empty);
            }
            let mut sigma = DMatrix::zeros(k, k);
            for (y, c) in rows.iter().zip(cells.iter()) {
                let d = y - &means[*c];
                sigma += &d * d.transpose();
            }
            sigma /= n as f64;
            let comps = means.into_iter()
                .map(|mu| MultiNormal::from_moments(mu, sigma.clone()) )
                .collect::<Result<Vec<_>>>()?;
            let numericals = num_cols.iter().map(|c| c.name.clone() ).collect();
            (Some(Table::new(axes.clone(), comps)?), numericals)
        };

        let params = Params::new(p, gauss, numericals)?;
        debug!("Fitted {} categorical and {} numerical field(s) on {} rows", cat_cols.len(), num_cols.len(), n);
        self.estimate = Some(Estimate { fields, params });
        self.estimate.as_ref().ok_or(ModelError::EmptySample)
    }

    fn estimate<'a>(&'a self) -> Option<&'a Estimate> {
        self.estimate.as_ref()
    }

}

fn text_of(col : &Column) -> Result<Vec<&str>> {
    col.text_iter()
        .map(|it| it.collect() )
        .ok_or_else(|| ModelError::UnsupportedDtype(format!("column '{}' is not textual", col.name)) )
}
