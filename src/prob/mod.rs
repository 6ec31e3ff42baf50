use serde::{Serialize, Deserialize};
use crate::field::{Field, Value, Condition};
use crate::error::{ModelError, Result};

/// Multivariate normal components with cached precision and determinant factor.
mod multinormal;

pub use multinormal::*;

/// Categorical probability table plus per-cell Gaussian components.
mod params;

pub use params::*;

/// Removal of fields pinned at a value (table slicing and Schur complements).
pub mod condition;

/// Removal of fields by summation: weak (moment-matched) and shadowed marginals.
pub mod marginal;

/// Mixture density at a point, summed over the shadowed axes in log space.
pub mod density;

/// Exact and heuristic search for the point of maximal density.
pub mod mode;

mod cg;

pub use cg::*;

/// Point summaries a model can be reduced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aggregation {
    Maximum,
    Average
}

/// Contract shared by probability models over named fields. Every operation that
/// changes the model works in place and returns the model itself, so calls can be
/// chained; use copy() before an operation when the original must be preserved.
///
/// Points are informed in field order (see fields()).
pub trait Model
where
    Self : Clone
{

    fn fields(&self) -> &[Field];

    fn names(&self) -> Vec<&str> {
        self.fields().iter().map(|f| f.name() ).collect()
    }

    fn dim(&self) -> usize {
        self.fields().len()
    }

    fn by_name(&self, name : &str) -> Option<&Field> {
        self.fields().iter().find(|f| f.name() == name )
    }

    fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Narrows the domains of the informed fields, keeping them in the model.
    fn restrict(&mut self, conditions : &[Condition]) -> Result<&mut Self>;

    /// Pins each informed field at its value and removes it from the model, which
    /// becomes the distribution of the remaining fields given the pinned values.
    fn condition(&mut self, pins : &[(&str, Value)]) -> Result<&mut Self>;

    /// Removes every field not in keep. Fields with a singular domain are conditioned
    /// out; the others are marginalized.
    fn marginalize<S>(&mut self, keep : &[S]) -> Result<&mut Self>
    where
        S : AsRef<str>;

    /// Removes the informed fields, keeping every other one.
    fn marginalize_out<S>(&mut self, remove : &[S]) -> Result<&mut Self>
    where
        S : AsRef<str>;

    /// Restricts the model to the conditions, then keeps only the informed fields.
    fn model<S>(&mut self, keep : &[S], conditions : &[Condition]) -> Result<&mut Self>
    where
        S : AsRef<str>
    {
        self.restrict(conditions)?;
        self.marginalize(keep)
    }

    fn density(&self, point : &[Value]) -> Result<f64>;

    fn log_density(&self, point : &[Value]) -> Result<f64> {
        self.density(point).map(|d| d.ln() )
    }

    /// Density at a point informed as named coordinates, in any order.
    fn density_by_name(&self, names : &[&str], values : &[Value]) -> Result<f64> {
        if names.len() != values.len() {
            return Err(ModelError::DimensionMismatch { expected : names.len(), found : values.len() });
        }
        if names.len() != self.dim() {
            return Err(ModelError::DimensionMismatch { expected : self.dim(), found : names.len() });
        }
        let mut point : Vec<Option<Value>> = vec![None; self.dim()];
        for (name, v) in names.iter().zip(values.iter()) {
            let ix = self.fields().iter().position(|f| f.name() == *name )
                .ok_or_else(|| ModelError::UnknownField(name.to_string()) )?;
            if point[ix].is_some() {
                return Err(ModelError::InvalidDomain(format!("coordinate '{}' informed twice", name)));
            }
            point[ix] = Some(v.clone());
        }
        let point : Vec<Value> = point.into_iter().flatten().collect();
        self.density(&point[..])
    }

    /// Reduces the model to a single point, in field order.
    fn aggregate(&self, method : Aggregation) -> Result<Vec<Value>>;

    fn copy(&self) -> Self {
        self.clone()
    }

}
