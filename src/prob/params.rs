use serde::{Serialize, Deserialize};
use log::debug;
use crate::table::{Axis, Table};
use crate::error::{ModelError, Result};
use super::multinormal::MultiNormal;

/// Parameters of a conditional-Gaussian distribution: the categorical probability table
/// P and, for every cell of P, the Gaussian over the numerical fields. The table axes
/// hold every stored categorical axis, visible or shadowed; the shadow mask carries one
/// flag per axis, in axis order.
///
/// When there are no numerical fields the Gaussian part is absent. When there are no
/// categorical axes P holds a single cell of mass one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Params {

    pub(crate) p : Table<f64>,

    pub(crate) gauss : Option<Table<MultiNormal>>,

    pub(crate) numericals : Vec<String>,

    pub(crate) shadowed : Vec<bool>

}

impl Params {

    /// Builds a parameter store from externally estimated tensors. The Gaussian table
    /// must share the axes of P and every component must span the numerical fields.
    pub fn new(p : Table<f64>, gauss : Option<Table<MultiNormal>>, numericals : Vec<String>) -> Result<Self> {
        if p.iter().any(|v| !(*v >= 0.0) ) {
            return Err(ModelError::InvalidDomain("probability table must be nonnegative".to_string()));
        }
        match &gauss {
            Some(g) => {
                if g.axes() != p.axes() {
                    return Err(ModelError::InvalidDomain(
                        format!("gaussian axes {:?} differ from table axes {:?}", g.names(), p.names())
                    ));
                }
                for mn in g.iter() {
                    if mn.dim() != numericals.len() {
                        return Err(ModelError::DimensionMismatch { expected : numericals.len(), found : mn.dim() });
                    }
                }
            },
            None => {
                if !numericals.is_empty() {
                    return Err(ModelError::DimensionMismatch { expected : numericals.len(), found : 0 });
                }
            }
        }
        let shadowed = vec![false; p.axes().len()];
        let mut params = Self { p, gauss, numericals, shadowed };
        params.update()?;
        Ok(params)
    }

    /// Store of the model without fields: one cell of mass one, no Gaussian part.
    pub fn empty() -> Self {
        Self { p : Table::scalar(1.0), gauss : None, numericals : Vec::new(), shadowed : Vec::new() }
    }

    pub fn p(&self) -> &Table<f64> {
        &self.p
    }

    pub fn gauss(&self) -> Option<&Table<MultiNormal>> {
        self.gauss.as_ref()
    }

    pub fn numericals(&self) -> &[String] {
        &self.numericals[..]
    }

    pub fn shadow_mask(&self) -> &[bool] {
        &self.shadowed[..]
    }

    /// Names of every stored categorical axis.
    pub fn stored(&self) -> Vec<&str> {
        self.p.names()
    }

    pub fn visible(&self) -> Vec<&str> {
        self.p.axes().iter().zip(self.shadowed.iter())
            .filter(|(_, s)| !**s )
            .map(|(a, _)| &a.name[..] )
            .collect()
    }

    pub fn shadows(&self) -> Vec<&str> {
        self.p.axes().iter().zip(self.shadowed.iter())
            .filter(|(_, s)| **s )
            .map(|(a, _)| &a.name[..] )
            .collect()
    }

    pub fn has_shadows(&self) -> bool {
        self.shadowed.iter().any(|s| *s )
    }

    pub fn is_shadowed(&self, name : &str) -> Option<bool> {
        self.p.axis_index(name).map(|ix| self.shadowed[ix] )
    }

    pub fn axis(&self, name : &str) -> Option<&Axis> {
        self.p.axis_index(name).map(|ix| &self.p.axes()[ix] )
    }

    pub fn numerical_index(&self, name : &str) -> Option<usize> {
        self.numericals.iter().position(|n| n == name )
    }

    /// Recomputes the per-cell precision matrices and determinant factors. Must be
    /// called after every change to the moments.
    pub fn update(&mut self) -> Result<()> {
        if let Some(g) = self.gauss.as_mut() {
            for mn in g.data_mut().iter_mut() {
                mn.update()?;
            }
        }
        self.assert_invariants();
        debug!("Parameters updated: {} cells over {:?}, {} numerical dimension(s)", self.p.len(), self.p.names(), self.numericals.len());
        Ok(())
    }

    fn assert_invariants(&self) {
        debug_assert_eq!(self.shadowed.len(), self.p.axes().len());
        debug_assert!(self.p.iter().all(|v| *v >= 0.0 ));
        if let Some(g) = &self.gauss {
            debug_assert_eq!(g.axes(), self.p.axes());
            debug_assert!(!self.numericals.is_empty());
            debug_assert!(g.iter().all(|mn| mn.dim() == self.numericals.len() && mn.is_fresh() ));
        } else {
            debug_assert!(self.numericals.is_empty());
        }
    }

}
