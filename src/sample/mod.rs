use crate::error::{ModelError, Result};

/// Typed columns holding numeric, textual, integer or binary content.
pub mod column;

pub use column::*;

/// Loading of samples from comma-separated text.
pub mod csv;

/// Tabular sample of independent observations: a set of equally long, uniquely named
/// columns. Textual columns train categorical fields and numeric columns train
/// numerical fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    columns : Vec<Column>
}

impl Sample {

    pub fn new(columns : Vec<Column>) -> Result<Self> {
        if let Some(first) = columns.first() {
            for c in columns.iter() {
                if c.len() != first.len() {
                    return Err(ModelError::DimensionMismatch { expected : first.len(), found : c.len() });
                }
            }
        }
        for (i, c) in columns.iter().enumerate() {
            if columns[..i].iter().any(|other| other.name == c.name ) {
                return Err(ModelError::InvalidDomain(format!("duplicated column '{}'", c.name)));
            }
        }
        Ok(Self { columns })
    }

    pub fn nrows(&self) -> usize {
        self.columns.first().map(|c| c.len() ).unwrap_or(0)
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    pub fn is_empty(&self) -> bool {
        self.nrows() == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns[..]
    }

    pub fn column(&self, name : &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name )
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| &c.name[..] ).collect()
    }

}

#[test]
fn ragged_columns() {
    let s = Sample::new(vec![Column::new_num("a", vec![1., 2.]), Column::new_text("b", vec!["x"])]);
    assert!(matches!(s, Err(ModelError::DimensionMismatch { .. })));
    let s = Sample::new(vec![Column::new_num("a", vec![1.]), Column::new_text("a", vec!["x"])]);
    assert!(s.is_err());
    let s = Sample::new(vec![Column::new_num("a", vec![1.]), Column::new_text("b", vec!["x"])]).unwrap();
    assert_eq!(s.shape(), (1, 2));
}
