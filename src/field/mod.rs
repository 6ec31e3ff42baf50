use serde::{Serialize, Deserialize};
use std::fmt::{self, Display};
use crate::error::{ModelError, Result};

/// Interval and level-set algebra restricting the admissible values of a field.
pub mod domain;

pub use domain::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Categorical,
    Numerical
}

impl Display for FieldKind {

    fn fmt(&self, f : &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Categorical => write!(f, "categorical"),
            FieldKind::Numerical => write!(f, "numerical")
        }
    }

}

/// A coordinate of a point in the sample space of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Cat(String),
    Num(f64)
}

impl Value {

    pub fn as_cat(&self) -> Option<&str> {
        match self {
            Value::Cat(s) => Some(&s[..]),
            Value::Num(_) => None
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            Value::Num(v) => Some(*v),
            Value::Cat(_) => None
        }
    }

}

impl From<&str> for Value {

    fn from(s : &str) -> Self {
        Value::Cat(s.to_string())
    }

}

impl From<String> for Value {

    fn from(s : String) -> Self {
        Value::Cat(s)
    }

}

impl From<f64> for Value {

    fn from(v : f64) -> Self {
        Value::Num(v)
    }

}

impl Display for Value {

    fn fmt(&self, f : &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Cat(s) => write!(f, "{}", s),
            Value::Num(v) => write!(f, "{}", v)
        }
    }

}

/// A named random variable of a model. The extent is fixed at training time; the domain
/// is the (possibly narrower) restriction currently in effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    name : String,
    kind : FieldKind,
    domain : Domain,
    extent : Domain
}

impl Field {

    /// Categorical field over the informed levels, in the informed order.
    pub fn categorical<S>(name : &str, levels : impl IntoIterator<Item=S>) -> Result<Self>
    where
        S : Into<String>
    {
        let extent = DiscreteDomain::levels(levels)?;
        Ok(Self {
            name : name.to_string(),
            kind : FieldKind::Categorical,
            domain : Domain::Discrete(DiscreteDomain::Unbounded),
            extent : Domain::Discrete(extent)
        })
    }

    /// Numerical field whose training values spanned [lower, upper].
    pub fn numerical(name : &str, lower : f64, upper : f64) -> Result<Self> {
        let extent = NumericDomain::interval(lower, upper)?;
        Ok(Self {
            name : name.to_string(),
            kind : FieldKind::Numerical,
            domain : Domain::Numeric(NumericDomain::unbounded()),
            extent : Domain::Numeric(extent)
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_categorical(&self) -> bool {
        self.kind == FieldKind::Categorical
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn extent(&self) -> &Domain {
        &self.extent
    }

    /// Levels of the categorical extent (empty for numerical fields).
    pub fn levels(&self) -> &[String] {
        match &self.extent {
            Domain::Discrete(d) => d.value().unwrap_or(&[]),
            Domain::Numeric(_) => &[]
        }
    }

    pub fn is_singular(&self) -> bool {
        self.domain.is_singular()
    }

    /// Narrows the current domain. Categorical domains must still share at least one
    /// level with the extent, since every level addresses a table cell. Numerical
    /// domains may leave the range spanned by the training values.
    pub fn restrict(&mut self, domain : &Domain) -> Result<&mut Self> {
        let mut cand = self.domain.clone();
        cand.intersect(domain)?;
        if let Domain::Discrete(_) = &cand {
            let mut within = cand.bounded(&self.extent)?;
            within.intersect(&self.extent)
                .map_err(|_| ModelError::InvalidDomain(
                    format!("{} does not meet the extent {} of '{}'", domain, self.extent, self.name)
                ))?;
        }
        self.domain = cand;
        Ok(self)
    }

    /// Pins the field at a single value (a level of the extent, for categorical fields).
    pub fn pin(&mut self, value : &Value) -> Result<&mut Self> {
        let dom = match (self.kind, value) {
            (FieldKind::Categorical, Value::Cat(s)) => Domain::Discrete(DiscreteDomain::singular(s.clone())),
            (FieldKind::Numerical, Value::Num(v)) => Domain::Numeric(NumericDomain::singular(*v)),
            (kind, v) => {
                return Err(ModelError::UnsupportedDtype(
                    format!("value {} for {} field '{}'", v, kind, self.name)
                ));
            }
        };
        self.restrict(&dom)
    }

    /// The value this field is pinned at.
    pub fn pinned_value(&self) -> Result<Value> {
        if !self.domain.is_singular() {
            return Err(ModelError::NotSingular(self.name.clone()));
        }
        self.domain.values()?.into_iter().next()
            .ok_or_else(|| ModelError::NotSingular(self.name.clone()) )
    }

}

impl Display for Field {

    fn fmt(&self, f : &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.is_categorical() { "#" } else { "±" };
        write!(f, "{}{} {} of {}", prefix, self.name, self.domain, self.extent)
    }

}

/// Operators narrowing the domain of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operator {

    /// Pin the field at a single value.
    Equals(Value),

    /// Restrict to an interval or to a set of levels.
    In(Domain),

    /// New lower bound for a numerical field.
    Greater(f64),

    /// New upper bound for a numerical field.
    Less(f64)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub name : String,
    pub op : Operator
}

impl Condition {

    pub fn new(name : &str, op : Operator) -> Self {
        Self { name : name.to_string(), op }
    }

    pub fn equals(name : &str, value : impl Into<Value>) -> Self {
        Self::new(name, Operator::Equals(value.into()))
    }

    /// Applies this condition to the informed field (which must carry the same name).
    pub fn apply(&self, field : &mut Field) -> Result<()> {
        match &self.op {
            Operator::Equals(v) => { field.pin(v)?; },
            Operator::In(d) => { field.restrict(d)?; },
            Operator::Greater(v) => {
                field.restrict(&Domain::Numeric(NumericDomain::interval(*v, std::f64::INFINITY)?))?;
            },
            Operator::Less(v) => {
                field.restrict(&Domain::Numeric(NumericDomain::interval(std::f64::NEG_INFINITY, *v)?))?;
            }
        }
        Ok(())
    }

}
