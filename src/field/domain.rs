use serde::{Serialize, Deserialize};
use serde_json::{json, Value as Json};
use std::fmt::{self, Display};
use crate::error::{ModelError, Result};
use super::Value;

/// A continuous domain represented by the closed interval [lower, upper]. Unbounded
/// sides are represented by infinite bounds; a singular domain has lower == upper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericDomain {
    lower : f64,
    upper : f64
}

impl Default for NumericDomain {

    fn default() -> Self {
        Self::unbounded()
    }

}

impl NumericDomain {

    pub fn unbounded() -> Self {
        Self { lower : std::f64::NEG_INFINITY, upper : std::f64::INFINITY }
    }

    pub fn singular(value : f64) -> Self {
        Self { lower : value, upper : value }
    }

    /// Builds [lower, upper]. Either bound may be infinite.
    pub fn interval(lower : f64, upper : f64) -> Result<Self> {
        let dom = Self { lower, upper };
        dom.validate()?;
        Ok(dom)
    }

    fn validate(&self) -> Result<()> {
        if self.lower.is_nan() || self.upper.is_nan() || self.lower > self.upper {
            Err(ModelError::InvalidDomain(format!("resulting domain is empty: {}", self)))
        } else {
            Ok(())
        }
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn is_singular(&self) -> bool {
        self.lower == self.upper
    }

    pub fn is_bounded(&self) -> bool {
        self.lower.is_finite() && self.upper.is_finite()
    }

    pub fn is_unbounded(&self) -> bool {
        self.lower == std::f64::NEG_INFINITY && self.upper == std::f64::INFINITY
    }

    /// The single admissible value if singular; the interval bounds otherwise.
    pub fn value(&self) -> Vec<f64> {
        if self.is_singular() {
            vec![self.lower]
        } else {
            vec![self.lower, self.upper]
        }
    }

    /// Replaces infinite bounds by the corresponding bounds of the extent.
    pub fn bounded(&self, extent : &NumericDomain) -> NumericDomain {
        let lower = if self.lower == std::f64::NEG_INFINITY { extent.lower } else { self.lower };
        let upper = if self.upper == std::f64::INFINITY { extent.upper } else { self.upper };
        NumericDomain { lower, upper }
    }

    pub fn clamp(&self, v : f64) -> f64 {
        if v < self.lower {
            self.lower
        } else if v > self.upper {
            self.upper
        } else {
            v
        }
    }

    pub fn contains(&self, v : f64) -> bool {
        v >= self.lower && v <= self.upper
    }

    pub fn intersect(&mut self, other : &NumericDomain) -> Result<&mut Self> {
        let cand = NumericDomain {
            lower : self.lower.max(other.lower),
            upper : self.upper.min(other.upper)
        };
        cand.validate()?;
        *self = cand;
        Ok(self)
    }

    /// Tightens the lower bound. A value below the current lower bound leaves the domain unchanged.
    pub fn set_lower_bound(&mut self, value : f64) -> Result<&mut Self> {
        if value > self.lower {
            let cand = NumericDomain { lower : value, upper : self.upper };
            cand.validate()?;
            *self = cand;
        }
        Ok(self)
    }

    /// Tightens the upper bound. A value above the current upper bound leaves the domain unchanged.
    pub fn set_upper_bound(&mut self, value : f64) -> Result<&mut Self> {
        if value < self.upper {
            let cand = NumericDomain { lower : self.lower, upper : value };
            cand.validate()?;
            *self = cand;
        }
        Ok(self)
    }

    pub fn to_json(&self) -> Json {
        if self.is_singular() {
            json!(self.lower)
        } else {
            let side = |b : f64| if b.is_finite() { json!(b) } else { Json::Null };
            json!([side(self.lower), side(self.upper)])
        }
    }

}

impl Display for NumericDomain {

    fn fmt(&self, f : &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }

}

/// An ordered discrete domain: either unbounded (any level of the extent) or an explicit
/// non-empty list of levels whose order is preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiscreteDomain {
    Unbounded,
    Levels(Vec<String>)
}

impl Default for DiscreteDomain {

    fn default() -> Self {
        DiscreteDomain::Unbounded
    }

}

impl DiscreteDomain {

    pub fn levels<S>(levels : impl IntoIterator<Item=S>) -> Result<Self>
    where
        S : Into<String>
    {
        let levels : Vec<String> = levels.into_iter().map(|s| s.into() ).collect();
        if levels.is_empty() {
            return Err(ModelError::InvalidDomain(String::from("discrete domain must not be empty")));
        }
        Ok(DiscreteDomain::Levels(levels))
    }

    pub fn singular(level : impl Into<String>) -> Self {
        DiscreteDomain::Levels(vec![level.into()])
    }

    /// Number of admissible levels, or None when unbounded.
    pub fn len(&self) -> Option<usize> {
        match self {
            DiscreteDomain::Unbounded => None,
            DiscreteDomain::Levels(l) => Some(l.len())
        }
    }

    pub fn is_singular(&self) -> bool {
        self.len() == Some(1)
    }

    pub fn is_bounded(&self) -> bool {
        self.len().is_some()
    }

    pub fn value(&self) -> Option<&[String]> {
        match self {
            DiscreteDomain::Unbounded => None,
            DiscreteDomain::Levels(l) => Some(&l[..])
        }
    }

    pub fn contains(&self, level : &str) -> bool {
        match self {
            DiscreteDomain::Unbounded => true,
            DiscreteDomain::Levels(l) => l.iter().any(|v| v == level )
        }
    }

    pub fn bounded(&self, extent : &DiscreteDomain) -> DiscreteDomain {
        match self {
            DiscreteDomain::Unbounded => extent.clone(),
            bounded => bounded.clone()
        }
    }

    pub fn clamp<'a>(&self, level : &'a str) -> Result<&'a str> {
        if self.contains(level) {
            Ok(level)
        } else {
            Err(ModelError::UnsupportedOperation(format!("cannot clamp '{}' into {}", level, self)))
        }
    }

    pub fn intersect(&mut self, other : &DiscreteDomain) -> Result<&mut Self> {
        let cand = match (&*self, other) {
            (DiscreteDomain::Unbounded, o) => o.clone(),
            (s, DiscreteDomain::Unbounded) => s.clone(),
            (DiscreteDomain::Levels(mine), DiscreteDomain::Levels(theirs)) => {
                let kept : Vec<String> = mine.iter()
                    .filter(|l| theirs.contains(l) )
                    .cloned()
                    .collect();
                if kept.is_empty() {
                    return Err(ModelError::InvalidDomain(format!("empty intersection of {} and {}", self, other)));
                }
                DiscreteDomain::Levels(kept)
            }
        };
        *self = cand;
        Ok(self)
    }

    pub fn set_lower_bound(&mut self, _level : &str) -> Result<&mut Self> {
        Err(ModelError::UnsupportedOperation(String::from("lower bound on a discrete domain")))
    }

    pub fn set_upper_bound(&mut self, _level : &str) -> Result<&mut Self> {
        Err(ModelError::UnsupportedOperation(String::from("upper bound on a discrete domain")))
    }

    pub fn to_json(&self) -> Json {
        match self {
            DiscreteDomain::Unbounded => Json::Null,
            DiscreteDomain::Levels(l) if l.len() == 1 => json!(l[0]),
            DiscreteDomain::Levels(l) => json!(l)
        }
    }

}

impl Display for DiscreteDomain {

    fn fmt(&self, f : &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscreteDomain::Unbounded => write!(f, "{{*}}"),
            DiscreteDomain::Levels(l) => write!(f, "{{{}}}", l.join(", "))
        }
    }

}

/// Restriction of a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Domain {
    Numeric(NumericDomain),
    Discrete(DiscreteDomain)
}

impl Domain {

    pub fn is_singular(&self) -> bool {
        match self {
            Domain::Numeric(d) => d.is_singular(),
            Domain::Discrete(d) => d.is_singular()
        }
    }

    pub fn is_bounded(&self) -> bool {
        match self {
            Domain::Numeric(d) => d.is_bounded(),
            Domain::Discrete(d) => d.is_bounded()
        }
    }

    /// Admissible values of a bounded domain: the levels of a discrete domain, or the
    /// bounds of an interval (its single value when singular).
    pub fn values(&self) -> Result<Vec<Value>> {
        if !self.is_bounded() {
            return Err(ModelError::UnsupportedOperation(format!("values of the unbounded domain {}", self)));
        }
        match self {
            Domain::Numeric(d) => Ok(d.value().into_iter().map(Value::Num).collect()),
            Domain::Discrete(d) => Ok(d.value().unwrap_or(&[]).iter().map(|l| Value::Cat(l.clone()) ).collect())
        }
    }

    pub fn bounded(&self, extent : &Domain) -> Result<Domain> {
        match (self, extent) {
            (Domain::Numeric(d), Domain::Numeric(e)) => Ok(Domain::Numeric(d.bounded(e))),
            (Domain::Discrete(d), Domain::Discrete(e)) => Ok(Domain::Discrete(d.bounded(e))),
            _ => Err(ModelError::InvalidDomain(format!("cannot bound {} by {}", self, extent)))
        }
    }

    pub fn intersect(&mut self, other : &Domain) -> Result<&mut Self> {
        match (&mut *self, other) {
            (Domain::Numeric(d), Domain::Numeric(o)) => { d.intersect(o)?; },
            (Domain::Discrete(d), Domain::Discrete(o)) => { d.intersect(o)?; },
            (mine, o) => {
                return Err(ModelError::InvalidDomain(format!("cannot intersect {} with {}", mine, o)));
            }
        }
        Ok(self)
    }

    pub fn to_json(&self) -> Json {
        match self {
            Domain::Numeric(d) => d.to_json(),
            Domain::Discrete(d) => d.to_json()
        }
    }

}

impl Display for Domain {

    fn fmt(&self, f : &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Numeric(d) => d.fmt(f),
            Domain::Discrete(d) => d.fmt(f)
        }
    }

}

impl From<NumericDomain> for Domain {

    fn from(d : NumericDomain) -> Self {
        Domain::Numeric(d)
    }

}

impl From<DiscreteDomain> for Domain {

    fn from(d : DiscreteDomain) -> Self {
        Domain::Discrete(d)
    }

}

#[test]
fn numeric_bounds() {
    let mut d = NumericDomain::unbounded();
    assert!(!d.is_bounded() && !d.is_singular());
    d.set_lower_bound(-1.).unwrap();
    d.set_lower_bound(-5.).unwrap();
    assert_eq!(d.lower(), -1.);
    d.set_upper_bound(3.).unwrap();
    assert!(d.is_bounded());
    assert_eq!(d.value(), vec![-1., 3.]);
    assert_eq!(d.clamp(10.), 3.);
    assert!(d.set_upper_bound(-2.).is_err());
    assert_eq!(d.upper(), 3.);
    let ext = NumericDomain::interval(-10., 10.).unwrap();
    let half = NumericDomain::interval(0., std::f64::INFINITY).unwrap().bounded(&ext);
    assert_eq!(half.value(), vec![0., 10.]);
}

#[test]
fn numeric_intersection() {
    let mut d = NumericDomain::interval(0., 5.).unwrap();
    d.intersect(&NumericDomain::interval(2., 8.).unwrap()).unwrap();
    assert_eq!(d.value(), vec![2., 5.]);
    d.intersect(&NumericDomain::singular(4.)).unwrap();
    assert!(d.is_singular());
    assert_eq!(d.value(), vec![4.]);
    match d.intersect(&NumericDomain::singular(7.)) {
        Err(ModelError::InvalidDomain(_)) => { },
        other => panic!("expected InvalidDomain, got {:?}", other)
    }
    assert!(NumericDomain::interval(1., 0.).is_err());
}

#[test]
fn discrete_ops() {
    let mut d = DiscreteDomain::Unbounded;
    assert_eq!(d.len(), None);
    assert_eq!(d.clamp("x").unwrap(), "x");
    d.intersect(&DiscreteDomain::levels(vec!["b", "a", "c"]).unwrap()).unwrap();
    d.intersect(&DiscreteDomain::levels(vec!["c", "b"]).unwrap()).unwrap();
    assert_eq!(d.value().unwrap(), &["b".to_string(), "c".to_string()][..]);
    assert!(d.clamp("a").is_err());
    assert!(d.set_lower_bound("a").is_err());
    assert!(d.intersect(&DiscreteDomain::singular("z")).is_err());
    d.intersect(&DiscreteDomain::singular("c")).unwrap();
    assert!(d.is_singular());
    assert_eq!(d.to_json(), json!("c"));
}

#[test]
fn json_of_half_bounded() {
    let d = NumericDomain::interval(std::f64::NEG_INFINITY, 2.).unwrap();
    assert_eq!(d.to_json(), json!([null, 2.0]));
    assert_eq!(DiscreteDomain::Unbounded.to_json(), Json::Null);
}

#[test]
fn values_of_bounded_domains() {
    let d = Domain::Discrete(DiscreteDomain::levels(vec!["a", "b"]).unwrap());
    assert_eq!(d.values().unwrap(), vec![Value::from("a"), Value::from("b")]);
    let n = Domain::Numeric(NumericDomain::interval(-1., 2.).unwrap());
    assert_eq!(n.values().unwrap(), vec![Value::Num(-1.), Value::Num(2.)]);
    assert_eq!(Domain::Numeric(NumericDomain::singular(3.)).values().unwrap(), vec![Value::Num(3.)]);
    match Domain::Numeric(NumericDomain::interval(0., std::f64::INFINITY).unwrap()).values() {
        Err(ModelError::UnsupportedOperation(_)) => { },
        other => panic!("expected UnsupportedOperation, got {:?}", other)
    }
    assert!(Domain::Discrete(DiscreteDomain::Unbounded).values().is_err());
}
