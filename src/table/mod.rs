use serde::{Serialize, Deserialize};
use std::fmt::{self, Display};
use crate::error::{ModelError, Result};

/// A named categorical axis and its ordered levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub name : String,
    pub levels : Vec<String>
}

impl Axis {

    pub fn new<S>(name : &str, levels : impl IntoIterator<Item=S>) -> Self
    where
        S : Into<String>
    {
        Self { name : name.to_string(), levels : levels.into_iter().map(|l| l.into() ).collect() }
    }

    pub fn position(&self, level : &str) -> Option<usize> {
        self.levels.iter().position(|l| l == level )
    }

}

/// Cell mapping produced by Table::reduce: the axes kept, and for every cell of the
/// source table, the flat index of the cell it collapses into.
#[derive(Debug, Clone)]
pub struct Reduction {
    pub axes : Vec<Axis>,
    pub target : Vec<usize>
}

impl Reduction {

    pub fn len(&self) -> usize {
        self.axes.iter().map(|a| a.levels.len() ).product()
    }

}

/// Dense multi-axis array addressed by named categorical axes. Storage is row-major
/// (last axis varies fastest). A table without axes holds exactly one cell.
///
/// Every lookup goes through the axis names, so callers never depend on the
/// position an axis happens to occupy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table<T> {
    axes : Vec<Axis>,
    data : Vec<T>
}

impl<T> Table<T> {

    pub fn new(axes : Vec<Axis>, data : Vec<T>) -> Result<Self> {
        let n : usize = axes.iter().map(|a| a.levels.len() ).product();
        if n != data.len() {
            return Err(ModelError::InvalidDomain(
                format!("table over {} cells received {} entries", n, data.len())
            ));
        }
        Ok(Self { axes, data })
    }

    /// Builds the table by evaluating f at every coordinate, in row-major order.
    pub fn from_fn(axes : Vec<Axis>, mut f : impl FnMut(&[usize]) -> T) -> Self {
        let shape : Vec<usize> = axes.iter().map(|a| a.levels.len() ).collect();
        let n : usize = shape.iter().product();
        let mut data = Vec::with_capacity(n);
        let mut coord = vec![0; shape.len()];
        for _ in 0..n {
            data.push(f(&coord[..]));
            advance(&mut coord, &shape);
        }
        Self { axes, data }
    }

    pub fn scalar(v : T) -> Self {
        Self { axes : Vec::new(), data : vec![v] }
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes[..]
    }

    pub fn names(&self) -> Vec<&str> {
        self.axes.iter().map(|a| &a.name[..] ).collect()
    }

    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(|a| a.levels.len() ).collect()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_scalar(&self) -> bool {
        self.axes.is_empty()
    }

    pub fn data(&self) -> &[T] {
        &self.data[..]
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data[..]
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    pub fn axis_index(&self, name : &str) -> Option<usize> {
        self.axes.iter().position(|a| a.name == name )
    }

    /// Position of a level along the named axis.
    pub fn level_index(&self, name : &str, level : &str) -> Result<usize> {
        let ax = self.axis_index(name).ok_or_else(|| ModelError::UnknownField(name.to_string()) )?;
        self.axes[ax].position(level).ok_or_else(|| unknown_level(name, level) )
    }

    fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1; self.axes.len()];
        for i in (0..self.axes.len().saturating_sub(1)).rev() {
            strides[i] = strides[i+1] * self.axes[i+1].levels.len();
        }
        strides
    }

    pub fn flat_index(&self, coord : &[usize]) -> usize {
        assert!(coord.len() == self.axes.len());
        coord.iter().zip(self.strides().iter()).map(|(c, s)| c * s ).sum()
    }

    pub fn coord(&self, mut flat : usize) -> Vec<usize> {
        let mut coord = vec![0; self.axes.len()];
        for (i, s) in self.strides().iter().enumerate() {
            coord[i] = flat / s;
            flat %= s;
        }
        coord
    }

    /// Level labels at the informed coordinate.
    pub fn labels(&self, coord : &[usize]) -> Vec<String> {
        coord.iter().zip(self.axes.iter()).map(|(c, a)| a.levels[*c].clone() ).collect()
    }

    /// Flat index of the cell with the informed level labels, in axis order.
    pub fn locate<S>(&self, levels : &[S]) -> Result<usize>
    where
        S : AsRef<str>
    {
        if levels.len() != self.axes.len() {
            return Err(ModelError::DimensionMismatch { expected : self.axes.len(), found : levels.len() });
        }
        let mut coord = Vec::with_capacity(levels.len());
        for (axis, lvl) in self.axes.iter().zip(levels.iter()) {
            let ix = axis.position(lvl.as_ref())
                .ok_or_else(|| unknown_level(&axis.name, lvl.as_ref()) )?;
            coord.push(ix);
        }
        Ok(self.flat_index(&coord[..]))
    }

    pub fn get<S>(&self, levels : &[S]) -> Result<&T>
    where
        S : AsRef<str>
    {
        let ix = self.locate(levels)?;
        Ok(&self.data[ix])
    }

    pub fn cell(&self, flat : usize) -> &T {
        &self.data[flat]
    }

    pub fn cell_mut(&mut self, flat : usize) -> &mut T {
        &mut self.data[flat]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    /// Iterates over (coordinate, entry) pairs in row-major order.
    pub fn cells<'a>(&'a self) -> impl Iterator<Item=(Vec<usize>, &'a T)> + 'a {
        let shape = self.shape();
        let mut coord = vec![0; shape.len()];
        self.data.iter().map(move |v| {
            let curr = coord.clone();
            advance(&mut coord, &shape);
            (curr, v)
        })
    }

    pub fn map<U>(&self, f : impl FnMut(&T) -> U) -> Table<U> {
        Table { axes : self.axes.clone(), data : self.data.iter().map(f).collect() }
    }

    pub fn try_map<U, E>(&self, f : impl FnMut(&T) -> std::result::Result<U, E>) -> std::result::Result<Table<U>, E> {
        let data = self.data.iter().map(f).collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Table { axes : self.axes.clone(), data })
    }

    /// Resolves (axis name, level) pins into one optional level index per axis.
    fn pin_coords<S>(&self, pins : &[(S, S)]) -> Result<Vec<Option<usize>>>
    where
        S : AsRef<str>
    {
        let mut fixed = vec![None; self.axes.len()];
        for (name, lvl) in pins.iter() {
            let ix = self.level_index(name.as_ref(), lvl.as_ref())?;
            let ax = self.axis_index(name.as_ref())
                .ok_or_else(|| ModelError::UnknownField(name.as_ref().to_string()) )?;
            fixed[ax] = Some(ix);
        }
        Ok(fixed)
    }

    /// Restricts the table to the pinned levels, dropping the pinned axes. The remaining
    /// axes keep their relative order.
    pub fn slice<S>(&self, pins : &[(S, S)]) -> Result<Table<T>>
    where
        S : AsRef<str>,
        T : Clone
    {
        let fixed = self.pin_coords(pins)?;
        let axes : Vec<Axis> = self.axes.iter().zip(fixed.iter())
            .filter(|(_, f)| f.is_none() )
            .map(|(a, _)| a.clone() )
            .collect();
        let data : Vec<T> = self.cells()
            .filter(|(c, _)| c.iter().zip(fixed.iter()).all(|(c, f)| f.map(|f| f == *c ).unwrap_or(true) ) )
            .map(|(_, v)| v.clone() )
            .collect();
        Ok(Table { axes, data })
    }

    /// Flat indices of all cells matching the pins, in row-major order.
    pub fn matching<S>(&self, pins : &[(S, S)]) -> Result<Vec<usize>>
    where
        S : AsRef<str>
    {
        let fixed = self.pin_coords(pins)?;
        Ok(self.cells()
            .enumerate()
            .filter(|(_, (c, _))| c.iter().zip(fixed.iter()).all(|(c, f)| f.map(|f| f == *c ).unwrap_or(true) ) )
            .map(|(i, _)| i )
            .collect())
    }

    /// Maps every cell onto the table over the kept axes (original axis order).
    pub fn reduce<S>(&self, keep : &[S]) -> Result<Reduction>
    where
        S : AsRef<str>
    {
        for k in keep.iter() {
            if self.axis_index(k.as_ref()).is_none() {
                return Err(ModelError::UnknownField(k.as_ref().to_string()));
            }
        }
        let kept_ix : Vec<usize> = (0..self.axes.len())
            .filter(|i| keep.iter().any(|k| k.as_ref() == self.axes[*i].name ) )
            .collect();
        let axes : Vec<Axis> = kept_ix.iter().map(|i| self.axes[*i].clone() ).collect();
        let reduced : Table<()> = Table::from_fn(axes.clone(), |_| () );
        let target = self.cells()
            .map(|(c, _)| {
                let sub : Vec<usize> = kept_ix.iter().map(|i| c[*i] ).collect();
                reduced.flat_index(&sub[..])
            })
            .collect();
        Ok(Reduction { axes, target })
    }

}

impl Table<f64> {

    /// Sums the informed axes out.
    pub fn sum<S>(&self, axes : &[S]) -> Result<Table<f64>>
    where
        S : AsRef<str>
    {
        for a in axes.iter() {
            if self.axis_index(a.as_ref()).is_none() {
                return Err(ModelError::UnknownField(a.as_ref().to_string()));
            }
        }
        let keep : Vec<&str> = self.axes.iter()
            .map(|a| &a.name[..] )
            .filter(|n| !axes.iter().any(|a| a.as_ref() == *n ) )
            .collect();
        let red = self.reduce(&keep[..])?;
        let mut data = vec![0.0; red.len()];
        for (v, t) in self.data.iter().zip(red.target.iter()) {
            data[*t] += v;
        }
        Ok(Table { axes : red.axes, data })
    }

    pub fn total(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Divides every entry by the total mass, returning the mass.
    pub fn normalize(&mut self) -> Result<f64> {
        let mass = self.total();
        if !(mass > 0.0) {
            return Err(ModelError::ZeroProbability(format!("total mass {} over {:?}", mass, self.names())));
        }
        self.data.iter_mut().for_each(|v| *v /= mass );
        Ok(mass)
    }

    /// Flat index of the first maximal entry in row-major order. NaN entries are
    /// skipped, so a table of NaNs has no maximum.
    pub fn argmax(&self) -> Option<usize> {
        let mut best : Option<(usize, f64)> = None;
        for (i, v) in self.data.iter().enumerate() {
            if v.is_nan() {
                continue;
            }
            match best {
                Some((_, b)) if !(*v > b) => { },
                _ => { best = Some((i, *v)); }
            }
        }
        best.map(|(i, _)| i )
    }

}

impl Display for Table<f64> {

    fn fmt(&self, f : &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Table({})", self.names().join(", "))?;
        for (c, v) in self.cells() {
            writeln!(f, "  ({}) = {}", self.labels(&c[..]).join(", "), v)?;
        }
        Ok(())
    }

}

fn unknown_level(axis : &str, level : &str) -> ModelError {
    ModelError::InvalidDomain(format!("'{}' is not a level of '{}'", level, axis))
}

/// Row-major increment of a coordinate.
fn advance(coord : &mut [usize], shape : &[usize]) {
    for i in (0..coord.len()).rev() {
        coord[i] += 1;
        if coord[i] < shape[i] {
            return;
        }
        coord[i] = 0;
    }
}
