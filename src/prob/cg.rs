use nalgebra::DVector;
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use log::debug;
use std::fmt::{self, Display};
use crate::field::{Field, FieldKind, Value, Condition};
use crate::config::{ModelConfig, Strategy};
use crate::sample::{Sample, Column};
use crate::fit::{Estimator, MaxLikelihood};
use crate::error::{ModelError, Result};
use super::{Model, Aggregation, Params};
use super::{condition, marginal, density, mode};

/// Conditional-Gaussian model: a categorical distribution over the categorical fields
/// and, for each categorical outcome, a multivariate normal over the numerical fields.
///
/// Fields are kept in canonical order (categorical before numerical). Pure
/// categorical and pure Gaussian models are the states of this structure without
/// numerical or categorical fields respectively; the model without fields has density
/// one at the empty point.
///
/// How categorical fields are marginalized is fixed by the configured strategy:
/// weak marginals merge components by moment matching, shadowed marginals keep the
/// removed fields as hidden mixture axes.
#[derive(Debug, Clone, PartialEq)]
pub struct CondGaussian {

    fields : Vec<Field>,

    params : Params,

    config : ModelConfig

}

impl CondGaussian {

    /// Fits a model to the sample by maximum likelihood. Textual columns become
    /// categorical fields and numeric columns numerical fields.
    pub fn fit(sample : &Sample, config : ModelConfig) -> Result<Self> {
        let mut ml = MaxLikelihood::new(config.smoothing);
        let est = ml.fit(sample)?.clone();
        let cg = Self { fields : est.fields, params : est.params, config };
        debug!("Fitted model {}", cg);
        Ok(cg)
    }

    /// Builds a model from externally estimated parameters. The categorical fields must
    /// match the table axes (names and levels, in order) and the numerical fields must
    /// match the dimensions of the Gaussian components.
    pub fn from_params(fields : Vec<Field>, params : Params, config : ModelConfig) -> Result<Self> {
        let cats : Vec<&Field> = fields.iter().filter(|f| f.is_categorical() ).collect();
        let nums : Vec<&str> = fields.iter().filter(|f| !f.is_categorical() ).map(|f| f.name() ).collect();
        let n_cat = cats.len();
        if fields[..n_cat].iter().any(|f| !f.is_categorical() ) {
            return Err(ModelError::InvalidDomain("categorical fields must precede numerical fields".to_string()));
        }
        let visible = params.visible();
        if cats.len() != visible.len() || cats.iter().zip(visible.iter()).any(|(f, v)| f.name() != *v ) {
            return Err(ModelError::InvalidDomain(
                format!("categorical fields do not match the table axes {:?}", visible)
            ));
        }
        for f in cats.iter() {
            let axis = params.axis(f.name()).ok_or_else(|| ModelError::UnknownField(f.name().to_string()) )?;
            if axis.levels[..] != *f.levels() {
                return Err(ModelError::InvalidDomain(format!("levels of '{}' differ from its table axis", f.name())));
            }
        }
        if nums[..] != params.numericals().iter().map(|n| &n[..] ).collect::<Vec<_>>()[..] {
            return Err(ModelError::InvalidDomain(
                format!("numerical fields do not match the gaussian dimensions {:?}", params.numericals())
            ));
        }
        Ok(Self { fields, params, config })
    }

    /// The model without fields.
    pub fn empty(config : ModelConfig) -> Self {
        Self { fields : Vec::new(), params : Params::empty(), config }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn strategy(&self) -> Strategy {
        self.config.strategy
    }

    /// Error for a name that is not a current field.
    fn missing(&self, name : &str) -> ModelError {
        match self.params.is_shadowed(name) {
            Some(true) => ModelError::AlreadyMarginalized(name.to_string()),
            _ => ModelError::UnknownField(name.to_string())
        }
    }

    fn field_index(&self, name : &str) -> Result<usize> {
        self.fields.iter().position(|f| f.name() == name ).ok_or_else(|| self.missing(name) )
    }

    /// Removes the informed fields, which must be singular in the informed field list,
    /// from a copy of the parameters.
    fn conditioned(&self, fields : &[Field], names : &[String], params : &mut Params) -> Result<()> {
        let mut cat = Vec::new();
        let mut num = Vec::new();
        for name in names.iter() {
            let field = fields.iter().find(|f| f.name() == name ).ok_or_else(|| self.missing(name) )?;
            match field.pinned_value()? {
                Value::Cat(l) => cat.push((name.clone(), l)),
                Value::Num(v) => num.push((name.clone(), v))
            }
        }
        condition::condition_out(params, &cat[..], &num[..])
    }

    /// Restores the canonical empty store once the last field is gone.
    fn settle(&mut self) {
        if self.fields.is_empty() {
            self.params = Params::empty();
        }
    }

    /// Draws n independent rows from the model. Shadowed fields take part in the draw
    /// but are not reported.
    pub fn sample<R>(&self, n : usize, rng : &mut R) -> Result<Sample>
    where
        R : Rng
    {
        let cells = WeightedIndex::new(self.params.p().data())
            .map_err(|e| ModelError::ZeroProbability(format!("{}", e)) )?;
        let visible = self.params.visible();
        let mut levels : Vec<Vec<String>> = vec![Vec::with_capacity(n); visible.len()];
        let mut values : Vec<Vec<f64>> = vec![Vec::with_capacity(n); self.params.numericals().len()];
        for _ in 0..n {
            let ix = cells.sample(rng);
            let coord = self.params.p().coord(ix);
            let axes = self.params.p().axes();
            let mut col = 0;
            for ((axis, c), s) in axes.iter().zip(coord.iter()).zip(self.params.shadow_mask().iter()) {
                if !*s {
                    levels[col].push(axis.levels[*c].clone());
                    col += 1;
                }
            }
            if let Some(g) = self.params.gauss() {
                let y = g.cell(ix).sample(rng)?;
                for (v, yi) in values.iter_mut().zip(y.iter()) {
                    v.push(*yi);
                }
            }
        }
        let mut columns = Vec::with_capacity(self.fields.len());
        for (name, lv) in visible.iter().zip(levels.into_iter()) {
            columns.push(Column::new_text(name, lv));
        }
        for (name, v) in self.params.numericals().iter().zip(values.into_iter()) {
            columns.push(Column::new_num(name, v));
        }
        Sample::new(columns)
    }

}

impl Model for CondGaussian {

    fn fields(&self) -> &[Field] {
        &self.fields[..]
    }

    fn restrict(&mut self, conditions : &[Condition]) -> Result<&mut Self> {
        let mut fields = self.fields.clone();
        for cond in conditions.iter() {
            let ix = self.field_index(&cond.name)?;
            cond.apply(&mut fields[ix])?;
        }
        self.fields = fields;
        Ok(self)
    }

    fn condition(&mut self, pins : &[(&str, Value)]) -> Result<&mut Self> {
        if pins.is_empty() {
            return Ok(self);
        }
        let mut fields = self.fields.clone();
        let mut names = Vec::with_capacity(pins.len());
        for (name, value) in pins.iter() {
            let ix = self.field_index(name)?;
            if names.iter().any(|n : &String| n == name ) {
                return Err(ModelError::InvalidDomain(format!("field '{}' pinned twice", name)));
            }
            fields[ix].pin(value)?;
            names.push(name.to_string());
        }
        let mut params = self.params.clone();
        self.conditioned(&fields[..], &names[..], &mut params)?;
        fields.retain(|f| !names.iter().any(|n| n == f.name() ) );
        debug!("Conditioned on {:?}", pins);
        self.fields = fields;
        self.params = params;
        self.settle();
        Ok(self)
    }

    fn marginalize<S>(&mut self, keep : &[S]) -> Result<&mut Self>
    where
        S : AsRef<str>
    {
        for k in keep.iter() {
            self.field_index(k.as_ref())?;
        }
        let (kept, removed) : (Vec<&Field>, Vec<&Field>) = self.fields.iter()
            .partition(|f| keep.iter().any(|k| k.as_ref() == f.name() ) );
        if removed.is_empty() {
            return Ok(self);
        }
        let singular : Vec<String> = removed.iter()
            .filter(|f| f.is_singular() )
            .map(|f| f.name().to_string() )
            .collect();
        let mut cat = Vec::new();
        let mut num = Vec::new();
        for f in removed.iter().filter(|f| !f.is_singular() ) {
            match f.kind() {
                FieldKind::Categorical => cat.push(f.name().to_string()),
                FieldKind::Numerical => num.push(f.name().to_string())
            }
        }
        let fields : Vec<Field> = kept.into_iter().cloned().collect();
        let mut params = self.params.clone();
        if !singular.is_empty() {
            self.conditioned(&self.fields[..], &singular[..], &mut params)?;
        }
        marginal::marginalize_out(&mut params, &cat[..], &num[..], self.config.strategy)?;
        debug!("Conditioned out {:?}, marginalized {:?} and {:?}", singular, cat, num);
        self.fields = fields;
        self.params = params;
        self.settle();
        Ok(self)
    }

    fn marginalize_out<S>(&mut self, remove : &[S]) -> Result<&mut Self>
    where
        S : AsRef<str>
    {
        for r in remove.iter() {
            self.field_index(r.as_ref())?;
        }
        let keep : Vec<String> = self.fields.iter()
            .filter(|f| !remove.iter().any(|r| r.as_ref() == f.name() ) )
            .map(|f| f.name().to_string() )
            .collect();
        self.marginalize(&keep[..])
    }

    fn density(&self, point : &[Value]) -> Result<f64> {
        self.log_density(point).map(|l| l.exp() )
    }

    fn log_density(&self, point : &[Value]) -> Result<f64> {
        if point.len() != self.fields.len() {
            return Err(ModelError::DimensionMismatch { expected : self.fields.len(), found : point.len() });
        }
        let mut levels = Vec::new();
        let mut x = Vec::new();
        for (f, v) in self.fields.iter().zip(point.iter()) {
            match (f.kind(), v) {
                (FieldKind::Categorical, Value::Cat(l)) => levels.push(&l[..]),
                (FieldKind::Numerical, Value::Num(n)) => x.push(*n),
                (kind, v) => {
                    return Err(ModelError::UnsupportedDtype(
                        format!("value {} for {} field '{}'", v, kind, f.name())
                    ));
                }
            }
        }
        density::log_density(&self.params, &levels[..], &DVector::from_vec(x))
    }

    /// Both aggregations return the (approximate) mode.
    fn aggregate(&self, method : Aggregation) -> Result<Vec<Value>> {
        let (levels, x) = mode::mode(&self.params, self.config.mode)?;
        debug!("Aggregation {:?} of {}: {:?} {:?}", method, self, levels, x.as_slice());
        Ok(levels.into_iter().map(Value::Cat).chain(x.iter().map(|v| Value::Num(*v) )).collect())
    }

}

impl Display for CondGaussian {

    fn fmt(&self, f : &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.config.name.as_ref().map(|n| &n[..] ).unwrap_or("CondGaussian");
        let fields : Vec<String> = self.fields.iter().map(|f| f.to_string() ).collect();
        write!(f, "{}({})", name, fields.join(", "))?;
        let shadows = self.params.shadows();
        if !shadows.is_empty() {
            write!(f, " shadowing {:?}", shadows)?;
        }
        Ok(())
    }

}
