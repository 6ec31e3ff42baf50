use serde::{Serialize, Deserialize};
use std::path::Path;
use std::fs::File;
use std::io::{Read, Write};
use crate::error::{ModelError, Result};

/// How categorical fields are removed from a conditional-Gaussian model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {

    /// Merge the components of the removed fields into a single moment-matched Gaussian
    /// per remaining cell. Approximate, but keeps the model size bounded.
    WeakMarginal,

    /// Keep the removed fields as hidden mixture axes. Exact, at the cost of density
    /// evaluation proportional to the number of hidden combinations.
    Shadowed
}

impl Default for Strategy {

    fn default() -> Self {
        Strategy::WeakMarginal
    }

}

/// Heuristic used to search the mode of a model with shadowed fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModeHeuristic {

    /// Mean of the mixture component with the highest peak.
    BestComponent,

    /// Component mean where the full mixture density is highest.
    BestMixture
}

impl Default for ModeHeuristic {

    fn default() -> Self {
        ModeHeuristic::BestMixture
    }

}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {

    pub name : Option<String>,

    pub strategy : Strategy,

    pub mode : ModeHeuristic,

    // Pseudo-count added to every categorical cell at fit time
    pub smoothing : f64
}

impl Default for ModelConfig {

    fn default() -> Self {
        ModelConfig { name : None, strategy : Strategy::default(), mode : ModeHeuristic::default(), smoothing : 0.0 }
    }

}

impl ModelConfig {

    pub fn shadowed() -> Self {
        ModelConfig { strategy : Strategy::Shadowed, ..Default::default() }
    }

    pub fn load_from_path<P>(path : P) -> Result<Self>
    where
        P : AsRef<Path>
    {
        let f = File::open(path)?;
        Self::load(f)
    }

    pub fn load<R>(mut reader : R) -> Result<Self>
    where
        R : Read
    {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        Self::from_json(&content[..])
    }

    pub fn from_json(content : &str) -> Result<Self> {
        let cfg : ModelConfig = serde_json::from_str(content)?;
        if !(cfg.smoothing >= 0.0) {
            return Err(ModelError::InvalidDomain(format!("smoothing must be nonnegative (got {})", cfg.smoothing)));
        }
        Ok(cfg)
    }

    pub fn save<W>(&self, mut writer : W) -> Result<()>
    where
        W : Write
    {
        let content = serde_json::to_string_pretty(self)?;
        writer.write_all(content.as_bytes())?;
        Ok(())
    }

}

#[test]
fn partial_config() {
    let cfg = ModelConfig::from_json(r#"{ "strategy" : "Shadowed", "smoothing" : 0.5 }"#).unwrap();
    assert_eq!(cfg.strategy, Strategy::Shadowed);
    assert_eq!(cfg.mode, ModeHeuristic::BestMixture);
    assert_eq!(cfg.smoothing, 0.5);
    assert!(cfg.name.is_none());
    assert!(ModelConfig::from_json(r#"{ "smoothing" : -1.0 }"#).is_err());
    let mut out = Vec::new();
    cfg.save(&mut out).unwrap();
    assert_eq!(ModelConfig::load(&out[..]).unwrap(), cfg);
}
