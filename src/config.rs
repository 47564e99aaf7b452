//! Cost table configuration.
//!
//! Every instruction's base cost comes from a [`CostModel`]. The defaults describe the reference
//! machine; a JSON file may override any subset of the fields:
//!
//! ```json
//! { "call": 4.0, "per_arg": 0.5 }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read cost table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid cost table: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid cost table: '{field}' is {value}, costs must be finite and non-negative")]
    Invalid { field: &'static str, value: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CostModel {
    // terminators
    pub ret: f64,
    pub br_uncond: f64,
    pub br_cond_true: f64,
    pub br_cond_false: f64,
    pub switch: f64,

    // memory
    pub malloc: f64,
    pub free: f64,
    pub stack: f64,
    pub heap: f64,
    pub aload: f64,
    pub wait_stack: f64,
    pub wait_heap: f64,

    // binary operations
    pub muldiv: f64,
    pub logical: f64,
    pub addsub: f64,
    pub comp: f64,

    pub sum: f64,
    pub uop: f64,
    pub ternary: f64,

    // calls
    pub call: f64,
    pub per_arg: f64,

    pub assert: f64,
    pub read: f64,
    pub write: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        CostModel {
            ret: 1.0,
            br_uncond: 1.0,
            br_cond_true: 6.0,
            br_cond_false: 1.0,
            switch: 1.2,
            malloc: 16.0,
            free: 16.0,
            stack: 6.0,
            heap: 12.0,
            aload: 1.0,
            wait_stack: 10.0,
            wait_heap: 16.0,
            muldiv: 1.0,
            logical: 4.0,
            addsub: 5.0,
            comp: 1.0,
            sum: 5.2,
            uop: 1.0,
            ternary: 1.2,
            call: 2.0,
            per_arg: 1.0,
            assert: 0.0,
            read: 0.0,
            write: 0.0,
        }
    }
}

impl CostModel {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let model: CostModel = serde_json::from_str(text)?;
        model.validate()?;
        Ok(model)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let model = Self::from_json(&text)?;
        tracing::debug!(path = %path.display(), "loaded cost table");
        Ok(model)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("ret", self.ret),
            ("br_uncond", self.br_uncond),
            ("br_cond_true", self.br_cond_true),
            ("br_cond_false", self.br_cond_false),
            ("switch", self.switch),
            ("malloc", self.malloc),
            ("free", self.free),
            ("stack", self.stack),
            ("heap", self.heap),
            ("aload", self.aload),
            ("wait_stack", self.wait_stack),
            ("wait_heap", self.wait_heap),
            ("muldiv", self.muldiv),
            ("logical", self.logical),
            ("addsub", self.addsub),
            ("comp", self.comp),
            ("sum", self.sum),
            ("uop", self.uop),
            ("ternary", self.ternary),
            ("call", self.call),
            ("per_arg", self.per_arg),
            ("assert", self.assert),
            ("read", self.read),
            ("write", self.write),
        ];
        match fields.into_iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            Some((field, value)) => Err(ConfigError::Invalid { field, value }),
            None => Ok(()),
        }
    }
}
