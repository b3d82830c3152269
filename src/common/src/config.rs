use crate::CrustyError;
use std::fs;
use std::path::Path;

fn default_sort_buffer_fraction() -> f64 {
    0.8
}

/// Knobs for operator execution.
///
/// Can be read from a json file, e.g. `{"sort_buffer_fraction": 0.5}`;
/// missing keys take their defaults.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ExecConfig {
    /// Share of the unpinned buffer pages a sort-merge join may use for one sort run.
    #[serde(default = "default_sort_buffer_fraction")]
    pub sort_buffer_fraction: f64,
    /// Where the storage manager persists relations. Empty means never persisted.
    #[serde(default)]
    pub storage_path: String,
}

impl Default for ExecConfig {
    fn default() -> Self {
        ExecConfig {
            sort_buffer_fraction: default_sort_buffer_fraction(),
            storage_path: String::new(),
        }
    }
}

impl ExecConfig {
    /// Read a config file.
    pub fn from_file(path: &Path) -> Result<Self, CrustyError> {
        let contents = fs::read_to_string(path)?;
        let config: ExecConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        debug!("Loaded exec config {:?}", config);
        Ok(config)
    }

    fn validate(&self) -> Result<(), CrustyError> {
        if !(self.sort_buffer_fraction > 0.0 && self.sort_buffer_fraction <= 1.0) {
            return Err(CrustyError::ValidationError(format!(
                "sort_buffer_fraction must be in (0, 1], got {}",
                self.sort_buffer_fraction
            )));
        }
        Ok(())
    }
}
