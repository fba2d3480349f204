//! RON job configuration loader

use crate::error::{Error, Result};
use crate::schema::{JobConfig, JobFile};
use std::fs;
use std::path::Path;

/// Loader merging one or more RON job files into a [`JobConfig`]
pub struct Loader {
    config: JobConfig,
    driver_loaded: bool,
}

impl Loader {
    /// Create a new loader
    pub fn new() -> Self {
        Self {
            config: JobConfig::new(),
            driver_loaded: false,
        }
    }

    /// Load a single RON file
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loading job configuration");
        self.load_str(&content)
    }

    /// Load a job document from a RON string
    pub fn load_str(&mut self, content: &str) -> Result<()> {
        let file: JobFile = ron::from_str(content)?;
        self.merge(file)
    }

    fn merge(&mut self, file: JobFile) -> Result<()> {
        for key in file.globals.keys() {
            if self.config.globals.contains(key) {
                return Err(Error::DuplicateEntry(format!("global parameter {:?}", key)));
            }
        }
        for (key, value) in file.globals.as_map() {
            self.config.globals.insert(key.clone(), value.clone());
        }

        for (name, settings) in file.run_settings {
            if self.config.run_settings.contains_key(&name) {
                return Err(Error::DuplicateEntry(format!("run settings {:?}", name)));
            }
            self.config.run_settings.insert(name, settings);
        }

        if let Some(mut driver) = file.driver {
            if self.driver_loaded {
                return Err(Error::DuplicateEntry("driver settings".to_string()));
            }
            // Re-apply through the setter so out-of-range values are clamped
            let verbosity = driver.verbosity();
            driver.set_verbosity(verbosity);
            self.config.driver = driver;
            self.driver_loaded = true;
        }

        for plugin in file.plugins {
            if plugin.name.is_empty() {
                return Err(Error::InvalidConfig("plugin with an empty name".to_string()));
            }
            if self.config.plugins.contains_key(&plugin.name) {
                return Err(Error::DuplicateEntry(format!("plugin {:?}", plugin.name)));
            }
            self.config.plugins.insert(plugin.name.clone(), plugin);
        }

        for component in file.geometry {
            if component.category.is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "component {:?} has an empty category",
                    component.name
                )));
            }
            if self.config.geometry.contains_key(&component.category) {
                return Err(Error::DuplicateEntry(format!(
                    "geometry category {:?}",
                    component.category
                )));
            }
            self.config
                .geometry
                .insert(component.category.clone(), component);
        }
        Ok(())
    }

    /// Load all RON files from a directory, in file name order
    pub fn load_directory(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if !path.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Not a directory: {:?}", path),
            )));
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(path)? {
            let file_path = entry?.path();
            if file_path.extension().map(|e| e == "ron").unwrap_or(false) {
                files.push(file_path);
            }
        }
        files.sort();

        for file in files {
            self.load_file(&file)?;
        }
        Ok(())
    }

    /// Finish loading and return the configuration
    pub fn finish(self) -> JobConfig {
        self.config
    }

    /// Get the configuration loaded so far
    pub fn config(&self) -> &JobConfig {
        &self.config
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}
