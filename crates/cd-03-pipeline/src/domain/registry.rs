//! # Stage Registry
//!
//! Registered stages with lazily maintained execution order. Registration
//! and reconfiguration only mark the order dirty; the sort happens once,
//! on the next call that needs the order.

use super::config::StageConfig;
use super::errors::PipelineError;
use super::stats::StageStats;

/// One registered stage. `S` is the stage handle.
#[derive(Debug, Clone)]
pub struct StageEntry<S> {
    pub name: String,
    pub config: StageConfig,
    /// Registration order, breaks priority ties.
    pub seq: u64,
    pub stage: S,
    pub stats: StageStats,
}

#[derive(Debug)]
pub struct StageRegistry<S> {
    entries: Vec<StageEntry<S>>,
    next_seq: u64,
    dirty: bool,
}

impl<S> Default for StageRegistry<S> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_seq: 0,
            dirty: false,
        }
    }
}

impl<S: Clone> StageRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// `DuplicateStage` if the name is taken, `InvalidConfig` if the
    /// configuration does not validate.
    pub fn insert(&mut self, name: &str, stage: S, config: StageConfig) -> Result<(), PipelineError> {
        if self.position(name).is_some() {
            return Err(PipelineError::DuplicateStage(name.to_string()));
        }
        config.validate(name)?;

        self.entries.push(StageEntry {
            name: name.to_string(),
            config,
            seq: self.next_seq,
            stage,
            stats: StageStats::default(),
        });
        self.next_seq += 1;
        self.dirty = true;
        Ok(())
    }

    /// # Errors
    ///
    /// `UnknownStage` if no stage has this name.
    pub fn remove(&mut self, name: &str) -> Result<StageEntry<S>, PipelineError> {
        let index = self
            .position(name)
            .ok_or_else(|| PipelineError::UnknownStage(name.to_string()))?;
        // Vec::remove keeps the remaining order intact.
        Ok(self.entries.remove(index))
    }

    /// Replace a stage's configuration.
    ///
    /// # Errors
    ///
    /// `UnknownStage` or `InvalidConfig`.
    pub fn reconfigure(&mut self, name: &str, config: StageConfig) -> Result<(), PipelineError> {
        config.validate(name)?;
        let entry = self.entry_mut(name)?;
        let reordered = entry.config.priority != config.priority;
        entry.config = config;
        if reordered {
            self.dirty = true;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// `UnknownStage`.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<(), PipelineError> {
        self.entry_mut(name)?.config.enabled = enabled;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&StageEntry<S>> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// # Errors
    ///
    /// `UnknownStage`.
    pub fn entry_mut(&mut self, name: &str) -> Result<&mut StageEntry<S>, PipelineError> {
        self.entries
            .iter_mut()
            .find(|entry| entry.name == name)
            .ok_or_else(|| PipelineError::UnknownStage(name.to_string()))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name == name)
    }

    /// Whether the next ordered access will re-sort.
    pub fn needs_sort(&self) -> bool {
        self.dirty
    }

    /// All entries in execution order, sorting first if needed.
    pub fn ordered(&mut self) -> &[StageEntry<S>] {
        if self.dirty {
            self.entries
                .sort_by_key(|entry| (entry.config.priority, entry.seq));
            self.dirty = false;
        }
        &self.entries
    }

    /// Enabled stages in execution order: `(name, config, stage)`.
    pub fn plan(&mut self) -> Vec<(String, StageConfig, S)> {
        self.ordered()
            .iter()
            .filter(|entry| entry.config.enabled)
            .map(|entry| (entry.name.clone(), entry.config.clone(), entry.stage.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
