//! Pact documents: the interactions one consumer expects from one provider

use super::interaction::Interaction;
use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Named side of a contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Participant name, e.g. `AndroidClient`
    pub name: String,
}

/// Provenance of a pact document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PactMetadata {
    /// Tool and version that produced the document
    pub generator: String,
    /// RFC 3339 creation time
    pub generated_at: String,
}

impl Default for PactMetadata {
    fn default() -> Self {
        Self {
            generator: format!("{}/{}", crate::NAME, crate::VERSION),
            generated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Interactions agreed between a consumer and a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pact {
    /// Side issuing the requests
    pub consumer: Participant,
    /// Side answering them
    pub provider: Participant,
    /// Agreed interactions, in declaration order
    pub interactions: Vec<Interaction>,
    /// Provenance
    #[serde(default)]
    pub metadata: PactMetadata,
}

impl Pact {
    /// Empty pact between `consumer` and `provider`
    pub fn new(consumer: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            consumer: Participant {
                name: consumer.into(),
            },
            provider: Participant {
                name: provider.into(),
            },
            interactions: Vec::new(),
            metadata: PactMetadata::default(),
        }
    }

    /// Add an interaction
    #[must_use]
    pub fn with_interaction(mut self, interaction: Interaction) -> Self {
        self.interactions.push(interaction);
        self
    }

    /// Copy holding only the interactions that need provider state `state`
    #[must_use]
    pub fn for_state(&self, state: &str) -> Self {
        Self {
            interactions: self
                .interactions
                .iter()
                .filter(|interaction| interaction.provider_state.as_deref() == Some(state))
                .cloned()
                .collect(),
            ..self.clone()
        }
    }

    /// Copy holding only the interaction described as `description`
    #[must_use]
    pub fn for_description(&self, description: &str) -> Self {
        Self {
            interactions: self
                .interactions
                .iter()
                .filter(|interaction| interaction.description == description)
                .cloned()
                .collect(),
            ..self.clone()
        }
    }

    /// Conventional file name, `{consumer}-{provider}.json`
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}-{}.json", self.consumer.name, self.provider.name)
    }

    /// Pretty JSON rendering
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SerializationError`] if the document cannot be encoded.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ClientError::SerializationError(e.to_string()))
    }

    /// Write the document into `dir`, returning the file written
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::PactWrite`] if the directory or file cannot be written.
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir).map_err(|e| ClientError::PactWrite {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;

        let path = dir.join(self.file_name());
        fs::write(&path, self.to_json()?).map_err(|e| ClientError::PactWrite {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        tracing::info!(path = %path.display(), interactions = self.interactions.len(), "Pact written");
        Ok(path)
    }

    /// Check every interaction's matchers
    ///
    /// # Errors
    ///
    /// Returns the first [`ClientError::InvalidMatcher`] found.
    pub fn validate(&self) -> Result<()> {
        self.interactions.iter().try_for_each(Interaction::validate)
    }

    /// Read a document back
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::PactRead`] if the file cannot be read or parsed,
    /// and [`ClientError::InvalidMatcher`] if a pattern in it is unusable.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| ClientError::PactRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let pact: Self = serde_json::from_str(&contents).map_err(|e| ClientError::PactRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        pact.validate()?;
        Ok(pact)
    }
}
