use crate::compiler::CompiledScript;
use crate::compiler::runtime::RUNTIME_ABI_VERSION;
use crate::error::ArtifactError;
use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};

/// A compiled script tagged with the runtime ABI it was generated for.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScriptArtifact {
    pub runtime_version: u32,
    pub script: String,
    pub diagnostics: Vec<String>,
}

impl ScriptArtifact {
    pub fn new(compiled: &CompiledScript) -> Self {
        Self {
            runtime_version: RUNTIME_ABI_VERSION,
            script: compiled.script.clone(),
            diagnostics: compiled.diagnostics.iter().map(ToString::to_string).collect(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ArtifactError> {
        encode_to_vec(self, standard())
            .map_err(|e| ArtifactError::Generic(format!("Serialization failed: {}", e)))
    }

    /// Saves the artifact to a file using the bincode format.
    pub fn save(&self, path: &str) -> Result<(), ArtifactError> {
        let bytes = self.to_bytes()?;
        let mut file = fs::File::create(path).map_err(|e| {
            ArtifactError::Generic(format!("Could not create file '{}': {}", path, e))
        })?;
        file.write_all(&bytes).map_err(|e| {
            ArtifactError::Generic(format!("Could not write to file '{}': {}", path, e))
        })?;
        Ok(())
    }

    pub fn from_file(path: &str) -> Result<Self, ArtifactError> {
        let mut file = fs::File::open(path)
            .map_err(|e| ArtifactError::Generic(format!("Could not open file '{}': {}", path, e)))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(|e| {
            ArtifactError::Generic(format!("Could not read from file '{}': {}", path, e))
        })?;
        Self::from_bytes(&bytes)
    }

    /// Deserializes an artifact, rejecting one built for another runtime ABI.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ArtifactError> {
        let artifact: Self = decode_from_slice(bytes, standard())
            .map(|(artifact, _)| artifact)
            .map_err(|e| ArtifactError::Generic(format!("Deserialization failed: {}", e)))?;
        if artifact.runtime_version != RUNTIME_ABI_VERSION {
            return Err(ArtifactError::VersionMismatch {
                expected: RUNTIME_ABI_VERSION,
                found: artifact.runtime_version,
            });
        }
        Ok(artifact)
    }
}
