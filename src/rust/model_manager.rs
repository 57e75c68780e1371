use std::collections::HashMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::ModelKind;
use crate::pipeline::{InferenceError, OnnxClassifier, Recommender, StaticLookup};
use crate::runtime::RuntimeConfig;

/// Name of the optional manifest inside the models directory
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model artifact not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),
    #[error("Manifest required but {0} does not exist")]
    ManifestMissing(String),
    #[error("Hash mismatch: expected {expected}, got {actual} for {file} artifact")]
    HashMismatch {
        file: String,
        expected: String,
        actual: String,
    },
    #[error("Failed to load {kind} model: {source}")]
    LoadFailed {
        kind: ModelKind,
        #[source]
        source: InferenceError,
    },
    #[error("Invalid lookup table {path}: {message}")]
    InvalidLookup { path: String, message: String },
    #[error("No {0} model configured")]
    NotConfigured(ModelKind),
}

/// Where an artifact lives and what it should hash to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Versioned description of the artifacts shipped in a models directory.
///
/// ```json
/// {
///   "version": "2024.1",
///   "artifacts": {
///     "crop": { "file": "crop_classifier.onnx", "sha256": "..." },
///     "fertilizer": { "file": "fertilizer_classifier.onnx", "sha256": "..." }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub artifacts: HashMap<String, ArtifactInfo>,
}

/// Locates, verifies and loads the model artifacts of one models directory.
#[derive(Debug, Clone)]
pub struct ModelManager {
    models_dir: PathBuf,
    manifest: Option<Manifest>,
}

impl ModelManager {
    /// Returns the default models directory path
    pub fn get_default_models_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var("AGRO_MODELS_DIR") {
            return PathBuf::from(path);
        }

        // 2. A Models directory next to where the service was started
        let local = PathBuf::from("Models");
        if local.is_dir() {
            return local;
        }

        // 3. Use platform-specific data directory
        if let Some(data_dir) = dirs::data_dir() {
            return data_dir.join("bharat-agro").join("models");
        }

        // 4. If all else fails, fall back to the relative path
        local
    }

    /// Opens `models_dir` and reads its manifest when one is present.
    pub fn new<P: AsRef<Path>>(models_dir: P) -> Result<Self, ModelError> {
        let models_dir = models_dir.as_ref().to_path_buf();
        let manifest_path = models_dir.join(MANIFEST_FILE);
        let manifest = if manifest_path.exists() {
            log::info!("Reading manifest {:?}", manifest_path);
            let bytes = fs::read(&manifest_path)?;
            let manifest: Manifest = serde_json::from_slice(&bytes)
                .map_err(|e| ModelError::InvalidManifest(e.to_string()))?;
            log::info!(
                "Manifest version {} lists {} artifacts",
                manifest.version.as_deref().unwrap_or("unversioned"),
                manifest.artifacts.len()
            );
            Some(manifest)
        } else {
            log::info!("No manifest in {:?}, using default artifact names", models_dir);
            None
        };
        Ok(Self { models_dir, manifest })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    /// Fails unless the directory carries a manifest
    pub fn require_manifest(&self) -> Result<&Manifest, ModelError> {
        self.manifest.as_ref().ok_or_else(|| {
            ModelError::ManifestMissing(self.models_dir.join(MANIFEST_FILE).display().to_string())
        })
    }

    /// The manifest entry for `kind`, or the default file name with no hash
    pub fn artifact_info(&self, kind: ModelKind) -> ArtifactInfo {
        self.manifest
            .as_ref()
            .and_then(|manifest| manifest.artifacts.get(kind.name()))
            .cloned()
            .unwrap_or_else(|| ArtifactInfo {
                file: kind.characteristics().artifact_file.to_string(),
                version: None,
                sha256: None,
            })
    }

    pub fn get_model_path(&self, kind: ModelKind) -> PathBuf {
        self.models_dir.join(self.artifact_info(kind).file)
    }

    pub fn is_model_present(&self, kind: ModelKind) -> bool {
        let path = self.get_model_path(kind);
        log::debug!("Model path: {:?} (exists: {})", path, path.exists());
        path.exists()
    }

    fn verify_file(&self, path: &Path, expected_hash: &str) -> Result<bool, ModelError> {
        log::info!("Verifying file: {:?}", path);
        let bytes = fs::read(path)?;
        log::info!("Read {} bytes", bytes.len());
        let hash = sha256_hex(&bytes);
        log::info!("Calculated hash: {}", hash);
        log::info!("Expected hash:   {}", expected_hash);
        Ok(hash.eq_ignore_ascii_case(expected_hash))
    }

    /// Checks the artifact of `kind` against its recorded hash.
    ///
    /// Returns `false` when the artifact is missing or does not match, and
    /// `true` when it matches or no hash is recorded.
    pub fn verify_model(&self, kind: ModelKind) -> Result<bool, ModelError> {
        let info = self.artifact_info(kind);
        let path = self.models_dir.join(&info.file);
        if !path.exists() {
            log::info!("Artifact {:?} does not exist", path);
            return Ok(false);
        }
        match &info.sha256 {
            Some(expected) => self.verify_file(&path, expected),
            None => Ok(true),
        }
    }

    /// Finds the artifact of `kind` and checks it against its recorded hash.
    ///
    /// An absent artifact is `NotFound` when the kind is required and
    /// `Ok(None)` when it is optional.
    fn locate(&self, kind: ModelKind) -> Result<Option<PathBuf>, ModelError> {
        let info = self.artifact_info(kind);
        let path = self.models_dir.join(&info.file);
        if !path.exists() {
            if !kind.characteristics().required {
                log::info!("Optional {} artifact {:?} not present", kind, path);
                return Ok(None);
            }
            log::error!("{} artifact missing at {:?}", kind, path);
            return Err(ModelError::NotFound(path.display().to_string()));
        }
        if let Some(expected) = &info.sha256 {
            let actual = sha256_hex(&fs::read(&path)?);
            if !actual.eq_ignore_ascii_case(expected) {
                log::error!("{} hash mismatch: expected {}, got {}", kind, expected, actual);
                return Err(ModelError::HashMismatch {
                    file: info.file,
                    expected: expected.clone(),
                    actual,
                });
            }
            log::info!("{} artifact verified successfully", kind);
        }
        Ok(Some(path))
    }

    /// Loads the ONNX classifier for `kind`.
    pub fn load_classifier(
        &self,
        kind: ModelKind,
        config: &RuntimeConfig,
    ) -> Result<OnnxClassifier, ModelError> {
        let path = self.locate(kind)?.ok_or(ModelError::NotConfigured(kind))?;
        log::info!("Loading {} model from {:?}", kind, path);
        let classifier = OnnxClassifier::load(&path, kind.characteristics().feature_width, config)
            .map_err(|source| ModelError::LoadFailed { kind, source })?;
        log::info!(
            "{} model ready: {} features from {}",
            kind,
            classifier.feature_width(),
            classifier.model_path()
        );
        Ok(classifier)
    }

    /// Loads the regional table. Without a `region_crops.json` artifact the
    /// built-in table is used.
    pub fn load_region_table(&self) -> Result<StaticLookup, ModelError> {
        let kind = ModelKind::Region;
        let Some(path) = self.locate(kind)? else {
            log::info!("Using the built-in {} table", kind);
            return Ok(StaticLookup::regional_crops());
        };

        let bytes = fs::read(&path)?;
        let table = StaticLookup::from_json(&bytes).map_err(|e| ModelError::InvalidLookup {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        log::info!("Loaded {} regions from {:?}", table.len(), path);
        Ok(table)
    }

    /// Loads every model and assembles the recommender. Any failure here is
    /// meant to abort startup.
    pub fn load_recommender(&self, config: &RuntimeConfig) -> Result<Recommender, ModelError> {
        log::info!("Loading models from {:?}", self.models_dir);
        Recommender::builder()
            .with_crop_model(self.load_classifier(ModelKind::Crop, config)?)
            .with_fertilizer_model(self.load_classifier(ModelKind::Fertilizer, config)?)
            .with_region_model(self.load_region_table()?)
            .build()
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join("bharat-agro-tests").join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_default_artifact_names() -> Result<(), ModelError> {
        let manager = ModelManager::new(scratch_dir("defaults"))?;
        assert!(manager.manifest().is_none());
        assert!(manager.get_model_path(ModelKind::Crop).ends_with("crop_classifier.onnx"));
        assert!(manager
            .get_model_path(ModelKind::Fertilizer)
            .ends_with("fertilizer_classifier.onnx"));
        assert!(!manager.is_model_present(ModelKind::Crop));
        assert!(!manager.verify_model(ModelKind::Crop)?);
        assert!(matches!(manager.require_manifest(), Err(ModelError::ManifestMissing(_))));
        Ok(())
    }

    #[test]
    fn test_manifest_hash_verification() -> Result<(), ModelError> {
        let dir = scratch_dir("manifest");
        fs::write(dir.join("crop-v2.onnx"), b"model bytes")?;
        let manifest = format!(
            r#"{{"version": "2", "artifacts": {{"crop": {{"file": "crop-v2.onnx", "sha256": "{}"}}}}}}"#,
            sha256_hex(b"model bytes")
        );
        fs::write(dir.join(MANIFEST_FILE), manifest)?;

        let manager = ModelManager::new(&dir)?;
        assert_eq!(manager.require_manifest()?.version.as_deref(), Some("2"));
        assert!(manager.get_model_path(ModelKind::Crop).ends_with("crop-v2.onnx"));
        assert!(manager.verify_model(ModelKind::Crop)?);

        // Corrupt file and verify
        fs::write(dir.join("crop-v2.onnx"), b"corrupted data")?;
        assert!(!manager.verify_model(ModelKind::Crop)?);
        let err = manager.load_classifier(ModelKind::Crop, &RuntimeConfig::default()).unwrap_err();
        assert!(matches!(err, ModelError::HashMismatch { .. }));
        Ok(())
    }

    #[test]
    fn test_invalid_manifest() {
        let dir = scratch_dir("bad-manifest");
        fs::write(dir.join(MANIFEST_FILE), b"{ not json").unwrap();
        assert!(matches!(ModelManager::new(&dir), Err(ModelError::InvalidManifest(_))));
    }

    #[test]
    fn test_missing_classifier_is_fatal() {
        let manager = ModelManager::new(scratch_dir("missing")).unwrap();
        let err = manager.load_recommender(&RuntimeConfig::default()).unwrap_err();
        assert!(matches!(err, ModelError::NotFound(_)));
    }

    #[test]
    fn test_region_table_override() -> Result<(), ModelError> {
        let dir = scratch_dir("region");
        let manager = ModelManager::new(&dir)?;
        assert_eq!(manager.load_region_table()?.lookup("kerala"), Some("Rubber"));

        fs::write(dir.join("region_crops.json"), br#"{"kerala": "Pepper"}"#)?;
        let table = manager.load_region_table()?;
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup("Kerala"), Some("Pepper"));

        fs::write(dir.join("region_crops.json"), b"[]")?;
        assert!(matches!(manager.load_region_table(), Err(ModelError::InvalidLookup { .. })));
        Ok(())
    }

    #[test]
    fn test_presence_follows_characteristics() -> Result<(), ModelError> {
        let manager = ModelManager::new(scratch_dir("presence"))?;
        for kind in ModelKind::ALL {
            match manager.locate(kind) {
                Ok(None) => assert!(!kind.characteristics().required, "{} must be present", kind),
                Err(ModelError::NotFound(_)) => assert!(kind.characteristics().required),
                other => panic!("unexpected outcome for {}: {:?}", kind, other),
            }
        }
        Ok(())
    }

    #[test]
    fn test_present_optional_artifact_is_verified() -> Result<(), ModelError> {
        let dir = scratch_dir("optional-hash");
        fs::write(dir.join("states.json"), br#"{"Goa": "Cashew"}"#)?;
        fs::write(
            dir.join(MANIFEST_FILE),
            r#"{"artifacts": {"region": {"file": "states.json", "sha256": "00"}}}"#,
        )?;
        let manager = ModelManager::new(&dir)?;
        assert!(matches!(manager.load_region_table(), Err(ModelError::HashMismatch { .. })));
        Ok(())
    }
}
