//! Filesystem artifact store: Implementation of ArtifactSource.
//!
//! Loads `scalers.json` and one `<file stem>.json` per registered model from
//! the model directory.
//!
//! # Integrity
//!
//! - If `manifest.json` is present, every artifact read must be listed in it
//!   and match its SHA-256 digest. Digests are checked against the exact bytes
//!   that get parsed.
//! - If `model.sig` is present, it must be a valid Ed25519 signature over the
//!   manifest bytes for the configured verifying key.
//! - With `require_signed`, both files are mandatory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::adapters::classifiers::ExportedModel;
use crate::domain::{Attribute, Scaler, ScalerError, ScalerSet};
use crate::ports::{ArtifactSource, Classifier, ModelEntry, ModelError};

pub const SCALERS_FILE: &str = "scalers.json";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const SIGNATURE_FILE: &str = "model.sig";

const MANIFEST_VERSION: u32 = 1;

/// Error type for artifact loading.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Integrity check failed: {0}")]
    Integrity(String),

    #[error("Signature verification failed: {0}")]
    Signature(String),

    #[error(transparent)]
    Scaler(#[from] ScalerError),

    #[error("{name}: {source}")]
    Model {
        name: String,
        #[source]
        source: ModelError,
    },
}

/// SHA-256 digests of the artifact files, keyed by file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub version: u32,
    #[serde(default)]
    pub created_at: Option<i64>,
    pub files: BTreeMap<String, String>,
}

impl ArtifactManifest {
    /// Hash `names` inside `dir`.
    ///
    /// # Errors
    /// Returns `ArtifactError::Io` if a file cannot be read.
    pub fn for_files(dir: &Path, names: &[String]) -> Result<Self, ArtifactError> {
        let mut files = BTreeMap::new();
        for name in names {
            let path = dir.join(name);
            let bytes = fs::read(&path).map_err(|source| ArtifactError::Io { path, source })?;
            files.insert(name.clone(), sha256_hex(&bytes));
        }
        Ok(Self {
            version: MANIFEST_VERSION,
            created_at: Some(chrono::Utc::now().timestamp()),
            files,
        })
    }
}

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes).iter().map(|b| format!("{b:02x}")).collect()
}

fn constant_time_eq_str(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Decode a base64 Ed25519 verifying key.
///
/// # Errors
/// Returns `ArtifactError::Signature` for malformed input.
pub fn verifying_key_from_b64(b64: &str) -> Result<VerifyingKey, ArtifactError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|_| ArtifactError::Signature("Invalid public key base64".into()))?;
    let bytes: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
        ArtifactError::Signature("Invalid public key length (expected 32 bytes)".into())
    })?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|_| ArtifactError::Signature("Invalid verifying key".into()))
}

/// Read a base64 verifying key from a file.
///
/// # Errors
/// Returns `ArtifactError::Io` or `ArtifactError::Signature`.
pub fn load_verifying_key(path: &Path) -> Result<VerifyingKey, ArtifactError> {
    let b64 = fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    verifying_key_from_b64(&b64)
}

/// What the store demands before trusting artifacts.
#[derive(Debug, Clone, Default)]
pub struct VerificationPolicy {
    pub require_signed: bool,
    pub verifying_key: Option<VerifyingKey>,
}

impl VerificationPolicy {
    /// A configured verifying key implies signed artifacts.
    #[must_use]
    pub fn requires_signature(&self) -> bool {
        self.require_signed || self.verifying_key.is_some()
    }
}

/// Artifact store rooted at a model directory.
#[derive(Debug)]
pub struct FsArtifactStore {
    model_dir: PathBuf,
    manifest: Option<ArtifactManifest>,
}

impl FsArtifactStore {
    /// Open the model directory and verify its manifest, if any.
    ///
    /// # Errors
    /// Returns error if the directory is missing, the manifest is malformed,
    /// or the signature requirements of `policy` are not met.
    pub fn open(
        model_dir: impl Into<PathBuf>,
        policy: &VerificationPolicy,
    ) -> Result<Self, ArtifactError> {
        let model_dir = model_dir.into();
        if !model_dir.is_dir() {
            return Err(ArtifactError::Io {
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "model directory not found",
                ),
                path: model_dir,
            });
        }

        let manifest = Self::verify_manifest(&model_dir, policy)?;
        tracing::info!(
            "Opened model directory {:?} (manifest={})",
            model_dir,
            manifest.is_some()
        );

        Ok(Self {
            model_dir,
            manifest,
        })
    }

    fn verify_manifest(
        model_dir: &Path,
        policy: &VerificationPolicy,
    ) -> Result<Option<ArtifactManifest>, ArtifactError> {
        let manifest_path = model_dir.join(MANIFEST_FILE);
        let sig_path = model_dir.join(SIGNATURE_FILE);

        if !manifest_path.exists() {
            if policy.requires_signature() {
                return Err(ArtifactError::Signature(format!(
                    "signed artifacts required but {MANIFEST_FILE} is missing"
                )));
            }
            if sig_path.exists() {
                return Err(ArtifactError::Integrity(format!(
                    "{SIGNATURE_FILE} present without {MANIFEST_FILE}"
                )));
            }
            tracing::warn!("No artifact manifest found; loading unverified artifacts");
            return Ok(None);
        }

        let manifest_bytes = fs::read(&manifest_path).map_err(|source| ArtifactError::Io {
            path: manifest_path.clone(),
            source,
        })?;

        if sig_path.exists() {
            let key = policy.verifying_key.as_ref().ok_or_else(|| {
                ArtifactError::Signature("no verifying key configured".into())
            })?;
            let sig_bytes = fs::read(&sig_path).map_err(|source| ArtifactError::Io {
                path: sig_path.clone(),
                source,
            })?;
            let sig_bytes: [u8; 64] = sig_bytes.as_slice().try_into().map_err(|_| {
                ArtifactError::Signature("Invalid signature length (expected 64 bytes)".into())
            })?;
            key.verify(&manifest_bytes, &Signature::from_bytes(&sig_bytes))
                .map_err(|_| ArtifactError::Signature("Invalid manifest signature".into()))?;
            tracing::info!("Artifact manifest signature verified");
        } else if policy.requires_signature() {
            return Err(ArtifactError::Signature(format!(
                "signed artifacts required but {SIGNATURE_FILE} is missing"
            )));
        } else {
            tracing::warn!("Artifact manifest is not signed");
        }

        let manifest: ArtifactManifest =
            serde_json::from_slice(&manifest_bytes).map_err(|source| ArtifactError::Parse {
                path: manifest_path,
                source,
            })?;

        if manifest.version != MANIFEST_VERSION {
            return Err(ArtifactError::Integrity(format!(
                "Unsupported manifest version: {}",
                manifest.version
            )));
        }
        if manifest.files.is_empty() {
            return Err(ArtifactError::Integrity(format!("{MANIFEST_FILE} lists no files")));
        }
        if let Some(bad) = manifest
            .files
            .keys()
            .find(|name| name.contains('/') || name.contains('\\') || name.contains(".."))
        {
            return Err(ArtifactError::Integrity(format!(
                "manifest entry {bad:?} is not a plain file name"
            )));
        }

        Ok(Some(manifest))
    }

    /// Read an artifact, checking it against the manifest when there is one.
    fn read_artifact(&self, name: &str) -> Result<Vec<u8>, ArtifactError> {
        let path = self.model_dir.join(name);
        let bytes = fs::read(&path).map_err(|source| ArtifactError::Io { path, source })?;

        if let Some(manifest) = &self.manifest {
            let expected = manifest.files.get(name).ok_or_else(|| {
                ArtifactError::Integrity(format!("{name} is not listed in {MANIFEST_FILE}"))
            })?;
            if !constant_time_eq_str(&sha256_hex(&bytes), expected) {
                return Err(ArtifactError::Integrity(format!("File hash mismatch for {name}")));
            }
        }

        Ok(bytes)
    }

    fn parse_artifact<T: DeserializeOwned>(&self, name: &str) -> Result<T, ArtifactError> {
        let bytes = self.read_artifact(name)?;
        serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Parse {
            path: self.model_dir.join(name),
            source,
        })
    }
}

impl ArtifactSource for FsArtifactStore {
    type Error = ArtifactError;

    fn load_scalers(&self) -> Result<ScalerSet, ArtifactError> {
        let exported: BTreeMap<String, Scaler> = self.parse_artifact(SCALERS_FILE)?;

        let mut scalers = BTreeMap::new();
        for (name, scaler) in exported {
            match Attribute::from_name(&name) {
                Some(attribute) => {
                    scalers.insert(attribute, scaler);
                }
                None => tracing::warn!("Ignoring scaler for unknown column {name:?}"),
            }
        }

        let set = ScalerSet::new(scalers)?;
        tracing::info!("Loaded scalers from {SCALERS_FILE}");
        Ok(set)
    }

    fn load_model(&self, entry: &ModelEntry) -> Result<Box<dyn Classifier>, ArtifactError> {
        let file = format!("{}.json", entry.file_stem);
        let exported: ExportedModel = self.parse_artifact(&file)?;
        let classifier = exported.into_classifier().map_err(|source| ArtifactError::Model {
            name: entry.name.to_string(),
            source,
        })?;

        tracing::info!(
            "Loaded model {:?} from {} ({})",
            entry.name,
            file,
            classifier.family()
        );
        Ok(classifier)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::SCALED_ATTRIBUTES;
    use crate::ports::MODEL_REGISTRY;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::RngCore;
    use tempfile::tempdir;

    /// Write a complete, consistent artifact set into `dir`.
    pub(crate) fn write_artifacts(dir: &Path) {
        let scalers = serde_json::json!({
            "Age": { "kind": "standard", "mean": 53.5, "scale": 9.4 },
            "RestingBP": { "kind": "standard", "mean": 132.4, "scale": 18.5 },
            "Cholesterol": { "kind": "standard", "mean": 198.8, "scale": 109.4 },
            "MaxHR": { "kind": "standard", "mean": 136.8, "scale": 25.5 },
            "Oldpeak": { "kind": "standard", "mean": 0.89, "scale": 1.07 }
        });
        fs::write(dir.join(SCALERS_FILE), scalers.to_string()).expect("write scalers");

        let mut sv_pos = vec![0.0; 11];
        sv_pos[2] = 3.0;
        let leaf = |v: [f64; 2]| serde_json::json!(v);
        let stump = serde_json::json!({
            "children_left": [1, -1, -1],
            "children_right": [2, -1, -1],
            "feature": [8, -2, -2],
            "threshold": [0.5, -2.0, -2.0],
            "value": [leaf([10.0, 10.0]), leaf([9.0, 1.0]), leaf([1.0, 9.0])]
        });

        let models = [
            serde_json::json!({
                "family": "logistic_regression",
                "n_features": 11,
                "coefficients": [0.3, 1.2, 0.8, 0.2, -0.4, 1.1, 0.1, -0.6, 1.0, 0.7, 1.3],
                "intercept": -2.0
            }),
            serde_json::json!({
                "family": "svm",
                "n_features": 11,
                "kernel": { "type": "rbf", "gamma": 0.1 },
                "support_vectors": [sv_pos, vec![0.0; 11]],
                "dual_coef": [1.0, -1.0],
                "intercept": 0.0
            }),
            serde_json::json!({
                "family": "decision_tree",
                "n_features": 11
            }),
            serde_json::json!({
                "family": "random_forest",
                "n_features": 11,
                "trees": [stump.clone(), stump.clone()]
            }),
            serde_json::json!({
                "family": "knn",
                "n_features": 11,
                "n_neighbors": 1,
                "points": [vec![0.0; 11], vec![1.0; 11]],
                "labels": [0, 1]
            }),
        ];

        for (entry, mut model) in MODEL_REGISTRY.iter().zip(models) {
            if entry.file_stem == "trained_model_decision_tree" {
                if let (Some(obj), Some(tree)) = (model.as_object_mut(), stump.as_object()) {
                    obj.extend(tree.clone());
                }
            }
            fs::write(dir.join(format!("{}.json", entry.file_stem)), model.to_string())
                .expect("write model");
        }
    }

    fn artifact_names() -> Vec<String> {
        std::iter::once(SCALERS_FILE.to_string())
            .chain(MODEL_REGISTRY.iter().map(|e| format!("{}.json", e.file_stem)))
            .collect()
    }

    fn sign_dir(dir: &Path) -> VerifyingKey {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        let signing_key = SigningKey::from_bytes(&seed);

        let manifest = ArtifactManifest::for_files(dir, &artifact_names()).expect("manifest");
        let bytes = serde_json::to_vec(&manifest).expect("serialize manifest");
        fs::write(dir.join(MANIFEST_FILE), &bytes).expect("write manifest");
        let signature: Signature = signing_key.sign(&bytes);
        fs::write(dir.join(SIGNATURE_FILE), signature.to_bytes()).expect("write signature");

        signing_key.verifying_key()
    }

    fn load_all(store: &FsArtifactStore) -> Result<usize, ArtifactError> {
        store.load_scalers()?;
        for entry in &MODEL_REGISTRY {
            store.load_model(entry)?;
        }
        Ok(MODEL_REGISTRY.len())
    }

    #[test]
    fn test_loads_unsigned_artifacts() {
        let temp = tempdir().expect("tempdir");
        write_artifacts(temp.path());

        let store = FsArtifactStore::open(temp.path(), &VerificationPolicy::default())
            .expect("open store");
        let scalers = store.load_scalers().expect("scalers");
        for attribute in SCALED_ATTRIBUTES {
            assert!(scalers.get(attribute).is_some());
        }
        assert_eq!(load_all(&store).expect("load"), 5);
    }

    #[test]
    fn test_missing_directory_fails() {
        let temp = tempdir().expect("tempdir");
        let err = FsArtifactStore::open(temp.path().join("absent"), &VerificationPolicy::default())
            .expect_err("must fail");
        assert!(matches!(err, ArtifactError::Io { .. }));
    }

    #[test]
    fn test_missing_model_file_fails() {
        let temp = tempdir().expect("tempdir");
        write_artifacts(temp.path());
        fs::remove_file(temp.path().join("trained_model_knn.json")).expect("remove");

        let store = FsArtifactStore::open(temp.path(), &VerificationPolicy::default())
            .expect("open store");
        assert!(matches!(load_all(&store), Err(ArtifactError::Io { .. })));
    }

    #[test]
    fn test_missing_scaler_fails() {
        let temp = tempdir().expect("tempdir");
        write_artifacts(temp.path());
        let partial = serde_json::json!({
            "Age": { "kind": "standard", "mean": 53.5, "scale": 9.4 }
        });
        fs::write(temp.path().join(SCALERS_FILE), partial.to_string()).expect("write");

        let store = FsArtifactStore::open(temp.path(), &VerificationPolicy::default())
            .expect("open store");
        assert!(matches!(
            store.load_scalers(),
            Err(ArtifactError::Scaler(ScalerError::Missing(_)))
        ));
    }

    #[test]
    fn test_signed_artifacts_verify() {
        let temp = tempdir().expect("tempdir");
        write_artifacts(temp.path());
        let key = sign_dir(temp.path());

        let policy = VerificationPolicy {
            require_signed: true,
            verifying_key: Some(key),
        };
        let store = FsArtifactStore::open(temp.path(), &policy).expect("open signed store");
        assert_eq!(load_all(&store).expect("load"), 5);
    }

    #[test]
    fn test_tampered_artifact_is_rejected() {
        let temp = tempdir().expect("tempdir");
        write_artifacts(temp.path());
        let key = sign_dir(temp.path());

        let zeros = vec![0.0_f64; 11];
        let tampered = serde_json::json!({
            "family": "logistic_regression",
            "n_features": 11,
            "coefficients": zeros,
            "intercept": 5.0
        });
        fs::write(
            temp.path().join("trained_model_logistic_regression.json"),
            tampered.to_string(),
        )
        .expect("write");

        let policy = VerificationPolicy {
            require_signed: true,
            verifying_key: Some(key),
        };
        let store = FsArtifactStore::open(temp.path(), &policy).expect("manifest still valid");
        let err = store.load_model(&MODEL_REGISTRY[0]).err().expect("must fail");
        assert!(err.to_string().contains("hash mismatch"));
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let temp = tempdir().expect("tempdir");
        write_artifacts(temp.path());
        sign_dir(temp.path());

        let other = SigningKey::from_bytes(&[7u8; 32]).verifying_key();
        let policy = VerificationPolicy {
            require_signed: false,
            verifying_key: Some(other),
        };
        assert!(matches!(
            FsArtifactStore::open(temp.path(), &policy),
            Err(ArtifactError::Signature(_))
        ));
    }

    #[test]
    fn test_required_signature_missing() {
        let temp = tempdir().expect("tempdir");
        write_artifacts(temp.path());

        let policy = VerificationPolicy {
            require_signed: true,
            verifying_key: None,
        };
        assert!(matches!(
            FsArtifactStore::open(temp.path(), &policy),
            Err(ArtifactError::Signature(_))
        ));
    }

    #[test]
    fn test_configured_key_requires_signature() {
        let temp = tempdir().expect("tempdir");
        write_artifacts(temp.path());
        let key = sign_dir(temp.path());
        fs::remove_file(temp.path().join(SIGNATURE_FILE)).expect("remove signature");

        let policy = VerificationPolicy {
            require_signed: false,
            verifying_key: Some(key),
        };
        assert!(policy.requires_signature());
        assert!(matches!(
            FsArtifactStore::open(temp.path(), &policy),
            Err(ArtifactError::Signature(_))
        ));

        fs::remove_file(temp.path().join(MANIFEST_FILE)).expect("remove manifest");
        assert!(matches!(
            FsArtifactStore::open(temp.path(), &policy),
            Err(ArtifactError::Signature(_))
        ));
    }

    #[test]
    fn test_unlisted_artifact_is_rejected() {
        let temp = tempdir().expect("tempdir");
        write_artifacts(temp.path());

        let manifest = ArtifactManifest::for_files(temp.path(), &[SCALERS_FILE.to_string()])
            .expect("manifest");
        fs::write(
            temp.path().join(MANIFEST_FILE),
            serde_json::to_vec(&manifest).expect("serialize"),
        )
        .expect("write manifest");

        let store = FsArtifactStore::open(temp.path(), &VerificationPolicy::default())
            .expect("unsigned manifest accepted");
        assert!(store.load_scalers().is_ok());
        let err = store.load_model(&MODEL_REGISTRY[1]).err().expect("must fail");
        assert!(matches!(err, ArtifactError::Integrity(_)));
    }

    #[test]
    fn test_verifying_key_from_b64() {
        let key = SigningKey::from_bytes(&[1u8; 32]).verifying_key();
        let b64 = base64::engine::general_purpose::STANDARD.encode(key.to_bytes());
        assert_eq!(verifying_key_from_b64(&format!("{b64}\n")).expect("decode"), key);
        assert!(verifying_key_from_b64("not base64!").is_err());
        assert!(verifying_key_from_b64("AAAA").is_err());
    }
}
