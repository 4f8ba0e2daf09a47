//! Artifact signing utility.
//!
//! Writes `manifest.json` (SHA-256 of `scalers.json` and every registered
//! model file) and `model.sig` (Ed25519 signature over the manifest bytes)
//! into a model directory, then re-opens the directory with signatures
//! required to confirm the result.
//!
//! # Usage
//!
//! ```bash
//! sign_model <model_dir> [--seed-file <path>] [--out-pub <path>]
//! sign_model --generate-seed <path> [--out-pub <path>] [--force]
//! ```
//!
//! The seed file holds a base64 32-byte Ed25519 seed. Without `--seed-file`,
//! `HEARTCHECK_MODEL_SIGNING_KEY_B64_FILE` is used.

use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use heartcheck::adapters::artifacts::{
    ArtifactManifest, FsArtifactStore, VerificationPolicy, MANIFEST_FILE, SCALERS_FILE,
    SIGNATURE_FILE,
};
use heartcheck::ports::MODEL_REGISTRY;

const KEY_FILE_ENV: &str = "HEARTCHECK_MODEL_SIGNING_KEY_B64_FILE";

const USAGE: &str = "Usage:
  sign_model <model_dir> [--seed-file <path>] [--out-pub <path>]
  sign_model --generate-seed <path> [--out-pub <path>] [--force]";

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

enum Command {
    Sign {
        model_dir: PathBuf,
        seed_file: Option<PathBuf>,
        out_pub: Option<PathBuf>,
    },
    GenerateSeed {
        out_seed: PathBuf,
        out_pub: Option<PathBuf>,
        force: bool,
    },
}

fn next_path(args: &mut impl Iterator<Item = String>) -> Result<PathBuf> {
    args.next()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("{USAGE}"))
}

fn parse_args() -> Result<Command> {
    let mut args = std::env::args().skip(1);
    let mut model_dir = None;
    let mut seed_file = None;
    let mut out_pub = None;
    let mut generate = None;
    let mut force = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--seed-file" => seed_file = Some(next_path(&mut args)?),
            "--out-pub" => out_pub = Some(next_path(&mut args)?),
            "--generate-seed" => generate = Some(next_path(&mut args)?),
            "--force" => force = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            _ if model_dir.is_none() && !arg.starts_with('-') => {
                model_dir = Some(PathBuf::from(&arg));
            }
            _ => bail!("Unknown argument {arg:?}\n{USAGE}"),
        }
    }

    match (generate, model_dir) {
        (Some(out_seed), None) => Ok(Command::GenerateSeed {
            out_seed,
            out_pub,
            force,
        }),
        (None, Some(model_dir)) => Ok(Command::Sign {
            model_dir,
            seed_file,
            out_pub,
        }),
        _ => bail!("{USAGE}"),
    }
}

fn read_seed(seed_file: Option<PathBuf>) -> Result<Seed> {
    let path = match seed_file {
        Some(path) => path,
        None => std::env::var(KEY_FILE_ENV)
            .map(|p| PathBuf::from(p.trim()))
            .map_err(|_| anyhow!("Missing signing seed. Pass --seed-file or set {KEY_FILE_ENV}."))?,
    };

    let content = Zeroizing::new(
        fs::read_to_string(&path).with_context(|| format!("Failed reading seed file {path:?}"))?,
    );
    let raw = Zeroizing::new(
        general_purpose::STANDARD
            .decode(content.trim())
            .context("Invalid base64 in signing seed")?,
    );
    let bytes: [u8; 32] = raw.as_slice().try_into().map_err(|_| {
        anyhow!(
            "Signing seed must be 32 bytes after base64 decode (got {})",
            raw.len()
        )
    })?;
    Ok(Seed(bytes))
}

fn write_file(path: &Path, contents: &[u8], mode: u32, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("Refusing to overwrite existing file {path:?}. Use --force.");
    }
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let mut opts = fs::OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    opts.mode(mode);
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = opts
        .open(path)
        .with_context(|| format!("Failed to open {path:?}"))?;
    file.write_all(contents)?;
    file.write_all(b"\n")?;
    Ok(())
}

fn write_public_key(signing_key: &SigningKey, out_pub: Option<&Path>, force: bool) -> Result<()> {
    let pub_b64 = general_purpose::STANDARD.encode(signing_key.verifying_key().as_bytes());
    if let Some(path) = out_pub {
        // Public key is non-secret
        write_file(path, pub_b64.as_bytes(), 0o644, force)?;
        println!("Wrote public key (base64) to {path:?}");
    }
    println!("PUBKEY (base64)={pub_b64}");
    Ok(())
}

fn generate_seed(out_seed: &Path, out_pub: Option<&Path>, force: bool) -> Result<()> {
    let mut seed = Seed([0u8; 32]);
    OsRng.fill_bytes(&mut seed.0);

    let seed_b64 = Zeroizing::new(general_purpose::STANDARD.encode(seed.0));
    write_file(out_seed, seed_b64.as_bytes(), 0o600, force)?;
    println!("Wrote signing seed (base64) to {out_seed:?}");

    write_public_key(&SigningKey::from_bytes(&seed.0), out_pub, force)
}

fn sign(model_dir: &Path, seed_file: Option<PathBuf>, out_pub: Option<&Path>) -> Result<()> {
    if !model_dir.is_dir() {
        bail!("{model_dir:?} is not a directory");
    }

    let seed = read_seed(seed_file)?;
    let signing_key = SigningKey::from_bytes(&seed.0);

    let names: Vec<String> = std::iter::once(SCALERS_FILE.to_string())
        .chain(MODEL_REGISTRY.iter().map(|e| format!("{}.json", e.file_stem)))
        .collect();
    let manifest = ArtifactManifest::for_files(model_dir, &names)?;
    let manifest_bytes = serde_json::to_vec_pretty(&manifest)?;

    let manifest_path = model_dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, &manifest_bytes)
        .with_context(|| format!("Failed to write {manifest_path:?}"))?;

    let sig: Signature = signing_key.sign(&manifest_bytes);
    let sig_path = model_dir.join(SIGNATURE_FILE);
    fs::write(&sig_path, sig.to_bytes()).with_context(|| format!("Failed to write {sig_path:?}"))?;

    println!("Signed manifest: {manifest_path:?} ({} files)", manifest.files.len());
    println!("Wrote signature: {sig_path:?}");

    let policy = VerificationPolicy {
        require_signed: true,
        verifying_key: Some(signing_key.verifying_key()),
    };
    FsArtifactStore::open(model_dir, &policy).context("Signed directory failed verification")?;

    write_public_key(&signing_key, out_pub, true)
}

fn main() -> Result<()> {
    match parse_args()? {
        Command::GenerateSeed {
            out_seed,
            out_pub,
            force,
        } => generate_seed(&out_seed, out_pub.as_deref(), force),
        Command::Sign {
            model_dir,
            seed_file,
            out_pub,
        } => sign(&model_dir, seed_file, out_pub.as_deref()),
    }
}
