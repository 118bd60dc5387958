//! At-rest keystore encryption: scrypt KDF + AES-256-GCM, plaintext
//! buffers zeroed on every exit path. Grounded on the persister's
//! `EncryptedWalletFile` shape, restructured to the on-disk schema this
//! runtime's external interfaces demand (§6) and switched to scrypt.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use rand::rngs::OsRng;
use scrypt::Params as ScryptParams;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use crate::error::{Error, Result};

const SCHEMA_VERSION: u32 = 1;
const SALT_LEN: usize = 32;
const IV_LEN: usize = 16;
const TAG_LEN: usize = 16;
const SECRET_LEN: usize = 64; // 32-byte seed || 32-byte public key
const MIN_PASSPHRASE_LEN: usize = 8;

const DEFAULT_LOG_N: u8 = 14; // N = 16384
const DEFAULT_R: u32 = 8;
const DEFAULT_P: u32 = 1;

/// An in-memory, never-serialized signing identity. Holds the full 64-byte
/// secret (32-byte seed || 32-byte public key) and the base58 public
/// identifier. Not `Clone`, not `Serialize`. Zeroed on drop.
pub struct SigningIdentity {
    secret: Zeroizing<[u8; SECRET_LEN]>,
    public_key: String,
}

impl SigningIdentity {
    /// Builds an identity directly from a raw secret (seed || public key),
    /// bypassing the keystore file — the dev/test-only `WALLET_SECRET_KEY*`
    /// environment path (§6).
    pub fn from_secret(secret: [u8; SECRET_LEN]) -> Self {
        let public_key = bs58::encode(&secret[32..64]).into_string();
        SigningIdentity {
            secret: Zeroizing::new(secret),
            public_key,
        }
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Exposed only within the crate: the WalletClient factory is the sole
    /// caller permitted to see the raw secret, and only to seal it inside
    /// its own private scope.
    pub(crate) fn secret_bytes(&self) -> &[u8; SECRET_LEN] {
        &self.secret
    }
}

impl std::fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct KdfParams {
    #[serde(rename = "N")]
    n: u64,
    r: u32,
    p: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct EncryptedPayload {
    ciphertext: String, // hex
    iv: String,         // hex, 32 chars
    tag: String,        // hex, 32 chars
    salt: String,       // hex, 64 chars
    algorithm: String,
    kdf: String,
    #[serde(rename = "kdfParams")]
    kdf_params: KdfParams,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KeystoreRecord {
    pub version: u32,
    #[serde(rename = "publicKey")]
    pub public_key: String,
    pub encrypted: EncryptedPayload,
}

fn derive_key(passphrase: &str, salt: &[u8], params: &KdfParams) -> Result<Zeroizing<[u8; 32]>> {
    let scrypt_params = ScryptParams::new(
        params.n.trailing_zeros() as u8,
        params.r,
        params.p,
        32,
    )
    .map_err(|e| Error::InvalidKeystore(format!("bad kdf parameters: {e}")))?;
    let mut key = Zeroizing::new([0u8; 32]);
    scrypt::scrypt(passphrase.as_bytes(), salt, &scrypt_params, key.as_mut())
        .map_err(|e| Error::InvalidKeystore(format!("kdf failed: {e}")))?;
    Ok(key)
}

/// Creates a new keystore record for `secret` (64 bytes: seed || public
/// key), encrypted under `passphrase`, and writes it to `path` with
/// owner-only permissions. Zeroes the plaintext secret, derived key, and
/// salt before returning.
pub fn create(secret: [u8; SECRET_LEN], passphrase: &str, path: &std::path::Path) -> Result<KeystoreRecord> {
    if passphrase.chars().count() < MIN_PASSPHRASE_LEN {
        return Err(Error::InvalidConfig(format!(
            "passphrase must be at least {MIN_PASSPHRASE_LEN} characters"
        )));
    }
    let mut plaintext = Zeroizing::new(secret);
    let public_key = bs58::encode(&plaintext[32..64]).into_string();

    let mut salt = Zeroizing::new([0u8; SALT_LEN]);
    OsRng.fill_bytes(salt.as_mut());
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    let kdf_params = KdfParams {
        n: 1u64 << DEFAULT_LOG_N,
        r: DEFAULT_R,
        p: DEFAULT_P,
    };
    let derived = derive_key(passphrase, salt.as_ref(), &kdf_params)?;

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(derived.as_ref()));
    let nonce = Nonce::from_slice(&iv);
    let ciphertext_and_tag = cipher
        .encrypt(nonce, plaintext.as_ref())
        .map_err(|e| Error::InvalidKeystore(format!("encryption failed: {e}")))?;
    plaintext.zeroize();

    let tag_start = ciphertext_and_tag.len() - TAG_LEN;
    let (ciphertext, tag) = ciphertext_and_tag.split_at(tag_start);

    let record = KeystoreRecord {
        version: SCHEMA_VERSION,
        public_key: public_key.clone(),
        encrypted: EncryptedPayload {
            ciphertext: hex::encode(ciphertext),
            iv: hex::encode(iv),
            tag: hex::encode(tag),
            salt: hex::encode(salt.as_ref()),
            algorithm: "AES-256-GCM".to_string(),
            kdf: "scrypt".to_string(),
            kdf_params,
        },
    };

    let json = serde_json::to_string_pretty(&record)
        .map_err(|e| Error::InvalidKeystore(format!("serialization failed: {e}")))?;
    std::fs::write(path, json).map_err(|e| Error::InvalidKeystore(format!("write failed: {e}")))?;
    set_owner_only_permissions(path)?;

    Ok(record)
}

#[cfg(unix)]
fn set_owner_only_permissions(path: &std::path::Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let perms = std::fs::Permissions::from_mode(0o600);
    std::fs::set_permissions(path, perms)
        .map_err(|e| Error::InvalidKeystore(format!("chmod failed: {e}")))
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_path: &std::path::Path) -> Result<()> {
    Ok(())
}

/// Opens a keystore file with `passphrase`, returning a [`SigningIdentity`].
/// Wrong passphrase and tampered ciphertext fail with the identical
/// `invalidKeystore` message — there is no oracle for distinguishing them.
pub fn open(path: &std::path::Path, passphrase: &str) -> Result<SigningIdentity> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| Error::InvalidKeystore(format!("read failed: {e}")))?;
    let record: KeystoreRecord = serde_json::from_str(&contents)
        .map_err(|_| Error::InvalidKeystore("corrupted".to_string()))?;

    if record.version != SCHEMA_VERSION {
        return Err(Error::InvalidKeystore("corrupted".to_string()));
    }

    let iv = hex::decode(&record.encrypted.iv).map_err(|_| Error::InvalidKeystore("corrupted".to_string()))?;
    let tag = hex::decode(&record.encrypted.tag).map_err(|_| Error::InvalidKeystore("corrupted".to_string()))?;
    let mut salt = hex::decode(&record.encrypted.salt).map_err(|_| Error::InvalidKeystore("corrupted".to_string()))?;
    let ciphertext =
        hex::decode(&record.encrypted.ciphertext).map_err(|_| Error::InvalidKeystore("corrupted".to_string()))?;

    if iv.len() != IV_LEN || tag.len() != TAG_LEN || salt.len() != SALT_LEN {
        salt.zeroize();
        return Err(Error::InvalidKeystore("corrupted".to_string()));
    }

    let derive_result = derive_key(passphrase, &salt, &record.encrypted.kdf_params);
    salt.zeroize();
    let derived = derive_result?;

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(derived.as_ref()));
    let nonce = Nonce::from_slice(&iv);
    let mut combined = ciphertext;
    combined.extend_from_slice(&tag);

    let plaintext = cipher
        .decrypt(nonce, combined.as_slice())
        .map_err(|_| Error::InvalidKeystore("wrong password or tampered".to_string()))?;
    let mut plaintext = Zeroizing::new(plaintext);

    if plaintext.len() != SECRET_LEN {
        plaintext.zeroize();
        return Err(Error::InvalidKeystore("corrupted".to_string()));
    }

    let recovered_pubkey = bs58::encode(&plaintext[32..64]).into_string();
    if recovered_pubkey != record.public_key {
        plaintext.zeroize();
        return Err(Error::InvalidKeystore("corrupted".to_string()));
    }

    let mut secret = Zeroizing::new([0u8; SECRET_LEN]);
    secret.copy_from_slice(plaintext.as_ref());
    plaintext.zeroize();

    Ok(SigningIdentity {
        secret,
        public_key: record.public_key,
    })
}

/// Reads only the public identifier from a keystore file, without
/// decrypting anything.
pub fn peek_public(path: &std::path::Path) -> Result<String> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| Error::InvalidKeystore(format!("read failed: {e}")))?;
    let record: KeystoreRecord = serde_json::from_str(&contents)
        .map_err(|_| Error::InvalidKeystore("corrupted".to_string()))?;
    Ok(record.public_key)
}

/// Dev/test-only import of a raw secret from an environment value. Tries
/// base58 first, falling back to a JSON byte array on parse failure — the
/// order preserved verbatim per the documented open question. MUST fail in
/// production.
pub fn load_secret_from_env(raw: &str, is_production: bool) -> Result<[u8; SECRET_LEN]> {
    if is_production {
        return Err(Error::InvalidConfig(
            "refusing to load a raw secret key in production".to_string(),
        ));
    }
    if let Ok(bytes) = bs58::decode(raw).into_vec() {
        if let Ok(arr) = <[u8; SECRET_LEN]>::try_from(bytes.as_slice()) {
            return Ok(arr);
        }
    }
    let bytes: Vec<u8> = serde_json::from_str(raw)
        .map_err(|_| Error::InvalidConfig("secret key is neither valid base58 nor a JSON byte array".to_string()))?;
    <[u8; SECRET_LEN]>::try_from(bytes.as_slice())
        .map_err(|_| Error::InvalidConfig(format!("secret key must be exactly {SECRET_LEN} bytes")))
}
