//! `userPassword` hashes in the `{TYPE}base64` form.

use md5::Md5;
use rand::Rng as _;
use sha1::{Digest as _, Sha1};

use crate::base64;
use crate::error::{Error, Result};

const SALT_SIZE: usize = 4;
const SALT_CHARS: &[u8] = b"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

const MD5_SIZE: usize = 16;
const SHA1_SIZE: usize = 20;

/// `{MD5}` hash of `password`.
pub fn md5(password: &str) -> String {
    let mut result = String::from("{MD5}");
    base64::append_base64(&mut result, &Md5::digest(password.as_bytes()));
    result
}

/// `{SMD5}` hash of `password`.  A random salt is drawn when none is given.
pub fn smd5(password: &str, salt: Option<&[u8]>) -> Result<String> {
    let salt = checked_salt(salt)?;
    let mut hasher = Md5::new();
    hasher.update(password.as_bytes());
    hasher.update(&salt);
    Ok(salted("{SMD5}", &hasher.finalize(), &salt))
}

/// `{SHA}` hash of `password`.
pub fn sha(password: &str) -> String {
    let mut result = String::from("{SHA}");
    base64::append_base64(&mut result, &Sha1::digest(password.as_bytes()));
    result
}

/// `{SSHA}` hash of `password`.  A random salt is drawn when none is given.
pub fn ssha(password: &str, salt: Option<&[u8]>) -> Result<String> {
    let salt = checked_salt(salt)?;
    let mut hasher = Sha1::new();
    hasher.update(password.as_bytes());
    hasher.update(&salt);
    Ok(salted("{SSHA}", &hasher.finalize(), &salt))
}

/// Does `password` match `hashed`?  Values without a `{TYPE}` prefix are
/// compared as plain text.  A salted hash whose salt is missing or not
/// four bytes long never matches.
pub fn valid(password: &str, hashed: &str) -> Result<bool> {
    let Some((kind, encoded)) = split_hash_type(hashed) else {
        return Ok(password == hashed);
    };
    let rehashed = match kind.to_ascii_lowercase().as_str() {
        "md5" => md5(password),
        "sha" => sha(password),
        "smd5" => match extract_salt(encoded, MD5_SIZE) {
            Some(salt) => smd5(password, Some(&salt))?,
            None => return Ok(false),
        },
        "ssha" => match extract_salt(encoded, SHA1_SIZE) {
            Some(salt) => ssha(password, Some(&salt))?,
            None => return Ok(false),
        },
        _ => {
            return Err(Error::InvalidArgument(format!(
                "unknown hash type: {}",
                kind
            )))
        }
    };
    Ok(rehashed == hashed)
}

/// `{SSHA}abc` -> (`SSHA`, `abc`).  The type is an uppercase letter
/// followed by uppercase letters or digits.
fn split_hash_type(hashed: &str) -> Option<(&str, &str)> {
    let rest = hashed.strip_prefix('{')?;
    let (kind, encoded) = rest.split_once('}')?;
    let mut chars = kind.chars();
    let first = chars.next()?;
    if !first.is_ascii_uppercase()
        || kind.len() < 2
        || !chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return None;
    }
    Some((kind, encoded))
}

/// The bytes after the digest, or None unless there are exactly
/// `SALT_SIZE` of them.
fn extract_salt(encoded: &str, digest_size: usize) -> Option<Vec<u8>> {
    let decoded = base64::read_base64(encoded)?;
    let salt = decoded.get(digest_size..)?;
    if salt.len() != SALT_SIZE {
        return None;
    }
    Some(salt.to_vec())
}

fn checked_salt(salt: Option<&[u8]>) -> Result<Vec<u8>> {
    match salt {
        None => Ok(random_salt()),
        Some(salt) if salt.len() == SALT_SIZE => Ok(salt.to_vec()),
        Some(salt) => Err(Error::InvalidArgument(format!(
            "salt size must be == {}: {:?}",
            SALT_SIZE,
            String::from_utf8_lossy(salt)
        ))),
    }
}

fn salted(prefix: &str, digest: &[u8], salt: &[u8]) -> String {
    let mut combined = Vec::with_capacity(digest.len() + salt.len());
    combined.extend_from_slice(digest);
    combined.extend_from_slice(salt);
    let mut result = String::from(prefix);
    base64::append_base64(&mut result, &combined);
    result
}

fn random_salt() -> Vec<u8> {
    let mut rng = rand::rng();
    (0..SALT_SIZE)
        .map(|_| SALT_CHARS[rng.random_range(0..SALT_CHARS.len())])
        .collect()
}
