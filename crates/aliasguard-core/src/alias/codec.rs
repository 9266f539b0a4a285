//! Alias generation and verification.

use aes::{Aes128, Aes192, Aes256};
use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockCipher, BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit};
use chrono::{NaiveDate, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::{debug, error, warn};

use super::{AliasError, ENCRYPTED_PART_LEN, MAX_LOCAL_PART, SharedKey, VerificationResult};
use crate::validation::{SyntaxReport, SyntaxValidator};

const BLOCK_LEN: usize = 16;
const IV_LEN: usize = 16;
const DATE_TOKEN_LEN: usize = 8;
const DIGEST_PREFIX_LEN: usize = 8;
const DATE_FORMAT: &str = "%Y%m%d";

/// Longest label kept in a tag, so the tag and filler still cover the IV.
const MAX_TAG_LABEL: usize = MAX_LOCAL_PART - ENCRYPTED_PART_LEN - 1;

/// Filler symbols. The repeated `3` is part of the issued format.
const RANDOM_ALPHABET: &[u8] = b"ABCDEF01234356789_";

/// Decodes with or without padding and ignores stray trailing bits.
///
/// 22 characters carry 132 bits for a 128-bit block, so the low four bits
/// of the last character are never checked. An alias whose last character
/// differs only in those bits opens to the same block and verifies.
const TOLERANT_URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// A freshly minted alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedAlias {
    /// Full address, `local@own_domain`.
    pub alias: String,
    /// Informational syntax check of the address; never blocks generation.
    pub syntax: SyntaxReport,
}

/// Mints and verifies aliases for one own domain.
///
/// Holds no mutable state and can be shared freely between workers.
#[derive(Debug, Clone)]
pub struct AliasCodec {
    key: SharedKey,
    own_domain: String,
}

impl AliasCodec {
    /// Creates a codec issuing aliases under `own_domain`.
    #[must_use]
    pub fn new(key: SharedKey, own_domain: impl Into<String>) -> Self {
        Self {
            key,
            own_domain: own_domain.into(),
        }
    }

    /// Mints an alias for `external_domain`, dated today (UTC).
    ///
    /// # Errors
    ///
    /// Returns an [`AliasError`] if `external_domain` has no second-level
    /// label usable as a tag.
    pub fn generate(&self, external_domain: &str) -> Result<GeneratedAlias, AliasError> {
        self.generate_on(external_domain, Utc::now().date_naive())
    }

    /// Mints an alias for `external_domain` carrying `date` as mint date.
    ///
    /// The address is run through the offline syntax check; resolving its
    /// domain is left to the caller.
    ///
    /// # Errors
    ///
    /// Returns an [`AliasError`] if `external_domain` has no usable
    /// second-level label or `date` does not fit eight digits.
    pub fn generate_on(
        &self,
        external_domain: &str,
        date: NaiveDate,
    ) -> Result<GeneratedAlias, AliasError> {
        let tag = domain_tag(external_domain)?;
        let date_token = date.format(DATE_FORMAT).to_string();
        let filler = random_filler(MAX_LOCAL_PART - ENCRYPTED_PART_LEN - tag.len());

        let signature = short_digest(&format!("{tag}{date_token}{filler}"));
        let mut block: [u8; BLOCK_LEN] = format!("{date_token}{signature}")
            .into_bytes()
            .try_into()
            .map_err(|_| AliasError::UnsupportedDate(date))?;

        let visible = format!("{tag}{filler}");
        encrypt(&self.key, &visible.as_bytes()[..IV_LEN], &mut block)?;

        let alias = format!(
            "{visible}{}@{}",
            URL_SAFE_NO_PAD.encode(block),
            self.own_domain
        );

        let syntax = SyntaxValidator.check(&alias);
        if let Err(e) = &syntax {
            error!(alias = %alias, error = %e, "Alias is not a valid email address");
        }

        Ok(GeneratedAlias { alias, syntax })
    }

    /// Checks an alias and recovers its mint date.
    ///
    /// Never fails: legacy, tampered, truncated or foreign-key aliases all
    /// come back with `signature_valid == false`.
    #[must_use]
    pub fn extract(&self, alias: &str) -> VerificationResult {
        match self.verify(alias) {
            Some(date) => VerificationResult::verified(alias, date),
            None => VerificationResult::rejected(alias),
        }
    }

    fn verify(&self, alias: &str) -> Option<NaiveDate> {
        let local = alias.split('@').next().unwrap_or_default();
        if !local.is_ascii() || local.len() <= ENCRYPTED_PART_LEN {
            debug!(alias, "Alias too short to carry a signature");
            return None;
        }

        let (visible, sealed) = local.split_at(local.len() - ENCRYPTED_PART_LEN);
        if sealed.contains('-') {
            debug!(alias, "Legacy alias format, cannot be verified");
            return None;
        }

        let Some(plaintext) = self.open(sealed, &local.as_bytes()[..IV_LEN]) else {
            warn!(
                alias,
                "Could not decrypt alias, check that the configured key is correct"
            );
            return None;
        };

        let (date_token, check_digest) = plaintext.split_at(DATE_TOKEN_LEN);
        let mut pieces = visible.split('-');
        let (Some(tag), Some(filler)) = (pieces.next(), pieces.next()) else {
            return None;
        };

        if short_digest(&format!("{tag}-{date_token}{filler}")) != check_digest {
            return None;
        }
        NaiveDate::parse_from_str(date_token, DATE_FORMAT).ok()
    }

    /// Base64-decodes and decrypts the sealed tail into its 16 ASCII chars.
    fn open(&self, sealed: &str, iv: &[u8]) -> Option<String> {
        let mut buf = TOLERANT_URL_SAFE.decode(auto_padded(sealed)).ok()?;
        if buf.is_empty() || buf.len() % BLOCK_LEN != 0 {
            return None;
        }

        let len = decrypt(&self.key, iv, &mut buf)?;
        buf.truncate(len);

        let plaintext = String::from_utf8(buf).ok()?;
        (plaintext.len() == BLOCK_LEN && plaintext.is_ascii()).then_some(plaintext)
    }
}

/// Second-to-last label of the domain plus `-`.
fn domain_tag(external_domain: &str) -> Result<String, AliasError> {
    let labels: Vec<&str> = external_domain.split('.').collect();
    if labels.len() < 2 {
        return Err(AliasError::MissingSecondLevelLabel(
            external_domain.to_string(),
        ));
    }

    let raw = labels[labels.len() - 2];
    // A dash inside the tag would make it ambiguous on the way back.
    let label: String = raw.chars().filter(|&c| c != '-').take(MAX_TAG_LABEL).collect();
    if label.is_empty() {
        return Err(AliasError::MissingSecondLevelLabel(
            external_domain.to_string(),
        ));
    }
    if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(AliasError::InvalidDomainLabel(raw.to_string()));
    }

    Ok(format!("{label}-"))
}

fn random_filler(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(RANDOM_ALPHABET[rng.gen_range(0..RANDOM_ALPHABET.len())]))
        .collect()
}

fn short_digest(input: &str) -> String {
    let mut hex = format!("{:x}", Sha256::digest(input.as_bytes()));
    hex.truncate(DIGEST_PREFIX_LEN);
    hex
}

/// Appends `==` or `=` following the `"=="[..3 - len % 3]` rule.
fn auto_padded(segment: &str) -> String {
    let padding = (3 - segment.len() % 3).min(2);
    format!("{segment}{}", "=".repeat(padding))
}

fn encrypt(key: &SharedKey, iv: &[u8], block: &mut [u8; BLOCK_LEN]) -> Result<(), AliasError> {
    match key.len() {
        16 => cbc_encrypt::<Aes128>(key.as_bytes(), iv, block),
        24 => cbc_encrypt::<Aes192>(key.as_bytes(), iv, block),
        32 => cbc_encrypt::<Aes256>(key.as_bytes(), iv, block),
        other => Err(AliasError::InvalidKeyLength(other)),
    }
}

fn cbc_encrypt<C>(key: &[u8], iv: &[u8], block: &mut [u8; BLOCK_LEN]) -> Result<(), AliasError>
where
    C: BlockEncryptMut + BlockCipher + KeyInit,
{
    let encryptor = cbc::Encryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| AliasError::InvalidKeyLength(key.len()))?;
    encryptor
        .encrypt_padded_mut::<NoPadding>(block, BLOCK_LEN)
        .map_err(|_| AliasError::Cipher)?;
    Ok(())
}

fn decrypt(key: &SharedKey, iv: &[u8], buf: &mut [u8]) -> Option<usize> {
    match key.len() {
        16 => cbc_decrypt::<Aes128>(key.as_bytes(), iv, buf),
        24 => cbc_decrypt::<Aes192>(key.as_bytes(), iv, buf),
        32 => cbc_decrypt::<Aes256>(key.as_bytes(), iv, buf),
        _ => None,
    }
}

fn cbc_decrypt<C>(key: &[u8], iv: &[u8], buf: &mut [u8]) -> Option<usize>
where
    C: BlockDecryptMut + BlockCipher + KeyInit,
{
    let decryptor = cbc::Decryptor::<C>::new_from_slices(key, iv).ok()?;
    decryptor
        .decrypt_padded_mut::<NoPadding>(buf)
        .ok()
        .map(<[u8]>::len)
}
