use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;

use super::DkimError;

static DKIM_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^v=DKIM1;(?:h=(sha1|sha256);)?(?:k=(rsa);)?(?:t=([\w/]+);)?p=([A-Za-z0-9+/]+={0,2})$",
    )
    .expect("DKIM pattern compiles")
});

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DkimHash {
    Sha1,
    Sha256,
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DkimKeyType {
    Rsa,
}

/// A DKIM key record that passed validation.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DkimRecord {
    pub raw: String,
    pub hash_algorithm: Option<DkimHash>,
    pub key_type: Option<DkimKeyType>,
    pub flags: Option<String>,
    pub public_key: Vec<u8>,
}

impl DkimRecord {
    /// `t=y`: the domain is testing DKIM.
    pub fn is_testing(&self) -> bool {
        self.flags
            .as_deref()
            .map(|flags| flags.split('/').any(|flag| flag == "y"))
            .unwrap_or(false)
    }
}

/// Validates the fixed `v=DKIM1; [h=..;] [k=rsa;] [t=..;] p=<base64>` layout
/// and decodes the public key. Quotes and whitespace are ignored.
pub fn parse_dkim_record(raw: &str) -> Result<DkimRecord, DkimError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != '"' && !c.is_whitespace())
        .collect();

    let Some(caps) = DKIM_SHAPE.captures(&cleaned) else {
        return Err(if cleaned.contains("p=") {
            DkimError::Malformed
        } else {
            DkimError::MissingPublicKey
        });
    };

    let hash_algorithm = caps.get(1).map(|m| match m.as_str() {
        "sha1" => DkimHash::Sha1,
        _ => DkimHash::Sha256,
    });
    let key_type = caps.get(2).map(|_| DkimKeyType::Rsa);
    let flags = caps.get(3).map(|m| m.as_str().to_string());
    let encoded = caps.get(4).map(|m| m.as_str()).unwrap_or_default();

    let public_key = STANDARD
        .decode(encoded)
        .map_err(|source| DkimError::InvalidPublicKey { source })?;

    Ok(DkimRecord {
        raw: raw.to_string(),
        hash_algorithm,
        key_type,
        flags,
        public_key,
    })
}

pub fn validate_dkim_record(raw: &str) -> bool {
    parse_dkim_record(raw).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const KEY: &str = "MIGfMA0GCSqGSIb3DQEBAQUAA4GNADCBiQKBgQC";

    #[test]
    fn full_record_parses() {
        let raw = format!("\"v=DKIM1; h=sha256; k=rsa; t=y; p={KEY}\"");
        let record = parse_dkim_record(&raw).expect("valid record");
        assert_eq!(record.hash_algorithm, Some(DkimHash::Sha256));
        assert_eq!(record.key_type, Some(DkimKeyType::Rsa));
        assert!(record.is_testing());
        assert_eq!(record.public_key, STANDARD.decode(KEY).unwrap());
        assert_eq!(record.raw, raw);
    }

    #[test]
    fn minimal_record_parses() {
        let record = parse_dkim_record("v=DKIM1; p=QUJD").expect("valid record");
        assert_eq!(record.public_key, b"ABC");
        assert_eq!(record.hash_algorithm, None);
        assert!(!record.is_testing());
    }

    #[test]
    fn field_order_is_fixed() {
        let err = parse_dkim_record("v=DKIM1; k=rsa; h=sha256; p=QUJD").unwrap_err();
        assert_eq!(err, DkimError::Malformed);
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        assert_eq!(
            parse_dkim_record("v=DKIM1; p=QUJD; n=notes").unwrap_err(),
            DkimError::Malformed
        );
    }

    #[test]
    fn missing_key_is_reported() {
        assert_eq!(
            parse_dkim_record("v=DKIM1; k=rsa;").unwrap_err(),
            DkimError::MissingPublicKey
        );
    }

    #[test]
    fn bad_padding_is_a_rejection() {
        let err = parse_dkim_record("v=DKIM1; p=QUJDZ").unwrap_err();
        assert!(matches!(err, DkimError::InvalidPublicKey { .. }));
        assert!(!validate_dkim_record("v=DKIM1; p=A"));
    }

    proptest! {
        #[test]
        fn well_formed_payloads_validate(key in proptest::collection::vec(any::<u8>(), 1..256)) {
            let raw = format!("v=DKIM1; k=rsa; p={}", STANDARD.encode(&key));
            let record = parse_dkim_record(&raw).expect("valid record");
            prop_assert_eq!(record.public_key, key);
        }

        #[test]
        fn undecodable_payloads_fail(len in 0usize..64) {
            // 4n+1 base64 characters never decode
            let payload = "A".repeat(len * 4 + 1);
            let raw = format!("v=DKIM1; p={payload}");
            prop_assert!(!validate_dkim_record(&raw));
        }
    }
}
