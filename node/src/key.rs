//! The network's proof-verification public key.

use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("empty key")]
    Empty,

    #[error("malformed PKCS#1 public key: {0}")]
    Malformed(String),
}

/// RSA public key published on chain, decoded from PKCS#1 DER.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationKey {
    der: Vec<u8>,
    key: RsaPublicKey,
}

impl VerificationKey {
    pub fn from_der(der: Vec<u8>) -> Result<Self, KeyError> {
        if der.is_empty() {
            return Err(KeyError::Empty);
        }
        let key = RsaPublicKey::from_pkcs1_der(&der)
            .map_err(|e| KeyError::Malformed(e.to_string()))?;
        Ok(Self { der, key })
    }

    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.key
    }

    /// Modulus length in bits.
    pub fn bits(&self) -> usize {
        self.key.size() * 8
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A 2048-bit RSA public key in PKCS#1 DER.
    pub(crate) const SAMPLE_PKCS1: &[u8] = &[
    0x30, 0x82, 0x01, 0x0a, 0x02, 0x82, 0x01, 0x01, 0x00, 0xa9, 0xc6, 0x70,
    0xf6, 0x79, 0x6d, 0x6d, 0xec, 0xf0, 0xb8, 0x40, 0x16, 0x41, 0xca, 0xc4,
    0x91, 0xfd, 0xb4, 0x8a, 0xad, 0x30, 0x8a, 0xb1, 0x6e, 0xbb, 0x7f, 0x5f,
    0xfa, 0x8f, 0x22, 0xe3, 0x15, 0x73, 0xc1, 0xf6, 0x22, 0x7b, 0x43, 0xb0,
    0x62, 0x73, 0xf1, 0x17, 0xcf, 0x66, 0x17, 0xf4, 0xa9, 0xdd, 0x86, 0xef,
    0x10, 0xad, 0xf1, 0xb6, 0x09, 0x71, 0x78, 0x93, 0x40, 0x45, 0xba, 0x1b,
    0x4d, 0x9d, 0x84, 0x79, 0x33, 0x92, 0x8a, 0xaf, 0xa7, 0x89, 0xbe, 0x3d,
    0xd9, 0x91, 0xdf, 0x7d, 0xd1, 0x1f, 0x00, 0x56, 0xae, 0xb0, 0xe4, 0xd1,
    0xbd, 0xee, 0x59, 0x18, 0xfa, 0xa2, 0x2f, 0x32, 0x76, 0x57, 0x9b, 0xf1,
    0xbc, 0x99, 0x24, 0xfb, 0xec, 0xbb, 0x71, 0xaf, 0xdd, 0x90, 0xd0, 0xf2,
    0xfe, 0x3e, 0x48, 0x7f, 0x36, 0x07, 0x47, 0x3f, 0x6a, 0x5e, 0x5d, 0xd3,
    0x45, 0xd4, 0x19, 0x62, 0x99, 0x8a, 0xb6, 0x32, 0xca, 0x6f, 0x07, 0x1b,
    0x69, 0xad, 0x3b, 0xb9, 0xf9, 0xae, 0xa4, 0x3b, 0xf4, 0x1e, 0xec, 0x2f,
    0x97, 0x2d, 0x19, 0x97, 0x28, 0x91, 0xa2, 0x71, 0x9d, 0x28, 0x38, 0x2c,
    0x3f, 0x1b, 0x75, 0xa5, 0xcf, 0x39, 0xce, 0xf7, 0x81, 0xc1, 0xa9, 0x00,
    0x52, 0x63, 0x30, 0x92, 0xf2, 0x17, 0x23, 0x2b, 0xf2, 0x81, 0xf9, 0xad,
    0xfd, 0x35, 0x57, 0xa9, 0x62, 0xf3, 0x5f, 0xdd, 0x5c, 0xfa, 0xa2, 0x9d,
    0x59, 0xcb, 0x6a, 0x2b, 0x4b, 0x79, 0xe5, 0xb9, 0xa0, 0x69, 0x5d, 0xf5,
    0x0c, 0xbf, 0x17, 0x0a, 0xfb, 0xe1, 0x6f, 0x95, 0xb8, 0xe0, 0x86, 0xd4,
    0x4f, 0x3b, 0x9d, 0x89, 0x25, 0xd3, 0x3d, 0x55, 0xa9, 0xfa, 0x16, 0x92,
    0x13, 0x68, 0x59, 0x82, 0xba, 0xe9, 0xb3, 0x23, 0xb0, 0x74, 0x39, 0x2f,
    0x62, 0xea, 0xb9, 0x40, 0xbb, 0x5c, 0xbf, 0x6e, 0x7f, 0xf0, 0x1d, 0xe8,
    0x53, 0x02, 0x03, 0x01, 0x00, 0x01,
    ];

    #[test]
    fn decodes_pkcs1_key() {
        let key = VerificationKey::from_der(SAMPLE_PKCS1.to_vec()).unwrap();
        assert_eq!(key.bits(), 2048);
        assert_eq!(key.as_der(), SAMPLE_PKCS1);
    }

    #[test]
    fn rejects_empty_key() {
        assert_eq!(VerificationKey::from_der(vec![]), Err(KeyError::Empty));
    }

    #[test]
    fn rejects_bare_sequences() {
        for der in [vec![0x30, 0x00], vec![0x30, 0x03, 0x02, 0x01, 0x01]] {
            assert!(matches!(
                VerificationKey::from_der(der),
                Err(KeyError::Malformed(_))
            ));
        }
    }

    #[test]
    fn rejects_truncated_key() {
        let truncated = SAMPLE_PKCS1[..SAMPLE_PKCS1.len() - 1].to_vec();
        assert!(VerificationKey::from_der(truncated).is_err());
    }
}
