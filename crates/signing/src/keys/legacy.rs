use std::path::Path;

use cbc::cipher::{BlockDecryptMut, KeyIvInit, block_padding::Pkcs7};
use md5::{Digest, Md5};
use zeroize::Zeroizing;

use super::pem::EncryptionHeaders;
use crate::error::{Result, SigningError};

/// Wipes its key schedule and chaining block on drop.
type TdesCbcDecryptor = cbc::Decryptor<des::TdesEde3>;

const PROC_TYPE_ENCRYPTED: &str = "4,ENCRYPTED";
const DES_EDE3_CBC: &str = "DES-EDE3-CBC";
const TDES_KEY_LEN: usize = 24;
const TDES_IV_LEN: usize = 8;
const MD5_LEN: usize = 16;

/// OpenSSL `EVP_BytesToKey` with MD5 and a single iteration:
///
/// ```text
/// D1 = MD5(passphrase || salt)
/// Dn = MD5(Dn-1 || passphrase || salt)
/// ```
///
/// Runs `ceil(key_len / 16)` rounds and truncates to `key_len` bytes.
pub fn derive_key(passphrase: &[u8], salt: &[u8], key_len: usize) -> Zeroizing<Vec<u8>> {
    let rounds = key_len.div_ceil(MD5_LEN);
    let mut material = Zeroizing::new(Vec::with_capacity(rounds * MD5_LEN));
    let mut previous: Zeroizing<[u8; MD5_LEN]> = Zeroizing::new([0; MD5_LEN]);

    for round in 0..rounds {
        let mut hasher = Md5::new();
        if round > 0 {
            hasher.update(previous.as_slice());
        }
        hasher.update(passphrase);
        hasher.update(salt);
        *previous = hasher.finalize().into();
        material.extend_from_slice(previous.as_slice());
    }

    material.truncate(key_len);
    material
}

/// Parses `DEK-Info: DES-EDE3-CBC,<hex>` into the 8-byte IV, which doubles as
/// the KDF salt.
fn parse_dek_info(path: &Path, headers: &EncryptionHeaders) -> Result<[u8; TDES_IV_LEN]> {
    if headers.proc_type != PROC_TYPE_ENCRYPTED {
        return Err(SigningError::key_decryption(
            path,
            format!("unsupported Proc-Type {}", headers.proc_type),
        ));
    }

    let dek_info = headers
        .dek_info
        .as_deref()
        .ok_or_else(|| SigningError::key_decryption(path, "missing DEK-Info header"))?;
    let (cipher, salt_hex) = dek_info
        .split_once(',')
        .ok_or_else(|| SigningError::key_decryption(path, "malformed DEK-Info header"))?;
    if cipher.trim() != DES_EDE3_CBC {
        return Err(SigningError::key_decryption(
            path,
            format!("unsupported PEM cipher {}", cipher.trim()),
        ));
    }

    let salt = hex::decode(salt_hex.trim())
        .map_err(|e| SigningError::key_decryption(path, format!("invalid DEK-Info salt: {e}")))?;
    salt.try_into().map_err(|salt: Vec<u8>| {
        SigningError::key_decryption(
            path,
            format!("DEK-Info salt must be {TDES_IV_LEN} bytes, got {}", salt.len()),
        )
    })
}

/// Decrypts a legacy OpenSSL encrypted PEM body into plaintext DER.
pub(crate) fn decrypt(
    path: &Path,
    headers: &EncryptionHeaders,
    ciphertext: &[u8],
    passphrase: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let salt = parse_dek_info(path, headers)?;
    let key = derive_key(passphrase, &salt, TDES_KEY_LEN);

    let decryptor = TdesCbcDecryptor::new_from_slices(&key, &salt)
        .map_err(|e| SigningError::key_decryption(path, e.to_string()))?;
    let mut buffer = Zeroizing::new(ciphertext.to_vec());
    let plaintext_len = decryptor
        .decrypt_padded_mut::<Pkcs7>(&mut buffer)
        .map_err(|_| SigningError::key_decryption(path, "bad padding, wrong passphrase?"))?
        .len();
    buffer.truncate(plaintext_len);
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decryptor_zeroizes_on_drop() {
        fn assert_zeroize_on_drop<T: zeroize::ZeroizeOnDrop>() {}
        assert_zeroize_on_drop::<TdesCbcDecryptor>();
    }

    fn headers(dek_info: &str) -> EncryptionHeaders {
        EncryptionHeaders {
            proc_type: PROC_TYPE_ENCRYPTED.to_string(),
            dek_info: Some(dek_info.to_string()),
        }
    }

    #[test]
    fn derives_openssl_key() {
        // openssl rsa -des3 -passout pass:test-passphrase, salt from the fixture
        let salt = hex::decode("E0CC98DFC8068236").unwrap();
        let key = derive_key(b"test-passphrase", &salt, TDES_KEY_LEN);
        assert_eq!(
            hex::encode(key.as_slice()),
            "524c2ca4cfb27fb977e183abf797b05c6eb5dad841247970"
        );
    }

    #[test]
    fn round_count_follows_key_length() {
        let salt = [7u8; 8];
        let short = derive_key(b"pw", &salt, 16);
        let long = derive_key(b"pw", &salt, 40);
        assert_eq!(short.len(), 16);
        assert_eq!(long.len(), 40);
        assert_eq!(&long[..16], short.as_slice());
        assert_eq!(&long[..24], derive_key(b"pw", &salt, 24).as_slice());
    }

    #[test]
    fn rejects_other_ciphers() {
        let err = parse_dek_info(Path::new("k.pem"), &headers("AES-128-CBC,00112233445566778899AABBCCDDEEFF"))
            .unwrap_err();
        assert!(err.to_string().contains("AES-128-CBC"));
    }

    #[test]
    fn rejects_short_salt() {
        let err = parse_dek_info(Path::new("k.pem"), &headers("DES-EDE3-CBC,0011")).unwrap_err();
        assert!(matches!(err, SigningError::KeyDecryption { .. }));
    }

    #[test]
    fn rejects_non_hex_salt() {
        let err = parse_dek_info(Path::new("k.pem"), &headers("DES-EDE3-CBC,ZZZZZZZZZZZZZZZZ")).unwrap_err();
        assert!(matches!(err, SigningError::KeyDecryption { .. }));
    }

    #[test]
    fn rejects_unencrypted_proc_type() {
        let headers = EncryptionHeaders {
            proc_type: "4,MIC-ONLY".to_string(),
            dek_info: None,
        };
        assert!(matches!(
            parse_dek_info(Path::new("k.pem"), &headers),
            Err(SigningError::KeyDecryption { .. })
        ));
    }

    #[test]
    fn ciphertext_not_block_aligned_fails() {
        let err = decrypt(
            Path::new("k.pem"),
            &headers("DES-EDE3-CBC,E0CC98DFC8068236"),
            &[0u8; 13],
            b"pw",
        )
        .unwrap_err();
        assert!(matches!(err, SigningError::KeyDecryption { .. }));
    }
}
