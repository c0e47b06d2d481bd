//! Webhook 签名校验
//!
//! 签名格式为 `sha256=<hex>`，即以密钥为 key 对原始请求体做 HMAC-SHA256。

use crate::constants::webhook::SIGNATURE_PREFIX;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// 计算请求体的签名头
pub fn sign(raw_body: &[u8], secret: &str) -> String {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(raw_body);
    format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

/// 校验签名头，任何异常情况都返回 `false`
pub fn verify(raw_body: &[u8], signature_header: &str, secret: &str) -> bool {
    if secret.is_empty() || signature_header.is_empty() {
        return false;
    }

    let expected = sign(raw_body, secret);
    let provided = signature_header.trim();

    // 长度不同时 ct_eq 直接返回 false
    bool::from(expected.as_bytes().ct_eq(provided.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "It's a Secret to Everybody";
    const PAYLOAD: &[u8] = b"Hello, World!";

    #[test]
    fn test_known_vector() {
        // GitHub 文档中的示例
        assert_eq!(
            sign(PAYLOAD, SECRET),
            "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17"
        );
    }

    #[test]
    fn test_valid_signature_verifies() {
        let header = sign(PAYLOAD, SECRET);
        assert!(verify(PAYLOAD, &header, SECRET));
    }

    #[test]
    fn test_any_bit_flip_in_payload_fails() {
        let header = sign(PAYLOAD, SECRET);
        for byte in 0..PAYLOAD.len() {
            for bit in 0..8 {
                let mut mutated = PAYLOAD.to_vec();
                mutated[byte] ^= 1 << bit;
                assert!(!verify(&mutated, &header, SECRET), "byte {byte} bit {bit}");
            }
        }
    }

    #[test]
    fn test_any_bit_flip_in_secret_fails() {
        let header = sign(PAYLOAD, SECRET);
        for byte in 0..SECRET.len() {
            for bit in 0..7 {
                let mut mutated = SECRET.as_bytes().to_vec();
                mutated[byte] ^= 1 << bit;
                let mutated = String::from_utf8(mutated).unwrap();
                assert!(!verify(PAYLOAD, &header, &mutated), "byte {byte} bit {bit}");
            }
        }
    }

    #[test]
    fn test_empty_inputs_are_rejected() {
        let header = sign(PAYLOAD, SECRET);
        assert!(!verify(PAYLOAD, &header, ""));
        assert!(!verify(PAYLOAD, "", SECRET));
        assert!(!verify(PAYLOAD, "sha256=", SECRET));
        assert!(!verify(PAYLOAD, &header.replace("sha256=", "sha1="), SECRET));
    }
}
