//! ChaCha20-Poly1305 authenticated encryption (RFC 8439).
//!
//! The composition is assembled here from the `chacha20` and `poly1305`
//! primitive crates: block counter 0 of the keystream yields the 32-byte
//! Poly1305 one-time key, data encryption begins at counter 1, and the
//! MAC absorbs the associated data and ciphertext (each zero-padded to a
//! 16-byte boundary) followed by a trailer of little-endian 64-bit byte
//! counts. Tag comparison is constant-time and the one-time key is wiped
//! after use.
//!
//! Encryption and decryption operate in place: payload staging buffers
//! on embedded nodes are fixed and reused, so the caller keeps ownership
//! of the single buffer throughout.

use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20::{ChaCha20, Key, Nonce};
use poly1305::universal_hash::{KeyInit, UniversalHash};
use poly1305::Poly1305;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use meshstatic_core::types::Address;

use crate::error::CryptoError;

pub const KEY_SIZE: usize = 32;
pub const NONCE_SIZE: usize = 12;
pub const TAG_SIZE: usize = 16;

/// Encrypt `buf` in place and return the authentication tag.
///
/// `aad` is authenticated but not encrypted.
pub fn seal(key: &[u8; KEY_SIZE], nonce: &[u8; NONCE_SIZE], aad: &[u8], buf: &mut [u8]) -> [u8; TAG_SIZE] {
    let mut cipher = ChaCha20::new(Key::from_slice(key), Nonce::from_slice(nonce));

    // Block 0 of the keystream is the Poly1305 one-time key; consuming
    // it advances the cipher to block 1, where data encryption starts.
    let mut otk = [0u8; 64];
    cipher.apply_keystream(&mut otk);
    cipher.apply_keystream(buf);

    let tag = compute_tag(&otk[..KEY_SIZE], aad, buf);
    otk.zeroize();
    tag
}

/// Verify the tag and decrypt `buf` in place.
///
/// The tag is checked in constant time before any decryption happens;
/// on mismatch the buffer still holds the ciphertext and
/// [`CryptoError::AuthFailure`] is returned.
pub fn open(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    aad: &[u8],
    buf: &mut [u8],
    tag: &[u8; TAG_SIZE],
) -> Result<(), CryptoError> {
    let mut cipher = ChaCha20::new(Key::from_slice(key), Nonce::from_slice(nonce));

    let mut otk = [0u8; 64];
    cipher.apply_keystream(&mut otk);

    let mut expected = compute_tag(&otk[..KEY_SIZE], aad, buf);
    otk.zeroize();

    let ok: bool = expected[..].ct_eq(&tag[..]).into();
    expected.zeroize();
    if !ok {
        return Err(CryptoError::AuthFailure);
    }

    cipher.apply_keystream(buf);
    Ok(())
}

/// Derive the per-packet nonce from the packet id and source address.
///
/// Layout: big-endian packet id, the 6-byte source address, two zero
/// bytes. Uniqueness of (src, packet_id) within a session is the
/// sender's contract.
#[must_use]
pub fn packet_nonce(packet_id: u32, src: &Address) -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    nonce[0..4].copy_from_slice(&packet_id.to_be_bytes());
    nonce[4..10].copy_from_slice(src.as_ref());
    nonce
}

fn compute_tag(otk: &[u8], aad: &[u8], ciphertext: &[u8]) -> [u8; TAG_SIZE] {
    let mut mac = Poly1305::new(poly1305::Key::from_slice(otk));
    mac.update_padded(aad);
    mac.update_padded(ciphertext);

    let mut trailer = poly1305::Block::default();
    trailer[0..8].copy_from_slice(&(aad.len() as u64).to_le_bytes());
    trailer[8..16].copy_from_slice(&(ciphertext.len() as u64).to_le_bytes());
    mac.update(core::slice::from_ref(&trailer));

    let full = mac.finalize();
    let mut tag = [0u8; TAG_SIZE];
    tag.copy_from_slice(&full);
    tag
}

#[cfg(test)]
mod tests {
    extern crate alloc;
    use alloc::vec::Vec;

    use super::*;

    // RFC 8439 section 2.8.2.
    const RFC_KEY: &str = "808182838485868788898a8b8c8d8e8f909192939495969798999a9b9c9d9e9f";
    const RFC_NONCE: &str = "070000004041424344454647";
    const RFC_AAD: &str = "50515253c0c1c2c3c4c5c6c7";
    const RFC_PLAINTEXT: &[u8] = b"Ladies and Gentlemen of the class of '99: \
If I could offer you only one tip for the future, sunscreen would be it.";
    const RFC_CIPHERTEXT: &str = "d31a8d34648e60db7b86afbc53ef7ec2\
a4aded51296e08fea9e2b5a736ee62d6\
3dbea45e8ca9671282fafb69da92728b\
1a71de0a9e060b2905d6a5b67ecd3b36\
92ddbd7f2d778b8c9803aee328091b58\
fab324e4fad675945585808b4831d7bc\
3ff4def08e4b7a9de576d26586cec64b\
6116";
    const RFC_TAG: &str = "1ae10b594f09e26a7e902ecbd0600691";

    fn rfc_key() -> [u8; 32] {
        hex::decode(RFC_KEY).unwrap().try_into().unwrap()
    }

    fn rfc_nonce() -> [u8; 12] {
        hex::decode(RFC_NONCE).unwrap().try_into().unwrap()
    }

    #[test]
    fn test_rfc8439_seal_vector() {
        let aad = hex::decode(RFC_AAD).unwrap();
        let mut buf = RFC_PLAINTEXT.to_vec();

        let tag = seal(&rfc_key(), &rfc_nonce(), &aad, &mut buf);

        assert_eq!(hex::encode(&buf), RFC_CIPHERTEXT);
        assert_eq!(hex::encode(tag), RFC_TAG);
    }

    #[test]
    fn test_rfc8439_open_vector() {
        let aad = hex::decode(RFC_AAD).unwrap();
        let mut buf = hex::decode(RFC_CIPHERTEXT).unwrap();
        let tag: [u8; 16] = hex::decode(RFC_TAG).unwrap().try_into().unwrap();

        open(&rfc_key(), &rfc_nonce(), &aad, &mut buf, &tag).unwrap();
        assert_eq!(buf, RFC_PLAINTEXT);
    }

    #[test]
    fn test_tampered_ciphertext_fails_and_leaves_buffer() {
        let aad = hex::decode(RFC_AAD).unwrap();
        let mut buf = hex::decode(RFC_CIPHERTEXT).unwrap();
        let tag: [u8; 16] = hex::decode(RFC_TAG).unwrap().try_into().unwrap();

        buf[10] ^= 0x01;
        let before = buf.clone();
        let result = open(&rfc_key(), &rfc_nonce(), &aad, &mut buf, &tag);
        assert_eq!(result, Err(CryptoError::AuthFailure));
        assert_eq!(buf, before, "buffer must stay ciphertext on failure");
    }

    #[test]
    fn test_tampered_tag_fails_every_bit_of_last_byte() {
        let aad = hex::decode(RFC_AAD).unwrap();
        let ciphertext = hex::decode(RFC_CIPHERTEXT).unwrap();
        let tag: [u8; 16] = hex::decode(RFC_TAG).unwrap().try_into().unwrap();

        for bit in 0..8 {
            let mut bad_tag = tag;
            bad_tag[15] ^= 1 << bit;
            let mut buf = ciphertext.clone();
            assert_eq!(
                open(&rfc_key(), &rfc_nonce(), &aad, &mut buf, &bad_tag),
                Err(CryptoError::AuthFailure),
                "bit {bit} flip in tag must fail"
            );
        }
    }

    #[test]
    fn test_tampered_aad_fails() {
        let mut aad = hex::decode(RFC_AAD).unwrap();
        let mut buf = hex::decode(RFC_CIPHERTEXT).unwrap();
        let tag: [u8; 16] = hex::decode(RFC_TAG).unwrap().try_into().unwrap();

        aad[0] ^= 0x80;
        assert_eq!(
            open(&rfc_key(), &rfc_nonce(), &aad, &mut buf, &tag),
            Err(CryptoError::AuthFailure)
        );
    }

    #[test]
    fn test_empty_aad_and_empty_plaintext() {
        let key = [0x42u8; 32];
        let nonce = [7u8; 12];

        let mut empty: [u8; 0] = [];
        let tag = seal(&key, &nonce, &[], &mut empty);
        open(&key, &nonce, &[], &mut empty, &tag).unwrap();

        // Tag still depends on the AAD even with no plaintext.
        let mut empty2: [u8; 0] = [];
        let tag2 = seal(&key, &nonce, b"header", &mut empty2);
        assert_ne!(tag, tag2);
    }

    #[test]
    fn test_roundtrip_various_sizes() {
        let key = [0x55u8; 32];
        let nonce = [0x0Au8; 12];
        let aad = [0xC0u8; 30];

        for size in [1usize, 15, 16, 17, 63, 64, 65, 164, 180] {
            let plaintext: Vec<u8> = (0..size).map(|i| i as u8).collect();
            let mut buf = plaintext.clone();
            let tag = seal(&key, &nonce, &aad, &mut buf);
            assert_ne!(buf, plaintext, "size {size} must actually encrypt");
            open(&key, &nonce, &aad, &mut buf, &tag).unwrap();
            assert_eq!(buf, plaintext, "size {size} roundtrip");
        }
    }

    #[test]
    fn test_wrong_key_fails() {
        let key = [0x11u8; 32];
        let other = [0x12u8; 32];
        let nonce = [0u8; 12];
        let mut buf = *b"payload bytes";
        let tag = seal(&key, &nonce, &[], &mut buf);
        assert_eq!(
            open(&other, &nonce, &[], &mut buf, &tag),
            Err(CryptoError::AuthFailure)
        );
    }

    #[test]
    fn test_packet_nonce_layout() {
        let src = Address::new([0x02, 0xAA, 0xBB, 0xCC, 0xDD, 0x01]);
        let nonce = packet_nonce(0x01020304, &src);
        assert_eq!(
            nonce,
            [0x01, 0x02, 0x03, 0x04, 0x02, 0xAA, 0xBB, 0xCC, 0xDD, 0x01, 0x00, 0x00]
        );
    }

    #[test]
    fn test_packet_nonce_distinct_per_source_and_id() {
        let a = Address::new([0x02, 0, 0, 0, 0, 0x01]);
        let b = Address::new([0x02, 0, 0, 0, 0, 0x02]);
        assert_ne!(packet_nonce(1, &a), packet_nonce(2, &a));
        assert_ne!(packet_nonce(1, &a), packet_nonce(1, &b));
    }
}

#[cfg(test)]
mod proptests {
    extern crate alloc;
    use alloc::vec::Vec;

    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn seal_open_roundtrip(
            key in any::<[u8; 32]>(),
            nonce in any::<[u8; 12]>(),
            aad in proptest::collection::vec(any::<u8>(), 0..64),
            plaintext in proptest::collection::vec(any::<u8>(), 0..256),
        ) {
            let mut buf = plaintext.clone();
            let tag = seal(&key, &nonce, &aad, &mut buf);
            open(&key, &nonce, &aad, &mut buf, &tag).unwrap();
            prop_assert_eq!(&buf, &plaintext);
        }

        #[test]
        fn single_bit_flip_anywhere_fails(
            key in any::<[u8; 32]>(),
            nonce in any::<[u8; 12]>(),
            plaintext in proptest::collection::vec(any::<u8>(), 1..128),
            flip_byte in any::<prop::sample::Index>(),
            flip_bit in 0u8..8,
        ) {
            let aad = [0xA5u8; 12];
            let mut buf = plaintext;
            let tag = seal(&key, &nonce, &aad, &mut buf);

            let idx = flip_byte.index(buf.len());
            buf[idx] ^= 1 << flip_bit;
            let result = open(&key, &nonce, &aad, &mut buf, &tag);
            prop_assert_eq!(result, Err(CryptoError::AuthFailure));
        }

        #[test]
        fn tag_depends_on_nonce(
            key in any::<[u8; 32]>(),
            nonce_a in any::<[u8; 12]>(),
            nonce_b in any::<[u8; 12]>(),
            plaintext in proptest::collection::vec(any::<u8>(), 1..64),
        ) {
            prop_assume!(nonce_a != nonce_b);
            let mut buf_a = plaintext.clone();
            let mut buf_b: Vec<u8> = plaintext;
            let tag_a = seal(&key, &nonce_a, &[], &mut buf_a);
            let tag_b = seal(&key, &nonce_b, &[], &mut buf_b);
            prop_assert_ne!(tag_a, tag_b);
        }
    }
}
