/// XOR `payload` in place with the repeating 4-byte `mask_key`.
///
/// Masking is its own inverse, so this both masks and unmasks.
pub(crate) fn mask(payload: &mut [u8], mask_key: [u8; 4]) {
    let key = u32::from_ne_bytes(mask_key);
    let mut chunks = payload.chunks_exact_mut(4);
    for chunk in &mut chunks {
        let word = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) ^ key;
        chunk.copy_from_slice(&word.to_ne_bytes());
    }
    // tail < 4 bytes starts on a key boundary
    for (b, k) in chunks.into_remainder().iter_mut().zip(mask_key) {
        *b ^= k;
    }
}

#[cfg(test)]
mod tests {
    use proptest::{collection::vec, prelude::*};

    use super::*;

    #[test]
    fn rfc_example() {
        // RFC 6455 5.7, masked "Hello"
        let mut bytes = [0x7f, 0x9f, 0x4d, 0x51, 0x58];
        mask(&mut bytes, [0x37, 0xfa, 0x21, 0x3d]);
        assert_eq!(&bytes, b"Hello");
    }

    proptest! {
        #[test]
        fn matches_bytewise_xor(mut data in vec(any::<u8>(), 0..64), key in any::<[u8; 4]>()) {
            let expected: Vec<u8> = data.iter().enumerate().map(|(i, b)| b ^ key[i % 4]).collect();
            mask(&mut data, key);
            prop_assert_eq!(data, expected);
        }
    }
}
