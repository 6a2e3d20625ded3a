//! Polynomial fingerprinting of shingles and short identifier strings.

/// Hash a string to a fingerprint in `[0, modulus)`.
///
/// Evaluates `sum(code(c_i) * base^(n-1-i)) mod modulus` over the character
/// code points via Horner's rule. Each multiply-add reduces through `u128`
/// intermediates, so the result is exact for any `base` and any modulus up to
/// 62 bits. Pure and stateless; safe to call from multiple threads.
pub fn fingerprint(s: &str, base: u64, modulus: u64) -> u64 {
    debug_assert!(modulus > 1);
    let mut h: u64 = 0;
    for ch in s.chars() {
        let code = ch as u64;
        h = ((u128::from(h) * u128::from(base) + u128::from(code)) % u128::from(modulus)) as u64;
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODULUS: u64 = 1 << 61;

    #[test]
    fn deterministic_for_identical_input() {
        let a = fingerprint("quick brown fox", 1_000_003, MODULUS);
        let b = fingerprint("quick brown fox", 1_000_003, MODULUS);
        assert_eq!(a, b);
    }

    #[test]
    fn stays_within_modulus() {
        let small = 1 << 8;
        for s in ["a", "zz", "some longer shingle text", "\u{1F600}"] {
            assert!(fingerprint(s, 257, small) < small);
        }
    }

    #[test]
    fn matches_naive_power_sum() {
        let base: u64 = 257;
        let modulus: u64 = 1 << 31;
        let s = "abc";
        let naive: u128 = s
            .chars()
            .rev()
            .enumerate()
            .map(|(i, c)| u128::from(c as u32) * u128::from(base).pow(i as u32))
            .sum();
        assert_eq!(
            fingerprint(s, base, modulus),
            (naive % u128::from(modulus)) as u64
        );
    }

    #[test]
    fn base_larger_than_modulus_still_reduces() {
        let modulus = 1 << 4;
        let h = fingerprint("wrap around", u64::MAX / 3, modulus);
        assert!(h < modulus);
    }

    #[test]
    fn empty_string_hashes_to_zero() {
        assert_eq!(fingerprint("", 31, MODULUS), 0);
    }
}
