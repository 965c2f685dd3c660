//! Randomness source abstraction.
//!
//! Every key, IV and off-chain share is drawn through [`Entropy`]. Production
//! code uses [`OsEntropy`]; tests plug in fixed or counter-based sources to
//! get reproducible ciphertexts.

/// Source of random bytes.
///
/// # Invariants
///
/// - Production implementations MUST be cryptographically secure. A general
///   purpose PRNG is never acceptable for keys, shares or IVs.
pub trait Entropy {
    /// Fills `buffer` completely with random bytes.
    fn fill_bytes(&self, buffer: &mut [u8]);

    /// Draws 16 random bytes.
    fn random_128(&self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        self.fill_bytes(&mut bytes);
        bytes
    }
}

impl<E: Entropy + ?Sized> Entropy for &E {
    fn fill_bytes(&self, buffer: &mut [u8]) {
        (**self).fill_bytes(buffer);
    }
}

/// OS cryptographic RNG (getrandom).
///
/// # Panics
///
/// Panics if the OS RNG fails. Continuing without working randomness would
/// produce predictable keys and reused IVs, so there is nothing sensible to
/// fall back to.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl Entropy for OsEntropy {
    #[allow(clippy::expect_used)]
    fn fill_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG failure is unrecoverable");
    }
}
