//! Master key-material wrapper.
//!
//! The vault's master key is whatever the user supplied — a password or
//! a generated token.  Symmetric keys are re-derived from it per blob,
//! so this wrapper only has to hold the raw material and wipe it when
//! dropped.

use zeroize::{Zeroize, Zeroizing};

/// Master key material that zeroes its memory on drop.
pub struct MasterKey {
    material: Zeroizing<Vec<u8>>,
}

impl MasterKey {
    /// Wrap raw key material.
    pub fn new(material: Vec<u8>) -> Self {
        Self {
            material: Zeroizing::new(material),
        }
    }

    /// Access the raw key material (fed into PBKDF2 per entry).
    pub fn as_bytes(&self) -> &[u8] {
        &self.material
    }
}

impl From<&str> for MasterKey {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes().to_vec())
    }
}

impl Zeroize for MasterKey {
    fn zeroize(&mut self) {
        self.material.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_material() {
        let key = MasterKey::from("hunter2hunter2");
        assert_eq!(key.as_bytes(), b"hunter2hunter2");
    }
}
