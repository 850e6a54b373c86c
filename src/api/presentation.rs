//! Display helpers for project listings

use sha2::{Digest, Sha256};

/// Stable `#rrggbb` colour for a project identifier
pub fn color_for(seed: &str) -> String {
    let digest = Sha256::digest(seed.as_bytes());
    format!("#{}", hex::encode(&digest[..3]))
}
