pub mod commitment;
pub mod derivation;
pub mod shachain;

// Re-export commonly used items
pub use commitment::{
    derive_private_key, derive_public_key, derive_revocation_private_key,
    derive_revocation_public_key,
};
pub use derivation::{
    build_commitment_secret, per_commitment_point, per_commitment_secret,
    INITIAL_COMMITMENT_NUMBER,
};
pub use shachain::{ShaChain, ShaChainError};
