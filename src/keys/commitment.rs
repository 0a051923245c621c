use bitcoin::hashes::sha256::Hash as Sha256;
use bitcoin::hashes::{Hash, HashEngine};
use bitcoin::secp256k1::{All, PublicKey, Scalar, Secp256k1, SecretKey};

use crate::types::CommitmentKeys;

/// SHA256(a || b) as a curve scalar.
fn tweak_scalar(a: &PublicKey, b: &PublicKey) -> Scalar {
    let mut engine = Sha256::engine();
    engine.input(&a.serialize());
    engine.input(&b.serialize());
    let hash = Sha256::from_engine(engine).to_byte_array();
    Scalar::from_be_bytes(hash).expect("hash outputs are valid scalars unless SHA-256 is broken")
}

/// `basepoint + SHA256(per_commitment_point || basepoint) * G`.
pub fn derive_public_key(
    basepoint: &PublicKey,
    per_commitment_point: &PublicKey,
    secp_ctx: &Secp256k1<All>,
) -> PublicKey {
    let tweak = tweak_scalar(per_commitment_point, basepoint);
    let hashkey = PublicKey::from_secret_key(
        secp_ctx,
        &SecretKey::from_slice(&tweak.to_be_bytes())
            .expect("hash outputs are valid secret keys unless SHA-256 is broken"),
    );
    basepoint.combine(&hashkey).expect(
        "addition only fails when the tweak is the inverse of the key, \
         impossible when the tweak commits to the key itself",
    )
}

/// Secret-key counterpart of [`derive_public_key`].
pub fn derive_private_key(
    basepoint_secret: &SecretKey,
    per_commitment_point: &PublicKey,
    secp_ctx: &Secp256k1<All>,
) -> SecretKey {
    let basepoint = PublicKey::from_secret_key(secp_ctx, basepoint_secret);
    let tweak = tweak_scalar(per_commitment_point, &basepoint);
    (*basepoint_secret).add_tweak(&tweak).expect(
        "addition only fails when the tweak is the inverse of the key, \
         impossible when the tweak commits to the key itself",
    )
}

/// `revocation_basepoint * SHA256(revocation_basepoint || per_commitment_point)
///  + per_commitment_point * SHA256(per_commitment_point || revocation_basepoint)`.
///
/// Neither party alone knows the discrete log of the result; the holder of
/// the revocation basepoint secret learns it once the per-commitment secret
/// is revealed.
pub fn derive_revocation_public_key(
    revocation_basepoint: &PublicKey,
    per_commitment_point: &PublicKey,
    secp_ctx: &Secp256k1<All>,
) -> PublicKey {
    let component1 = revocation_basepoint
        .mul_tweak(
            secp_ctx,
            &tweak_scalar(revocation_basepoint, per_commitment_point),
        )
        .expect("valid tweak");

    let component2 = per_commitment_point
        .mul_tweak(
            secp_ctx,
            &tweak_scalar(per_commitment_point, revocation_basepoint),
        )
        .expect("valid tweak");

    component1.combine(&component2).expect("valid combination")
}

/// Secret-key counterpart of [`derive_revocation_public_key`], computable
/// only with both the revocation basepoint secret and the revealed
/// per-commitment secret.
pub fn derive_revocation_private_key(
    revocation_basepoint_secret: &SecretKey,
    per_commitment_secret: &SecretKey,
    secp_ctx: &Secp256k1<All>,
) -> SecretKey {
    let revocation_basepoint = PublicKey::from_secret_key(secp_ctx, revocation_basepoint_secret);
    let per_commitment_point = PublicKey::from_secret_key(secp_ctx, per_commitment_secret);

    let key1 = (*revocation_basepoint_secret)
        .mul_tweak(&tweak_scalar(&revocation_basepoint, &per_commitment_point))
        .expect("valid tweak");

    let key2 = (*per_commitment_secret)
        .mul_tweak(&tweak_scalar(&per_commitment_point, &revocation_basepoint))
        .expect("valid tweak");

    let key2_scalar =
        Scalar::from_be_bytes(key2.secret_bytes()).expect("secret keys are in scalar range");
    key1.add_tweak(&key2_scalar).expect("valid addition")
}

impl CommitmentKeys {
    /// Derives the key set for one commitment. "Owner" is the side whose
    /// commitment transaction is being built; the revocation key comes from
    /// the counterparty's basepoint so that they can punish the owner.
    pub fn from_basepoints(
        per_commitment_point: &PublicKey,
        owner_delayed_payment_basepoint: &PublicKey,
        owner_payment_basepoint: &PublicKey,
        counterparty_revocation_basepoint: &PublicKey,
        counterparty_payment_basepoint: &PublicKey,
        secp_ctx: &Secp256k1<All>,
    ) -> Self {
        let revocation_key = derive_revocation_public_key(
            counterparty_revocation_basepoint,
            per_commitment_point,
            secp_ctx,
        );

        let local_delayed_payment_key = derive_public_key(
            owner_delayed_payment_basepoint,
            per_commitment_point,
            secp_ctx,
        );

        // The payment basepoint doubles as the HTLC basepoint
        let local_htlc_key =
            derive_public_key(owner_payment_basepoint, per_commitment_point, secp_ctx);
        let remote_htlc_key =
            derive_public_key(counterparty_payment_basepoint, per_commitment_point, secp_ctx);

        Self {
            per_commitment_point: *per_commitment_point,
            revocation_key,
            local_htlc_key,
            remote_htlc_key,
            local_delayed_payment_key,
            remote_payment_key: remote_htlc_key,
        }
    }
}
