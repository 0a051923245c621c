use bitcoin::hashes::sha256::Hash as Sha256;
use bitcoin::hashes::Hash;

use super::{assert_balances_conserved, open_channel, sign_dance, FUNDING_MSAT};
use crate::channel::{CmdAddHtlc, CmdFailHtlc, CmdFulfillHtlc};
use crate::messages::UpdateMessage;
use crate::types::HtlcDirection;
use crate::*;

fn add_cmd(amount_msat: u64, payment_preimage: [u8; 32]) -> CmdAddHtlc {
    CmdAddHtlc {
        amount_msat,
        cltv_expiry: 500,
        payment_hash: Sha256::hash(&payment_preimage).to_byte_array(),
        onion_routing_packet: vec![],
    }
}

/// Number of occurrences of an update across the five pipeline lists.
fn pipeline_occurrences(commitments: &Commitments, update: &UpdateMessage) -> usize {
    [
        &commitments.local_changes.proposed,
        &commitments.local_changes.signed,
        &commitments.local_changes.acked,
        &commitments.remote_changes.proposed,
        &commitments.remote_changes.acked,
    ]
    .iter()
    .map(|list| list.iter().filter(|m| *m == update).count())
    .sum()
}

#[test]
fn test_add_sign_revoke_happy_path() {
    let channel = open_channel();
    let secp = &channel.secp;
    let preimage = [7u8; 32];

    // Alice offers one HTLC
    let (alice, add) = channel
        .alice
        .send_add(&add_cmd(1_000_000_000, preimage))
        .expect("funder can afford the htlc");
    assert_eq!(add.id, 1, "the first htlc gets id 1");
    assert_eq!(alice.local_current_htlc_id, 1);

    let bob = channel.bob.receive_add(add.clone()).expect("bob accepts");
    assert_eq!(bob.remote_current_htlc_id, 1);
    let update = UpdateMessage::Add(add);
    assert_eq!(pipeline_occurrences(&alice, &update), 1);
    assert_eq!(pipeline_occurrences(&bob, &update), 1);

    // Alice signs; one signature per untrimmed HTLC
    let (alice, commit_sig) = alice.send_commit(secp).expect("alice has changes");
    assert_eq!(commit_sig.htlc_signatures.len(), 1);
    assert!(alice.local_changes.proposed.is_empty());
    assert_eq!(alice.local_changes.signed.len(), 1);
    assert!(matches!(
        alice.remote_next_commit_info,
        RemoteNextCommitInfo::AwaitingRevocation(_)
    ));

    // Bob verifies and revokes his previous commitment
    let (bob, revocation) = bob
        .receive_commit(secp, &commit_sig)
        .expect("alice's signatures must verify");
    assert_eq!(bob.local_commit.index, 1);
    assert_eq!(
        revocation.per_commitment_secret,
        per_commitment_secret(&bob.local_params.sha_seed, 0),
        "the revocation reveals the secret of the replaced commitment"
    );
    assert_eq!(
        revocation.next_per_commitment_point,
        per_commitment_point(secp, &bob.local_params.sha_seed, 2),
    );
    assert_eq!(
        bob.local_commit.publishable_txs.htlc_success_txs.len(),
        1,
        "bob holds a signed claim for the incoming htlc"
    );
    let claim_tx = bob.local_commit.publishable_txs.htlc_success_txs[0].claim(preimage);
    assert_eq!(
        claim_tx.input[0].witness.len(),
        5,
        "the preimage completes the success witness"
    );
    assert_eq!(
        pipeline_occurrences(&bob, &update),
        1,
        "the add moved from proposed to acked, not duplicated"
    );

    // Alice absorbs the revocation
    let alice = alice
        .receive_revocation(secp, &revocation)
        .expect("genuine revocation");
    assert_eq!(alice.remote_commit.index, 1);
    assert!(matches!(
        alice.remote_next_commit_info,
        RemoteNextCommitInfo::Ready(_)
    ));
    assert!(alice.local_changes.signed.is_empty());
    assert_eq!(alice.local_changes.acked.len(), 1);
    assert_eq!(
        alice.remote_per_commitment_secrets.get_secret(u64::MAX),
        Some(per_commitment_secret(&bob.local_params.sha_seed, 0).secret_bytes()),
        "the revoked secret is stored for punishment"
    );

    assert_balances_conserved(&alice);
    assert_balances_conserved(&bob);

    // The reverse dance lands the HTLC in alice's own commitment too
    let (bob, alice) = sign_dance(secp, &bob, &alice);
    assert_eq!(alice.local_commit.index, 1);
    assert_eq!(
        alice.local_commit.publishable_txs.htlc_timeout_txs.len(),
        1,
        "alice holds a signed refund for the offered htlc"
    );
    assert_eq!(
        alice.local_commit.publishable_txs.htlc_timeout_txs[0].input[0]
            .witness
            .len(),
        5,
        "the stored timeout transaction is fully signed"
    );
    assert!(alice
        .local_commit
        .spec
        .find(HtlcDirection::Offered, 1)
        .is_some());
    assert!(bob
        .local_commit
        .spec
        .find(HtlcDirection::Received, 1)
        .is_some());
    assert_balances_conserved(&alice);
    assert_balances_conserved(&bob);
}

#[test]
fn test_fulfill_moves_the_money() {
    let channel = open_channel();
    let secp = &channel.secp;
    let preimage = [7u8; 32];

    let (alice, add) = channel
        .alice
        .send_add(&add_cmd(1_000_000_000, preimage))
        .unwrap();
    let bob = channel.bob.receive_add(add).unwrap();
    let (alice, bob) = sign_dance(secp, &alice, &bob);
    let (bob, alice) = sign_dance(secp, &bob, &alice);

    // Bob settles with the preimage
    let (bob, fulfill) = bob
        .send_fulfill(&CmdFulfillHtlc {
            id: 1,
            payment_preimage: preimage,
        })
        .expect("bob knows the preimage");
    let (alice, origin) = alice.receive_fulfill(fulfill).expect("preimage matches");
    assert_eq!(origin.id, 1, "alice learns which upstream htlc to settle");

    // Both sides fold the settlement into their commitments
    let (bob, alice) = sign_dance(secp, &bob, &alice);
    let (alice, bob) = sign_dance(secp, &alice, &bob);

    assert_eq!(alice.local_commit.spec.to_local_msat, FUNDING_MSAT - 1_000_000_000);
    assert_eq!(alice.local_commit.spec.to_remote_msat, 1_000_000_000);
    assert!(alice.local_commit.spec.htlcs.is_empty());
    assert_eq!(bob.local_commit.spec.to_local_msat, 1_000_000_000);
    assert!(bob.local_commit.spec.htlcs.is_empty());
    assert_balances_conserved(&alice);
    assert_balances_conserved(&bob);

    // Four commitments were exchanged per side in total
    assert_eq!(alice.local_commit.index, 2);
    assert_eq!(bob.local_commit.index, 2);
}

#[test]
fn test_fail_refunds_the_payer() {
    let channel = open_channel();
    let secp = &channel.secp;

    let (alice, add) = channel
        .alice
        .send_add(&add_cmd(1_000_000_000, [9u8; 32]))
        .unwrap();
    let bob = channel.bob.receive_add(add).unwrap();
    let (alice, bob) = sign_dance(secp, &alice, &bob);
    let (bob, alice) = sign_dance(secp, &bob, &alice);

    let (bob, fail) = bob
        .send_fail(&CmdFailHtlc {
            id: 1,
            reason: b"incorrect_payment_details".to_vec(),
        })
        .expect("the htlc exists");
    let (alice, origin) = alice.receive_fail(fail).expect("alice accepts the failure");
    assert_eq!(origin.id, 1);

    let (bob, alice) = sign_dance(secp, &bob, &alice);
    let (alice, bob) = sign_dance(secp, &alice, &bob);

    assert_eq!(
        alice.local_commit.spec.to_local_msat, FUNDING_MSAT,
        "a failed htlc refunds the payer in full"
    );
    assert_eq!(bob.local_commit.spec.to_remote_msat, FUNDING_MSAT);
    assert!(alice.local_commit.spec.htlcs.is_empty());
}

#[test]
fn test_multiple_htlcs_sign_in_canonical_order() {
    let channel = open_channel();
    let secp = &channel.secp;

    // Duplicate amount/hash pairs and a dust htlc stress the ordering and
    // trimming paths; verification on the other side proves both peers
    // derived the same signature order
    let mut alice = channel.alice.clone();
    let mut bob = channel.bob.clone();
    let batches = [
        (1_000_000_000u64, [1u8; 32]),
        (1_000_000_000, [1u8; 32]),
        (500_000_000, [2u8; 32]),
        (2_000_000, [3u8; 32]),
    ];
    for (amount_msat, preimage) in batches {
        let (next_alice, add) = alice.send_add(&add_cmd(amount_msat, preimage)).unwrap();
        alice = next_alice;
        bob = bob.receive_add(add).unwrap();
    }

    let (alice, commit_sig) = alice.send_commit(secp).unwrap();
    assert_eq!(
        commit_sig.htlc_signatures.len(),
        3,
        "the dust htlc gets no signature"
    );

    let (bob, revocation) = bob
        .receive_commit(secp, &commit_sig)
        .expect("all htlc signatures must verify in order");
    let alice = alice.receive_revocation(secp, &revocation).unwrap();

    assert_eq!(bob.local_commit.spec.htlcs.len(), 4);
    assert_balances_conserved(&alice);
    assert_balances_conserved(&bob);
}

#[test]
fn test_send_add_insufficient_funds() {
    let channel = open_channel();

    // Bob has no funds at all
    let err = channel
        .bob
        .send_add(&add_cmd(200_000, [1u8; 32]))
        .unwrap_err();
    assert_eq!(err, ChannelError::InsufficientFunds);
    assert!(!err.is_fatal(), "a local overdraw does not close the channel");

    // Alice cannot exceed the channel capacity either
    let err = channel
        .alice
        .send_add(&add_cmd(FUNDING_MSAT + 1, [1u8; 32]))
        .unwrap_err();
    assert_eq!(err, ChannelError::InsufficientFunds);
}

#[test]
fn test_receive_add_enforces_id_discipline() {
    let channel = open_channel();

    let (_, add) = channel
        .alice
        .send_add(&add_cmd(1_000_000_000, [1u8; 32]))
        .unwrap();

    let mut skipped = add.clone();
    skipped.id = 3;
    let err = channel.bob.receive_add(skipped).unwrap_err();
    assert_eq!(err, ChannelError::UnexpectedHtlcId { expected: 1, got: 3 });
    assert!(err.is_fatal(), "a peer breaking id discipline is misbehaving");

    let mut reused = add.clone();
    reused.id = 0;
    assert_eq!(
        channel.bob.receive_add(reused).unwrap_err(),
        ChannelError::UnexpectedHtlcId { expected: 1, got: 0 }
    );

    let bob = channel.bob.receive_add(add).unwrap();
    assert_eq!(bob.remote_current_htlc_id, 1);
}

#[test]
fn test_fulfill_with_wrong_preimage() {
    let channel = open_channel();
    let secp = &channel.secp;
    let preimage = [7u8; 32];

    let (alice, add) = channel
        .alice
        .send_add(&add_cmd(1_000_000_000, preimage))
        .unwrap();
    let bob = channel.bob.receive_add(add).unwrap();
    let (_alice, bob) = sign_dance(secp, &alice, &bob);

    let before = bob.clone();
    let err = bob
        .send_fulfill(&CmdFulfillHtlc {
            id: 1,
            payment_preimage: [8u8; 32],
        })
        .unwrap_err();
    assert_eq!(err, ChannelError::InvalidPreimage(1));
    assert_eq!(bob, before, "a failed command leaves the state untouched");

    // Unknown id is reported as such
    assert_eq!(
        bob.send_fulfill(&CmdFulfillHtlc {
            id: 42,
            payment_preimage: preimage,
        })
        .unwrap_err(),
        ChannelError::UnknownHtlc(42)
    );
}

#[test]
fn test_sign_with_no_changes() {
    let channel = open_channel();
    assert_eq!(
        channel.alice.send_commit(&channel.secp).unwrap_err(),
        ChannelError::CannotSignNoChanges
    );
    assert_eq!(
        channel
            .bob
            .receive_commit(
                &channel.secp,
                &messages::CommitSig {
                    channel_id: 1,
                    signature: dummy_signature(),
                    htlc_signatures: vec![],
                }
            )
            .unwrap_err(),
        ChannelError::CannotSignNoChanges
    );
}

#[test]
fn test_sign_while_awaiting_revocation() {
    let channel = open_channel();
    let secp = &channel.secp;

    let (alice, add) = channel
        .alice
        .send_add(&add_cmd(1_000_000_000, [1u8; 32]))
        .unwrap();
    let _bob = channel.bob.receive_add(add).unwrap();
    let (alice, _commit_sig) = alice.send_commit(secp).unwrap();

    // A second add is fine, but signing again before the revocation is not
    let (alice, _) = alice.send_add(&add_cmd(500_000_000, [2u8; 32])).unwrap();
    assert_eq!(
        alice.send_commit(secp).unwrap_err(),
        ChannelError::CannotSignAwaitingRevoke
    );
}

#[test]
fn test_unexpected_revocation() {
    let channel = open_channel();
    let secp = &channel.secp;

    let revocation = messages::RevokeAndAck {
        channel_id: 1,
        per_commitment_secret: per_commitment_secret(&channel.bob.local_params.sha_seed, 0),
        next_per_commitment_point: per_commitment_point(
            secp,
            &channel.bob.local_params.sha_seed,
            1,
        ),
        htlc_timeout_signatures: vec![],
    };

    let err = channel
        .alice
        .receive_revocation(secp, &revocation)
        .unwrap_err();
    assert_eq!(err, ChannelError::UnexpectedRevocation);
    assert!(err.is_fatal());
}

#[test]
fn test_invalid_revocation_secret() {
    let channel = open_channel();
    let secp = &channel.secp;

    let (alice, add) = channel
        .alice
        .send_add(&add_cmd(1_000_000_000, [1u8; 32]))
        .unwrap();
    let bob = channel.bob.receive_add(add).unwrap();
    let (alice, commit_sig) = alice.send_commit(secp).unwrap();
    let (_bob, mut revocation) = bob.receive_commit(secp, &commit_sig).unwrap();

    // A secret for the wrong index does not match the revoked commitment
    revocation.per_commitment_secret =
        per_commitment_secret(&channel.bob.local_params.sha_seed, 5);
    assert_eq!(
        alice.receive_revocation(secp, &revocation).unwrap_err(),
        ChannelError::InvalidRevocation
    );
}

#[test]
fn test_invalid_commit_signature() {
    let channel = open_channel();
    let secp = &channel.secp;

    let (_alice, add) = channel
        .alice
        .send_add(&add_cmd(1_000_000_000, [1u8; 32]))
        .unwrap();
    let bob = channel.bob.receive_add(add).unwrap();

    let err = bob
        .receive_commit(
            secp,
            &messages::CommitSig {
                channel_id: 1,
                signature: dummy_signature(),
                htlc_signatures: vec![dummy_signature()],
            },
        )
        .unwrap_err();
    assert_eq!(err, ChannelError::InvalidCommitSignature);
    assert!(err.is_fatal(), "a bad peer signature closes the channel");
    assert_eq!(
        err.into_wire(1).data,
        "invalid commitment signature".to_string()
    );
}

#[test]
fn test_htlc_signature_count_mismatch() {
    let channel = open_channel();
    let secp = &channel.secp;

    let (alice, add) = channel
        .alice
        .send_add(&add_cmd(1_000_000_000, [1u8; 32]))
        .unwrap();
    let bob = channel.bob.receive_add(add).unwrap();
    let (_alice, mut commit_sig) = alice.send_commit(secp).unwrap();

    commit_sig.htlc_signatures.clear();
    assert_eq!(
        bob.receive_commit(secp, &commit_sig).unwrap_err(),
        ChannelError::HtlcSigCountMismatch {
            expected: 1,
            got: 0
        }
    );
}

#[test]
fn test_invalid_htlc_signature() {
    let channel = open_channel();
    let secp = &channel.secp;

    let (alice, add) = channel
        .alice
        .send_add(&add_cmd(1_000_000_000, [1u8; 32]))
        .unwrap();
    let bob = channel.bob.receive_add(add).unwrap();
    let (_alice, mut commit_sig) = alice.send_commit(secp).unwrap();

    commit_sig.htlc_signatures[0] = dummy_signature();
    assert_eq!(
        bob.receive_commit(secp, &commit_sig).unwrap_err(),
        ChannelError::InvalidHtlcSignature
    );
}

/// A structurally valid signature that cannot verify against anything here.
fn dummy_signature() -> bitcoin::secp256k1::ecdsa::Signature {
    use bitcoin::secp256k1::{Message, Secp256k1, SecretKey};
    let secp = Secp256k1::new();
    let key = SecretKey::from_slice(&[0xCD; 32]).unwrap();
    secp.sign_ecdsa(&Message::from_digest([0xAB; 32]), &key)
}
