use crate::poll::{wait_for, RetryPolicy};
use crate::{ClaimRegistry, CreateUtility, MemoryStore, SledStore};
use anonclaim_crypto::{
    generate_private_key, prove_claim, ClaimSigner, DevBackend, Groth16Backend, ProofSystem, SnapshotTree,
};
use anonclaim_types::{
    ClaimError, ClaimProof, EthAddress, FieldBytes, Phase, Token, TokenId, UtilityId,
};
use ark_std::rand::{rngs::StdRng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;

struct Claimants {
    signers: Vec<ClaimSigner>,
    tokens: Vec<Token>,
    tree: SnapshotTree,
}

impl Claimants {
    fn new(n: usize) -> Self {
        let signers: Vec<ClaimSigner> = (0..n)
            .map(|_| ClaimSigner::new(generate_private_key()).unwrap())
            .collect();
        let tokens: Vec<Token> = signers
            .iter()
            .enumerate()
            .map(|(i, s)| Token {
                collection: EthAddress::from_hex("0x9378368ba6b85c1fba5b131b530f5f5bedf21a18").unwrap(),
                token_id: TokenId::from_u64(7 + i as u64),
                owner: s.address(),
            })
            .collect();
        let tree = SnapshotTree::from_tokens(&tokens).unwrap();
        Self { signers, tokens, tree }
    }

    fn root(&self) -> FieldBytes {
        self.tree.root_bytes()
    }

    fn prove(&self, backend: &dyn ProofSystem, index: usize, utility: UtilityId, phase: Phase) -> ClaimProof {
        let token = &self.tokens[index];
        let signature = self.signers[index]
            .sign(&utility, &token.collection, &token.token_id)
            .unwrap();
        let path = self.tree.create_proof(index).unwrap();
        prove_claim(backend, utility, phase, token, &signature, &path).unwrap()
    }
}

fn dev_registry() -> (Arc<DevBackend>, ClaimRegistry<MemoryStore>) {
    let backend = Arc::new(DevBackend::random());
    let registry = ClaimRegistry::new(MemoryStore::new(), backend.clone());
    (backend, registry)
}

#[tokio::test]
async fn test_register_then_enter_scenario() {
    let (backend, registry) = dev_registry();
    let c = Claimants::new(4);
    let id = UtilityId::from_u64(1);
    registry
        .create_utility(CreateUtility::event(id, c.root(), 10).with_metadata("ipfs://event"), 0)
        .await
        .unwrap();

    let p1 = c.prove(backend.as_ref(), 0, id, Phase::Register);
    let record = registry.register_claim(&p1).await.unwrap();
    assert_eq!(record.registration_count, 1);
    assert_eq!(
        registry.register_claim(&p1).await,
        Err(ClaimError::DuplicateRegistration)
    );

    let p2 = c.prove(backend.as_ref(), 0, id, Phase::Enter);
    assert_eq!(p1.public_signals.claim_commitment, p2.public_signals.claim_commitment);
    assert_ne!(p1.public_signals.claim_nullifier, p2.public_signals.claim_nullifier);

    registry.enter_claim(&p2).await.unwrap();
    assert_eq!(registry.enter_claim(&p2).await, Err(ClaimError::DuplicateEntrance));

    assert_eq!(registry.registration_count(&id).await.unwrap(), 1);
    assert_eq!(registry.entrance_count(&id).await.unwrap(), 1);
    assert_eq!(registry.metadata_ref(&id).await.unwrap(), "ipfs://event");
    assert_eq!(registry.snapshot_root(&id).await.unwrap(), c.root());
    assert!(registry
        .is_registered(&id, &p1.public_signals.claim_commitment)
        .await
        .unwrap());
    assert!(registry
        .is_nullifier_consumed(&id, &p2.public_signals.claim_nullifier)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_enter_before_register() {
    let (backend, registry) = dev_registry();
    let c = Claimants::new(2);
    let id = UtilityId::from_u64(2);
    registry
        .create_utility(CreateUtility::event(id, c.root(), 10), 0)
        .await
        .unwrap();

    let enter = c.prove(backend.as_ref(), 1, id, Phase::Enter);
    assert_eq!(registry.enter_claim(&enter).await, Err(ClaimError::UnknownRegistration));
    assert_eq!(
        registry.validate_entrance(&enter).await,
        Err(ClaimError::UnknownRegistration)
    );
    assert!(!registry
        .is_nullifier_consumed(&id, &enter.public_signals.claim_nullifier)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_foreign_root_is_invalid_snapshot() {
    let (backend, registry) = dev_registry();
    let c = Claimants::new(2);
    let other = Claimants::new(2);
    let id = UtilityId::from_u64(3);
    registry
        .create_utility(CreateUtility::event(id, other.root(), 10), 0)
        .await
        .unwrap();

    let proof = c.prove(backend.as_ref(), 0, id, Phase::Register);
    assert_eq!(registry.register_claim(&proof).await, Err(ClaimError::InvalidSnapshot));
    assert_eq!(registry.registration_count(&id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_permuted_proof_is_invalid() {
    let (backend, registry) = dev_registry();
    let c = Claimants::new(1);
    let id = UtilityId::from_u64(4);
    registry
        .create_utility(CreateUtility::event(id, c.root(), 10), 0)
        .await
        .unwrap();

    let mut proof = c.prove(backend.as_ref(), 0, id, Phase::Register);
    std::mem::swap(&mut proof.points.a, &mut proof.points.c);
    assert_eq!(registry.register_claim(&proof).await, Err(ClaimError::InvalidProof));

    // Verified by a different key: the registry's backend rejects it.
    let foreign = c.prove(&DevBackend::random(), 0, id, Phase::Register);
    assert_eq!(registry.register_claim(&foreign).await, Err(ClaimError::InvalidProof));
}

#[tokio::test]
async fn test_capacity_bound() {
    let (backend, registry) = dev_registry();
    let c = Claimants::new(4);
    let id = UtilityId::from_u64(5);
    registry
        .create_utility(CreateUtility::event(id, c.root(), 3), 0)
        .await
        .unwrap();

    for i in 0..3 {
        let proof = c.prove(backend.as_ref(), i, id, Phase::Register);
        registry.register_claim(&proof).await.unwrap();
    }
    let last = c.prove(backend.as_ref(), 3, id, Phase::Register);
    assert_eq!(registry.register_claim(&last).await, Err(ClaimError::RegistrationFull));
    assert_eq!(registry.registration_count(&id).await.unwrap(), 3);
    assert_eq!(registry.capacity(&id).await.unwrap(), 3);
}

#[tokio::test]
async fn test_capacity_one() {
    let (backend, registry) = dev_registry();
    let c = Claimants::new(2);
    let id = UtilityId::from_u64(6);
    registry
        .create_utility(CreateUtility::event(id, c.root(), 1), 0)
        .await
        .unwrap();

    registry
        .register_claim(&c.prove(backend.as_ref(), 0, id, Phase::Register))
        .await
        .unwrap();
    assert_eq!(
        registry
            .register_claim(&c.prove(backend.as_ref(), 1, id, Phase::Register))
            .await,
        Err(ClaimError::RegistrationFull)
    );
}

#[tokio::test]
async fn test_utility_creation_rules() {
    let backend = Arc::new(DevBackend::random());
    let registry = ClaimRegistry::new(MemoryStore::new(), backend).with_unit_price(5);
    let id = UtilityId::from_u64(7);
    let root = FieldBytes::from_u64(99);

    assert_eq!(registry.creation_fee(4), 20);
    assert_eq!(
        registry.create_utility(CreateUtility::event(id, root, 4), 19).await,
        Err(ClaimError::InsufficientPayment {
            required: 20,
            provided: 19
        })
    );
    assert!(!registry.is_created(&id).await.unwrap());

    registry
        .create_utility(CreateUtility::event(id, root, 4), 20)
        .await
        .unwrap();
    assert!(registry.is_created(&id).await.unwrap());
    assert_eq!(
        registry.create_utility(CreateUtility::event(id, root, 1), 100).await,
        Err(ClaimError::DuplicateUtility)
    );

    assert!(matches!(
        registry
            .create_utility(CreateUtility::poll(UtilityId::from_u64(8), root, 1, 0), 5)
            .await,
        Err(ClaimError::InvalidPhase(_))
    ));
    assert!(matches!(
        registry
            .create_utility(CreateUtility::event(UtilityId::from_bytes([0xff; 32]), root, 1), 5)
            .await,
        Err(ClaimError::EncodingOverflow { .. })
    ));

    assert_eq!(
        registry.utility(&UtilityId::from_u64(8)).await,
        Err(ClaimError::UnknownUtility)
    );
    assert_eq!(registry.utilities().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_utility_precedes_proof_check() {
    let (_, registry) = dev_registry();
    let c = Claimants::new(1);
    let mut proof = c.prove(&DevBackend::random(), 0, UtilityId::from_u64(9), Phase::Register);
    proof.points.a.clear();
    assert_eq!(registry.register_claim(&proof).await, Err(ClaimError::UnknownUtility));
}

#[tokio::test]
async fn test_wrong_step_is_invalid_phase() {
    let (backend, registry) = dev_registry();
    let c = Claimants::new(1);
    let id = UtilityId::from_u64(10);
    registry
        .create_utility(CreateUtility::event(id, c.root(), 2), 0)
        .await
        .unwrap();

    let enter = c.prove(backend.as_ref(), 0, id, Phase::Enter);
    assert!(matches!(
        registry.register_claim(&enter).await,
        Err(ClaimError::InvalidPhase(_))
    ));
    let vote = c.prove(backend.as_ref(), 0, id, Phase::Vote(1));
    assert!(matches!(registry.cast_vote(&vote).await, Err(ClaimError::InvalidPhase(_))));
}

#[tokio::test]
async fn test_poll_votes() {
    let (backend, registry) = dev_registry();
    let c = Claimants::new(3);
    let id = UtilityId::from_u64(11);
    registry
        .create_utility(CreateUtility::poll(id, c.root(), 3, 2), 0)
        .await
        .unwrap();
    for i in 0..3 {
        registry
            .register_claim(&c.prove(backend.as_ref(), i, id, Phase::Register))
            .await
            .unwrap();
    }

    registry
        .cast_vote(&c.prove(backend.as_ref(), 0, id, Phase::Vote(1)))
        .await
        .unwrap();
    registry
        .cast_vote(&c.prove(backend.as_ref(), 1, id, Phase::Vote(2)))
        .await
        .unwrap();

    // Same option again, then a different option: one vote per claimant.
    assert_eq!(
        registry
            .cast_vote(&c.prove(backend.as_ref(), 0, id, Phase::Vote(1)))
            .await,
        Err(ClaimError::DuplicateVote)
    );
    assert_eq!(
        registry
            .cast_vote(&c.prove(backend.as_ref(), 0, id, Phase::Vote(2)))
            .await,
        Err(ClaimError::DuplicateVote)
    );

    assert!(matches!(
        registry
            .cast_vote(&c.prove(backend.as_ref(), 2, id, Phase::Vote(3)))
            .await,
        Err(ClaimError::InvalidPhase(_))
    ));
    assert!(matches!(
        registry
            .enter_claim(&c.prove(backend.as_ref(), 2, id, Phase::Enter))
            .await,
        Err(ClaimError::InvalidPhase(_))
    ));

    assert_eq!(registry.vote_result(&id, 1).await.unwrap(), 1);
    assert_eq!(registry.vote_result(&id, 2).await.unwrap(), 1);
    assert_eq!(registry.vote_count(&id).await.unwrap(), 2);
    assert!(registry.vote_result(&id, 3).await.is_err());
}

#[tokio::test]
async fn test_validate_does_not_mutate() {
    let (backend, registry) = dev_registry();
    let c = Claimants::new(1);
    let id = UtilityId::from_u64(12);
    registry
        .create_utility(CreateUtility::event(id, c.root(), 1), 0)
        .await
        .unwrap();

    let proof = c.prove(backend.as_ref(), 0, id, Phase::Register);
    registry.validate_registration(&proof).await.unwrap();
    registry.validate_registration(&proof).await.unwrap();
    assert_eq!(registry.registration_count(&id).await.unwrap(), 0);

    registry.register_claim(&proof).await.unwrap();
    assert_eq!(
        registry.validate_registration(&proof).await,
        Err(ClaimError::DuplicateRegistration)
    );
    registry
        .validate_entrance(&c.prove(backend.as_ref(), 0, id, Phase::Enter))
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_replays_accept_once() {
    let backend = Arc::new(DevBackend::random());
    let registry = Arc::new(ClaimRegistry::new(MemoryStore::new(), backend.clone()));
    let c = Claimants::new(1);
    let id = UtilityId::from_u64(13);
    registry
        .create_utility(CreateUtility::event(id, c.root(), 100), 0)
        .await
        .unwrap();
    let proof = c.prove(backend.as_ref(), 0, id, Phase::Register);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let registry = registry.clone();
            let proof = proof.clone();
            tokio::spawn(async move { registry.register_claim(&proof).await })
        })
        .collect();

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(e) => assert_eq!(e, ClaimError::DuplicateRegistration),
        }
    }
    assert_eq!(accepted, 1);
    assert_eq!(registry.registration_count(&id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_poll_for_registration() {
    let backend = Arc::new(DevBackend::random());
    let registry = Arc::new(ClaimRegistry::new(MemoryStore::new(), backend.clone()));
    let c = Claimants::new(1);
    let id = UtilityId::from_u64(14);
    registry
        .create_utility(CreateUtility::event(id, c.root(), 1), 0)
        .await
        .unwrap();

    let proof = c.prove(backend.as_ref(), 0, id, Phase::Register);
    let submitter = registry.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        submitter.register_claim(&proof).await
    });

    let reader = registry.clone();
    let count = wait_for(
        move || {
            let reader = reader.clone();
            async move { reader.registration_count(&id).await }
        },
        |n| *n == 1,
        RetryPolicy::fixed(50, Duration::from_millis(10)),
    )
    .await;
    assert_eq!(count, Some(1));

    let missing = registry.clone();
    let none = wait_for(
        move || {
            let missing = missing.clone();
            async move { missing.registration_count(&UtilityId::from_u64(15)).await }
        },
        |_| true,
        RetryPolicy::fixed(3, Duration::from_millis(1)),
    )
    .await;
    assert_eq!(none, None);
}

#[tokio::test]
async fn test_sled_registry_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(DevBackend::random());
    let c = Claimants::new(2);
    let id = UtilityId::from_u64(16);
    let proof = c.prove(backend.as_ref(), 0, id, Phase::Register);

    {
        let registry = ClaimRegistry::new(SledStore::open(dir.path()).unwrap(), backend.clone());
        registry
            .create_utility(CreateUtility::event(id, c.root(), 2), 0)
            .await
            .unwrap();
        registry.register_claim(&proof).await.unwrap();
    }

    let registry = ClaimRegistry::new(SledStore::open(dir.path()).unwrap(), backend.clone());
    assert_eq!(registry.registration_count(&id).await.unwrap(), 1);
    assert_eq!(
        registry.register_claim(&proof).await,
        Err(ClaimError::DuplicateRegistration)
    );
    registry
        .enter_claim(&c.prove(backend.as_ref(), 0, id, Phase::Enter))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_failed_operations_leave_store_untouched() {
    let backend = Arc::new(DevBackend::random());
    let c = Claimants::new(2);
    let id = UtilityId::from_u64(17);
    let registry = ClaimRegistry::new(MemoryStore::new(), backend.clone());
    registry
        .create_utility(CreateUtility::event(id, c.root(), 1), 0)
        .await
        .unwrap();
    let before = registry.utility(&id).await.unwrap();

    let mut tampered = c.prove(backend.as_ref(), 0, id, Phase::Register);
    tampered.public_signals.claim_nullifier = FieldBytes::from_u64(1);
    assert_eq!(registry.register_claim(&tampered).await, Err(ClaimError::InvalidProof));
    assert!(!registry
        .is_nullifier_consumed(&id, &FieldBytes::from_u64(1))
        .await
        .unwrap());
    assert!(!registry
        .is_registered(&id, &tampered.public_signals.claim_commitment)
        .await
        .unwrap());
    assert_eq!(registry.utility(&id).await.unwrap(), before);
}

#[tokio::test]
#[ignore = "Groth16 setup over the full claim circuit takes minutes"]
async fn test_groth16_end_to_end() {
    let mut rng = StdRng::seed_from_u64(0x7265_6769);
    let backend = Arc::new(Groth16Backend::setup(&mut rng).unwrap());
    let verifier = Arc::new(
        Groth16Backend::verifier_only(&backend.export_verifying_key().unwrap()).unwrap(),
    );
    let registry = ClaimRegistry::new(MemoryStore::new(), verifier);
    let c = Claimants::new(4);
    let id = UtilityId::from_u64(18);
    registry
        .create_utility(CreateUtility::event(id, c.root(), 4), 0)
        .await
        .unwrap();

    let p1 = c.prove(backend.as_ref(), 0, id, Phase::Register);
    registry.register_claim(&p1).await.unwrap();
    assert_eq!(
        registry.register_claim(&p1).await,
        Err(ClaimError::DuplicateRegistration)
    );

    let mut swapped = c.prove(backend.as_ref(), 1, id, Phase::Register);
    std::mem::swap(&mut swapped.points.a, &mut swapped.points.c);
    assert_eq!(registry.register_claim(&swapped).await, Err(ClaimError::InvalidProof));

    let p2 = c.prove(backend.as_ref(), 0, id, Phase::Enter);
    registry.enter_claim(&p2).await.unwrap();
    assert_eq!(registry.enter_claim(&p2).await, Err(ClaimError::DuplicateEntrance));
}
