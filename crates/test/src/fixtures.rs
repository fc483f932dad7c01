use std::collections::BTreeMap;
use std::sync::{Mutex, OnceLock};

use async_trait::async_trait;
use ed25519_consensus::{SigningKey, VerificationKey};
use sha2::{Digest, Sha256};
use tmbft_committee::CommitteeSet;
use tmbft_engine::{Backend, Handle};
use tmbft_types::{Address, Block, Height, Signature, SignedVote};

/// A deterministic keypair for node `seed`, for reproducible scenario
/// tests. The address is derived the way a real deployment would derive
/// one from a public key, just with `Sha256` standing in for whatever the
/// committee contract actually hashes.
pub fn keypair(seed: u8) -> (SigningKey, Address) {
    let signing_key = SigningKey::from([seed; 32]);
    let verification_key = signing_key.verification_key();
    let digest = Sha256::digest(verification_key.as_bytes());
    let mut address_bytes = [0u8; Address::LENGTH];
    address_bytes.copy_from_slice(&digest[..Address::LENGTH]);
    (signing_key, Address::new(address_bytes))
}

/// An in-process [`Backend`] for scenario tests: signs with real Ed25519
/// keys, delivers `broadcast`/`gossip` directly into peer
/// [`Handle`](tmbft_engine::Handle)s rather than over a socket, and records
/// every `commit` call for assertions.
pub struct InMemoryBackend {
    address: Address,
    signing_key: SigningKey,
    verification_keys: BTreeMap<Address, VerificationKey>,
    committee: CommitteeSet,
    peers: OnceLock<Vec<(Address, Handle)>>,
    last_committed: Mutex<Block>,
    pub commits: Mutex<Vec<(Block, Vec<SignedVote>)>>,
}

impl InMemoryBackend {
    pub fn new(
        address: Address,
        signing_key: SigningKey,
        verification_keys: BTreeMap<Address, VerificationKey>,
        committee: CommitteeSet,
    ) -> Self {
        Self {
            address,
            signing_key,
            verification_keys,
            committee,
            peers: OnceLock::new(),
            last_committed: Mutex::new(Block::new(Vec::new())),
            commits: Mutex::new(Vec::new()),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Wires this node's `broadcast`/`gossip` calls to every other node's
    /// `Handle`. Called once all nodes in the network have been spawned
    /// (their `Handle`s don't exist until then).
    pub fn connect(&self, peers: Vec<(Address, Handle)>) {
        let _ = self.peers.set(peers);
    }

    async fn deliver(&self, payload: Vec<u8>, exclude: Option<Address>) {
        let Some(peers) = self.peers.get() else {
            return;
        };
        for (address, handle) in peers {
            if Some(*address) == exclude {
                continue;
            }
            handle.submit_message(payload.clone()).await;
        }
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn last_committed_block(&self) -> std::io::Result<Block> {
        Ok(self.last_committed.lock().unwrap().clone())
    }

    fn committee_at(&self, _height: Height) -> CommitteeSet {
        self.committee.clone()
    }

    async fn broadcast(&self, _committee: &CommitteeSet, payload: Vec<u8>) {
        self.deliver(payload, None).await;
    }

    async fn gossip(&self, _committee: &CommitteeSet, payload: Vec<u8>, sender: Address) {
        self.deliver(payload, Some(sender)).await;
    }

    async fn commit(&self, block: Block, committed_seals: Vec<SignedVote>) {
        *self.last_committed.lock().unwrap() = block.clone();
        self.commits.lock().unwrap().push((block, committed_seals));
    }

    fn check_validator_signature(&self, signing_bytes: &[u8], signature: &Signature) -> Option<Address> {
        let signature = ed25519_consensus::Signature::try_from(signature.as_bytes()).ok()?;
        self.verification_keys
            .iter()
            .find(|(_, key)| key.verify(&signature, signing_bytes).is_ok())
            .map(|(address, _)| *address)
    }

    fn sign(&self, signing_bytes: &[u8]) -> Signature {
        Signature::new(self.signing_key.sign(signing_bytes).to_bytes().to_vec())
    }
}
