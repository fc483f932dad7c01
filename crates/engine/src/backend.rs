use async_trait::async_trait;
use tmbft_committee::CommitteeSet;
use tmbft_types::{Address, Block, Height, Signature, SignedVote};

/// The external collaborator the dispatcher drives, per §6.
///
/// Everything the core needs from the outside world funnels through here:
/// committee membership, signing and signature recovery, and delivery of
/// outbound bytes. The core itself never touches a socket or a keystore.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// The block this node last committed, for bootstrap. Failing to read
    /// it is the one fatal startup condition (§6 "Exit conditions").
    async fn last_committed_block(&self) -> std::io::Result<Block>;

    /// The committee as of `height`. Pure: called freely, any number of
    /// times, with no side effect (§4.J).
    fn committee_at(&self, height: Height) -> CommitteeSet;

    /// Send `payload` to every committee member except this node.
    async fn broadcast(&self, committee: &CommitteeSet, payload: Vec<u8>);

    /// Re-send a message received from someone else to the rest of the
    /// committee, excluding `sender` (who already has it) and this node.
    async fn gossip(&self, committee: &CommitteeSet, payload: Vec<u8>, sender: Address);

    /// Hand off a decided block and the precommits that backed it.
    async fn commit(&self, block: Block, committed_seals: Vec<SignedVote>);

    /// Recovers the signer of `signing_bytes` from `signature`, or `None`
    /// if recovery fails or does not match a plausible signer.
    fn check_validator_signature(&self, signing_bytes: &[u8], signature: &Signature) -> Option<Address>;

    /// Signs `signing_bytes` with this node's key.
    fn sign(&self, signing_bytes: &[u8]) -> Signature;
}
