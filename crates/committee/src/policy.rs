/// Proposer selection policy, per §3 of the spec.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposerPolicy {
    /// `members[(base + round) mod N]`, `base` derived from the last
    /// successful proposer of the previous height.
    #[default]
    RoundRobin,
    /// `members[(index_of(last_proposer) + round) mod N]`; falls back to
    /// index 0 when the last proposer is unknown or no longer a member
    /// (an open question the source left undefined, decided in DESIGN.md).
    Sticky,
}
