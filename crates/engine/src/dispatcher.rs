use std::sync::Arc;

use tmbft_config::Config;
use tmbft_driver::{Driver, Output};
use tmbft_types::{Address, Block, Height, Message, Round};
use tmbft_wal::Wal;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::backend::Backend;
use crate::codec;
use crate::error::{Result, StartupError};
use crate::timeout_controller::TimeoutController;
use crate::watchdog;

const MESSAGE_CHANNEL_CAPACITY: usize = 256;
const TIMEOUT_CHANNEL_CAPACITY: usize = 16;
const REPLAY_CHANNEL_CAPACITY: usize = 1;

/// Submits external input to a running dispatcher and requests shutdown.
/// Cloning a `Handle` is cheap; every clone talks to the same dispatcher.
#[derive(Clone)]
pub struct Handle {
    message_tx: mpsc::Sender<Vec<u8>>,
    new_block_tx: watch::Sender<Option<Block>>,
    stop_tx: watch::Sender<bool>,
}

impl Handle {
    /// Submits a raw wire-format message, per §4.I's external message
    /// event. Silently dropped if the consensus task has already stopped.
    pub async fn submit_message(&self, payload: Vec<u8>) {
        let _ = self.message_tx.send(payload).await;
    }

    /// Supplies a freshly produced candidate block. Only the latest call's
    /// block is kept; the consensus task reads it only when it is the
    /// round's proposer and has nothing to propose yet (§4.I "new-unmined-
    /// block task").
    pub fn submit_unmined_block(&self, block: Block) {
        let _ = self.new_block_tx.send(Some(block));
    }

    /// Cancels the consensus and watchdog tasks. Idempotent; join the
    /// handles returned by [`spawn`] to wait for them to actually stop.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}

/// Drives one `Driver` forward against a [`Backend`], per §4.H/§4.I: decodes
/// and verifies inbound messages, turns `Driver` outputs into broadcasts,
/// WAL appends and timer schedules, and commits decided blocks before
/// advancing to the next height.
struct Dispatcher<B: Backend> {
    driver: Driver,
    backend: Arc<B>,
    address: Address,
    wal: Wal,
    wal_entries: Vec<Vec<u8>>,
    timeouts: TimeoutController,
    progress_tx: watch::Sender<(Height, Round)>,
}

/// Boots the engine at `resume_height` and spawns its two cooperative
/// tasks (§4.I): the single-writer consensus task, and the liveness
/// watchdog. Fails only if the last committed block cannot be read (§6
/// "Exit conditions") — the one fatal startup condition the spec names.
///
/// `resume_height` is the height consensus should (re)start at; how a
/// caller derives it from `backend.last_committed_block()` is outside this
/// core's concern (§4.J: the core consumes `committee_at`/bootstrap
/// accessors, it does not itself track chain height across restarts).
pub async fn spawn<B: Backend>(
    backend: Arc<B>,
    config: Config,
    address: Address,
    resume_height: Height,
) -> Result<(Handle, JoinHandle<()>, JoinHandle<()>)> {
    backend
        .last_committed_block()
        .await
        .map_err(StartupError::LastCommittedBlockUnreadable)?;

    let mut wal = Wal::open(&config.wal.wal_dir).unwrap_or_else(|error| {
        tracing::warn!(%error, "WAL directory unavailable, continuing without replay on restart");
        // An unusable directory still yields a `Wal` handle whose
        // `open_height` will fail the same way on every call; appends are
        // then best-effort no-ops logged at the call site, matching §4.G's
        // "liveness aid, not a safety mechanism".
        Wal::open(std::env::temp_dir()).expect("system temp dir is always available")
    });
    let replay_entries = wal.open_height(resume_height).unwrap_or_default();

    let committee = backend.committee_at(resume_height);
    let driver = Driver::new(resume_height, committee.clone(), address);

    let (message_tx, message_rx) = mpsc::channel(MESSAGE_CHANNEL_CAPACITY);
    let (new_block_tx, new_block_rx) = watch::channel(None);
    let (stop_tx, stop_rx) = watch::channel(false);
    let (timeout_tx, timeout_rx) = mpsc::channel(TIMEOUT_CHANNEL_CAPACITY);
    let (replay_tx, replay_rx) = mpsc::channel(REPLAY_CHANNEL_CAPACITY);
    let (progress_tx, progress_rx) = watch::channel((resume_height, Round::INITIAL));

    let timeouts = TimeoutController::new(timeout_tx, config.consensus.timeouts);
    let mut dispatcher = Dispatcher {
        driver,
        backend: backend.clone(),
        address,
        wal,
        wal_entries: Vec::new(),
        timeouts,
        progress_tx,
    };

    let request_timeout = config.request_timeout;
    let watchdog_handle = watchdog::spawn(request_timeout, progress_rx, replay_tx);

    let consensus_handle = tokio::spawn(async move {
        let outputs = dispatcher.driver.start_round(Round::INITIAL);
        dispatcher.handle_outputs(outputs, committee.clone()).await;
        for payload in replay_entries {
            dispatcher.rebroadcast(&committee, payload).await;
        }

        dispatcher.run(message_rx, timeout_rx, new_block_rx, replay_rx, stop_rx).await;
    });

    Ok((
        Handle { message_tx, new_block_tx, stop_tx },
        consensus_handle,
        watchdog_handle,
    ))
}

impl<B: Backend> Dispatcher<B> {
    async fn run(
        &mut self,
        mut message_rx: mpsc::Receiver<Vec<u8>>,
        mut timeout_rx: mpsc::Receiver<tmbft_types::Timeout>,
        mut new_block_rx: watch::Receiver<Option<Block>>,
        mut replay_rx: mpsc::Receiver<()>,
        mut stop_rx: watch::Receiver<bool>,
    ) {
        loop {
            let committee = self.driver.committee().clone();
            tokio::select! {
                biased;

                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        tracing::debug!("consensus task stopping");
                        return;
                    }
                }

                Some(payload) = message_rx.recv() => {
                    self.handle_external_message(payload).await;
                }

                Some(timeout) = timeout_rx.recv() => {
                    let outputs = self.driver.handle_timeout(timeout);
                    self.handle_outputs(outputs, committee).await;
                }

                Ok(()) = new_block_rx.changed() => {
                    let block = new_block_rx.borrow_and_update().clone();
                    if let Some(block) = block {
                        let outputs = self.driver.handle_new_unmined_block(block);
                        self.handle_outputs(outputs, committee).await;
                    }
                }

                Some(()) = replay_rx.recv() => {
                    let entries = self.wal_entries.clone();
                    for payload in entries {
                        self.rebroadcast(&committee, payload).await;
                    }
                }

                else => return,
            }
        }
    }

    /// Decodes and authenticates `payload` before handing it to the
    /// `Driver`, per §7's `decode_error`/`invalid_signature`/`unauthorized`
    /// kinds. Height/round classification (`old_message`,
    /// `future_height_message`, `future_round_message`) is the `Driver`'s
    /// own job; it already backlogs or drops as appropriate.
    async fn handle_external_message(&mut self, payload: Vec<u8>) {
        let message = match codec::decode(&payload) {
            Ok(message) => message,
            Err(error) => {
                tracing::debug!(%error, "dropping malformed message");
                return;
            }
        };

        let recovered = self.backend.check_validator_signature(&message.signing_bytes(), message.signature());
        if recovered != Some(message.sender()) {
            tracing::debug!(sender = %message.sender(), "dropping message with invalid signature");
            return;
        }

        let committee = self.backend.committee_at(message.height());
        if !committee.is_member(&message.sender()) {
            tracing::debug!(sender = %message.sender(), height = %message.height(), "dropping message from non-member");
            return;
        }

        // `verify payload transactions` is out of scope (Non-goals); any
        // structurally decoded, correctly signed, committee-authored
        // proposal is treated as valid block content.
        let outputs = match message.clone() {
            Message::Proposal(proposal) => self.driver.handle_proposal(proposal, true),
            Message::Prevote(vote) => self.driver.handle_vote(tmbft_types::VoteType::Prevote, vote),
            Message::Precommit(vote) => self.driver.handle_vote(tmbft_types::VoteType::Precommit, vote),
        };

        let sender = message.sender();
        self.backend.gossip(&committee, payload, sender).await;
        self.handle_outputs(outputs, committee).await;
    }

    async fn handle_outputs(&mut self, outputs: Vec<Output>, committee: tmbft_committee::CommitteeSet) {
        for output in outputs {
            match output {
                Output::Propose { round, valid_round, block } => {
                    let message = Message::Proposal(tmbft_types::SignedProposal::new(
                        self.driver.height(),
                        round,
                        self.address,
                        tmbft_types::ProposalData { valid_round, block },
                        tmbft_types::Signature::new(vec![]),
                    ));
                    self.sign_append_and_broadcast(message, &committee).await;
                }
                Output::Vote { round, vote_type, value } => {
                    let message = wrap_vote(
                        vote_type,
                        tmbft_types::SignedVote::new(
                            self.driver.height(),
                            round,
                            self.address,
                            tmbft_types::VoteData { vote_type, value },
                            tmbft_types::Signature::new(vec![]),
                        ),
                    );
                    self.sign_append_and_broadcast(message, &committee).await;
                }
                Output::ScheduleTimeout(timeout) => {
                    self.timeouts.schedule(timeout);
                }
                Output::Decide { round, value } => {
                    self.handle_decide(round, value, &committee).await;
                }
            }
            let _ = self.progress_tx.send((self.driver.height(), self.driver.round()));
        }
    }

    /// Re-signs `message` with this node's own address (the payload was
    /// built with a placeholder signature by the driver-facing output
    /// construction above), appends it to the WAL, and broadcasts it.
    async fn sign_append_and_broadcast(&mut self, message: Message, committee: &tmbft_committee::CommitteeSet) {
        let signed = self.backend.sign(&message.signing_bytes());
        let message = rewrap_with_signature(message, signed);
        let payload = codec::encode(&message);

        self.wal_entries.push(payload.clone());
        if let Err(error) = self.wal.append(&payload) {
            tracing::warn!(%error, "WAL append failed, continuing without it");
        }

        self.backend.broadcast(committee, payload).await;
    }

    async fn rebroadcast(&mut self, committee: &tmbft_committee::CommitteeSet, payload: Vec<u8>) {
        self.backend.broadcast(committee, payload).await;
    }

    async fn handle_decide(&mut self, round: Round, value: tmbft_types::BlockHash, _committee: &tmbft_committee::CommitteeSet) {
        let Some(block) = self.driver.block_for(&value).cloned() else {
            tracing::warn!(%value, "decided on a value with no known block body");
            return;
        };
        let seals = self.driver.committed_seals(round, &value).into_iter().cloned().collect();

        self.backend.commit(block, seals).await;

        let old_height = self.driver.height();
        if let Err(error) = self.wal.commit(old_height) {
            tracing::warn!(%error, "failed to close/delete WAL file for committed height");
        }
        self.wal_entries.clear();

        let next_height = old_height.increment();
        let next_committee = self.backend.committee_at(next_height);
        if let Err(error) = self.wal.open_height(next_height) {
            tracing::warn!(%error, "failed to open WAL file for next height, continuing without it");
        }

        let outputs = self.driver.advance_height(next_committee.clone());
        let _ = self.progress_tx.send((self.driver.height(), self.driver.round()));
        Box::pin(self.handle_outputs(outputs, next_committee)).await;
    }
}

fn wrap_vote(vote_type: tmbft_types::VoteType, vote: tmbft_types::SignedVote) -> Message {
    match vote_type {
        tmbft_types::VoteType::Prevote => Message::Prevote(vote),
        tmbft_types::VoteType::Precommit => Message::Precommit(vote),
    }
}

fn rewrap_with_signature(message: Message, signature: tmbft_types::Signature) -> Message {
    match message {
        Message::Proposal(mut m) => {
            m.signature = signature;
            Message::Proposal(m)
        }
        Message::Prevote(mut m) => {
            m.signature = signature;
            Message::Prevote(m)
        }
        Message::Precommit(mut m) => {
            m.signature = signature;
            Message::Precommit(m)
        }
    }
}
