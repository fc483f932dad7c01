use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tmbft_committee::{CommitteeMember, CommitteeSet, ProposerPolicy};
use tmbft_config::Config;
use tmbft_test::fixtures::{keypair, InMemoryBackend};
use tmbft_types::{Block, Height};

/// Scenario 1 driven through the real dispatcher: four in-process nodes,
/// wired directly to each other's [`tmbft_engine::Handle`], reach a decide
/// on the same block at height 1 with nothing but the proposer fed a
/// candidate block.
#[tokio::test]
async fn four_nodes_commit_the_same_block() {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();
    let mut config = Config::default();
    config.consensus.timeouts.timeout_propose = Duration::from_millis(50);
    config.consensus.timeouts.timeout_propose_delta = Duration::from_millis(10);
    config.consensus.timeouts.timeout_prevote = Duration::from_millis(50);
    config.consensus.timeouts.timeout_prevote_delta = Duration::from_millis(10);
    config.consensus.timeouts.timeout_precommit = Duration::from_millis(50);
    config.consensus.timeouts.timeout_precommit_delta = Duration::from_millis(10);
    config.request_timeout = Duration::from_secs(5);
    config.wal.wal_dir = tempfile::tempdir().unwrap().keep();

    let keys: Vec<_> = (1u8..=4).map(keypair).collect();
    let verification_keys: BTreeMap<_, _> = keys.iter().map(|(sk, addr)| (*addr, sk.verification_key())).collect();
    let committee = CommitteeSet::new(
        keys.iter().map(|(_, addr)| CommitteeMember::new(*addr, 1)),
        ProposerPolicy::RoundRobin,
        None,
    );

    let mut backends = Vec::new();
    let mut handles = Vec::new();
    for (signing_key, address) in &keys {
        let backend = Arc::new(InMemoryBackend::new(*address, signing_key.clone(), verification_keys.clone(), committee.clone()));
        let (handle, consensus_task, watchdog_task) =
            tmbft_engine::spawn(backend.clone(), config.clone(), *address, Height::GENESIS).await.unwrap();
        backends.push(backend);
        handles.push((*address, handle, consensus_task, watchdog_task));
    }

    for (self_address, backend) in keys.iter().map(|(_, a)| *a).zip(backends.iter()) {
        let peers = handles
            .iter()
            .filter(|(address, ..)| *address != self_address)
            .map(|(address, handle, ..)| (*address, handle.clone()))
            .collect();
        backend.connect(peers);
    }

    for (_, handle, ..) in &handles {
        handle.submit_unmined_block(Block::new(b"scenario-1".to_vec()));
    }

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if backends.iter().all(|b| !b.commits.lock().unwrap().is_empty()) {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "nodes failed to commit within the deadline");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let committed_hashes: Vec<_> = backends.iter().map(|b| b.commits.lock().unwrap()[0].0.id()).collect();
    assert!(committed_hashes.windows(2).all(|pair| pair[0] == pair[1]), "nodes disagreed on the committed block");

    for (_, handle, consensus_task, watchdog_task) in handles {
        handle.stop();
        let _ = consensus_task.await;
        watchdog_task.abort();
    }
}
