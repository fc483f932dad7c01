//! Fixtures shared by end-to-end scenario tests: a deterministic keypair
//! generator and an in-process [`fixtures::InMemoryBackend`] that wires
//! `tmbft-engine`'s dispatcher directly to peer dispatchers, without a real
//! network.

pub mod fixtures;
