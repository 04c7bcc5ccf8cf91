//! # Audio Module
//!
//! Per-guild playback core for Encore.
//!
//! This module owns everything with real state: the queue, the playback
//! state machine and the boundary to the external audio node.
//!
//! ## Architecture
//!
//! ### [`session`] - Sessions & Registry
//! - One [`session::GuildSession`] per guild: queue + playback state behind
//!   a single async lock
//! - Process-wide [`session::SessionRegistry`] mapping guild → session
//!
//! ### [`queue`] - Queue Management
//! - FIFO queue with shuffle, clear and duplicate removal
//! - Capacity-bounded, snapshot-based display access
//!
//! ### [`player`] - Orchestration
//! - [`player::PlayerManager`] translates commands into state transitions
//!   and bounded calls into the audio node
//! - Consumes the node's event stream and advances the queue per loop mode
//!
//! ### [`node`] - External Audio Node
//! - [`node::AudioNode`] contract (connect, play, pause, position, events)
//! - [`node::SongbirdNode`] production implementation over the voice driver
//!
//! ## Concurrency
//!
//! Commands and node events run on the shared tokio worker pool. Everything
//! that touches one guild's state is serialized by that session's lock; the
//! lock is held across the node call, which is bounded by a timeout so a
//! stalled node can never freeze other guilds.

pub mod node;
pub mod player;
pub mod queue;
pub mod session;
pub mod track;
