//! Link establishment state machine.
//!
//! ```text
//! Uninitialized --SYNC_RESP--> Initialized --CONFIG_RESP--> Active
//!        ^                                                    |
//!        +------------- SYNC_REQ / SYNC_RESP while Active -----+
//! ```
//!
//! The machine is pure: it returns the messages to send and the events to
//! raise, and the engine performs them.

use threewire_frame::LinkMessage;

use crate::state::{LinkState, SleepState};

/// What the engine must do after a link-control message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlOutcome {
    /// Messages to transmit, in order.
    pub replies: Vec<LinkMessage>,
    /// The peer restarted while we were active; sequence numbers start over.
    pub peer_reset: bool,
    /// The handshake just completed; raise the init callback.
    pub init_complete: bool,
}

impl ControlOutcome {
    fn reply(msg: LinkMessage) -> Self {
        Self {
            replies: vec![msg],
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct LinkControl {
    state: LinkState,
    sleep: SleepState,
    local_window: u8,
    tx_win: u8,
    /// Cleared once the init callback fired for the current handshake.
    init_armed: bool,
}

impl LinkControl {
    pub fn new(local_window: u8) -> Self {
        Self {
            state: LinkState::Uninitialized,
            sleep: SleepState::Awake,
            local_window,
            tx_win: local_window,
            init_armed: true,
        }
    }

    /// Forget everything learned from the peer.
    pub fn reset(&mut self) {
        *self = Self::new(self.local_window);
    }

    /// Treat the peer as restarted.
    pub fn peer_reset(&mut self) {
        self.state = LinkState::Uninitialized;
        self.init_armed = true;
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn sleep_state(&self) -> SleepState {
        self.sleep
    }

    /// The negotiated send window.
    pub fn tx_window(&self) -> u8 {
        self.tx_win
    }

    pub fn is_active(&self) -> bool {
        self.state == LinkState::Active
    }

    fn config_req(&self) -> LinkMessage {
        LinkMessage::ConfigReq {
            window: self.tx_win,
        }
    }

    /// Advance the state machine on one recognized message.
    pub fn handle(&mut self, msg: LinkMessage) -> ControlOutcome {
        match msg {
            LinkMessage::SyncReq => {
                let peer_reset = self.is_active();
                if peer_reset {
                    self.peer_reset();
                }
                ControlOutcome {
                    replies: vec![LinkMessage::SyncResp],
                    peer_reset,
                    init_complete: false,
                }
            }
            LinkMessage::SyncResp => {
                let peer_reset = self.is_active();
                if peer_reset {
                    self.peer_reset();
                }
                self.state = LinkState::Initialized;
                self.init_armed = true;
                ControlOutcome {
                    replies: vec![self.config_req()],
                    peer_reset,
                    init_complete: false,
                }
            }
            LinkMessage::ConfigReq { .. } => {
                let mut replies = vec![LinkMessage::ConfigResp { window: None }];
                // Our own CONFIG_RESP may have been lost; ask again until active.
                if !self.is_active() {
                    replies.push(self.config_req());
                }
                ControlOutcome {
                    replies,
                    ..ControlOutcome::default()
                }
            }
            LinkMessage::ConfigResp { window } => {
                match window {
                    Some(w) if w >= 1 => self.tx_win = w,
                    Some(w) => tracing::debug!(window = w, "ignoring zero window in CONFIG_RESP"),
                    None => {}
                }
                self.state = LinkState::Active;

                let init_complete = self.init_armed;
                self.init_armed = false;
                if init_complete {
                    tracing::debug!(tx_win = self.tx_win, "three-wire init complete");
                }
                ControlOutcome {
                    init_complete,
                    ..ControlOutcome::default()
                }
            }
            LinkMessage::SleepReq => {
                tracing::debug!("peer went to sleep");
                self.sleep = SleepState::Sleeping;
                ControlOutcome::default()
            }
            LinkMessage::WokenReq => {
                tracing::debug!("peer woke up");
                self.sleep = SleepState::Awake;
                ControlOutcome::default()
            }
            LinkMessage::WakeupReq => {
                tracing::debug!("peer requested wakeup");
                self.sleep = SleepState::Awake;
                ControlOutcome::reply(LinkMessage::WokenReq)
            }
        }
    }
}
