use serde::Serialize;
use threewire_frame::SeqNum;

/// Link establishment progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    /// No SYNC exchange completed yet (or the peer restarted).
    #[default]
    Uninitialized,
    /// SYNC answered, CONFIG exchange in progress.
    Initialized,
    /// Handshake complete; application packets flow.
    Active,
}

/// Peer power state as announced by SLEEP/WOKEN/WAKEUP messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepState {
    #[default]
    Awake,
    Sleeping,
}

/// Snapshot of the sequence counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeqCounters {
    /// Sequence number of our next reliable frame.
    pub tx_seq: SeqNum,
    /// Next sequence number we expect from the peer (sent as our ack).
    pub tx_ack: SeqNum,
    /// Last acknowledgment number received from the peer.
    pub rx_ack: SeqNum,
    /// Consecutive out-of-order reliable frames.
    pub out_of_order: u32,
}

impl Serialize for SeqCounters {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut s = serializer.serialize_struct("SeqCounters", 4)?;
        s.serialize_field("tx_seq", &self.tx_seq.get())?;
        s.serialize_field("tx_ack", &self.tx_ack.get())?;
        s.serialize_field("rx_ack", &self.rx_ack.get())?;
        s.serialize_field("out_of_order", &self.out_of_order)?;
        s.end()
    }
}
