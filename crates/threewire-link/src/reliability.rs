//! Sequence and acknowledgment bookkeeping.
//!
//! Naming follows the three-wire convention: `tx_ack` is the acknowledgment
//! number *we transmit*, i.e. the next sequence number we expect from the
//! peer; `rx_ack` is the acknowledgment number *we received*.

use threewire_frame::{Header, PacketType, SeqNum};

use crate::state::SeqCounters;

/// Verdict on one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    /// Reliable frame with the expected sequence number.
    Accepted,
    /// Unreliable frame; no sequencing applies.
    Unsequenced,
    /// Reliable frame with an unexpected sequence number; drop it.
    OutOfOrder {
        expected: SeqNum,
        /// The strike limit was reached; the caller must send SYNC_REQ.
        resync: bool,
    },
}

#[derive(Debug, Clone)]
pub struct Reliability {
    tx_seq: SeqNum,
    tx_ack: SeqNum,
    rx_ack: SeqNum,
    out_of_order: u32,
    max_out_of_order: u32,
    ack_pending: bool,
}

impl Reliability {
    pub fn new(max_out_of_order: u32) -> Self {
        Self {
            tx_seq: SeqNum::ZERO,
            tx_ack: SeqNum::ZERO,
            rx_ack: SeqNum::ZERO,
            out_of_order: 0,
            max_out_of_order: max_out_of_order.max(1),
            ack_pending: false,
        }
    }

    /// Apply the sequencing rules to an inbound frame header.
    ///
    /// Out-of-order frames are not recorded beyond the strike count: their
    /// ack field is ignored.
    pub fn on_inbound(&mut self, header: &Header) -> Inbound {
        if header.reliable {
            self.ack_pending = true;

            if header.seq != self.tx_ack {
                self.out_of_order += 1;
                let resync = self.out_of_order >= self.max_out_of_order;
                if resync {
                    self.out_of_order = 0;
                }
                return Inbound::OutOfOrder {
                    expected: self.tx_ack,
                    resync,
                };
            }

            self.tx_ack = self.tx_ack.next();
            self.out_of_order = 0;
            self.rx_ack = header.ack;
            return Inbound::Accepted;
        }

        self.rx_ack = header.ack;
        Inbound::Unsequenced
    }

    /// Build the header for the next outbound frame.
    ///
    /// Every frame carries the current `tx_ack`, which settles any pending
    /// acknowledgment. Reliable types consume a sequence number.
    pub fn next_outbound(&mut self, packet_type: PacketType, length: usize) -> Header {
        self.ack_pending = false;

        let reliable = packet_type.is_reliable();
        let seq = if reliable {
            let seq = self.tx_seq;
            self.tx_seq = self.tx_seq.next();
            seq
        } else {
            SeqNum::ZERO
        };

        Header::new(packet_type, reliable, seq, self.tx_ack, length)
    }

    /// An accepted or rejected reliable frame is waiting to be acknowledged.
    pub fn ack_pending(&self) -> bool {
        self.ack_pending
    }

    /// Claim the owed acknowledgment; the caller sends the ACK frame.
    pub fn take_ack_pending(&mut self) -> bool {
        std::mem::take(&mut self.ack_pending)
    }

    /// The peer restarted: both sequence spaces start over.
    pub fn peer_reset(&mut self) {
        self.tx_seq = SeqNum::ZERO;
        self.tx_ack = SeqNum::ZERO;
    }

    /// Back to the freshly constructed state.
    pub fn reset(&mut self) {
        *self = Self::new(self.max_out_of_order);
    }

    pub fn counters(&self) -> SeqCounters {
        SeqCounters {
            tx_seq: self.tx_seq,
            tx_ack: self.tx_ack,
            rx_ack: self.rx_ack,
            out_of_order: self.out_of_order,
        }
    }
}
