use threewire_frame::MAX_WINDOW;

/// Default advertised sliding window.
pub const DEFAULT_TX_WINDOW: u8 = 4;

/// Default receive queue depth.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Consecutive out-of-order reliable frames that trigger a resync.
pub const DEFAULT_MAX_OUT_OF_ORDER: u32 = 3;

/// Configuration for one [`H5Link`](crate::H5Link).
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Window advertised in CONFIG_REQ. Clamped to `1..=7`.
    pub tx_window: u8,
    /// Slots in the receive queue between intake and worker. At least 1.
    pub queue_capacity: usize,
    /// Out-of-order strikes before a fresh SYNC_REQ. At least 1.
    pub max_out_of_order: u32,
    /// Thread name of the delivery worker.
    pub worker_name: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            tx_window: DEFAULT_TX_WINDOW,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_out_of_order: DEFAULT_MAX_OUT_OF_ORDER,
            worker_name: "h5-worker".to_string(),
        }
    }
}

impl LinkConfig {
    pub(crate) fn window(&self) -> u8 {
        self.tx_window.clamp(1, MAX_WINDOW)
    }

    pub(crate) fn capacity(&self) -> usize {
        self.queue_capacity.max(1)
    }

    pub(crate) fn out_of_order_limit(&self) -> u32 {
        self.max_out_of_order.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = LinkConfig::default();
        assert_eq!(cfg.window(), 4);
        assert_eq!(cfg.capacity(), 10);
        assert_eq!(cfg.out_of_order_limit(), 3);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let cfg = LinkConfig {
            tx_window: 0,
            queue_capacity: 0,
            max_out_of_order: 0,
            ..LinkConfig::default()
        };
        assert_eq!(cfg.window(), 1);
        assert_eq!(cfg.capacity(), 1);
        assert_eq!(cfg.out_of_order_limit(), 1);

        let cfg = LinkConfig {
            tx_window: 12,
            ..LinkConfig::default()
        };
        assert_eq!(cfg.window(), 7);
    }
}
