use serde::Serialize;

/// Inbound frame counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RxStats {
    /// Frames that decoded and passed the checksum.
    pub good: u64,
    /// Frames that unstuffed but failed the checksum or were too short.
    pub checksum_fail: u64,
    /// Frames whose stuffing was malformed.
    pub decode_fail: u64,
    /// Frames that overran the accumulation buffer.
    pub oversized: u64,
}

impl RxStats {
    /// Total number of frame boundaries seen.
    pub fn total(&self) -> u64 {
        self.good + self.checksum_fail + self.decode_fail + self.oversized
    }
}

/// Outbound frame counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TxStats {
    /// Frames queued in full.
    pub good: u64,
    /// Frames dropped because the outbound queue was full.
    pub no_buffer_space: u64,
    /// Payloads rejected for exceeding the maximum message size.
    pub oversized: u64,
}

/// Both directions of one link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    pub rx: RxStats,
    pub tx: TxStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rx_total_sums_all_outcomes() {
        let rx = RxStats {
            good: 3,
            checksum_fail: 2,
            decode_fail: 1,
            oversized: 4,
        };
        assert_eq!(rx.total(), 10);
    }

    #[test]
    fn serializes_nested() {
        let stats = LinkStats::default();
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["rx"]["checksum_fail"], 0);
        assert_eq!(json["tx"]["no_buffer_space"], 0);
    }
}
