use chrono::{DateTime, Utc};
use folio_core::Position;
use serde::{Deserialize, Serialize};

/// Frozen snapshot of positions taken when the first transaction is
/// recorded. Replay always starts from this seed, never from previously
/// reconstructed output, so reconstruction stays idempotent. The owner
/// drops the baseline when the transaction log empties, restoring the
/// pre-transaction positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Baseline {
    pub positions: Vec<Position>,
    pub captured_at: DateTime<Utc>,
}

impl Baseline {
    pub fn capture(positions: &[Position]) -> Self {
        Self {
            positions: positions.to_vec(),
            captured_at: Utc::now(),
        }
    }
}
