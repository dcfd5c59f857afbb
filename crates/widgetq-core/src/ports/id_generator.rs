//! IdGenerator port - message id と receipt handle の生成
//!
//! # 実装
//! - **UlidGenerator**: Clock + 乱数による ULID（時刻でソート可能）
//!
//! 1 つの generator が返す ID は単調増加します。同じミリ秒内では前の ID を
//! increment するので、spool queue のファイル名順は同じ generator から見た送信順と一致します。

use std::sync::Mutex;
use std::time::SystemTime;

use ulid::{Generator, Ulid};

use crate::ports::Clock;

/// IdGenerator は分散環境で衝突しない ID を生成
pub trait IdGenerator: Send + Sync {
    /// Identifies a message for its whole life in a queue.
    fn message_id(&self) -> Ulid;

    /// Identifies one receipt of a message. A redelivery gets a new handle.
    fn receipt_handle(&self) -> Ulid;
}

/// UlidGenerator は ULID ベースの ID 生成器
pub struct UlidGenerator<C> {
    clock: C,
    generator: Mutex<Generator>,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            generator: Mutex::new(Generator::new()),
        }
    }

    fn next(&self) -> Ulid {
        let now = self.clock.now();
        let mut generator = self.generator.lock().unwrap_or_else(|e| e.into_inner());
        match generator.generate_from_datetime(SystemTime::from(now)) {
            Ok(id) => id,
            // 80 random bits exhausted within one millisecond
            Err(e) => {
                tracing::warn!(error = %e, "monotonic id overflow; falling back to a random id");
                Ulid::from_parts(now.timestamp_millis().max(0) as u64, rand::random())
            }
        }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn message_id(&self) -> Ulid {
        self.next()
    }

    fn receipt_handle(&self) -> Ulid {
        self.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    #[test]
    fn ulid_generator_generates_unique_ids() {
        let id_gen = UlidGenerator::new(SystemClock);
        let id1 = id_gen.message_id();
        let id2 = id_gen.message_id();
        let handle = id_gen.receipt_handle();
        assert_ne!(id1, id2);
        assert_ne!(id1, handle);
    }

    #[test]
    fn ulid_generator_uses_clock_timestamp() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let id1 = id_gen.message_id();
        let id2 = id_gen.receipt_handle();

        // ランダム部分があるので ID は異なるが、timestamp は同じ
        assert_ne!(id1, id2);
        assert_eq!(id1.timestamp_ms(), fixed_time.timestamp_millis() as u64);
        assert_eq!(id2.timestamp_ms(), fixed_time.timestamp_millis() as u64);
    }

    #[test]
    fn ids_within_one_millisecond_are_strictly_increasing() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let ids: Vec<Ulid> = (0..1000)
            .map(|i| {
                if i % 2 == 0 {
                    id_gen.message_id()
                } else {
                    id_gen.receipt_handle()
                }
            })
            .collect();

        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(
            ids.iter()
                .all(|id| id.timestamp_ms() == fixed_time.timestamp_millis() as u64)
        );
    }

    #[test]
    fn clock_moving_backwards_keeps_ids_increasing() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(FixedClock::new(start));
        let id_gen = UlidGenerator::new(Arc::clone(&clock));

        clock.advance(chrono::Duration::seconds(5));
        let later = id_gen.message_id();
        clock.set(start);
        let after_rewind = id_gen.message_id();

        assert!(later < after_rewind);
    }
}
