//! Client-driven ping/pong keepalive.

use std::time::Duration;

use tokio::time::Instant;

/// What to do on a heartbeat tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatAction {
    /// Send a ping.
    Ping,
    /// Too many pings went unanswered; treat the channel as dead.
    Dead {
        /// Consecutive unanswered pings.
        missed: u32,
    },
}

/// Tracks outstanding pings and round-trip times for one connection.
#[derive(Debug, Clone)]
pub struct HeartbeatTracker {
    /// Send time of the unanswered ping, if any.
    outstanding: Option<Instant>,
    missed: u32,
    max_missed: u32,
    last_rtt: Option<Duration>,
}

impl HeartbeatTracker {
    /// A tracker tolerating `max_missed` unanswered pings.
    pub fn new(max_missed: u32) -> Self {
        Self {
            outstanding: None,
            missed: 0,
            max_missed: max_missed.max(1),
            last_rtt: None,
        }
    }

    /// Called every heartbeat interval.
    pub fn on_tick(&mut self, now: Instant) -> HeartbeatAction {
        if self.outstanding.is_some() {
            self.missed += 1;
            if self.missed >= self.max_missed {
                return HeartbeatAction::Dead {
                    missed: self.missed,
                };
            }
        }
        self.outstanding = Some(now);
        HeartbeatAction::Ping
    }

    /// Called on a pong or server heartbeat. Returns the round trip when a
    /// ping was outstanding.
    pub fn on_pong(&mut self, now: Instant) -> Option<Duration> {
        self.missed = 0;
        let sent = self.outstanding.take()?;
        let rtt = now.saturating_duration_since(sent);
        self.last_rtt = Some(rtt);
        Some(rtt)
    }

    /// Consecutive unanswered pings.
    pub fn missed(&self) -> u32 {
        self.missed
    }

    /// Most recent round trip.
    pub fn last_rtt(&self) -> Option<Duration> {
        self.last_rtt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_pong_records_rtt() {
        let mut hb = HeartbeatTracker::new(3);
        assert_eq!(hb.on_tick(Instant::now()), HeartbeatAction::Ping);
        tokio::time::advance(Duration::from_millis(40)).await;
        assert_eq!(hb.on_pong(Instant::now()), Some(Duration::from_millis(40)));
        assert_eq!(hb.last_rtt(), Some(Duration::from_millis(40)));
        // Unsolicited heartbeat: nothing outstanding.
        assert_eq!(hb.on_pong(Instant::now()), None);
    }

    #[test]
    fn test_dead_after_max_missed() {
        let mut hb = HeartbeatTracker::new(3);
        let now = Instant::now();
        assert_eq!(hb.on_tick(now), HeartbeatAction::Ping);
        assert_eq!(hb.on_tick(now), HeartbeatAction::Ping);
        assert_eq!(hb.on_tick(now), HeartbeatAction::Ping);
        assert_eq!(hb.missed(), 2);
        assert_eq!(hb.on_tick(now), HeartbeatAction::Dead { missed: 3 });
    }

    #[test]
    fn test_pong_resets_missed() {
        let mut hb = HeartbeatTracker::new(2);
        let now = Instant::now();
        hb.on_tick(now);
        hb.on_tick(now);
        assert_eq!(hb.missed(), 1);
        hb.on_pong(now);
        assert_eq!(hb.missed(), 0);
        assert_eq!(hb.on_tick(now), HeartbeatAction::Ping);
    }
}
