//! The reaper: a recurring task that expires empty idle rooms.

use std::time::{Duration, Instant};

use chrono::Utc;

use crate::domain::RoomId;

use super::GameServer;

/// Drift-free schedule targeting multiples of the interval since start.
///
/// `tokio::time::interval_at` with skipped missed ticks already aims at the
/// boundaries and catches up without tight-looping; this guard additionally
/// refuses to fire when a wakeup lands more than a second away from its
/// boundary (e.g. after a long suspend).
#[derive(Debug, Clone, Copy)]
pub struct ReaperSchedule {
    started_on: Instant,
    interval: Duration,
}

impl ReaperSchedule {
    #[must_use]
    pub fn new(started_on: Instant, interval: Duration) -> Self {
        Self {
            started_on,
            interval,
        }
    }

    /// Whether `now` is within one second of an interval boundary.
    #[must_use]
    pub fn should_fire(&self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.started_on);
        if elapsed < self.interval {
            return false;
        }
        let interval_ms = self.interval.as_millis().max(1);
        let rem_ms = elapsed.as_millis() % interval_ms;
        rem_ms <= 1000 || interval_ms - rem_ms <= 1000
    }
}

impl GameServer {
    /// Run the reaper forever. Spawned once at startup.
    pub async fn reaper_task(self: std::sync::Arc<Self>) {
        let interval = self.settings.reaper_interval;
        let started_on = Instant::now();
        let schedule = ReaperSchedule::new(started_on, interval);

        let mut ticker = tokio::time::interval_at(
            (started_on + interval).into(),
            interval,
        );
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if !schedule.should_fire(Instant::now()) {
                tracing::debug!("reaper wakeup off its boundary, skipping pass");
                continue;
            }
            self.reap_rooms().await;
        }
    }

    /// One reaper pass over every room persistence still considers alive.
    pub async fn reap_rooms(&self) {
        let records = match self.store.unended_rooms().await {
            Ok(records) => records,
            Err(err) => {
                tracing::error!(error = %err, "reaper failed to list rooms");
                return;
            }
        };

        let now = Utc::now();
        let delay = chrono::Duration::from_std(self.settings.room_deletion_delay)
            .unwrap_or_else(|_| chrono::Duration::seconds(i64::MAX));
        let mut removed: Vec<RoomId> = Vec::new();

        for record in records {
            if record.id == self.settings.lobby_id {
                continue;
            }

            match self.pool.get_room(record.id) {
                Err(_) => {
                    // Not in the pool: persisted by a previous process and
                    // lost to a crash.
                    if let Err(err) = self.store.mark_room_ended(record.id, now).await {
                        tracing::warn!(room_id = record.id, error = %err, "failed to end orphaned room");
                    } else {
                        tracing::info!(room_id = record.id, "marked orphaned room as ended");
                    }
                }
                Ok(room) => {
                    let idle_for = now - room.last_active_on;
                    if room.members.is_empty() && idle_for > delay {
                        match self.pool.remove_room(record.id) {
                            Ok(_) => {
                                if let Err(err) =
                                    self.store.mark_room_ended(record.id, now).await
                                {
                                    tracing::warn!(room_id = record.id, error = %err, "failed to end reaped room");
                                }
                                tracing::info!(room_id = record.id, "reaped empty idle room");
                                removed.push(record.id);
                            }
                            Err(err) => {
                                // Someone joined between the check and the
                                // removal.
                                tracing::debug!(room_id = record.id, error = %err, "skipping room no longer reapable");
                            }
                        }
                    }
                }
            }
        }

        let mut lobby = self.full_lobby_state();
        if let Some(rooms) = lobby.rooms.as_mut() {
            for room_id in removed {
                rooms.insert(room_id, None);
            }
        }
        self.connections.broadcast_lobby_state(lobby);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_fire_near_boundaries() {
        let start = Instant::now();
        let schedule = ReaperSchedule::new(start, Duration::from_secs(60));

        // Exactly on the boundary and just after it.
        assert!(schedule.should_fire(start + Duration::from_secs(60)));
        assert!(schedule.should_fire(start + Duration::from_millis(60_500)));
        // Just before the next boundary.
        assert!(schedule.should_fire(start + Duration::from_millis(119_500)));
        // Mid-interval wakeups are refused.
        assert!(!schedule.should_fire(start + Duration::from_secs(90)));
    }

    #[test]
    fn test_should_not_fire_before_first_interval() {
        let start = Instant::now();
        let schedule = ReaperSchedule::new(start, Duration::from_secs(60));
        assert!(!schedule.should_fire(start + Duration::from_millis(200)));
        assert!(!schedule.should_fire(start + Duration::from_secs(30)));
    }

    #[test]
    fn test_catch_up_after_long_stall_still_targets_boundaries() {
        let start = Instant::now();
        let schedule = ReaperSchedule::new(start, Duration::from_secs(60));

        // After a stall the next wakeup lands on a later multiple.
        assert!(schedule.should_fire(start + Duration::from_secs(300)));
        assert!(!schedule.should_fire(start + Duration::from_secs(330)));
    }
}
