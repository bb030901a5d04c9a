//! Liveness Monitor, §4.5. Pure functions of stored timestamps and
//! configured windows; no background task is required for correctness, only
//! for proactively flipping a persisted `Service.status` (§4.5, §9).

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use crate::models::{Agent, AgentLiveness, Availability, ServiceStatus};

#[derive(Debug, Clone, Copy)]
pub struct LivenessWindows {
    pub agent_online_seconds: i64,
    pub agent_recent_seconds: i64,
    pub service_stale_seconds: i64,
}

impl Default for LivenessWindows {
    fn default() -> Self {
        Self {
            agent_online_seconds: 300,
            agent_recent_seconds: 3600,
            service_stale_seconds: 90,
        }
    }
}

/// §4.5 agent liveness buckets, derived from `last_seen`.
pub fn agent_liveness(last_seen: DateTime<Utc>, now: DateTime<Utc>, windows: LivenessWindows) -> AgentLiveness {
    let age = now - last_seen;
    if age <= ChronoDuration::seconds(windows.agent_online_seconds) {
        AgentLiveness::Online
    } else if age <= ChronoDuration::seconds(windows.agent_recent_seconds) {
        AgentLiveness::RecentlyActive
    } else {
        AgentLiveness::Offline
    }
}

/// §4.5 availability-for-assignment classification.
pub fn agent_availability(agent: &Agent, now: DateTime<Utc>, windows: LivenessWindows) -> Availability {
    if agent.current_task_id.is_some() {
        return Availability::Working;
    }
    match agent_liveness(agent.last_seen, now, windows) {
        AgentLiveness::Online => Availability::Idle,
        _ => Availability::Offline,
    }
}

/// §4.5 service liveness. `persisted_status` is whatever is currently stored;
/// `ping_url` indicates a probe is configured (the probe's result, if it has
/// run, should already be folded into `persisted_status` before calling
/// this — this function only covers the staleness-without-probe rule and the
/// "heartbeats re-assert up" rule is handled by the store on heartbeat).
pub fn service_liveness(
    persisted_status: ServiceStatus,
    last_heartbeat: DateTime<Utc>,
    now: DateTime<Utc>,
    windows: LivenessWindows,
) -> ServiceStatus {
    if persisted_status == ServiceStatus::Starting {
        return ServiceStatus::Starting;
    }
    let age = now - last_heartbeat;
    if age > ChronoDuration::seconds(windows.service_stale_seconds) {
        ServiceStatus::Down
    } else {
        persisted_status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConnectionType, Level, Role};
    use chrono::TimeZone;

    fn agent_at(last_seen: DateTime<Utc>) -> Agent {
        Agent {
            agent_id: "a1".into(),
            project_id: 1,
            role: Role::BackendDev,
            level: Level::Senior,
            connection_type: ConnectionType::Client,
            last_seen,
            current_task_id: None,
        }
    }

    #[test]
    fn online_within_five_minutes() {
        let now = Utc.timestamp_opt(10_000, 0).unwrap();
        let last_seen = now - ChronoDuration::minutes(3);
        assert_eq!(
            agent_liveness(last_seen, now, LivenessWindows::default()),
            AgentLiveness::Online
        );
    }

    #[test]
    fn recently_active_between_five_min_and_one_hour() {
        let now = Utc.timestamp_opt(10_000, 0).unwrap();
        let last_seen = now - ChronoDuration::minutes(30);
        assert_eq!(
            agent_liveness(last_seen, now, LivenessWindows::default()),
            AgentLiveness::RecentlyActive
        );
    }

    #[test]
    fn offline_past_one_hour() {
        let now = Utc.timestamp_opt(10_000, 0).unwrap();
        let last_seen = now - ChronoDuration::hours(2);
        assert_eq!(
            agent_liveness(last_seen, now, LivenessWindows::default()),
            AgentLiveness::Offline
        );
    }

    #[test]
    fn working_agent_is_never_idle() {
        let now = Utc.timestamp_opt(10_000, 0).unwrap();
        let mut agent = agent_at(now);
        agent.current_task_id = Some(7);
        assert_eq!(
            agent_availability(&agent, now, LivenessWindows::default()),
            Availability::Working
        );
    }

    #[test]
    fn s4_service_staleness_flips_to_down_without_ping_url() {
        let t0 = Utc.timestamp_opt(0, 0).unwrap();
        let last_heartbeat = t0 + ChronoDuration::seconds(10);
        let now = t0 + ChronoDuration::seconds(120);
        let windows = LivenessWindows {
            service_stale_seconds: 90,
            ..Default::default()
        };
        assert_eq!(
            service_liveness(ServiceStatus::Up, last_heartbeat, now, windows),
            ServiceStatus::Down
        );
    }

    #[test]
    fn fresh_heartbeat_keeps_persisted_status() {
        let now = Utc.timestamp_opt(1000, 0).unwrap();
        let last_heartbeat = now - ChronoDuration::seconds(5);
        assert_eq!(
            service_liveness(ServiceStatus::Up, last_heartbeat, now, LivenessWindows::default()),
            ServiceStatus::Up
        );
    }
}
