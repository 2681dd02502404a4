//! Agent selection for auto-assignment
//!
//! Filters the agent pool down to eligible candidates and picks the one
//! nearest to the shipment's delivery point. Agents without a known
//! position can still be selected when no positioned candidate exists.

use shared::{AgentProfile, GeoPoint};

use crate::utils::geo::haversine_km;

/// Pick an agent for a pending shipment.
///
/// Eligibility: online, available, KYC-approved, active. Among eligible
/// agents with a known last position, the one minimizing great-circle
/// distance to `target` wins; ties keep the earlier candidate. Without a
/// target or without any positioned agent, the first eligible agent is
/// used.
pub fn select_agent(agents: &[AgentProfile], target: Option<GeoPoint>) -> Option<&AgentProfile> {
    let eligible: Vec<&AgentProfile> = agents.iter().filter(|a| a.is_eligible()).collect();
    if eligible.is_empty() {
        return None;
    }

    if let Some(target) = target {
        let mut nearest: Option<(&AgentProfile, f64)> = None;
        for &agent in &eligible {
            if let Some(ping) = &agent.last_location {
                let d = haversine_km(ping.point, target);
                match nearest {
                    Some((_, best)) if d >= best => {}
                    _ => nearest = Some((agent, d)),
                }
            }
        }
        if let Some((agent, distance)) = nearest {
            tracing::debug!(
                agent_id = %agent.agent_id,
                distance_km = distance,
                "Nearest agent selected"
            );
            return Some(agent);
        }
    }

    // No coordinates on either side: fall back to the first eligible agent
    eligible.first().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::agent::LocationPing;
    use shared::{AgentStatus, KycStatus, VehicleType};

    fn eligible_agent(id: &str, location: Option<GeoPoint>) -> AgentProfile {
        let mut agent = AgentProfile::new(id, VehicleType::Bike, "south");
        agent.kyc_status = KycStatus::Approved;
        agent.status = AgentStatus::Active;
        agent.is_online = true;
        agent.is_available = true;
        agent.last_location = location.map(|point| LocationPing {
            point,
            timestamp: 0,
        });
        agent
    }

    // Delivery point used throughout: 0.01 deg of latitude is ~1.11 km
    fn target() -> GeoPoint {
        GeoPoint::new(12.9000, 77.6000)
    }

    #[test]
    fn picks_nearest_agent() {
        // A at ~4.2 km, B at ~1.1 km
        let a = eligible_agent("agent-a", Some(GeoPoint::new(12.9378, 77.6000)));
        let b = eligible_agent("agent-b", Some(GeoPoint::new(12.9099, 77.6000)));
        let agents = [a, b];
        let chosen = select_agent(&agents, Some(target())).unwrap();
        assert_eq!(chosen.agent_id, "agent-b");
    }

    #[test]
    fn skips_ineligible_agents() {
        let mut close = eligible_agent("agent-close", Some(GeoPoint::new(12.9010, 77.6000)));
        close.is_available = false;
        let far = eligible_agent("agent-far", Some(GeoPoint::new(12.9500, 77.6000)));
        let agents = [close, far];
        let chosen = select_agent(&agents, Some(target())).unwrap();
        assert_eq!(chosen.agent_id, "agent-far");
    }

    #[test]
    fn tie_keeps_first_seen() {
        let p = GeoPoint::new(12.9100, 77.6000);
        let a = eligible_agent("agent-a", Some(p));
        let b = eligible_agent("agent-b", Some(p));
        let agents = [a, b];
        let chosen = select_agent(&agents, Some(target())).unwrap();
        assert_eq!(chosen.agent_id, "agent-a");
    }

    #[test]
    fn falls_back_to_first_without_positions() {
        let a = eligible_agent("agent-a", None);
        let b = eligible_agent("agent-b", None);
        let agents = [a, b];
        let chosen = select_agent(&agents, Some(target())).unwrap();
        assert_eq!(chosen.agent_id, "agent-a");
    }

    #[test]
    fn falls_back_without_target() {
        let a = eligible_agent("agent-a", Some(GeoPoint::new(12.95, 77.6)));
        let agents = [a];
        let chosen = select_agent(&agents, None).unwrap();
        assert_eq!(chosen.agent_id, "agent-a");
    }

    #[test]
    fn none_when_pool_is_empty() {
        assert!(select_agent(&[], Some(target())).is_none());
        let mut suspended = eligible_agent("agent-a", None);
        suspended.status = AgentStatus::Suspended;
        assert!(select_agent(&[suspended], Some(target())).is_none());
    }
}
