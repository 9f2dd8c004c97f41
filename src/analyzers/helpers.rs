//! This module contains helper methods that are used in different analyzers.

use crate::gamedata::{self, FRAME_RATE_HZ};

/// Format a frame count as `mm:ss`.
///
/// A missing frame formats as `00:00`.
pub fn frame_to_time(frame: Option<u64>) -> String {
    let total_secs = frame.unwrap_or(0) / FRAME_RATE_HZ;
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

/// Convert a frame count to seconds.
pub fn frame_to_seconds(frame: Option<u64>) -> f64 {
    frame.unwrap_or(0) as f64 / FRAME_RATE_HZ as f64
}

/// Human-friendly name for a research/upgrade capability.
///
/// Falls back to a generic rewrite of the diagnostic name when no table
/// entry exists.
pub fn humanize_upgrade(name: &str) -> String {
    if let Some(friendly) = gamedata::upgrade_friendly_name(name) {
        return friendly.to_owned();
    }
    name.replace('_', " ").replace("MorphTo", "Upgrade to ")
}

/// Human-friendly name for a stormgate reward capability.
///
/// Falls back to parsing the `TierN<Name>` shape out of the diagnostic
/// name.
pub fn humanize_reward(name: &str) -> String {
    if let Some(friendly) = gamedata::reward_friendly_name(name) {
        return friendly.to_owned();
    }
    let clean = name
        .strip_prefix(gamedata::REWARD_CREATE_PREFIX)
        .unwrap_or(name);
    match parse_tier(clean) {
        Some(friendly) => friendly,
        None => clean.to_owned(),
    }
}

fn parse_tier(clean: &str) -> Option<String> {
    let rest = clean.strip_prefix("Tier")?;
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    let name = &rest[digits.len()..];
    if name.is_empty() {
        return None;
    }
    Some(format!("Tier {}: {}", digits, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_to_time() {
        assert_eq!(frame_to_time(Some(0)), "00:00");
        assert_eq!(frame_to_time(Some(60 * 1024)), "01:00");
        assert_eq!(frame_to_time(Some(150 * 1024)), "02:30");
        assert_eq!(frame_to_time(None), "00:00");
    }

    #[test]
    fn test_frame_to_seconds() {
        assert_eq!(frame_to_seconds(Some(0)), 0.0);
        assert_eq!(frame_to_seconds(Some(1024)), 1.0);
        assert_eq!(frame_to_seconds(None), 0.0);
    }

    #[test]
    fn test_humanize_upgrade() {
        assert_eq!(humanize_upgrade("MorphToHQTier2"), "Upgrade to HQ Tier 2");
        assert_eq!(
            humanize_upgrade("MorphToElderShrine"),
            "Upgrade to ElderShrine"
        );
        assert_eq!(
            humanize_upgrade("Hellforge_Research"),
            "Hellforge Research"
        );
        assert_eq!(humanize_upgrade("Some_Other_Research"), "Some Other Research");
    }

    #[test]
    fn test_humanize_reward() {
        assert_eq!(
            humanize_reward("StormgateAbilityCreateTier1Healer"),
            "Tier 1: Healer"
        );
        assert_eq!(
            humanize_reward("StormgateAbilityCreateTier2Golem"),
            "Tier 2: Golem"
        );
        assert_eq!(
            humanize_reward("StormgateAbilityCreateSomething"),
            "Something"
        );
    }
}
