use serde::{Deserialize, Serialize};

const INITIAL_HEALTH: u32 = 3;

/// Player progress carried from level to level and written into saves.
///
/// The serialized form is the `player_data` object of a save file. Every key is
/// required and unknown keys are rejected, so a save written by a different
/// build fails loudly instead of silently resetting progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerStats {
    pub health: u32,
    pub max_health: u32,
    pub coins: u32,
    /// Ids of collected message bottles, in pickup order.
    pub messages: Vec<String>,
}

impl PlayerStats {
    pub fn initial() -> Self {
        Self {
            health: INITIAL_HEALTH,
            max_health: INITIAL_HEALTH,
            coins: 0,
            messages: Vec::new(),
        }
    }

    pub fn from_value(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    /// Stats restored from a save must describe a living player.
    pub fn check_playable(&self) -> Result<(), String> {
        if self.health == 0 {
            return Err("health must be > 0".to_string());
        }
        if self.health > self.max_health {
            return Err(format!(
                "health {} exceeds max_health {}",
                self.health, self.max_health
            ));
        }
        Ok(())
    }

    pub fn heal(&mut self, amount: u32) {
        self.health = self.health.saturating_add(amount).min(self.max_health);
    }

    pub fn add_coin(&mut self) {
        self.coins = self.coins.saturating_add(1);
    }

    pub fn damage(&mut self, amount: u32) {
        self.health = self.health.saturating_sub(amount);
    }

    pub fn is_dead(&self) -> bool {
        self.health == 0
    }

    pub fn collect_message(&mut self, id: &str) {
        if !self.messages.iter().any(|m| m == id) {
            self.messages.push(id.to_string());
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "HP {}/{}  coins {}  bottles {}",
            self.health,
            self.max_health,
            self.coins,
            self.messages.len()
        )
    }
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self::initial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rehydrated_stats_match_fresh_shape() {
        let fresh = PlayerStats::initial();
        let value = serde_json::to_value(&fresh).expect("serialize");
        let back = PlayerStats::from_value(&value).expect("rehydrate");
        assert_eq!(back, fresh);
    }

    #[test]
    fn from_value_reads_all_fields() {
        let stats = PlayerStats::from_value(&json!({
            "health": 2,
            "max_health": 4,
            "coins": 17,
            "messages": ["bottle_a"]
        }))
        .expect("valid player data");
        assert_eq!(stats.health, 2);
        assert_eq!(stats.max_health, 4);
        assert_eq!(stats.coins, 17);
        assert_eq!(stats.messages, vec!["bottle_a".to_string()]);
    }

    #[test]
    fn from_value_rejects_missing_keys() {
        let err = PlayerStats::from_value(&json!({ "health": 2, "coins": 1, "messages": [] }))
            .expect_err("max_health is missing");
        assert!(err.to_string().contains("max_health"));
    }

    #[test]
    fn from_value_rejects_unknown_keys() {
        let err = PlayerStats::from_value(&json!({
            "health": 3,
            "max_health": 3,
            "coins": 0,
            "messages": [],
            "lives": 9
        }))
        .expect_err("unknown key");
        assert!(err.to_string().contains("lives"));
    }

    #[test]
    fn heal_caps_at_max_and_damage_floors_at_zero() {
        let mut stats = PlayerStats::initial();
        stats.damage(1);
        stats.heal(5);
        assert_eq!(stats.health, stats.max_health);
        stats.damage(10);
        assert_eq!(stats.health, 0);
        assert!(stats.is_dead());
    }

    #[test]
    fn heal_and_coins_saturate_at_u32_max() {
        let mut stats = PlayerStats::from_value(&json!({
            "health": u32::MAX,
            "max_health": u32::MAX,
            "coins": u32::MAX,
            "messages": []
        }))
        .expect("valid player data");
        stats.heal(1);
        stats.add_coin();
        assert_eq!(stats.health, u32::MAX);
        assert_eq!(stats.coins, u32::MAX);
    }

    #[test]
    fn check_playable_rejects_dead_or_overfull_health() {
        assert!(PlayerStats::initial().check_playable().is_ok());

        let mut dead = PlayerStats::initial();
        dead.health = 0;
        assert!(dead.check_playable().unwrap_err().contains("health must be > 0"));

        let mut overfull = PlayerStats::initial();
        overfull.health = 9;
        assert!(overfull
            .check_playable()
            .unwrap_err()
            .contains("exceeds max_health"));
    }

    #[test]
    fn collecting_the_same_message_twice_keeps_one_entry() {
        let mut stats = PlayerStats::initial();
        stats.collect_message("b1");
        stats.collect_message("b1");
        stats.collect_message("b2");
        assert_eq!(stats.messages, vec!["b1".to_string(), "b2".to_string()]);
    }
}
