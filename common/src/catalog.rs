use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reward {
    pub id: u32,
    pub name: &'static str,
    pub cost: u64,
    pub icon: &'static str,
    pub description: &'static str,
}

pub const REWARDS: [Reward; 3] = [
    Reward {
        id: 1,
        name: "Premium Coffee",
        cost: 10,
        icon: "☕",
        description: "Start your day with energy",
    },
    Reward {
        id: 2,
        name: "20% Discount",
        cost: 50,
        icon: "🏷️",
        description: "Save on your next purchase",
    },
    Reward {
        id: 3,
        name: "Free Hoodie",
        cost: 100,
        icon: "👕",
        description: "Exclusive community swag",
    },
];

pub fn find_reward(id: u32) -> Option<&'static Reward> {
    REWARDS.iter().find(|r| r.id == id)
}

/// How close a balance is to a reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardProgress {
    pub can_afford: bool,
    pub missing: u64,
    /// 0..=100
    pub percent: u8,
}

impl RewardProgress {
    pub fn new(balance: i64, cost: u64) -> Self {
        let balance = u64::try_from(balance).unwrap_or(0);
        let percent = if cost == 0 {
            100
        } else {
            (balance.saturating_mul(100) / cost).min(100) as u8
        };
        Self {
            can_afford: balance >= cost,
            missing: cost.saturating_sub(balance),
            percent,
        }
    }
}
