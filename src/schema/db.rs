use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct Report {
    pub id: Uuid,
    pub ign: String,
    pub uid: String,
    pub hack_type: HackType,
    pub description: String,
    pub proof_urls: Vec<String>,
    pub upvotes: i32,
    pub downvotes: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize, Debug, Clone, FromRow)]
pub struct Vote {
    pub id: Uuid,
    pub report_id: Uuid,
    pub user_fingerprint: String,
    pub vote_type: VoteType,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "hack_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum HackType {
    Aimbot,
    Wallhack,
    Speedhack,
    Autoshoot,
    Teleport,
    GodMode,
    UnlimitedAmmo,
    #[default]
    Other,
}

impl HackType {
    pub const ALL: [HackType; 8] = [
        HackType::Aimbot,
        HackType::Wallhack,
        HackType::Speedhack,
        HackType::Autoshoot,
        HackType::Teleport,
        HackType::GodMode,
        HackType::UnlimitedAmmo,
        HackType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HackType::Aimbot => "aimbot",
            HackType::Wallhack => "wallhack",
            HackType::Speedhack => "speedhack",
            HackType::Autoshoot => "autoshoot",
            HackType::Teleport => "teleport",
            HackType::GodMode => "god_mode",
            HackType::UnlimitedAmmo => "unlimited_ammo",
            HackType::Other => "other",
        }
    }

    /// Human-readable name shown on report cards.
    pub fn label(&self) -> &'static str {
        match self {
            HackType::Aimbot => "Auto Aim",
            HackType::Wallhack => "See Through Walls",
            HackType::Speedhack => "Super Speed",
            HackType::Autoshoot => "Auto Shoot",
            HackType::Teleport => "Teleport",
            HackType::GodMode => "God Mode",
            HackType::UnlimitedAmmo => "Unlimited Ammo",
            HackType::Other => "Other",
        }
    }

    pub fn parse(value: &str) -> Option<HackType> {
        HackType::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

impl fmt::Display for HackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "vote_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Upvote,
    Downvote,
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteType::Upvote => f.write_str("upvote"),
            VoteType::Downvote => f.write_str("downvote"),
        }
    }
}
