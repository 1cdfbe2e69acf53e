//! The leveling engine. Maps cumulative points to a level, a display name,
//! and in-level progress.
//!
//! [`TIERS`] is the single source of truth for thresholds and names. Nothing
//! else in the workspace hardcodes a threshold.

use serde::{Deserialize, Serialize};

// ─── Table ───────────────────────────────────────────────────────────────────

/// One row of the level table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelTier {
  pub level:       u8,
  pub name:        &'static str,
  /// Lowest point total that reaches this level.
  pub base_points: u32,
}

/// Ascending by `base_points`. The first tier must start at zero.
pub const TIERS: [LevelTier; 4] = [
  LevelTier { level: 1, name: "Novice Cook",     base_points: 0 },
  LevelTier { level: 2, name: "Apprentice Chef", base_points: 50 },
  LevelTier { level: 3, name: "Sous Chef",       base_points: 150 },
  LevelTier { level: 4, name: "Head Chef",       base_points: 300 },
];

/// Returned by [`level_name`] for levels outside the table.
pub const UNKNOWN_LEVEL: &str = "Unknown Level";

fn tier(level: u8) -> Option<&'static LevelTier> {
  TIERS.iter().find(|t| t.level == level)
}

// ─── Lookups ─────────────────────────────────────────────────────────────────

/// The highest level whose base threshold is `<= points`.
pub fn level_for(points: u32) -> u8 {
  TIERS
    .iter()
    .rev()
    .find(|t| t.base_points <= points)
    .map_or(TIERS[0].level, |t| t.level)
}

pub fn level_name(level: u8) -> &'static str {
  tier(level).map_or(UNKNOWN_LEVEL, |t| t.name)
}

/// Lower threshold of `level`; unknown levels report `0`.
pub fn base_points(level: u8) -> u32 { tier(level).map_or(0, |t| t.base_points) }

/// The threshold that promotes a user out of `level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "points", rename_all = "snake_case")]
pub enum NextLevel {
  /// Reaching this many points moves the user up one level.
  At(u32),
  /// `level` is the top of the table.
  Max,
}

pub fn points_for_next_level(level: u8) -> NextLevel {
  TIERS
    .iter()
    .position(|t| t.level == level)
    .and_then(|i| TIERS.get(i + 1))
    .map_or(NextLevel::Max, |next| NextLevel::At(next.base_points))
}

// ─── Progress ────────────────────────────────────────────────────────────────

/// Display projection of a point total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
  pub level:       u8,
  pub level_name:  String,
  pub points:      u32,
  pub base_points: u32,
  pub next_level:  NextLevel,
  /// Fraction of the current level completed, in `[0, 1]`. Always `1.0` at
  /// the top level.
  pub fraction:    f64,
}

impl Progress {
  pub fn for_points(points: u32) -> Self {
    let level = level_for(points);
    let base = base_points(level);
    let next_level = points_for_next_level(level);

    let fraction = match next_level {
      NextLevel::Max => 1.0,
      NextLevel::At(ceiling) if ceiling <= base => 1.0,
      NextLevel::At(ceiling) => {
        let earned = f64::from(points.saturating_sub(base));
        let span = f64::from(ceiling - base);
        (earned / span).clamp(0.0, 1.0)
      }
    };

    Self {
      level,
      level_name: level_name(level).to_owned(),
      points,
      base_points: base,
      next_level,
      fraction,
    }
  }
}
