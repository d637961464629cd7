pub const MAX_LIVES: u8 = 5;

/// Consecutive flawless segments needed for a bonus life.
pub const LIFE_BONUS_STREAK: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreakUpdate {
    pub streak: u32,
    pub lives: u8,
    pub life_gained: bool,
}

pub fn clamp_starting_lives(lives: u8) -> u8 {
    lives.clamp(1, MAX_LIVES)
}

pub fn lose_life(lives: u8) -> u8 {
    lives.saturating_sub(1)
}

pub fn apply_segment_result(streak: u32, lives: u8, flawless: bool) -> StreakUpdate {
    if !flawless {
        return StreakUpdate {
            streak: 0,
            lives,
            life_gained: false,
        };
    }

    let streak = streak + 1;
    let earned = streak % LIFE_BONUS_STREAK == 0;
    let new_lives = if earned {
        (lives + 1).min(MAX_LIVES)
    } else {
        lives
    };

    StreakUpdate {
        streak,
        lives: new_lives,
        life_gained: new_lives > lives,
    }
}
