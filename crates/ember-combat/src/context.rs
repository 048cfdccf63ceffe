//! The transient per-hit record threaded through the combat pipeline.

/// Why an entity died, as reported to the base simulation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeathReason {
    /// Index of a non-entity damage source (environmental, debuff tick, ...).
    pub source_other_index: Option<i32>,
    /// Replacement death text. Takes priority over any source-derived text.
    pub custom_reason: Option<String>,
}

impl DeathReason {
    pub fn from_other(index: i32) -> Self {
        Self {
            source_other_index: Some(index),
            custom_reason: None,
        }
    }

    pub fn custom(text: impl Into<String>) -> Self {
        Self {
            source_other_index: None,
            custom_reason: Some(text.into()),
        }
    }
}

/// One hit, as seen by every pipeline stage in turn.
#[derive(Debug, Clone, PartialEq)]
pub struct DamageContext {
    /// Raw damage before PreDamage; final damage afterwards.
    pub damage: i32,
    /// -1, 0, or 1.
    pub hit_direction: i32,
    pub crit: bool,
    pub pvp: bool,
    pub quiet: bool,
    /// Set by a PreDamage override. The base mitigation formula is skipped.
    pub custom_damage: bool,
    pub play_sound: bool,
    pub gen_gore: bool,
    pub death_reason: DeathReason,
}

impl DamageContext {
    /// A plain hit of `damage` with default presentation flags.
    pub fn new(damage: i32, hit_direction: i32) -> Self {
        Self {
            damage,
            hit_direction,
            crit: false,
            pvp: false,
            quiet: false,
            custom_damage: false,
            play_sound: true,
            gen_gore: true,
            death_reason: DeathReason::default(),
        }
    }

    pub fn with_death_reason(mut self, reason: DeathReason) -> Self {
        self.death_reason = reason;
        self
    }
}
