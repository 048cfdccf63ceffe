//! Per-tick effect passes, run by the owning process in this order:
//!
//! 1. [`reset_effects`]
//! 2. [`update_dead`] (dead players only)
//! 3. [`bad_life_regen`]
//! 4. [`pre_update_buffs`], then [`post_update_buffs`]
//! 5. [`update_equips`], then [`post_update_equips`]
//! 6. [`post_update_misc`]

use ember_config::CombatConfig;
use ember_state::ExtensionState;
use glam::Vec2;
use rand::Rng;

use crate::entity::{Adversary, CombatEntity, StatusEffect};

/// Regen drained per tick by ethereal flames.
pub const FLAMES_REGEN_DRAIN: i32 = 16;

/// Regen drained per tick per heal-hurt stack.
pub const HEAL_HURT_REGEN_DRAIN: i32 = 120;

/// Orbit period of the shield orbs.
pub const SHIELD_ORBIT_PERIOD: i32 = 300;

/// Statuses the arena debuff picks from, with their durations.
pub const PURITY_DEBUFFS: [(StatusEffect, i32); 5] = [
    (StatusEffect::Darkness, 1800),
    (StatusEffect::Cursed, 900),
    (StatusEffect::Confused, 1800),
    (StatusEffect::Slow, 1800),
    (StatusEffect::Silenced, 900),
];

/// Duration of the fallback Undead debuff.
pub const UNDEAD_TICKS: i32 = 1800;

/// Duration of the costume buff, refreshed every tick it applies.
pub const COSTUME_BUFF_TICKS: i32 = 60;

/// Clears ephemeral effects and applies the life-crystal capacity bonus.
pub fn reset_effects(state: &mut ExtensionState, entity: &mut dyn CombatEntity) {
    let bonus = state.reset_effects();
    entity.add_life_max(bonus);
}

/// Dead players shed damage-over-time debuffs.
pub fn update_dead(state: &mut ExtensionState) {
    state.effects.ethereal_flames = false;
    state.effects.bad_heal = false;
}

/// Applies regen-draining debuffs. Each one first removes positive regen.
pub fn bad_life_regen(state: &ExtensionState, entity: &mut dyn CombatEntity) {
    let mut drain = |amount: i32| {
        if entity.life_regen() > 0 {
            entity.set_life_regen(0);
        }
        entity.reset_regen_time();
        entity.set_life_regen(entity.life_regen() - amount);
    };
    if state.effects.ethereal_flames {
        drain(FLAMES_REGEN_DRAIN);
    }
    if state.effects.heal_hurt > 0 {
        drain(HEAL_HURT_REGEN_DRAIN * state.effects.heal_hurt);
    }
}

/// Hero-life upkeep and the arena-debuff cooldown.
///
/// With hero lives left and no adversary alive, the fight is over and the
/// counter drops to zero. Otherwise the entity is held inside the arena,
/// debuffed by [`purity_debuff`] whenever it has to be pulled back, and gets
/// the tier status for its remaining lives.
pub fn pre_update_buffs(
    state: &mut ExtensionState,
    entity: &mut dyn CombatEntity,
    adversary: Option<&dyn Adversary>,
    config: &CombatConfig,
    rng: &mut impl Rng,
) {
    if state.hero_lives > 0 {
        match adversary {
            Some(adversary) => {
                if let Some(to) = arena_correction(entity, adversary) {
                    tracing::debug!(x = to.x, y = to.y, "pulled back into arena");
                    entity.teleport(to);
                    purity_debuff(entity, config.expert_mode, rng);
                }
            }
            None => {
                tracing::info!("adversary gone, clearing hero lives");
                state.hero_lives = 0;
            }
        }
        match state.hero_lives {
            1 => entity.add_status(StatusEffect::HeroOne, 2),
            2 => entity.add_status(StatusEffect::HeroTwo, 2),
            3 => entity.add_status(StatusEffect::HeroThree, 3),
            _ => {}
        }
    }
    if state.timers.purity_debuff_cooldown > 0 {
        state.timers.purity_debuff_cooldown -= 1;
    }
}

/// Punishes leaving the arena.
///
/// On a coin flip, up to two picks from [`PURITY_DEBUFFS`] are tried and the
/// first one the entity is not immune to is applied. When the flip fails,
/// Undead is applied instead. When both picks hit immunities, Undead is
/// applied in expert mode or on a second flip. Returns the status applied.
pub fn purity_debuff(
    entity: &mut dyn CombatEntity,
    expert: bool,
    rng: &mut impl Rng,
) -> Option<StatusEffect> {
    let picked = rng.random_bool(0.5);
    if picked {
        for _ in 0..2 {
            let (status, ticks) = PURITY_DEBUFFS[rng.random_range(0..PURITY_DEBUFFS.len())];
            if !entity.is_immune_to(status) {
                entity.add_status(status, ticks);
                return Some(status);
            }
        }
    }
    if !picked || expert || rng.random_bool(0.5) {
        entity.add_status(StatusEffect::Undead, UNDEAD_TICKS);
        return Some(StatusEffect::Undead);
    }
    None
}

/// Where to move an entity that stepped past an arena edge, if anywhere.
/// Edges are checked left, right, top, bottom; only the first crossed edge
/// is corrected.
pub fn arena_correction(entity: &dyn CombatEntity, adversary: &dyn Adversary) -> Option<Vec2> {
    let pos = entity.position();
    let size = entity.size();
    let center = adversary.arena_center();
    let half = adversary.arena_half_extents();

    let mut to = pos;
    if pos.x <= center.x - half.x {
        to.x = center.x + half.x - size.x - 1.0;
    } else if pos.x + size.x >= center.x + half.x {
        to.x = center.x - half.x + 1.0;
    } else if pos.y <= center.y - half.y {
        to.y = center.y + half.y - size.y - 1.0;
    } else if pos.y + size.y >= center.y + half.y {
        to.y = center.y - half.y + 1.0;
    }
    (to != pos).then_some(to)
}

/// Nullified players lose every equipment effect after buffs update.
pub fn post_update_buffs(state: &ExtensionState, entity: &mut dyn CombatEntity) {
    if state.effects.nullified {
        entity.suppress_equipment();
    }
}

/// The costume accessory grants its buff while worn near town.
pub fn update_equips(state: &ExtensionState, entity: &mut dyn CombatEntity) {
    if state.effects.costume.accessory && entity.near_town() {
        entity.add_status(StatusEffect::Costume, COSTUME_BUFF_TICKS);
    }
}

/// Shield orb decay and orbit phase.
pub fn post_update_equips(
    state: &mut ExtensionState,
    entity: &mut dyn CombatEntity,
    config: &CombatConfig,
) {
    if state.effects.nullified {
        entity.suppress_equipment();
    }
    let timers = &mut state.timers;
    if state.effects.element_shield {
        if timers.shield_orbs > 0 {
            timers.shield_timer -= 1;
            if timers.shield_timer < 0 {
                timers.shield_orbs -= 1;
                timers.shield_timer = config.shield_decay_ticks;
            }
        }
    } else {
        timers.shield_orbs = 0;
        timers.shield_timer = 0;
    }
    timers.shield_orbit = (timers.shield_orbit + 1) % SHIELD_ORBIT_PERIOD;
}

/// Lock-on and revive visual countdowns.
pub fn post_update_misc(state: &mut ExtensionState) {
    let timers = &mut state.timers;
    if timers.lock_time > 0 {
        timers.lock_time -= 1;
    }
    if timers.revive_time > 0 {
        timers.revive_time -= 1;
    }
}
