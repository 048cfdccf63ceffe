//! Built-in stage handlers. Registered in [`crate::DEFAULT_HANDLERS`].

use crate::context::DeathReason;
use crate::pipeline::{Flow, HitScope};

/// Defense-scaling factor multiplier in expert mode.
pub const EXPERT_DEFENSE_MULTIPLIER: f32 = 1.5;

/// Attack-weight gain for a hit that costs the whole capacity.
pub const ATTACK_WEIGHT_GAIN: f64 = 400.0;

/// Gain for the nullify attack while the player is nullified.
pub const NULLIFY_WEIGHT_GAIN: f64 = 200.0;

/// Attack category of the adversary's nullify attack.
pub const NULLIFY_ATTACK: usize = 2;

/// Damage, direction and source of the heal-hurt tick that kills.
const HOLY_TICK_DAMAGE: i32 = 10;
const HOLY_TICK_SOURCE: i32 = 8;

pub const HOLY_DISSOLUTION_REASON: &str = " was dissolved by holy powers";

// ---------------------------------------------------------------------------
// PreDamage
// ---------------------------------------------------------------------------

/// Applies at most one damage override, then clears all three inputs.
///
/// Constant and percent overrides combine by taking the larger damage.
/// Defense scaling only applies when neither is set, and never lowers the
/// damage below 1.
pub fn damage_override(scope: &mut HitScope<'_>) -> Flow {
    let effects = &mut scope.state.effects;
    let ctx = &mut *scope.ctx;

    if effects.constant_damage > 0 || effects.percent_damage > 0.0 {
        let from_percent = (scope.entity.life_max() as f32 * effects.percent_damage) as i32;
        ctx.damage = effects.constant_damage.max(from_percent);
        ctx.custom_damage = true;
    } else if let Some(mut factor) = effects.defense_scaling {
        if scope.config.expert_mode {
            factor *= EXPERT_DEFENSE_MULTIPLIER;
        }
        let reduction = (scope.entity.defense() as f32 * factor) as i32;
        ctx.damage = (ctx.damage - reduction).max(1);
        ctx.custom_damage = true;
    }

    effects.clear_damage_overrides();
    Flow::Continue
}

// ---------------------------------------------------------------------------
// OnDamage
// ---------------------------------------------------------------------------

/// Charges an element-shield orb on any hit above 1 damage.
pub fn element_shield(scope: &mut HitScope<'_>) -> Flow {
    if !scope.state.effects.element_shield || scope.ctx.damage <= 1 {
        return Flow::Continue;
    }
    let timers = &mut scope.state.timers;
    if timers.shield_orbs < scope.config.max_shield_orbs && scope.entity.has_shield_item() {
        scope.entity.spawn_shield_orb(timers.shield_orbs);
        timers.shield_orbs += 1;
    }
    timers.shield_timer = scope.config.shield_decay_ticks;
    Flow::Continue
}

/// Makes the arena adversary favor its current attack in proportion to the
/// damage it just dealt.
pub fn adversary_weighting(scope: &mut HitScope<'_>) -> Flow {
    if scope.state.hero_lives <= 0 {
        return Flow::Continue;
    }
    let Some(adversary) = scope.adversary.as_deref_mut() else {
        return Flow::Continue;
    };
    let Some(attack) = adversary.current_attack() else {
        return Flow::Continue;
    };

    let proportion =
        (f64::from(scope.ctx.damage) / f64::from(scope.entity.life_max())).clamp(0.0, 1.0);
    let max = scope.config.max_attack_weight;

    let weight = adversary.attack_weight(attack) + (proportion * ATTACK_WEIGHT_GAIN) as i32;
    adversary.set_attack_weight(attack, weight.min(max));

    if scope.state.effects.nullified && attack != NULLIFY_ATTACK {
        let weight =
            adversary.attack_weight(NULLIFY_ATTACK) + (proportion * NULLIFY_WEIGHT_GAIN) as i32;
        adversary.set_attack_weight(NULLIFY_ATTACK, weight.min(max));
    }
    Flow::Continue
}

// ---------------------------------------------------------------------------
// PreDeath
// ---------------------------------------------------------------------------

/// Spends one hero life to cancel the death.
pub fn hero_revive(scope: &mut HitScope<'_>) -> Flow {
    if scope.state.hero_lives <= 0 {
        return Flow::Continue;
    }
    scope.state.hero_lives -= 1;

    let life_max = scope.entity.life_max();
    scope.entity.set_life(life_max);
    scope.entity.heal_effect(life_max);
    let immunity = if scope.entity.has_long_invincibility() {
        scope.config.long_revive_immunity_ticks
    } else {
        scope.config.revive_immunity_ticks
    };
    scope.entity.grant_immunity(immunity);
    scope.state.timers.revive_time = scope.config.revive_visual_ticks;

    tracing::info!(lives_left = scope.state.hero_lives, "revived");
    Flow::Cancel
}

/// Renames a death caused by the heal-hurt tick.
pub fn holy_dissolution(scope: &mut HitScope<'_>) -> Flow {
    let ctx = &mut *scope.ctx;
    if scope.state.effects.heal_hurt > 0
        && ctx.damage == HOLY_TICK_DAMAGE
        && ctx.hit_direction == 0
        && ctx.death_reason.source_other_index == Some(HOLY_TICK_SOURCE)
    {
        ctx.death_reason = DeathReason::custom(HOLY_DISSOLUTION_REASON);
    }
    Flow::Continue
}
