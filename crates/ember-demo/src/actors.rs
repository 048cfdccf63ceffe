//! Minimal stand-ins for the base simulation, enough to drive the combat
//! pipeline and effect passes from the demo loop.

use ember_combat::{Adversary, CombatEntity, DeathReason, StatusEffect};
use glam::Vec2;

/// Base life before any per-tick bonus.
const BASE_LIFE: i32 = 100;

/// A player body in the base simulation.
#[derive(Debug, Clone)]
pub struct DemoPlayer {
    pub name: &'static str,
    life_max: i32,
    life: i32,
    defense: i32,
    life_regen: i32,
    position: Vec2,
    pub dead: bool,
}

impl DemoPlayer {
    pub fn new(name: &'static str, defense: i32) -> Self {
        Self {
            name,
            life_max: BASE_LIFE,
            life: BASE_LIFE,
            defense,
            life_regen: 0,
            position: Vec2::new(100.0, 0.0),
            dead: false,
        }
    }

    /// Start-of-tick reset the base simulation performs before extension
    /// passes add their bonuses.
    pub fn begin_tick(&mut self) {
        self.life_max = BASE_LIFE;
        self.life_regen = 0;
    }

    pub fn walk(&mut self, delta: Vec2) {
        self.position += delta;
    }
}

impl CombatEntity for DemoPlayer {
    fn life_max(&self) -> i32 {
        self.life_max
    }

    fn life(&self) -> i32 {
        self.life
    }

    fn set_life(&mut self, life: i32) {
        self.life = life;
    }

    fn add_life_max(&mut self, bonus: i32) {
        self.life_max += bonus;
    }

    fn defense(&self) -> i32 {
        self.defense
    }

    fn life_regen(&self) -> i32 {
        self.life_regen
    }

    fn set_life_regen(&mut self, regen: i32) {
        self.life_regen = regen;
    }

    fn reset_regen_time(&mut self) {}

    fn add_status(&mut self, status: StatusEffect, ticks: i32) {
        tracing::trace!(player = self.name, ?status, ticks, "status applied");
    }

    fn is_immune_to(&self, _status: StatusEffect) -> bool {
        false
    }

    fn grant_immunity(&mut self, ticks: i32) {
        tracing::debug!(player = self.name, ticks, "immune");
    }

    fn has_long_invincibility(&self) -> bool {
        false
    }

    fn heal_effect(&mut self, amount: i32) {
        tracing::info!(player = self.name, amount, "healed");
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn size(&self) -> Vec2 {
        Vec2::new(20.0, 42.0)
    }

    fn teleport(&mut self, to: Vec2) {
        self.position = to;
    }

    fn near_town(&self) -> bool {
        false
    }

    fn has_shield_item(&self) -> bool {
        false
    }

    fn spawn_shield_orb(&mut self, slot: i32) {
        tracing::debug!(player = self.name, slot, "shield orb");
    }

    fn suppress_equipment(&mut self) {}

    fn mitigate(&self, raw: i32) -> i32 {
        (raw - self.defense / 2).max(1)
    }

    fn kill(&mut self, reason: &DeathReason) {
        self.dead = true;
        tracing::info!(player = self.name, ?reason, "player died");
    }
}

/// The arena adversary.
#[derive(Debug, Clone)]
pub struct ArenaBoss {
    center: Vec2,
    half_extents: Vec2,
    attack: Option<usize>,
    weights: [i32; 4],
}

impl ArenaBoss {
    pub fn new(center: Vec2) -> Self {
        Self {
            center,
            half_extents: Vec2::new(800.0, 500.0),
            attack: Some(0),
            weights: [100; 4],
        }
    }

    pub fn weights(&self) -> [i32; 4] {
        self.weights
    }
}

impl Adversary for ArenaBoss {
    fn arena_center(&self) -> Vec2 {
        self.center
    }

    fn arena_half_extents(&self) -> Vec2 {
        self.half_extents
    }

    fn current_attack(&self) -> Option<usize> {
        self.attack
    }

    fn attack_weight(&self, category: usize) -> i32 {
        self.weights.get(category).copied().unwrap_or(0)
    }

    fn set_attack_weight(&mut self, category: usize, weight: i32) {
        if let Some(slot) = self.weights.get_mut(category) {
            *slot = weight;
        }
    }
}
