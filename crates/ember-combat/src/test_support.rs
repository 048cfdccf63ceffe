//! Recording collaborators for unit tests.

use glam::Vec2;

use crate::context::DeathReason;
use crate::entity::{Adversary, CombatEntity, StatusEffect};

#[derive(Debug, Clone)]
pub struct TestEntity {
    pub life_max: i32,
    pub life: i32,
    pub defense: i32,
    pub life_regen: i32,
    pub regen_time_resets: u32,
    pub statuses: Vec<(StatusEffect, i32)>,
    pub immune: Vec<StatusEffect>,
    pub immunity: Option<i32>,
    pub long_invincibility: bool,
    pub heals: Vec<i32>,
    pub position: Vec2,
    pub size: Vec2,
    pub near_town: bool,
    pub teleports: Vec<Vec2>,
    pub shield_item: bool,
    pub orbs_spawned: Vec<i32>,
    pub suppressed: u32,
    pub deaths: Vec<DeathReason>,
}

impl TestEntity {
    pub fn new(life_max: i32) -> Self {
        Self {
            life_max,
            life: life_max,
            defense: 0,
            life_regen: 0,
            regen_time_resets: 0,
            statuses: Vec::new(),
            immune: Vec::new(),
            immunity: None,
            long_invincibility: false,
            heals: Vec::new(),
            position: Vec2::ZERO,
            size: Vec2::new(20.0, 42.0),
            near_town: false,
            teleports: Vec::new(),
            shield_item: false,
            orbs_spawned: Vec::new(),
            suppressed: 0,
            deaths: Vec::new(),
        }
    }
}

impl CombatEntity for TestEntity {
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
    fn reset_regen_time(&mut self) {
        self.regen_time_resets += 1;
    }
    fn add_status(&mut self, status: StatusEffect, ticks: i32) {
        self.statuses.push((status, ticks));
    }
    fn is_immune_to(&self, status: StatusEffect) -> bool {
        self.immune.contains(&status)
    }
    fn grant_immunity(&mut self, ticks: i32) {
        self.immunity = Some(ticks);
    }
    fn has_long_invincibility(&self) -> bool {
        self.long_invincibility
    }
    fn heal_effect(&mut self, amount: i32) {
        self.heals.push(amount);
    }
    fn position(&self) -> Vec2 {
        self.position
    }
    fn size(&self) -> Vec2 {
        self.size
    }
    fn teleport(&mut self, to: Vec2) {
        self.position = to;
        self.teleports.push(to);
    }
    fn near_town(&self) -> bool {
        self.near_town
    }
    fn has_shield_item(&self) -> bool {
        self.shield_item
    }
    fn spawn_shield_orb(&mut self, slot: i32) {
        self.orbs_spawned.push(slot);
    }
    fn suppress_equipment(&mut self) {
        self.suppressed += 1;
    }
    fn mitigate(&self, raw: i32) -> i32 {
        (raw - self.defense / 2).max(1)
    }
    fn kill(&mut self, reason: &DeathReason) {
        self.deaths.push(reason.clone());
    }
}

#[derive(Debug, Clone)]
pub struct TestAdversary {
    pub attack: Option<usize>,
    pub weights: [i32; 4],
}

impl TestAdversary {
    pub fn new() -> Self {
        Self {
            attack: None,
            weights: [0; 4],
        }
    }
}

impl Adversary for TestAdversary {
    fn arena_center(&self) -> Vec2 {
        Vec2::ZERO
    }
    fn arena_half_extents(&self) -> Vec2 {
        Vec2::new(600.0, 400.0)
    }
    fn current_attack(&self) -> Option<usize> {
        self.attack
    }
    fn attack_weight(&self, category: usize) -> i32 {
        self.weights[category]
    }
    fn set_attack_weight(&mut self, category: usize, weight: i32) {
        self.weights[category] = weight;
    }
}
