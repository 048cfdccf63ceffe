//! Combat for the player extension: the staged hit pipeline and the per-tick
//! effect passes that feed it.
//!
//! Everything here runs on the owning process, inside its tick. The base
//! simulation is reached only through [`CombatEntity`] and [`Adversary`].

pub mod context;
pub mod effects;
pub mod entity;
pub mod pipeline;
pub mod stages;

#[cfg(test)]
mod test_support;

pub use context::{DamageContext, DeathReason};
pub use entity::{Adversary, CombatEntity, StatusEffect};
pub use pipeline::{
    CombatPipeline, DEFAULT_HANDLERS, Flow, HitError, HitOutcome, HitScope, Stage, StageFn,
    StageHandler,
};
