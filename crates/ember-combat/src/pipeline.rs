//! Ordered, short-circuiting hit resolution.
//!
//! A hit runs once through three stages, always in this order:
//!
//! ```text
//! PreDamage ──► apply damage ──► OnDamage ──► life <= 0 ? ──► PreDeath ──► kill
//! ```
//!
//! Each stage is a list of plain handler functions registered up front.
//! Handlers share one [`HitScope`] and return [`Flow`]. [`Flow::Cancel`] ends
//! the event: no later handler and no base handling runs for it.

use ember_config::CombatConfig;
use ember_state::ExtensionState;

use crate::context::DamageContext;
use crate::entity::{Adversary, CombatEntity};
use crate::stages;

/// Pipeline stage. The derived order is the execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    PreDamage,
    OnDamage,
    PreDeath,
}

/// Handler verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Stop the event here. Skips remaining handlers and base handling.
    Cancel,
}

/// Everything a handler may read or mutate for the hit in progress.
pub struct HitScope<'a> {
    pub state: &'a mut ExtensionState,
    pub entity: &'a mut dyn CombatEntity,
    /// The arena adversary, when one is alive.
    pub adversary: Option<&'a mut dyn Adversary>,
    pub ctx: &'a mut DamageContext,
    pub config: &'a CombatConfig,
}

/// Handler signature.
pub type StageFn = fn(&mut HitScope<'_>) -> Flow;

/// A named handler bound to a stage.
#[derive(Clone, Copy)]
pub struct StageHandler {
    pub stage: Stage,
    pub name: &'static str,
    pub run: StageFn,
}

impl std::fmt::Debug for StageHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageHandler")
            .field("stage", &self.stage)
            .field("name", &self.name)
            .finish()
    }
}

/// Built-in handlers, in registration order.
pub const DEFAULT_HANDLERS: &[StageHandler] = &[
    StageHandler {
        stage: Stage::PreDamage,
        name: "damage_override",
        run: stages::damage_override,
    },
    StageHandler {
        stage: Stage::OnDamage,
        name: "element_shield",
        run: stages::element_shield,
    },
    StageHandler {
        stage: Stage::OnDamage,
        name: "adversary_weighting",
        run: stages::adversary_weighting,
    },
    StageHandler {
        stage: Stage::PreDeath,
        name: "hero_revive",
        run: stages::hero_revive,
    },
    StageHandler {
        stage: Stage::PreDeath,
        name: "holy_dissolution",
        run: stages::holy_dissolution,
    },
];

/// How a hit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// PreDamage cancelled the hit; nothing was applied.
    Ignored,
    /// Damage was applied and the entity survived.
    Damaged { damage: i32 },
    /// The hit was lethal and a PreDeath handler cancelled the death.
    Revived { damage: i32 },
    /// The base death handling ran.
    Died { damage: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HitError {
    /// A hit arrived while another one for the same player was still resolving.
    #[error("hit already being resolved for this player")]
    Reentrant,
    /// Capacity-relative rules cannot be evaluated.
    #[error("entity has non-positive max capacity {0}")]
    NoCapacity(i32),
}

// ---------------------------------------------------------------------------
// CombatPipeline
// ---------------------------------------------------------------------------

/// Stage-sorted handler list. Handlers within a stage keep registration
/// order.
#[derive(Debug, Clone)]
pub struct CombatPipeline {
    handlers: Vec<StageHandler>,
}

impl Default for CombatPipeline {
    fn default() -> Self {
        Self::new(DEFAULT_HANDLERS.to_vec())
    }
}

impl CombatPipeline {
    pub fn new(mut handlers: Vec<StageHandler>) -> Self {
        // Stable sort keeps insertion order inside each stage.
        handlers.sort_by_key(|h| h.stage);
        Self { handlers }
    }

    /// Inserts `handler` after every handler already registered for its stage.
    pub fn register(&mut self, handler: StageHandler) {
        let at = self
            .handlers
            .iter()
            .position(|h| h.stage > handler.stage)
            .unwrap_or(self.handlers.len());
        self.handlers.insert(at, handler);
    }

    /// Handler names in execution order.
    pub fn handler_names(&self) -> impl Iterator<Item = (Stage, &'static str)> + '_ {
        self.handlers.iter().map(|h| (h.stage, h.name))
    }

    /// Resolves one hit against `entity`.
    ///
    /// Exactly one pass per call. A call made while a hit for the same
    /// `state` is still resolving fails with [`HitError::Reentrant`] and
    /// touches nothing.
    pub fn resolve_hit<'a>(
        &self,
        state: &'a mut ExtensionState,
        entity: &'a mut dyn CombatEntity,
        adversary: Option<&'a mut dyn Adversary>,
        ctx: &'a mut DamageContext,
        config: &'a CombatConfig,
    ) -> Result<HitOutcome, HitError> {
        let life_max = entity.life_max();
        if life_max <= 0 {
            return Err(HitError::NoCapacity(life_max));
        }
        if !state.begin_hit() {
            tracing::warn!("nested hit rejected");
            return Err(HitError::Reentrant);
        }
        let mut scope = HitScope {
            state,
            entity,
            adversary,
            ctx,
            config,
        };
        let outcome = self.run(&mut scope);
        scope.state.end_hit();
        tracing::debug!(?outcome, "hit resolved");
        Ok(outcome)
    }

    fn run(&self, scope: &mut HitScope<'_>) -> HitOutcome {
        if self.run_stage(Stage::PreDamage, scope) == Flow::Cancel {
            return HitOutcome::Ignored;
        }

        let damage = if scope.ctx.custom_damage {
            scope.ctx.damage
        } else {
            scope.entity.mitigate(scope.ctx.damage)
        };
        scope.ctx.damage = damage;
        let remaining = scope.entity.life() - damage;
        scope.entity.set_life(remaining);

        if self.run_stage(Stage::OnDamage, scope) == Flow::Cancel {
            return HitOutcome::Damaged { damage };
        }
        if scope.entity.life() > 0 {
            return HitOutcome::Damaged { damage };
        }

        if self.run_stage(Stage::PreDeath, scope) == Flow::Cancel {
            return HitOutcome::Revived { damage };
        }
        scope.entity.kill(&scope.ctx.death_reason);
        HitOutcome::Died { damage }
    }

    fn run_stage(&self, stage: Stage, scope: &mut HitScope<'_>) -> Flow {
        for handler in self.handlers.iter().filter(|h| h.stage == stage) {
            if (handler.run)(scope) == Flow::Cancel {
                tracing::debug!(?stage, handler = handler.name, "event cancelled");
                return Flow::Cancel;
            }
        }
        Flow::Continue
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
