//! Checkpoint/diff over the replicated subset of [`ExtensionState`].
//!
//! The owning process captures a [`Checkpoint`] before any gameplay mutation
//! in a tick and diffs against it after all mutation. The checkpoint is a
//! plain value copy, never a reference into live state, so later mutation
//! cannot leak into it.

use crate::extension::ExtensionState;
use crate::zones::ZoneFlags;

/// The replicated subset of [`ExtensionState`], by value. Also the complete
/// content of a mirror on non-owning processes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ReplicatedFields {
    /// Consumed life crystals.
    pub life_crystals: i32,
    /// Party toggle.
    pub party_mode: bool,
    /// Remaining revives.
    pub hero_lives: i32,
    /// Zone membership.
    pub zones: ZoneFlags,
}

bitflags::bitflags! {
    /// Set of replicated fields whose value changed since a checkpoint.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ChangedFields: u8 {
        const LIFE_CRYSTALS = 1 << 0;
        const PARTY_MODE = 1 << 1;
        const HERO_LIVES = 1 << 2;
        const ZONES = 1 << 3;
    }
}

impl ReplicatedFields {
    /// Fields of `self` that differ from `other`. Exact value equality.
    pub fn changed_from(&self, other: &ReplicatedFields) -> ChangedFields {
        let mut changed = ChangedFields::empty();
        changed.set(
            ChangedFields::LIFE_CRYSTALS,
            self.life_crystals != other.life_crystals,
        );
        changed.set(ChangedFields::PARTY_MODE, self.party_mode != other.party_mode);
        changed.set(ChangedFields::HERO_LIVES, self.hero_lives != other.hero_lives);
        changed.set(ChangedFields::ZONES, self.zones != other.zones);
        changed
    }
}

/// Immutable snapshot of the replicated subset at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    fields: ReplicatedFields,
}

impl Checkpoint {
    /// Deep-copies the replicated subset of `state`.
    pub fn capture(state: &ExtensionState) -> Self {
        Self {
            fields: state.replicated(),
        }
    }

    /// The captured values.
    pub fn fields(&self) -> &ReplicatedFields {
        &self.fields
    }

    /// Replicated fields whose current value differs from the checkpoint.
    pub fn diff(&self, state: &ExtensionState) -> ChangedFields {
        state.replicated().changed_from(&self.fields)
    }
}

/// Holds at most one pending [`Checkpoint`] per sync interval.
///
/// [`CloneDiffer::diff`] consumes the checkpoint, so a second diff without a
/// fresh checkpoint reports nothing and a change is never emitted twice.
#[derive(Debug, Default)]
pub struct CloneDiffer {
    pending: Option<Checkpoint>,
}

impl CloneDiffer {
    /// Creates a differ with no pending checkpoint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures the checkpoint for this interval, replacing any unreconciled one.
    pub fn checkpoint(&mut self, state: &ExtensionState) {
        if self.pending.is_some() {
            tracing::debug!("replacing unreconciled checkpoint");
        }
        self.pending = Some(Checkpoint::capture(state));
    }

    /// Reconciles the pending checkpoint against `state`.
    pub fn diff(&mut self, state: &ExtensionState) -> ChangedFields {
        match self.pending.take() {
            Some(checkpoint) => checkpoint.diff(state),
            None => ChangedFields::empty(),
        }
    }

    /// `true` while a checkpoint awaits its diff.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, Copy)]
    enum Mutation {
        LifeCrystals(i32),
        PartyMode,
        HeroLives(i32),
        Zones(u8),
    }

    impl Mutation {
        fn apply(self, state: &mut ExtensionState) {
            match self {
                Mutation::LifeCrystals(delta) => state.life_crystals += delta,
                Mutation::PartyMode => state.party_mode = !state.party_mode,
                Mutation::HeroLives(delta) => state.hero_lives += delta,
                Mutation::Zones(bits) => {
                    state.zones ^= ZoneFlags::from_bits_truncate(bits);
                }
            }
        }

        fn field(self) -> ChangedFields {
            match self {
                Mutation::LifeCrystals(_) => ChangedFields::LIFE_CRYSTALS,
                Mutation::PartyMode => ChangedFields::PARTY_MODE,
                Mutation::HeroLives(_) => ChangedFields::HERO_LIVES,
                Mutation::Zones(_) => ChangedFields::ZONES,
            }
        }
    }

    fn mutation() -> impl Strategy<Value = Mutation> {
        prop_oneof![
            (1..5i32).prop_map(Mutation::LifeCrystals),
            Just(Mutation::PartyMode),
            (1..3i32).prop_map(Mutation::HeroLives),
            (1..8u8).prop_map(Mutation::Zones),
        ]
    }

    #[test]
    fn test_unchanged_state_diffs_empty() {
        let state = ExtensionState::new();
        let checkpoint = Checkpoint::capture(&state);
        assert!(checkpoint.diff(&state).is_empty());
    }

    #[test]
    fn test_checkpoint_is_not_a_live_view() {
        let mut state = ExtensionState::new();
        let checkpoint = Checkpoint::capture(&state);
        state.hero_lives = 3;
        assert_eq!(checkpoint.fields().hero_lives, 0);
    }

    #[test]
    fn test_ephemeral_changes_not_reported() {
        let mut state = ExtensionState::new();
        let checkpoint = Checkpoint::capture(&state);
        state.score = 1000;
        state.effects.nullified = true;
        state.timers.lock_time = 40;
        assert!(checkpoint.diff(&state).is_empty());
    }

    #[test]
    fn test_change_and_revert_is_not_reported() {
        let mut state = ExtensionState::new();
        let checkpoint = Checkpoint::capture(&state);
        state.party_mode = true;
        state.party_mode = false;
        assert!(checkpoint.diff(&state).is_empty());
    }

    #[test]
    fn test_differ_reports_once() {
        let mut state = ExtensionState::new();
        let mut differ = CloneDiffer::new();
        differ.checkpoint(&state);
        state.party_mode = true;

        assert_eq!(differ.diff(&state), ChangedFields::PARTY_MODE);
        assert!(!differ.has_pending());
        assert!(differ.diff(&state).is_empty());
    }

    proptest! {
        #[test]
        fn prop_single_mutation_diffs_to_exactly_that_field(m in mutation()) {
            let mut state = ExtensionState::new();
            let checkpoint = Checkpoint::capture(&state);
            m.apply(&mut state);
            prop_assert_eq!(checkpoint.diff(&state), m.field());
        }

        #[test]
        fn prop_two_mutations_diff_to_both_fields_in_any_order(a in mutation(), b in mutation()) {
            prop_assume!(a.field() != b.field());

            let mut forward = ExtensionState::new();
            let checkpoint = Checkpoint::capture(&forward);
            a.apply(&mut forward);
            b.apply(&mut forward);

            let mut reverse = ExtensionState::new();
            b.apply(&mut reverse);
            a.apply(&mut reverse);

            let expected = a.field() | b.field();
            prop_assert_eq!(checkpoint.diff(&forward), expected);
            prop_assert_eq!(checkpoint.diff(&reverse), expected);
        }
    }
}
