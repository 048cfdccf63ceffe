//! Read-only mirrors of remote players.
//!
//! Each remote player is an entity in a private [`World`] carrying its
//! [`PlayerIndex`] and a [`Mirror`]. Mirrors expose getters only; the
//! `apply_*` methods that overwrite them are crate-private, so nothing but
//! the session's sync handling can write a mirror.

use std::collections::HashMap;

use bevy_ecs::prelude::*;
use ember_net::{BiomeFlagSync, DeltaSync, FullSync};
use ember_state::{PlayerIndex, ReplicatedFields, ZoneFlags, zones::custom_biomes_match};

use crate::error::SyncError;

// ---------------------------------------------------------------------------
// Mirror
// ---------------------------------------------------------------------------

/// The replicated subset of a player owned by another process.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mirror {
    fields: ReplicatedFields,
}

impl Mirror {
    pub fn fields(&self) -> &ReplicatedFields {
        &self.fields
    }

    pub fn life_crystals(&self) -> i32 {
        self.fields.life_crystals
    }

    pub fn party_mode(&self) -> bool {
        self.fields.party_mode
    }

    pub fn hero_lives(&self) -> i32 {
        self.fields.hero_lives
    }

    pub fn zones(&self) -> ZoneFlags {
        self.fields.zones
    }
}

// ---------------------------------------------------------------------------
// MirrorTable
// ---------------------------------------------------------------------------

/// All mirrors held by one process, keyed by player index.
pub struct MirrorTable {
    world: World,
    index: HashMap<PlayerIndex, Entity>,
}

impl MirrorTable {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            index: HashMap::new(),
        }
    }

    pub fn get(&self, player: PlayerIndex) -> Option<&Mirror> {
        let entity = *self.index.get(&player)?;
        self.world.get::<Mirror>(entity)
    }

    pub fn contains(&self, player: PlayerIndex) -> bool {
        self.index.contains_key(&player)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Mirrored players in ascending index order.
    pub fn players(&self) -> Vec<PlayerIndex> {
        let mut players: Vec<PlayerIndex> = self.index.keys().copied().collect();
        players.sort();
        players
    }

    /// Full snapshots of every mirror, in ascending index order.
    pub fn snapshots(&self) -> Vec<FullSync> {
        self.players()
            .into_iter()
            .filter_map(|p| self.get(p).map(|m| FullSync::from_fields(p, m.fields())))
            .collect()
    }

    /// Creates or overwrites a mirror. Applying the same snapshot twice
    /// leaves the same mirror as applying it once.
    pub(crate) fn apply_full(&mut self, msg: &FullSync) -> Result<(), SyncError> {
        let fields = msg.to_fields()?;
        match self.index.get(&msg.player).copied() {
            Some(entity) => {
                if let Some(mut mirror) = self.world.get_mut::<Mirror>(entity) {
                    mirror.fields = fields;
                }
            }
            None => {
                let entity = self.world.spawn((msg.player, Mirror { fields })).id();
                self.index.insert(msg.player, entity);
                tracing::debug!(player = %msg.player, "mirror created");
            }
        }
        Ok(())
    }

    /// Applies every field of a delta or none of them.
    pub(crate) fn apply_delta(&mut self, msg: &DeltaSync) -> Result<(), SyncError> {
        let mut mirror = self.mirror_mut(msg.player)?;
        let mut next = mirror.fields;
        for update in &msg.fields {
            update.apply_to(&mut next);
        }
        mirror.fields = next;
        Ok(())
    }

    /// Overwrites a mirror's zones. Returns `true` when membership changed,
    /// which is what gates biome-transition visuals.
    pub(crate) fn apply_biome(&mut self, msg: &BiomeFlagSync) -> Result<bool, SyncError> {
        let zones = ZoneFlags::decode(msg.flags)?;
        let mut mirror = self.mirror_mut(msg.player)?;
        let changed = !custom_biomes_match(mirror.fields.zones, zones);
        mirror.fields.zones = zones;
        Ok(changed)
    }

    /// Drops a mirror. Returns `false` if there was none.
    pub(crate) fn remove(&mut self, player: PlayerIndex) -> bool {
        match self.index.remove(&player) {
            Some(entity) => {
                self.world.despawn(entity);
                tracing::debug!(player = %player, "mirror removed");
                true
            }
            None => false,
        }
    }

    fn mirror_mut(&mut self, player: PlayerIndex) -> Result<Mut<'_, Mirror>, SyncError> {
        let entity = *self
            .index
            .get(&player)
            .ok_or(SyncError::UnknownPlayer(player))?;
        self.world
            .get_mut::<Mirror>(entity)
            .ok_or(SyncError::UnknownPlayer(player))
    }
}

impl Default for MirrorTable {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ember_net::FieldUpdate;

    fn snapshot(player: u8) -> FullSync {
        FullSync::from_fields(
            PlayerIndex(player),
            &ReplicatedFields {
                life_crystals: 5,
                party_mode: true,
                hero_lives: 3,
                zones: ZoneFlags::GROVE,
            },
        )
    }

    #[test]
    fn test_full_sync_is_idempotent() {
        let mut once = MirrorTable::new();
        once.apply_full(&snapshot(1)).unwrap();

        let mut twice = MirrorTable::new();
        twice.apply_full(&snapshot(1)).unwrap();
        twice.apply_full(&snapshot(1)).unwrap();

        assert_eq!(once.get(PlayerIndex(1)), twice.get(PlayerIndex(1)));
        assert_eq!(twice.len(), 1);
    }

    #[test]
    fn test_delta_to_unknown_player_is_rejected() {
        let mut table = MirrorTable::new();
        let delta = DeltaSync {
            player: PlayerIndex(4),
            fields: vec![FieldUpdate::PartyMode(true)],
        };
        assert!(matches!(
            table.apply_delta(&delta),
            Err(SyncError::UnknownPlayer(PlayerIndex(4)))
        ));
        assert!(table.is_empty());
    }

    #[test]
    fn test_delta_applies_all_fields() {
        let mut table = MirrorTable::new();
        table.apply_full(&snapshot(2)).unwrap();
        table
            .apply_delta(&DeltaSync {
                player: PlayerIndex(2),
                fields: vec![FieldUpdate::HeroLives(1), FieldUpdate::LifeCrystals(6)],
            })
            .unwrap();

        let mirror = table.get(PlayerIndex(2)).unwrap();
        assert_eq!(mirror.hero_lives(), 1);
        assert_eq!(mirror.life_crystals(), 6);
        assert!(mirror.party_mode());
    }

    #[test]
    fn test_bad_zone_byte_leaves_mirror_untouched() {
        let mut table = MirrorTable::new();
        table.apply_full(&snapshot(3)).unwrap();
        let before = *table.get(PlayerIndex(3)).unwrap();

        let result = table.apply_biome(&BiomeFlagSync {
            player: PlayerIndex(3),
            flags: 0xF0,
        });

        assert!(matches!(result, Err(SyncError::ZoneBits(_))));
        assert_eq!(*table.get(PlayerIndex(3)).unwrap(), before);
    }

    #[test]
    fn test_biome_sync_reports_transitions() {
        let mut table = MirrorTable::new();
        table.apply_full(&snapshot(0)).unwrap();
        let same = BiomeFlagSync::new(PlayerIndex(0), ZoneFlags::GROVE);
        let moved = BiomeFlagSync::new(PlayerIndex(0), ZoneFlags::VOID_MONOLITH);

        assert!(!table.apply_biome(&same).unwrap());
        assert!(table.apply_biome(&moved).unwrap());
        assert_eq!(
            table.get(PlayerIndex(0)).unwrap().zones(),
            ZoneFlags::VOID_MONOLITH
        );
    }

    #[test]
    fn test_remove_and_snapshots() {
        let mut table = MirrorTable::new();
        table.apply_full(&snapshot(7)).unwrap();
        table.apply_full(&snapshot(2)).unwrap();

        let players: Vec<PlayerIndex> = table.snapshots().iter().map(|s| s.player).collect();
        assert_eq!(players, vec![PlayerIndex(2), PlayerIndex(7)]);

        assert!(table.remove(PlayerIndex(7)));
        assert!(!table.remove(PlayerIndex(7)));
        assert!(!table.contains(PlayerIndex(7)));
    }
}
