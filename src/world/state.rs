use crate::combat::damage::{CombatFormula, CombatProfile, CombatRng, MeleeFormula};
use crate::combat::rules::CombatRules;
use crate::entities::attributes::AttributeStore;
use crate::entities::mob::{Mob, MobId, NpcId, PlayerId};
use crate::entities::npc::Npc;
use crate::entities::player::Player;
use crate::net::session::{OutboundEvent, Session, SessionHandle};
use crate::telemetry::logging::{log_game, log_warning};
use crate::world::collision::CollisionGrid;
use crate::world::definitions::{Definitions, Layout};
use crate::world::ground_item::{GroundItem, GroundItemId};
use crate::world::location::{Location, SPAWN_POINT};
use crate::world::object::{GameObject, ObjectId};
use crate::world::region::{Member, RegionGrid};
use crate::world::time::{GameClock, GameTick};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// How far a player sees other entities, in tiles.
pub const VIEW_RADIUS: i32 = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutSummary {
    pub tiles: usize,
    pub objects: usize,
    pub npcs: usize,
    pub skipped: usize,
}

/// The whole simulated world. Owned by the tick thread behind one mutex;
/// every mutation of positions, regions and mob state goes through it.
pub struct World {
    pub definitions: Arc<Definitions>,
    pub regions: RegionGrid,
    pub collision: CollisionGrid,
    pub players: BTreeMap<PlayerId, Player>,
    pub npcs: BTreeMap<NpcId, Npc>,
    pub objects: BTreeMap<ObjectId, GameObject>,
    pub ground_items: BTreeMap<GroundItemId, GroundItem>,
    pub clock: GameClock,
    pub rng: CombatRng,
    pub rules: CombatRules,
    formula: Box<dyn CombatFormula>,
    next_player_id: u32,
    next_npc_id: u32,
    next_object_id: u32,
    next_item_id: u32,
    next_menu_token: u64,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("tick", &self.clock.now())
            .field("players", &self.players.len())
            .field("npcs", &self.npcs.len())
            .field("objects", &self.objects.len())
            .field("ground_items", &self.ground_items.len())
            .field("formula", &self.formula)
            .finish()
    }
}

impl World {
    pub fn new(definitions: Arc<Definitions>, clock: GameClock, seed: u64) -> Self {
        Self {
            definitions,
            regions: RegionGrid::new(),
            collision: CollisionGrid::new(),
            players: BTreeMap::new(),
            npcs: BTreeMap::new(),
            objects: BTreeMap::new(),
            ground_items: BTreeMap::new(),
            clock,
            rng: CombatRng::from_seed(seed),
            rules: CombatRules::default(),
            formula: Box::new(MeleeFormula),
            next_player_id: 1,
            next_npc_id: 1,
            next_object_id: 1,
            next_item_id: 1,
            next_menu_token: 1,
        }
    }

    pub fn with_formula(mut self, formula: Box<dyn CombatFormula>) -> Self {
        self.formula = formula;
        self
    }

    pub fn formula(&self) -> &dyn CombatFormula {
        self.formula.as_ref()
    }

    pub fn roll_melee(&mut self, attacker: &CombatProfile, defender: &CombatProfile) -> i32 {
        self.formula.melee_damage(attacker, defender, &mut self.rng)
    }

    pub fn now(&self) -> GameTick {
        self.clock.now()
    }

    pub(crate) fn next_menu_token(&mut self) -> u64 {
        let token = self.next_menu_token;
        self.next_menu_token = self.next_menu_token.wrapping_add(1);
        token
    }

    /// Installs terrain, static objects and NPC spawns. Entries naming
    /// unknown definitions are skipped with a warning.
    pub fn load_layout(&mut self, layout: &Layout) -> LayoutSummary {
        let mut summary = LayoutSummary::default();
        for tile in &layout.tiles {
            self.collision.set_terrain(tile.x, tile.y, tile.mask);
            summary.tiles += 1;
        }
        for placement in &layout.objects {
            let location = Location::new(placement.x, placement.y);
            match self.add_object(placement.id, placement.direction, placement.boundary, location) {
                Some(_) => summary.objects += 1,
                None => {
                    log_warning(&format!(
                        "layout: unknown {} {} at {}",
                        if placement.boundary { "boundary" } else { "object" },
                        placement.id,
                        location
                    ));
                    summary.skipped += 1;
                }
            }
        }
        for spawn in &layout.npcs {
            let location = Location::new(spawn.x, spawn.y);
            match self.add_npc(spawn.id, location) {
                Some(_) => summary.npcs += 1,
                None => {
                    log_warning(&format!("layout: unknown npc {} at {}", spawn.id, location));
                    summary.skipped += 1;
                }
            }
        }
        summary
    }

    /// Registers a newly connected player and returns the worker's end of
    /// its session.
    pub fn connect_player(
        &mut self,
        username: &str,
        location: Location,
        attributes: AttributeStore,
    ) -> SessionHandle {
        let location = if location.within_world() {
            location
        } else {
            log_warning(&format!(
                "{} logged in outside the world at {}, moved to {}",
                username, location, SPAWN_POINT
            ));
            SPAWN_POINT
        };
        let id = PlayerId(self.next_player_id);
        self.next_player_id += 1;
        let (session, events, connected) = Session::open();
        let player = Player::new(id, username.to_string(), location, attributes, session);
        let handle = SessionHandle::new(
            id,
            events,
            connected,
            player.attributes.clone(),
            player.mob.transients.clone(),
        );
        self.regions.insert(Member::Player(id), location);
        self.players.insert(id, player);
        log_game(&format!("{} logged in at {}", username, location));
        handle
    }

    pub fn add_npc(&mut self, definition: u32, location: Location) -> Option<NpcId> {
        let definition = self.definitions.npc(definition)?.clone();
        if !location.within_world() {
            return None;
        }
        let id = NpcId(self.next_npc_id);
        self.next_npc_id += 1;
        self.regions.insert(Member::Npc(id), location);
        self.npcs.insert(id, Npc::new(id, &definition, location));
        Some(id)
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn player_by_name(&self, username: &str) -> Option<&Player> {
        self.players
            .values()
            .find(|player| player.username.eq_ignore_ascii_case(username))
    }

    pub fn npc(&self, id: NpcId) -> Option<&Npc> {
        self.npcs.get(&id)
    }

    pub fn mob(&self, id: MobId) -> Option<&Mob> {
        match id {
            MobId::Player(id) => self.players.get(&id).map(|player| &player.mob),
            MobId::Npc(id) => self.npcs.get(&id).map(|npc| &npc.mob),
        }
    }

    pub fn mob_mut(&mut self, id: MobId) -> Option<&mut Mob> {
        match id {
            MobId::Player(id) => self.players.get_mut(&id).map(|player| &mut player.mob),
            MobId::Npc(id) => self.npcs.get_mut(&id).map(|npc| &mut npc.mob),
        }
    }

    /// The mob's location, or `None` when it is gone or dead.
    pub fn live_location(&self, id: MobId) -> Option<Location> {
        self.mob(id)
            .filter(|mob| !mob.removed)
            .map(|mob| mob.location)
    }

    pub fn mob_name(&self, id: MobId) -> String {
        match id {
            MobId::Player(id) => self
                .players
                .get(&id)
                .map_or_else(|| "nil".to_string(), |player| player.username.clone()),
            MobId::Npc(id) => self
                .npcs
                .get(&id)
                .and_then(|npc| self.definitions.npc(npc.definition))
                .map_or_else(|| "nil".to_string(), |definition| definition.name.clone()),
        }
    }

    /// NPCs count as connected for as long as they exist.
    pub fn is_connected(&self, id: MobId) -> bool {
        match id {
            MobId::Player(id) => self
                .players
                .get(&id)
                .map_or(false, Player::is_connected),
            MobId::Npc(id) => self.npcs.contains_key(&id),
        }
    }

    /// Moves a mob, keeping its region membership in step.
    pub fn set_location(&mut self, id: MobId, location: Location) -> bool {
        let member = match id {
            MobId::Player(id) => Member::Player(id),
            MobId::Npc(id) => Member::Npc(id),
        };
        let Some(mob) = self.mob_mut(id) else {
            return false;
        };
        let from = mob.location;
        mob.location = location;
        self.regions.relocate(member, from, location);
        true
    }

    pub fn add_object(
        &mut self,
        definition: u32,
        direction: u8,
        boundary: bool,
        location: Location,
    ) -> Option<ObjectId> {
        let known = if boundary {
            self.definitions.boundary(definition).is_some()
        } else {
            self.definitions.object(definition).is_some()
        };
        if !known || !location.within_world() {
            return None;
        }
        let id = ObjectId(self.next_object_id);
        self.next_object_id += 1;
        let object = GameObject {
            id,
            definition,
            direction,
            boundary,
            location,
        };
        let footprint = object.footprint(&self.definitions);
        self.collision.add_object(&object, &footprint);
        self.regions.insert(Member::Object(id), location);
        self.objects.insert(id, object);
        Some(id)
    }

    pub fn remove_object(&mut self, id: ObjectId) -> Option<GameObject> {
        let object = self.objects.remove(&id)?;
        let footprint = object.footprint(&self.definitions);
        self.collision.remove_object(&object, &footprint);
        self.regions.remove(Member::Object(id), object.location);
        Some(object)
    }

    /// Swaps an object for another definition in place, e.g. an opened door.
    pub fn replace_object(&mut self, id: ObjectId, definition: u32) -> Option<ObjectId> {
        let old = self.objects.get(&id)?.clone();
        let known = if old.boundary {
            self.definitions.boundary(definition).is_some()
        } else {
            self.definitions.object(definition).is_some()
        };
        if !known {
            return None;
        }
        self.remove_object(id);
        self.add_object(definition, old.direction, old.boundary, old.location)
    }

    pub fn object_at(&self, location: Location, boundary: bool) -> Option<&GameObject> {
        let region = self.regions.region_at(location)?;
        region
            .objects
            .iter()
            .filter_map(|id| self.objects.get(id))
            .find(|object| object.location == location && object.boundary == boundary)
    }

    pub fn add_ground_item(
        &mut self,
        item: u32,
        amount: u32,
        location: Location,
        owner: Option<String>,
    ) -> GroundItemId {
        let id = GroundItemId(self.next_item_id);
        self.next_item_id += 1;
        self.regions.insert(Member::Item(id), location);
        self.ground_items.insert(
            id,
            GroundItem::new(id, item, amount, location, owner, &self.clock),
        );
        id
    }

    pub fn remove_ground_item(&mut self, id: GroundItemId) -> Option<GroundItem> {
        let item = self.ground_items.remove(&id)?;
        self.regions.remove(Member::Item(id), item.location);
        Some(item)
    }

    pub fn ground_items_at(&self, location: Location) -> Vec<&GroundItem> {
        let Some(region) = self.regions.region_at(location) else {
            return Vec::new();
        };
        region
            .items
            .iter()
            .filter_map(|id| self.ground_items.get(id))
            .filter(|item| item.location == location)
            .collect()
    }

    pub fn nearby_players(&self, location: Location, radius: i32) -> Vec<PlayerId> {
        let mut found: Vec<PlayerId> = self
            .regions
            .surrounding(location)
            .into_iter()
            .flat_map(|region| region.players.iter().copied())
            .filter(|id| {
                self.players
                    .get(id)
                    .map_or(false, |player| player.mob.location.within_range(location, radius))
            })
            .collect();
        found.sort();
        found.dedup();
        found
    }

    /// Living NPCs near `location`; the dead wait at the death spot and are
    /// never reported.
    pub fn nearby_npcs(&self, location: Location, radius: i32) -> Vec<NpcId> {
        let mut found: Vec<NpcId> = self
            .regions
            .surrounding(location)
            .into_iter()
            .flat_map(|region| region.npcs.iter().copied())
            .filter(|id| {
                self.npcs.get(id).map_or(false, |npc| {
                    !npc.mob.removed && npc.mob.location.within_range(location, radius)
                })
            })
            .collect();
        found.sort();
        found.dedup();
        found
    }

    pub fn send(&self, id: PlayerId, event: OutboundEvent) {
        if let Some(player) = self.players.get(&id) {
            player.send(event);
        }
    }

    pub fn message(&self, id: PlayerId, text: impl Into<String>) {
        self.send(id, OutboundEvent::Message(text.into()));
    }

    pub fn play_sound(&self, id: MobId, sound: &'static str) {
        if let MobId::Player(id) = id {
            self.send(id, OutboundEvent::Sound(sound));
        }
    }

    /// Sends `event` to every player in view of `location`.
    pub fn broadcast(&self, location: Location, event: OutboundEvent) {
        for id in self.nearby_players(location, VIEW_RADIUS) {
            self.send(id, event.clone());
        }
    }

    /// Removes a player from the world. Safe to call any number of times;
    /// only the first call does anything and returns the removed player.
    pub fn disconnect(&mut self, id: PlayerId) -> Option<Player> {
        if !self.players.contains_key(&id) {
            return None;
        }
        self.decline_trade(id);
        self.decline_duel(id);
        if let Some(opponent) = self.mob(MobId::Player(id)).and_then(|mob| mob.fight_target) {
            self.reset_fighting(opponent);
        }
        self.reset_all(id);
        let mut player = self.players.remove(&id)?;
        self.regions
            .remove(Member::Player(id), player.mob.location);
        player.send(OutboundEvent::Logout);
        player.session.begin_teardown();
        player.session.mark_disconnected();
        player.menu = None;
        player.mob.transients.clear();
        log_game(&format!("{} logged out at {}", player.username, player.mob.location));
        Some(player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::engage::start_combat;
    use crate::entities::inventory::ItemStack;
    use crate::world::region::RegionCoord;
    use crate::world::definitions::{
        BoundaryDefinition, NpcDefinition, NpcSpawn, ObjectDefinition, ObjectPlacement,
    };
    use crate::world::collision::Side;

    pub(crate) fn definitions() -> Definitions {
        let mut definitions = Definitions::default();
        definitions.insert_object(ObjectDefinition {
            id: 1,
            name: "Tree".to_string(),
            commands: vec!["chop".to_string()],
            kind: 1,
            width: 1,
            height: 1,
        });
        definitions.insert_boundary(BoundaryDefinition {
            id: 2,
            name: "Door".to_string(),
            solid: true,
        });
        definitions.insert_npc(NpcDefinition {
            id: 3,
            name: "Rat".to_string(),
            attackable: true,
            attack: 1,
            defense: 1,
            strength: 1,
            hits: 2,
            respawn_ticks: 10,
        });
        definitions
    }

    fn world() -> World {
        World::new(Arc::new(definitions()), GameClock::default(), 1)
    }

    #[test]
    fn connect_registers_region_membership() {
        let mut world = world();
        let handle = world.connect_player("alice", Location::new(100, 100), AttributeStore::new());
        let member = Member::Player(handle.player);
        assert_eq!(world.regions.regions_containing(member).len(), 1);
        assert!(world.is_connected(MobId::Player(handle.player)));
        assert_eq!(world.player_by_name("ALICE").map(|p| p.id), Some(handle.player));
    }

    #[test]
    fn logins_outside_the_world_start_at_the_spawn_point() {
        let mut world = world();
        let handle = world.connect_player("alice", Location::new(960, 40), AttributeStore::new());
        let player = world.player(handle.player).expect("alice");
        assert_eq!(player.location(), SPAWN_POINT);
        assert_eq!(
            world.regions.regions_containing(Member::Player(handle.player)),
            vec![RegionCoord::for_location(SPAWN_POINT).expect("region")]
        );
    }

    #[test]
    fn set_location_moves_region_membership() {
        let mut world = world();
        let handle = world.connect_player("alice", Location::new(40, 40), AttributeStore::new());
        let id = MobId::Player(handle.player);
        assert!(world.set_location(id, Location::new(200, 300)));
        let cells = world.regions.regions_containing(Member::Player(handle.player));
        assert_eq!(cells.len(), 1);
        assert!(world
            .regions
            .region_at(Location::new(200, 300))
            .map_or(false, |region| region.players.contains(&handle.player)));
    }

    #[test]
    fn disconnect_is_idempotent() {
        let mut world = world();
        let handle = world.connect_player("alice", Location::new(40, 40), AttributeStore::new());
        handle.transients.set_int("tried_reach", 2);
        let removed = world.disconnect(handle.player);
        assert!(removed.is_some());
        assert!(world.disconnect(handle.player).is_none());
        assert!(world.players.is_empty());
        assert!(world
            .regions
            .regions_containing(Member::Player(handle.player))
            .is_empty());
        assert!(handle.transients.snapshot().is_empty());
        assert!(handle.drain().contains(&OutboundEvent::Logout));
        assert!(!handle.is_connected());
    }

    type TeardownSnapshot = (
        Vec<Vec<RegionCoord>>,
        Vec<GroundItem>,
        Vec<(u16, AttributeStore, Vec<ItemStack>, Option<MobId>, usize)>,
    );

    fn teardown_snapshot(world: &World, players: &[PlayerId]) -> TeardownSnapshot {
        let regions = players
            .iter()
            .map(|id| world.regions.regions_containing(Member::Player(*id)))
            .collect();
        let items = world.ground_items.values().cloned().collect();
        let others = players
            .iter()
            .filter_map(|id| world.player(*id))
            .map(|player| {
                (
                    player.mob.state.bits(),
                    player.mob.transients.snapshot(),
                    player.trade_offer.items().to_vec(),
                    player.mob.fight_target,
                    player.mob.tasks.len(),
                )
            })
            .collect();
        (regions, items, others)
    }

    #[test]
    fn disconnect_mid_fight_and_trade_is_idempotent() {
        let mut world = world();
        let alice = world.connect_player("alice", Location::new(40, 40), AttributeStore::new());
        let bob = world.connect_player("bob", Location::new(41, 40), AttributeStore::new());
        let carol = world.connect_player("carol", Location::new(40, 41), AttributeStore::new());
        if let Some(player) = world.player_mut(alice.player) {
            player.inventory.add(10, 1, false).expect("item");
        }
        world.add_ground_item(20, 1, Location::new(40, 40), None);
        assert!(world.request_trade(alice.player, bob.player));
        assert!(world.request_trade(bob.player, alice.player));
        assert!(world.offer_trade_item(alice.player, 10, 1));
        assert!(start_combat(&mut world, MobId::Player(carol.player), MobId::Player(alice.player)));

        let everyone = [alice.player, bob.player, carol.player];
        let removed = world.disconnect(alice.player).expect("alice");
        assert_eq!(removed.inventory.count(10), 1);
        let once = teardown_snapshot(&world, &everyone);
        assert!(world.disconnect(alice.player).is_none());
        let twice = teardown_snapshot(&world, &everyone);
        assert_eq!(once, twice);

        assert!(once.0[0].is_empty());
        assert_eq!(once.0[1].len(), 1);
        assert_eq!(once.1.len(), 1);
        for id in [bob.player, carol.player] {
            let player = world.player(id).expect("partner");
            assert!(player.mob.state.is_idle());
            assert!(player.mob.tasks.is_empty());
            assert!(player.trade_offer.is_empty());
            assert_eq!(player.mob.fight_target, None);
        }
        assert!(bob.drain().contains(&OutboundEvent::TradeClose));
    }

    #[test]
    fn layout_installs_objects_and_spawns() {
        let mut world = world();
        let layout = Layout {
            tiles: Vec::new(),
            objects: vec![
                ObjectPlacement {
                    id: 1,
                    direction: 0,
                    boundary: false,
                    x: 50,
                    y: 50,
                },
                ObjectPlacement {
                    id: 99,
                    direction: 0,
                    boundary: false,
                    x: 51,
                    y: 50,
                },
            ],
            npcs: vec![NpcSpawn { id: 3, x: 60, y: 60 }],
        };
        let summary = world.load_layout(&layout);
        assert_eq!(summary.objects, 1);
        assert_eq!(summary.npcs, 1);
        assert_eq!(summary.skipped, 1);
        assert!(world.object_at(Location::new(50, 50), false).is_some());
        assert!(world.collision.is_blocked(50, 51, Side::North, true));
        assert_eq!(world.nearby_npcs(Location::new(58, 58), 5).len(), 1);
    }

    #[test]
    fn replacing_a_door_updates_collision() {
        let mut world = world();
        let mut definitions = definitions();
        definitions.insert_boundary(BoundaryDefinition {
            id: 4,
            name: "Open door".to_string(),
            solid: false,
        });
        world.definitions = Arc::new(definitions);
        let door = world
            .add_object(2, 0, true, Location::new(70, 70))
            .expect("door");
        assert!(world.collision.is_blocked(70, 70, Side::North, false));
        let open = world.replace_object(door, 4).expect("open door");
        assert!(!world.collision.is_blocked(70, 70, Side::North, false));
        assert!(world.objects.contains_key(&open));
        assert!(!world.objects.contains_key(&door));
    }

    #[test]
    fn ground_items_are_found_by_tile() {
        let mut world = world();
        let tile = Location::new(80, 80);
        let id = world.add_ground_item(20, 1, tile, Some("alice".to_string()));
        assert_eq!(world.ground_items_at(tile).len(), 1);
        assert!(world.ground_items_at(Location::new(81, 80)).is_empty());
        assert!(world.remove_ground_item(id).is_some());
        assert!(world.ground_items_at(tile).is_empty());
    }
}
