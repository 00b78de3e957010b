use crate::components::{
    Animation, CameraView, Collider, Health, MainCamera, Npc, Player, PlayerController,
    ProjectileOwner, RenderOrder, Scenery, Sprite, Tile, Transform, Velocity, Weapon,
};
use crate::config::EngineConfig;
use crate::ecs::{Entity, Priority, Registry};
use crate::geometry::Rect;
use crate::renderer::TextureId;
use crate::systems::{
    AnimationSystem, BoundsSystem, CameraFollowSystem, CollisionSystem, MovementSystem,
    PlayerControllerSystem, ProjectileTemplate, TextureRenderSystem,
};

/// Populates a registry with systems and entities.
///
/// `on_enter` runs right before the first initialize pass, whose flush applies
/// everything queued with [`Priority::Deferred`].
pub trait Scene {
    fn name(&self) -> &str;
    fn on_enter(&mut self, registry: &mut Registry, config: &EngineConfig);
    fn on_exit(&mut self, _registry: &mut Registry) {}
}

// ── Demo scene ──────────────────────────────────────────────────────────────

pub const TILESET: TextureId = TextureId(0);
pub const CHOPPER: TextureId = TextureId(1);
pub const TRUCK: TextureId = TextureId(2);
pub const AIRPLANE: TextureId = TextureId(3);
pub const WRECK: TextureId = TextureId(4);
pub const BULLET: TextureId = TextureId(5);

const TILE_SIZE: u32 = 32;

/// A player chopper over a tiled map with a few NPC vehicles.
#[derive(Debug, Default)]
pub struct DemoScene {
    player: Option<Entity>,
}

impl DemoScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(texture, width, height)` of every texture the scene references.
    pub fn textures() -> [(TextureId, u32, u32); 6] {
        [
            (TILESET, TILE_SIZE * 10, TILE_SIZE * 3),
            (CHOPPER, 64, 128),
            (TRUCK, 32, 32),
            (AIRPLANE, 96, 32),
            (WRECK, 32, 32),
            (BULLET, 4, 4),
        ]
    }

    pub fn player(&self) -> Option<Entity> {
        self.player
    }

    fn spawn_tiles(registry: &mut Registry, config: &EngineConfig) {
        let columns = config.map_width.div_ceil(TILE_SIZE);
        let rows = config.map_height.div_ceil(TILE_SIZE);
        for row in 0..rows {
            for column in 0..columns {
                let tile = registry.create_entity();
                let variant = (row * 7 + column * 3) % 10;
                registry.add_component(
                    tile,
                    Transform::at((column * TILE_SIZE) as f32, (row * TILE_SIZE) as f32),
                    Priority::Deferred,
                );
                registry.add_component(
                    tile,
                    Sprite { texture: TILESET, order: RenderOrder::BaseTile },
                    Priority::Deferred,
                );
                registry.add_component(
                    tile,
                    Tile {
                        source: Rect::new((variant * TILE_SIZE) as i32, 0, TILE_SIZE as i32, TILE_SIZE as i32),
                    },
                    Priority::Deferred,
                );
            }
        }
    }

    fn spawn_npc(registry: &mut Registry, x: f32, y: f32, velocity: Velocity, animated: bool) -> Entity {
        let npc = registry.create_entity();
        let texture = if animated { AIRPLANE } else { TRUCK };
        registry.add_component(npc, Transform::at(x, y), Priority::Deferred);
        registry.add_component(npc, velocity, Priority::Deferred);
        registry.add_component(npc, Sprite { texture, order: RenderOrder::Npc }, Priority::Deferred);
        if animated {
            registry.add_component(npc, Animation::new(32, 32, 1, 3, 125), Priority::Deferred);
        }
        registry.add_component(npc, Collider { width: 32.0, height: 32.0 }, Priority::Deferred);
        registry.add_component(npc, Health::full(5), Priority::Deferred);
        registry.add_tag::<Npc>(npc, Priority::Deferred);
        npc
    }
}

impl Scene for DemoScene {
    fn name(&self) -> &str {
        "demo"
    }

    fn on_enter(&mut self, registry: &mut Registry, config: &EngineConfig) {
        registry.add_system(PlayerControllerSystem::new(ProjectileTemplate {
            texture: BULLET,
            ..ProjectileTemplate::default()
        }));
        registry.add_system(MovementSystem::new());
        registry.add_system(BoundsSystem::new(config.map_width, config.map_height));
        registry.add_system(CameraFollowSystem::new(config.map_width, config.map_height));
        registry.add_system(CollisionSystem::new());
        registry.add_system(AnimationSystem::new());
        registry.add_system(TextureRenderSystem::new(config.debug_colliders));

        Self::spawn_tiles(registry, config);

        let player = registry.create_entity();
        registry.add_component(player, Transform::at(240.0, 115.0), Priority::Deferred);
        registry.add_component(player, Velocity::default(), Priority::Deferred);
        registry.add_component(player, Animation::new(32, 32, 4, 2, 125), Priority::Deferred);
        registry.add_component(player, PlayerController { speed: 100.0 }, Priority::Deferred);
        registry.add_component(player, Sprite { texture: CHOPPER, order: RenderOrder::Player }, Priority::Deferred);
        registry.add_component(
            player,
            Weapon {
                cadence_ms: 1000,
                damage: 5,
                owner: ProjectileOwner::Player,
                ..Weapon::default()
            },
            Priority::Deferred,
        );
        registry.add_component(player, Collider { width: 32.0, height: 32.0 }, Priority::Deferred);
        registry.add_component(player, Health::full(5), Priority::Deferred);
        registry.add_tag::<Player>(player, Priority::Deferred);
        self.player = Some(player);

        let camera = registry.create_entity();
        registry.add_component(camera, Transform::default(), Priority::Deferred);
        registry.add_component(
            camera,
            CameraView { width: config.window_width, height: config.window_height },
            Priority::Deferred,
        );
        registry.add_tag::<MainCamera>(camera, Priority::Deferred);

        let wreck = registry.create_entity();
        registry.add_component(
            wreck,
            Transform { rotation: 270.0, ..Transform::at(670.0, 530.0) },
            Priority::Deferred,
        );
        registry.add_component(wreck, Sprite { texture: WRECK, order: RenderOrder::TopTile }, Priority::Deferred);
        registry.add_tag::<Scenery>(wreck, Priority::Deferred);

        Self::spawn_npc(registry, 660.0, 420.0, Velocity::default(), false);
        Self::spawn_npc(registry, 160.0, 497.0, Velocity::new(100.0, 0.0), true);
        Self::spawn_npc(registry, 440.0, 380.0, Velocity::default(), true);

        tracing::info!(
            scene = self.name(),
            entities = registry.entity_count(),
            queued = registry.pending_requests(),
            "scene entered"
        );
    }

    fn on_exit(&mut self, _registry: &mut Registry) {
        tracing::info!(scene = self.name(), "scene exited");
        self.player = None;
    }
}
