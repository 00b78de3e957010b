use std::cell::Cell;
use std::rc::Rc;

use glam::Vec2;

use crate::components::{Animation, CameraView, Collider, Health, MainCamera, Player, Sprite, Tile, Transform};
use crate::ecs::{Entity, Registry, System, SystemBase};
use crate::events::KeyUpEvent;
use crate::geometry::Rect;
use crate::input::KeyCode;
use crate::renderer::{Color, Renderer};

const HEALTH_BAR_COLOR: Color = Color::GREEN;
const COLLIDER_COLOR: Color = Color::RED;

/// World-space viewport of the main camera.
#[derive(Copy, Clone, Debug)]
struct Viewport {
    origin: Vec2,
    size: Vec2,
}

impl Viewport {
    /// Loose overlap test: an entity whose right/bottom edge sits exactly on
    /// the viewport's left/top edge still counts as visible.
    fn overlaps(&self, position: Vec2, size: Vec2) -> bool {
        let end = (self.origin + self.size).round();
        position.x + size.x >= self.origin.x
            && position.x < end.x
            && position.y + size.y >= self.origin.y
            && position.y < end.y
    }
}

/// Draws every sprite, tile and plain texture, back to front by [`RenderOrder`](crate::components::RenderOrder).
///
/// Entities outside the [`MainCamera`] viewport are skipped, except players,
/// which are always drawn. Entities with [`Health`] get a bar along their top
/// edge. Releasing `B` toggles collider outlines.
pub struct TextureRenderSystem {
    base: SystemBase,
    show_colliders: Rc<Cell<bool>>,
    subscribed: bool,
}

impl TextureRenderSystem {
    pub fn new(show_colliders: bool) -> Self {
        Self {
            base: SystemBase::new("texture-render")
                .require::<Transform>()
                .require::<Sprite>(),
            show_colliders: Rc::new(Cell::new(show_colliders)),
            subscribed: false,
        }
    }

    pub fn shows_colliders(&self) -> bool {
        self.show_colliders.get()
    }

    fn viewport(registry: &Registry) -> Option<Viewport> {
        registry.entities_with_tag::<MainCamera>().iter().find_map(|&camera| {
            let transform = registry.try_get_component::<Transform>(camera)?;
            let view = registry.try_get_component::<CameraView>(camera)?;
            Some(Viewport {
                origin: transform.position,
                size: Vec2::new(view.width as f32, view.height as f32),
            })
        })
    }

    /// Unscaled source size of what gets drawn for `entity`.
    fn source_size(registry: &Registry, renderer: &dyn Renderer, entity: Entity) -> Vec2 {
        if let Some(anim) = registry.try_get_component::<Animation>(entity) {
            Vec2::new(anim.frame_width as f32, anim.frame_height as f32)
        } else if let Some(tile) = registry.try_get_component::<Tile>(entity) {
            Vec2::new(tile.source.w as f32, tile.source.h as f32)
        } else {
            let texture = registry.get_component::<Sprite>(entity).texture;
            Vec2::new(
                renderer.texture_width(texture) as f32,
                renderer.texture_height(texture) as f32,
            )
        }
    }

    fn is_visible(registry: &Registry, viewport: Option<Viewport>, entity: Entity, size: Vec2) -> bool {
        let Some(viewport) = viewport else {
            return true;
        };
        if registry.has_tag::<Player>(entity) {
            return true;
        }
        let position = registry.get_component::<Transform>(entity).position;
        viewport.overlaps(position, size)
    }

    fn draw(registry: &Registry, renderer: &mut dyn Renderer, entity: Entity, origin: Vec2, size: Vec2, show_colliders: bool) {
        let transform = registry.get_component::<Transform>(entity);
        let sprite = registry.get_component::<Sprite>(entity);
        let screen = transform.position - origin;
        let dst = Rect::from_f32(screen.x, screen.y, size.x, size.y);

        let src = if let Some(anim) = registry.try_get_component::<Animation>(entity) {
            Some(anim.source_rect())
        } else {
            registry.try_get_component::<Tile>(entity).map(|tile| tile.source)
        };
        renderer.draw_texture(sprite.texture, src, dst, transform.rotation);

        if let Some(health) = registry.try_get_component::<Health>(entity) {
            let bar = Rect::from_f32(
                screen.x,
                screen.y,
                health.fraction() * size.x,
                0.1 * size.y,
            );
            renderer.fill_rect(bar, HEALTH_BAR_COLOR);
        }

        if show_colliders {
            if let Some(collider) = registry.try_get_component::<Collider>(entity) {
                let outline = Rect::from_f32(
                    screen.x,
                    screen.y,
                    collider.width * transform.scale.x,
                    collider.height * transform.scale.y,
                );
                renderer.draw_rect(outline, COLLIDER_COLOR);
            }
        }
    }
}

impl Default for TextureRenderSystem {
    fn default() -> Self {
        Self::new(false)
    }
}

impl System for TextureRenderSystem {
    fn base(&self) -> &SystemBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut SystemBase {
        &mut self.base
    }

    fn initialize(&mut self, registry: &mut Registry) {
        if self.subscribed {
            return;
        }
        let show_colliders = Rc::clone(&self.show_colliders);
        registry.subscribe::<KeyUpEvent>(move |_, event| {
            if event.key == KeyCode::KeyB {
                show_colliders.set(!show_colliders.get());
                tracing::debug!(enabled = show_colliders.get(), "collider outlines toggled");
            }
        });
        self.subscribed = true;
    }

    fn render(&mut self, registry: &mut Registry, renderer: &mut dyn Renderer) {
        let registry = &*registry;
        let viewport = Self::viewport(registry);
        let origin = viewport.map_or(Vec2::ZERO, |v| v.origin);
        let textures: &dyn Renderer = &*renderer;

        let mut visible: Vec<(Entity, Vec2)> = self
            .base
            .entities()
            .iter()
            .filter_map(|&entity| {
                let scale = registry.get_component::<Transform>(entity).scale;
                let size = Self::source_size(registry, textures, entity) * scale;
                Self::is_visible(registry, viewport, entity, size).then_some((entity, size))
            })
            .collect();
        visible.sort_by_key(|&(entity, _)| registry.get_component::<Sprite>(entity).order);

        let show_colliders = self.show_colliders.get();
        for (entity, size) in visible {
            Self::draw(registry, renderer, entity, origin, size, show_colliders);
        }
    }
}
