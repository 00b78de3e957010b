use std::cell::RefCell;
use std::rc::Rc;

use rotorcs::ecs::*;
use rotorcs::renderer::{RecordingRenderer, Renderer};

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Clone, Copy)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Debug, PartialEq, Clone, Copy)]
    struct Velocity {
        x: f32,
        y: f32,
    }

    #[derive(Debug, PartialEq)]
    struct Health(i32);

    #[derive(Debug, PartialEq)]
    struct Name(String);

    struct Enemy;
    struct Friendly;

    // -- helpers ------------------------------------------------------------

    struct Motion {
        base: SystemBase,
    }

    impl Motion {
        fn new() -> Self {
            Self {
                base: SystemBase::new("motion")
                    .require::<Position>()
                    .require::<Velocity>(),
            }
        }
    }

    impl System for Motion {
        fn base(&self) -> &SystemBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut SystemBase {
            &mut self.base
        }
        fn update(&mut self, registry: &mut Registry, dt: f32) {
            for &e in self.base.entities() {
                let v = *registry.get_component::<Velocity>(e);
                let p = registry.get_component_mut::<Position>(e);
                p.x += v.x * dt;
                p.y += v.y * dt;
            }
        }
    }

    /// Requires only `Health`; despawns anything whose health ran out.
    struct Reaper {
        base: SystemBase,
    }

    impl System for Reaper {
        fn base(&self) -> &SystemBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut SystemBase {
            &mut self.base
        }
        fn update(&mut self, registry: &mut Registry, _dt: f32) {
            for &e in self.base.entities() {
                if registry.get_component::<Health>(e).0 <= 0 {
                    registry.remove_entity(e);
                }
            }
        }
    }

    /// Misbehaves by mutating structure immediately from inside its update.
    struct Impatient {
        base: SystemBase,
    }

    impl System for Impatient {
        fn base(&self) -> &SystemBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut SystemBase {
            &mut self.base
        }
        fn update(&mut self, registry: &mut Registry, _dt: f32) {
            let e = registry.create_entity();
            registry.add_component(e, Health(1), Priority::Immediate);
        }
    }

    /// Spawns one projectile-like entity per update, all deferred.
    struct Spawner {
        base: SystemBase,
    }

    impl System for Spawner {
        fn base(&self) -> &SystemBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut SystemBase {
            &mut self.base
        }
        fn update(&mut self, registry: &mut Registry, _dt: f32) {
            let e = registry.create_entity();
            registry.add_component(e, Position { x: 0.0, y: 0.0 }, Priority::Deferred);
            registry.add_component(e, Velocity { x: 1.0, y: 0.0 }, Priority::Deferred);
            registry.add_tag::<Friendly>(e, Priority::Deferred);
        }
    }

    /// Same misbehaviour as `Impatient`, but from the render hook.
    struct Scribbler {
        base: SystemBase,
    }

    impl System for Scribbler {
        fn base(&self) -> &SystemBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut SystemBase {
            &mut self.base
        }
        fn render(&mut self, registry: &mut Registry, _renderer: &mut dyn Renderer) {
            let e = registry.create_entity();
            registry.add_component(e, Health(1), Priority::Immediate);
        }
    }

    /// Runs a one-off setup step from `initialize`. Requires `Name`, so it
    /// never counts as a home for the entities it edits.
    struct Setup {
        base: SystemBase,
        step: Box<dyn FnMut(&mut Registry)>,
    }

    impl Setup {
        fn new(step: impl FnMut(&mut Registry) + 'static) -> Self {
            Self {
                base: SystemBase::new("setup").require::<Name>(),
                step: Box::new(step),
            }
        }
    }

    impl System for Setup {
        fn base(&self) -> &SystemBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut SystemBase {
            &mut self.base
        }
        fn initialize(&mut self, registry: &mut Registry) {
            (self.step)(registry);
        }
    }

    type Trace = Rc<RefCell<Vec<String>>>;

    /// Logs every hook call as `name:hook`.
    struct Tracer {
        base: SystemBase,
        trace: Trace,
    }

    impl Tracer {
        fn new(name: &'static str, trace: &Trace) -> Self {
            Self {
                base: SystemBase::new(name),
                trace: Rc::clone(trace),
            }
        }

        fn log(&self, hook: &str) {
            self.trace.borrow_mut().push(format!("{}:{hook}", self.base.name()));
        }
    }

    impl System for Tracer {
        fn base(&self) -> &SystemBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut SystemBase {
            &mut self.base
        }
        fn initialize(&mut self, _registry: &mut Registry) {
            self.log("initialize");
        }
        fn update(&mut self, _registry: &mut Registry, _dt: f32) {
            self.log("update");
        }
        fn render(&mut self, _registry: &mut Registry, _renderer: &mut dyn Renderer) {
            self.log("render");
        }
    }

    fn members(registry: &Registry, name: &str) -> Vec<Entity> {
        registry
            .systems()
            .find(|s| s.name() == name)
            .map(|s| s.base().entities().iter().copied().collect())
            .unwrap_or_default()
    }

    fn mover(registry: &mut Registry, x: f32, vx: f32) -> Entity {
        let e = registry.create_entity();
        registry.add_component(e, Position { x, y: 0.0 }, Priority::Immediate);
        registry.add_component(e, Velocity { x: vx, y: 0.0 }, Priority::Immediate);
        e
    }

    // -- entity lifecycle ---------------------------------------------------

    #[test]
    fn entities_are_alive_until_flushed_away() {
        let mut registry = Registry::new();
        let e = registry.create_entity();
        assert!(registry.is_alive(e));
        assert!(!registry.is_active(e));

        registry.flush();
        assert!(registry.is_active(e));

        registry.remove_entity(e);
        assert!(registry.is_alive(e));
        registry.flush();
        assert!(!registry.is_alive(e));
        assert_eq!(registry.entity_count(), 0);
    }

    #[test]
    fn teardown_erases_components_tags_and_membership() {
        let mut registry = Registry::new();
        registry.add_system(Motion::new());
        let e = mover(&mut registry, 0.0, 1.0);
        registry.add_component(e, Name("ship".into()), Priority::Immediate);
        registry.add_tag::<Enemy>(e, Priority::Immediate);
        registry.flush();
        assert_eq!(members(&registry, "motion"), vec![e]);

        registry.remove_entity(e);
        registry.flush();

        assert!(!registry.has_component::<Position>(e));
        assert!(registry.try_get_component::<Name>(e).is_none());
        assert!(registry.entities_with_tag::<Enemy>().is_empty());
        assert!(members(&registry, "motion").is_empty());
        assert!(registry.signature(e).is_empty());
    }

    #[test]
    fn recycled_id_starts_clean() {
        let mut registry = Registry::new();
        let old = registry.create_entity();
        registry.add_component(old, Health(100), Priority::Immediate);
        registry.add_tag::<Enemy>(old, Priority::Immediate);
        registry.remove_entity(old);
        registry.flush();

        let new = registry.create_entity();
        assert_eq!(old, new);
        assert!(!registry.has_component::<Health>(new));
        assert!(!registry.has_tag::<Enemy>(new));
    }

    // -- components ---------------------------------------------------------

    #[test]
    fn signature_tracks_components() {
        let mut registry = Registry::new();
        let e = mover(&mut registry, 0.0, 0.0);
        let sig = registry.signature(e);
        assert_eq!(sig.count(), 2);
        assert!(sig.contains(Signature::of::<Position>()));

        registry.remove_component::<Velocity>(e, Priority::Immediate);
        assert_eq!(registry.signature(e), Signature::of::<Position>());
    }

    #[test]
    fn get_component_mut_writes_through() {
        let mut registry = Registry::new();
        let e = registry.create_entity();
        registry.add_component(e, Health(10), Priority::Immediate);
        registry.get_component_mut::<Health>(e).0 -= 3;
        assert_eq!(registry.get_component::<Health>(e), &Health(7));
    }

    #[test]
    #[should_panic(expected = "has no")]
    fn get_missing_component_panics() {
        let mut registry = Registry::new();
        let e = registry.create_entity();
        registry.add_component(e, Health(1), Priority::Immediate);
        registry.get_component::<Name>(e);
    }

    #[test]
    fn store_stays_packed_after_removals() {
        let mut registry = Registry::new();
        let entities: Vec<Entity> = (0..5)
            .map(|i| {
                let e = registry.create_entity();
                registry.add_component(e, Health(i), Priority::Immediate);
                e
            })
            .collect();
        registry.flush();

        registry.remove_entity(entities[1]);
        registry.remove_entity(entities[3]);
        registry.flush();

        let store = registry.store::<Health>().unwrap();
        assert_eq!(store.len(), 3);
        assert!(store.is_consistent());
        assert_eq!(registry.get_component::<Health>(entities[4]), &Health(4));
    }

    // -- system membership --------------------------------------------------

    #[test]
    fn membership_follows_signature_changes() {
        let mut registry = Registry::new();
        registry.add_system(Motion::new());
        registry.add_system(Reaper {
            base: SystemBase::new("reaper").require::<Health>(),
        });

        let e = registry.create_entity();
        registry.add_component(e, Position { x: 0.0, y: 0.0 }, Priority::Immediate);
        registry.add_component(e, Health(3), Priority::Immediate);
        registry.flush();
        assert!(members(&registry, "motion").is_empty());
        assert_eq!(members(&registry, "reaper"), vec![e]);

        registry.add_component(e, Velocity { x: 1.0, y: 0.0 }, Priority::Immediate);
        assert_eq!(members(&registry, "motion"), vec![e]);

        registry.remove_component::<Velocity>(e, Priority::Immediate);
        assert!(members(&registry, "motion").is_empty());
        registry.flush();
        assert!(registry.is_alive(e), "still qualifies for the reaper");
    }

    #[test]
    fn entity_qualifying_for_no_system_is_removed() {
        let mut registry = Registry::new();
        registry.add_system(Motion::new());
        let e = mover(&mut registry, 0.0, 1.0);
        registry.add_component(e, Name("drifter".into()), Priority::Immediate);
        registry.flush();

        registry.remove_component::<Velocity>(e, Priority::Immediate);
        registry.flush();
        assert!(!registry.is_alive(e));
    }

    #[test]
    fn without_systems_only_empty_entities_are_removed() {
        let mut registry = Registry::new();
        let e = mover(&mut registry, 0.0, 1.0);
        registry.flush();

        registry.remove_component::<Velocity>(e, Priority::Immediate);
        registry.flush();
        assert!(registry.is_alive(e));

        registry.remove_component::<Position>(e, Priority::Immediate);
        registry.flush();
        assert!(!registry.is_alive(e));
    }

    #[test]
    fn deferred_removal_cascades_within_one_flush() {
        let mut registry = Registry::new();
        let e = registry.create_entity();
        registry.add_component(e, Health(1), Priority::Immediate);
        registry.add_tag::<Enemy>(e, Priority::Immediate);
        registry.flush();

        registry.remove_component::<Health>(e, Priority::Deferred);
        registry.flush();
        assert!(!registry.is_alive(e));
        assert!(registry.entities_with_tag::<Enemy>().is_empty());
        assert_eq!(registry.pending_requests(), 0);
    }

    // -- flush ordering -----------------------------------------------------

    #[test]
    fn adds_apply_before_removes_in_a_flush() {
        let mut registry = Registry::new();
        let e = registry.create_entity();
        registry.add_component(e, Name("keep".into()), Priority::Immediate);
        registry.flush();

        registry.remove_component::<Health>(e, Priority::Deferred);
        registry.add_component(e, Health(5), Priority::Deferred);
        registry.flush();
        assert!(!registry.has_component::<Health>(e));
        assert!(registry.is_alive(e));
    }

    #[test]
    fn tag_adds_apply_before_tag_removes() {
        let mut registry = Registry::new();
        let e = registry.create_entity();
        registry.remove_tag::<Enemy>(e, Priority::Deferred);
        registry.add_tag::<Enemy>(e, Priority::Deferred);
        registry.flush();
        assert!(!registry.has_tag::<Enemy>(e));
    }

    #[test]
    fn deferred_duplicate_tag_is_ignored() {
        let mut registry = Registry::new();
        let e = registry.create_entity();
        registry.add_tag::<Friendly>(e, Priority::Deferred);
        registry.add_tag::<Friendly>(e, Priority::Deferred);
        registry.flush();
        assert_eq!(registry.entities_with_tag::<Friendly>(), &[e]);
    }

    #[test]
    fn tag_lookup_preserves_insertion_order() {
        let mut registry = Registry::new();
        let a = registry.create_entity();
        let b = registry.create_entity();
        let c = registry.create_entity();
        for e in [c, a, b] {
            registry.add_tag::<Enemy>(e, Priority::Immediate);
        }
        assert_eq!(registry.entities_with_tag::<Enemy>(), &[c, a, b]);
        assert!(registry.entities_with_tag::<Friendly>().is_empty());
    }

    // -- orchestration ------------------------------------------------------

    #[test]
    fn update_pass_integrates_motion() {
        let mut registry = Registry::new();
        registry.add_system(Motion::new());
        let e = mover(&mut registry, 0.0, 10.0);

        registry.run_systems_update(1.0);
        assert_eq!(registry.get_component::<Position>(e), &Position { x: 10.0, y: 0.0 });
        registry.run_systems_update(0.5);
        assert_eq!(registry.get_component::<Position>(e).x, 15.0);
    }

    #[test]
    fn entities_spawned_during_update_join_next_frame() {
        let mut registry = Registry::new();
        registry.add_system(Motion::new());
        registry.add_system(Spawner {
            base: SystemBase::new("spawner"),
        });

        registry.run_systems_update(1.0);
        let spawned = registry.entities_with_tag::<Friendly>().to_vec();
        assert!(spawned.is_empty(), "deferred tag not applied yet");
        assert_eq!(registry.pending_requests(), 4);

        registry.run_systems_update(1.0);
        let spawned = registry.entities_with_tag::<Friendly>().to_vec();
        assert_eq!(spawned.len(), 1);
        assert_eq!(registry.get_component::<Position>(spawned[0]).x, 1.0);
    }

    #[test]
    fn removal_requested_during_update_happens_next_flush() {
        let mut registry = Registry::new();
        registry.add_system(Reaper {
            base: SystemBase::new("reaper").require::<Health>(),
        });
        let e = registry.create_entity();
        registry.add_component(e, Health(0), Priority::Immediate);

        registry.run_systems_update(0.016);
        assert!(registry.is_alive(e));
        registry.flush();
        assert!(!registry.is_alive(e));
    }

    #[test]
    #[should_panic(expected = "during a system pass")]
    fn immediate_mutation_inside_update_panics() {
        let mut registry = Registry::new();
        registry.add_system(Impatient {
            base: SystemBase::new("impatient"),
        });
        registry.run_systems_update(0.016);
    }

    #[test]
    #[should_panic(expected = "during a system pass")]
    fn immediate_mutation_inside_render_panics() {
        let mut registry = Registry::new();
        registry.add_system(Scribbler {
            base: SystemBase::new("scribbler"),
        });
        registry.run_systems_render(&mut RecordingRenderer::new());
    }

    #[test]
    fn systems_keep_registration_order() {
        let mut registry = Registry::new();
        registry.add_system(Motion::new());
        registry.add_system(Reaper {
            base: SystemBase::new("reaper").require::<Health>(),
        });
        registry.run_systems_update(0.0);
        let names: Vec<&str> = registry.systems().map(|s| s.name()).collect();
        assert_eq!(names, vec!["motion", "reaper"]);
        assert!(!registry.is_in_update());
    }

    #[test]
    fn hooks_run_in_registration_order() {
        let trace = Trace::default();
        let mut registry = Registry::new();
        for name in ["first", "second", "third"] {
            registry.add_system(Tracer::new(name, &trace));
        }

        registry.run_systems_initialize();
        registry.run_systems_update(0.016);
        registry.run_systems_render(&mut RecordingRenderer::new());
        registry.run_systems_update(0.016);

        assert_eq!(
            *trace.borrow(),
            vec![
                "first:initialize",
                "second:initialize",
                "third:initialize",
                "first:update",
                "second:update",
                "third:update",
                "first:render",
                "second:render",
                "third:render",
                "first:update",
                "second:update",
                "third:update",
            ]
        );
    }

    // -- initialize pass ----------------------------------------------------

    #[test]
    fn component_added_during_initialize_joins_systems() {
        let mut registry = Registry::new();
        let e = registry.create_entity();
        registry.add_component(e, Position { x: 0.0, y: 0.0 }, Priority::Immediate);
        registry.add_system(Motion::new());
        registry.add_system(Setup::new(move |registry| {
            registry.add_component(e, Velocity { x: 2.0, y: 0.0 }, Priority::Immediate);
        }));

        registry.run_systems_initialize();
        assert_eq!(members(&registry, "motion"), vec![e]);

        registry.run_systems_update(1.0);
        assert_eq!(registry.get_component::<Position>(e).x, 2.0);
    }

    #[test]
    fn component_removed_during_initialize_leaves_systems_and_orphans() {
        let mut registry = Registry::new();
        let e = mover(&mut registry, 0.0, 1.0);
        registry.add_system(Motion::new());
        registry.add_system(Setup::new(move |registry| {
            registry.remove_component::<Velocity>(e, Priority::Immediate);
        }));

        registry.run_systems_initialize();
        assert!(members(&registry, "motion").is_empty());
        assert!(!registry.has_component::<Velocity>(e));

        registry.run_systems_update(1.0);
        assert!(!registry.is_alive(e));
        assert!(!registry.has_component::<Position>(e));
    }

    #[test]
    fn removal_during_initialize_keeps_entities_other_systems_want() {
        let mut registry = Registry::new();
        let e = mover(&mut registry, 0.0, 1.0);
        registry.add_component(e, Health(3), Priority::Immediate);
        registry.add_system(Motion::new());
        registry.add_system(Reaper {
            base: SystemBase::new("reaper").require::<Health>(),
        });
        registry.add_system(Setup::new(move |registry| {
            registry.remove_component::<Velocity>(e, Priority::Immediate);
        }));

        registry.run_systems_initialize();
        registry.flush();
        assert!(registry.is_alive(e));
        assert!(members(&registry, "motion").is_empty());
        assert_eq!(members(&registry, "reaper"), vec![e]);
    }
}
