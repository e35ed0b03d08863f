//! Rapier world ownership, collision layers and the read-only queries the
//! character sensors run against it.
#![forbid(unsafe_code)]

use rapier3d::prelude::*;

/// Collision layers used to tag static geometry.
pub mod layers {
    use rapier3d::prelude::Group;

    /// Walkable surfaces probed by the ground sphere.
    pub const GROUND: Group = Group::GROUP_1;
    /// Ledges the step ray is allowed to snap onto.
    pub const STAIRS: Group = Group::GROUP_2;
}

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: BroadPhaseMultiSap,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
}

impl PhysicsWorld {
    pub fn new(gravity: Vector<Real>) -> Self {
        Self {
            gravity,
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: BroadPhaseMultiSap::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    pub fn bodies(&self) -> &RigidBodySet {
        &self.bodies
    }

    pub fn colliders(&self) -> &ColliderSet {
        &self.colliders
    }

    pub fn query_pipeline(&self) -> &QueryPipeline {
        &self.query_pipeline
    }

    pub fn step(&mut self, dt: Real) {
        self.integration_parameters.dt = dt;
        let physics_hooks = ();
        let event_handler = ();
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &physics_hooks,
            &event_handler,
        );
        self.query_pipeline.update(&self.colliders);
    }

    /// Inserts a static collider that only belongs to `layers`.
    pub fn insert_layered_collider(
        &mut self,
        mut collider: Collider,
        layers: Group,
    ) -> ColliderHandle {
        collider.set_collision_groups(InteractionGroups::new(layers, Group::ALL));
        self.colliders.insert(collider)
    }

    /// True when a ball of `radius` at `center` touches any collider in `mask`.
    pub fn sphere_overlap(&self, center: Point<Real>, radius: Real, mask: Group) -> bool {
        if radius <= 0.0 {
            return false;
        }
        let ball = Ball::new(radius);
        let pose = Isometry::translation(center.x, center.y, center.z);
        self.query_pipeline
            .intersection_with_shape(
                &self.bodies,
                &self.colliders,
                &pose,
                &ball,
                layer_filter(mask),
            )
            .is_some()
    }

    /// Closest hit point along the ray against colliders in `mask`.
    pub fn raycast(
        &self,
        origin: Point<Real>,
        direction: Vector<Real>,
        max_distance: Real,
        mask: Group,
    ) -> Option<Point<Real>> {
        if direction.norm_squared() <= 1.0e-12 || max_distance <= 0.0 {
            return None;
        }
        let ray = Ray::new(origin, direction.normalize());
        let (_, toi) = self.query_pipeline.cast_ray(
            &self.bodies,
            &self.colliders,
            &ray,
            max_distance,
            true,
            layer_filter(mask),
        )?;
        Some(ray.point_at(toi))
    }
}

fn layer_filter(mask: Group) -> QueryFilter<'static> {
    QueryFilter::default().groups(InteractionGroups::new(Group::ALL, mask))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_scene() -> PhysicsWorld {
        let mut world = PhysicsWorld::new(vector![0.0, -20.0, 0.0]);
        let floor = ColliderBuilder::cuboid(5.0, 0.1, 5.0)
            .translation(vector![0.0, -0.1, 0.0])
            .build();
        world.insert_layered_collider(floor, layers::GROUND);
        let step = ColliderBuilder::cuboid(0.5, 0.15, 0.5)
            .translation(vector![0.0, 0.15, 2.0])
            .build();
        world.insert_layered_collider(step, layers::STAIRS);
        world.step(1.0 / 60.0);
        world
    }

    #[test]
    fn sphere_overlap_respects_layers() {
        let world = build_scene();
        let feet = point![0.0, 0.1, 0.0];
        assert!(world.sphere_overlap(feet, 0.4, layers::GROUND));
        assert!(!world.sphere_overlap(feet, 0.4, layers::STAIRS));
        assert!(!world.sphere_overlap(point![0.0, 2.0, 0.0], 0.4, layers::GROUND));
    }

    #[test]
    fn raycast_reports_hit_point() {
        let world = build_scene();
        let hit = world.raycast(
            point![0.0, 0.1, 1.0],
            vector![0.0, 0.0, 1.0],
            1.0,
            layers::STAIRS,
        );
        let hit = hit.expect("stairs ahead");
        assert!((hit.z - 1.5).abs() < 1.0e-3);
        assert!((hit.y - 0.1).abs() < 1.0e-3);

        let miss = world.raycast(
            point![0.0, 0.1, 1.0],
            vector![0.0, 0.0, 1.0],
            0.1,
            layers::STAIRS,
        );
        assert!(miss.is_none());
    }
}
