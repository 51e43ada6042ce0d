//! # CPU Backend
//!
//! Parallel substeps using Rayon. Forces are gathered per node into the
//! particle's own accumulator, so the accumulate pass only reads shared
//! positions and the integrate pass only touches one particle at a time.

use rayon::prelude::*;
use signal_graph_core::Vec3;

use crate::backend::{ForceBackend, ForceField};
use crate::{Particle, Result, SimParams};

/// CPU force backend using Rayon.
#[derive(Debug, Default, Clone)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Total force on `node` given the current positions.
pub(crate) fn node_force(
    node: usize,
    particles: &[Particle],
    field: &ForceField,
    params: &SimParams,
) -> Vec3 {
    let me = &particles[node];
    let p = me.position();
    let mut force = Vec3::ZERO;

    // Pairwise repulsion, magnitude ~ 1 / distance.
    for (j, other) in particles.iter().enumerate() {
        if j == node {
            continue;
        }
        let d = p - other.position();
        let d2 = d.length_squared() + params.softening;
        if d2 > 0.0 {
            force += d * (params.repulsion * me.charge * other.charge / d2);
        }
    }

    // Category anchoring outside the radius.
    for &c in field.categories_of(node) {
        let anchor = field.anchors[c as usize];
        let offset = Vec3::from(anchor.center) - p;
        let dist = offset.length();
        if dist > anchor.radius {
            force += offset * (params.anchor_pull * (dist - anchor.radius) / dist);
        }
    }

    // Hookean springs toward the rest length.
    for &l in field.links_of(node) {
        let link = field.links[l as usize];
        let other = if link.par1 as usize == node {
            link.par2
        } else {
            link.par1
        };
        let dir = particles[other as usize].position() - p;
        let dist = dir.length();
        if dist > 0.0 {
            force += dir * (params.spring_tension * link.strength * (dist - link.length) / dist);
        }
    }
    force
}

/// Semi-implicit Euler step; clears the force accumulator.
pub(crate) fn integrate(particle: &mut Particle, params: &SimParams) {
    let inv_mass = if particle.mass > 0.0 {
        1.0 / particle.mass
    } else {
        0.0
    };
    let force = Vec3::from(particle.force);
    let velocity = (particle.velocity() + force * (inv_mass * params.dt)) * params.damping;
    particle.velocity = velocity.into();
    particle.position = (particle.position() + velocity * params.dt).into();
    particle.force = [0.0; 3];
}

impl ForceBackend for CpuBackend {
    fn run_substeps(
        &mut self,
        particles: &mut [Particle],
        field: &ForceField,
        params: &SimParams,
        substeps: u32,
    ) -> Result<()> {
        for _ in 0..substeps {
            let current: &[Particle] = particles;
            let forces: Vec<Vec3> = (0..current.len())
                .into_par_iter()
                .map(|i| node_force(i, current, field, params))
                .collect();

            particles
                .par_iter_mut()
                .zip(forces.par_iter())
                .for_each(|(particle, force)| {
                    particle.force = (Vec3::from(particle.force) + *force).into();
                    integrate(particle, params);
                });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "cpu"
    }
}
