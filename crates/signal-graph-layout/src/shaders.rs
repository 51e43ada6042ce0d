//! WGSL compute shaders for force-directed layout.

/// Accumulate and integrate entry points, one dispatch each per substep.
///
/// Mirrors `cpu::node_force` and `cpu::integrate` expression by expression.
pub const FORCE_SHADER: &str = r#"
// ============================================================================
// Data structures
// ============================================================================

struct Particle {
    position: array<f32, 3>,
    velocity: array<f32, 3>,
    force: array<f32, 3>,
    mass: f32,
    charge: f32,
    size: f32,
    color: array<f32, 4>,
}

struct Link {
    par1: u32,
    par2: u32,
    length: f32,
    strength: f32,
    color: array<f32, 4>,
}

struct NodeSpan {
    link_start: u32,
    link_count: u32,
    category_start: u32,
    category_count: u32,
}

struct Anchor {
    center: array<f32, 3>,
    radius: f32,
}

struct Params {
    node_count: u32,
    link_count: u32,
    dt: f32,
    damping: f32,
    repulsion: f32,
    spring_tension: f32,
    anchor_pull: f32,
    softening: f32,
}

// ============================================================================
// Bindings
// ============================================================================

@group(0) @binding(0) var<storage, read_write> particles: array<Particle>;
@group(0) @binding(1) var<storage, read> links: array<Link>;
@group(0) @binding(2) var<storage, read> link_index: array<u32>;
@group(0) @binding(3) var<storage, read> spans: array<NodeSpan>;
@group(0) @binding(4) var<storage, read> anchors: array<Anchor>;
@group(0) @binding(5) var<storage, read> category_index: array<u32>;
@group(0) @binding(6) var<uniform> params: Params;

fn v3(a: array<f32, 3>) -> vec3<f32> {
    return vec3<f32>(a[0], a[1], a[2]);
}

fn a3(v: vec3<f32>) -> array<f32, 3> {
    return array<f32, 3>(v.x, v.y, v.z);
}

fn len_sq(v: vec3<f32>) -> f32 {
    return v.x * v.x + v.y * v.y + v.z * v.z;
}

// ============================================================================
// Accumulate: gather all forces acting on one node
// ============================================================================

@compute @workgroup_size(256)
fn accumulate(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let idx = global_id.x;
    if (idx >= params.node_count) {
        return;
    }

    let p = v3(particles[idx].position);
    let charge = particles[idx].charge;
    var force = vec3<f32>(0.0, 0.0, 0.0);

    // Pairwise repulsion
    for (var j: u32 = 0u; j < params.node_count; j = j + 1u) {
        if (j == idx) {
            continue;
        }
        let d = p - v3(particles[j].position);
        let d2 = len_sq(d) + params.softening;
        if (d2 > 0.0) {
            force = force + d * (params.repulsion * charge * particles[j].charge / d2);
        }
    }

    let span = spans[idx];

    // Category anchoring
    for (var k: u32 = 0u; k < span.category_count; k = k + 1u) {
        let anchor = anchors[category_index[span.category_start + k]];
        let offset = v3(anchor.center) - p;
        let dist = sqrt(len_sq(offset));
        if (dist > anchor.radius) {
            force = force + offset * (params.anchor_pull * (dist - anchor.radius) / dist);
        }
    }

    // Springs
    for (var k: u32 = 0u; k < span.link_count; k = k + 1u) {
        let link = links[link_index[span.link_start + k]];
        var other = link.par1;
        if (link.par1 == idx) {
            other = link.par2;
        }
        let dir = v3(particles[other].position) - p;
        let dist = sqrt(len_sq(dir));
        if (dist > 0.0) {
            force = force + dir * (params.spring_tension * link.strength * (dist - link.length) / dist);
        }
    }

    particles[idx].force = a3(v3(particles[idx].force) + force);
}

// ============================================================================
// Integrate: semi-implicit Euler, then clear the accumulator
// ============================================================================

@compute @workgroup_size(256)
fn integrate(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let idx = global_id.x;
    if (idx >= params.node_count) {
        return;
    }

    var particle = particles[idx];
    var inv_mass = 0.0;
    if (particle.mass > 0.0) {
        inv_mass = 1.0 / particle.mass;
    }
    let velocity = (v3(particle.velocity) + v3(particle.force) * (inv_mass * params.dt)) * params.damping;
    particle.velocity = a3(velocity);
    particle.position = a3(v3(particle.position) + velocity * params.dt);
    particle.force = a3(vec3<f32>(0.0, 0.0, 0.0));
    particles[idx] = particle;
}
"#;
