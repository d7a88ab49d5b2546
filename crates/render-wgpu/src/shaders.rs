/// Workgroup edge length; must match `@workgroup_size` in [`TRACE_SHADER`].
pub const WORKGROUP_SIZE: u32 = 8;

/// WGSL compute kernel: traces `samples_per_frame` paths per pixel through a
/// fixed test scene and adds the radiance sum to the accumulation buffer.
/// A `sample_base` of zero overwrites instead of adding.
pub const TRACE_SHADER: &str = r#"
struct Params {
    position: vec3<f32>,
    fov_y: f32,
    forward: vec3<f32>,
    exposure: f32,
    right: vec3<f32>,
    samples_per_frame: u32,
    up: vec3<f32>,
    max_bounces: u32,
    width: u32,
    height: u32,
    _pad0: u32,
    _pad1: u32,
};

struct Frame {
    sample_base: u32,
    seed: u32,
    width: u32,
    height: u32,
};

@group(0) @binding(0)
var<uniform> params: Params;

@group(0) @binding(1)
var<uniform> frame: Frame;

@group(0) @binding(2)
var<storage, read_write> accum: array<vec4<f32>>;

const SPHERE_COUNT: u32 = 3u;
const SPHERES = array<vec4<f32>, 3>(
    vec4<f32>(0.0, 1.0, 0.0, 1.0),
    vec4<f32>(-2.2, 0.7, -0.8, 0.7),
    vec4<f32>(2.0, 0.5, 0.6, 0.5),
);
const ALBEDOS = array<vec3<f32>, 3>(
    vec3<f32>(0.8, 0.3, 0.3),
    vec3<f32>(0.3, 0.8, 0.3),
    vec3<f32>(0.3, 0.3, 0.8),
);
const NO_HIT: f32 = 1e30;

struct Hit {
    t: f32,
    normal: vec3<f32>,
    albedo: vec3<f32>,
};

fn pcg(v: u32) -> u32 {
    let state = v * 747796405u + 2891336453u;
    let word = ((state >> ((state >> 28u) + 4u)) ^ state) * 277803737u;
    return (word >> 22u) ^ word;
}

fn rand(state: ptr<function, u32>) -> f32 {
    *state = pcg(*state);
    return f32(*state) / 4294967295.0;
}

fn sky(dir: vec3<f32>) -> vec3<f32> {
    let t = 0.5 * (dir.y + 1.0);
    return mix(vec3<f32>(1.0, 1.0, 1.0), vec3<f32>(0.5, 0.7, 1.0), t);
}

fn intersect(origin: vec3<f32>, dir: vec3<f32>) -> Hit {
    var best: Hit;
    best.t = NO_HIT;

    if (dir.y < -1e-4) {
        let t = -origin.y / dir.y;
        if (t > 1e-3 && t < best.t) {
            let p = origin + dir * t;
            let checker = (i32(floor(p.x)) + i32(floor(p.z))) & 1;
            best.t = t;
            best.normal = vec3<f32>(0.0, 1.0, 0.0);
            best.albedo = select(vec3<f32>(0.75), vec3<f32>(0.35), checker == 1);
        }
    }

    var spheres = SPHERES;
    var albedos = ALBEDOS;
    for (var i = 0u; i < SPHERE_COUNT; i++) {
        let s = spheres[i];
        let oc = origin - s.xyz;
        let b = dot(oc, dir);
        let c = dot(oc, oc) - s.w * s.w;
        let h = b * b - c;
        if (h > 0.0) {
            let t = -b - sqrt(h);
            if (t > 1e-3 && t < best.t) {
                best.t = t;
                best.normal = normalize(origin + dir * t - s.xyz);
                best.albedo = albedos[i];
            }
        }
    }
    return best;
}

fn cosine_direction(n: vec3<f32>, state: ptr<function, u32>) -> vec3<f32> {
    let r1 = rand(state);
    let r2 = rand(state);
    let phi = 6.2831853 * r1;
    let r = sqrt(r2);
    let a = select(vec3<f32>(1.0, 0.0, 0.0), vec3<f32>(0.0, 1.0, 0.0), abs(n.x) > 0.9);
    let t = normalize(cross(a, n));
    let b = cross(n, t);
    return normalize(t * (r * cos(phi)) + b * (r * sin(phi)) + n * sqrt(1.0 - r2));
}

fn radiance(start: vec3<f32>, start_dir: vec3<f32>, state: ptr<function, u32>) -> vec3<f32> {
    var origin = start;
    var dir = start_dir;
    var throughput = vec3<f32>(1.0);
    for (var bounce = 0u; bounce <= params.max_bounces; bounce++) {
        let hit = intersect(origin, dir);
        if (hit.t >= NO_HIT) {
            return throughput * sky(dir);
        }
        throughput *= hit.albedo;
        origin = origin + dir * hit.t + hit.normal * 1e-3;
        dir = cosine_direction(hit.normal, state);
    }
    return vec3<f32>(0.0);
}

@compute @workgroup_size(8, 8)
fn trace_main(@builtin(global_invocation_id) id: vec3<u32>) {
    if (id.x >= frame.width || id.y >= frame.height) {
        return;
    }
    let index = id.y * frame.width + id.x;
    var state = pcg(index ^ pcg(frame.seed));

    let size = vec2<f32>(f32(frame.width), f32(frame.height));
    let aspect = size.x / size.y;
    let scale = tan(params.fov_y * 0.5);

    var sum = vec3<f32>(0.0);
    for (var s = 0u; s < params.samples_per_frame; s++) {
        let jitter = vec2<f32>(rand(&state), rand(&state));
        let ndc = (vec2<f32>(f32(id.x), f32(id.y)) + jitter) / size * 2.0 - 1.0;
        let dir = normalize(
            params.forward + params.right * (ndc.x * scale * aspect) - params.up * (ndc.y * scale)
        );
        sum += radiance(params.position, dir, &state);
    }

    if (frame.sample_base == 0u) {
        accum[index] = vec4<f32>(sum, 0.0);
    } else {
        accum[index] += vec4<f32>(sum, 0.0);
    }
}
"#;

/// WGSL display pass: fullscreen triangle that averages the accumulation
/// buffer, applies exposure and Reinhard tone mapping.
pub const BLIT_SHADER: &str = r#"
struct Display {
    samples: u32,
    exposure: f32,
    width: u32,
    height: u32,
};

@group(0) @binding(0)
var<uniform> display: Display;

@group(0) @binding(1)
var<storage, read> accum: array<vec4<f32>>;

struct BlitOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_blit(@builtin(vertex_index) index: u32) -> BlitOutput {
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: BlitOutput;
    out.clip_position = vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(uv.x, 1.0 - uv.y);
    return out;
}

@fragment
fn fs_blit(in: BlitOutput) -> @location(0) vec4<f32> {
    let x = min(u32(in.uv.x * f32(display.width)), display.width - 1u);
    let y = min(u32(in.uv.y * f32(display.height)), display.height - 1u);
    let sum = accum[y * display.width + x].rgb;
    let mean = sum / f32(max(display.samples, 1u));
    let exposed = mean * display.exposure;
    return vec4<f32>(exposed / (exposed + vec3<f32>(1.0)), 1.0);
}
"#;
