use super::*;

fn invocation(viewport: TexelRect, positions: Vec<[f32; 2]>) -> KernelInvocation {
    KernelInvocation {
        language: ShadingLanguage::Glsl,
        viewport,
        positions,
        radius: Radius::new(1).unwrap(),
        scaling: [1.0, 1.0],
        offset: [viewport.x as f32, viewport.y as f32],
    }
}

const FULL_SCREEN: [[f32; 2]; 3] = [[-1.0, 1.0], [-1.0, -3.0], [3.0, 1.0]];

#[test]
fn full_screen_triangle_covers_exactly_the_viewport() {
    let data = vec![255u8; 4];
    let source = TextureSampler {
        width: 2,
        height: 2,
        format: TextureFormat::R8Unorm,
        data: &data,
        sampling: Sampling::Fetch,
    };
    let mut target = vec![7u8; 10 * 6];
    let viewport = TexelRect::new(3, 1, 4, 3);
    let shaded = invocation(viewport, FULL_SCREEN.to_vec()).run(
        &source,
        &mut target,
        10,
        6,
        TextureFormat::R8Unorm,
    );
    assert_eq!(shaded, 12);
    for y in 0..6u32 {
        for x in 0..10u32 {
            let expected = if viewport.contains_texel(x, y) { 255 } else { 7 };
            assert_eq!(target[(y * 10 + x) as usize], expected, "({x}, {y})");
        }
    }
}

#[test]
fn winding_does_not_matter() {
    let ccw: [[f64; 2]; 3] = [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0]];
    let cw: [[f64; 2]; 3] = [[-1.0, -1.0], [-1.0, 1.0], [1.0, -1.0]];
    assert!(covers(&ccw, [0.2, 0.2]));
    assert!(covers(&cw, [0.2, 0.2]));
    assert!(!covers(&ccw, [0.9, 0.9]));
}

#[test]
fn degenerate_triangles_cover_nothing() {
    let line = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]];
    assert!(!covers(&line, [1.0, 1.0]));
}

#[test]
fn normalized_sampling_matches_fetch() {
    let data: Vec<u8> = (0..20).map(|i| if i % 3 == 0 { 255 } else { 0 }).collect();
    let fetch = TextureSampler {
        width: 5,
        height: 4,
        format: TextureFormat::R8Unorm,
        data: &data,
        sampling: Sampling::Fetch,
    };
    let normalized = TextureSampler {
        sampling: Sampling::Normalized {
            size_inverted: [1.0 / 5.0, 1.0 / 4.0],
        },
        ..fetch
    };
    for y in -2..6 {
        for x in -2..7 {
            assert_eq!(fetch.is_inside(x, y), normalized.is_inside(x, y), "({x}, {y})");
        }
    }
}
