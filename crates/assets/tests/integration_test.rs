//! Integration tests for mesh and texture loading.

use std::io::Write;
use std::path::Path;

use helio_assets::{MeshData, TextureData};

#[test]
fn test_load_obj_mesh() {
    // A minimal triangulated OBJ: one quad as two triangles.
    let obj = "\
v -1.0 -1.0 0.0
v 1.0 -1.0 0.0
v 1.0 1.0 0.0
v -1.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
f 1/1 2/2 3/3
f 3/3 4/4 1/1
";

    let path = std::env::temp_dir().join("helio_assets_quad_test.obj");
    let mut file = std::fs::File::create(&path).expect("Failed to create test OBJ");
    file.write_all(obj.as_bytes()).expect("Failed to write test OBJ");

    let mesh = MeshData::load_obj(&path).expect("Failed to load OBJ mesh");
    std::fs::remove_file(&path).ok();

    assert!(!mesh.vertices.is_empty(), "Mesh should have vertices");
    assert_eq!(mesh.indices.len() % 3, 0, "Indices should form triangles");
    assert_eq!(mesh.index_count() as usize, mesh.indices.len());

    // Every index must point at a real vertex.
    let max_index = *mesh.indices.iter().max().expect("Mesh should have indices");
    assert!(
        (max_index as usize) < mesh.vertices.len(),
        "Index {} out of range for {} vertices",
        max_index,
        mesh.vertices.len()
    );

    // The byte payloads feed the GPU upload path directly.
    assert_eq!(mesh.vertex_bytes().len(), mesh.vertices.len() * 32);
    assert_eq!(mesh.index_bytes().len(), mesh.indices.len() * 4);

    println!(
        "Loaded mesh with {} vertices, {} triangles",
        mesh.vertices.len(),
        mesh.indices.len() / 3
    );
}

#[test]
fn test_load_texture_file() {
    // Path to an optional test texture
    let texture_path = Path::new("../../assets/textures/checker.png");

    // Skip test if file doesn't exist (CI environment may not have assets)
    if !texture_path.exists() {
        println!("Skipping test: texture file not found at {:?}", texture_path);
        return;
    }

    let texture = TextureData::load(texture_path).expect("Failed to decode texture");

    assert!(texture.width > 0, "Texture should have nonzero width");
    assert!(texture.height > 0, "Texture should have nonzero height");
    assert_eq!(
        texture.byte_len(),
        (texture.width * texture.height * 4) as usize,
        "Pixel buffer should be tightly-packed RGBA8"
    );

    println!("Loaded texture: {}x{}", texture.width, texture.height);
}

#[test]
fn test_fallback_texture_is_uploadable() {
    // The checkerboard fallback must satisfy the same contract as a decoded
    // file: tightly-packed RGBA8 matching its dimensions.
    let texture = TextureData::load_or_checkerboard(Path::new("no/such/texture.png"))
        .expect("Fallback should never fail");

    assert_eq!(
        texture.byte_len(),
        (texture.width * texture.height * 4) as usize
    );
}
