//! Serialization Benchmarks
//!
//! Throughput of scene serialization and cache record encoding

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use tessera_assets::engines::{BabylonImportResult, BabylonMesh, VertexKind};
use tessera_assets::{BabylonAdapter, CacheEntry, MeshSerializer, NativeRuntime, cache::entry_id};
use tessera_core::EngineKind;

fn grid_mesh(name: &str, side: usize) -> BabylonMesh {
    let mut positions = Vec::with_capacity(side * side * 3);
    for y in 0..side {
        for x in 0..side {
            positions.extend_from_slice(&[x as f32, y as f32, 0.0]);
        }
    }
    let mut indices = Vec::new();
    for y in 0..side - 1 {
        for x in 0..side - 1 {
            let i = (y * side + x) as u32;
            let s = side as u32;
            indices.extend_from_slice(&[i, i + 1, i + s, i + 1, i + s + 1, i + s]);
        }
    }
    let normals = [0.0, 0.0, 1.0].repeat(side * side);

    let mut mesh = BabylonMesh::new(name);
    mesh.set_vertices_data(VertexKind::Position, positions);
    mesh.set_vertices_data(VertexKind::Normal, normals);
    mesh.set_indices(indices);
    mesh
}

fn serializer() -> MeshSerializer<BabylonAdapter> {
    let runtime = Arc::new(NativeRuntime::new(EngineKind::Babylon));
    MeshSerializer::new(Arc::new(BabylonAdapter::new(runtime)))
}

fn bench_serialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialize");
    let serializer = serializer();

    for side in [16, 64, 256] {
        let scene = BabylonImportResult {
            meshes: vec![grid_mesh("grid", side)],
        };
        group.bench_with_input(BenchmarkId::from_parameter(side), &scene, |b, scene| {
            b.iter(|| black_box(serializer.serialize(scene)))
        });
    }

    group.finish();
}

fn bench_deserialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("deserialize");
    let serializer = serializer();

    for side in [16, 64, 256] {
        let scene = BabylonImportResult {
            meshes: vec![grid_mesh("grid", side)],
        };
        let Ok(asset) = serializer.serialize(&scene) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::from_parameter(side), &asset, |b, asset| {
            b.iter(|| {
                if let Ok(scene) = serializer.deserialize(asset) {
                    for mesh in scene.meshes {
                        serializer.adapter().dispose(mesh);
                    }
                }
            })
        });
    }

    group.finish();
}

fn bench_record_json(c: &mut Criterion) {
    let serializer = serializer();
    let scene = BabylonImportResult {
        meshes: vec![grid_mesh("grid", 64)],
    };
    let Ok(model_data) = serializer.serialize(&scene) else {
        return;
    };
    let entry = CacheEntry {
        id: entry_id(EngineKind::Babylon, "bench.glb"),
        url: "bench.glb".to_string(),
        model_data,
        engine_type: EngineKind::Babylon,
        timestamp: 0,
        version: "2.0".to_string(),
        metadata: None,
    };

    c.bench_function("record_to_json", |b| {
        b.iter(|| black_box(serde_json::to_vec(&entry)))
    });
}

criterion_group!(benches, bench_serialize, bench_deserialize, bench_record_json);
criterion_main!(benches);
