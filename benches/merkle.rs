//! Merkle Commit Engine throughput: tree build and proof verify/generate
//! across snapshot sizes representative of a single state's layers up to a
//! nationwide commit.

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use shadow_atlas::commit::tree::MerkleTree;
use shadow_atlas::{
    AuthorityTier, BoundaryId, BoundaryRecord, FeatureProperties, Geometry, Point, Polygon,
    Provenance, Ring, ALL_LAYERS,
};

fn square(id: u64) -> Polygon {
    let base = (id % 1000) as f64;
    Polygon::new(
        Ring::new(vec![
            Point::new(base, base),
            Point::new(base + 1.0, base),
            Point::new(base + 1.0, base + 1.0),
            Point::new(base, base + 1.0),
            Point::new(base, base),
        ]),
        vec![],
    )
}

fn record(id: u64) -> BoundaryRecord {
    BoundaryRecord {
        boundary_id: BoundaryId::new(format!("{id:08}")),
        layer: ALL_LAYERS[(id as usize) % ALL_LAYERS.len()],
        jurisdiction_fips: format!("{:02}", id % 56),
        display_name: format!("District {id}"),
        vintage_year: 2024,
        geometry: Geometry::Polygon(square(id)),
        land_area_m2: 1_000.0,
        water_area_m2: 0.0,
        provenance: Provenance {
            source_url: "https://example.test/bench".to_string(),
            response_checksum: "a".repeat(64),
            retrieved_at: Utc::now(),
            authority_tier: AuthorityTier::Municipal,
        },
        attributes: FeatureProperties::new(),
    }
}

fn records(n: u64) -> Vec<BoundaryRecord> {
    (0..n).map(record).collect()
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("merkle_tree_build");
    for size in [16u64, 256, 4_096, 65_536] {
        let fixture = records(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &fixture, |b, fixture| {
            b.iter(|| {
                let tree = MerkleTree::build(black_box(fixture));
                black_box(tree.root());
            });
        });
    }
    group.finish();
}

fn bench_proof_generate_and_verify(c: &mut Criterion) {
    let mut group = c.benchmark_group("merkle_proof");
    for size in [16u64, 256, 4_096, 65_536] {
        let fixture = records(size);
        let tree = MerkleTree::build(&fixture);
        let target = fixture[fixture.len() / 2].boundary_id.clone();

        group.bench_with_input(BenchmarkId::new("generate", size), &tree, |b, tree| {
            b.iter(|| black_box(tree.proof_for(black_box(&target))));
        });

        let proof = tree.proof_for(&target).unwrap();
        let root = tree.root();
        group.bench_with_input(BenchmarkId::new("verify", size), &proof, |b, proof| {
            b.iter(|| black_box(shadow_atlas::verify_proof(black_box(proof), black_box(&root))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_proof_generate_and_verify);
criterion_main!(benches);
