use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;
use wormview::catalog::{LayerInfo, MeshEntry, ModelInfo, StreamRange};
use wormview::codec::DecodeParams;
use wormview::layers::OpacityInfo;
use wormview::mesh::{BBox, DisplayList, PartRanges};
use wormview::renderer::{FramePlan, PartTable};

fn entry(mesh: usize, parts: usize) -> MeshEntry {
    MeshEntry {
        material: format!("material{mesh}"),
        attrib_range: StreamRange { start: 0, length: 0 },
        index_range: StreamRange { start: 0, length: 0 },
        bboxes: 0,
        names: (0..parts).map(|p| format!("part{}", (mesh * 7 + p) % 900)).collect(),
        lengths: (0..parts).map(|p| 30 + (p as u32 % 5) * 3).collect(),
    }
}

fn model() -> ModelInfo {
    ModelInfo {
        materials: Default::default(),
        decode_params: DecodeParams::new(vec![0.0; 8], vec![1.0; 8]).unwrap(),
        urls: Default::default(),
        layers: (0..4)
            .map(|l| LayerInfo {
                name: format!("layer{l}"),
                parts: Vec::new(),
                materials: (0..40).filter(|m| m % 4 == l).map(|m| format!("material{m}")).collect(),
            })
            .collect(),
        texture_path: String::new(),
        format: Default::default(),
    }
}

fn merge_benchmark(c: &mut Criterion) {
    let ranges: Vec<(u32, u32)> = (0..2000u32)
        .rev()
        .map(|i| (i * 30 + (i % 3) * 10, 30))
        .collect();
    c.bench_function("display_list_merge_2000", |b| {
        b.iter(|| black_box(DisplayList::from_ranges(black_box(ranges.iter().copied()))))
    });
}

fn lookup_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("display_lists_for_active_parts");
    let mut ranges = PartRanges::new();
    for mesh in 0..40 {
        let e = entry(mesh, 200);
        let _ = ranges.add_mesh(mesh, &e.names, &e.lengths);
    }
    for active in [1usize, 50, 500] {
        let names: Vec<String> = (0..active).map(|p| format!("part{p}")).collect();
        group.bench_with_input(BenchmarkId::from_parameter(active), &names, |b, names| {
            b.iter(|| black_box(ranges.display_lists(names.iter().map(String::as_str))))
        });
    }
    group.finish();
}

fn frame_plan_benchmark(c: &mut Criterion) {
    let model = model();
    let mut table = PartTable::new(1);
    for mesh in 0..40 {
        let e = entry(mesh, 200);
        let boxes: Vec<BBox> = (0..200)
            .map(|p| {
                let x = (mesh * 200 + p) as f32;
                BBox::from_min_max([x, 0.0, 0.0], [x + 1.0, 1.0, 1.0])
            })
            .collect();
        let _ = table.add_mesh(&e, &model, &boxes).unwrap();
    }
    let info = OpacityInfo::new(&[0.3, 1.0, 0.6, 1.0]);
    c.bench_function("frame_plan_8000_parts", |b| {
        b.iter(|| black_box(FramePlan::build(&table, black_box(&info), Vec3::new(0.0, 0.0, 500.0))))
    });
}

criterion_group!(benches, merge_benchmark, lookup_benchmark, frame_plan_benchmark);
criterion_main!(benches);
