//! Criterion microbenches for label loading and COCO assembly.
//!
//! Run with: `cargo bench`

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::fs;
use std::hint::black_box;
use std::path::Path;

use orchardlabel::assemble::{assemble_split, resolve_split, AssembleOptions};
use orchardlabel::conversion::ConversionReport;
use orchardlabel::ir::io_coco_json::to_coco_string;
use orchardlabel::ir::io_yolo::{load_boxes, LinePolicy};
use orchardlabel::profile::DatasetProfile;

const IMAGES: usize = 200;
const BOXES_PER_IMAGE: usize = 25;

fn label_text(boxes: usize, salt: usize) -> String {
    (0..boxes)
        .map(|i| {
            let cx = 0.05 + ((i + salt) % 90) as f64 / 100.0;
            let cy = 0.05 + ((i * 7 + salt) % 90) as f64 / 100.0;
            format!("0 {cx:.6} {cy:.6} 0.040000 0.060000\n")
        })
        .collect()
}

fn write_bmp_header(path: &Path, width: u32, height: u32) {
    let mut bytes = Vec::with_capacity(54);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&54u32.to_le_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(&54u32.to_le_bytes());
    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&[0u8; 24]);
    fs::write(path, bytes).unwrap();
}

fn bench_load_boxes(c: &mut Criterion) {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("labels.txt");
    let text = label_text(500, 0);
    fs::write(&path, &text).unwrap();

    let mut group = c.benchmark_group("labels");
    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("load_boxes_500", |b| {
        b.iter(|| {
            let mut issues = Vec::new();
            let boxes = load_boxes(black_box(&path), LinePolicy::Abort, &mut issues).unwrap();
            black_box(boxes)
        })
    });
    group.finish();
}

fn bench_assemble(c: &mut Criterion) {
    let temp = tempfile::tempdir().unwrap();
    let images = temp.path().join("images");
    let labels = temp.path().join("labels");
    fs::create_dir_all(&images).unwrap();
    fs::create_dir_all(&labels).unwrap();

    let mut stems = Vec::with_capacity(IMAGES);
    for i in 0..IMAGES {
        let stem = format!("IMG_{i:05}");
        write_bmp_header(&images.join(format!("{stem}.bmp")), 1920, 1080);
        fs::write(labels.join(format!("{stem}.txt")), label_text(BOXES_PER_IMAGE, i)).unwrap();
        stems.push(stem);
    }

    let profile = DatasetProfile::default();
    let opts = AssembleOptions::default();
    let mut resolution = ConversionReport::new("bench");
    let slots = resolve_split(&images, &stems, &mut resolution);

    let mut group = c.benchmark_group("assemble");
    group.throughput(Throughput::Elements(IMAGES as u64));
    group.sample_size(20);
    group.bench_function("assemble_split_200", |b| {
        b.iter(|| {
            let (dataset, _) =
                assemble_split("bench", black_box(&slots), &images, &labels, &profile, &opts)
                    .unwrap();
            black_box(dataset)
        })
    });

    let (dataset, _) = assemble_split("bench", &slots, &images, &labels, &profile, &opts).unwrap();
    group.bench_function("to_coco_string_200", |b| {
        b.iter(|| black_box(to_coco_string(black_box(&dataset)).unwrap()))
    });
    group.finish();
}

criterion_group!(benches, bench_load_boxes, bench_assemble);
criterion_main!(benches);
