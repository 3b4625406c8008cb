use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::Array2;
use planetix_core::{normalized_laplacian, Graph, LaplacianPositionalEncoder, NodeFeatures};

fn ring_with_chords(n: usize) -> Graph {
    let mut edges = Vec::with_capacity(4 * n);
    for i in 0..n {
        let next = (i + 1) % n;
        let chord = (i * 37 + 11) % n;
        edges.push((i, next));
        edges.push((next, i));
        if chord != i {
            edges.push((i, chord));
            edges.push((chord, i));
        }
    }
    Graph::new(n, edges, NodeFeatures::Dense(Array2::zeros((n, 1)))).unwrap()
}

fn bench_positional_encoding(c: &mut Criterion) {
    let g = ring_with_chords(500);
    let encoder = LaplacianPositionalEncoder::new(8);

    c.bench_function("laplacian_500_nodes", |b| {
        b.iter(|| normalized_laplacian(black_box(&g)))
    });

    c.bench_function("pos_enc_500_nodes_dim_8", |b| {
        b.iter(|| encoder.encode(black_box(&g)))
    });
}

criterion_group!(benches, bench_positional_encoding);
criterion_main!(benches);
