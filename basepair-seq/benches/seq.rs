use basepair_seq::{
    compress_dna, compress_dna_with_quality, decompress_dna, hash2, KmerIter, MegamashMap, MegamashOptions,
    SequenceType,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn random_dna(len: usize, seed: u64) -> String {
    let bases = [b'A', b'C', b'G', b'T'];
    let mut seq = Vec::with_capacity(len);
    let mut state: u64 = seed;
    for _ in 0..len {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        seq.push(bases[((state >> 33) % 4) as usize]);
    }
    String::from_utf8(seq).unwrap()
}

fn bench_seqhash(c: &mut Criterion) {
    let mut group = c.benchmark_group("seqhash");

    let plasmid = random_dna(5_000, 42);
    group.bench_function("circular_ds_5kb", |b| {
        b.iter(|| hash2(black_box(&plasmid), SequenceType::Dna, true, true).unwrap())
    });
    group.bench_function("linear_ds_5kb", |b| {
        b.iter(|| hash2(black_box(&plasmid), SequenceType::Dna, false, true).unwrap())
    });

    group.finish();
}

fn bench_compress(c: &mut Criterion) {
    let mut group = c.benchmark_group("dna_compress");

    let read = random_dna(10_000, 7);
    let quality = "I".repeat(read.len());
    let packed = compress_dna(&read, false).unwrap();

    group.bench_function("compress_10kb", |b| b.iter(|| compress_dna(black_box(&read), false).unwrap()));
    group.bench_function("decompress_10kb", |b| b.iter(|| decompress_dna(black_box(&packed)).unwrap()));
    group.bench_function("compress_with_quality_10kb", |b| {
        b.iter(|| compress_dna_with_quality(black_box(&read), black_box(&quality), false).unwrap())
    });

    group.finish();
}

fn bench_megamash(c: &mut Criterion) {
    let mut group = c.benchmark_group("megamash");

    let templates: Vec<(String, String)> = (0..96)
        .map(|i| (format!("template{i}"), random_dna(500, i + 1)))
        .collect();
    let map = MegamashMap::new(templates.clone(), MegamashOptions::default()).unwrap();
    let reads: Vec<String> = templates
        .iter()
        .map(|(_, seq)| format!("{}{}{}", random_dna(50, 3), &seq[100..400], random_dna(50, 5)))
        .collect();

    group.bench_function("match_400bp", |b| b.iter(|| map.match_sequence(black_box(&reads[0]))));
    group.bench_with_input(BenchmarkId::new("match_all", reads.len()), &reads, |b, reads| {
        b.iter(|| map.match_all(black_box(reads)))
    });

    group.finish();
}

fn bench_kmer(c: &mut Criterion) {
    let mut group = c.benchmark_group("kmer");

    let seq_10k = random_dna(10_000, 42);

    group.bench_with_input(BenchmarkId::new("canonical_k16", 10_000), &seq_10k, |b, seq| {
        b.iter(|| KmerIter::new(black_box(seq.as_bytes()), 16).unwrap().canonical().count())
    });

    group.finish();
}

criterion_group!(benches, bench_seqhash, bench_compress, bench_megamash, bench_kmer);
criterion_main!(benches);
