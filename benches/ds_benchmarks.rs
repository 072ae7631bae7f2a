
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use orlbwt::dyn_rle::DynRleAssoc;
use orlbwt::online_rlbwt::OnlineRlbwt;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

fn get_random_inserts(length: usize) -> (Vec<u64>, Vec<u64>) {
    //this is how to provide a constant "random" set of inserts to play with
    let mut rng = StdRng::seed_from_u64(0);

    //get random symbols AND positions into the array
    let mut inserted: Vec<u64> = vec![];
    let mut positions: Vec<u64> = vec![];
    for i in 0..length {
        let symbol: u64 = rng.gen_range(1, 7);
        let position: u64 = rng.gen_range(0, i + 1) as u64;
        inserted.push(symbol);
        positions.push(position);
    }
    (positions, inserted)
}

fn get_random_sequence(length: usize) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(0);
    let alphabet = [b'A', b'C', b'G', b'T'];
    (0..length).map(|_| alphabet[rng.gen_range(0, 4)] as u64).collect()
}

pub fn bench_dyn_rle_insert(c: &mut Criterion) {
    let (positions, symbols) = get_random_inserts(10000);

    c.bench_function("dyn_rle_10k_random_insert", |b| {
        b.iter(|| {
            let mut rle = DynRleAssoc::new();
            for (position, symbol) in positions.iter().zip(symbols.iter()) {
                black_box(rle.insert_run(*position, *symbol, 1));
            }
        })
    });
}

pub fn bench_dyn_rle_rank(c: &mut Criterion) {
    let (positions, symbols) = get_random_inserts(10000);
    let mut rle = DynRleAssoc::new();
    for (position, symbol) in positions.iter().zip(symbols.iter()) {
        rle.insert_run(*position, *symbol, 1);
    }

    c.bench_function("dyn_rle_10k_rank", |b| {
        b.iter(|| {
            for i in 0..10000u64 {
                black_box(rle.rank(1 + (i % 6), i, true));
            }
        })
    });
}

pub fn bench_spt_extend(c: &mut Criterion) {
    let seq = get_random_sequence(10000);

    c.bench_function("spt_extend_10k_dna", |b| {
        b.iter(|| {
            let mut bwt = OnlineRlbwt::new();
            for &ch in seq.iter() {
                bwt.spt_extend(ch);
            }
            bwt.spt_extend(1);
            black_box(bwt.num_runs())
        })
    });
}

criterion_group!(benches, bench_dyn_rle_insert, bench_dyn_rle_rank, bench_spt_extend);
criterion_main!(benches);
