use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use meshstatic_crypto::session::{derive_session_key, MasterKey};
use meshstatic_crypto::{open, packet_nonce, seal};
use meshstatic_core::types::Address;

fn bench_aead(c: &mut Criterion) {
    let key = [0x42u8; 32];
    let src = Address::new([0x02, 0, 0, 0, 0, 0x01]);
    let nonce = packet_nonce(7, &src);
    let aad = [0xA5u8; 30];

    let mut group = c.benchmark_group("aead");
    for size in [18usize, 64, 164] {
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("seal", size), &size, |b, &size| {
            let mut buf = vec![0u8; size];
            b.iter(|| seal(&key, &nonce, &aad, &mut buf));
        });

        group.bench_with_input(BenchmarkId::new("open", size), &size, |b, &size| {
            let mut buf = vec![0u8; size];
            let tag = seal(&key, &nonce, &aad, &mut buf);
            b.iter(|| {
                let mut ct = buf.clone();
                open(&key, &nonce, &aad, &mut ct, &tag).unwrap();
            });
        });
    }
    group.finish();

    c.bench_function("derive_session_key", |b| {
        let master = MasterKey::new([0x7Eu8; 32]);
        b.iter(|| derive_session_key(&master, 1234));
    });
}

criterion_group!(benches, bench_aead);
criterion_main!(benches);
