use hashline_core::{
    CancelToken, DigestKind, Fragment, FragmentSet, PipelineBuilder, PipelineConfig, fingerprint,
};

#[divan::bench(args = [16, 128, 1024])]
fn fingerprint_xxh32_blake3(bencher: divan::Bencher, items: usize) {
    let inputs: Vec<usize> = (0..items).collect();
    bencher.bench(|| {
        let builder = PipelineBuilder::new(PipelineConfig::default(), CancelToken::new());
        fingerprint(
            inputs.clone(),
            DigestKind::Xxh32.shared(),
            DigestKind::Blake3.shared(),
            builder,
        )
        .unwrap()
    });
}

#[divan::bench]
fn fragment_set_finalize(bencher: divan::Bencher) {
    bencher.bench(|| {
        let mut set = FragmentSet::new();
        for round in [5, 2, 0, 4, 1, 3] {
            set.add(Fragment::new(round, format!("{round:08}")));
        }
        set.finalize().unwrap()
    });
}

fn main() {
    divan::main();
}
