use criterion::{criterion_group, criterion_main, Criterion};
use paper_core::tokenizer::tokenize;
use paper_core::{Document, IndexBuilder};

const ABSTRACT: &str = "We propose a new simple network architecture, the Transformer, based solely on \
attention mechanisms, dispensing with recurrence and convolutions entirely. Experiments on two machine \
translation tasks show these models to be superior in quality while being more parallelizable.";

fn bench_tokenize(c: &mut Criterion) {
    let text = ABSTRACT.repeat(50);
    c.bench_function("tokenize_abstract", |b| b.iter(|| tokenize(&text)));
}

fn bench_search(c: &mut Criterion) {
    let mut builder = IndexBuilder::default();
    for i in 0..2_000 {
        let doc = Document {
            title: format!("Paper {i} on attention"),
            full_text: ABSTRACT.to_string(),
            ..Default::default()
        };
        builder.add_document(doc).expect("index document");
    }
    let index = builder.finalize();
    c.bench_function("search_phrase", |b| {
        b.iter(|| index.query("\"machine translation\" AND attention", &[], 10))
    });
}

criterion_group!(benches, bench_tokenize, bench_search);
criterion_main!(benches);
