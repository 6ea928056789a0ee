use criterion::{Criterion, criterion_group, criterion_main};
use scheme_advisor::embeddings::chunking::{ChunkingConfig, chunk_page};
use scheme_advisor::extractor::PageText;
use std::hint::black_box;

pub fn criterion_benchmark(c: &mut Criterion) {
    let text = "Applicants must have family income below Rs. 2,00,000 per year to qualify. \
                The pension amount is Rs. 4,016 per month for eligible beneficiaries. \
                Applications are submitted at the nearest Gram Sachivalayam office. "
        .repeat(200);
    let page = PageText {
        page_number: 1,
        text,
    };
    let config = ChunkingConfig::default();

    c.bench_function("chunking", |b| {
        b.iter(|| chunk_page(black_box("doc"), black_box("doc.pdf"), black_box(&page), black_box(&config)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
