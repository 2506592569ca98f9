use arspell::mlm::TableMaskedLm;
use arspell::text::preprocess;
use arspell::vocab::VocabBuilder;
use arspell::{Corrector, CorrectorOptions, Vocabulary};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const SENTENCE: &str = "ذهب الولد إلى المدرسه صباحاً مع أخيه الصغير، ثم عاد الى البيت.";

fn bench_preprocess(c: &mut Criterion) {
    let text = SENTENCE.repeat(200);
    c.bench_function("preprocess", |b| b.iter(|| preprocess(black_box(&text))));
}

fn bench_vocab_build(c: &mut Criterion) {
    let docs: Vec<String> = (0..1000).map(|i| format!("{} {}", SENTENCE, i % 17)).collect();
    c.bench_function("vocab_build", |b| {
        b.iter(|| {
            let builder = VocabBuilder::new();
            for doc in &docs {
                builder.add_document(doc);
            }
            builder.finish(3).unwrap()
        })
    });
}

fn bench_correct(c: &mut Criterion) {
    let tokens: Vec<String> = preprocess(SENTENCE)
        .split_whitespace()
        .map(str::to_string)
        .chain(["[MASK]".to_string(), "[UNK]".to_string()])
        .collect();
    let model = TableMaskedLm::new("[MASK]", tokens);
    let vocab = Vocabulary::from_counts(vec![("ذهب", 10), ("الولد", 10)]).unwrap();
    let corrector = Corrector::new(vocab, model, CorrectorOptions::default());

    c.bench_function("correct_sentence", |b| {
        b.iter(|| corrector.correct(black_box(SENTENCE)).unwrap())
    });
}

criterion_group!(benches, bench_preprocess, bench_vocab_build, bench_correct);
criterion_main!(benches);
