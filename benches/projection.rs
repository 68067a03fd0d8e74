//! Benchmark for token projection and incremental resynchronization.
//!
//! Run with: cargo bench --bench projection

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use treelens::config::WorkspaceSettings;
use treelens::document::Document;
use treelens::projection::build_tokens;
use treelens::session::SessionManager;
use treelens::syntax::{IncrementalParser, TextChange, TreeSitterParser};
use url::Url;

/// Rust source with `num_fns` small functions
fn create_document(num_fns: usize) -> String {
    let mut doc = String::from("//! Benchmark source\n\nuse std::collections::HashMap;\n\n");
    for i in 0..num_fns {
        doc.push_str(&format!(
            "/// Function {i}\n\
             pub fn example{i}(map: &mut HashMap<String, i32>) -> i32 {{\n\
             \tlet key = \"key{i}\".to_string();\n\
             \tlet value = map.get(&key).copied().unwrap_or({i});\n\
             \tmap.insert(key, value * 2);\n\
             \tvalue\n\
             }}\n\n"
        ));
    }
    doc
}

fn bench_build_tokens(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_tokens");
    let settings = WorkspaceSettings::default();

    for num_fns in [10, 100, 500] {
        let text = create_document(num_fns);
        let doc = Document::new(text.as_str());
        let mut parser = TreeSitterParser::new(&tree_sitter_rust::LANGUAGE.into()).unwrap();
        let tree = parser.parse(&text, None).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(num_fns), &num_fns, |b, _| {
            b.iter(|| {
                black_box(build_tokens(
                    tree.root_node(),
                    &doc,
                    &settings.scope_map,
                    &settings.default_scope,
                ))
            })
        });
    }
    group.finish();
}

fn bench_incremental_edit(c: &mut Criterion) {
    let mut group = c.benchmark_group("incremental_edit");

    for num_fns in [10, 100, 500] {
        let manager = SessionManager::new(WorkspaceSettings::default());
        manager.set_language(tree_sitter_rust::LANGUAGE.into());
        let url = Url::parse("file:///bench/source.rs").unwrap();
        manager.open(url.clone(), create_document(num_fns), 0);

        let mut version = 0;
        group.bench_with_input(BenchmarkId::from_parameter(num_fns), &num_fns, |b, _| {
            b.iter(|| {
                version += 1;
                // Insert then delete a character inside the first doc comment
                let change = if version % 2 == 1 {
                    TextChange::insert(60, "x")
                } else {
                    TextChange::new(60, 1, "")
                };
                black_box(manager.apply_changes(&url, &[change], version).unwrap())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build_tokens, bench_incremental_edit);
criterion_main!(benches);
