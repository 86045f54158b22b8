//! Performance benchmarks for NodeTree core operations
//!
//! Run with: `cargo bench -p nodetree-core`
//!
//! These benchmarks measure critical path performance:
//! - Content hashing (runs once per outline element per save)
//! - Snapshot materialization and flattening of a 1000-node space
//! - Outline saves, first save versus unchanged re-save

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nodetree_core::services::{
    Collaborators, InMemoryNodeCache, InMemorySpaceRegistry, LocalOnlySync, NodeSnapshot,
    OutlineReconciler,
};
use nodetree_core::{content_hash, InMemoryStore, Node, NodeStore, NodeType, RawNode};
use nodetree_core::ReconcilerConfig;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::runtime::Runtime;

const SPACE: &str = "bench";

/// A page with `sections` items of `per_section` nested children each
fn generate_outline(sections: usize, per_section: usize) -> Value {
    let items: Vec<Value> = (0..sections)
        .map(|i| {
            let children: Vec<Value> = (0..per_section)
                .map(|j| {
                    json!({"type": "li", "children": [
                        {"type": "lic", "id": format!("n-{}-{}", i, j), "children": [{"text": format!("Item {}.{}", i, j)}]}
                    ]})
                })
                .collect();
            json!({"type": "li", "children": [
                {"type": "lic", "id": format!("n-{}", i), "children": [{"text": format!("Section {}", i)}]},
                {"type": "ul", "children": children}
            ]})
        })
        .collect();

    json!({"type": "ul", "children": items})
}

/// Root with one page holding `pages` children of ten children each
fn generate_space(pages: usize) -> Vec<RawNode> {
    let page_ids: Vec<String> = (0..pages).map(|i| format!("p-{}", i)).collect();
    let mut nodes = vec![RawNode::with_id("root", SPACE, NodeType::Root).with_children(page_ids.clone())];

    for page_id in page_ids {
        let child_ids: Vec<String> = (0..10).map(|j| format!("{}-{}", page_id, j)).collect();
        for child_id in &child_ids {
            nodes.push(
                RawNode::with_id(child_id.clone(), SPACE, NodeType::Common)
                    .with_parent(page_id.clone())
                    .with_element(vec![json!({"text": child_id})]),
            );
        }
        nodes.push(
            RawNode::with_id(page_id, SPACE, NodeType::Common)
                .with_parent("root")
                .with_children(child_ids),
        );
    }

    nodes
}

fn setup_reconciler() -> (Arc<InMemoryStore>, OutlineReconciler) {
    let store = Arc::new(InMemoryStore::with_nodes(vec![
        RawNode::with_id("root", SPACE, NodeType::Root).with_children(["page"]),
        RawNode::with_id("page", SPACE, NodeType::Common).with_parent("root"),
    ]));

    let reconciler = OutlineReconciler::new(
        Collaborators {
            store: store.clone(),
            tags: store.clone(),
            cleaner: store.clone(),
            cache: Arc::new(InMemoryNodeCache::new()),
            spaces: Arc::new(InMemorySpaceRegistry::new()),
            sync: Arc::new(LocalOnlySync),
        },
        ReconcilerConfig::default().with_push_to_cloud(false),
    );

    (store, reconciler)
}

fn bench_content_hash(c: &mut Criterion) {
    let element = vec![json!({"text": "A reasonably sized line of outline text"})];
    let children: Vec<String> = (0..8).map(|i| format!("child-{}", i)).collect();

    c.bench_function("content_hash", |b| {
        b.iter(|| {
            black_box(content_hash(
                Some("parent"),
                black_box(&element),
                false,
                black_box(&children),
            ))
        })
    });
}

/// Target: well under a frame (16ms) for a 1000-node space
fn bench_snapshot(c: &mut Criterion) {
    let nodes = generate_space(100);

    let mut group = c.benchmark_group("snapshot");

    group.bench_function("build_1100_nodes", |b| {
        b.iter(|| black_box(NodeSnapshot::from_slice(&nodes)))
    });

    let snapshot = NodeSnapshot::from_slice(&nodes);
    group.bench_function("flatten_root", |b| {
        b.iter(|| {
            let root = snapshot.root_node().unwrap();
            black_box(snapshot.flatten_node(root))
        })
    });

    group.finish();
}

fn bench_outline_save(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let outline = generate_outline(50, 10);

    let mut group = c.benchmark_group("outline_save");
    group.sample_size(10); // Fewer samples for expensive operations

    group.bench_function("first_save_550_nodes", |b| {
        b.iter_custom(|iters| {
            rt.block_on(async {
                let mut total = std::time::Duration::ZERO;

                for _ in 0..iters {
                    let (store, reconciler) = setup_reconciler();
                    let page = Node::new(store.get_node("page").await.unwrap().unwrap());

                    let start = std::time::Instant::now();
                    let report = reconciler
                        .save_outliner_editor(&page, None, Some(&outline), false)
                        .await;
                    total += start.elapsed();

                    black_box(report.unwrap());
                }

                total
            })
        });
    });

    // Every element hashes equal, so this measures pure change detection
    group.bench_function("unchanged_resave_550_nodes", |b| {
        b.iter_custom(|iters| {
            rt.block_on(async {
                let (store, reconciler) = setup_reconciler();
                let page = Node::new(store.get_node("page").await.unwrap().unwrap());
                reconciler
                    .save_outliner_editor(&page, None, Some(&outline), false)
                    .await
                    .unwrap();

                let start = std::time::Instant::now();
                for _ in 0..iters {
                    black_box(
                        reconciler
                            .save_outliner_editor(&page, None, Some(&outline), false)
                            .await
                            .unwrap(),
                    );
                }
                start.elapsed()
            })
        });
    });

    group.finish();
}

criterion_group!(benches, bench_content_hash, bench_snapshot, bench_outline_save);
criterion_main!(benches);
