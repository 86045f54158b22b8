//! Save Cycle Integration Tests
//!
//! Drives the reconciler through several edits of one space and checks the
//! stored forest through snapshot queries, the way a view would read it.

#[cfg(test)]
mod save_cycle_tests {
    use anyhow::Result;
    use nodetree_core::db::{InMemoryStore, NodeStore};
    use nodetree_core::models::{Node, NodeFilter, NodeType, RawNode};
    use nodetree_core::services::{
        Collaborators, InMemoryNodeCache, InMemorySpaceRegistry, LocalOnlySync, NodeSnapshot,
        OutlineReconciler,
    };
    use nodetree_core::ReconcilerConfig;
    use serde_json::{json, Value};
    use std::sync::{Arc, Once};

    static TRACING: Once = Once::new();

    fn init_tracing() {
        TRACING.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_test_writer()
                .try_init();
        });
    }

    struct Fixture {
        store: Arc<InMemoryStore>,
        cache: Arc<InMemoryNodeCache>,
        reconciler: OutlineReconciler,
    }

    fn space() -> Vec<RawNode> {
        vec![
            RawNode::with_id("root", "s", NodeType::Root).with_children(["journal", "ideas"]),
            RawNode::with_id("journal", "s", NodeType::Common).with_parent("root"),
            RawNode::with_id("ideas", "s", NodeType::Common).with_parent("root"),
            RawNode::with_id("daily-root", "s", NodeType::DailyRoot).with_children(["today"]),
            RawNode::with_id("today", "s", NodeType::Daily).with_parent("daily-root"),
            RawNode::with_id("favorite", "s", NodeType::Favorite).with_children(["ideas"]),
            RawNode::with_id("trash", "s", NodeType::Trash),
            RawNode::with_id("inbox", "s", NodeType::Inbox),
            RawNode::with_id("other-root", "elsewhere", NodeType::Root),
        ]
    }

    fn fixture() -> Fixture {
        init_tracing();
        let store = Arc::new(InMemoryStore::with_nodes(space()));
        let cache = Arc::new(InMemoryNodeCache::new());

        let reconciler = OutlineReconciler::new(
            Collaborators {
                store: store.clone(),
                tags: store.clone(),
                cleaner: store.clone(),
                cache: cache.clone(),
                spaces: Arc::new(InMemorySpaceRegistry::new()),
                sync: Arc::new(LocalOnlySync),
            },
            ReconcilerConfig::default().with_push_to_cloud(false),
        );

        Fixture {
            store,
            cache,
            reconciler,
        }
    }

    fn lic(id: &str, text: &str) -> Value {
        json!({"type": "lic", "id": id, "children": [{"text": text}]})
    }

    fn li(content: Value, nested: Option<Vec<Value>>) -> Value {
        match nested {
            Some(items) => json!({"type": "li", "children": [content, {"type": "ul", "children": items}]}),
            None => json!({"type": "li", "children": [content]}),
        }
    }

    fn ul(items: Vec<Value>) -> Value {
        json!({"type": "ul", "children": items})
    }

    async fn load(fixture: &Fixture, id: &str) -> Result<Node> {
        let raw = fixture
            .store
            .get_node(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("{} missing", id))?;
        Ok(Node::new(raw))
    }

    async fn save(fixture: &Fixture, id: &str, title: &str, list: Value) -> Result<()> {
        let node = load(fixture, id).await?;
        let title = json!({"type": "title", "children": [{"text": title}]});
        fixture
            .reconciler
            .save_outliner_editor(&node, Some(&title), Some(&list), false)
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_edit_sequence_keeps_snapshot_consistent() -> Result<()> {
        let f = fixture();

        save(
            &f,
            "journal",
            "Journal",
            ul(vec![
                li(lic("mon", "Monday"), Some(vec![li(lic("gym", "Gym"), None)])),
                li(lic("tue", "Tuesday"), None),
            ]),
        )
        .await?;

        // Outdent gym and move tuesday first
        save(
            &f,
            "journal",
            "Journal",
            ul(vec![
                li(lic("tue", "Tuesday"), None),
                li(lic("mon", "Monday"), None),
                li(lic("gym", "Gym"), None),
            ]),
        )
        .await?;

        let snapshot = f.cache.snapshot();
        let journal = snapshot.get_node("journal").expect("journal cached");
        let flattened = snapshot.flatten_node(journal);
        let flat: Vec<(&str, usize, usize)> = flattened
            .iter()
            .map(|item| (item.node.id(), item.depth, item.index))
            .collect();
        assert_eq!(flat, vec![("tue", 0, 0), ("mon", 0, 1), ("gym", 0, 2)]);

        let gym = snapshot.get_node("gym").expect("gym cached");
        assert_eq!(gym.parent_id(), Some("journal"));
        assert!(snapshot.get_node("mon").expect("mon cached").children().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_breadcrumb_and_page_after_save() -> Result<()> {
        let f = fixture();
        save(
            &f,
            "today",
            "Today",
            ul(vec![li(
                lic("plan", "Plan"),
                Some(vec![li(lic("step", "Step one"), None)]),
            )]),
        )
        .await?;

        let snapshot = f.reconciler.load_snapshot("s").await?;
        let step = snapshot.get_node("step").expect("step stored");

        let crumbs: Vec<&str> = snapshot.parent_nodes(step).iter().map(|n| n.id()).collect();
        assert_eq!(crumbs, vec!["daily-root", "today", "plan", "step"]);
        assert_eq!(snapshot.page_of(step).map(|n| n.id()), Some("today"));

        Ok(())
    }

    #[tokio::test]
    async fn test_views_over_saved_space() -> Result<()> {
        let f = fixture();
        save(&f, "ideas", "Ideas", ul(vec![li(lic("idea", "Build a boat"), None)])).await?;

        let snapshot = f.cache.snapshot();

        // Ideas was just written, so it sorts first
        let pages: Vec<&str> = snapshot.root_nodes()?.iter().map(|n| n.id()).collect();
        assert_eq!(pages, vec!["ideas", "journal"]);

        let favorites: Vec<&str> = snapshot.favorites()?.iter().map(|n| n.id()).collect();
        assert_eq!(favorites, vec!["ideas"]);
        assert!(snapshot.trashed_nodes()?.is_empty());
        assert_eq!(snapshot.inbox_node()?.id(), "inbox");

        // Other spaces never reach this cache
        assert!(snapshot.get_node("other-root").is_none());

        let found = snapshot.find(&NodeFilter::new().with_parent_id(Some("ideas".to_string())));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].plain_text(), "Build a boat");

        Ok(())
    }

    #[tokio::test]
    async fn test_backlinks_resolve_after_save() -> Result<()> {
        let f = fixture();
        let link = json!({"type": "lic", "id": "ref", "children": [
            {"text": "see "},
            {"type": "bidirectional_link_content", "linkId": "ideas", "children": [{"text": ""}]},
            {"text": ""}
        ]});
        save(&f, "journal", "Journal", ul(vec![li(link, None)])).await?;

        let snapshot: NodeSnapshot = f.store.list_nodes_by_space_id("s").await?.into();
        let ideas = snapshot.get_node("ideas").expect("ideas stored");
        let refs: Vec<&str> = snapshot.linked_references(ideas).iter().map(|n| n.id()).collect();
        assert_eq!(refs, vec!["ref"]);

        Ok(())
    }

    #[tokio::test]
    async fn test_clearing_outline_removes_subtree() -> Result<()> {
        let f = fixture();
        save(
            &f,
            "journal",
            "Journal",
            ul(vec![li(lic("a", "A"), Some(vec![li(lic("b", "B"), None)]))]),
        )
        .await?;

        save(&f, "journal", "Journal", ul(Vec::new())).await?;

        assert!(f.store.get_node("a").await?.is_none());
        assert!(f.store.get_node("b").await?.is_none());
        assert!(load(&f, "journal").await?.children().is_empty());

        Ok(())
    }
}
