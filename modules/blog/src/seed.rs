use jsonapi::memory::MemoryStore;
use serde_json::json;
use tracing::info;

/// Three authors, four posts (one still a draft) and a few comments.
pub fn demo(store: &MemoryStore) {
    let users = store.table("users");
    users.seed([
        json!({"id": "1", "name": "Ann", "email": "ann@example.com"}),
        json!({"id": "2", "name": "Bob", "email": "bob@example.com"}),
        json!({"id": "3", "name": "Cid", "email": "cid@example.com"}),
    ]);

    let posts = store.table("posts");
    posts.seed([
        json!({
            "id": "1",
            "title": "Hello, JSON:API",
            "body": "A first look at resource objects.",
            "published_at": "2026-01-05T09:00:00Z",
            "created_at": "2026-01-04T18:30:00Z",
            "author_id": "1"
        }),
        json!({
            "id": "2",
            "title": "Sparse fieldsets",
            "body": "Ask only for what you render.",
            "published_at": "2026-02-11T12:00:00Z",
            "created_at": "2026-02-10T08:15:00Z",
            "author_id": "2"
        }),
        json!({
            "id": "3",
            "title": "Compound documents",
            "body": "Side-load related resources with include.",
            "published_at": "2026-03-02T16:45:00Z",
            "created_at": "2026-03-01T10:00:00Z",
            "author_id": "1"
        }),
        json!({
            "id": "4",
            "title": "Draft notes",
            "body": null,
            "published_at": null,
            "created_at": "2026-03-20T07:00:00Z",
            "author_id": "3"
        }),
    ]);

    let comments = store.table("comments");
    comments.seed([
        json!({"id": "1", "text": "Great intro", "post_id": "1", "author_id": "2", "mentions": []}),
        json!({
            "id": "2",
            "text": "Thanks, see the next one",
            "post_id": "1",
            "author_id": "1",
            "mentions": [{"type": "users", "id": "2"}, {"type": "posts", "id": "2"}]
        }),
        json!({"id": "3", "text": "Very handy", "post_id": "2", "author_id": "1", "mentions": []}),
        json!({"id": "4", "text": "When is part two?", "post_id": "3", "author_id": "3", "mentions": []}),
    ]);

    info!(
        users = users.len(),
        posts = posts.len(),
        comments = comments.len(),
        "demo data seeded"
    );
}
