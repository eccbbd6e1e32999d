use std::path::Path;

use anyhow::{Context, Result};
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::Value;
use tantivy::snippet::{Snippet, SnippetGenerator};
use tantivy::{Index, TantivyDocument};

use crate::search::store::fields_from_schema;

/// Upper bound on snippet length, in characters of the source fragment.
const SNIPPET_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchHit {
    pub tab_id: String,
    pub title: String,
    pub snippet: String,
    pub score: f32,
}

/// Ranked full-text query against the store at `store_path`, best match
/// first. The query string goes straight to tantivy's parser, so its
/// boolean and phrase operators are available to the caller.
///
/// An empty query, a zero limit, or a store that was never created
/// yields no hits; a store that exists but cannot be opened is an error.
pub fn search(store_path: &Path, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
    if query.trim().is_empty() || limit == 0 {
        return Ok(Vec::new());
    }
    if !store_path.join("meta.json").exists() {
        tracing::warn!(store = %store_path.display(), "search store not found, returning no hits");
        return Ok(Vec::new());
    }

    let index = Index::open_in_dir(store_path)
        .with_context(|| format!("open search store at {}", store_path.display()))?;
    let schema = index.schema();
    let fields = fields_from_schema(&schema)?;
    let reader = index.reader()?;
    let searcher = reader.searcher();

    let parser = QueryParser::for_index(searcher.index(), vec![fields.title, fields.text]);
    let q = parser.parse_query(query)?;

    let mut snippet_generator = SnippetGenerator::create(&searcher, &*q, fields.text)?;
    snippet_generator.set_max_num_chars(SNIPPET_MAX_CHARS);

    let top_docs = searcher.search(&q, &TopDocs::with_limit(limit).order_by_score())?;
    let mut hits = Vec::new();
    for (score, addr) in top_docs {
        let doc: TantivyDocument = searcher.doc(addr)?;
        let tab_id = doc
            .get_first(fields.tab_id)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let title = doc
            .get_first(fields.title)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let text = doc
            .get_first(fields.text)
            .and_then(|v| v.as_str())
            .unwrap_or("");
        let snippet = render_snippet(&snippet_generator.snippet_from_doc(&doc), text);
        hits.push(SearchHit {
            tab_id,
            title,
            snippet,
            score,
        });
    }

    tracing::info!(query = query, hits = hits.len(), "search_done");
    Ok(hits)
}

/// Highlight matches with `**`, and mark truncation boundaries with an
/// ellipsis when the fragment is a strict infix of the stored text.
fn render_snippet(snippet: &Snippet, full_text: &str) -> String {
    let fragment = snippet.fragment();
    if fragment.is_empty() {
        // Match was on the title; fall back to a bounded text prefix.
        let mut prefix: String = full_text.chars().take(SNIPPET_MAX_CHARS).collect();
        if prefix.len() < full_text.len() {
            prefix.push_str("...");
        }
        return prefix;
    }
    let mut out = snippet
        .to_html()
        .replace("<b>", "**")
        .replace("</b>", "**");
    if !full_text.starts_with(fragment) {
        out.insert_str(0, "...");
    }
    if !full_text.ends_with(fragment) {
        out.push_str("...");
    }
    out
}
