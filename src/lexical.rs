//! Lexical/keyword search channel, backed by an in-memory Tantivy index
//! (spec §4.C9 "lexical index"). Grounded on the teacher's
//! `storage/tantivy.rs` `DocumentIndex`: same schema-build / writer-batch /
//! reader-reload / `QueryParser` shape, simplified to the single `content`
//! field this system's chunks need.

use crate::ids::ChunkId;
use crate::model::CodeChunk;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, IndexRecordOption, Schema, SchemaBuilder, TextFieldIndexing, TextOptions, Value, STORED, STRING};
use tantivy::{Index, IndexReader, ReloadPolicy, TantivyDocument as Document};

struct LexicalSchema {
    chunk_id: Field,
    rel_path: Field,
    content: Field,
}

fn build_schema() -> (Schema, LexicalSchema) {
    let mut builder = SchemaBuilder::default();
    let chunk_id = builder.add_text_field("chunk_id", STRING | STORED);
    let rel_path = builder.add_text_field("rel_path", STRING | STORED);
    let text_options = TextOptions::default()
        .set_indexing_options(TextFieldIndexing::default().set_tokenizer("default").set_index_option(IndexRecordOption::WithFreqsAndPositions))
        .set_stored();
    let content = builder.add_text_field("content", text_options);
    (builder.build(), LexicalSchema { chunk_id, rel_path, content })
}

/// A keyword index built fresh from a chunk list, in memory (spec treats the
/// persisted `index.json` chunk list as the sole keyword-search source of
/// truth; this wraps it in a queryable Tantivy instance for the duration of
/// a search call).
pub struct LexicalIndex {
    index: Index,
    reader: IndexReader,
    schema: LexicalSchema,
}

impl LexicalIndex {
    pub fn build(chunks: &[CodeChunk]) -> Result<Self, tantivy::TantivyError> {
        let (schema, fields) = build_schema();
        let index = Index::create_in_ram(schema);
        let mut writer = index.writer::<Document>(50_000_000)?;
        for chunk in chunks {
            let mut doc = Document::new();
            doc.add_text(fields.chunk_id, chunk.id.to_string());
            doc.add_text(fields.rel_path, &chunk.rel_path);
            doc.add_text(fields.content, &chunk.content);
            writer.add_document(doc)?;
        }
        writer.commit()?;

        let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
        reader.reload()?;

        Ok(Self { index, reader, schema: fields })
    }

    /// Returns up to `limit` chunk ids ranked by Tantivy's BM25 score,
    /// highest first.
    pub fn search(&self, query: &str, limit: usize) -> Vec<(ChunkId, f32)> {
        let searcher = self.reader.searcher();
        let parser = QueryParser::for_index(&self.index, vec![self.schema.content]);
        let Ok(parsed) = parser.parse_query(query) else { return Vec::new() };
        let Ok(top_docs) = searcher.search(&parsed, &TopDocs::with_limit(limit)) else { return Vec::new() };

        top_docs
            .into_iter()
            .filter_map(|(score, addr)| {
                let doc: Document = searcher.doc(addr).ok()?;
                let id_str = doc.get_first(self.schema.chunk_id)?.as_str()?;
                let uuid = uuid::Uuid::parse_str(id_str).ok()?;
                Some((ChunkId(uuid), score))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChunkStrategy;

    fn chunk(content: &str) -> CodeChunk {
        CodeChunk {
            id: ChunkId::new(),
            abs_path: "/a/f.ts".into(),
            rel_path: "f.ts".into(),
            start_line: 1,
            end_line: 1,
            language: "typescript".into(),
            framework: None,
            component_type: None,
            content: content.into(),
            tags: Vec::new(),
            dependencies: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            metadata: Default::default(),
            symbol_aware: false,
            symbol_name: None,
            symbol_kind: None,
            symbol_path: Vec::new(),
            parent_symbol: None,
            chunk_strategy: ChunkStrategy::LineOrComponent,
        }
    }

    #[test]
    fn finds_matching_chunk_by_keyword() {
        let a = chunk("function authenticateUser() {}");
        let b = chunk("function renderWidget() {}");
        let a_id = a.id;
        let index = LexicalIndex::build(&[a, b]).unwrap();
        let results = index.search("authenticateUser", 5);
        assert!(!results.is_empty());
        assert_eq!(results[0].0, a_id);
    }
}
