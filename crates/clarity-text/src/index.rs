use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use tantivy::collector::{DocSetCollector, TopDocs};
use tantivy::query::{AllQuery, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{DocAddress, Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyDocument, TantivyError, Term};

use clarity_core::query::{hybrid_score, IndexQuery, MultiMatch, VAGUE_EMBEDDING_FIELD};
use clarity_core::traits::{DocumentIndexer, SearchIndex};
use clarity_core::{Document, Error, Result};
use clarity_vector::{cosine_similarity, VectorStore};

use crate::matcher::best_fields;
use crate::tantivy_utils::{build_schema, decode_vector, encode_vector, register_tokenizer, Fields};

const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Document index backed by tantivy, with vectors held in an exact store.
///
/// Vectors are also persisted as a stored bytes field, so [`TantivyIndex::open_in_dir`]
/// restores kNN and hybrid search without re-embedding.
pub struct TantivyIndex {
	name: String,
	index: Index,
	reader: IndexReader,
	fields: Fields,
	vectors: RwLock<VectorStore>,
}

impl TantivyIndex {
	pub fn create_in_ram(name: &str) -> Result<Self> {
		let index = Index::create_in_ram(build_schema());
		Self::from_index(name, index)
	}

	/// Create an empty index in `index_dir`, removing whatever was there.
	pub fn create_in_dir(name: &str, index_dir: &Path) -> Result<Self> {
		if index_dir.exists() { std::fs::remove_dir_all(index_dir)?; }
		std::fs::create_dir_all(index_dir)?;
		let index = Index::create_in_dir(index_dir, build_schema()).map_err(|e| unavailable(name, e))?;
		Self::from_index(name, index)
	}

	pub fn open_in_dir(name: &str, index_dir: &Path) -> Result<Self> {
		let index = Index::open_in_dir(index_dir).map_err(|e| unavailable(name, e))?;
		let this = Self::from_index(name, index)?;
		let restored = this.restore_vectors()?;
		tracing::info!(index = name, dir = %index_dir.display(), vectors = restored, "opened tantivy index");
		Ok(this)
	}

	fn from_index(name: &str, index: Index) -> Result<Self> {
		register_tokenizer(&index);
		let fields = Fields::from_schema(&index.schema()).map_err(|e| unavailable(name, e))?;
		let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into().map_err(|e| unavailable(name, e))?;
		Ok(Self { name: name.to_string(), index, reader, fields, vectors: RwLock::new(VectorStore::new()) })
	}

	fn restore_vectors(&self) -> Result<usize> {
		let searcher = self.reader.searcher();
		let addresses = searcher.search(&AllQuery, &DocSetCollector).map_err(|e| self.rejected(e))?;
		let mut store = VectorStore::new();
		for addr in addresses {
			let doc: TantivyDocument = searcher.doc(addr).map_err(|e| self.rejected(e))?;
			let id = text_of(&doc, self.fields.id);
			if let Some(v) = doc.get_first(self.fields.embedding).and_then(|v| v.as_bytes()).and_then(decode_vector) {
				store.insert(&id, v)?;
			}
		}
		let n = store.len();
		*self.vectors.write().unwrap_or_else(|e| e.into_inner()) = store;
		Ok(n)
	}

	pub fn num_docs(&self) -> u64 { self.reader.searcher().num_docs() }

	fn rejected(&self, e: TantivyError) -> Error {
		Error::IndexRejected { index: self.name.clone(), message: e.to_string() }
	}

	fn lexical(&self, searcher: &Searcher, matcher: &MultiMatch, limit: usize) -> Result<Vec<(f32, DocAddress)>> {
		if limit == 0 { return Ok(Vec::new()); }
		let Some(query) = best_fields(&self.index, &self.fields, matcher).map_err(|e| self.rejected(e))? else {
			return Ok(Vec::new());
		};
		searcher.search(&*query, &TopDocs::with_limit(limit)).map_err(|e| self.rejected(e))
	}

	fn find_by_id(&self, searcher: &Searcher, id: &str) -> Result<Option<TantivyDocument>> {
		let q = TermQuery::new(Term::from_field_text(self.fields.id, id), IndexRecordOption::Basic);
		let hit = searcher.search(&q, &TopDocs::with_limit(1)).map_err(|e| self.rejected(e))?;
		match hit.first() {
			Some((_, addr)) => Ok(Some(searcher.doc(*addr).map_err(|e| self.rejected(e))?)),
			None => Ok(None),
		}
	}

	fn check_vector_field(&self, field: &str) -> Result<()> {
		if field == VAGUE_EMBEDDING_FIELD { return Ok(()); }
		Err(Error::IndexRejected { index: self.name.clone(), message: format!("field '{field}' is not a dense vector") })
	}

	fn project(&self, doc: &TantivyDocument, source: &[String]) -> Document {
		let wants = |name: &str| source.is_empty() || source.iter().any(|s| s == name);
		let id = text_of(doc, self.fields.id);
		let embedding = if wants(VAGUE_EMBEDDING_FIELD) {
			self.vectors.read().unwrap_or_else(|e| e.into_inner()).get(&id).map(<[f32]>::to_vec)
		} else { None };
		Document {
			vague: if wants("vague") { text_of(doc, self.fields.vague) } else { String::new() },
			actual: if wants("actual") { text_of(doc, self.fields.actual) } else { String::new() },
			combined_text: if wants("combined_text") { Some(text_of(doc, self.fields.combined_text)) } else { None },
			embedding,
			id,
		}
	}

	fn run(&self, query: &IndexQuery) -> Result<Vec<Document>> {
		let searcher = self.reader.searcher();
		match query {
			IndexQuery::Lexical { size, matcher, source } => {
				let top = self.lexical(&searcher, matcher, *size)?;
				top.into_iter()
					.map(|(_, addr)| searcher.doc::<TantivyDocument>(addr).map(|d| self.project(&d, source)).map_err(|e| self.rejected(e)))
					.collect()
			}
			IndexQuery::Knn { knn, source } => {
				self.check_vector_field(&knn.field)?;
				let nearest = {
					let store = self.vectors.read().unwrap_or_else(|e| e.into_inner());
					if store.is_empty() { return Ok(Vec::new()); }
					store.nearest(&knn.vector, knn.k)?
				};
				let mut docs = Vec::with_capacity(nearest.len());
				for (id, _) in nearest {
					if let Some(doc) = self.find_by_id(&searcher, &id)? { docs.push(self.project(&doc, source)); }
				}
				Ok(docs)
			}
			IndexQuery::Blended { size, matcher, vector_field, vector, source } => {
				self.check_vector_field(vector_field)?;
				let candidates = self.lexical(&searcher, matcher, searcher.num_docs() as usize)?;
				if candidates.is_empty() || *size == 0 { return Ok(Vec::new()); }
				let mut scored = Vec::with_capacity(candidates.len());
				{
					let store = self.vectors.read().unwrap_or_else(|e| e.into_inner());
					store.check_query(vector)?;
					for (lexical, addr) in candidates {
						let doc: TantivyDocument = searcher.doc(addr).map_err(|e| self.rejected(e))?;
						let id = text_of(&doc, self.fields.id);
						let stored = store.get(&id).ok_or_else(|| Error::IndexRejected {
							index: self.name.clone(),
							message: format!("document {id} has no {VAGUE_EMBEDDING_FIELD}"),
						})?;
						scored.push((hybrid_score(cosine_similarity(stored, vector), lexical), doc));
					}
				}
				scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
				Ok(scored.into_iter().take(*size).map(|(_, d)| self.project(&d, source)).collect())
			}
		}
	}
}

fn unavailable(index: &str, e: TantivyError) -> Error {
	Error::IndexUnavailable { index: index.to_string(), message: e.to_string() }
}

fn text_of(doc: &TantivyDocument, field: tantivy::schema::Field) -> String {
	doc.get_first(field).and_then(|v| v.as_str()).unwrap_or_default().to_string()
}

#[async_trait]
impl SearchIndex for TantivyIndex {
	fn name(&self) -> &str { &self.name }

	async fn search(&self, query: &IndexQuery) -> Result<Vec<Document>> {
		let hits = self.run(query)?;
		tracing::debug!(index = %self.name, kind = query.kind(), hits = hits.len(), "search");
		Ok(hits)
	}
}

#[async_trait]
impl DocumentIndexer for TantivyIndex {
	async fn index_documents(&self, docs: &[Document]) -> Result<usize> {
		// Stage vectors first so a dimension clash leaves the index untouched.
		let mut staged = self.vectors.read().unwrap_or_else(|e| e.into_inner()).clone();
		for d in docs {
			if d.id.is_empty() { return Err(Error::InvalidInput(format!("document '{}' has no id", d.vague))); }
			match &d.embedding {
				Some(v) => staged.insert(&d.id, v.clone())?,
				None => { staged.remove(&d.id); }
			}
		}

		let mut writer: IndexWriter = self.index.writer(WRITER_HEAP_BYTES).map_err(|e| self.rejected(e))?;
		for d in docs {
			writer.delete_term(Term::from_field_text(self.fields.id, &d.id));
			let mut doc = TantivyDocument::default();
			doc.add_text(self.fields.id, &d.id);
			doc.add_text(self.fields.vague, &d.vague);
			doc.add_text(self.fields.actual, &d.actual);
			let combined = d.combined_text.clone().unwrap_or_else(|| format!("{} {}", d.vague, d.actual));
			doc.add_text(self.fields.combined_text, &combined);
			doc.add_text(self.fields.vague_keyword, &d.vague);
			doc.add_text(self.fields.actual_keyword, &d.actual);
			if let Some(v) = &d.embedding { doc.add_bytes(self.fields.embedding, encode_vector(v).as_slice()); }
			writer.add_document(doc).map_err(|e| self.rejected(e))?;
		}
		writer.commit().map_err(|e| self.rejected(e))?;
		self.reader.reload().map_err(|e| self.rejected(e))?;
		*self.vectors.write().unwrap_or_else(|e| e.into_inner()) = staged;
		tracing::info!(index = %self.name, count = docs.len(), "indexed documents");
		Ok(docs.len())
	}
}
