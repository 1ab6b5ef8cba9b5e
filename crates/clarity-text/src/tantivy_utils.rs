use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer};
use tantivy::Index;

pub const TOKENIZER: &str = "text_with_stopwords";

/// Handles to every field of the document schema.
#[derive(Debug, Clone, Copy)]
pub struct Fields {
	pub id: Field,
	pub vague: Field,
	pub actual: Field,
	pub combined_text: Field,
	pub vague_keyword: Field,
	pub actual_keyword: Field,
	pub embedding: Field,
}

impl Fields {
	pub fn from_schema(schema: &Schema) -> tantivy::Result<Self> {
		Ok(Self {
			id: schema.get_field("id")?,
			vague: schema.get_field("vague")?,
			actual: schema.get_field("actual")?,
			combined_text: schema.get_field("combined_text")?,
			vague_keyword: schema.get_field("vague_keyword")?,
			actual_keyword: schema.get_field("actual_keyword")?,
			embedding: schema.get_field("vague_embedding")?,
		})
	}

	/// Resolve an Elasticsearch field name, `.keyword` sub-fields included.
	pub fn resolve(&self, name: &str) -> Option<Field> {
		match name {
			"id" => Some(self.id),
			"vague" => Some(self.vague),
			"actual" => Some(self.actual),
			"combined_text" => Some(self.combined_text),
			"vague.keyword" => Some(self.vague_keyword),
			"actual.keyword" => Some(self.actual_keyword),
			"vague_embedding" => Some(self.embedding),
			_ => None,
		}
	}
}

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	schema_builder.add_text_field("id", STRING | STORED);
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(TOKENIZER).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing).set_stored();
	schema_builder.add_text_field("vague", text_options.clone());
	schema_builder.add_text_field("actual", text_options.clone());
	schema_builder.add_text_field("combined_text", text_options);
	schema_builder.add_text_field("vague_keyword", STRING);
	schema_builder.add_text_field("actual_keyword", STRING);
	schema_builder.add_bytes_field("vague_embedding", STORED);
	schema_builder.build()
}

pub fn register_tokenizer(index: &Index) {
	let stop_words = vec![
		"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
	];
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(stop_words.into_iter().map(|s| s.to_string())))
		.build();
	index.tokenizers().register(TOKENIZER, tokenizer);
}

pub fn encode_vector(v: &[f32]) -> Vec<u8> {
	v.iter().flat_map(|x| x.to_le_bytes()).collect()
}

pub fn decode_vector(bytes: &[u8]) -> Option<Vec<f32>> {
	if bytes.len() % 4 != 0 { return None; }
	Some(bytes.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn vector_bytes_are_little_endian_f32() {
		let bytes = encode_vector(&[1.0, -0.5]);
		assert_eq!(bytes.len(), 8);
		assert_eq!(decode_vector(&bytes), Some(vec![1.0, -0.5]));
		assert_eq!(decode_vector(&bytes[..3]), None);
	}

	#[test]
	fn keyword_subfields_resolve_to_raw_fields() {
		let schema = build_schema();
		let fields = Fields::from_schema(&schema).unwrap();
		assert_eq!(fields.resolve("vague.keyword"), Some(fields.vague_keyword));
		assert_eq!(fields.resolve("combined_text"), Some(fields.combined_text));
		assert_eq!(fields.resolve("nope"), None);
	}
}
