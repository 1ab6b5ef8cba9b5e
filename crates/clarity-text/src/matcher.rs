use clarity_core::query::{Fuzziness, MultiMatch};
use tantivy::query::{BooleanQuery, BoostQuery, DisjunctionMaxQuery, FuzzyTermQuery, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::{Index, Term};

use crate::tantivy_utils::Fields;

/// Best-fields multi-match: a disjunction-max over one boosted query per field.
///
/// Text fields match any analysed token, `.keyword` fields the whole string.
/// With AUTO fuzziness each token also matches within one edit. `None` means
/// nothing in the text is searchable (empty, or stopwords only).
pub(crate) fn best_fields(index: &Index, fields: &Fields, matcher: &MultiMatch) -> tantivy::Result<Option<Box<dyn Query>>> {
	let fuzzy = matches!(matcher.fuzziness, Some(Fuzziness::Auto));
	let mut per_field: Vec<Box<dyn Query>> = Vec::new();
	for boost in &matcher.fields {
		let Some(field) = fields.resolve(&boost.field) else {
			tracing::debug!(field = %boost.field, "skipping unmapped field");
			continue;
		};
		let query = if boost.is_keyword() {
			keyword_query(field, &matcher.text)
		} else {
			text_query(index, field, &matcher.text, fuzzy)?
		};
		if let Some(q) = query {
			per_field.push(Box::new(BoostQuery::new(q, boost.weight())));
		}
	}
	if per_field.is_empty() { return Ok(None); }
	Ok(Some(Box::new(DisjunctionMaxQuery::new(per_field))))
}

fn keyword_query(field: Field, text: &str) -> Option<Box<dyn Query>> {
	if text.is_empty() { return None; }
	Some(Box::new(TermQuery::new(Term::from_field_text(field, text), IndexRecordOption::Basic)))
}

fn text_query(index: &Index, field: Field, text: &str, fuzzy: bool) -> tantivy::Result<Option<Box<dyn Query>>> {
	let mut analyzer = index.tokenizer_for_field(field)?;
	let mut tokens: Vec<String> = Vec::new();
	let mut stream = analyzer.token_stream(text);
	stream.process(&mut |tok| tokens.push(tok.text.clone()));
	tokens.dedup();
	if tokens.is_empty() { return Ok(None); }
	let mut clauses: Vec<Box<dyn Query>> = Vec::with_capacity(tokens.len() * 2);
	for token in tokens {
		let term = Term::from_field_text(field, &token);
		if fuzzy {
			clauses.push(Box::new(FuzzyTermQuery::new(term.clone(), 1, true)));
		}
		clauses.push(Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs)));
	}
	Ok(Some(Box::new(BooleanQuery::union(clauses))))
}
