//! Catalog search.
//!
//! Weighted fuzzy matching over product name, category name and description.
//! Each query token is scored against the best-matching token of a field;
//! when no product clears the threshold, a plain substring match is used.

use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;
use crate::domain::aggregates::Product;

const NAME_WEIGHT: f64 = 0.6;
const CATEGORY_WEIGHT: f64 = 0.25;
const DESCRIPTION_WEIGHT: f64 = 0.15;
const TOKEN_FLOOR: f64 = 0.6;
const MATCH_THRESHOLD: f64 = 0.35;

pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 50;

#[derive(Clone, Debug, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub product: Product,
    pub score: f64,
}

pub fn search(products: &[Product], category_names: &HashMap<Uuid, String>, query: &str, limit: usize) -> Vec<SearchHit> {
    let query = query.trim().to_lowercase();
    let terms = tokenize(&query);
    if terms.is_empty() { return vec![]; }
    let limit = limit.clamp(1, MAX_LIMIT);
    let category_of = |p: &Product| p.category_id.and_then(|id| category_names.get(&id)).map(|s| s.to_lowercase()).unwrap_or_default();

    let mut hits: Vec<SearchHit> = products
        .iter()
        .filter_map(|p| {
            let score = NAME_WEIGHT * field_score(&terms, &p.name.to_lowercase())
                + CATEGORY_WEIGHT * field_score(&terms, &category_of(p))
                + DESCRIPTION_WEIGHT * field_score(&terms, &p.description.to_lowercase());
            (score >= MATCH_THRESHOLD).then(|| SearchHit { product: p.clone(), score })
        })
        .collect();

    if hits.is_empty() {
        hits = products
            .iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&query)
                    || category_of(p).contains(&query)
                    || p.description.to_lowercase().contains(&query)
            })
            .map(|p| SearchHit { product: p.clone(), score: 0.0 })
            .collect();
    }

    hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.product.name.cmp(&b.product.name)));
    hits.truncate(limit);
    hits
}

fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()).collect()
}

/// Mean over query terms of each term's best similarity in `field`.
fn field_score(terms: &[&str], field: &str) -> f64 {
    let words = tokenize(field);
    if words.is_empty() { return 0.0; }
    let total: f64 = terms
        .iter()
        .map(|t| {
            let best = words.iter().map(|w| token_similarity(t, w)).fold(0.0, f64::max);
            if best >= TOKEN_FLOOR { best } else { 0.0 }
        })
        .sum();
    total / terms.len() as f64
}

fn token_similarity(term: &str, word: &str) -> f64 {
    if term == word { return 1.0; }
    if word.starts_with(term) { return 0.9; }
    let max_len = term.chars().count().max(word.chars().count());
    1.0 - levenshtein(term, word) as f64 / max_len as f64
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];
    for (i, ca) in a.chars().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            cur[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}
