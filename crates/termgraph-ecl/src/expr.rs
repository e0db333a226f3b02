//! Expression-level helpers: normalisation, top-level OR splitting, and
//! the small operator subset served from the local store.

use termgraph_store::ConceptId;

/// Each char offset of `expr`, flagged when it sits at bracket depth zero
/// outside `|term|` text.
fn top_level_positions(expr: &str) -> Vec<(usize, bool)> {
    let mut depth = 0i32;
    let mut in_term = false;
    let mut out = Vec::with_capacity(expr.len());
    for (i, ch) in expr.char_indices() {
        match ch {
            '|' => in_term = !in_term,
            '(' | '{' if !in_term => depth += 1,
            ')' | '}' if !in_term => depth -= 1,
            _ => {}
        }
        let top = depth == 0 && !in_term && !matches!(ch, '|' | ')' | '}');
        out.push((i, top));
    }
    out
}

/// Offsets where `keyword` appears as a whitespace-delimited word at the top level.
fn keyword_offsets(expr: &str, keyword: &str) -> Vec<usize> {
    let positions = top_level_positions(expr);
    let bytes = expr.as_bytes();
    let k = keyword.len();
    positions
        .iter()
        .filter(|(i, top)| {
            *top
                && expr.len() >= i + k
                && expr.is_char_boundary(i + k)
                && expr[*i..i + k].eq_ignore_ascii_case(keyword)
                && *i > 0
                && bytes[i - 1].is_ascii_whitespace()
                && bytes.get(i + k).is_some_and(|b| b.is_ascii_whitespace())
        })
        .map(|(i, _)| *i)
        .collect()
}

fn has_top_level_operator(expr: &str) -> bool {
    ["AND", "OR", "MINUS"]
        .iter()
        .any(|kw| !keyword_offsets(expr, kw).is_empty())
}

/// Trim, then drop one enclosing bracket pair when it spans the whole
/// expression and its contents carry no top-level AND/OR/MINUS.
pub fn normalize(expr: &str) -> String {
    let trimmed = expr.trim();
    if let Some(inner) = trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        if balanced(inner) && !has_top_level_operator(inner) {
            return inner.trim().to_string();
        }
    }
    trimmed.to_string()
}

/// True when every bracket in `s` closes inside `s`.
fn balanced(s: &str) -> bool {
    let mut depth = 0i32;
    let mut in_term = false;
    for ch in s.chars() {
        match ch {
            '|' => in_term = !in_term,
            '(' | '{' if !in_term => depth += 1,
            ')' | '}' if !in_term => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Split on top-level ` OR `. A single-element result means no split.
pub fn split_top_level_or(expr: &str) -> Vec<String> {
    let offsets = keyword_offsets(expr, "OR");
    if offsets.is_empty() {
        return vec![expr.trim().to_string()];
    }
    let mut parts = Vec::with_capacity(offsets.len() + 1);
    let mut start = 0;
    for at in offsets {
        parts.push(expr[start..at].trim().to_string());
        start = at + 2;
    }
    parts.push(expr[start..].trim().to_string());
    parts
}

/// Remove `|term|` text, keeping the identifiers around it.
fn strip_terms(expr: &str) -> String {
    let mut out = String::with_capacity(expr.len());
    let mut in_term = false;
    for ch in expr.chars() {
        if ch == '|' {
            in_term = !in_term;
        } else if !in_term {
            out.push(ch);
        }
    }
    out
}

/// Whether the expression is in the subset the local store can answer.
pub fn is_simple(expr: &str) -> bool {
    if expr.matches('|').count() > 2 {
        return false;
    }
    let bare = strip_terms(expr);
    if bare.contains(['{', '}', ',', '^', ':', '(', ')']) {
        return false;
    }
    !bare
        .split_whitespace()
        .any(|word| word.eq_ignore_ascii_case("AND") || word.eq_ignore_ascii_case("MINUS") || word.eq_ignore_ascii_case("OR"))
}

/// Locally resolvable forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalExpr {
    Any,
    Concept(ConceptId),
    Descendants(ConceptId),
    DescendantsOrSelf(ConceptId),
    Children(ConceptId),
    Ancestors(ConceptId),
    AncestorsOrSelf(ConceptId),
    Parents(ConceptId),
}

impl LocalExpr {
    /// Parse a simple expression; `None` for anything else.
    pub fn parse(expr: &str) -> Option<Self> {
        let bare = strip_terms(expr);
        let bare = bare.trim();
        if bare == "*" {
            return Some(LocalExpr::Any);
        }
        let forms: [(&str, fn(ConceptId) -> LocalExpr); 7] = [
            ("<<", LocalExpr::DescendantsOrSelf),
            ("<!", LocalExpr::Children),
            ("<", LocalExpr::Descendants),
            (">>", LocalExpr::AncestorsOrSelf),
            (">!", LocalExpr::Parents),
            (">", LocalExpr::Ancestors),
            ("", LocalExpr::Concept),
        ];
        forms.into_iter().find_map(|(op, build)| {
            let rest = bare.strip_prefix(op)?.trim();
            if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            rest.parse().ok().map(build)
        })
    }
}
