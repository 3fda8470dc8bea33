//! Page selection for the gap-filling pass

use immo_domain::{FieldSpec, Page};
use std::collections::BTreeSet;

/// Minimum token length is exclusive: tokens need more than this many chars
const MIN_TOKEN_LEN: usize = 3;

/// Lowercase keyword tokens of the fields' labels
///
/// Labels are split on runs of non-ASCII-alphanumeric characters; tokens of
/// three characters or fewer are dropped.
pub fn label_tokens(fields: &[FieldSpec]) -> BTreeSet<String> {
    fields
        .iter()
        .flat_map(|field| {
            field
                .label
                .to_lowercase()
                .split(|c: char| !c.is_ascii_alphanumeric())
                .filter(|token| token.len() > MIN_TOKEN_LEN)
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Pages whose text mentions a keyword of any of `fields`, in order
pub fn find_relevant_pages(pages: &[Page], fields: &[FieldSpec]) -> Vec<Page> {
    let tokens = label_tokens(fields);
    if tokens.is_empty() {
        return Vec::new();
    }

    pages
        .iter()
        .filter(|page| {
            let text = page.text.to_lowercase();
            tokens.iter().any(|token| text.contains(token.as_str()))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_tokens() {
        let fields = vec![
            FieldSpec::new("a", "Date de construction", "date"),
            FieldSpec::from_path("syndic.nom_du_gestionnaire", "string"),
        ];
        let tokens: Vec<_> = label_tokens(&fields).into_iter().collect();
        assert_eq!(
            tokens,
            vec!["construction", "date", "gestionnaire", "syndic"]
        );
    }

    #[test]
    fn test_non_ascii_letters_split_tokens() {
        let fields = vec![FieldSpec::new("a", "Année_édifice", "date")];
        let tokens: Vec<_> = label_tokens(&fields).into_iter().collect();
        assert_eq!(tokens, vec!["difice"]);
    }

    #[test]
    fn test_selects_matching_page_only() {
        let fields = vec![FieldSpec::new("a.b", "Date de construction", "date")];
        let pages = vec![
            Page::new(1, "Cette résidence..."),
            Page::new(2, "Date de construction: 1985"),
        ];
        let relevant = find_relevant_pages(&pages, &fields);
        assert_eq!(relevant, vec![Page::new(2, "Date de construction: 1985")]);
    }

    #[test]
    fn test_match_is_case_insensitive_substring() {
        let fields = vec![FieldSpec::new("a", "ascenseur", "string")];
        let pages = vec![Page::new(4, "Contrôle des ASCENSEURS")];
        assert_eq!(find_relevant_pages(&pages, &fields).len(), 1);
    }

    #[test]
    fn test_short_labels_select_nothing() {
        let fields = vec![FieldSpec::new("a", "DPE", "string")];
        let pages = vec![Page::new(1, "DPE classe C")];
        assert!(find_relevant_pages(&pages, &fields).is_empty());
    }
}
