use proptest::prelude::*;
use trackedit_core::{RevisionEditor, RevisionSettings};

const NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#;

/// Build a single-paragraph document with the text fragmented into the
/// given chunks, one run per chunk.
fn fragmented_editor(chunks: &[String]) -> RevisionEditor {
    let runs: String = chunks
        .iter()
        .map(|c| {
            format!(
                r#"<w:r><w:t xml:space="preserve">{}</w:t></w:r>"#,
                c.replace('&', "&amp;").replace('<', "&lt;")
            )
        })
        .collect();
    let xml = format!(r#"<w:document {NS}><w:body><w:p>{runs}</w:p></w:body></w:document>"#);
    RevisionEditor::parse(&xml, RevisionSettings::for_author("Prop Tester")).unwrap()
}

/// Occurrences of `needle` in `haystack`, overlap included.
fn overlapping_count(haystack: &str, needle: &str) -> usize {
    haystack
        .char_indices()
        .filter(|(i, _)| haystack[*i..].starts_with(needle))
        .count()
}

/// Split `text` into `pieces` chunks at char boundaries.
fn split_chunks(text: &str, pieces: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let pieces = pieces.clamp(1, chars.len().max(1));
    let size = chars.len().div_ceil(pieces);
    chars
        .chunks(size.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

/// (document text, query char range) where the query occurs exactly
/// once in the text, so the editor and the string model agree on the
/// target occurrence.
fn unique_query() -> impl Strategy<Value = (String, usize, usize)> {
    ("[a-z ]{4,24}", any::<prop::sample::Index>(), any::<prop::sample::Index>()).prop_filter_map(
        "query must be unique in text",
        |(text, a, b)| {
            let len = text.chars().count();
            let i = a.index(len);
            let j = b.index(len);
            let (start, end) = if i <= j { (i, j + 1) } else { (j, i + 1) };
            let query: String = text.chars().skip(start).take(end - start).collect();
            if query.trim().is_empty() {
                return None;
            }
            if overlapping_count(&text, &query) != 1 {
                return None;
            }
            Some((text, start, end))
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn replace_then_accept_matches_string_edit(
        (text, start, end) in unique_query(),
        replacement in "[A-Z]{1,8}",
        pieces in 1usize..5,
    ) {
        let query: String = text.chars().skip(start).take(end - start).collect();
        let mut ed = fragmented_editor(&split_chunks(&text, pieces));

        ed.replace(&query, &replacement, 0).unwrap();
        ed.accept_all(None);

        let expected = text.replacen(&query, &replacement, 1);
        prop_assert_eq!(ed.visible_text(), expected);
    }

    #[test]
    fn delete_then_accept_removes_exactly_the_match(
        (text, start, end) in unique_query(),
        pieces in 1usize..5,
    ) {
        let query: String = text.chars().skip(start).take(end - start).collect();
        let mut ed = fragmented_editor(&split_chunks(&text, pieces));

        ed.delete(&query, 0).unwrap();
        ed.accept_all(None);

        let expected = text.replacen(&query, "", 1);
        prop_assert_eq!(ed.visible_text(), expected);
    }

    #[test]
    fn reject_restores_the_original_text(
        (text, start, end) in unique_query(),
        replacement in "[A-Z]{1,8}",
        pieces in 1usize..5,
        op in 0usize..3,
    ) {
        let query: String = text.chars().skip(start).take(end - start).collect();
        let mut ed = fragmented_editor(&split_chunks(&text, pieces));

        match op {
            0 => ed.replace(&query, &replacement, 0).unwrap(),
            1 => ed.delete(&query, 0).unwrap(),
            _ => ed.insert_after(&query, &replacement, 0).unwrap(),
        };
        ed.reject_all(None);

        prop_assert_eq!(ed.visible_text(), text);
    }

    #[test]
    fn insert_after_then_accept_splices_at_the_match_end(
        (text, start, end) in unique_query(),
        inserted in "[A-Z]{1,8}",
        pieces in 1usize..5,
    ) {
        let query: String = text.chars().skip(start).take(end - start).collect();
        let mut ed = fragmented_editor(&split_chunks(&text, pieces));

        ed.insert_after(&query, &inserted, 0).unwrap();
        ed.accept_all(None);

        let byte_end = text
            .char_indices()
            .map(|(i, _)| i)
            .chain([text.len()])
            .nth(end)
            .unwrap();
        let mut expected = text.clone();
        expected.insert_str(byte_end, &inserted);
        prop_assert_eq!(ed.visible_text(), expected);
    }

    #[test]
    fn emitted_ids_stay_unique_and_increasing(
        (text, start, end) in unique_query(),
        replacement in "[A-Z]{1,8}",
        pieces in 1usize..5,
    ) {
        let query: String = text.chars().skip(start).take(end - start).collect();
        let mut ed = fragmented_editor(&split_chunks(&text, pieces));

        ed.replace(&query, &replacement, 0).unwrap();

        let ids: Vec<i32> = ed.list_revisions(None).iter().map(|r| r.id).collect();
        prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }
}
