use pretty_assertions::assert_eq;
use trackedit_core::wml::RevisionKind;
use trackedit_core::{EditError, RevisionEditor, RevisionSettings};

const NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#;

fn editor(body: &str) -> RevisionEditor {
    let xml = format!(r#"<w:document {NS}><w:body>{body}</w:body></w:document>"#);
    RevisionEditor::parse(&xml, RevisionSettings::for_author("Test Author")).unwrap()
}

fn raw(ed: &RevisionEditor) -> String {
    trackedit_core::xml::builder::serialize(ed.tree()).unwrap()
}

#[test]
fn simple_replace_emits_deletion_and_insertion() {
    let mut ed = editor("<w:p><w:r><w:t>the quick brown fox</w:t></w:r></w:p>");

    let ins_id = ed.replace("quick brown fox", "slow red cat", 0).unwrap();
    assert!(ins_id > 0);

    assert_eq!(ed.visible_text(), "the slow red cat");
    let xml = raw(&ed);
    assert!(xml.contains("<w:delText>quick brown fox</w:delText>"));

    let revs = ed.list_revisions(None);
    assert_eq!(revs.len(), 2);
    assert_eq!(revs[0].kind, RevisionKind::Deletion);
    assert_eq!(revs[1].kind, RevisionKind::Insertion);
    assert_eq!(revs[1].id, revs[0].id + 1);
    assert_eq!(revs[1].id, ins_id);
    assert!(revs.iter().all(|r| r.author == "Test Author"));

    assert_eq!(ed.accept_all(None), 2);
    assert_eq!(ed.visible_text(), "the slow red cat");
}

#[test]
fn simple_replace_rejects_back_to_original() {
    let mut ed = editor("<w:p><w:r><w:t>the quick brown fox</w:t></w:r></w:p>");
    ed.replace("quick brown fox", "slow red cat", 0).unwrap();

    assert_eq!(ed.reject_all(None), 2);
    assert_eq!(ed.visible_text(), "the quick brown fox");
}

#[test]
fn replace_consuming_whole_insertion_keeps_a_wrapper() {
    let mut ed = editor(
        "<w:p><w:ins w:id=\"1\" w:author=\"A\" w:date=\"2024-01-01T00:00:00Z\">\
         <w:r><w:t>AB</w:t></w:r><w:r><w:t>CD</w:t></w:r></w:ins></w:p>",
    );

    let id = ed.replace("ABCD", "NEW", 0).unwrap();
    assert!(id > 1);

    assert_eq!(ed.visible_text(), "NEW");
    let revs = ed.list_revisions(None);
    assert_eq!(revs.len(), 1);
    assert_eq!(revs[0].kind, RevisionKind::Insertion);
    assert_eq!(revs[0].text, "NEW");
    assert_eq!(revs[0].author, "Test Author");
    assert!(!raw(&ed).contains("delText"));
}

#[test]
fn cross_run_delete_preserves_siblings() {
    let mut ed = editor(
        "<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>keep</w:t><w:t>MATCH1</w:t></w:r>\
         <w:r><w:rPr><w:b/></w:rPr><w:t>MATCH2</w:t></w:r></w:p>",
    );

    let del_id = ed.delete("MATCH1MATCH2", 0).unwrap();
    assert!(del_id > 0);

    assert_eq!(ed.visible_text(), "keep");
    let xml = raw(&ed);
    assert!(xml.contains("<w:delText>MATCH1</w:delText>"));
    assert!(xml.contains("<w:delText>MATCH2</w:delText>"));

    assert_eq!(ed.accept_all(None), 2);
    assert_eq!(ed.visible_text(), "keep");
    // The surviving run still carries its property block.
    assert!(raw(&ed).contains("<w:b/>"));
}

#[test]
fn mixed_state_delete_carves_insertion_and_wraps_the_rest() {
    let mut ed = editor(
        "<w:p><w:r><w:t>xx</w:t></w:r>\
         <w:ins w:id=\"1\" w:author=\"A\" w:date=\"2024-01-01T00:00:00Z\"><w:r><w:t>yy</w:t></w:r></w:ins>\
         <w:r><w:t>zz</w:t></w:r></w:p>",
    );

    let del_id = ed.delete("xxyyzz", 0).unwrap();
    assert!(del_id > 1);

    assert_eq!(ed.visible_text(), "");
    let xml = raw(&ed);
    assert!(!xml.contains(">yy<"));
    assert!(xml.contains("<w:delText>xx</w:delText>"));
    assert!(xml.contains("<w:delText>zz</w:delText>"));

    let revs = ed.list_revisions(None);
    assert_eq!(revs.len(), 2);
    assert!(revs.iter().all(|r| r.kind == RevisionKind::Deletion));

    // The carved insertion content is gone from the tree, so rejecting
    // the deletions brings back only the plain text around it.
    assert_eq!(ed.reject_all(None), 2);
    assert_eq!(ed.visible_text(), "xxzz");
}

#[test]
fn insert_after_in_multi_span_run_splices_inline() {
    let mut ed = editor("<w:p><w:r><w:t>Hello</w:t><w:t xml:space=\"preserve\"> world</w:t></w:r></w:p>");

    let id = ed.insert_after("Hello", " INSERTED", 0).unwrap();
    assert!(id > 0);

    assert_eq!(ed.visible_text(), "Hello INSERTED world");
    let xml = raw(&ed);
    // The sibling span survives untouched, the new text is enveloped.
    assert!(xml.contains(r#"<w:t xml:space="preserve"> world</w:t>"#));
    assert!(xml.contains(r#"<w:t xml:space="preserve"> INSERTED</w:t>"#));

    let revs = ed.list_revisions(None);
    assert_eq!(revs.len(), 1);
    assert_eq!(revs[0].kind, RevisionKind::Insertion);
    assert_eq!(revs[0].text, " INSERTED");
}

#[test]
fn accept_then_reject_all_is_stable() {
    let mut ed = editor("<w:p><w:r><w:t>the quick brown fox</w:t></w:r></w:p>");
    ed.replace("quick brown fox", "slow red cat", 0).unwrap();

    assert_eq!(ed.accept_all(None), 2);
    let settled = ed.visible_text();
    assert_eq!(ed.reject_all(None), 0);
    assert_eq!(ed.visible_text(), settled);
}

// ----- boundary behaviors -----

#[test]
fn delete_at_run_start_emits_no_empty_run() {
    let mut ed = editor("<w:p><w:r><w:t>abcdef</w:t></w:r></w:p>");
    ed.delete("abc", 0).unwrap();

    assert_eq!(ed.visible_text(), "def");
    let xml = raw(&ed);
    assert!(!xml.contains("<w:t></w:t>"));
    assert!(!xml.contains("<w:t/>"));
}

#[test]
fn delete_at_run_end_emits_no_empty_run() {
    let mut ed = editor("<w:p><w:r><w:t>abcdef</w:t></w:r></w:p>");
    ed.delete("def", 0).unwrap();

    assert_eq!(ed.visible_text(), "abc");
    let xml = raw(&ed);
    assert!(!xml.contains("<w:t></w:t>"));
    assert!(!xml.contains("<w:t/>"));
}

#[test]
fn delete_of_exact_span_wraps_it_whole() {
    let mut ed = editor("<w:p><w:r><w:t>ABCD</w:t></w:r></w:p>");
    let id = ed.delete("ABCD", 0).unwrap();
    assert!(id > 0);

    assert_eq!(ed.visible_text(), "");
    assert_eq!(ed.reject_all(None), 1);
    assert_eq!(ed.visible_text(), "ABCD");
}

#[test]
fn delete_spanning_four_spans_keeps_outer_remnants() {
    let mut ed = editor(
        "<w:p><w:r><w:t>ab</w:t></w:r><w:r><w:t>cd</w:t></w:r>\
         <w:r><w:t>ef</w:t></w:r><w:r><w:t>gh</w:t></w:r></w:p>",
    );

    ed.delete("bcdefg", 0).unwrap();
    assert_eq!(ed.visible_text(), "ah");

    assert_eq!(ed.reject_all(None), 4);
    assert_eq!(ed.visible_text(), "abcdefgh");
}

#[test]
fn replace_across_insertion_boundary_lands_after_deletions() {
    let mut ed = editor(
        "<w:p><w:r><w:t>ab</w:t></w:r>\
         <w:ins w:id=\"1\" w:author=\"A\" w:date=\"2024-01-01T00:00:00Z\"><w:r><w:t>cd</w:t></w:r></w:ins></w:p>",
    );

    let id = ed.replace("abcd", "X", 0).unwrap();
    assert!(id > 1);

    assert_eq!(ed.visible_text(), "X");
    let xml = raw(&ed);
    let del_at = xml.find("<w:del ").unwrap();
    let ins_at = xml.find("<w:ins ").unwrap();
    assert!(del_at < ins_at);

    ed.accept_all(None);
    assert_eq!(ed.visible_text(), "X");
}

#[test]
fn mixed_replace_with_partial_insertion_head() {
    let mut ed = editor(
        "<w:p><w:ins w:id=\"1\" w:author=\"A\" w:date=\"2024-01-01T00:00:00Z\"><w:r><w:t>Xaa</w:t></w:r></w:ins>\
         <w:r><w:t>bb</w:t></w:r></w:p>",
    );

    let id = ed.replace("aabb", "N", 0).unwrap();
    assert!(id > 1);

    assert_eq!(ed.visible_text(), "XN");
    ed.accept_all(None);
    assert_eq!(ed.visible_text(), "XN");
}

#[test]
fn accepting_insertion_with_no_visible_text_succeeds() {
    let mut ed = editor("<w:p><w:ins w:id=\"5\" w:author=\"A\"/></w:p>");
    assert!(ed.accept(5));
    assert_eq!(ed.visible_text(), "");
}

#[test]
fn nth_occurrence_beyond_matches_is_not_found() {
    let mut ed = editor("<w:p><w:r><w:t>one two one</w:t></w:r></w:p>");
    assert!(matches!(
        ed.replace("one", "1", 2),
        Err(EditError::TextNotFound { occurrence: 2, .. })
    ));
    assert!(ed.replace("one", "1", 1).is_ok());
    assert_eq!(ed.visible_text(), "one two 1");
}

// ----- edits inside existing insertion envelopes -----

#[test]
fn replace_inside_insertion_edits_in_place() {
    let mut ed = editor(
        "<w:p><w:ins w:id=\"1\" w:author=\"A\" w:date=\"2024-01-01T00:00:00Z\"><w:r><w:t>ABCD</w:t></w:r></w:ins></w:p>",
    );

    let id = ed.replace("BC", "X", 0).unwrap();
    assert_eq!(id, -1);

    assert_eq!(ed.visible_text(), "AXD");
    let revs = ed.list_revisions(None);
    assert_eq!(revs.len(), 1);
    assert_eq!(revs[0].id, 1);
    assert_eq!(revs[0].author, "A");
    assert!(!raw(&ed).contains("delText"));
}

#[test]
fn delete_inside_insertion_consuming_it_removes_the_envelope() {
    let mut ed = editor(
        "<w:p><w:r><w:t>before</w:t></w:r>\
         <w:ins w:id=\"1\" w:author=\"A\"><w:r><w:t>ABCD</w:t></w:r></w:ins></w:p>",
    );

    let id = ed.delete("ABCD", 0).unwrap();
    assert_eq!(id, -1);

    assert_eq!(ed.visible_text(), "before");
    assert!(ed.list_revisions(None).is_empty());
}

#[test]
fn partial_replace_in_insertion_keeps_attribution() {
    let mut ed = editor(
        "<w:p><w:ins w:id=\"1\" w:author=\"A\" w:date=\"2024-01-01T00:00:00Z\">\
         <w:r><w:t>AB</w:t></w:r><w:r><w:t>CD</w:t></w:r></w:ins></w:p>",
    );

    let id = ed.replace("BC", "X", 0).unwrap();
    assert_eq!(id, -1);

    assert_eq!(ed.visible_text(), "AXD");
    let revs = ed.list_revisions(None);
    assert_eq!(revs.len(), 1);
    assert_eq!(revs[0].author, "A");
    assert!(!raw(&ed).contains("delText"));
}

#[test]
fn partial_carve_lands_after_leading_sibling_span() {
    let mut ed = editor(
        "<w:p><w:ins w:id=\"1\" w:author=\"A\" w:date=\"2024-01-01T00:00:00Z\">\
         <w:r><w:t>pre</w:t><w:t>AB</w:t></w:r><w:r><w:t>CD</w:t></w:r></w:ins></w:p>",
    );

    let id = ed.replace("ABCD", "NEW", 0).unwrap();
    assert_eq!(id, -1);
    assert_eq!(ed.visible_text(), "preNEW");
}

#[test]
fn partial_carve_lands_before_trailing_sibling_span() {
    let mut ed = editor(
        "<w:p><w:ins w:id=\"1\" w:author=\"A\" w:date=\"2024-01-01T00:00:00Z\">\
         <w:r><w:t>xAB</w:t><w:t>CD</w:t><w:t>tail</w:t></w:r></w:ins></w:p>",
    );

    let id = ed.replace("ABCD", "NEW", 0).unwrap();
    assert_eq!(id, -1);
    assert_eq!(ed.visible_text(), "xNEWtail");
}

#[test]
fn multi_span_carve_in_insertion_preserves_sibling() {
    let mut ed = editor(
        "<w:p><w:ins w:id=\"1\" w:author=\"A\" w:date=\"2024-01-01T00:00:00Z\">\
         <w:r><w:t>REMOVE</w:t></w:r>\
         <w:r><w:t>ALSO</w:t><w:t>KEEP</w:t></w:r>\
         </w:ins></w:p>",
    );

    let id = ed.delete("REMOVEALSO", 0).unwrap();
    assert_eq!(id, -1);

    assert_eq!(ed.visible_text(), "KEEP");
    let revs = ed.list_revisions(None);
    assert_eq!(revs.len(), 1);
    assert_eq!(revs[0].text, "KEEP");
}

#[test]
fn truncated_insertion_spans_get_preserve_flag() {
    let mut ed = editor(
        "<w:p><w:ins w:id=\"1\" w:author=\"A\" w:date=\"2024-01-01T00:00:00Z\">\
         <w:r><w:t>xxAB</w:t></w:r>\
         <w:r><w:t>CDyy</w:t></w:r>\
         </w:ins></w:p>",
    );

    ed.delete("ABCD", 0).unwrap();
    assert_eq!(ed.visible_text(), "xxyy");

    let xml = raw(&ed);
    assert!(xml.contains(r#"<w:t xml:space="preserve">xx</w:t>"#));
    assert!(xml.contains(r#"<w:t xml:space="preserve">yy</w:t>"#));
}

#[test]
fn middle_split_in_insertion_spawns_sibling_envelope() {
    let mut ed = editor(
        "<w:p><w:ins w:id=\"1\" w:author=\"A\" w:date=\"2024-01-01T00:00:00Z\">\
         <w:r><w:t>ABCDEF</w:t><w:t>GH</w:t></w:r></w:ins></w:p>",
    );

    let id = ed.delete("CD", 0).unwrap();
    assert_eq!(id, -1);

    assert_eq!(ed.visible_text(), "ABGHEF");
    let revs = ed.list_revisions(None);
    assert_eq!(revs.len(), 2);
    // The tail envelope keeps the original author under a fresh id.
    assert_eq!(revs[1].author, "A");
    assert!(revs[1].id > 1);
    assert_eq!(revs[1].text, "EF");
}

#[test]
fn insert_inside_insertion_emits_bare_run() {
    let mut ed = editor(
        "<w:p><w:ins w:id=\"1\" w:author=\"A\" w:date=\"2024-01-01T00:00:00Z\"><w:r><w:t>ABCD</w:t></w:r></w:ins></w:p>",
    );

    let id = ed.insert_after("ABCD", "-tail", 0).unwrap();
    assert_eq!(id, -1);

    assert_eq!(ed.visible_text(), "ABCD-tail");
    let revs = ed.list_revisions(None);
    assert_eq!(revs.len(), 1);
    assert_eq!(revs[0].text, "ABCD-tail");
}

#[test]
fn insert_inside_insertion_splits_at_the_anchor() {
    let mut ed = editor(
        "<w:p><w:ins w:id=\"1\" w:author=\"A\" w:date=\"2024-01-01T00:00:00Z\"><w:r><w:t>ABCD</w:t></w:r></w:ins></w:p>",
    );

    let id = ed.insert_after("AB", "-", 0).unwrap();
    assert_eq!(id, -1);

    assert_eq!(ed.visible_text(), "AB-CD");
    let revs = ed.list_revisions(None);
    assert_eq!(revs.len(), 1);
    assert_eq!(revs[0].text, "AB-CD");
}

#[test]
fn insert_before_mid_anchor_inside_insertion() {
    let mut ed = editor(
        "<w:p><w:ins w:id=\"1\" w:author=\"A\" w:date=\"2024-01-01T00:00:00Z\"><w:r><w:t>Hello world</w:t></w:r></w:ins></w:p>",
    );

    let id = ed.insert_before("world", "brave ", 0).unwrap();
    assert_eq!(id, -1);

    assert_eq!(ed.visible_text(), "Hello brave world");
    // Everything stays inside the one original envelope.
    let revs = ed.list_revisions(None);
    assert_eq!(revs.len(), 1);
    assert_eq!(revs[0].id, 1);
    assert_eq!(revs[0].text, "Hello brave world");
}

// ----- run property and attribute fidelity -----

#[test]
fn replace_reproduces_property_block_on_every_run() {
    let mut ed = editor(
        "<w:p><w:r><w:rPr><w:b/><w:i/></w:rPr><w:t>one two three</w:t></w:r></w:p>",
    );

    ed.replace("two", "2", 0).unwrap();
    let xml = raw(&ed);
    // before-run, deletion run, insertion run, after-run
    assert_eq!(xml.matches("<w:b/><w:i/>").count(), 4);
}

#[test]
fn deletion_flips_run_revision_attribute_and_reject_restores_it() {
    let mut ed = editor("<w:p><w:r w:rsidR=\"00AB12CD\"><w:t>target</w:t></w:r></w:p>");

    ed.delete("target", 0).unwrap();
    let xml = raw(&ed);
    assert!(xml.contains(r#"w:rsidDel="00AB12CD""#));

    ed.reject_all(None);
    let xml = raw(&ed);
    assert!(xml.contains(r#"w:rsidR="00AB12CD""#));
    assert!(!xml.contains("rsidDel"));
    assert_eq!(ed.visible_text(), "target");
}

#[test]
fn split_remnants_with_boundary_whitespace_are_preserved() {
    let mut ed = editor("<w:p><w:r><w:t>the quick fox</w:t></w:r></w:p>");

    ed.replace("quick", "fast", 0).unwrap();
    let xml = raw(&ed);
    assert!(xml.contains(r#"<w:t xml:space="preserve">the </w:t>"#));
    assert!(xml.contains(r#"<w:t xml:space="preserve"> fox</w:t>"#));
    assert_eq!(ed.visible_text(), "the fast fox");
}

#[test]
fn emitted_ids_are_unique_and_increasing() {
    let mut ed = editor(
        "<w:p><w:r><w:t>alpha beta gamma delta</w:t></w:r></w:p>",
    );

    let a = ed.replace("alpha", "A", 0).unwrap();
    let b = ed.delete("beta", 0).unwrap();
    let c = ed.insert_after("gamma", "!", 0).unwrap();
    assert!(a < b && b < c);

    let ids: Vec<i32> = ed.list_revisions(None).iter().map(|r| r.id).collect();
    let mut deduped = ids.clone();
    deduped.dedup();
    assert_eq!(ids, deduped);
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn insert_before_splits_the_anchor_run() {
    let mut ed = editor("<w:p><w:r><w:t>Hello world</w:t></w:r></w:p>");

    let id = ed.insert_before("world", "brave ", 0).unwrap();
    assert!(id > 0);
    assert_eq!(ed.visible_text(), "Hello brave world");

    ed.reject_all(None);
    assert_eq!(ed.visible_text(), "Hello world");
}

#[test]
fn author_filter_applies_to_bulk_operations() {
    let mut ed = editor(
        "<w:p><w:ins w:id=\"1\" w:author=\"Other\" w:date=\"2024-01-01T00:00:00Z\"><w:r><w:t>keep</w:t></w:r></w:ins>\
         <w:r><w:t> mine</w:t></w:r></w:p>",
    );

    ed.delete(" mine", 0).unwrap();
    assert_eq!(ed.reject_all(Some("Test Author")), 1);

    assert_eq!(ed.visible_text(), "keep mine");
    let revs = ed.list_revisions(None);
    assert_eq!(revs.len(), 1);
    assert_eq!(revs[0].author, "Other");
}
