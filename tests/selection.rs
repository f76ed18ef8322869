use bibxml_tools::archive::ArchivePath;
use bibxml_tools::selection;
use std::collections::BTreeSet;
use std::path::PathBuf;

fn paths(n: usize) -> Vec<ArchivePath> {
    (0..n)
        .map(|i| ArchivePath {
            dirname: "bibxml4".into(),
            basename: format!("rfc{i}.xml"),
            source: PathBuf::from(format!("archive/bibxml4/rfc{i}.xml")),
            alias_of: None,
        })
        .collect()
}

#[test]
fn default_selection_is_identity() {
    let input = paths(4);
    let selected = selection::apply(input.clone(), false, None);
    assert_eq!(selected, input);
}

#[test]
fn continue_at_drops_exactly_the_prefix() {
    let input = paths(5);
    let selected = selection::apply(input.clone(), false, Some(2));
    assert_eq!(selected, input[2..]);
    // Index 2 is processed, index 1 is not: no reprocessing, no skipping.
    assert_eq!(selected[0].basename, "rfc2.xml");
}

#[test]
fn continue_at_past_the_end_selects_nothing() {
    let selected = selection::apply(paths(3), false, Some(3));
    assert!(selected.is_empty());
}

#[test]
fn randomized_selection_is_a_permutation() {
    let input = paths(20);
    let selected = selection::apply(input.clone(), true, None);

    assert_eq!(selected.len(), input.len());
    let original: BTreeSet<String> = input.iter().map(|p| p.basename.clone()).collect();
    let shuffled: BTreeSet<String> = selected.iter().map(|p| p.basename.clone()).collect();
    assert_eq!(original, shuffled);
}

#[test]
fn resume_requires_plain_single_dirname_run() {
    // Valid: one dirname, no aliases, no randomization.
    selection::check_resume_compatibility(Some(5), 1, false, false).expect("valid combination");
    // No resume requested: anything goes.
    selection::check_resume_compatibility(None, 3, true, true).expect("no resume");

    let randomized = selection::check_resume_compatibility(Some(5), 1, false, true)
        .expect_err("randomize must be rejected");
    assert!(format!("{randomized}").contains("configuration error"));

    let aliased = selection::check_resume_compatibility(Some(5), 1, true, false)
        .expect_err("aliases must be rejected");
    assert!(format!("{aliased}").contains("configuration error"));

    let multi = selection::check_resume_compatibility(Some(5), 2, false, false)
        .expect_err("multiple dirnames must be rejected");
    assert!(format!("{multi}").contains("exactly one"));
}
