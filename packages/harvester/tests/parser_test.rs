//! End-to-end tests for the structural parser.
//!
//! Runs both selection policies over a complete AFS 2023:1 page fixture.

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;

use afs_harvester::{
    DocumentMetadata, Hierarchy, ParsePolicy, ParsedElement, Scope, StructuralParser,
};

const URL: &str =
    "https://www.av.se/arbetsmiljoarbete-och-inspektioner/publikationer/foreskrifter/afs-20231/";

/// Load fixture file content.
fn load_fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to load {}: {}", path.display(), e))
}

fn parse(policy: ParsePolicy) -> Vec<ParsedElement> {
    let html = load_fixture("afs-20231.html");
    let output = StructuralParser::new(policy).parse(URL, &html);
    assert!(output.warnings.is_empty(), "warnings: {:?}", output.warnings);
    output.elements
}

fn texts_in(elements: &[ParsedElement], hierarchy: &Hierarchy) -> Vec<String> {
    elements
        .iter()
        .filter(|e| &e.hierarchy == hierarchy)
        .map(|e| e.text_content.clone())
        .collect()
}

#[test]
fn test_fine_grained_element_count_and_regulation() {
    let html = load_fixture("afs-20231.html");
    let output = StructuralParser::default().parse(URL, &html);

    assert_eq!(output.regulation.unwrap().to_string(), "AFS 2023:1");
    assert_eq!(output.elements.len(), 27);
    assert!(output
        .elements
        .iter()
        .all(|e| e.regulation == output.regulation));
}

#[test]
fn test_section_content_is_classified() {
    let elements = parse(ParsePolicy::FineGrained);

    assert_eq!(
        texts_in(&elements, &Hierarchy::section(Some(2), Some(5))),
        vec![
            "2 kap. Undersökning och riskbedömning",
            "5 §",
            "Arbetsgivaren ska regelbundet undersöka arbetsförhållandena.",
            "fysiska förhållanden,",
            "organisatoriska och sociala förhållanden.",
        ]
    );
    assert_eq!(
        texts_in(&elements, &Hierarchy::section(Some(1), Some(2))),
        vec![
            "2 §",
            "Föreskrifterna gäller för arbetsgivare.",
            "Föreskrifterna gäller också för den som enligt 3 kap. arbetsmiljölagen har ansvar.",
        ]
    );
}

#[test]
fn test_preamble_is_root_content() {
    let elements = parse(ParsePolicy::FineGrained);
    let first = &elements[0];

    assert_eq!(first.tag_name, "p");
    assert_eq!(first.hierarchy, Hierarchy::root());
    assert!(first.text_content.starts_with("Arbetsmiljöverket föreskriver"));
}

#[test]
fn test_general_recommendations_keep_their_section() {
    let elements = parse(ParsePolicy::FineGrained);
    let advisory: Vec<&ParsedElement> = elements
        .iter()
        .filter(|e| e.hierarchy.is_general_recommendation)
        .collect();

    assert_eq!(advisory.len(), 3);
    for element in advisory {
        assert_eq!(element.hierarchy.chapter(), Some(2));
        assert_eq!(element.hierarchy.section_number(), Some(5));
    }
}

#[test]
fn test_appendix_identifier_keeps_suffix() {
    let elements = parse(ParsePolicy::FineGrained);

    assert_eq!(
        texts_in(&elements, &Hierarchy::appendix("2A")),
        vec![
            "Bilaga 2A Riskfaktorer",
            "Faktor",
            "Exempel",
            "Buller",
            "Maskiner",
            "Vibrationer",
            "Handhållna verktyg",
        ]
    );
}

#[test]
fn test_transitional_provisions() {
    let elements = parse(ParsePolicy::FineGrained);
    assert_eq!(
        texts_in(&elements, &Hierarchy::transitional()),
        vec![
            "Övergångsbestämmelser",
            "Denna författning träder i kraft den 1 januari 2025."
        ]
    );
}

#[test]
fn test_boundary_exclusivity() {
    for policy in [ParsePolicy::FineGrained, ParsePolicy::BoundaryWalk] {
        for element in parse(policy) {
            let h = &element.hierarchy;
            if h.is_transitional() {
                assert_eq!((h.chapter(), h.section_number(), h.appendix_id()), (None, None, None));
            }
            if h.appendix_id().is_some() {
                assert_eq!((h.chapter(), h.section_number()), (None, None));
            }
        }
    }
}

#[test]
fn test_hidden_and_non_content_nodes_skipped() {
    let elements = parse(ParsePolicy::FineGrained);
    for element in &elements {
        assert!(!element.text_content.contains("Intern anteckning"));
        assert!(!element.text_content.contains("trackProvision"));
        assert_ne!(element.text_content, "Start");
        assert_ne!(element.text_content, "Arbetsmiljöverket");
    }
}

#[test]
fn test_parse_is_idempotent() {
    for policy in [ParsePolicy::FineGrained, ParsePolicy::BoundaryWalk] {
        let first = parse(policy);
        let second = parse(policy);
        assert_eq!(first, second, "policy {policy}");
    }
}

#[test]
fn test_positions_strictly_increase() {
    for policy in [ParsePolicy::FineGrained, ParsePolicy::BoundaryWalk] {
        let elements = parse(policy);
        assert!(elements
            .windows(2)
            .all(|w| w[0].position_in_parent < w[1].position_in_parent));
    }
}

#[test]
fn test_snippets_are_verbatim_outer_html() {
    let elements = parse(ParsePolicy::FineGrained);
    let paragraph = elements
        .iter()
        .find(|e| e.text_content.starts_with("Arbetsgivaren ska regelbundet"))
        .unwrap();

    assert_eq!(
        paragraph.html_snippet,
        "<p>Arbetsgivaren ska <em>regelbundet</em> undersöka arbetsförhållandena.</p>"
    );
    assert_eq!(paragraph.css_path, "div.provision > div.paragraph > p");
}

#[test]
fn test_boundary_walk_policy() {
    let elements = parse(ParsePolicy::BoundaryWalk);

    assert_eq!(
        texts_in(&elements, &Hierarchy::section(Some(2), Some(5))),
        vec![
            "5 §",
            "Arbetsgivaren ska regelbundet undersöka arbetsförhållandena.",
            "fysiska förhållanden,",
            "organisatoriska och sociala förhållanden.",
        ]
    );
    assert_eq!(
        texts_in(
            &elements,
            &Hierarchy::section(Some(2), Some(5)).with_general_recommendation(true)
        ),
        vec![
            "Allmänna råd",
            "Undersökningen bör göras tillsammans med skyddsombudet.",
            "Undersökningen bör göras tillsammans med skyddsombudet.",
        ]
    );
    // Chapter headings are not part of any span
    assert!(elements
        .iter()
        .all(|e| !e.text_content.starts_with("1 kap.")));
    assert!(elements
        .iter()
        .any(|e| matches!(&e.hierarchy.scope, Scope::Appendix { appendix } if appendix == "2A")));
}

#[test]
fn test_document_metadata() {
    let html = load_fixture("afs-20231.html");
    let metadata = DocumentMetadata::extract(URL, &html);

    assert_eq!(
        metadata.title.as_deref(),
        Some("Systematiskt arbetsmiljöarbete – grundläggande skyldigheter för dig med arbetsgivaransvar (AFS 2023:1)")
    );
    assert_eq!(metadata.stats.section_count, 4);
    assert_eq!(metadata.stats.general_recommendation_count, 1);
    assert_eq!(metadata.stats.appendix_count, 1);
    assert!(!metadata.plain_text.contains("Intern anteckning"));
}

const ZERO_MARKERS: &str = r#"<html><body><div class="provision">
  <h2>0 kap. Inledande</h2>
  <span class="section-sign">0 §</span>
  <p>Text A.</p>
  <h2>1 kap. Allmänt</h2>
  <span class="section-sign">1 §</span>
  <p>Text B.</p>
</div></body></html>"#;

#[test]
fn test_zero_markers_are_skipped_with_warnings() {
    for policy in [ParsePolicy::FineGrained, ParsePolicy::BoundaryWalk] {
        let output = StructuralParser::new(policy).parse(URL, ZERO_MARKERS);

        assert_eq!(output.warnings.len(), 2, "{policy}: {:?}", output.warnings);
        assert!(output.elements.iter().all(|e| {
            e.hierarchy.chapter().map_or(true, |c| c > 0)
                && e.hierarchy.section_number().map_or(true, |s| s > 0)
        }));

        let text_b = output
            .elements
            .iter()
            .find(|e| e.text_content == "Text B.")
            .unwrap();
        assert_eq!(text_b.hierarchy, Hierarchy::section(Some(1), Some(1)));
    }

    let output = StructuralParser::new(ParsePolicy::FineGrained).parse(URL, ZERO_MARKERS);
    let text_a = output
        .elements
        .iter()
        .find(|e| e.text_content == "Text A.")
        .unwrap();
    assert_eq!(text_a.hierarchy, Hierarchy::root());
}
