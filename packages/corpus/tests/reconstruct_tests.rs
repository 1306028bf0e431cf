mod common;

use chrono::Utc;
use pretty_assertions::assert_eq;

use afs_corpus::elements::reindex_elements;
use afs_corpus::reconstruct::{self, Reconstruction};
use afs_corpus::scrapes::{self, record_scrape, NewScrape};
use afs_corpus::structure::ChapterOutline;
use afs_corpus::{sources, CorpusError, ErrorKind};
use afs_harvester::{RegulationCode, StructuralParser};

use common::{afs_2023_1_html, noise_regulation_html, regulation_page, AFS_2023_10_URL, AFS_2023_1_URL};

#[tokio::test]
async fn test_get_section_without_advisory() {
    let db = common::TestDb::new().await;
    let html = regulation_page(
        "Systematiskt arbetsmiljöarbete (AFS 2023:1)",
        r#"<h2 id="2-kap">2 kap. Undersökning</h2>
<div class="paragraph">
  <span class="section-sign">5 §</span>
  <p>Arbetsgivaren ska undersöka arbetsförhållandena.</p>
</div>"#,
    );
    db.ingest(AFS_2023_1_URL, &html).await;

    let section = db.corpus().get_section(2023, 1, Some(2), 5).await.unwrap();

    assert!(section
        .normative_html
        .contains("<p>Arbetsgivaren ska undersöka arbetsförhållandena.</p>"));
    assert_eq!(section.advisory_html, None);
}

#[tokio::test]
async fn test_get_section_with_advisory() {
    let db = common::TestDb::new().await;
    db.ingest(AFS_2023_1_URL, &afs_2023_1_html()).await;

    let section = db.corpus().get_section(2023, 1, Some(2), 5).await.unwrap();

    let normative: Vec<&str> = section.normative_html.lines().collect();
    assert_eq!(normative.len(), 5);
    assert!(normative[0].starts_with("<h2 id=\"2-kap\">"));
    assert_eq!(normative[1], "<span class=\"section-sign\" id=\"K2P5\">5&nbsp;§</span>");
    assert_eq!(
        normative[2],
        "<p>Arbetsgivaren ska <em>regelbundet</em> undersöka arbetsförhållandena.</p>"
    );
    assert_eq!(normative[3], "<li>fysiska förhållanden,</li>");

    let advisory = section.advisory_html.unwrap();
    assert!(advisory.starts_with("<div class=\"general-recommendation\">\n<h4>Allmänna råd</h4>"));
    assert!(advisory.ends_with("</div>"));
    assert_eq!(advisory.matches("skyddsombudet").count(), 2);
}

#[tokio::test]
async fn test_get_section_not_found_names_reference() {
    let db = common::TestDb::new().await;
    db.ingest(AFS_2023_1_URL, &afs_2023_1_html()).await;

    let error = db.corpus().get_section(2023, 1, Some(2), 99).await.unwrap_err();

    assert_eq!(error.kind(), ErrorKind::NotFound);
    assert_eq!(error.http_status(), 404);
    assert_eq!(
        error.to_string(),
        "not found: Section not found: AFS 2023:1, 2 kap., 99 §"
    );
}

#[tokio::test]
async fn test_get_section_requires_chapter_match() {
    let db = common::TestDb::new().await;
    db.ingest(AFS_2023_1_URL, &afs_2023_1_html()).await;

    let result = db.corpus().get_section(2023, 1, None, 5).await;
    assert!(matches!(result, Err(CorpusError::NotFound(_))));
}

#[tokio::test]
async fn test_get_section_validates_identifiers() {
    let db = common::TestDb::new().await;
    let corpus = db.corpus();

    for result in [
        corpus.get_section(1999, 1, None, 1).await,
        corpus.get_section(2023, 0, None, 1).await,
        corpus.get_section(2023, 1, Some(0), 1).await,
        corpus.get_section(2023, 1, None, 0).await,
    ] {
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidInput);
    }
}

#[tokio::test]
async fn test_get_appendix_keeps_alphanumeric_identifier() {
    let db = common::TestDb::new().await;
    db.ingest(AFS_2023_1_URL, &afs_2023_1_html()).await;

    let html = db.corpus().get_appendix(2023, 1, "2a").await.unwrap();

    let lines: Vec<&str> = html.lines().collect();
    assert_eq!(lines.len(), 7);
    assert_eq!(lines[0], "<h2 id=\"bilaga-2a\">Bilaga&nbsp;2A Riskfaktorer</h2>");
    assert_eq!(lines[1], "<th>Faktor</th>");
    assert_eq!(lines[3], "<td>Buller</td>");

    let missing = db.corpus().get_appendix(2023, 1, "3").await.unwrap_err();
    assert_eq!(
        missing.to_string(),
        "not found: Appendix not found: AFS 2023:1, Bilaga 3"
    );

    let blank = db.corpus().get_appendix(2023, 1, " ").await.unwrap_err();
    assert_eq!(blank.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn test_reconstruct_transitional_and_by_element() {
    let db = common::TestDb::new().await;
    let (_, report) = db.ingest(AFS_2023_1_URL, &afs_2023_1_html()).await;

    let html = reconstruct::reconstruct_transitional(&db.pool, report.index.scrape_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        html,
        "<h2 id=\"overgangsbestammelser\">Övergångsbestämmelser</h2>\n<p>Denna författning träder i kraft den 1 januari 2025.</p>"
    );

    let elements = afs_corpus::elements::current_elements(&db.pool, report.index.scrape_id)
        .await
        .unwrap();
    let td = elements.iter().find(|e| e.text_content == "Buller").unwrap();
    let li = elements
        .iter()
        .find(|e| e.text_content == "fysiska förhållanden,")
        .unwrap();
    let preamble = elements
        .iter()
        .find(|e| e.text_content.starts_with("Arbetsmiljöverket föreskriver"))
        .unwrap();

    match reconstruct::reconstruct_for_element(&db.pool, td).await.unwrap() {
        Some(Reconstruction::Appendix(html)) => assert!(html.contains("<td>Maskiner</td>")),
        other => panic!("expected appendix, got {other:?}"),
    }
    match reconstruct::reconstruct_for_element(&db.pool, li).await.unwrap() {
        Some(Reconstruction::Section(section)) => assert!(section.advisory_html.is_some()),
        other => panic!("expected section, got {other:?}"),
    }
    assert_eq!(
        reconstruct::reconstruct_for_element(&db.pool, preamble).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn test_reconstruction_order_ignores_insertion_order() {
    let db = common::TestDb::new().await;
    let html = afs_2023_1_html();
    let output = StructuralParser::default().parse(AFS_2023_1_URL, &html);
    let regulation = RegulationCode::new(2023, 1).unwrap();

    let source = sources::create_source(&db.pool, AFS_2023_1_URL, None).await.unwrap();
    let scrape = record_scrape(&db.pool, NewScrape::new(source.id, AFS_2023_1_URL, html.clone(), Utc::now()))
        .await
        .unwrap()
        .scrape;

    reindex_elements(&db.pool, &scrape, &output.elements).await.unwrap();
    let in_order = reconstruct::reconstruct_section(&db.pool, regulation, Some(2), 5)
        .await
        .unwrap()
        .unwrap();

    let mut reversed = output.elements.clone();
    reversed.reverse();
    reindex_elements(&db.pool, &scrape, &reversed).await.unwrap();
    let from_reversed = reconstruct::reconstruct_section(&db.pool, regulation, Some(2), 5)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(from_reversed, in_order);
}

#[tokio::test]
async fn test_historical_scrapes_are_not_reconstructed() {
    let db = common::TestDb::new().await;
    let (source, _) = db.ingest(AFS_2023_1_URL, &afs_2023_1_html()).await;

    let revised = afs_2023_1_html().replace(
        "Arbetsgivaren ska bedöma riskerna.",
        "Arbetsgivaren ska bedöma och åtgärda riskerna.",
    );
    db.corpus().ingest(source.id, revised, Utc::now()).await.unwrap();

    let section = db.corpus().get_section(2023, 1, Some(2), 6).await.unwrap();
    assert!(section.normative_html.contains("bedöma och åtgärda riskerna"));
    assert!(!section.normative_html.contains("<p>Arbetsgivaren ska bedöma riskerna.</p>"));

    let versions = scrapes::scrape_versions(&db.pool, source.id, AFS_2023_1_URL)
        .await
        .unwrap();
    assert_eq!(versions.len(), 2);
}

#[tokio::test]
async fn test_structure_and_listing() {
    let db = common::TestDb::new().await;
    db.ingest(AFS_2023_10_URL, &noise_regulation_html()).await;
    db.ingest(AFS_2023_1_URL, &afs_2023_1_html()).await;

    let regulations = db.corpus().list_regulations().await.unwrap();
    let codes: Vec<&str> = regulations.iter().map(|r| r.code.as_str()).collect();
    assert_eq!(codes, vec!["AFS 2023:1", "AFS 2023:10"]);
    assert_eq!(regulations[1].title.as_deref(), Some("Buller (AFS 2023:10)"));

    let structure = db.corpus().get_structure(2023, 1).await.unwrap();
    assert_eq!(
        structure.chapters,
        vec![
            ChapterOutline {
                chapter: 1,
                sections: vec![1, 2],
            },
            ChapterOutline {
                chapter: 2,
                sections: vec![5, 6],
            },
        ]
    );
    assert!(structure.sections_without_chapter.is_empty());
    assert_eq!(structure.appendices, vec!["2A".to_string()]);

    let missing = db.corpus().get_structure(2024, 3).await.unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_section_preview() {
    let db = common::TestDb::new().await;
    db.ingest(AFS_2023_1_URL, &afs_2023_1_html()).await;

    let preview = db.corpus().section_preview(2023, 1, None).await.unwrap();
    assert_eq!(
        preview.as_deref(),
        Some("1 § Dessa föreskrifter innehåller grundläggande bestämmelser om det systematiska arbetsmiljöarbetet.")
    );

    let preview = db.corpus().section_preview(2023, 1, Some(6)).await.unwrap();
    assert_eq!(preview.as_deref(), Some("6 § Arbetsgivaren ska bedöma riskerna."));

    assert_eq!(db.corpus().section_preview(2023, 1, Some(40)).await.unwrap(), None);
}
