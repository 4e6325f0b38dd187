use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lectern::capability::{Diagrammer, Typesetter};
use lectern::error::Result;
use lectern::page::{FailureKind, Outcome, Report};
use lectern::{Capabilities, DocumentRef, Fetcher, HostPage, PageRenderer, Target};

static_assertions::assert_impl_all!(Target: Send, Sync, Clone);
static_assertions::assert_impl_all!(Capabilities: Send, Sync, Clone);

fn fixture(name: &str, contents: &str) -> (Fetcher, DocumentRef) {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    let dir = std::env::temp_dir().join(format!(
        "lectern-test-{}-{}",
        std::process::id(),
        NEXT.fetch_add(1, Ordering::Relaxed),
    ));

    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(name), contents).unwrap();
    (Fetcher::new(dir), DocumentRef::from(name))
}

fn render(contents: &str, capabilities: Capabilities) -> (HostPage, Outcome) {
    let (fetcher, document) = fixture("doc.md", contents);
    let page = HostPage {
        document: Some(document),
        content: Some(Target::new()),
        navigation: Some(Target::new()),
    };

    let outcome = PageRenderer::new(fetcher, capabilities).render(&page);
    (page, outcome)
}

fn report(outcome: Outcome) -> Report {
    match outcome {
        Outcome::Rendered(report) => report,
        other => panic!("expected a rendered outcome, got {other:?}"),
    }
}

#[test]
fn identical_heading_texts_get_pairwise_distinct_hrefs() {
    let doc = "# Title\n\n## Title\n\n### Title\n";
    let (page, outcome) = render(doc, Capabilities::default());
    let report = report(outcome);

    assert_eq!(report.toc.len(), 3);
    let hrefs: Vec<_> = report.toc.iter().map(|e| e.href.as_str()).collect();
    assert_eq!(hrefs, ["#title", "#title-1", "#title-2"]);

    let nav = page.navigation.unwrap().html();
    for href in hrefs {
        assert!(nav.contains(&format!(r##"href="{href}""##)));
    }
}

#[test]
fn two_same_named_headings_first_active_distinct_hrefs() {
    let (_, outcome) = render("# Title\n\n## Title\n", Capabilities::default());
    let report = report(outcome);

    assert_eq!(report.toc.len(), 2);
    assert!(report.toc[0].active);
    assert!(!report.toc[1].active);
    assert_ne!(report.toc[0].href, report.toc[1].href);
}

#[test]
fn every_table_receives_the_presentation_contract() {
    let table = "| a | b |\n|---|---|\n| 1 | 2 |\n";
    let doc = format!("# T\n\n{table}\ntext\n\n{table}");
    let (page, outcome) = render(&doc, Capabilities::default());
    report(outcome);

    let content = page.content.unwrap().html();
    assert_eq!(content.matches("border-collapse: collapse; width: 100%;").count(), 2);
    assert_eq!(content.matches("background-color: #f2f2f2;").count(), 2);
    assert!(content.contains("border: 1px solid #d9d9d9;"));
}

#[test]
fn fetch_failure_renders_one_error_message_and_no_toc() {
    let (fetcher, _) = fixture("doc.md", "# unreachable\n");
    let page = HostPage {
        document: Some(DocumentRef::from("missing.md")),
        content: Some(Target::new()),
        navigation: Some(Target::new()),
    };

    let outcome = PageRenderer::new(fetcher, Capabilities::default()).render(&page);
    let Outcome::Failed(failure) = outcome else { panic!("expected fetch failure") };
    assert_eq!(failure.kind, FailureKind::Fetch);

    let content = page.content.unwrap().html();
    assert_eq!(content.matches(r#"<p class="render-error">"#).count(), 1);
    assert!(content.contains("failed to fetch document"));
    assert!(page.navigation.unwrap().is_empty());
}

#[test]
fn documents_without_headings_never_fail() {
    let (page, outcome) = render("just a paragraph\n\nand another\n", Capabilities::default());
    let report = report(outcome);

    assert!(report.toc.is_empty());
    assert_eq!(page.navigation.unwrap().html(), r#"<ul class="toc"></ul>"#);
}

#[test]
fn pages_without_a_navigation_target_still_render() {
    let (fetcher, document) = fixture("doc.md", "# Solo\n");
    let page = HostPage {
        document: Some(document),
        content: Some(Target::new()),
        navigation: None,
    };

    let outcome = PageRenderer::new(fetcher, Capabilities::default()).render(&page);
    let report = report(outcome);
    assert_eq!(report.toc.len(), 1);
    assert!(page.content.unwrap().html().contains(r##"<h1 id="solo">"##));
}

struct StubDiagrammer;

impl Diagrammer for StubDiagrammer {
    fn render(&self, source: &str) -> Result<String> {
        Ok(format!("<svg data-lines=\"{}\"></svg>", source.lines().count()))
    }
}

#[test]
fn diagram_sources_bypass_the_highlighter_verbatim() {
    let doc = "# D\n\n```mermaid\ngraph TD;\n  A --> B;\n```\n\n```rust\nfn main() {}\n```\n";
    let mut capabilities = Capabilities::default();
    capabilities.diagrammer = Some(Arc::new(StubDiagrammer));

    let (page, outcome) = render(doc, capabilities);
    let content = page.content.unwrap();
    let html = content.html();

    // The diagram container holds the raw source; only the rust block was
    // tokenized.
    let start = html.find(r#"<div class="diagram" data-slot="0">"#).unwrap();
    let end = start + html[start..].find("</div>").unwrap();
    let container = &html[start..end];
    assert!(container.contains("A --&gt; B;"));
    assert!(!container.contains("<span"));
    assert!(html.contains("<span"));

    // Waiting on the completion signal observes the patched container.
    for task in report(outcome).enhancements {
        task.wait().unwrap();
    }

    let html = content.html();
    assert!(html.contains(r#"<div class="diagram rendered" data-slot="0">"#));
    assert!(html.contains(r#"<svg data-lines="2"></svg>"#));
}

struct StubTypesetter;

impl Typesetter for StubTypesetter {
    fn typeset(&self, html: &str) -> Result<String> {
        Ok(html.replace("$E$", r#"<em class="math">E</em>"#))
    }
}

#[test]
fn diagram_patches_survive_concurrent_typesetting() {
    // Typesets slowly so in-flight diagram patches get every chance to land
    // mid-typeset. Both enhancements must survive regardless of interleaving.
    struct SlowTypesetter;

    impl Typesetter for SlowTypesetter {
        fn typeset(&self, html: &str) -> Result<String> {
            std::thread::sleep(std::time::Duration::from_millis(25));
            Ok(html.replace("$E$", r#"<em class="math">E</em>"#))
        }
    }

    let doc = "# D\n\nenergy is $E$\n\n```mermaid\ngraph TD;\n  A --> B;\n```\n";
    let mut capabilities = Capabilities::default();
    capabilities.diagrammer = Some(Arc::new(StubDiagrammer));
    capabilities.typesetter = Some(Arc::new(SlowTypesetter));

    let (page, outcome) = render(doc, capabilities);
    for task in report(outcome).enhancements {
        task.wait().unwrap();
    }

    let html = page.content.unwrap().html();
    assert!(html.contains(r#"<em class="math">E</em>"#));
    assert!(html.contains(r#"<div class="diagram rendered" data-slot="0">"#));
    assert!(html.contains("<svg"));
}

#[test]
fn typesetting_runs_after_render_with_a_completion_signal() {
    let mut capabilities = Capabilities::default();
    capabilities.typesetter = Some(Arc::new(StubTypesetter));

    let (page, outcome) = render("# M\n\nenergy is $E$\n", capabilities);
    let content = page.content.unwrap();

    for task in report(outcome).enhancements {
        task.wait().unwrap();
    }

    assert!(content.html().contains(r#"<em class="math">E</em>"#));
}
