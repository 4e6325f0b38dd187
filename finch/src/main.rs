use std::fs;
use std::path::{Path, PathBuf};

use lectern::error::{Chainable, Result};
use lectern::page::Outcome;
use lectern::pipeline::{SyntaxHighlight, TocBuilder};
use lectern::{DocumentRef, Fetcher, HostPage, PageRenderer, Target};

use crate::config::Settings;

mod config;

xflags::xflags! {
    /// Renders one markdown article into a standalone HTML page.
    cmd finch {
        /// The markdown document to render.
        required input: PathBuf
        /// The HTML file to write.
        required output: PathBuf
        /// Page settings file; flags override it.
        optional -c, --config config: PathBuf
        /// Also write the synthesized TOC as JSON.
        optional --toc-json toc_json: PathBuf
        /// Disable syntax highlighting.
        optional --no-highlight
        /// Disable table styling.
        optional --no-tables
    }
}

fn main() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let flags = Finch::from_env_or_exit();
    if let Err(e) = run(flags) {
        println!("error: {e}");
        std::process::exit(1);
    }
}

fn run(flags: Finch) -> Result<()> {
    let mut settings = match &flags.config {
        Some(path) => Settings::read(path)?,
        None => Settings::default(),
    };

    if flags.no_highlight { settings.highlight = false; }
    if flags.no_tables { settings.tables = false; }

    let start = std::time::SystemTime::now();
    SyntaxHighlight::warm_up();

    let base = flags.input.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let name = match flags.input.file_name() {
        Some(name) => PathBuf::from(name),
        None => return lectern::err! {
            "input is not a document",
            "input" => flags.input.display(),
        },
    };

    let page = HostPage {
        document: Some(DocumentRef::new(name)),
        content: Some(Target::new()),
        navigation: Some(Target::new()),
    };

    let renderer = PageRenderer::new(Fetcher::new(base), settings.capabilities());
    let outcome = renderer.render(&page);
    println!("render time: {}ms", start.elapsed().unwrap().as_millis());

    // A failed pass still writes the page: the failure text is the content.
    let failed = match outcome {
        Outcome::Skipped => return lectern::err!("nothing to render"),
        Outcome::Failed(failure) => Some(failure.error),
        Outcome::Rendered(report) => {
            for failure in &report.failures {
                println!("warning: stage {} degraded: {}", failure.stage, failure.error);
            }

            if let Some(path) = &flags.toc_json {
                fs::write(path, TocBuilder::render_json(&report.toc)?).chain(lectern::error! {
                    "failed to write toc json",
                    "path" => path.display(),
                })?;
            }

            // Enhancements are best effort, but a one-shot renderer waits so
            // the written page includes them.
            for task in report.enhancements {
                let _ = task.wait();
            }

            None
        }
    };

    let content = page.content.unwrap();
    let navigation = page.navigation.unwrap();
    let html = shell(&settings.title, &navigation.html(), &content.html());
    fs::write(&flags.output, html).chain(lectern::error! {
        "failed to write page",
        "path" => flags.output.display(),
    })?;

    println!("total time: {}ms", start.elapsed().unwrap().as_millis());
    match failed {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

fn shell(title: &str, nav: &str, content: &str) -> String {
    format!(r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
</head>
<body>
<aside id="page-nav">{nav}</aside>
<main id="page-content">{content}</main>
</body>
</html>
"#)
}
