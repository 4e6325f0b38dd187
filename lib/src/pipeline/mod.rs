mod diagram;
mod heading;
mod highlight;
mod tables;
mod toc;

pub use diagram::{DiagramBlock, DiagramBlocks};
pub use heading::HeadingIds;
pub use highlight::SyntaxHighlight;
pub use tables::TableStyling;
pub use toc::{Entry, TocBuilder};

use either::Either;
use pulldown_cmark::{html, Event, Options, Parser};

use crate::error::{Error, Result};

/// One isolated post-processing transformation over the rendered event
/// stream.
///
/// Event remapping is infallible by construction; a stage that runs into
/// trouble records it internally and reports through [`finalize`], where the
/// pipeline isolates the failure so later stages are unaffected.
///
/// [`finalize`]: Stage::finalize
pub trait Stage {
    fn name(&self) -> &'static str;

    #[inline(always)]
    fn remap<'a, I>(&'a mut self, events: I) -> impl Iterator<Item = Event<'a>> + 'a
        where I: Iterator<Item = Event<'a>> + 'a
    {
        events
    }

    #[inline(always)]
    fn finalize(&mut self) -> Result<()> {
        Ok(())
    }
}

/// The markup rendering capability: converts raw text into the event stream
/// the stage set operates on.
#[derive(Debug, Clone, Copy)]
pub struct MarkupRenderer {
    options: Options,
}

impl Default for MarkupRenderer {
    fn default() -> Self {
        MarkupRenderer {
            options: Options::all().difference(Options::ENABLE_SMART_PUNCTUATION),
        }
    }
}

impl MarkupRenderer {
    pub fn with_options(options: Options) -> Self {
        MarkupRenderer { options }
    }

    pub fn parse<'a>(&self, input: &'a str) -> Parser<'a> {
        Parser::new_ext(input, self.options)
    }
}

/// The declared stage order. This is a contract, not a source-position
/// accident: diagram conversion must precede highlighting so diagram sources
/// are out of the tokenizer's reach, heading ids are assigned only once every
/// content-shaping stage has run, and the TOC reads the final headings.
pub const STAGE_ORDER: &[&str] = &[
    DiagramBlocks::NAME,
    SyntaxHighlight::NAME,
    TableStyling::NAME,
    HeadingIds::NAME,
    TocBuilder::NAME,
];

/// A single render pass: markup rendering followed by the stage set in
/// [`STAGE_ORDER`]. The optional stages are skipped when their backing
/// capability was not configured; heading ids and the TOC always run.
pub struct Pipeline {
    renderer: MarkupRenderer,
    diagrams: Option<DiagramBlocks>,
    highlight: Option<SyntaxHighlight>,
    tables: Option<TableStyling>,
    headings: HeadingIds,
    toc: TocBuilder,
}

/// Everything one [`Pipeline::run`] produces.
#[derive(Debug, Default)]
pub struct RunOutput {
    pub html: String,
    pub toc: Vec<Entry>,
    pub diagrams: Vec<DiagramBlock>,
    pub failures: Vec<StageFailure>,
}

/// A recorded, non-fatal stage error. Later stages ran regardless.
#[derive(Debug)]
pub struct StageFailure {
    pub stage: &'static str,
    pub error: Error,
}

impl Pipeline {
    pub fn new(renderer: MarkupRenderer) -> Self {
        Pipeline {
            renderer,
            diagrams: None,
            highlight: None,
            tables: None,
            headings: HeadingIds::default(),
            toc: TocBuilder::default(),
        }
    }

    pub fn with_diagrams(mut self, stage: DiagramBlocks) -> Self {
        self.diagrams = Some(stage);
        self
    }

    pub fn with_highlight(mut self, stage: SyntaxHighlight) -> Self {
        self.highlight = Some(stage);
        self
    }

    pub fn with_tables(mut self, stage: TableStyling) -> Self {
        self.tables = Some(stage);
        self
    }

    pub fn run(&mut self, input: &str) -> RunOutput {
        let mut html = String::new();
        self.execute(input, &mut html);

        let mut failures = vec![];
        if let Some(stage) = self.diagrams.as_mut() {
            isolate(DiagramBlocks::NAME, stage.finalize(), &mut failures);
        }

        if let Some(stage) = self.highlight.as_mut() {
            isolate(SyntaxHighlight::NAME, stage.finalize(), &mut failures);
        }

        if let Some(stage) = self.tables.as_mut() {
            isolate(TableStyling::NAME, stage.finalize(), &mut failures);
        }

        isolate(HeadingIds::NAME, self.headings.finalize(), &mut failures);
        isolate(TocBuilder::NAME, self.toc.finalize(), &mut failures);

        RunOutput {
            html,
            toc: self.toc.take_entries(),
            diagrams: self.diagrams.as_mut().map(DiagramBlocks::take_blocks).unwrap_or_default(),
            failures,
        }
    }

    /// One pass over the event stream, stages in declared order. The
    /// lifetimes of the input text and the stage borrows are one and the
    /// same: every stage remaps events for exactly this pass.
    fn execute<'a>(&'a mut self, input: &'a str, html: &mut String) {
        let events = self.renderer.parse(input);
        let events = optional(self.diagrams.as_mut(), events);
        let events = optional(self.highlight.as_mut(), events);
        let events = optional(self.tables.as_mut(), events);
        let events = self.headings.remap(events);
        let events = self.toc.remap(events);
        html::push_html(html, events);
    }
}

fn optional<'a, S, I>(stage: Option<&'a mut S>, events: I) -> impl Iterator<Item = Event<'a>> + 'a
    where S: Stage, I: Iterator<Item = Event<'a>> + 'a
{
    match stage {
        Some(stage) => Either::Left(stage.remap(events)),
        None => Either::Right(events),
    }
}

/// Records a stage failure without letting it halt the pass.
fn isolate(stage: &'static str, result: Result<()>, failures: &mut Vec<StageFailure>) {
    if let Err(error) = result {
        tracing::warn!(stage, "stage failed: {error}");
        failures.push(StageFailure { stage, error });
    }
}
