//! Terminal reporters for `canopy sync`.
//!
//! [`PlainReporter`] writes one line per finished action and suits pipes, logs
//! and dry runs. [`ProgressReporter`] keeps a progress bar at the bottom of the
//! terminal and prints the event lines above it.

use std::fmt;
use std::io::Write;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use canopy_sync::{ActionEvent, EventKind, Reporter, RunSummary};

pub const STOPPED_EARLY_NOTE: &str =
    "Stopped early due to failures. (Use --keep-going to keep going.)";

// ---------------------------------------------------------------------------
// Plain lines
// ---------------------------------------------------------------------------

/// `[ i/N] kind name message` per event, caveats indented below.
///
/// The first failed write (a closed pipe, say) is logged and ends all
/// further output; the sync itself carries on.
pub struct PlainReporter<W> {
    out: W,
    total: usize,
    name_width: usize,
    done: usize,
    broken: bool,
}

impl<W: Write + Send> PlainReporter<W> {
    pub fn new(out: W, name_width: usize) -> Self {
        Self {
            out,
            total: 0,
            name_width,
            done: 0,
            broken: false,
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, line: fmt::Arguments<'_>) {
        if self.broken {
            return;
        }
        let written = self
            .out
            .write_fmt(line)
            .and_then(|()| self.out.write_all(b"\n"));
        if let Err(e) = written {
            tracing::warn!(error = %e, "cannot write sync output; continuing without it");
            self.broken = true;
        }
    }

    fn detail(&mut self, event: &ActionEvent) {
        let width = self.name_width;
        self.emit(format_args!(
            "  {} {:<width$} {}",
            event.kind, event.name, event.message
        ));
    }
}

impl<W: Write + Send> Reporter for PlainReporter<W> {
    fn start(&mut self, total: usize) {
        self.total = total;
    }

    fn handle_event(&mut self, event: &ActionEvent) {
        self.done += 1;
        let (done, total) = (self.done, self.total);
        let count_width = total.to_string().len();
        let name_width = self.name_width;
        self.emit(format_args!(
            "[{done:>count_width$}/{total}] {} {:<name_width$} {}",
            event.kind, event.name, event.message
        ));
        for caveat in &event.caveats {
            self.emit(format_args!("  {caveat}"));
        }
    }

    fn finish(&mut self, summary: &RunSummary) {
        if summary.stopped_early {
            self.emit(format_args!("{STOPPED_EARLY_NOTE}"));
        }
        self.emit(format_args!("{}", summary.headline()));
        for event in summary.failed.iter().chain(summary.ignored.iter()) {
            self.detail(event);
        }
        match summary.caveats.len() {
            0 => {}
            1 => self.emit(format_args!("See 1 caveat above.")),
            n => self.emit(format_args!("See {n} caveats above.")),
        }
        if !self.broken {
            if let Err(e) = self.out.flush() {
                tracing::warn!(error = %e, "cannot flush sync output");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Progress bar
// ---------------------------------------------------------------------------

/// Progress bar on stdout with colored event lines printed above it.
pub struct ProgressReporter {
    bar: ProgressBar,
    name_width: usize,
}

impl ProgressReporter {
    pub fn new(name_width: usize) -> Self {
        Self {
            bar: ProgressBar::hidden(),
            name_width,
        }
    }

    fn line(&self, event: &ActionEvent) -> String {
        format!(
            "{} {:<w$} {}",
            colored_label(event.kind),
            event.name,
            event.message,
            w = self.name_width,
        )
    }
}

impl Reporter for ProgressReporter {
    fn start(&mut self, total: usize) {
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{pos:>4}/{len} [{bar:60.cyan/blue}] {msg}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        self.bar = bar;
    }

    fn handle_event(&mut self, event: &ActionEvent) {
        self.bar.println(self.line(event));
        self.bar.set_message(event.name.clone());
        self.bar.inc(1);
    }

    fn finish(&mut self, summary: &RunSummary) {
        self.bar.finish_and_clear();

        if summary.stopped_early {
            println!("{}", STOPPED_EARLY_NOTE.yellow());
        }
        let headline = summary.headline();
        if summary.failed.is_empty() {
            println!("{}", headline.green().bold());
        } else {
            println!("{}", headline.red().bold());
        }

        for event in summary.failed.iter().chain(summary.ignored.iter()) {
            println!("  {}", self.line(event));
        }

        if !summary.caveats.is_empty() {
            println!("{}", "Caveats:".bold());
            for (name, caveat) in &summary.caveats {
                println!("  {name}: {caveat}");
            }
        }
    }
}

fn colored_label(kind: EventKind) -> String {
    let label = kind.label();
    match kind {
        EventKind::Cloned => label.green().to_string(),
        EventKind::Failed => label.red().bold().to_string(),
        EventKind::Ignored => label.yellow().to_string(),
        EventKind::Removed => label.magenta().to_string(),
        EventKind::Unchanged => label.bright_black().to_string(),
        EventKind::Updated => label.cyan().to_string(),
    }
}
