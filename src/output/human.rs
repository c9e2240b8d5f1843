#![forbid(unsafe_code)]

//! Human-readable, optionally colored output

use crate::config::ColorOption;
use crate::engine::{CheckOutcome, DispatchOutcome, ProcessReport};
use crate::output::{ClassifiedPath, RunReport, ScopeListing};
use std::io::{self, IsTerminal, Write};
use termcolor::{Color, ColorChoice, ColorSpec, WriteColor};

/// Resolves the configured color option against the terminal
pub fn color_choice(option: ColorOption) -> ColorChoice {
    match option {
        ColorOption::Always => ColorChoice::Always,
        ColorOption::Never => ColorChoice::Never,
        ColorOption::Auto if io::stdout().is_terminal() => ColorChoice::Auto,
        ColorOption::Auto => ColorChoice::Never,
    }
}

/// Human-readable formatter
pub struct HumanFormatter;

impl HumanFormatter {
    pub fn new() -> Self {
        HumanFormatter
    }

    pub fn write_classifications(
        &self,
        w: &mut dyn WriteColor,
        paths: &[ClassifiedPath],
    ) -> io::Result<()> {
        let width = paths.iter().map(|p| p.path.len()).max().unwrap_or(0);
        for entry in paths {
            write!(w, "{:width$}  ", entry.path, width = width)?;
            let class = &entry.classification;
            if class.known {
                writeln!(w, "{}", class.asset_type)?;
            } else {
                colored(w, Color::Yellow, &class.asset_type.to_string())?;
                match &class.extension {
                    Some(ext) => writeln!(w, " (unknown extension '{}')", ext)?,
                    None => writeln!(w, " (no extension)")?,
                }
            }
        }
        Ok(())
    }

    pub fn write_listing(&self, w: &mut dyn WriteColor, listing: &[ScopeListing]) -> io::Result<()> {
        for scope in listing {
            w.set_color(ColorSpec::new().set_bold(true))?;
            write!(w, "{}", scope.scope)?;
            w.reset()?;
            let noun = if scope.rules.len() == 1 { "rule" } else { "rules" };
            writeln!(w, " ({} {})", scope.rules.len(), noun)?;

            for row in &scope.rules {
                let spec = row.spec;
                writeln!(
                    w,
                    "  [{}] {}  {}  order {}  types {}",
                    row.index, spec.id, spec.stage, spec.order, spec.types
                )?;
                if spec.name != spec.id.as_str() && !spec.name.is_empty() {
                    writeln!(w, "      name: {}", spec.name)?;
                }
                if !spec.description.is_empty() {
                    writeln!(w, "      {}", spec.description)?;
                }
                for (i, path) in spec.blacklist.iter().enumerate() {
                    writeln!(w, "      blacklist [{}]: {}", i, path)?;
                }
                for (key, value) in &spec.params {
                    writeln!(w, "      {} = {}", key, value)?;
                }
            }
        }
        Ok(())
    }

    pub fn write_run(&self, w: &mut dyn WriteColor, report: &RunReport) -> io::Result<()> {
        for error in report.resolution_errors {
            colored(w, Color::Yellow, "warning")?;
            writeln!(w, ": {}", error)?;
        }

        for decision in report.decisions {
            w.set_color(ColorSpec::new().set_dimmed(true))?;
            write!(w, "  {}", decision)?;
            w.reset()?;
            writeln!(w)?;
        }

        write!(w, "{} ({}): ", report.path, report.stage)?;
        match report.outcome {
            DispatchOutcome::Filtered { reason } => {
                colored(w, Color::Yellow, "SKIPPED")?;
                writeln!(w, " {}", reason)?;
            }
            DispatchOutcome::Blocked { asset_type, check } => {
                colored(w, Color::Red, "BLOCKED")?;
                writeln!(w, " [{}]", asset_type)?;
                self.write_check(w, check)?;
            }
            DispatchOutcome::Completed {
                asset_type,
                check,
                process,
            } => {
                colored(w, Color::Green, "PASSED")?;
                writeln!(w, " [{}]", asset_type)?;
                self.write_check(w, check)?;
                self.write_process(w, process)?;
            }
        }

        if let Some(settings) = report.settings
            && !settings.is_empty()
        {
            writeln!(w, "  import settings:")?;
            for (key, value) in settings.iter() {
                writeln!(w, "    {} = {}", key, value)?;
            }
        }
        Ok(())
    }

    fn write_check(&self, w: &mut dyn WriteColor, check: &CheckOutcome) -> io::Result<()> {
        writeln!(w, "  checks run: {}", check.checks_run)?;
        if let Some(failure) = &check.blocked_by {
            match &failure.error {
                Some(error) => writeln!(w, "  blocked by {}: {}", failure.location, error)?,
                None => writeln!(w, "  blocked by {}", failure.location)?,
            }
        }
        Ok(())
    }

    fn write_process(&self, w: &mut dyn WriteColor, process: &ProcessReport) -> io::Result<()> {
        writeln!(w, "  processors run: {}", process.processors_run)?;
        for failure in &process.failures {
            colored(w, Color::Yellow, "  processor failed")?;
            writeln!(w, " {}: {}", failure.location, failure.error)?;
        }
        Ok(())
    }
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn colored(w: &mut dyn WriteColor, color: Color, text: &str) -> io::Result<()> {
    w.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(w, "{}", text)?;
    w.reset()
}
