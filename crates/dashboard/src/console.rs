//! Console presenter: prints the [`Screen`] to a terminal.
//!
//! Components always replace the log and terminal buffers wholesale.
//! Reprinting the whole buffer every poll would flood the console, so the
//! presenter remembers what it already printed and writes only the new
//! suffix when the buffer grew by appending.

use std::io::{self, Write};
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;

use etx_core::terminal::TerminalState;

use crate::history::{Badge, HistoryRow};
use crate::screen::{HostnamePicker, Screen, ScreenEvent, StatusBanner};
use crate::settings::{FieldKind, SettingsForm};

const PASSWORD_MASK: &str = "********";

/// What to print after a buffer was replaced.
#[derive(Debug, PartialEq, Eq)]
pub enum TailUpdate<'a> {
    Unchanged,
    /// The buffer extends what was printed; print only this suffix.
    Append(&'a str),
    /// The buffer diverged; print it in full.
    Reset(&'a str),
}

/// Tracks how much of a full-replace buffer has been printed.
#[derive(Debug, Default)]
pub struct LogTail {
    printed: String,
}

impl LogTail {
    pub fn update<'a>(&mut self, full: &'a str) -> TailUpdate<'a> {
        let update = if full == self.printed {
            TailUpdate::Unchanged
        } else if let Some(suffix) = full.strip_prefix(self.printed.as_str()) {
            TailUpdate::Append(suffix)
        } else {
            TailUpdate::Reset(full)
        };
        if update != TailUpdate::Unchanged {
            self.printed = full.to_string();
        }
        update
    }

    pub fn forget(&mut self) {
        self.printed.clear();
    }
}

pub fn format_status(banner: &StatusBanner) -> String {
    format!("[{}] {}", banner.severity, banner.message)
}

fn badge_label(badge: Badge) -> &'static str {
    match badge {
        Badge::Success => "success",
        Badge::Danger => "danger",
        Badge::Secondary => "secondary",
    }
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    match (secs / 3600, (secs % 3600) / 60, secs % 60) {
        (0, 0, s) => format!("{s}s"),
        (0, m, s) => format!("{m}m {s:02}s"),
        (h, m, s) => format!("{h}h {m:02}m {s:02}s"),
    }
}

/// Render history rows as a fixed-width table.
pub fn format_history(rows: &[HistoryRow]) -> String {
    if rows.is_empty() {
        return "No jobs yet.".to_string();
    }

    let header = ["TYPE", "START", "END", "STATUS", "DURATION", "LOG"];
    let cells: Vec<[String; 6]> = rows
        .iter()
        .map(|row| {
            [
                row.job_type.clone(),
                row.start.clone(),
                row.end.clone(),
                format!("{} ({})", row.status, badge_label(row.badge)),
                row.duration.map(format_duration).unwrap_or_else(|| "-".into()),
                row.log_url.clone(),
            ]
        })
        .collect();

    let mut widths = header.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let line = |values: Vec<&str>| -> String {
        values
            .iter()
            .zip(widths)
            .map(|(v, w)| format!("{v:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let mut out = vec![line(header.to_vec())];
    out.push(line(rule.iter().map(String::as_str).collect()));
    out.extend(cells.iter().map(|row| line(row.iter().map(String::as_str).collect())));
    out.join("\n")
}

pub fn format_hosts(picker: &HostnamePicker) -> String {
    let kind = if picker.is_gpu { "GPU" } else { "CPU" };
    let options: Vec<String> = picker
        .options
        .iter()
        .map(|host| {
            if *host == picker.selected {
                format!("*{host}")
            } else {
                host.clone()
            }
        })
        .collect();
    format!("{kind} hosts: {}", options.join(" "))
}

/// One `NAME = value` line per field. Passwords are masked.
pub fn format_settings(form: &SettingsForm) -> String {
    let width = form.fields.iter().map(|f| f.name.len()).max().unwrap_or(0);
    let mut out = Vec::with_capacity(form.fields.len());
    for field in &form.fields {
        let name = &field.name;
        match field.kind {
            FieldKind::Checkbox => {
                let mark = if field.checked { "[x]" } else { "[ ]" };
                out.push(format!("{name:<width$} = {mark}"));
            }
            FieldKind::Password if !field.text.is_empty() => {
                out.push(format!("{name:<width$} = {PASSWORD_MASK}"));
            }
            FieldKind::MultiLine => {
                out.push(format!("{name:<width$} ="));
                out.extend(field.text.lines().map(|l| format!("    {l}")));
            }
            FieldKind::Text | FieldKind::Password => {
                out.push(format!("{name:<width$} = {}", field.text));
            }
        }
    }
    out.join("\n")
}

/// Writes screen changes to `out` as they happen.
pub struct ConsolePresenter<W: Write> {
    out: W,
    screen: Screen,
    job_log: LogTail,
    terminal_output: LogTail,
    terminal_state: TerminalState,
}

impl<W: Write> ConsolePresenter<W> {
    pub fn new(screen: Screen, out: W) -> Self {
        Self {
            out,
            screen,
            job_log: LogTail::default(),
            terminal_output: LogTail::default(),
            terminal_state: TerminalState::Idle,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Print the region behind `event`.
    pub fn render(&mut self, event: ScreenEvent) -> io::Result<()> {
        match event {
            ScreenEvent::Status => {
                if let Some(banner) = self.screen.status() {
                    writeln!(self.out, "{}", format_status(&banner))?;
                }
            }
            ScreenEvent::JobLog => {
                let log = self.screen.job_log();
                write_tail(&mut self.out, &mut self.job_log, &log)?;
            }
            ScreenEvent::History => {
                writeln!(self.out, "{}", format_history(&self.screen.history()))?;
            }
            ScreenEvent::TerminalOutput => {
                let output = self.screen.terminal().output;
                write_tail(&mut self.out, &mut self.terminal_output, &output)?;
            }
            ScreenEvent::TerminalControls => {
                let state = self.screen.terminal().state;
                if state != self.terminal_state {
                    self.terminal_state = state;
                    writeln!(self.out, "[terminal] {}", state.as_str())?;
                }
            }
            ScreenEvent::TerminalMessage => {
                if let Some(message) = self.screen.terminal().message {
                    writeln!(self.out, "[terminal] {message}")?;
                }
            }
            ScreenEvent::SettingsForm => {}
            ScreenEvent::SettingsStatus => {
                let status = self.screen.settings_status();
                if !status.is_empty() {
                    writeln!(self.out, "[settings] {status}")?;
                }
            }
            ScreenEvent::Hostname => {
                writeln!(self.out, "{}", format_hosts(&self.screen.hostname()))?;
            }
        }
        self.out.flush()
    }

    /// Catch up after missed events by printing the buffers from a snapshot.
    pub fn render_all(&mut self) -> io::Result<()> {
        let state = self.screen.snapshot();
        if let Some(banner) = &state.status {
            writeln!(self.out, "{}", format_status(banner))?;
        }
        write_tail(&mut self.out, &mut self.job_log, &state.job_log)?;
        write_tail(&mut self.out, &mut self.terminal_output, &state.terminal.output)?;
        self.terminal_state = state.terminal.state;
        self.out.flush()
    }

    /// Print events until `cancel` fires or the screen goes away.
    pub async fn run(
        mut self,
        mut events: broadcast::Receiver<ScreenEvent>,
        cancel: CancellationToken,
    ) -> io::Result<W> {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Ok(event) => self.render(event)?,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Console presenter lagged, redrawing");
                        self.render_all()?;
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        // Drain what was published before cancellation.
        while let Ok(event) = events.try_recv() {
            self.render(event)?;
        }
        Ok(self.out)
    }
}

fn write_tail(out: &mut impl Write, tail: &mut LogTail, full: &str) -> io::Result<()> {
    match tail.update(full) {
        TailUpdate::Unchanged => Ok(()),
        TailUpdate::Append(suffix) => out.write_all(suffix.as_bytes()),
        TailUpdate::Reset("") => Ok(()),
        TailUpdate::Reset(full) => {
            writeln!(out, "----")?;
            out.write_all(full.as_bytes())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use etx_core::job::JobStatus;
    use etx_core::severity::Severity;

    #[test]
    fn tail_prints_only_the_new_suffix() {
        let mut tail = LogTail::default();
        assert_eq!(tail.update("a\n"), TailUpdate::Append("a\n"));
        assert_eq!(tail.update("a\nb\n"), TailUpdate::Append("b\n"));
        assert_eq!(tail.update("a\nb\n"), TailUpdate::Unchanged);
        assert_eq!(tail.update("x\n"), TailUpdate::Reset("x\n"));
        tail.forget();
        assert_eq!(tail.update("x\n"), TailUpdate::Append("x\n"));
    }

    #[test]
    fn durations_are_compact() {
        assert_eq!(format_duration(Duration::from_secs(7)), "7s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 05s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 02m 05s");
    }

    #[test]
    fn history_table_has_header_and_rows() {
        let rows = vec![HistoryRow {
            id: "abc".into(),
            job_type: "pipeline".into(),
            start: "2025-01-01 10:00:00".into(),
            end: "2025-01-01 10:01:00".into(),
            status: JobStatus::Error,
            badge: Badge::Danger,
            duration: Some(Duration::from_secs(60)),
            log_url: "/download_log/abc".into(),
        }];
        let table = format_history(&rows);
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("TYPE"));
        assert!(lines[2].contains("error (danger)"));
        assert!(lines[2].contains("1m 00s"));
        assert!(lines[2].ends_with("/download_log/abc"));

        assert_eq!(format_history(&[]), "No jobs yet.");
    }

    #[test]
    fn password_is_masked() {
        let mut form = SettingsForm::default();
        form.set_text("REMOTE_PASS", "hunter2").unwrap();
        form.set_text("REMOTE_COMMANDS", "ls\npwd").unwrap();
        let text = format_settings(&form);
        assert!(!text.contains("hunter2"));
        assert!(text.contains(PASSWORD_MASK));
        assert!(text.contains("    pwd"));
    }

    #[test]
    fn presenter_appends_log_increments() {
        let screen = Screen::default();
        let mut presenter = ConsolePresenter::new(screen.clone(), Vec::new());

        screen.show_status("Job started: abc", Severity::Success);
        presenter.render(ScreenEvent::Status).unwrap();
        screen.replace_log("one\n");
        presenter.render(ScreenEvent::JobLog).unwrap();
        screen.replace_log("one\ntwo\n");
        presenter.render(ScreenEvent::JobLog).unwrap();

        let printed = String::from_utf8(presenter.into_inner()).unwrap();
        assert_eq!(printed, "[success] Job started: abc\none\ntwo\n");
    }
}
