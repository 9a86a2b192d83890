use crate::cli::OutputFormat;
use crate::label::escape;
use crate::model::{Frame, MenuEntry};
use crossbeam_channel::Sender;
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::thread;

/// The presentation shell as seen from the controller.
pub trait Presenter {
    fn present(&mut self, frame: &Frame);

    fn close_menu(&mut self) {}
}

#[derive(Serialize)]
struct BarOutput<'a> {
    text: &'a str,
    tooltip: String,
    class: &'a str,
    menu: &'a [MenuEntry],
}

/// Writes one line per changed frame to stdout, for status bars that run
/// the badge as a child process.
pub struct StdoutPresenter {
    format: OutputFormat,
    last: Option<Frame>,
}

impl StdoutPresenter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format, last: None }
    }

    fn write_line(&self, line: &str) {
        let mut out = io::stdout().lock();
        if let Err(e) = writeln!(out, "{line}").and_then(|_| out.flush()) {
            log::warn!("writing frame to stdout: {e}");
        }
    }
}

impl Presenter for StdoutPresenter {
    fn present(&mut self, frame: &Frame) {
        if self.last.as_ref() == Some(frame) {
            return;
        }
        match format_frame(frame, self.format) {
            Ok(line) => self.write_line(&line),
            Err(e) => log::warn!("serializing frame: {e}"),
        }
        self.last = Some(frame.clone());
    }

    fn close_menu(&mut self) {
        log::debug!("menu closed");
    }
}

pub fn format_frame(frame: &Frame, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Markup => Ok(frame.text.clone()),
        OutputFormat::Json => serde_json::to_string(&BarOutput {
            text: &frame.text,
            tooltip: menu_tooltip(&frame.menu),
            class: frame.class,
            menu: &frame.menu,
        }),
    }
}

fn menu_tooltip(menu: &[MenuEntry]) -> String {
    menu.iter()
        .map(|entry| {
            format!(
                "<span color=\"{}\">{}</span>",
                escape(&entry.color),
                escape(&entry.name)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Requests coming back from the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Switch(String),
    Cycle,
    Refresh,
    Quit,
}

pub fn parse_command(line: &str) -> Option<ShellCommand> {
    let line = line.trim();
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    match verb {
        "switch" if !rest.trim().is_empty() => Some(ShellCommand::Switch(rest.trim().to_string())),
        "cycle" => Some(ShellCommand::Cycle),
        "refresh" => Some(ShellCommand::Refresh),
        "quit" => Some(ShellCommand::Quit),
        _ => None,
    }
}

/// Forward commands typed on stdin. The thread ends with stdin.
pub fn spawn_stdin_reader(tx: Sender<ShellCommand>) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("netbadge-stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                match parse_command(&line) {
                    Some(cmd) => {
                        if tx.send(cmd).is_err() {
                            break;
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => log::warn!("unknown command {line:?}"),
                }
            }
        })
}
