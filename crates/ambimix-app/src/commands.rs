//! Line-oriented command interpreter.

use ambimix_core::{PresetId, SoundId};
use ambimix_mixer::{MixSession, ModeKind, TransitionReport};
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;

pub const HELP: &str = "\
commands:
  list                      sounds with selection and volume
  select <sound>            deselect <sound>
  volume <sound> <0..1>     master <0..1>     mix on|off
  solo <sound>              unsolo
  quickmix [sound...]       vehicle [sound...]
  toggle <sound>            exit
  play | pause              status
  presets                   preset <name|id>
  save-as <name>            rename <name>=<new name>
  delete <name|id>
  import <path> [title]     remove <sound>
  hide <sound>              unhide <sound>
  move <sound> <index>
  help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    List,
    Select(String),
    Deselect(String),
    Volume(String, f32),
    Solo(String),
    Unsolo,
    QuickMix(Vec<String>),
    Vehicle(Vec<String>),
    Toggle(String),
    Exit,
    Play,
    Pause,
    Presets,
    Preset(String),
    SaveAs(String),
    Rename { from: String, to: String },
    Delete(String),
    Master(f32),
    Mix(bool),
    Import { path: PathBuf, title: Option<String> },
    Remove(String),
    Hide(String, bool),
    Move(String, usize),
    Status,
    Help,
    Quit,
}

#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("'{0}' is not a number")]
    Number(String),

    #[error("no sound named '{0}'")]
    NoSuchSound(String),

    #[error("no preset named '{0}'")]
    NoSuchPreset(String),
}

/// Whether the main loop keeps running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Parse one input line. Blank lines and `#` comments yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();
    let one = |usage: &'static str| -> Result<String, CommandError> {
        match args.as_slice() {
            [name] => Ok(name.to_string()),
            _ => Err(CommandError::Usage(usage)),
        }
    };
    let text = |usage: &'static str| -> Result<String, CommandError> {
        if rest.is_empty() {
            Err(CommandError::Usage(usage))
        } else {
            Ok(rest.to_string())
        }
    };

    let command = match head.to_ascii_lowercase().as_str() {
        "list" | "ls" => Command::List,
        "select" => Command::Select(one("select <sound>")?),
        "deselect" => Command::Deselect(one("deselect <sound>")?),
        "volume" | "vol" => match args.as_slice() {
            [name, value] => Command::Volume(name.to_string(), number(value)?),
            _ => return Err(CommandError::Usage("volume <sound> <0..1>")),
        },
        "solo" => Command::Solo(one("solo <sound>")?),
        "unsolo" => Command::Unsolo,
        "quickmix" | "qm" => Command::QuickMix(args.iter().map(|s| s.to_string()).collect()),
        "vehicle" => Command::Vehicle(args.iter().map(|s| s.to_string()).collect()),
        "toggle" => Command::Toggle(one("toggle <sound>")?),
        "exit" => Command::Exit,
        "play" => Command::Play,
        "pause" => Command::Pause,
        "presets" => Command::Presets,
        "preset" => Command::Preset(text("preset <name|id>")?),
        "save-as" => Command::SaveAs(text("save-as <name>")?),
        "rename" => match rest.split_once('=') {
            Some((from, to)) if !from.trim().is_empty() && !to.trim().is_empty() => {
                Command::Rename {
                    from: from.trim().to_string(),
                    to: to.trim().to_string(),
                }
            }
            _ => return Err(CommandError::Usage("rename <name>=<new name>")),
        },
        "delete" => Command::Delete(text("delete <name|id>")?),
        "master" => match args.as_slice() {
            [value] => Command::Master(number(value)?),
            _ => return Err(CommandError::Usage("master <0..1>")),
        },
        "mix" => match args.as_slice() {
            ["on"] => Command::Mix(true),
            ["off"] => Command::Mix(false),
            _ => return Err(CommandError::Usage("mix on|off")),
        },
        "import" => match args.split_first() {
            Some((path, title)) => Command::Import {
                path: PathBuf::from(path),
                title: (!title.is_empty()).then(|| title.join(" ")),
            },
            None => return Err(CommandError::Usage("import <path> [title]")),
        },
        "remove" => Command::Remove(one("remove <sound>")?),
        "hide" => Command::Hide(one("hide <sound>")?, true),
        "unhide" => Command::Hide(one("unhide <sound>")?, false),
        "move" => match args.as_slice() {
            [name, index] => Command::Move(
                name.to_string(),
                index
                    .parse()
                    .map_err(|_| CommandError::Number(index.to_string()))?,
            ),
            _ => return Err(CommandError::Usage("move <sound> <index>")),
        },
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "q" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn number(value: &str) -> Result<f32, CommandError> {
    value
        .parse()
        .map_err(|_| CommandError::Number(value.to_string()))
}

fn sound(session: &MixSession, name: &str) -> Result<SoundId, CommandError> {
    session
        .find_sound(name)
        .ok_or_else(|| CommandError::NoSuchSound(name.to_string()))
}

fn sounds(session: &MixSession, names: &[String]) -> Result<Vec<SoundId>, CommandError> {
    names.iter().map(|name| sound(session, name)).collect()
}

fn preset(session: &MixSession, name: &str) -> Result<PresetId, CommandError> {
    let library = session.library();
    PresetId::parse(name)
        .filter(|id| library.get(*id).is_some())
        .or_else(|| library.find_by_name(name).map(|p| p.id))
        .ok_or_else(|| CommandError::NoSuchPreset(name.to_string()))
}

fn report_transition(out: &mut dyn Write, report: &TransitionReport) -> std::io::Result<()> {
    if report.is_noop() {
        return writeln!(out, "(no change)");
    }
    writeln!(out, "{} -> {}", report.from, report.to)?;
    for (id, e) in &report.failures {
        writeln!(out, "  {id} failed: {e}")?;
    }
    Ok(())
}

/// Run one command against the session, writing feedback to `out`.
pub fn execute(
    session: &mut MixSession,
    command: Command,
    out: &mut dyn Write,
) -> anyhow::Result<Flow> {
    match command {
        Command::List => {
            for s in session.catalog().ordered() {
                writeln!(
                    out,
                    "{} {:<14} {:>4.2}{}{}",
                    if s.is_selected() { '*' } else { ' ' },
                    s.file_name(),
                    s.volume(),
                    if s.is_custom() { "  custom" } else { "" },
                    if s.is_hidden() { "  hidden" } else { "" },
                )?;
            }
        }
        Command::Select(name) => {
            let id = sound(session, &name)?;
            session.set_selected(id, true)?;
        }
        Command::Deselect(name) => {
            let id = sound(session, &name)?;
            session.set_selected(id, false)?;
        }
        Command::Volume(name, value) => {
            let id = sound(session, &name)?;
            session.set_volume(id, value)?;
        }
        Command::Solo(name) => {
            let id = sound(session, &name)?;
            let report = session.enter_solo(id)?;
            report_transition(out, &report)?;
        }
        Command::Unsolo => report_transition(out, &session.exit_solo())?,
        Command::QuickMix(names) => {
            let initial = sounds(session, &names)?;
            report_transition(out, &session.enter_quick_mix(&initial))?;
        }
        Command::Vehicle(names) => {
            let initial = sounds(session, &names)?;
            report_transition(out, &session.enter_vehicle_quick_mix(&initial))?;
        }
        Command::Toggle(name) => {
            let id = sound(session, &name)?;
            match session.toggle_quick_mix_sound(id)? {
                Some(selected) => writeln!(out, "{name}: {}", if selected { "on" } else { "off" })?,
                None => writeln!(out, "{name} is not available here")?,
            }
        }
        Command::Exit => report_transition(out, &session.exit_mode())?,
        Command::Play => {
            for (id, e) in session.play_all() {
                writeln!(out, "{id} failed: {e}")?;
            }
        }
        Command::Pause => session.pause_all(),
        Command::Presets => {
            let active = session.library().active_id();
            for p in session.library().presets() {
                writeln!(
                    out,
                    "{} {} {}{}",
                    if Some(p.id) == active { '>' } else { ' ' },
                    p.id,
                    p.name,
                    if p.is_default { "  (default)" } else { "" },
                )?;
            }
        }
        Command::Preset(name) => {
            let id = preset(session, &name)?;
            let report = session.activate_preset(id)?;
            writeln!(out, "applied {} sounds", report.applied.len())?;
            for (id, e) in &report.failures {
                writeln!(out, "  {id} failed: {e}")?;
            }
        }
        Command::SaveAs(name) => {
            let id = session.save_current_as(&name)?;
            writeln!(out, "saved {id}")?;
        }
        Command::Rename { from, to } => {
            let id = preset(session, &from)?;
            session.rename_preset(id, &to)?;
        }
        Command::Delete(name) => {
            let id = preset(session, &name)?;
            session.delete_preset(id)?;
        }
        Command::Master(value) => session.set_master_volume(value)?,
        Command::Mix(enabled) => session.set_mix_with_others(enabled)?,
        Command::Import { path, title } => {
            let file_name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string)
                .ok_or(CommandError::Usage("import <path> [title]"))?;
            let title = title.unwrap_or_else(|| file_name.clone());
            let id = session.import_sound(&title, &file_name, path)?;
            writeln!(out, "imported {file_name} as {id}")?;
        }
        Command::Remove(name) => {
            let id = sound(session, &name)?;
            session.remove_sound(id)?;
        }
        Command::Hide(name, hidden) => {
            let id = sound(session, &name)?;
            session.set_hidden(id, hidden)?;
        }
        Command::Move(name, index) => {
            let id = sound(session, &name)?;
            session.move_sound(id, index)?;
        }
        Command::Status => {
            let mode = session.mode_kind();
            writeln!(out, "mode: {mode}")?;
            if mode == ModeKind::Normal {
                let active = session.library().active().map(|p| p.name.as_str());
                writeln!(out, "preset: {}", active.unwrap_or("-"))?;
            }
            writeln!(
                out,
                "playback: {}{}",
                if session.global_playing() { "on" } else { "off" },
                if session.is_audible() { " (audible)" } else { "" },
            )?;
            writeln!(out, "master: {:.2}", session.settings().master_volume)?;
            if let Some(notice) = session.notice() {
                writeln!(out, "now playing: {} / {}", notice.title, notice.subtitle)?;
            }
        }
        Command::Help => writeln!(out, "{HELP}")?,
        Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}
