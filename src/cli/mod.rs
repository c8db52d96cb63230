//!
//! studentdesk interactive console
//! -------------------------------
//! Line-oriented front end over the [`Dispatcher`]: parses a command, runs the
//! matching handler on the runtime and renders whatever the presentation allows.

pub mod outputformatter;

use std::borrow::Cow;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use rustyline::completion::Completer;
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{ColorMode, DefaultEditor, Editor, Helper};
use tracing::debug;

use crate::dispatcher::{ActionOutcome, Dispatcher, FormOutcome, HistoryOutcome, LoginOutcome, StudentAction};
use crate::view::{FormTab, Notice, StudentForm};

use outputformatter::{get_terminal_width, render_detail, render_login_history, render_notice, render_roster};

pub const HELP: &str = "Commands:
  login [<user|email> [password]]   sign in (prompts for what is missing)
  signup [<name> <email> <password>] create an account
  logout                            end the session
  refresh                           re-fetch the dashboard
  students                          show the roster (active filter applied)
  filter [text]                     filter roster by name or email; no text clears it
  exams <id> | fees <id>            show a student's exams or fees
  details <id>                      exams and fees together
  edit <id> | delete <id>           modify a student (admin)
  add                               add a student (admin)
  history                           admin login history (admin)
  status                            session and dashboard summary
  dismiss                           hide the current notice
  reload                            drop in-memory state and restore the saved session
  help                              show this help
  quit | exit                       leave (the saved session is discarded)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { login_id: Option<String>, password: Option<String> },
    Signup { fields: Option<(String, String, String)> },
    Logout,
    Refresh,
    Students,
    Filter(String),
    Student(StudentAction, i64),
    Add,
    History,
    Status,
    Dismiss,
    Reload,
    Help,
    Quit,
}

/// Split on whitespace, keeping double- or single-quoted runs together.
pub fn tokenize(line: &str) -> Result<Vec<String>, String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut quote: Option<char> = None;
    let mut in_token = false;
    for ch in line.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => cur.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                in_token = true;
            }
            None if ch.is_whitespace() => {
                if in_token {
                    out.push(std::mem::take(&mut cur));
                    in_token = false;
                }
            }
            None => {
                cur.push(ch);
                in_token = true;
            }
        }
    }
    if quote.is_some() {
        return Err("unterminated quote".to_string());
    }
    if in_token { out.push(cur); }
    Ok(out)
}

fn parse_id(tok: Option<&String>, cmd: &str) -> Result<i64, String> {
    let t = tok.ok_or_else(|| format!("{} requires a student id", cmd))?;
    t.parse::<i64>().map_err(|_| format!("invalid student id '{}'", t))
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let toks = tokenize(line)?;
        let Some(head) = toks.first() else { return Err("empty command".to_string()) };
        let rest = &toks[1..];
        let cmd = head.to_ascii_lowercase();
        match cmd.as_str() {
            "login" => Ok(Command::Login { login_id: rest.first().cloned(), password: rest.get(1).cloned() }),
            "signup" => match rest.len() {
                0 => Ok(Command::Signup { fields: None }),
                3 => Ok(Command::Signup { fields: Some((rest[0].clone(), rest[1].clone(), rest[2].clone())) }),
                _ => Err("signup takes no arguments or <name> <email> <password>".to_string()),
            },
            "logout" => Ok(Command::Logout),
            "refresh" => Ok(Command::Refresh),
            "students" | "ls" => Ok(Command::Students),
            "filter" => Ok(Command::Filter(rest.join(" "))),
            "exams" | "fees" | "details" | "edit" | "delete" => {
                let action = StudentAction::from_str(&cmd)?;
                Ok(Command::Student(action, parse_id(rest.first(), &cmd)?))
            }
            "add" => Ok(Command::Add),
            "history" => Ok(Command::History),
            "status" => Ok(Command::Status),
            "dismiss" => Ok(Command::Dismiss),
            "reload" => Ok(Command::Reload),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(format!("unknown command '{}'; type 'help'", other)),
        }
    }
}

fn ask(rl: &mut DefaultEditor, prompt: &str) -> Option<String> {
    rl.readline(prompt).ok()
}

/// Line-editor helper that paints every typed character as `*`.
struct MaskedInput;

impl Completer for MaskedInput {
    type Candidate = String;
}

impl Hinter for MaskedInput {
    type Hint = String;
}

impl Validator for MaskedInput {}

impl Highlighter for MaskedInput {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        Cow::Owned(mask(line))
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool { true }
}

impl Helper for MaskedInput {}

fn mask(secret: &str) -> String { "*".repeat(secret.chars().count()) }

/// Read a password on a separate editor: input is masked and never enters history.
fn ask_secret(prompt: &str) -> Option<String> {
    let mut rl: Editor<MaskedInput, DefaultHistory> = match Editor::new() {
        Ok(rl) => rl,
        Err(e) => {
            debug!(target: "studentdesk::cli", "masked editor unavailable: {e}");
            return None;
        }
    };
    rl.set_helper(Some(MaskedInput));
    rl.set_color_mode(ColorMode::Forced);
    rl.set_auto_add_history(false);
    rl.readline(prompt).ok()
}

/// Commands whose arguments may carry a password stay out of the history.
fn keeps_history(line: &str) -> bool {
    let first = line.split_whitespace().next().unwrap_or("").to_ascii_lowercase();
    !matches!(first.as_str(), "login" | "signup")
}

/// The notice to print after a command, if one was raised since `last_seq`.
/// A repeat of the same message still counts as new.
fn notice_to_echo<'a>(d: &'a Dispatcher, last_seq: &mut u64) -> Option<&'a Notice> {
    let seq = d.notice_seq();
    if seq == *last_seq {
        return None;
    }
    *last_seq = seq;
    d.notice()
}

fn ask_with_default(rl: &mut DefaultEditor, prompt: &str, current: &str) -> Option<String> {
    rl.readline_with_initial(prompt, (current, "")).ok()
}

fn prompt_for(d: &Dispatcher) -> String {
    match d.session() {
        Some(s) => format!("{}({})> ", s.identity.display_name(), s.capability),
        None => "studentdesk> ".to_string(),
    }
}

fn status_text(d: &Dispatcher) -> String {
    let mut lines = vec![format!("api: {}", d.api().base())];
    match d.session() {
        Some(s) => {
            lines.push(format!("signed in as {} ({}), role {}", s.identity.display_name(), s.identity.username, s.capability));
            lines.push(format!("students: {}", d.dashboard().total_students()));
            if d.presentation().login_history_visible {
                let logins = d.dashboard().total_logins().map(|n| n.to_string()).unwrap_or_else(|| "-".into());
                lines.push(format!("logins: {}{}", logins, if d.dashboard().logins_stale() { " (stale)" } else { "" }));
            }
        }
        None => lines.push("not signed in".to_string()),
    }
    lines.join("\n")
}

/// Fill in a student form interactively and submit it.
fn edit_and_submit(rt: &tokio::runtime::Runtime, rl: &mut DefaultEditor, d: &mut Dispatcher, mut form: StudentForm) {
    let Some(name) = ask_with_default(rl, "name: ", &form.name) else { return };
    let Some(email) = ask_with_default(rl, "email: ", &form.email) else { return };
    form.name = name;
    form.email = email;
    if let FormOutcome::Saved { student, .. } = rt.block_on(d.submit_student_form(&form)) {
        debug!(target: "studentdesk::cli", id = student.id, "form saved");
    }
}

/// Run one command; returns false when the console should exit.
fn execute(rt: &tokio::runtime::Runtime, rl: &mut DefaultEditor, d: &mut Dispatcher, cmd: Command) -> bool {
    let termw = get_terminal_width();
    match cmd {
        Command::Quit => return false,
        Command::Help => println!("{}", HELP),
        Command::Login { login_id, password } => {
            d.show_form(FormTab::Login);
            let login_id = match login_id {
                Some(v) => v,
                None => match ask(rl, "username or email: ") { Some(v) => v, None => return true },
            };
            let password = match password {
                Some(v) => v,
                None => match ask_secret("password: ") { Some(v) => v, None => return true },
            };
            match rt.block_on(d.submit_login(&login_id, &password)) {
                LoginOutcome::Authenticated { .. } => println!("{}", render_roster(d.dashboard(), d.presentation(), termw)),
                LoginOutcome::Ignored => println!("already signed in; logout first"),
                LoginOutcome::Failed(_) | LoginOutcome::MissingFields => {
                    if let Some(err) = &d.forms().login_error { eprintln!("{}", err); }
                }
            }
        }
        Command::Signup { fields } => {
            d.show_form(FormTab::Signup);
            let (name, email, password) = match fields {
                Some(f) => f,
                None => {
                    let Some(n) = ask(rl, "name: ") else { return true };
                    let Some(e) = ask(rl, "email: ") else { return true };
                    let Some(p) = ask_secret("password: ") else { return true };
                    (n, e, p)
                }
            };
            rt.block_on(d.submit_signup(&name, &email, &password));
        }
        Command::Logout => {
            d.logout();
            println!("signed out");
        }
        Command::Refresh => {
            if d.session().is_none() {
                println!("not signed in");
            } else {
                rt.block_on(d.refresh());
                println!("{}", render_roster(d.dashboard(), d.presentation(), termw));
            }
        }
        Command::Students => {
            if d.presentation().dashboard_visible {
                println!("{}", render_roster(d.dashboard(), d.presentation(), termw));
            } else {
                println!("not signed in");
            }
        }
        Command::Filter(q) => {
            d.filter_roster(&q);
            if d.presentation().dashboard_visible {
                println!("{}", render_roster(d.dashboard(), d.presentation(), termw));
            }
        }
        Command::Student(action, id) => {
            let mut confirm = |prompt: &str| -> bool {
                ask(rl, &format!("{} [y/N] ", prompt))
                    .map(|a| matches!(a.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
                    .unwrap_or(false)
            };
            let outcome = rt.block_on(d.invoke_student_action(action, id, &mut confirm));
            match outcome {
                ActionOutcome::Detail(detail) => println!("{}", render_detail(&detail, termw)),
                ActionOutcome::EditForm(form) => edit_and_submit(rt, rl, d, form),
                ActionOutcome::Deleted { .. } => println!("{}", render_roster(d.dashboard(), d.presentation(), termw)),
                ActionOutcome::Cancelled => println!("cancelled"),
                ActionOutcome::UnknownStudent(id) => println!("no student with id {} on the roster", id),
                ActionOutcome::NotAuthenticated => println!("not signed in"),
                ActionOutcome::Rejected | ActionOutcome::Failed(_) => {}
            }
        }
        Command::Add => {
            if let Some(form) = d.open_add_form() {
                edit_and_submit(rt, rl, d, form);
            } else if d.session().is_none() {
                println!("not signed in");
            }
        }
        Command::History => match rt.block_on(d.show_login_history()) {
            HistoryOutcome::Loaded(list) => println!("{}", render_login_history(&list, termw)),
            HistoryOutcome::NotAuthenticated => println!("not signed in"),
            HistoryOutcome::Rejected | HistoryOutcome::Failed(_) => {}
        },
        Command::Status => println!("{}", status_text(d)),
        Command::Dismiss => d.dismiss_notice(),
        Command::Reload => {
            if rt.block_on(d.reload()).is_some() {
                println!("{}", render_roster(d.dashboard(), d.presentation(), termw));
            } else {
                println!("no saved session");
            }
        }
    }
    true
}

pub fn run_repl(rt: tokio::runtime::Runtime, mut dispatcher: Dispatcher) -> Result<()> {
    let mut rl = DefaultEditor::new().context("failed to initialise line editor")?;
    println!("studentdesk console. Type 'help' for commands.");

    if rt.block_on(dispatcher.restore_session()).is_some() {
        println!("{}", render_roster(dispatcher.dashboard(), dispatcher.presentation(), get_terminal_width()));
    }

    let mut shown_seq = dispatcher.notice_seq();
    loop {
        let line = match rl.readline(&prompt_for(&dispatcher)) {
            Ok(l) => l,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(anyhow!("reading console input: {}", e)),
        };
        let line = line.trim();
        if line.is_empty() { continue; }
        if keeps_history(line) {
            let _ = rl.add_history_entry(line);
        }

        let keep_going = match Command::from_str(line) {
            Ok(cmd) => execute(&rt, &mut rl, &mut dispatcher, cmd),
            Err(e) => {
                eprintln!("{}", e);
                true
            }
        };
        if let Some(n) = notice_to_echo(&dispatcher, &mut shown_seq) {
            println!("{}", render_notice(n));
        }
        if !keep_going { break; }
    }

    dispatcher.end_browsing_context();
    Ok(())
}
