/*
 * Copyright (c) 2022, david072
 *
 * SPDX-License-Identifier: Apache-2.0
 */

use std::io::{stdin, stdout, Write};
use std::sync::Arc;

use calculator::{
    install_crash_reporter, unit_label, Action, AngleMode, Calculator, Category, Constant, Currencies,
    FileStorage, HttpRatesProvider, MemoryOp, MemoryStorage, Mode, Operator, RateStatus, ScientificFunction,
    Settings, Storage,
};
use clap::{Arg, ArgAction, Command as App};
use colored::Colorize;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const NAME: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");
const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

const HELP: &str = "\
Keys (separate with spaces, e.g. `12 + 7 =`):
  0-9 .              digits
  + - * /  =         operators, equals
  ac ce del neg %    all clear, clear entry, backspace, sign, percent
  mc mr m+ m-        memory
  pi e               constants
  sin cos tan asin acos atan sqrt cbrt sq cube log ln exp10 exp fact
  2nd angle deg rad  second function shift, DEG/RAD toggle or select
  normal sci conv    switch mode
  theme              toggle light/dark
Converter:
  cat <category>     currency, length, mass, temperature
  from <unit>        to <unit>        units
History:
  history            history clear    use <n>
Settings:
  :get <path>        :set <path> <value>    (angle, theme, rates.fetch, rates.url)
quit | exit";

/// What a single word on the prompt asks for
enum Command {
    Actions(Vec<Action>),
    ShowHistory,
    ShowUnits,
    Help,
    Quit,
}

fn main() {
    install_crash_reporter();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let matches = App::new(NAME)
        .about(DESCRIPTION)
        .version(VERSION)
        .author(AUTHORS)
        .arg(Arg::new("no_fetch")
            .long("no-fetch")
            .help("Don't fetch the latest currency rates, use the cached or bundled ones")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("ephemeral")
            .long("ephemeral")
            .help("Keep history, memory and theme in memory only")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("angle")
            .short('a')
            .long("angle")
            .help("Angle mode to start in. One of 'deg', 'rad'")
            .action(ArgAction::Set))
        .arg(Arg::new("mode")
            .short('m')
            .long("mode")
            .help("Mode to start in. One of 'normal', 'scientific', 'converter'")
            .action(ArgAction::Set)
            .default_value("normal"))
        .get_matches();

    let mut settings = Settings::load_default();
    if matches.get_flag("no_fetch") { settings.rates.fetch = false; }
    if let Some(angle) = matches.get_one::<String>("angle") {
        match angle.parse::<AngleMode>() {
            Ok(angle) => settings.angle = angle,
            Err(e) => eprintln!("{}: {e}", "Error".red()),
        }
    }

    let storage: Box<dyn Storage> = if matches.get_flag("ephemeral") {
        Box::new(MemoryStorage::new())
    } else {
        match FileStorage::open_default() {
            Ok(storage) => Box::new(storage),
            Err(e) => {
                warn!("Falling back to in-memory storage: {e}");
                Box::new(MemoryStorage::new())
            }
        }
    };

    let currencies = if settings.rates.fetch {
        Currencies::new_with_update(Arc::new(HttpRatesProvider::new(settings.rates.url.clone())))
    } else {
        Arc::new(Currencies::load_cached())
    };

    let mut calculator = Calculator::new(settings, storage, currencies);
    if let Some(mode) = matches.get_one::<String>("mode") {
        match mode.parse::<Mode>() {
            Ok(mode) => { calculator.dispatch(Action::SetMode(mode)); }
            Err(e) => eprintln!("{}: {e}", "Error".red()),
        }
    }

    println!("{} {} (type `help` for the list of keys)", NAME.bold(), VERSION);
    print_display(&calculator);

    loop {
        print!("> ");
        let _ = stdout().flush();

        let mut input = String::new();
        match stdin().read_line(&mut input) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }

        if !run_line(&mut calculator, input.trim()) { break; }
    }
}

/// Applies every word of `line`. Returns `false` if the user asked to quit.
fn run_line(calculator: &mut Calculator, line: &str) -> bool {
    let mut words = line.split_whitespace();
    let mut show_display = false;

    while let Some(word) = words.next() {
        let command = match word {
            ":get" => {
                get_setting(calculator, words.next());
                continue;
            }
            ":set" => {
                let path = words.next();
                let value = words.next();
                set_setting(calculator, path, value);
                continue;
            }
            "history" if words.clone().next() == Some("clear") => {
                words.next();
                Command::Actions(vec![Action::ClearHistory])
            }
            "use" => match words.next().and_then(|n| n.parse::<usize>().ok()) {
                Some(n) if n > 0 => Command::Actions(vec![Action::RecallHistory(n - 1)]),
                _ => {
                    eprintln!("{}: expected a history entry number", "Error".red());
                    continue;
                }
            },
            "cat" => match words.next().map(|c| c.parse::<Category>()) {
                Some(Ok(category)) => Command::Actions(vec![Action::SetCategory(category)]),
                Some(Err(e)) => {
                    eprintln!("{}: {e}", "Error".red());
                    continue;
                }
                None => {
                    eprintln!("{}: expected a category", "Error".red());
                    continue;
                }
            },
            "from" | "to" => {
                let Some(unit) = words.next().and_then(|u| find_unit(calculator.state().converter.category, u)) else {
                    eprintln!("{}: unknown unit, see `units`", "Error".red());
                    continue;
                };
                if word == "from" {
                    Command::Actions(vec![Action::SetFromUnit(unit.to_owned())])
                } else {
                    Command::Actions(vec![Action::SetToUnit(unit.to_owned())])
                }
            }
            word => match parse_key(calculator, word) {
                Some(command) => command,
                None => {
                    eprintln!("{}: unknown key \"{word}\"", "Error".red());
                    continue;
                }
            },
        };

        match command {
            Command::Actions(actions) => {
                for action in actions { calculator.dispatch(action); }
                show_display = true;
            }
            Command::ShowHistory => print_history(calculator),
            Command::ShowUnits => print_units(calculator),
            Command::Help => println!("{HELP}"),
            Command::Quit => return false,
        }
    }

    if show_display { print_display(calculator); }
    true
}

fn find_unit(category: Category, name: &str) -> Option<&'static str> {
    category.units().iter().copied().find(|unit| unit.eq_ignore_ascii_case(name))
}

/// Maps a key name to a command. Digits go to the keypad of the current mode.
fn parse_key(calculator: &Calculator, word: &str) -> Option<Command> {
    let state = calculator.state();
    let converter = state.mode == Mode::Converter;

    if word.chars().all(|c| c.is_ascii_digit() || c == '.') {
        // every digit of a number is one key press
        let digits = word.chars()
            .map(|c| if converter { Action::ConverterDigit(c) } else { Action::Digit(c) })
            .collect();
        return Some(Command::Actions(digits));
    }

    let action = match word {
        "quit" | "exit" => return Some(Command::Quit),
        "help" => return Some(Command::Help),
        "history" => return Some(Command::ShowHistory),
        "units" => return Some(Command::ShowUnits),
        "=" => Action::Equals,
        "ac" | "ce" if converter => Action::ConverterClear,
        "del" if converter => Action::ConverterBackspace,
        "ac" => Action::AllClear,
        "ce" => Action::ClearEntry,
        "del" => Action::Backspace,
        "neg" => Action::ToggleSign,
        "%" => Action::Percent,
        "mc" => Action::Memory(MemoryOp::Clear),
        "mr" => Action::Memory(MemoryOp::Recall),
        "m+" => Action::Memory(MemoryOp::Add),
        "m-" => Action::Memory(MemoryOp::Subtract),
        "pi" => Action::Constant(Constant::Pi),
        "e" => Action::Constant(Constant::E),
        "2nd" => Action::ToggleShift,
        "angle" => Action::ToggleAngleMode,
        "deg" | "rad" => {
            let wanted = word.parse::<AngleMode>().ok()?;
            if state.angle_mode == wanted { return Some(Command::Actions(Vec::new())); }
            Action::ToggleAngleMode
        }
        "theme" => Action::ToggleTheme,
        word => {
            if let Ok(op) = word.parse::<Operator>() {
                Action::Operator(op)
            } else if let Ok(mode) = word.parse::<Mode>() {
                Action::SetMode(mode)
            } else {
                let function = word.parse::<ScientificFunction>().ok()?;
                Action::Function(if state.shift { function.shifted() } else { function })
            }
        }
    };

    Some(Command::Actions(vec![action]))
}

fn get_setting(calculator: &Calculator, path: Option<&str>) {
    let Some(path) = path else {
        eprintln!("{}: expected a setting", "Error".red());
        return;
    };
    match calculator.settings.get_path(path) {
        Ok(value) => println!("{path} = {value}"),
        Err(e) => eprintln!("{}: {e}", "Error".red()),
    }
}

fn set_setting(calculator: &mut Calculator, path: Option<&str>, value: Option<&str>) {
    let (Some(path), Some(value)) = (path, value) else {
        eprintln!("{}: expected a setting and a value", "Error".red());
        return;
    };
    if let Err(e) = calculator.settings.set_path(path, value) {
        eprintln!("{}: {e}", "Error".red());
        return;
    }
    match calculator.settings.save_default() {
        Ok(()) => println!("{path} = {value} {}", "(applies on next start)".dimmed()),
        Err(e) => eprintln!("{}: {e}", "Error".red()),
    }
}

fn print_history(calculator: &Calculator) {
    let history = &calculator.state().history;
    if history.is_empty() {
        println!("{}", "No history yet".dimmed());
        return;
    }
    for (i, entry) in history.iter().enumerate() {
        println!("{:>3}  {entry}", (i + 1).to_string().dimmed());
    }
}

fn print_units(calculator: &Calculator) {
    let category = calculator.state().converter.category;
    let units = category.units().iter().map(|unit| unit_label(category, unit)).collect::<Vec<_>>();
    println!("{category}: {}", units.join(", "));
}

fn print_display(calculator: &Calculator) {
    let state = calculator.state();

    if state.mode == Mode::Converter {
        let converter = &state.converter;
        let mut header = format!("[{}]", converter.category);
        if converter.category == Category::Currency && calculator.rate_status() != RateStatus::Idle {
            header += &format!(" {}", calculator.rate_status());
        }
        println!("{}", header.dimmed());

        let output = match calculator.converter_output() {
            Ok(Some(output)) => output.normal(),
            Ok(None) => "...".dimmed(),
            Err(e) => format!("Error ({e})").red(),
        };
        println!("  {}: {}", unit_label(converter.category, &converter.from_unit), converter.input);
        println!("  {}: {}", unit_label(converter.category, &converter.to_unit), output);
        return;
    }

    let mut flags = Vec::new();
    if state.memory != 0.0 && !state.is_error() { flags.push("M".to_owned()); }
    if state.mode == Mode::Scientific {
        if state.shift { flags.push("2nd".to_owned()); }
        flags.push(state.angle_mode.to_string());
    }
    let operation = if state.is_error() { String::new() } else { state.display_operation() };
    if !flags.is_empty() || !operation.is_empty() {
        println!("{} {}", flags.join(" ").cyan(), operation.dimmed());
    }

    match &state.error {
        Some(e) => println!("{}: {}", "Error".red(), e.to_string().red()),
        None => println!("= {}", state.current_operand.bold()),
    }
}
