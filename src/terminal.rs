//! Line-oriented presenter for the `grace` binary
//!
//! Every control the conversation offers is printed as a numbered menu
//! entry. The input loop asks the presenter what a number refers to and
//! which field is waiting for typed text.

use crate::gateway::Recipe;
use crate::presenter::{card_image, Choice, ExpandControl, FailureKind, Presenter};
use crate::state_machine::{FieldName, UserAction};
use std::io::Write;
use std::sync::Mutex;

/// What a menu number stands for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuItem {
    Option { field: FieldName, label: String },
    Card { id: String },
    Choice(Choice),
}

#[derive(Debug, Default)]
struct Screen {
    menu: Vec<MenuItem>,
    /// Field that plain typed text answers
    prompted: Option<FieldName>,
}

pub struct TerminalPresenter<W> {
    out: Mutex<W>,
    screen: Mutex<Screen>,
}

impl TerminalPresenter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> TerminalPresenter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            screen: Mutex::new(Screen::default()),
        }
    }

    /// Menu entry for a 1-based number as printed
    pub fn menu_item(&self, number: usize) -> Option<MenuItem> {
        let screen = self.screen.lock().ok()?;
        number
            .checked_sub(1)
            .and_then(|i| screen.menu.get(i))
            .cloned()
    }

    pub fn prompted_field(&self) -> Option<FieldName> {
        self.screen.lock().ok().and_then(|s| s.prompted)
    }

    fn write_lines<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let Ok(mut out) = self.out.lock() else {
            return;
        };
        for line in lines {
            if writeln!(out, "{}", line.as_ref()).is_err() {
                return;
            }
        }
        let _ = out.flush();
    }

    fn update(&self, change: impl FnOnce(&mut Screen)) {
        if let Ok(mut screen) = self.screen.lock() {
            change(&mut screen);
        }
    }

    /// Replace the menu and print its entries
    fn show_menu(&self, items: Vec<MenuItem>, labels: Vec<String>) {
        self.write_lines(
            labels
                .iter()
                .enumerate()
                .map(|(i, label)| format!("  [{}] {label}", i + 1)),
        );
        self.update(|screen| screen.menu = items);
    }
}

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Quit,
    Voice(String),
    Action(UserAction),
    /// `:field value`
    Field { name: String, value: String },
    /// A number from the last menu
    Pick(usize),
    /// Anything else answers the prompted field
    Text(String),
    Help,
}

pub const HELP: &str = "Commands: <number> pick from the menu, :field value, /voice <words>, \
/open <id>, /expand, /back, /rate <1-5> [comment], /broaden, /retry, /start-over, /quit";

pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if let Ok(number) = line.parse::<usize>() {
        return Input::Pick(number);
    }
    if let Some(rest) = line.strip_prefix(':') {
        let (name, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        return Input::Field {
            name: name.to_string(),
            value: value.trim().to_string(),
        };
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Text(line.to_string());
    };
    let (verb, arg) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(verb, arg)| (verb, arg.trim()));
    match verb {
        "quit" | "exit" => Input::Quit,
        "voice" => Input::Voice(arg.to_string()),
        "open" => Input::Action(UserAction::OpenRecipe {
            id: arg.to_string(),
        }),
        "expand" => Input::Action(UserAction::Expand),
        "back" => Input::Action(UserAction::BackToCards),
        "broaden" => Input::Action(UserAction::Broaden),
        "retry" => Input::Action(UserAction::Retry),
        "start-over" | "restart" => Input::Action(UserAction::StartOver),
        "rate" => {
            let (stars, comment) = arg.split_once(char::is_whitespace).unwrap_or((arg, ""));
            match stars.parse::<u32>() {
                Ok(rating) => Input::Action(UserAction::RateRecipe {
                    rating,
                    comment: comment.trim().to_string(),
                }),
                // "/rate lovely" is a comment without stars
                Err(_) => Input::Action(UserAction::RateRecipe {
                    rating: 0,
                    comment: arg.to_string(),
                }),
            }
        }
        _ => Input::Help,
    }
}

fn expand_hint(control: ExpandControl) -> Option<&'static str> {
    match control {
        ExpandControl::Hidden => None,
        ExpandControl::Available => Some("  /expand  View full recipe"),
        ExpandControl::Loading => Some("  Loading full recipe..."),
        ExpandControl::Failed => Some("  Could not load the full recipe. /expand to try again"),
    }
}

impl<W: Write + Send> Presenter for TerminalPresenter<W> {
    fn clear(&self) {
        self.update(|screen| *screen = Screen::default());
        self.write_lines(["", "----------------------------------------"]);
    }

    fn say(&self, text: &str) {
        self.write_lines([format!("Grace: {text}")]);
    }

    fn prompt_choice(&self, field: FieldName, options: &[String]) {
        let items = options
            .iter()
            .map(|label| MenuItem::Option {
                field,
                label: label.clone(),
            })
            .collect();
        self.show_menu(items, options.to_vec());
        self.update(|screen| screen.prompted = Some(field));
    }

    fn prompt_text(&self, field: FieldName, placeholder: &str) {
        self.update(|screen| screen.prompted = Some(field));
        self.write_lines([format!("  ({field}) {placeholder}")]);
    }

    fn set_loading(&self, loading: bool) {
        if loading {
            self.write_lines(["  ..."]);
        }
    }

    fn show_cards(&self, cards: &[Recipe]) {
        let items = cards
            .iter()
            .map(|card| MenuItem::Card {
                id: card.id.clone(),
            })
            .collect();
        let labels = cards
            .iter()
            .map(|card| format!("{} ({})\n      {}", card.name, card_image(card), card.short))
            .collect();
        self.show_menu(items, labels);
    }

    fn show_detail(&self, recipe: &Recipe, expand: ExpandControl) {
        let mut lines = vec![format!("== {} ==", recipe.name), "Ingredients:".to_string()];
        lines.extend(recipe.ingredients.iter().map(|i| format!("  - {i}")));
        lines.push("Instructions:".to_string());
        lines.extend(
            recipe
                .display_instructions()
                .iter()
                .enumerate()
                .map(|(n, step)| format!("  {}. {step}", n + 1)),
        );
        lines.extend(expand_hint(expand).map(String::from));
        lines.push("  /back  Back to recipes   /rate <1-5> [comment]".to_string());
        self.write_lines(lines);
    }

    fn hide_detail(&self) {
        self.write_lines([""]);
    }

    fn set_expand_control(&self, control: ExpandControl) {
        self.write_lines(expand_hint(control));
    }

    fn show_error(&self, failure: &FailureKind) {
        self.write_lines([format!("! {failure}")]);
    }

    fn offer_choices(&self, choices: &[Choice]) {
        let items = choices.iter().copied().map(MenuItem::Choice).collect();
        let labels = choices.iter().map(|c| c.label().to_string()).collect();
        self.show_menu(items, labels);
    }

    fn notice(&self, text: &str) {
        self.write_lines([format!("  * {text}")]);
    }
}
