//! Terminal output formatting.

use colored::Colorize;
use lain_core::{BroadcastMessage, StatusReport};
use lain_viewer::{presentation, Caption};

/// Prints each line in its mood's color.
pub struct TerminalCaption;

impl Caption for TerminalCaption {
    fn show(&self, message: &BroadcastMessage) {
        print_line(message);
    }
}

pub fn print_line(message: &BroadcastMessage) {
    let look = presentation(message.mood);
    println!(
        "{} {} {}",
        message.created_at.format("%H:%M:%S").to_string().dimmed(),
        format!("[{}]", look.label).color(look.color),
        message.text.color(look.color).bold()
    );
}

pub fn print_status(base: &str, status: &StatusReport, inference_reachable: bool) {
    println!("{} {}", "Lain.TV".magenta().bold(), base.dimmed());
    println!();
    println!("{}: {}", "Viewers".bold(), status.active_session_count);
    println!(
        "{}: {}",
        "Generating".bold(),
        if status.generating { "yes".yellow() } else { "no".normal() }
    );
    match status.last_broadcast_at {
        Some(at) => println!("{}: {}", "Last broadcast".bold(), at.to_rfc3339()),
        None => println!("{}: {}", "Last broadcast".bold(), "never".dimmed()),
    }
    println!(
        "{}: {}",
        "Inference".bold(),
        if inference_reachable { "reachable".green() } else { "unreachable".red() }
    );
}
