use agrigrok_core::quick::QUICK_QUESTIONS;
use agrigrok_core::{Answer, FieldContext};
use chrono::Local;
use colored::*;
use pulldown_cmark::{Event as MdEvent, HeadingLevel, Options, Parser as MdParser, Tag};

const BOT_LABEL: &str = "🤖 AgriGrok";
const USER_LABEL: &str = "👨‍🌾 You";

pub const WELCOME: &str = "🌾 Welcome to AgriGrok! I'm your AI farming assistant ready to help with crops, pests, \
irrigation, weather planning, and more. How can I help you today? 🚜";
pub const CLEARED: &str = "🌾 Chat cleared! How can I help you with farming today? 🚜";

fn timestamp() -> ColoredString {
    format!("[{}]", Local::now().format("%H:%M:%S")).dimmed()
}

/// Indent continuation lines under the speaker label
fn indent(message: &str) -> String {
    message.trim_end().replace('\n', "\n    ")
}

pub fn print_bot_message(message: &str) {
    println!(
        "{} {}: {}\n",
        timestamp(),
        BOT_LABEL.green().bold(),
        indent(message)
    );
}

pub fn print_user_message(message: &str) {
    println!(
        "{} {}: {}\n",
        timestamp(),
        USER_LABEL.blue().bold(),
        indent(message)
    );
}

pub fn print_status(message: &str) {
    println!("{}", message.dimmed());
}

/// Print a full answer followed by its one-line summary
pub fn print_answer(answer: &Answer) {
    print_bot_message(&render_markdown(&answer.full_response));
    let source = if answer.from_cache { " (cached)" } else { "" };
    println!(
        "    {}{} {}\n",
        "Summary".yellow().bold(),
        source.dimmed(),
        answer.summary.italic()
    );
}

pub fn print_help() {
    println!("{}", "Commands:".yellow().bold());
    println!("  {}          Show this help", "/help".green());
    println!("  {}         List quick questions", "/quick".green());
    println!("  {}  Ask a quick question by number or id", "/quick <n|id>".green());
    println!("  {}         Clear the conversation", "/clear".green());
    println!("  {}          Save the conversation to a file", "/save".green());
    println!("  {}       Show location and weather", "/context".green());
    println!("  {}  Toggle reading summaries aloud", "/speak on|off".green());
    println!("  {}     Leave AgriGrok", "exit | quit".green());
    println!();
}

pub fn print_quick_questions(context: &FieldContext) {
    println!("{}", "🚀 Quick Questions:".yellow().bold());
    for (i, question) in QUICK_QUESTIONS.iter().enumerate() {
        println!(
            "  {} {:<24} {}",
            format!("{}.", i + 1).cyan(),
            question.label,
            question.text(context).dimmed()
        );
    }
    println!();
}

pub fn print_context(context: &FieldContext) {
    match &context.location {
        Some(loc) => println!(
            "📍 {}, {} ({:.2}, {:.2})",
            loc.city, loc.country, loc.latitude, loc.longitude
        ),
        None => println!("📍 Location unknown"),
    }
    match &context.weather {
        Some(weather) => {
            println!(
                "🌡️  {:.1}°C, {:.0}% humidity",
                weather.temperature_c, weather.humidity_percent
            );
            let forecast = &weather.forecast;
            for (i, date) in forecast.dates.iter().enumerate() {
                if let (Some(max), Some(min), Some(rain)) = (
                    forecast.max_temperature_c.get(i),
                    forecast.min_temperature_c.get(i),
                    forecast.precipitation_mm.get(i),
                ) {
                    println!("   {}  {:.0}-{:.0}°C  {:.1} mm", date, min, max, rain);
                }
            }
        }
        None => println!("🌡️  Weather unavailable"),
    }
    println!();
}

/// Render markdown for the terminal
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let mut output = String::new();
    let mut strong = 0usize;
    let mut lists: Vec<Option<u64>> = Vec::new();

    for event in MdParser::new_ext(markdown, options) {
        match event {
            MdEvent::Start(Tag::Heading(level, ..)) => {
                if !output.is_empty() {
                    output.push('\n');
                }
                if level == HeadingLevel::H1 {
                    output.push_str(&format!("{} ", "##".bright_cyan().bold()));
                }
                strong += 1;
            }
            MdEvent::End(Tag::Heading(..)) => {
                strong = strong.saturating_sub(1);
                output.push('\n');
            }
            MdEvent::Start(Tag::Paragraph) => {
                if lists.is_empty() && !output.is_empty() && !output.ends_with("\n\n") {
                    output.push('\n');
                }
            }
            MdEvent::End(Tag::Paragraph) => {
                if lists.is_empty() {
                    output.push('\n');
                }
            }
            MdEvent::Start(Tag::List(start)) => {
                if lists.is_empty() && !output.is_empty() && !output.ends_with('\n') {
                    output.push('\n');
                }
                lists.push(start);
            }
            MdEvent::End(Tag::List(_)) => {
                lists.pop();
            }
            MdEvent::Start(Tag::Item) => {
                let depth = lists.len().saturating_sub(1);
                output.push_str(&"  ".repeat(depth));
                match lists.last_mut() {
                    Some(Some(n)) => {
                        output.push_str(&format!("{} ", format!("{}.", n).yellow()));
                        *n += 1;
                    }
                    _ => output.push_str(&format!("{}  ", "•".yellow())),
                }
            }
            MdEvent::End(Tag::Item) => {
                if !output.ends_with('\n') {
                    output.push('\n');
                }
            }
            MdEvent::Start(Tag::Strong) => strong += 1,
            MdEvent::End(Tag::Strong) => strong = strong.saturating_sub(1),
            MdEvent::Start(Tag::CodeBlock(_)) | MdEvent::End(Tag::CodeBlock(_)) => {
                output.push('\n');
            }
            MdEvent::Text(text) => {
                if strong > 0 {
                    output.push_str(&text.bold().to_string());
                } else {
                    output.push_str(&text);
                }
            }
            MdEvent::Code(code) => output.push_str(&format!("`{}`", code.cyan())),
            MdEvent::SoftBreak => output.push(' '),
            MdEvent::HardBreak => output.push('\n'),
            MdEvent::Start(Tag::TableCell) => output.push_str("| "),
            MdEvent::End(Tag::TableCell) => output.push(' '),
            MdEvent::End(Tag::TableRow) | MdEvent::End(Tag::TableHead) => output.push('\n'),
            _ => {}
        }
    }

    output.trim_end().to_string()
}
