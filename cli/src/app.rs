use agrigrok_core::quick::find_quick_question;
use agrigrok_core::serial::{BridgeEvent, DeviceCommand, DeviceEvent, SerialBridge};
use agrigrok_core::session::{SessionSnapshot, save_session};
use agrigrok_core::speech::Speaker;
use agrigrok_core::{AgriConfig, Assistant, Dispatcher, Reply};
use anyhow::{Context, Result};
use chrono::Local;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, error, info, warn};

use crate::output::{
    CLEARED, WELCOME, print_answer, print_bot_message, print_context, print_help,
    print_quick_questions, print_status, print_user_message,
};

type InputLines = Lines<BufReader<Stdin>>;

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// Runs a single query, waiting for the answer with a spinner
pub async fn run_single_query(
    prompt: &str,
    assistant: &Assistant,
    speaker: Option<&Speaker>,
) -> Result<()> {
    info!("Running single query");

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner} {msg}")
            .context("Invalid spinner template")?,
    );
    spinner.set_message("🤖 AgriGrok is analyzing your farming question...");
    spinner.enable_steady_tick(Duration::from_millis(120));

    let result = assistant.ask(prompt).await;
    spinner.finish_and_clear();

    match result {
        Ok(answer) => {
            print_answer(&answer);
            if let Some(speaker) = speaker {
                if speaker.speak(&answer.summary) {
                    while speaker.is_speaking() {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                }
            }
            Ok(())
        }
        Err(e) => {
            error!("Query failed: {}", e);
            print_bot_message(&e.user_message());
            Err(e.into())
        }
    }
}

/// State of the interactive front end
struct ChatSession {
    config: AgriConfig,
    dispatcher: Dispatcher,
    speaker: Speaker,
    speech_enabled: bool,
    serial: Option<SerialBridge>,
    in_flight: usize,
}

impl ChatSession {
    fn assistant(&self) -> &Arc<Assistant> {
        self.dispatcher.assistant()
    }

    fn submit(&mut self, question: &str) {
        print_user_message(question);
        let id = self.dispatcher.submit(question);
        self.in_flight += 1;
        debug!("Submitted request #{} ({} in flight)", id, self.in_flight);
        print_status("🤖 AgriGrok is analyzing your farming question...");
        self.send_to_device(DeviceCommand::Status("Thinking...".to_string()));
    }

    fn send_to_device(&self, command: DeviceCommand) {
        if let Some(bridge) = &self.serial {
            if bridge.is_connected() {
                if let Err(e) = bridge.send(command) {
                    warn!("{}", e);
                }
            }
        }
    }

    fn handle_reply(&mut self, reply: Reply) {
        self.in_flight = self.in_flight.saturating_sub(1);
        debug!("Reply #{} for {:?}", reply.id, reply.question);

        match reply.outcome {
            Ok(answer) => {
                print_answer(&answer);
                if self.speech_enabled && !self.speaker.speak(&answer.summary) {
                    debug!("Speech busy, summary not spoken");
                }
                self.send_to_device(DeviceCommand::Response(answer.summary));
            }
            Err(message) => {
                print_bot_message(&message);
                self.send_to_device(DeviceCommand::Status("Error".to_string()));
            }
        }

        if self.in_flight == 0 {
            print_status("✅ Ready for your next farming question!");
        }
    }

    fn handle_bridge_event(&mut self, event: BridgeEvent) {
        match event {
            BridgeEvent::Connected => {
                let path = self.serial.as_ref().map(|b| b.path()).unwrap_or_default();
                print_status(&format!("🔌 Display connected on {}", path));
            }
            BridgeEvent::LinkDown => print_status("🔌 Display link lost, reconnecting..."),
            BridgeEvent::Device(DeviceEvent::ButtonPressed(name)) => {
                let target = self.config.button_target(&name).to_string();
                match find_quick_question(&target) {
                    Some(question) => {
                        let text = question.text(&self.assistant().field_context());
                        self.submit(&text);
                    }
                    None => warn!("Button {} is not bound to a quick question", name),
                }
            }
            BridgeEvent::Device(DeviceEvent::ArduinoReady) => {
                print_status("🔌 Display ready");
            }
            BridgeEvent::Device(DeviceEvent::ShieldMounted) => {
                print_status("🔌 Display shield mounted");
            }
            BridgeEvent::Device(other) => debug!("Ignoring device event {:?}", other),
        }
    }

    async fn handle_input(&mut self, input: &str, lines: &mut InputLines) -> Result<Flow> {
        if input.is_empty() {
            return Ok(Flow::Continue);
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            return Ok(Flow::Exit);
        }

        let Some(command) = input.strip_prefix('/') else {
            self.submit(input);
            return Ok(Flow::Continue);
        };

        let (name, argument) = match command.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };

        match name.to_lowercase().as_str() {
            "help" => print_help(),
            "quick" if argument.is_empty() => {
                print_quick_questions(&self.assistant().field_context());
            }
            "quick" => match find_quick_question(argument) {
                Some(question) => {
                    let text = question.text(&self.assistant().field_context());
                    self.submit(&text);
                }
                None => print_status(&format!("No quick question {:?}. Try /quick", argument)),
            },
            "clear" => {
                if confirm("Are you sure you want to clear the conversation?", lines).await? {
                    self.assistant().clear_conversation();
                    print_bot_message(CLEARED);
                }
            }
            "save" => self.save(),
            "context" => print_context(&self.assistant().field_context()),
            "speak" => match argument.to_lowercase().as_str() {
                "on" => {
                    self.speech_enabled = true;
                    print_status(&format!("🔊 Speech on ({})", self.speaker.engine()));
                }
                "off" => {
                    self.speech_enabled = false;
                    print_status("🔇 Speech off");
                }
                _ => print_status("Usage: /speak on|off"),
            },
            other => print_status(&format!("Unknown command /{}. Type /help", other)),
        }
        Ok(Flow::Continue)
    }

    fn save(&self) {
        let context = self.assistant().field_context();
        let snapshot = SessionSnapshot {
            saved_at: Local::now(),
            conversation: self.assistant().conversation().turns().to_vec(),
            location: context.location,
            weather: context.weather,
            speech_enabled: self.speech_enabled,
            serial_connected: self.serial.as_ref().is_some_and(|b| b.is_connected()),
        };

        match save_session(&self.config.save_dir(), &snapshot) {
            Ok(path) => print_status(&format!("💾 Conversation saved to {}", path.display())),
            Err(e) => {
                error!("Save failed: {}", e);
                print_bot_message(&e.user_message());
            }
        }
    }
}

async fn confirm(question: &str, lines: &mut InputLines) -> Result<bool> {
    println!("{} {}", question.yellow(), "(y/N)".dimmed());
    let answer = lines
        .next_line()
        .await
        .context("Failed to read input")?
        .unwrap_or_default();
    Ok(matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes"
    ))
}

async fn next_bridge_event(
    events: &mut Option<UnboundedReceiver<BridgeEvent>>,
) -> Option<BridgeEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Runs the interactive transcript until the user leaves or stdin closes
pub async fn run_interactive_chat(assistant: Arc<Assistant>, config: AgriConfig) -> Result<()> {
    let (dispatcher, mut replies) = Dispatcher::new(assistant);

    let (serial, mut bridge_events) = if config.serial_enabled() {
        let (tx, rx) = mpsc::unbounded_channel();
        let bridge = SerialBridge::start(config.serial_port(), config.serial_baud(), tx);
        (Some(bridge), Some(rx))
    } else {
        (None, None)
    };

    let mut session = ChatSession {
        speaker: Speaker::new(config.speech_engine()),
        speech_enabled: config.speech_enabled(),
        config,
        dispatcher,
        serial,
        in_flight: 0,
    };

    print_bot_message(WELCOME);
    print_status("Type a question, /help for commands, or 'exit' to leave.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };
                if session.handle_input(line.trim(), &mut lines).await? == Flow::Exit {
                    break;
                }
            }
            Some(reply) = replies.recv() => session.handle_reply(reply),
            Some(event) = next_bridge_event(&mut bridge_events) => session.handle_bridge_event(event),
        }
    }

    println!("👋 Happy farming!");
    Ok(())
}
