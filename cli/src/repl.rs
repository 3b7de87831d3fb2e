//! Interactive chat loop: read stdin, stream the reply, repeat until EOF or quit.
//!
//! While only the greeting is shown, `/N` sends suggested question N.
//! Ctrl+C during a reply cancels that turn; at the prompt it ends the loop.

use std::future::Future;
use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};

use strategist::{ChatEvent, ChatSession, Labels, Transcript};

use crate::display::format_suggestions;

/// Runs the REPL until EOF (Ctrl+D), Ctrl+C at the prompt, or `quit`/`exit`/`/quit`.
pub async fn run_repl_loop(
    session: &ChatSession,
    labels: &Labels,
    suggestions: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut transcript = Transcript::with_greeting(&labels.chat_greeting, &labels.chat_error);
    let mut stdout = std::io::stdout();
    writeln!(stdout, "{}\n{}", labels.chat_title, transcript.last_text())?;
    if !suggestions.is_empty() {
        write!(
            stdout,
            "{}\n{}",
            labels.suggested_questions,
            format_suggestions(suggestions)
        )?;
    }

    let mut reader = BufReader::new(tokio::io::stdin()).lines();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let line = tokio::select! {
            line = reader.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let line = match line {
            None => break,
            Some(s) if is_quit_command(&s) => break,
            Some(s) => s,
        };
        let offered: &[String] = if transcript.shows_suggestions() {
            suggestions
        } else {
            &[]
        };
        let Some(text) = resolve_input(&line, offered) else {
            continue;
        };
        if offered.iter().any(|q| q == &text) {
            writeln!(stdout, "{}", text)?;
        }

        let interrupt = async {
            let _ = tokio::signal::ctrl_c().await;
        };
        stream_turn(session, &mut transcript, &text, &mut stdout, interrupt).await?;
    }

    writeln!(stdout)?;
    Ok(())
}

fn is_quit_command(s: &str) -> bool {
    let lower = s.trim().to_lowercase();
    matches!(lower.as_str(), "quit" | "exit" | "/quit")
}

/// Text to send for one input line, or `None` when there is nothing to send.
///
/// `/N` picks `suggestions[N - 1]`; anything else (including an out-of-range
/// `/N`) is sent as typed.
fn resolve_input(line: &str, suggestions: &[String]) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let picked = line
        .strip_prefix('/')
        .and_then(|n| n.parse::<usize>().ok())
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| suggestions.get(i));
    Some(picked.cloned().unwrap_or_else(|| line.to_string()))
}

enum Step {
    Interrupt,
    Event(Option<ChatEvent>),
}

/// Sends `text`, writes fragments to `out` as they arrive and feeds every event
/// to `transcript`. `interrupt` resolving cancels the turn.
async fn stream_turn<W, F>(
    session: &ChatSession,
    transcript: &mut Transcript,
    text: &str,
    out: &mut W,
    interrupt: F,
) -> std::io::Result<()>
where
    W: Write,
    F: Future<Output = ()>,
{
    if !transcript.begin_turn(text) {
        return Ok(());
    }
    tokio::pin!(interrupt);
    let mut interrupted = false;
    let mut printed = false;
    let mut stream = session.send_message(text).await;
    loop {
        let step = tokio::select! {
            biased;
            _ = &mut interrupt, if !interrupted => Step::Interrupt,
            event = stream.next() => Step::Event(event),
        };
        let event = match step {
            Step::Interrupt => {
                interrupted = true;
                stream.cancel();
                continue;
            }
            Step::Event(Some(event)) => event,
            Step::Event(None) => break,
        };
        transcript.apply(&event);
        match &event {
            ChatEvent::Fragment(fragment) => {
                write!(out, "{}", fragment)?;
                out.flush()?;
                printed = true;
            }
            ChatEvent::Done => writeln!(out)?,
            ChatEvent::Error(_) => {
                if printed {
                    writeln!(out)?;
                }
                writeln!(out, "{}", transcript.last_text())?;
            }
            ChatEvent::Cancelled => writeln!(out, " [cancelled]")?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use strategist::llm::{MockModel, MockStream};
    use strategist::ChatOptions;

    const GREETING: &str = "Halo!";
    const FALLBACK: &str = "Maaf, saya mengalami kesalahan. Silakan coba lagi.";

    fn suggestions() -> Vec<String> {
        vec!["How to price?".to_string(), "Which channel?".to_string()]
    }

    #[test]
    fn is_quit_command_matches_expected_tokens() {
        assert!(is_quit_command("quit"));
        assert!(is_quit_command(" EXIT "));
        assert!(is_quit_command("/quit"));
        assert!(!is_quit_command("continue"));
    }

    #[test]
    fn resolve_input_picks_suggestion_by_number() {
        let s = suggestions();
        assert_eq!(resolve_input("/2", &s).as_deref(), Some("Which channel?"));
        assert_eq!(resolve_input(" /1 ", &s).as_deref(), Some("How to price?"));
        assert_eq!(resolve_input("/3", &s).as_deref(), Some("/3"));
        assert_eq!(resolve_input("/0", &s).as_deref(), Some("/0"));
        assert_eq!(resolve_input("/1", &[]).as_deref(), Some("/1"));
        assert_eq!(resolve_input("   ", &s), None);
        assert_eq!(resolve_input("hello", &s).as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn stream_turn_writes_fragments_as_they_arrive() {
        let model = Arc::new(MockModel::with_text("unused").with_streams([MockStream::Fragments(
            vec!["Hal".into(), "o ".into(), "there".into()],
        )]));
        let session = ChatSession::new(model, ChatOptions::default());
        let mut transcript = Transcript::with_greeting(GREETING, FALLBACK);
        let mut out = Vec::new();

        stream_turn(&session, &mut transcript, "Hi", &mut out, std::future::pending())
            .await
            .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "Halo there\n");
        assert_eq!(transcript.last_text(), "Halo there");
        assert!(!transcript.shows_suggestions());
    }

    #[tokio::test]
    async fn stream_turn_prints_fallback_on_failure() {
        let model = Arc::new(MockModel::with_text("unused").with_streams([MockStream::FailAfter(
            vec!["par".into()],
            "connection reset".into(),
        )]));
        let session = ChatSession::new(model, ChatOptions::default());
        let mut transcript = Transcript::with_greeting(GREETING, FALLBACK);
        let mut out = Vec::new();

        stream_turn(&session, &mut transcript, "Hi", &mut out, std::future::pending())
            .await
            .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), format!("par\n{}\n", FALLBACK));
        assert_eq!(transcript.last_text(), FALLBACK);
    }

    #[tokio::test]
    async fn interrupt_cancels_the_turn() {
        let model = Arc::new(MockModel::with_text("slow").with_delay(Duration::from_secs(30)));
        let session = ChatSession::new(model, ChatOptions::default());
        let mut transcript = Transcript::with_greeting(GREETING, FALLBACK);
        let mut out = Vec::new();

        tokio::time::timeout(
            Duration::from_secs(5),
            stream_turn(&session, &mut transcript, "Hi", &mut out, std::future::ready(())),
        )
        .await
        .expect("cancel ends the turn")
        .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), " [cancelled]\n");
        assert!(!transcript.is_streaming());
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn blank_text_sends_nothing() {
        let model = Arc::new(MockModel::with_text("reply"));
        let session = ChatSession::new(model.clone(), ChatOptions::default());
        let mut transcript = Transcript::with_greeting(GREETING, FALLBACK);
        let mut out = Vec::new();

        stream_turn(&session, &mut transcript, "  ", &mut out, std::future::pending())
            .await
            .unwrap();

        assert!(out.is_empty());
        assert_eq!(model.call_count(), 0);
        assert_eq!(transcript.messages().len(), 1);
    }
}
