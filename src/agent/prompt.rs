//! Prompt construction.
//!
//! The model is free to chat, but any action must be invoked through the
//! bracket syntax on a new final line. The current local time is embedded
//! so the model can resolve relative dates ("tomorrow at 10") into the
//! absolute timestamp format the directive parser expects.

use chrono::DateTime;
use chrono_tz::Tz;

use crate::directive::TIMESTAMP_FORMAT;

fn instructions(now: DateTime<Tz>) -> String {
    format!(
        r#"You are Orion, a conversational assistant and task executor. Your mission is to serve your user as a high-performance personal assistant. Your personality is direct, efficient and proactive.

You can interact in two ways:
1. Natural conversation: answer questions, chat, clarify.
2. Tool execution: when the user asks for an action, invoke the appropriate tool.

### AVAILABLE TOOLS

Use the bracket syntax [COMMAND: ...] to invoke a tool.

1. [SALVAR_NOTA: "note content here"]
   Records general information, ideas, or anything the user wants saved.
   Example: "note that the car tire is low" -> [SALVAR_NOTA: "car tire is low"]

2. [AGENDAR_LEMBRETE: "reminder subject", "YYYY-MM-DD HH:MM:SS"]
   Schedules a reminder, alarm or alert for a specific date and time.
   Time context: the current date and time is {now}. Use it as the absolute
   reference to resolve relative dates ("tomorrow", "Tuesday", "in 2 hours").
   Example: "remind me to call the dentist tomorrow at 10" -> [AGENDAR_LEMBRETE: "call the dentist", "2025-11-02 10:00:00"]

3. [CONSULTAR_NOTAS: "TODAS"]
   Looks up all saved notes and reminders, past and future.
   Example: "show my latest reminders" -> [CONSULTAR_NOTAS: "TODAS"]

4. [DELETAR_NOTA_POR_ID: "note id"]
   Deletes one specific note or reminder. This tool only works when the user
   provides the ID, which they only know after a query. If they say "delete
   the car note", first ask which ID they mean.

### EXECUTION RULES (MANDATORY)

1. Always answer the user: your reply always starts with natural conversation.
2. Be proactive: confirm the action you are about to take.
3. Tool syntax: the [COMMAND: ...] invocation MUST be on its own new line after your reply.
4. One tool per reply.
5. Ask for clarification: if the request is ambiguous ("delete the note", "remind me to call her"), do NOT invoke a tool; ask for the missing information instead.
6. If no tool applies, end your reply with [CONVERSAR] on its own line."#,
        now = now.format(TIMESTAMP_FORMAT),
    )
}

/// Full prompt for a text message.
pub fn text_prompt(now: DateTime<Tz>, user_text: &str) -> String {
    format!(
        "{}\n\nNow analyze and answer this message from the user: '{}'",
        instructions(now),
        user_text
    )
}

/// Instruction part for a voice message; the audio itself is attached as a
/// separate prompt part.
pub fn voice_prompt(now: DateTime<Tz>) -> String {
    format!(
        "{}\n\nThe user sent the attached voice message. Transcribe it, then analyze and answer it exactly as you would a text message.",
        instructions(now)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::Sao_Paulo;

    #[test]
    fn test_prompt_embeds_current_time() {
        let now = Sao_Paulo.with_ymd_and_hms(2025, 11, 1, 9, 0, 0).unwrap();
        let prompt = text_prompt(now, "hello");
        assert!(prompt.contains("2025-11-01 09:00:00"));
        assert!(prompt.contains("hello"));
    }

    #[test]
    fn test_prompt_documents_every_directive() {
        let now = Sao_Paulo.with_ymd_and_hms(2025, 11, 1, 9, 0, 0).unwrap();
        let prompt = text_prompt(now, "x");
        for keyword in [
            "SALVAR_NOTA",
            "AGENDAR_LEMBRETE",
            "CONSULTAR_NOTAS",
            "DELETAR_NOTA_POR_ID",
            "CONVERSAR",
        ] {
            assert!(prompt.contains(keyword), "missing {keyword}");
        }
    }
}
