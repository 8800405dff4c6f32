//! Prompt composition.
//!
//! Block order is fixed: preamble, weather, conversation, question.

use crate::models::{ChatRequest, HistoryEntry, WeatherContext};

pub const SYSTEM_PREAMBLE: &str = "You are a friendly and knowledgeable weather assistant. \
Help users understand current conditions and forecasts, and give practical advice about \
clothing, travel and outdoor activities. Keep answers concise and conversational. \
When weather context is provided, base your answer on it. If a question is not about \
weather, answer briefly and helpfully.";

/// Build the full prompt for one request.
pub fn compose_prompt(request: &ChatRequest) -> String {
    let mut prompt = String::from(SYSTEM_PREAMBLE);

    if let Some(block) = request.weather_context.as_ref().and_then(weather_block) {
        prompt.push_str("\n\n");
        prompt.push_str(&block);
    }

    if let Some(block) = history_block(&request.conversation_history) {
        prompt.push_str("\n\n");
        prompt.push_str(&block);
    }

    prompt.push_str("\n\nUser question: ");
    prompt.push_str(&request.message);
    prompt
}

fn weather_block(weather: &WeatherContext) -> Option<String> {
    let location = weather.location()?;

    let mut block = format!("Current weather context:\n- Location: {}", location);
    if let Some(temperature) = &weather.temperature {
        block.push_str(&format!("\n- Temperature: {}°C", temperature));
    }
    if let Some(condition) = weather
        .condition
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
    {
        block.push_str(&format!("\n- Condition: {}", condition));
    }
    if let Some(observed_at) = weather.observed_at() {
        block.push_str(&format!("\n- Last updated: {}", observed_at));
    }

    Some(block)
}

fn history_block(history: &[HistoryEntry]) -> Option<String> {
    if history.is_empty() {
        return None;
    }

    let lines: Vec<String> = history
        .iter()
        .map(|entry| format!("{}: {}", entry.kind, entry.message))
        .collect();

    Some(format!("Conversation so far:\n{}", lines.join("\n")))
}
