use crate::ollama::ChatMessage;

const WEATHER_KEYWORDS: &[&str] = &[
    "వాతావరణం",
    "వర్షం",
    "weather",
    "rain",
    "పడుతుందా",
    "today",
    "tomorrow",
];

const ASSISTANT_PERSONA: &str = "మీరు తెలుగులో మాట్లాడే రైతులకు సహాయపడే సహాయకుడు.";
const ALWAYS_TELUGU: &str = "ఎప్పుడూ తెలుగులో సమాధానం ఇవ్వండి.";
const USE_WEATHER: &str = "వాతావరణం గురించి అడిగితే, క్రింది వాస్తవిక వాతావరణ సమాచారాన్ని ఉపయోగించి తెలుగులో స్నేహపూర్వకంగా సమాధానం ఇవ్వండి.";
const WEATHER_LABEL: &str = "వాస్తవిక వాతావరణ సమాచారం:";

/// Check whether a user message asks about the weather (Telugu or English keywords)
pub fn is_weather_question(text: &str) -> bool {
    let lowercase = text.to_lowercase();
    WEATHER_KEYWORDS.iter().any(|keyword| lowercase.contains(keyword))
}

/// System prompt for the farmer assistant, optionally grounded on a weather summary
pub fn system_prompt(weather: Option<&str>) -> String {
    match weather {
        Some(summary) => format!("{ASSISTANT_PERSONA} {USE_WEATHER} {ALWAYS_TELUGU}\n{WEATHER_LABEL} {summary}"),
        None => format!("{ASSISTANT_PERSONA} {ALWAYS_TELUGU}"),
    }
}

/// Conversation sent upstream: the system prompt, then the user's message
pub fn build_messages(user_message: &str, weather: Option<&str>) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt(weather)),
        ChatMessage::user(user_message),
    ]
}
