use anyhow::Result;

use crate::store::RuleStore;

/// Starter knowledge for a fresh install. Seeded once, only into an empty
/// store; admins grow the set from there.
pub const DEFAULT_RULES: &[(&str, &str)] = &[
    ("hello", "Hello! How can I help you today?"),
    ("hi", "Hi there! What can I do for you?"),
    ("hey", "Hey! How are you doing?"),
    (
        "how are you",
        "I'm doing great, thank you for asking! How about you?",
    ),
    (
        "what is your name",
        "I'm an AI Chatbot Assistant, here to help you!",
    ),
    (
        "help",
        "I can answer your questions! Try asking me about greetings, time, weather, or general queries.",
    ),
    ("bye", "Goodbye! Have a great day!"),
    ("goodbye", "See you later! Take care!"),
    ("thanks", "You're welcome! Happy to help!"),
    ("thank you", "You're very welcome!"),
    (
        "weather",
        "I don't have real-time weather data, but I hope it's nice where you are!",
    ),
    (
        "time",
        "I don't have access to real-time clock, but you can check your device!",
    ),
    (
        "joke",
        "Why did the programmer quit his job? Because he didn't get arrays! 😄",
    ),
    (
        "who created you",
        "I was created by a talented developer as a chatbot project!",
    ),
    (
        "what can you do",
        "I can chat with you, answer questions, and learn new responses through my admin panel!",
    ),
];

/// Populate an empty store with [`DEFAULT_RULES`]. A store that already
/// holds rules is left alone. Returns how many rules were inserted.
pub async fn seed_defaults(store: &RuleStore) -> Result<usize> {
    if store.count().await? > 0 {
        return Ok(0);
    }

    for (keyword, response) in DEFAULT_RULES {
        store.upsert(keyword, response).await?;
    }
    tracing::info!("seeded {} starter rules", DEFAULT_RULES.len());
    Ok(DEFAULT_RULES.len())
}
