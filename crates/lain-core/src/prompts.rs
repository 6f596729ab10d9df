//! Ambient prompts the scheduler rotates through.

/// Default prompt set. Each cycle asks for one short spoken line.
pub const DEFAULT_PROMPTS: &[&str] = &[
    "Share a passing thought about the Wired with whoever is listening.",
    "Say something about the people connected to the stream right now.",
    "Reflect on what it means to exist only as data.",
    "Describe what the network feels like tonight.",
    "Wonder aloud about the boundary between the Wired and the real world.",
    "Mention a protocol, and what it reveals about the people who made it.",
    "Say something about loneliness and connection.",
    "Ask the viewers a quiet question about their identity.",
];

/// Owned copy of [`DEFAULT_PROMPTS`].
pub fn default_prompts() -> Vec<String> {
    DEFAULT_PROMPTS.iter().map(|p| p.to_string()).collect()
}
