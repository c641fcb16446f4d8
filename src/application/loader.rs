//! # Context Loader
//!
//! Loads the GM persona and injects auxiliary reference documents from the
//! knowledge directory. Read-only; loaded at startup and on demand.

use std::fs;
use std::path::Path;

const DEFAULT_PERSONA: &str = "You are an amazing Game Master.";

/// Base system instruction: GM persona plus every markdown knowledge file,
/// each prefixed with a FILE header.
pub fn load_system_instruction(persona_dir: &Path, knowledge_dir: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();

    let persona_path = persona_dir.join("gm_persona.md");
    match fs::read_to_string(&persona_path) {
        Ok(content) => parts.push(content.trim().to_string()),
        Err(_) => {
            tracing::warn!(
                "{} not found, using default instruction",
                persona_path.display()
            );
            parts.push(DEFAULT_PERSONA.to_string());
        }
    }

    let mut injected: Vec<String> = Vec::new();
    if let Ok(entries) = fs::read_dir(knowledge_dir) {
        let mut files: Vec<_> = entries
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().ends_with(".md"))
            .collect();
        files.sort_by_key(|e| e.file_name());

        for file in files {
            let name = file.file_name().to_string_lossy().to_string();
            match fs::read_to_string(file.path()) {
                Ok(content) => {
                    parts.push(format!("\n\n--- FILE: {name} ---\n\n{content}"));
                    injected.push(name);
                }
                Err(e) => tracing::error!("Failed to load {}: {}", name, e),
            }
        }
    }

    if injected.is_empty() {
        tracing::info!("No extra markdown knowledge found in {}", knowledge_dir.display());
    } else {
        tracing::info!("Injected knowledge: {}", injected.join(", "));
    }

    parts.join("\n")
}

/// Architect persona used for the ledger round-trip. None when the file is
/// missing so callers can skip the update entirely.
pub fn load_architect_instruction(persona_dir: &Path) -> Option<String> {
    fs::read_to_string(persona_dir.join("architect_persona.md")).ok()
}
