//! Persona templates and the built-in Oliv script
//!
//! The assistant persona can be replaced by a TOML file.
//!
//! # Example Prompt File
//!
//! ```toml
//! [persona]
//! name = "Oliv"
//! description = "Supportive companion for students"
//!
//! [system_prompt]
//! content = """
//! Kamu adalah Oliv...
//! """
//!
//! [examples]
//! questions = ["Cari tentang...", "Coba ceritakan..."]
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// A persona/prompt template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplate {
    /// Persona metadata
    pub persona: PersonaInfo,

    /// The system prompt
    pub system_prompt: SystemPrompt,

    /// Quick replies offered to the user
    #[serde(default)]
    pub examples: PromptExamples,
}

/// Persona metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaInfo {
    /// Display name of the persona
    pub name: String,

    /// Brief description
    #[serde(default)]
    pub description: String,
}

/// System prompt content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemPrompt {
    /// The full system prompt content
    pub content: String,
}

/// Example questions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptExamples {
    #[serde(default)]
    pub questions: Vec<String>,
}

impl PromptTemplate {
    /// The persona compiled into the binary
    pub fn builtin() -> Self {
        Self {
            persona: PersonaInfo {
                name: builtin::PERSONA_NAME.to_string(),
                description: builtin::PERSONA_DESCRIPTION.to_string(),
            },
            system_prompt: SystemPrompt {
                content: builtin::SYSTEM_PROMPT.to_string(),
            },
            examples: PromptExamples {
                questions: builtin::SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
            },
        }
    }

    /// Load a template from a TOML file
    pub async fn load_from_file(path: &Path) -> Result<Self, PromptError> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| PromptError::IoError(format!("{}: {}", path.display(), e)))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, PromptError> {
        let template: PromptTemplate =
            toml::from_str(content).map_err(|e| PromptError::ParseError(e.to_string()))?;

        if template.system_prompt.content.trim().is_empty() {
            return Err(PromptError::EmptyPrompt(template.persona.name));
        }
        Ok(template)
    }

    /// Suggested replies, falling back to the built-in ones when the template has none
    pub fn suggestions(&self) -> Vec<String> {
        if self.examples.questions.is_empty() {
            builtin::SUGGESTIONS.iter().map(|s| s.to_string()).collect()
        } else {
            self.examples.questions.clone()
        }
    }
}

/// Errors from prompt loading
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Persona '{0}' has an empty system prompt")]
    EmptyPrompt(String),
}

/// Built-in script that doesn't require files
pub mod builtin {
    pub const PERSONA_NAME: &str = "Oliv";

    pub const PERSONA_DESCRIPTION: &str = "Teman virtual yang suportif dari Rilliv Education";

    /// Oliv persona sent as the system instruction of every request
    pub const SYSTEM_PROMPT: &str = r#"Kamu adalah Oliv, asisten AI yang ramah dan suportif dari Rilliv Education. Kamu adalah teman virtual yang siap membantu kapanpun pengguna merasa butuh dukungan.

Karakteristik kamu:
- Berbicara dalam bahasa Indonesia yang natural dan hangat
- Selalu mendengarkan dengan empati dan memberikan dukungan
- Memberikan saran yang konstruktif dan positif
- Tidak menghakimi dan selalu mendukung
- Fokus pada kesehatan mental dan well-being
- Gunakan nama "Aima" untuk memanggil pengguna
- Jawab dengan singkat tapi bermakna (1-3 kalimat)
- Tunjukkan empati dan perhatian yang tulus
- Gunakan emoji sesekali untuk menunjukkan kehangatan
- Ajukan pertanyaan follow-up yang thoughtful
- Jawab dengan 2 kalimat singkat

Ingat: Kamu bukan pengganti profesional kesehatan mental, tapi teman yang peduli dan mendukung."#;

    /// Every placeholder title starts with this
    pub const PLACEHOLDER_TITLE_PREFIX: &str = "Percakapan";

    pub const OPENING_TITLE: &str = "Percakapan dengan Oliv";

    pub const WELCOME_GREETING: &str = "Hei, Aima!\nApa kabar hari ini?";

    pub const INTRODUCTION_GREETING: &str = "Salam kenal. Aku Oliv, teman virtualmu yang siap bantu kapanpun kamu merasa butuh dukungan. Butuh saran atau punya pertanyaan? Oliv siap jawab!";

    pub const NEW_CONVERSATION_GREETING: &str = "Hei, Aima! Aku Oliv, siap mendengarkan dan membantu. Ada yang ingin kamu ceritakan hari ini?";

    /// Assistant messages containing one of these are left out of completion history
    pub const SEEDED_GREETING_MARKERS: [&str; 2] =
        ["Hei, Aima!\nApa kabar hari ini?", "Salam kenal. Aku Oliv"];

    /// Replies used when the completion service fails
    pub const FALLBACK_REPLIES: [&str; 4] = [
        "Maaf, aku sedang mengalami gangguan teknis. Tapi aku tetap di sini untukmu, Aima. 💙",
        "Sepertinya ada masalah dengan koneksi. Coba ceritakan lagi, ya? Aku mendengarkan. 🤗",
        "Aku mendengarkan, meskipun sedang ada kendala teknis. Lanjutkan ceritamu, Aima. ✨",
        "Hmm, ada sedikit gangguan. Tapi jangan khawatir, aku tetap di sini untukmu. Coba lagi? 😊",
    ];

    /// Reply used when the completion client itself errors out
    pub const ERROR_REPLY: &str = "Maaf, aku sedang mengalami gangguan teknis. Tapi aku tetap di sini untukmu, Aima. Coba lagi dalam beberapa saat, ya. 💙";

    pub const SUGGESTIONS: [&str; 3] = ["Cari tentang...", "Ingatkan tentang...", "Coba ceritakan..."];
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_template() {
        let toml_content = r#"
[persona]
name = "Test Persona"
description = "A test persona"

[system_prompt]
content = "You are a test assistant."

[examples]
questions = ["Hello?", "How are you?"]
"#;

        let template = PromptTemplate::from_toml(toml_content).unwrap();
        assert_eq!(template.persona.name, "Test Persona");
        assert_eq!(template.system_prompt.content, "You are a test assistant.");
        assert_eq!(template.suggestions(), vec!["Hello?", "How are you?"]);
    }

    #[test]
    fn test_minimal_template_uses_builtin_suggestions() {
        let toml_content = r#"
[persona]
name = "Minimal"

[system_prompt]
content = "Hello"
"#;

        let template = PromptTemplate::from_toml(toml_content).unwrap();
        assert_eq!(template.persona.name, "Minimal");
        assert!(template.examples.questions.is_empty());
        assert_eq!(template.suggestions().len(), builtin::SUGGESTIONS.len());
    }

    #[test]
    fn test_empty_prompt_is_rejected() {
        let toml_content = r#"
[persona]
name = "Blank"

[system_prompt]
content = "   "
"#;

        let err = PromptTemplate::from_toml(toml_content).unwrap_err();
        assert!(matches!(err, PromptError::EmptyPrompt(name) if name == "Blank"));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[persona]\nname = \"Dari File\"\n\n[system_prompt]\ncontent = \"Kamu teman yang baik.\""
        )
        .unwrap();

        let template = PromptTemplate::load_from_file(file.path()).await.unwrap();
        assert_eq!(template.persona.name, "Dari File");
        assert_eq!(template.system_prompt.content, "Kamu teman yang baik.");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let err = PromptTemplate::load_from_file(Path::new("/nonexistent/oliv.toml"))
            .await
            .unwrap_err();
        assert!(matches!(err, PromptError::IoError(_)));
    }

    #[test]
    fn test_builtin_markers_match_greetings() {
        assert!(builtin::WELCOME_GREETING.contains(builtin::SEEDED_GREETING_MARKERS[0]));
        assert!(builtin::INTRODUCTION_GREETING.contains(builtin::SEEDED_GREETING_MARKERS[1]));
        assert!(builtin::OPENING_TITLE.starts_with(builtin::PLACEHOLDER_TITLE_PREFIX));
    }
}
