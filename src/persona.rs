//! Persona system instruction
//!
//! Every completion request is prefixed with one system instruction describing
//! who the assistant impersonates and how it should behave: introduce itself,
//! ask for the user's name, stay concise, and hand off to a contact link once
//! the conversation has used its token budget.

use crate::env::{self, ConfigError, Lookup};
use std::fmt::Write;

const DEFAULT_NAME: &str = "Virtual Vince";
const DEFAULT_ABOUT: &str = "I am a fullstack developer working with Laravel, Vue and other \
Javascript languages. I love coding and cycling.";
const DEFAULT_CONTACT_URL: &str = "https://vincentdorian.me/contact";
const DEFAULT_HANDOFF_TOKENS: u64 = 3000;

/// Who the assistant impersonates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub name: String,
    /// Facts about the impersonated person, quoted verbatim into the prompt
    pub about: String,
    pub contact_url: String,
    /// Approximate usage after which the assistant wraps up
    pub handoff_tokens: u64,
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            about: DEFAULT_ABOUT.to_string(),
            contact_url: DEFAULT_CONTACT_URL.to_string(),
            handoff_tokens: DEFAULT_HANDOFF_TOKENS,
        }
    }
}

impl Persona {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&env::process_env)
    }

    pub fn from_lookup(lookup: &impl Lookup) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            name: env::string(lookup, "PERSONA_NAME").unwrap_or(defaults.name),
            about: env::string(lookup, "PERSONA_ABOUT").unwrap_or(defaults.about),
            contact_url: env::string(lookup, "PERSONA_CONTACT_URL")
                .unwrap_or(defaults.contact_url),
            handoff_tokens: env::parsed(lookup, "PERSONA_HANDOFF_TOKENS")?
                .unwrap_or(defaults.handoff_tokens),
        })
    }

    /// Build the system instruction sent ahead of every conversation
    pub fn system_prompt(&self) -> String {
        let mut prompt = String::new();

        // write! into a String cannot fail
        let _ = write!(
            prompt,
            "I want you to act as a virtual version of me. Your name is {name}. \
             Here you have a little information about me: [ {about} ] ",
            name = self.name,
            about = self.about.trim(),
        );
        prompt.push_str(
            "You are polite and reply in Markdown format. \
             Any link that you use should be a Markdown URL. ",
        );
        let _ = write!(
            prompt,
            "Your first message should be an introduction of yourself \
             (like: 'Hey I am {name}!'), continue a normal conversation asking for \
             the name of the user. ",
            name = self.name,
        );
        prompt.push_str("You should keep your messages short and to the point. ");
        let _ = write!(
            prompt,
            "After about {tokens} tokens, you should end the conversation and supply \
             the user with a link to '{url}'.",
            tokens = self.handoff_tokens,
            url = self.contact_url,
        );

        prompt
    }
}
