use std::collections::VecDeque;

use async_trait::async_trait;
use strum::{EnumMessage, IntoStaticStr};

/// Blocking notices shown to the user when an action fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, EnumMessage)]
pub enum Notice {
    #[strum(message = "Please enter both an email and a password.")]
    CredentialsRequired,
    #[strum(message = "Please enter your name, email and password.")]
    SignupFieldsRequired,
    #[strum(message = "Login failed. Please check your credentials.")]
    LoginFailed,
    #[strum(message = "Signup failed. The email might already be in use.")]
    SignupFailed,
    #[strum(message = "Could not delete recipe.")]
    DeleteFailed,
    #[strum(message = "Your session has expired. Please log in again.")]
    SessionExpired,
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.get_message().unwrap_or_default())
    }
}

/// The user-facing surface controllers report to and ask questions of.
#[async_trait]
pub trait Prompt: Send {
    fn alert(&mut self, notice: Notice);

    /// Ask a yes/no question; anything but an explicit yes is a no.
    async fn confirm(&mut self, question: &str) -> bool;
}

/// A prompt that answers from a script and remembers what it was shown.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    pub answers: VecDeque<bool>,
    pub alerts: Vec<Notice>,
    pub questions: Vec<String>,
}

impl ScriptedPrompt {
    pub fn answering(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Prompt for ScriptedPrompt {
    fn alert(&mut self, notice: Notice) {
        self.alerts.push(notice);
    }

    async fn confirm(&mut self, question: &str) -> bool {
        self.questions.push(question.to_string());
        self.answers.pop_front().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_read_like_the_ui() {
        assert_eq!(
            Notice::LoginFailed.to_string(),
            "Login failed. Please check your credentials."
        );
        assert_eq!(Notice::DeleteFailed.to_string(), "Could not delete recipe.");
    }

    #[tokio::test]
    async fn script_runs_out_as_no() {
        let mut prompt = ScriptedPrompt::answering([true]);
        assert!(prompt.confirm("first?").await);
        assert!(!prompt.confirm("second?").await);
        assert_eq!(prompt.questions.len(), 2);
    }
}
