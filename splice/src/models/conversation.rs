use serde::{Deserialize, Serialize};

/// One completed exchange: what the user asked and what the agent answered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub user: String,
    pub agent: String,
}

/// Ordered conversation history owned by the orchestration loop.
///
/// Turns are never pruned individually; the whole memory is cleared on reset.
/// The character budget only bounds what `render` exposes to the prompt.
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    turns: Vec<Turn>,
    char_budget: usize,
}

impl ConversationMemory {
    pub fn new(char_budget: usize) -> Self {
        Self {
            turns: Vec::new(),
            char_budget,
        }
    }

    pub fn record(&mut self, user: impl Into<String>, agent: impl Into<String>) {
        self.turns.push(Turn {
            user: user.into(),
            agent: agent.into(),
        });
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Most recent turns that fit the character budget, oldest first.
    pub fn render(&self) -> String {
        let mut selected: Vec<String> = Vec::new();
        let mut used = 0usize;

        for turn in self.turns.iter().rev() {
            let block = format!("User: {}\nAssistant: {}", turn.user, turn.agent);
            if used + block.len() > self.char_budget && !selected.is_empty() {
                break;
            }
            used += block.len();
            selected.push(block);
            if used >= self.char_budget {
                break;
            }
        }

        selected.reverse();
        selected.join("\n\n")
    }
}
