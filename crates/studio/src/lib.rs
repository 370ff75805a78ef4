//! Local editing surface for evidence-grounded decks: persisted sessions,
//! a request/response API over JSON lines, and background autosave.
//!
//! One studio process edits one project at a time. Two processes editing
//! the same project will overwrite each other's session file.

pub mod autosave;
pub mod commands;
pub mod server;
pub mod session;
pub mod state;

pub use autosave::{spawn_autosave, AutosaveHandle};
pub use commands::{dispatch, handle_line, Request, Response};
pub use server::{run_stdio, serve};
pub use session::{PresenterState, SaveOutcome, Session, SessionState, SessionStore};
pub use state::{safe_project_path, Mutation, SessionUpdate, StudioState};

#[cfg(test)]
pub(crate) mod testing {
    use std::fs;

    use deck_core::DeckConfig;
    use tempfile::TempDir;

    use crate::state::StudioState;

    const README: &str = "# Deckgen\n\nTurns a repository into an evidence-backed pitch deck.\n\n\
## Problem\n\nDemo slides drift away from what the code does.\n\n\
## Solution\n\nEvery claim on a slide cites a record from the project itself.\n\n\
## Features\n\n- Evidence index\n- Quality gate\n- Auto-fix\n";

    pub fn sample_project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("README.md"), README).unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/main.rs"), "fn main() {\n    println!(\"deck\");\n}\n").unwrap();
        fs::write(
            root.join("Cargo.toml"),
            "[package]\nname = \"deckgen\"\n\n[dependencies]\nclap = \"4\"\n",
        )
        .unwrap();
        dir
    }

    pub fn config(read_only: bool) -> DeckConfig {
        let mut config = DeckConfig::default();
        config.git.include_branch_context = false;
        config.studio.read_only = read_only;
        config
    }

    pub fn open_state(read_only: bool) -> (TempDir, StudioState) {
        let dir = sample_project();
        let state = StudioState::open(dir.path(), config(read_only)).unwrap();
        (dir, state)
    }
}
