//! Console `PairingPromptPort` (spec §5): blocking stdin read on a
//! dedicated thread via `spawn_blocking`, so the timer-driven
//! republication loop in `pairing::engine` keeps running while the
//! operator is thinking.

use std::io::Write;

use async_trait::async_trait;

use hmq_core::ports::{PairingPromptPort, SlaveCandidate};

pub struct ConsolePrompt;

#[async_trait]
impl PairingPromptPort for ConsolePrompt {
    async fn select_slave(&self, candidates: &[SlaveCandidate]) -> Option<usize> {
        if candidates.is_empty() {
            return None;
        }
        if candidates.len() == 1 {
            return Some(0);
        }

        let candidates = candidates.to_vec();
        tokio::task::spawn_blocking(move || prompt_for_selection(&candidates))
            .await
            .unwrap_or(None)
    }
}

fn prompt_for_selection(candidates: &[SlaveCandidate]) -> Option<usize> {
    println!("Multiple pairing candidates observed:");
    for (idx, candidate) in candidates.iter().enumerate() {
        println!(
            "  [{idx}] {} ({})",
            candidate.device_id, candidate.public_key_base64url
        );
    }
    print!("Select a candidate by index (blank to wait for more): ");
    std::io::stdout().flush().ok()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line).ok()?;
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let idx: usize = trimmed.parse().ok()?;
    if idx < candidates.len() {
        Some(idx)
    } else {
        None
    }
}
