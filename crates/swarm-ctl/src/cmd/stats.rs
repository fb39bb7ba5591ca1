//! Counters of a running stand-in service.

use anyhow::Result;
use serde::Deserialize;

use super::http::get_json;

#[derive(Deserialize)]
struct StatsResponse {
    accounts: usize,
    tokens: usize,
    games: usize,
    moves: u64,
}

pub async fn cmd_stats(base_url: &str) -> Result<()> {
    let resp: StatsResponse = get_json(&format!("{base_url}/stats")).await?;

    println!("═══════════════════════════════════════");
    println!("  Mock Game Service");
    println!("═══════════════════════════════════════");
    println!("  Accounts : {}", resp.accounts);
    println!("  Tokens   : {}", resp.tokens);
    println!("  Games    : {}", resp.games);
    println!("  Moves    : {}", resp.moves);

    Ok(())
}
