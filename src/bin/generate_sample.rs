use anyhow::{Context, Result};
use serde::Serialize;

/// One row of the demo dataset.
#[derive(Serialize)]
struct Match {
    id: u32,
    season: u32,
    date: String,
    city: &'static str,
    team1: &'static str,
    team2: &'static str,
    winner: &'static str,
    toss_decision: &'static str,
    first_innings_runs: u32,
    second_innings_runs: u32,
    win_by_runs: u32,
    win_by_wickets: u32,
    player_of_match_strike_rate: f64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n
    }

    fn pick<T: Copy>(&mut self, items: &[T]) -> T {
        items[self.below(items.len())]
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

const TEAMS: [(&str, &str); 6] = [
    ("Mumbai Indians", "Mumbai"),
    ("Chennai Super Kings", "Chennai"),
    ("Delhi Capitals", "Delhi"),
    ("Kolkata Knight Riders", "Kolkata"),
    ("Royal Challengers Bangalore", "Bengaluru"),
    ("Rajasthan Royals", "Jaipur"),
];

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let output_path = "sample_matches.csv";
    let mut writer = csv::Writer::from_path(output_path)
        .with_context(|| format!("creating {output_path}"))?;

    let mut id = 0;
    for season in 2018..=2025 {
        for game in 0..30 {
            let home = rng.below(TEAMS.len());
            let away = (home + 1 + rng.below(TEAMS.len() - 1)) % TEAMS.len();
            let (team1, city) = TEAMS[home];
            let team2 = TEAMS[away].0;

            let first = rng.gauss(168.0, 22.0).clamp(90.0, 260.0).round() as u32;
            let chased = rng.next_f64() < 0.48;
            let (winner, second, by_runs, by_wickets) = if chased {
                (team2, first + 1 + rng.below(6) as u32, 0, 1 + rng.below(9) as u32)
            } else {
                let margin = 1 + rng.gauss(18.0, 14.0).abs().round() as u32;
                (team1, first.saturating_sub(margin), margin, 0)
            };

            id += 1;
            writer.serialize(Match {
                id,
                season,
                date: format!("{season}-04-{:02}", 1 + game % 28),
                city,
                team1,
                team2,
                winner,
                toss_decision: rng.pick(&["bat", "field"]),
                first_innings_runs: first,
                second_innings_runs: second,
                win_by_runs: by_runs,
                win_by_wickets: by_wickets,
                player_of_match_strike_rate: (rng.gauss(165.0, 35.0).max(60.0) * 100.0).round()
                    / 100.0,
            })?;
        }
    }
    writer.flush().context("flushing CSV writer")?;

    println!("Wrote {id} matches to {output_path}");
    Ok(())
}
