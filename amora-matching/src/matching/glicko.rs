//! Glicko-2 rating updates.
//!
//! Based on: http://www.glicko.net/glicko/glicko2.pdf
//! One update = one rated pairwise outcome (a "like" exchange).

use std::f64::consts::PI;

/// System constant controlling how fast volatility can change.
const TAU: f64 = 0.5;
/// Convergence tolerance for the volatility iteration.
const EPSILON: f64 = 0.000001;
/// Conversion factor between the public scale and the internal Glicko-2 scale.
const GLICKO2_SCALE: f64 = 173.7178;

pub const DEFAULT_RATING: f64 = 1500.0;
pub const DEFAULT_DEVIATION: f64 = 350.0;
pub const DEFAULT_VOLATILITY: f64 = 0.06;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlickoRating {
    pub rating: f64,
    pub deviation: f64,
    pub volatility: f64,
}

impl Default for GlickoRating {
    fn default() -> Self {
        Self {
            rating: DEFAULT_RATING,
            deviation: DEFAULT_DEVIATION,
            volatility: DEFAULT_VOLATILITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Loss,
}

impl Outcome {
    fn score(self) -> f64 {
        match self {
            Self::Win => 1.0,
            Self::Loss => 0.0,
        }
    }
}

fn g(phi: f64) -> f64 {
    1.0 / (1.0 + 3.0 * phi * phi / (PI * PI)).sqrt()
}

fn expected(mu: f64, mu_j: f64, phi_j: f64) -> f64 {
    1.0 / (1.0 + (-g(phi_j) * (mu - mu_j)).exp())
}

/// The function whose root is the new volatility (in log space).
fn volatility_f(x: f64, delta: f64, phi: f64, v: f64, a: f64) -> f64 {
    let ex = x.exp();
    let phi2 = phi * phi;
    let num1 = ex * (delta * delta - phi2 - v - ex);
    let den1 = 2.0 * (phi2 + v + ex) * (phi2 + v + ex);
    let num2 = x - a;
    let den2 = TAU * TAU;
    num1 / den1 - num2 / den2
}

/// Compute the player's post-game rating against a single opponent.
///
/// Both inputs are read on the pre-game scale and never mutated; the swipe
/// coordinator calls this twice per like (winner and loser) with the same
/// pre-update snapshot so the two calls are order independent.
pub fn update(player: GlickoRating, opponent: GlickoRating, outcome: Outcome) -> GlickoRating {
    // Step 2: convert to the Glicko-2 scale
    let mu = (player.rating - DEFAULT_RATING) / GLICKO2_SCALE;
    let phi = player.deviation / GLICKO2_SCALE;
    let sigma = player.volatility;

    let mu_j = (opponent.rating - DEFAULT_RATING) / GLICKO2_SCALE;
    let phi_j = opponent.deviation / GLICKO2_SCALE;

    // Step 3: estimated variance of the rating from the game outcome
    let g_phi_j = g(phi_j);
    let e = expected(mu, mu_j, phi_j);
    let v = 1.0 / (g_phi_j * g_phi_j * e * (1.0 - e));

    // Step 4: estimated improvement
    let delta = v * g_phi_j * (outcome.score() - e);

    // Step 5: new volatility via the Illinois variant of regula falsi
    let a = (sigma * sigma).ln();
    let mut big_a = a;
    let mut big_b = if delta * delta > phi * phi + v {
        (delta * delta - phi * phi - v).ln()
    } else {
        let mut k = 1.0;
        while volatility_f(a - k * TAU, delta, phi, v, a) < 0.0 {
            k += 1.0;
        }
        a - k * TAU
    };

    let mut f_a = volatility_f(big_a, delta, phi, v, a);
    let mut f_b = volatility_f(big_b, delta, phi, v, a);

    while (big_b - big_a).abs() > EPSILON {
        let big_c = big_a + (big_a - big_b) * f_a / (f_b - f_a);
        let f_c = volatility_f(big_c, delta, phi, v, a);

        if f_c * f_b < 0.0 {
            big_a = big_b;
            f_a = f_b;
        } else {
            f_a /= 2.0;
        }

        big_b = big_c;
        f_b = f_c;
    }

    let sigma_prime = (big_a / 2.0).exp();

    // Step 6: pre-rating-period deviation
    let phi_star = (phi * phi + sigma_prime * sigma_prime).sqrt();

    // Step 7: new deviation and mean
    let phi_prime = 1.0 / (1.0 / (phi_star * phi_star) + 1.0 / v).sqrt();
    let mu_prime = mu + phi_prime * phi_prime * g_phi_j * (outcome.score() - e);

    // Step 8: back to the public scale. Deviation never exceeds the
    // starting ceiling of 350.
    GlickoRating {
        rating: mu_prime * GLICKO2_SCALE + DEFAULT_RATING,
        deviation: (phi_prime * GLICKO2_SCALE).min(DEFAULT_DEVIATION),
        volatility: sigma_prime,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(rating: f64, deviation: f64, volatility: f64) -> GlickoRating {
        GlickoRating {
            rating,
            deviation,
            volatility,
        }
    }

    #[test]
    fn equal_players_winner_gains_loser_drops() {
        let a = GlickoRating::default();
        let b = GlickoRating::default();

        let a_after = update(a, b, Outcome::Win);
        let b_after = update(b, a, Outcome::Loss);

        assert!(a_after.rating > a.rating);
        assert!(b_after.rating < b.rating);
    }

    #[test]
    fn win_against_stronger_opponent() {
        let player = rating(1500.0, 350.0, 0.06);
        let opponent = rating(1600.0, 300.0, 0.05);

        let player_after = update(player, opponent, Outcome::Win);
        let opponent_after = update(opponent, player, Outcome::Loss);

        assert!(player_after.rating > 1500.0);
        assert!(opponent_after.rating < 1600.0);
    }

    #[test]
    fn update_terminates_and_stays_finite() {
        let ratings = [800.0, 1200.0, 1500.0, 1900.0, 2400.0];
        let deviations = [30.0, 80.0, 150.0, 350.0];
        let volatilities = [0.03, 0.06, 0.1];

        for &r in &ratings {
            for &d in &deviations {
                for &s in &volatilities {
                    for outcome in [Outcome::Win, Outcome::Loss] {
                        let player = rating(r, d, s);
                        let opponent = rating(2300.0 - r / 2.0, 200.0, 0.06);
                        let updated = update(player, opponent, outcome);

                        assert!(updated.rating.is_finite());
                        assert!(updated.deviation.is_finite());
                        assert!(updated.volatility.is_finite());
                        assert!(updated.deviation > 0.0);
                        assert!(updated.deviation <= DEFAULT_DEVIATION);
                    }
                }
            }
        }
    }

    #[test]
    fn deviation_shrinks_after_first_game() {
        let player = GlickoRating::default();
        let opponent = rating(1400.0, 200.0, 0.06);

        let updated = update(player, opponent, Outcome::Loss);
        assert!(updated.deviation < player.deviation);
    }

    #[test]
    fn update_is_deterministic() {
        let player = rating(1650.0, 120.0, 0.055);
        let opponent = rating(1480.0, 90.0, 0.06);

        let first = update(player, opponent, Outcome::Win);
        let second = update(player, opponent, Outcome::Win);
        assert_eq!(first, second);

        // Inputs are taken by value and untouched
        assert_eq!(player, rating(1650.0, 120.0, 0.055));
    }

    #[test]
    fn glickman_paper_example() {
        // Example from the Glicko-2 paper, reduced to the single 1400-rated
        // opponent: the 1500 player wins and must move up while the
        // uncertainty narrows.
        let player = rating(1500.0, 200.0, 0.06);
        let opponent = rating(1400.0, 30.0, 0.06);

        let updated = update(player, opponent, Outcome::Win);
        assert!(updated.rating > 1500.0);
        assert!(updated.deviation < 200.0);
        assert!((updated.volatility - 0.06).abs() < 0.01);
    }
}
