//! Six-sided dice rolls
//!
//! Every check in the combat and decision layers is roll-under against a
//! target number on 3d6.

use rand::Rng;

/// Sum of `count` d6 plus a flat modifier
pub fn roll(count: u32, modifier: i32, rng: &mut impl Rng) -> i32 {
    let total: i32 = (0..count).map(|_| rng.gen_range(1..=6)).sum();
    total + modifier
}

/// The standard 3d6 check roll
pub fn roll_3d6(rng: &mut impl Rng) -> i32 {
    roll(3, 0, rng)
}
