//! # Dice Engine
//!
//! Parses standard TTRPG dice notation and produces cryptographically
//! random results. "Respect the Dice": every draw comes from the operating
//! system CSPRNG, never a statistical PRNG.
//!
//! Supported notation:
//! - Basic: `1d20`, `2d6`, `3d8`
//! - Modifiers: `2d6+3`, `1d20-2`
//! - Percentile: `1d100`, `d%`
//! - Fate dice: `4dF`
//! - Pools: `5d6p` (individual results, no total)

use crate::domain::types::DiceResult;
use rand::rngs::OsRng;
use rand::Rng;
use regex::Regex;

const MAX_COUNT: u32 = 100;
const MAX_SIZE: u32 = 1000;

/// Roll dice from a notation string.
///
/// Validation failures are reported through `DiceResult::error`; this
/// function never panics on user input.
pub fn roll(notation: &str) -> DiceResult {
    let notation = notation.trim();

    // (count)d(size)(pool?)(modifier)
    let pattern = Regex::new(r"^(?i)(\d+)?d(\d+|%|F)(p|pool)?([+-]\d+)?$").unwrap();

    let Some(caps) = pattern.captures(notation) else {
        return DiceResult::invalid(
            notation,
            "Invalid dice notation. Use format like '2d6+3', '1d20', 'd%', or '4dF'",
        );
    };

    // Oversized numerals overflow the parse and fall into the range checks
    let count = match caps.get(1) {
        Some(m) => m.as_str().parse::<u32>().unwrap_or(u32::MAX),
        None => 1,
    };
    let size_str = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    let is_pool = caps.get(3).is_some();
    let modifier = caps
        .get(4)
        .map(|m| m.as_str().parse::<i32>().unwrap_or(0))
        .unwrap_or(0);

    if is_pool && modifier != 0 {
        return DiceResult::invalid(
            notation,
            "Dice pools do not support modifiers (modifiers affect dice count). Use e.g. '5d6p'.",
        );
    }

    if count == 0 {
        return DiceResult::invalid(notation, "Dice count must be positive");
    }
    if count > MAX_COUNT {
        return DiceResult::invalid(notation, "Maximum 100 dice per roll (to prevent spam)");
    }

    if size_str.eq_ignore_ascii_case("f") {
        return roll_fate(notation, count, modifier);
    }

    let size = if size_str == "%" {
        100
    } else {
        size_str.parse::<u32>().unwrap_or(u32::MAX)
    };

    if size == 0 {
        return DiceResult::invalid(notation, "Dice size must be positive");
    }
    if size > MAX_SIZE {
        return DiceResult::invalid(notation, "Maximum d1000 dice size (to prevent abuse)");
    }

    let rolls: Vec<i32> = (0..count).map(|_| OsRng.gen_range(1..=size as i32)).collect();
    let total: i32 = rolls.iter().sum::<i32>() + modifier;

    let formatted = if is_pool {
        // Pool: just the list of rolls, no total
        bracketed(&rolls)
    } else if rolls.len() == 1 {
        if modifier != 0 {
            format!("**{}** {:+} = **{}**", rolls[0], modifier, total)
        } else {
            format!("**{}**", rolls[0])
        }
    } else if modifier != 0 {
        format!("{} {:+} = **{}**", bracketed(&rolls), modifier, total)
    } else {
        format!("{} = **{}**", bracketed(&rolls), total)
    };

    DiceResult {
        notation: notation.to_string(),
        rolls,
        modifier,
        total,
        formatted,
        error: None,
    }
}

/// Fate dice: each draw is -1, 0, or +1, rendered as `[-]` / `[ ]` / `[+]`.
fn roll_fate(notation: &str, count: u32, modifier: i32) -> DiceResult {
    let rolls: Vec<i32> = (0..count).map(|_| OsRng.gen_range(-1..=1)).collect();
    let total: i32 = rolls.iter().sum::<i32>() + modifier;

    let glyphs: Vec<&str> = rolls
        .iter()
        .map(|r| match r {
            -1 => "[-]",
            0 => "[ ]",
            _ => "[+]",
        })
        .collect();

    let formatted = if modifier != 0 {
        format!("{} {:+} = **{}**", glyphs.join(" "), modifier, total)
    } else {
        format!("{} = **{}**", glyphs.join(" "), total)
    };

    DiceResult {
        notation: notation.to_string(),
        rolls,
        modifier,
        total,
        formatted,
        error: None,
    }
}

fn bracketed(rolls: &[i32]) -> String {
    let inner = rolls
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{inner}]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_rolls() {
        for _ in 0..50 {
            let result = roll("3d6");
            assert!(result.error.is_none());
            assert_eq!(result.rolls.len(), 3);
            assert!(result.rolls.iter().all(|r| (1..=6).contains(r)));
            assert_eq!(result.total, result.rolls.iter().sum::<i32>());
        }
    }

    #[test]
    fn test_modifiers() {
        let result = roll("2d6+3");
        assert!(result.error.is_none());
        assert_eq!(result.modifier, 3);
        assert_eq!(result.total, result.rolls.iter().sum::<i32>() + 3);

        let result = roll("1d20-2");
        assert!(result.error.is_none());
        assert_eq!(result.modifier, -2);
        assert_eq!(result.total, result.rolls.iter().sum::<i32>() - 2);
    }

    #[test]
    fn test_default_count() {
        let result = roll("d20");
        assert!(result.error.is_none());
        assert_eq!(result.rolls.len(), 1);
    }

    #[test]
    fn test_percentile() {
        for _ in 0..50 {
            let result = roll("d%");
            assert!(result.error.is_none());
            assert!((1..=100).contains(&result.rolls[0]));
        }
    }

    #[test]
    fn test_fate_dice() {
        for _ in 0..50 {
            let result = roll("4dF");
            assert!(result.error.is_none());
            assert_eq!(result.rolls.len(), 4);
            assert!(result.rolls.iter().all(|r| (-1..=1).contains(r)));
        }
    }

    #[test]
    fn test_fate_formatting() {
        let result = roll("4df");
        assert!(result.formatted.contains("= **"));
        assert!(
            result.formatted.contains("[+]")
                || result.formatted.contains("[ ]")
                || result.formatted.contains("[-]")
        );
    }

    #[test]
    fn test_pool_has_no_total() {
        let result = roll("5d6p");
        assert!(result.error.is_none());
        assert_eq!(result.rolls.len(), 5);
        assert!(!result.formatted.contains('='));
    }

    #[test]
    fn test_pool_rejects_modifier() {
        let result = roll("5d6p+3");
        assert!(result.error.is_some());
        assert!(result.error.unwrap().contains("pools do not support modifiers"));
    }

    #[test]
    fn test_pool_long_form() {
        let result = roll("3d10pool");
        assert!(result.error.is_none());
        assert!(!result.formatted.contains('='));
    }

    #[test]
    fn test_count_limits() {
        assert!(roll("0d6").error.is_some());
        assert!(roll("101d6").error.is_some());
        assert!(roll("100d6").error.is_none());
    }

    #[test]
    fn test_size_limits() {
        assert!(roll("2d0").error.is_some());
        assert!(roll("1d1001").error.is_some());
        assert!(roll("1d1000").error.is_none());
    }

    #[test]
    fn test_garbage_notation() {
        assert!(roll("banana").error.is_some());
        assert!(roll("2x6").error.is_some());
        assert!(roll("").error.is_some());
        assert!(roll("d6+").error.is_some());
    }

    #[test]
    fn test_whitespace_tolerated() {
        assert!(roll("  2d6+3  ").error.is_none());
    }

    #[test]
    fn test_single_die_formatting() {
        let result = roll("1d1");
        assert_eq!(result.formatted, "**1**");

        let result = roll("1d1+2");
        assert_eq!(result.formatted, "**1** +2 = **3**");
    }

    #[test]
    fn test_error_result_shape() {
        let result = roll("0d6");
        assert!(result.rolls.is_empty());
        assert_eq!(result.total, 0);
        assert!(result.formatted.is_empty());
    }
}
