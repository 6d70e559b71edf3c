use crate::symbols::{Reels, Symbol};

/// How a rule recognises a winning line.
#[derive(Debug, Clone, Copy)]
pub enum RuleMatch {
    ExactCombo(Reels),
    Predicate(fn(&Reels) -> bool),
}

#[derive(Debug, Clone)]
pub struct PayoutRule {
    pub name: &'static str,
    pub matcher: RuleMatch,
    pub multiplier: f64,
}

impl PayoutRule {
    pub fn matches(&self, reels: &Reels) -> bool {
        match &self.matcher {
            RuleMatch::ExactCombo(combo) => combo == reels,
            RuleMatch::Predicate(check) => check(reels),
        }
    }
}

/// Rules in priority order; the first match wins, so the most specific
/// rules come first.
#[derive(Debug, Clone)]
pub struct Paytable(pub Vec<PayoutRule>);

fn count(reels: &Reels, symbol: Symbol) -> usize {
    reels.iter().filter(|s| **s == symbol).count()
}

fn exactly_two_stars(reels: &Reels) -> bool {
    count(reels, Symbol::Star) == 2
}

fn pair_without_diamond(reels: &Reels) -> bool {
    reels
        .iter()
        .any(|s| *s != Symbol::Diamond && count(reels, *s) == 2)
}

fn triple(name: &'static str, symbol: Symbol, multiplier: f64) -> PayoutRule {
    PayoutRule {
        name,
        matcher: RuleMatch::ExactCombo([symbol; 3]),
        multiplier,
    }
}

impl Paytable {
    pub fn standard() -> Self {
        Self(vec![
            triple("triple diamond", Symbol::Diamond, 100.0),
            triple("triple star", Symbol::Star, 50.0),
            triple("triple bell", Symbol::Bell, 20.0),
            triple("triple grape", Symbol::Grape, 10.0),
            triple("triple lemon", Symbol::Lemon, 5.0),
            triple("triple cherry", Symbol::Cherry, 3.0),
            PayoutRule {
                name: "two stars",
                matcher: RuleMatch::Predicate(exactly_two_stars),
                multiplier: 3.0,
            },
            PayoutRule {
                name: "any pair",
                matcher: RuleMatch::Predicate(pair_without_diamond),
                multiplier: 1.5,
            },
        ])
    }

    pub fn evaluate(&self, reels: &Reels) -> Option<&PayoutRule> {
        self.0.iter().find(|rule| rule.matches(reels))
    }

    /// Pre-edge winnings for `bet`; zero when nothing matches.
    pub fn calculate_winnings(&self, reels: &Reels, bet: u64) -> f64 {
        self.evaluate(reels)
            .map_or(0.0, |rule| bet as f64 * rule.multiplier)
    }
}

impl Default for Paytable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Symbol::*;

    #[test]
    fn triple_diamond_takes_top_rule() {
        let table = Paytable::standard();
        let reels = [Diamond, Diamond, Diamond];
        assert_eq!(table.evaluate(&reels).map(|r| r.name), Some("triple diamond"));
        assert_eq!(table.calculate_winnings(&reels, 10), 1_000.0);
    }

    #[test]
    fn triple_star_beats_two_stars() {
        let table = Paytable::standard();
        assert_eq!(table.calculate_winnings(&[Star, Star, Star], 2), 100.0);
        assert_eq!(table.calculate_winnings(&[Star, Bell, Star], 2), 6.0);
    }

    #[test]
    fn pairs_pay_except_diamonds() {
        let table = Paytable::standard();
        assert_eq!(table.calculate_winnings(&[Cherry, Lemon, Cherry], 10), 15.0);
        assert_eq!(table.calculate_winnings(&[Diamond, Diamond, Lemon], 10), 0.0);
        assert_eq!(table.calculate_winnings(&[Cherry, Lemon, Grape], 10), 0.0);
    }

    #[test]
    fn order_is_respected_for_custom_tables() {
        // a broad rule placed first shadows the triple
        let table = Paytable(vec![
            PayoutRule {
                name: "any pair",
                matcher: RuleMatch::Predicate(|r| r[0] == r[1] || r[1] == r[2] || r[0] == r[2]),
                multiplier: 1.5,
            },
            triple("triple bell", Bell, 20.0),
        ]);
        assert_eq!(table.evaluate(&[Bell, Bell, Bell]).map(|r| r.name), Some("any pair"));
    }
}
