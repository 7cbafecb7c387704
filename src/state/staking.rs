use thiserror::Error;
use uuid::Uuid;

/// Placeholder prefix for stakers who are not registered app users.
const OFF_APP_PREFIX: &str = "offapp:";

/// A staker arrangement as edited by the player before settlement.
///
/// Percentage and markup stay string-encoded until validation, exactly as the
/// UI captures them; a config only becomes financially meaningful once
/// [`StakerConfig::validate`] accepts it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakerConfig {
    /// True when the staker is an off-app third party entered by hand.
    pub is_manual_entry: bool,
    /// Registered staker's user id (ignored for manual entries).
    pub staker_user_id: Option<String>,
    /// Display name for an off-app staker (manual entries only).
    pub manual_staker_name: Option<String>,
    /// Percentage of the action sold, string-encoded, (0, 100] once parsed.
    pub percentage_sold: String,
    /// Markup multiplier, string-encoded, >= 1.0 once parsed.
    pub markup: String,
    /// Set when editing a stake record that already exists in the store.
    pub original_stake_id: Option<Uuid>,
    /// Staker user id of the pre-existing stake being edited.
    pub original_stake_user_id: Option<String>,
}

impl StakerConfig {
    /// Resolve the staker identity: the registered user id, or an off-app
    /// placeholder derived from the manual name.
    pub fn staker_identity(&self) -> Option<String> {
        if self.is_manual_entry {
            self.manual_staker_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(|name| format!("{OFF_APP_PREFIX}{name}"))
        } else {
            self.staker_user_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_owned)
        }
    }

    /// Stable key for the ordered config set: the stake being edited wins,
    /// otherwise the staker identity.
    pub fn key(&self) -> Option<String> {
        self.original_stake_id
            .map(|id| format!("stake:{id}"))
            .or_else(|| self.staker_identity())
    }

    /// Check identity, percentage, and markup against their ranges.
    ///
    /// Returns `Ok(None)` for a zero percentage: the UI allows it as a
    /// trivial no-op and no settlement is produced for it.
    pub fn validate(&self, buy_in: f64) -> Result<Option<ValidatedStake>, StakeConfigError> {
        let staker_user_id = self
            .staker_identity()
            .ok_or(StakeConfigError::MissingIdentity)?;

        let raw_percentage = self.percentage_sold.trim();
        let percentage: f64 = raw_percentage
            .parse()
            .map_err(|_| StakeConfigError::UnparseablePercentage(raw_percentage.to_owned()))?;
        if percentage == 0.0 {
            return Ok(None);
        }
        if !(percentage > 0.0 && percentage <= 100.0) {
            return Err(StakeConfigError::PercentageOutOfRange(percentage));
        }

        let raw_markup = self.markup.trim();
        let markup: f64 = raw_markup
            .parse()
            .map_err(|_| StakeConfigError::UnparseableMarkup(raw_markup.to_owned()))?;
        if markup < 1.0 {
            return Err(StakeConfigError::MarkupBelowMinimum(markup));
        }

        if buy_in <= 0.0 {
            return Err(StakeConfigError::ZeroBuyIn);
        }

        Ok(Some(ValidatedStake {
            staker_user_id,
            fraction: percentage / 100.0,
            markup,
            original_stake_id: self.original_stake_id,
        }))
    }
}

/// A staker config whose identity, percentage, and markup all parsed and
/// passed their range checks.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedStake {
    /// Registered user id or off-app placeholder.
    pub staker_user_id: String,
    /// Share of the action, 0–1.
    pub fraction: f64,
    /// Markup multiplier applied to the staker's proportional cost.
    pub markup: f64,
    /// Pre-existing stake record to update instead of creating a new one.
    pub original_stake_id: Option<Uuid>,
}

/// Reason a staker config was excluded from settlement.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StakeConfigError {
    /// Neither a registered staker nor a manual name was supplied.
    #[error("no staker selected")]
    MissingIdentity,
    /// Percentage field did not parse as a number.
    #[error("percentage sold `{0}` is not a number")]
    UnparseablePercentage(String),
    /// Percentage parsed but fell outside (0, 100].
    #[error("percentage sold must be in (0, 100], got {0}")]
    PercentageOutOfRange(f64),
    /// Markup field did not parse as a number.
    #[error("markup `{0}` is not a number")]
    UnparseableMarkup(String),
    /// Markup parsed but was below 1.0.
    #[error("markup must be at least 1.0, got {0}")]
    MarkupBelowMinimum(f64),
    /// A non-zero percentage was sold against a zero buy-in.
    #[error("cannot settle a stake against a zero buy-in")]
    ZeroBuyIn,
}

/// Result of settling one stake.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settlement {
    /// What the staker effectively paid for their share, markup-adjusted.
    pub staker_cost: f64,
    /// The staker's share of the player's cashout.
    pub staker_share_of_cashout: f64,
    /// `staker_share_of_cashout - staker_cost`. Positive means the staker
    /// nets a profit. Downstream balance reconciliation depends on this sign
    /// convention; do not re-derive it.
    pub amount: f64,
}

/// Settle one validated stake against the session's final numbers.
pub fn settle(buy_in: f64, cashout: f64, stake: &ValidatedStake) -> Settlement {
    let staker_cost = buy_in * stake.fraction * stake.markup;
    let staker_share_of_cashout = cashout * stake.fraction;
    Settlement {
        staker_cost,
        staker_share_of_cashout,
        amount: staker_share_of_cashout - staker_cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(percentage: &str, markup: &str) -> StakerConfig {
        StakerConfig {
            is_manual_entry: false,
            staker_user_id: Some("user-42".into()),
            manual_staker_name: None,
            percentage_sold: percentage.into(),
            markup: markup.into(),
            original_stake_id: None,
            original_stake_user_id: None,
        }
    }

    #[test]
    fn settlement_formula_matches_the_contract() {
        let stake = config("50", "1.2").validate(1000.0).unwrap().unwrap();
        let settlement = settle(1000.0, 1500.0, &stake);
        assert_eq!(settlement.staker_cost, 600.0);
        assert_eq!(settlement.staker_share_of_cashout, 750.0);
        assert_eq!(settlement.amount, 150.0);
    }

    #[test]
    fn losing_session_produces_a_negative_settlement() {
        let stake = config("25", "1.0").validate(800.0).unwrap().unwrap();
        let settlement = settle(800.0, 200.0, &stake);
        assert_eq!(settlement.amount, 50.0 - 200.0);
    }

    #[test]
    fn zero_percentage_is_a_clean_no_op() {
        assert_eq!(config("0", "1.5").validate(1000.0), Ok(None));
        // Even against a zero buy-in, for symmetry with the UI.
        assert_eq!(config("0", "1.5").validate(0.0), Ok(None));
    }

    #[test]
    fn out_of_range_inputs_are_rejected() {
        assert_eq!(
            config("101", "1.0").validate(100.0),
            Err(StakeConfigError::PercentageOutOfRange(101.0))
        );
        assert_eq!(
            config("-5", "1.0").validate(100.0),
            Err(StakeConfigError::PercentageOutOfRange(-5.0))
        );
        assert_eq!(
            config("50", "0.9").validate(100.0),
            Err(StakeConfigError::MarkupBelowMinimum(0.9))
        );
        assert_eq!(
            config("half", "1.0").validate(100.0),
            Err(StakeConfigError::UnparseablePercentage("half".into()))
        );
        assert_eq!(
            config("50", "1.1").validate(0.0),
            Err(StakeConfigError::ZeroBuyIn)
        );
    }

    #[test]
    fn identity_resolution_prefers_the_right_source() {
        let mut manual = config("50", "1.0");
        manual.is_manual_entry = true;
        manual.manual_staker_name = Some("  Lou  ".into());
        assert_eq!(manual.staker_identity().as_deref(), Some("offapp:Lou"));

        let mut missing = config("50", "1.0");
        missing.staker_user_id = Some("   ".into());
        assert_eq!(
            missing.validate(100.0),
            Err(StakeConfigError::MissingIdentity)
        );
    }
}
