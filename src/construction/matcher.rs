use alloy_primitives::{Address, I256};
use thiserror::Error;

use crate::models::{Currency, Operation, OperationType, TransferIntent};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("no operation satisfies role {role}")]
    NotFound { role: usize },

    #[error("{candidates} operations satisfy role {role}")]
    Ambiguous { role: usize, candidates: usize },

    #[error("amounts of roles {first} and {second} do not net to zero")]
    SumMismatch { first: usize, second: usize },

    #[error("operation {index} matches no role")]
    Unmatched { index: usize },

    #[error("amount is not an integer: {0}")]
    InvalidAmount(String),

    #[error("account is not a valid address: {0}")]
    InvalidAccount(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountSign {
    Any,
    Negative,
    Positive,
}

impl AmountSign {
    fn admits(&self, value: &I256) -> bool {
        match self {
            AmountSign::Any => true,
            AmountSign::Negative => value.is_negative(),
            AmountSign::Positive => value.is_positive(),
        }
    }
}

/// What one expected operation must look like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRole {
    pub op_type: OperationType,
    pub account_required: bool,
    pub sign: AmountSign,
    pub currency: Option<Currency>,
}

/// An ordered set of roles plus cross-role constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationShape {
    pub roles: Vec<OperationRole>,
    /// Role pairs whose amounts must sum to zero.
    pub opposite_amounts: Vec<(usize, usize)>,
    /// Reject operations that fill no role and roles with several candidates.
    pub strict: bool,
}

impl OperationShape {
    /// A debit on the sender followed by a credit on the recipient.
    pub fn transfer(currency: &Currency) -> Self {
        let role = |sign| OperationRole {
            op_type: OperationType::Transfer,
            account_required: true,
            sign,
            currency: Some(currency.clone()),
        };

        Self {
            roles: vec![role(AmountSign::Negative), role(AmountSign::Positive)],
            opposite_amounts: vec![(0, 1)],
            strict: true,
        }
    }
}

/// One matched operation per role, with its parsed amount.
#[derive(Debug)]
pub struct Matches<'a> {
    matched: Vec<(&'a Operation, I256)>,
}

impl<'a> Matches<'a> {
    pub fn operation(&self, role: usize) -> &'a Operation {
        self.matched[role].0
    }

    pub fn amount(&self, role: usize) -> I256 {
        self.matched[role].1
    }

    pub fn account(&self, role: usize) -> Result<Address, MatchError> {
        let address = self
            .operation(role)
            .account
            .as_ref()
            .map(|account| account.address.as_str())
            .unwrap_or_default();
        address
            .parse::<Address>()
            .map_err(|_| MatchError::InvalidAccount(address.to_string()))
    }
}

fn parse_amount(op: &Operation) -> Result<Option<I256>, MatchError> {
    match &op.amount {
        None => Ok(None),
        Some(amount) => I256::from_dec_str(&amount.value)
            .map(Some)
            .map_err(|_| MatchError::InvalidAmount(amount.value.clone())),
    }
}

fn satisfies(role: &OperationRole, op: &Operation, amount: Option<I256>) -> bool {
    if op.op_type != role.op_type {
        return false;
    }
    if role.account_required && op.account.is_none() {
        return false;
    }
    if let Some(currency) = &role.currency {
        match &op.amount {
            Some(amount) if &amount.currency == currency => {}
            _ => return false,
        }
    }
    match amount {
        Some(value) => role.sign.admits(&value),
        None => role.sign == AmountSign::Any,
    }
}

/// Assign operations to the roles of `shape`.
pub fn match_operations<'a>(
    operations: &'a [Operation],
    shape: &OperationShape,
) -> Result<Matches<'a>, MatchError> {
    let amounts = operations
        .iter()
        .map(parse_amount)
        .collect::<Result<Vec<_>, _>>()?;

    let mut taken = vec![false; operations.len()];
    let mut matched = Vec::with_capacity(shape.roles.len());

    for (role_index, role) in shape.roles.iter().enumerate() {
        let candidates: Vec<usize> = (0..operations.len())
            .filter(|&i| !taken[i] && satisfies(role, &operations[i], amounts[i]))
            .collect();

        let chosen = match candidates.as_slice() {
            [] => return Err(MatchError::NotFound { role: role_index }),
            [only] => *only,
            [first, ..] if !shape.strict => *first,
            _ => {
                return Err(MatchError::Ambiguous {
                    role: role_index,
                    candidates: candidates.len(),
                })
            }
        };

        taken[chosen] = true;
        matched.push((&operations[chosen], amounts[chosen].unwrap_or(I256::ZERO)));
    }

    if shape.strict {
        if let Some(index) = taken.iter().position(|t| !t) {
            return Err(MatchError::Unmatched { index });
        }
    }

    for &(first, second) in &shape.opposite_amounts {
        let net = matched[first].1.checked_add(matched[second].1);
        if net != Some(I256::ZERO) {
            return Err(MatchError::SumMismatch { first, second });
        }
    }

    Ok(Matches { matched })
}

/// Extract the transfer intent from a debit/credit operation pair.
pub fn parse_transfer(operations: &[Operation], currency: &Currency) -> Result<TransferIntent, MatchError> {
    let matches = match_operations(operations, &OperationShape::transfer(currency))?;

    Ok(TransferIntent {
        from: matches.account(0)?,
        to: matches.account(1)?,
        value: matches.amount(1).unsigned_abs(),
    })
}
