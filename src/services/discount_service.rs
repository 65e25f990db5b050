use std::fmt;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    dto::discounts::CodeValidation,
    entity::{
        discount_code_uses::{
            ActiveModel as CodeUseActive, Column as CodeUseCol, Entity as DiscountCodeUses,
            Model as CodeUseModel,
        },
        discount_codes::{
            ActiveModel as CodeActive, Column as CodeCol, Entity as DiscountCodes,
            Model as CodeModel,
        },
    },
    error::{AppError, AppResult},
};

/// Why a discount code cannot be used. Checks run in declaration order and
/// the first failing one wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeRejection {
    NotFound,
    Inactive,
    NotYetValid,
    Expired,
    Exhausted,
    BelowMinimum { minimum: i64 },
    UserLimitReached { limit: i32 },
}

impl fmt::Display for CodeRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeRejection::NotFound => f.write_str("code does not exist"),
            CodeRejection::Inactive => f.write_str("code is not active"),
            CodeRejection::NotYetValid => f.write_str("code is not valid yet"),
            CodeRejection::Expired => f.write_str("code has expired"),
            CodeRejection::Exhausted => f.write_str("code has no uses left"),
            CodeRejection::BelowMinimum { minimum } => {
                write!(f, "purchase amount is below the minimum of {minimum}")
            }
            CodeRejection::UserLimitReached { limit } => {
                write!(f, "code already used {limit} time(s) by this user")
            }
        }
    }
}

/// A redemption that has been recorded against an order.
#[derive(Debug, Clone)]
pub struct AppliedCode {
    pub code: String,
    pub discount_amount: i64,
    pub code_use: CodeUseModel,
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Floor of `amount × bps / 10 000`.
pub fn discount_for(purchase_amount: i64, percentage_bps: i32) -> i64 {
    let bps = i64::from(percentage_bps.clamp(0, 10_000));
    purchase_amount.max(0) * bps / 10_000
}

/// Every check that only needs the code row itself.
pub fn check_code(
    code: &CodeModel,
    purchase_amount: i64,
    now: DateTime<Utc>,
) -> Result<(), CodeRejection> {
    if !code.active {
        return Err(CodeRejection::Inactive);
    }
    if let Some(starts_at) = code.starts_at {
        if starts_at.with_timezone(&Utc) > now {
            return Err(CodeRejection::NotYetValid);
        }
    }
    if let Some(expires_at) = code.expires_at {
        if expires_at.with_timezone(&Utc) < now {
            return Err(CodeRejection::Expired);
        }
    }
    if let Some(uses_max) = code.uses_max {
        if code.uses_current >= uses_max {
            return Err(CodeRejection::Exhausted);
        }
    }
    if let Some(minimum) = code.minimum_amount {
        if purchase_amount < minimum {
            return Err(CodeRejection::BelowMinimum { minimum });
        }
    }
    Ok(())
}

pub fn check_user_limit(code: &CodeModel, used_by_user: u64) -> Result<(), CodeRejection> {
    match code.uses_per_user {
        Some(limit) if used_by_user >= limit.max(0) as u64 => {
            Err(CodeRejection::UserLimitReached { limit })
        }
        _ => Ok(()),
    }
}

async fn uses_by_user<C: ConnectionTrait>(conn: &C, code_id: Uuid, user_id: Uuid) -> AppResult<u64> {
    let used = DiscountCodeUses::find()
        .filter(CodeUseCol::CodeId.eq(code_id))
        .filter(CodeUseCol::UserId.eq(user_id))
        .count(conn)
        .await?;
    Ok(used)
}

/// Runs every check, the per-user one last and only for signed-in buyers.
async fn evaluate<C: ConnectionTrait>(
    conn: &C,
    code: &CodeModel,
    purchase_amount: i64,
    user_id: Option<Uuid>,
) -> AppResult<Result<(), CodeRejection>> {
    if let Err(rejection) = check_code(code, purchase_amount, Utc::now()) {
        return Ok(Err(rejection));
    }
    if let (Some(user_id), Some(_)) = (user_id, code.uses_per_user) {
        let used = uses_by_user(conn, code.id, user_id).await?;
        return Ok(check_user_limit(code, used));
    }
    Ok(Ok(()))
}

/// Read-only validation, used to preview a code before checkout.
pub async fn validate<C: ConnectionTrait>(
    conn: &C,
    code: &str,
    purchase_amount: i64,
    user_id: Option<Uuid>,
) -> AppResult<CodeValidation> {
    let normalized = normalize_code(code);
    let found = DiscountCodes::find()
        .filter(CodeCol::Code.eq(normalized.clone()))
        .one(conn)
        .await?;

    let Some(found) = found else {
        return Ok(CodeValidation {
            code: normalized,
            valid: false,
            reason: CodeRejection::NotFound.to_string(),
            description: None,
            percentage_bps: None,
            discount_amount: None,
        });
    };

    let outcome = evaluate(conn, &found, purchase_amount, user_id).await?;
    let validation = match outcome {
        Ok(()) => CodeValidation {
            code: normalized,
            valid: true,
            reason: "ok".into(),
            description: Some(found.description.clone()),
            percentage_bps: Some(found.percentage_bps),
            discount_amount: Some(discount_for(purchase_amount, found.percentage_bps)),
        },
        Err(rejection) => CodeValidation {
            code: normalized,
            valid: false,
            reason: rejection.to_string(),
            description: Some(found.description.clone()),
            percentage_bps: Some(found.percentage_bps),
            discount_amount: None,
        },
    };
    Ok(validation)
}

/// Bumps the usage counter and appends to the ledger. The caller holds the
/// code row lock.
pub async fn redeem<C: ConnectionTrait>(
    conn: &C,
    code: CodeModel,
    order_id: Uuid,
    user_id: Option<Uuid>,
    discount_amount: i64,
) -> AppResult<CodeUseModel> {
    let code_id = code.id;
    let uses_current = code.uses_current + 1;

    let mut active: CodeActive = code.into();
    active.uses_current = Set(uses_current);
    active.update(conn).await?;

    let code_use = CodeUseActive {
        id: Set(Uuid::new_v4()),
        code_id: Set(code_id),
        order_id: Set(order_id),
        user_id: Set(user_id),
        amount_discounted: Set(discount_amount),
        used_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await?;

    Ok(code_use)
}

/// Locks the code, validates it against the order amount and redeems it.
/// Must run inside the transaction that creates the order.
pub async fn apply<C: ConnectionTrait>(
    txn: &C,
    code: &str,
    order_id: Uuid,
    user_id: Option<Uuid>,
    purchase_amount: i64,
) -> AppResult<AppliedCode> {
    let normalized = normalize_code(code);
    let locked = DiscountCodes::find()
        .filter(CodeCol::Code.eq(normalized.clone()))
        .lock(LockType::Update)
        .one(txn)
        .await?;

    let Some(locked) = locked else {
        return Err(AppError::CodeInvalid {
            code: normalized,
            reason: CodeRejection::NotFound,
        });
    };

    if let Err(reason) = evaluate(txn, &locked, purchase_amount, user_id).await? {
        tracing::info!(code = %normalized, %reason, "discount code rejected");
        return Err(AppError::CodeInvalid {
            code: normalized,
            reason,
        });
    }

    let discount_amount = discount_for(purchase_amount, locked.percentage_bps);
    let code_use = redeem(txn, locked, order_id, user_id, discount_amount).await?;

    tracing::debug!(code = %normalized, order_id = %order_id, discount_amount, "discount code redeemed");
    Ok(AppliedCode {
        code: normalized,
        discount_amount,
        code_use,
    })
}
