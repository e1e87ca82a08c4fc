use std::path::Path as FsPath;

use axum::{
    extract::{Multipart, State},
    response::Json,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::accounts::{self, DepositAccount};
use crate::auth::CurrentUser;
use crate::db;
use crate::errors::{AppError, Result, ValidationError};
use crate::mailer::{proof_admin_email, proof_user_email, Attachment};
use crate::models::{card_display_name, PaymentProof};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ProofReceipt {
    pub proof: PaymentProof,
    pub card_name: String,
    /// Delivery problems with the notification emails. The proof itself
    /// is already committed when these occur.
    pub warnings: Vec<String>,
}

/// Multipart intake of a payment proof: `card_id`, optional `comment`,
/// and the `file` itself. The file lands content-addressed in the upload
/// directory and the proof row is marked processed on the spot.
pub async fn upload_proof(
    user: CurrentUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProofReceipt>> {
    let mut card_id: Option<i64> = None;
    let mut comment: Option<String> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("card_id") => {
                card_id = field.text().await?.trim().parse::<i64>().ok();
            }
            Some("comment") => {
                let text = field.text().await?;
                if !text.trim().is_empty() {
                    comment = Some(text);
                }
            }
            Some("file") => {
                let filename = field
                    .file_name()
                    .unwrap_or("comprobante.bin")
                    .to_string();
                file = Some((filename, field.bytes().await?.to_vec()));
            }
            _ => {}
        }
    }

    let card_id = card_id.ok_or(AppError::NotFound("card"))?;
    let card = db::get_card(&state.pool, card_id)
        .await?
        .ok_or(AppError::NotFound("card"))?;
    if card.user_id != user.0.id {
        return Err(ValidationError::NotYourCard.into());
    }
    if db::card_is_paid(&state.pool, card.id).await? {
        return Err(ValidationError::AlreadyPaid.into());
    }
    let (original_name, content) = file.ok_or(ValidationError::MissingFile)?;
    if content.is_empty() {
        return Err(ValidationError::MissingFile.into());
    }

    let stored_name = stored_file_name(&original_name, &content);
    let stored_path = FsPath::new(&state.config.upload.dir).join(&stored_name);

    // Row before file: a concurrent second upload trips the partial
    // unique index with nothing yet on disk, and a failed write rolls
    // the row back.
    let mut tx = state.pool.begin().await?;
    let proof = db::insert_proof(&mut tx, card.id, user.0.id, &stored_name, comment.as_deref())
        .await?;
    tokio::fs::write(&stored_path, &content).await?;
    tx.commit().await?;

    let card_name = card_display_name(&user.0.username, card.card_number);
    let mut warnings = Vec::new();

    let attachment = Attachment {
        filename: original_name,
        content,
    };
    let (subject, body) =
        proof_admin_email(&card_name, &user.0.username, &proof.uploaded_at, comment.as_deref());
    if let Err(e) = state
        .mailer
        .send(
            &subject,
            &body,
            &[state.config.mail.admin_email.clone()],
            Some(&attachment),
        )
        .await
    {
        warn!("Admin notification for proof {} failed: {}", proof.id, e);
        warnings.push("the admin notification email could not be sent".to_string());
    }

    if let Some(email) = user.0.email.clone() {
        let (subject, body) =
            proof_user_email(&card_name, &user.0.username, &proof.uploaded_at, comment.as_deref());
        if let Err(e) = state.mailer.send(&subject, &body, &[email], None).await {
            warn!("Confirmation for proof {} failed: {}", proof.id, e);
            warnings.push("the confirmation email could not be sent".to_string());
        }
    }

    Ok(Json(ProofReceipt {
        proof,
        card_name,
        warnings,
    }))
}

/// Content-addressed name for a stored proof file, keeping the original
/// extension. Identical uploads map to the same file.
fn stored_file_name(original_name: &str, content: &[u8]) -> String {
    let digest = format!("{:x}", Sha256::digest(content));
    let extension = FsPath::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin");
    format!("{}.{}", digest, extension)
}

#[derive(Debug, Serialize)]
pub struct ActiveAccount {
    pub account: DepositAccount,
    pub processed_count: i64,
}

/// Which deposit account to show right now, rotating one account per
/// configured batch of processed proofs.
pub async fn active_account(
    _user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ActiveAccount>> {
    let processed_count = db::processed_proof_count(&state.pool).await?;
    let account = accounts::active_account(
        &state.config.deposit_accounts,
        processed_count,
        state.config.rules.account_batch_size,
    )
    .ok_or(AppError::NotFound("deposit account"))?;

    Ok(Json(ActiveAccount {
        account: account.clone(),
        processed_count,
    }))
}
