use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::anyhow;
use kulooc_firebase::{AccountStore, Document, DocumentStore, FieldQuery};
use serde_json::json;

use crate::cli::PurgeDriversArgs;
use crate::client::{AppContext, CliError, CliResult};
use crate::commands::{DRIVER_DOCUMENTS, DRIVERS};
use crate::output::emit;

const MATCH_LIMIT: u32 = 10;

/// What a purge run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PurgeReport {
    pub(crate) matched: usize,
    pub(crate) deleted: usize,
    pub(crate) auth_failures: usize,
    pub(crate) remaining: bool,
}

pub(crate) async fn handle_purge_drivers(
    ctx: &AppContext,
    args: PurgeDriversArgs,
    out: &mut (dyn Write + Send),
) -> CliResult<()> {
    let firestore = ctx.session.firestore();
    let accounts = ctx.session.accounts();
    let yes = args.yes;
    let report = purge_drivers(
        &firestore,
        &accounts,
        &args.first_name,
        |out, count| {
            let interactive = io::stdin().is_terminal();
            confirm_purge(yes, interactive, &mut io::stdin().lock(), out, count)
        },
        out,
    )
    .await?;
    tracing::info!(
        matched = report.matched,
        deleted = report.deleted,
        auth_failures = report.auth_failures,
        remaining = report.remaining,
        "purge finished"
    );
    Ok(())
}

/// Ask the operator before deleting `count` drivers.
///
/// `--yes` skips the prompt; without it a non-interactive run is refused.
pub(crate) fn confirm_purge(
    yes: bool,
    interactive: bool,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
    count: usize,
) -> CliResult<bool> {
    if yes {
        return Ok(true);
    }
    if !interactive {
        return Err(CliError::validation(
            "confirmation requise; relancez avec --yes en mode non interactif",
        ));
    }
    write!(out, "\n⚠️  Supprimer définitivement {count} chauffeur(s)? [o/N] ")
        .and_then(|()| out.flush())
        .map_err(|err| CliError::failure(anyhow!("failed to write prompt: {err}")))?;
    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .map_err(|err| CliError::failure(anyhow!("failed to read confirmation: {err}")))?;
    Ok(matches!(
        answer.trim().to_lowercase().as_str(),
        "o" | "oui" | "y" | "yes"
    ))
}

/// Delete drivers named `first_name` with their documents and Auth accounts.
///
/// `approve` runs once, only when there is something to delete. Auth
/// failures are reported and do not stop the purge.
pub(crate) async fn purge_drivers<F>(
    store: &dyn DocumentStore,
    accounts: &dyn AccountStore,
    first_name: &str,
    approve: F,
    out: &mut (dyn Write + Send),
) -> CliResult<PurgeReport>
where
    F: FnOnce(&mut dyn Write, usize) -> CliResult<bool> + Send,
{
    emit(out, format!("🔍 Recherche du compte {first_name}..."))?;
    let query = FieldQuery::equal(DRIVERS, "firstName", json!(first_name));
    let matches = store
        .run_query(&query.clone().limit(MATCH_LIMIT))
        .await
        .map_err(CliError::failure)?;

    let mut report = PurgeReport {
        matched: matches.len(),
        ..PurgeReport::default()
    };
    for driver in &matches {
        describe(out, driver)?;
    }

    if !matches.is_empty() && !approve(out, matches.len())? {
        emit(out, "\n🚫 Suppression annulée")?;
        report.remaining = true;
        return Ok(report);
    }

    for driver in &matches {
        if !purge_one(store, accounts, driver, out).await? {
            report.auth_failures += 1;
        }
        report.deleted += 1;
    }

    if report.deleted == 0 {
        emit(out, format!("\n❌ Aucun compte {first_name} trouvé"))?;
    } else {
        emit(out, format!("\n✅ {} compte(s) supprimé(s)", report.deleted))?;
    }

    emit(out, "\n🔍 Vérification finale...")?;
    report.remaining = !store
        .run_query(&query.limit(1))
        .await
        .map_err(CliError::failure)?
        .is_empty();
    if report.remaining {
        emit(out, format!("⚠️  Il reste des comptes {first_name}"))?;
    } else {
        emit(out, format!("✅ Aucun compte {first_name} restant"))?;
    }
    Ok(report)
}

fn describe(out: &mut dyn Write, driver: &Document) -> CliResult<()> {
    let field = |name: &str| driver.str_field(name).unwrap_or("N/A");
    emit(
        out,
        format!("\n📋 Trouvé: {} {}", field("firstName"), field("lastName")),
    )?;
    emit(out, format!("   ID: {}", driver.id()))?;
    emit(out, format!("   Email: {}", field("email")))?;
    emit(out, format!("   Status: {}", field("status")))
}

/// Returns whether the Auth account was removed.
async fn purge_one(
    store: &dyn DocumentStore,
    accounts: &dyn AccountStore,
    driver: &Document,
    out: &mut (dyn Write + Send),
) -> CliResult<bool> {
    let driver_id = driver.id();
    emit(out, format!("\n🗑️  Suppression des documents de {driver_id}..."))?;
    let documents = store
        .run_query(&FieldQuery::equal(DRIVER_DOCUMENTS, "driverId", json!(driver_id)))
        .await
        .map_err(CliError::failure)?;
    for document in &documents {
        store
            .delete_document(DRIVER_DOCUMENTS, document.id())
            .await
            .map_err(CliError::failure)?;
        emit(out, format!("   ✅ Document {} supprimé", document.id()))?;
    }

    emit(out, "🗑️  Suppression du profil chauffeur...")?;
    store
        .delete_document(DRIVERS, driver_id)
        .await
        .map_err(CliError::failure)?;
    emit(out, "   ✅ Profil supprimé")?;

    emit(out, "🗑️  Suppression du compte Firebase Auth...")?;
    match accounts.delete_account(driver_id).await {
        Ok(()) => {
            emit(out, "   ✅ Compte Auth supprimé")?;
            Ok(true)
        }
        Err(err) => {
            tracing::warn!(%driver_id, error = %err, "auth account deletion failed");
            emit(out, format!("   ⚠️  Erreur Auth: {err}"))?;
            Ok(false)
        }
    }
}
